use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

const CONFIG_BASENAME: &str = "forum_corpus";
const ENV_PREFIX: &str = "FORUM";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load settings: {0}")]
    Load(#[from] config::ConfigError),
    #[error("invalid value for {name}: {message}")]
    InvalidValue { name: &'static str, message: String },
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub scrape: ScrapeSettings,
    pub thread: ThreadSettings,
    pub analysis: AnalysisSettings,
    pub embedding: EmbeddingSettings,
    pub wordcloud: WordCloudSettings,
}

/// Where to start the listing walk and how to read its anchors.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ScrapeSettings {
    pub base_url: String,
    pub section_name: String,
    pub link_marker: String,
    pub next_label: String,
    pub previous_label: String,
    pub quote_view_suffix: String,
    pub page_budget: usize,
    pub corpus_path: PathBuf,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        ScrapeSettings {
            base_url: "https://www.ludopatia.org/forum/default.asp".into(),
            section_name: "General".into(),
            link_marker: "forum".into(),
            next_label: "Siguiente".into(),
            previous_label: "Anterior".into(),
            quote_view_suffix: "TPN=1".into(),
            page_budget: 20,
            corpus_path: PathBuf::from("data/corpus.json"),
        }
    }
}

/// Markers of the thread page template.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ThreadSettings {
    pub title_marker: String,
    pub date_pattern: String,
    pub signature_marker: String,
    pub edited_marker: String,
    pub message_table_index: usize,
}

impl Default for ThreadSettings {
    fn default() -> Self {
        ThreadSettings {
            title_marker: "Tema:".into(),
            date_pattern: "Escrito el:.*[0-9]{2}:[0-9]{2}".into(),
            signature_marker: "__________________".into(),
            edited_marker: "Editado por".into(),
            message_table_index: 5,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    pub min_df: usize,
    pub tfidf_top: usize,
    pub frequency_top: usize,
    pub keywords_per_doc: usize,
    pub stopwords_file: Option<PathBuf>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        AnalysisSettings {
            min_df: 10,
            tfidf_top: 50,
            frequency_top: 100,
            keywords_per_doc: 5,
            stopwords_file: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// OpenAI-compatible `/embeddings` endpoint.
    Http,
    /// Deterministic feature-hashing vectors, no network.
    Hashing,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    pub backend: EmbeddingBackend,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub batch_size: usize,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        EmbeddingSettings {
            backend: EmbeddingBackend::Http,
            base_url: "http://localhost:1234/v1".into(),
            model: "sentence-transformers/distiluse-base-multilingual-cased-v1".into(),
            api_key: None,
            batch_size: 32,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WordCloudSettings {
    pub width: u32,
    pub height: u32,
    pub background: String,
    pub min_font_size: u32,
    pub max_font_size: u32,
    pub max_words: usize,
    pub font_path: PathBuf,
    pub output_path: PathBuf,
}

impl Default for WordCloudSettings {
    fn default() -> Self {
        WordCloudSettings {
            width: 1200,
            height: 1200,
            background: "#000000".into(),
            min_font_size: 10,
            max_font_size: 200,
            max_words: 200,
            font_path: PathBuf::from("/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf"),
            output_path: PathBuf::from("data/wordcloud.png"),
        }
    }
}

impl WordCloudSettings {
    /// Parse `background` as `#rrggbb`.
    pub fn background_rgb(&self) -> Result<[u8; 3], ConfigError> {
        parse_hex_color(&self.background).ok_or_else(|| ConfigError::InvalidValue {
            name: "wordcloud.background",
            message: format!("expected #rrggbb, got {:?}", self.background),
        })
    }
}

fn parse_hex_color(s: &str) -> Option<[u8; 3]> {
    let hex = s.strip_prefix('#')?;
    if hex.len() != 6 || !hex.is_ascii() {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    Some([channel(0)?, channel(2)?, channel(4)?])
}

/// Defaults, then `forum_corpus.toml` (or `explicit`), then `FORUM_*` env vars.
pub fn load(explicit: Option<&Path>) -> Result<Settings, ConfigError> {
    let file = match explicit {
        Some(path) => File::from(path).required(true),
        None => File::with_name(CONFIG_BASENAME).required(false),
    };
    let settings: Settings = Config::builder()
        .add_source(file)
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scrape.page_budget == 0 {
            return Err(ConfigError::InvalidValue {
                name: "scrape.page_budget",
                message: "must be at least 1".into(),
            });
        }
        if url::Url::parse(&self.scrape.base_url).is_err() {
            return Err(ConfigError::InvalidValue {
                name: "scrape.base_url",
                message: format!("not an absolute URL: {}", self.scrape.base_url),
            });
        }
        if let Err(e) = Regex::new(&self.thread.date_pattern) {
            return Err(ConfigError::InvalidValue {
                name: "thread.date_pattern",
                message: e.to_string(),
            });
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                name: "embedding.batch_size",
                message: "must be at least 1".into(),
            });
        }
        let wc = &self.wordcloud;
        if wc.width == 0 || wc.height == 0 {
            return Err(ConfigError::InvalidValue {
                name: "wordcloud.width/height",
                message: "image must not be empty".into(),
            });
        }
        if wc.min_font_size == 0 || wc.min_font_size > wc.max_font_size {
            return Err(ConfigError::InvalidValue {
                name: "wordcloud.min_font_size",
                message: format!(
                    "must be in 1..={} (max_font_size)",
                    wc.max_font_size
                ),
            });
        }
        wc.background_rgb()?;
        Ok(())
    }
}

// ── Tests ──
