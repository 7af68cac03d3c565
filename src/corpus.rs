use std::collections::{HashMap, HashSet};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Column order of the persisted table.
pub const COLUMNS: [&str; 4] = ["user", "date", "title", "text"];

/// One forum post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub user: String,
    pub date: String,
    pub title: String,
    pub text: String,
}

impl Message {
    fn into_row(self) -> Vec<String> {
        vec![self.user, self.date, self.title, self.text]
    }

    fn from_row(row: Vec<String>) -> Option<Self> {
        let [user, date, title, text]: [String; 4] = row.try_into().ok()?;
        Some(Message { user, date, title, text })
    }
}

/// Ordered messages; appended to by assembly, read by every analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Corpus {
    messages: Vec<Message>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    pub fn extend(&mut self, messages: impl IntoIterator<Item = Message>) {
        self.messages.extend(messages);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// The `text` column.
    pub fn texts(&self) -> Vec<&str> {
        self.messages.iter().map(|m| m.text.as_str()).collect()
    }
}

#[derive(Debug, Error)]
pub enum CorpusError {
    #[error("corpus file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("corpus file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected columns {found:?}, expected {:?}", COLUMNS)]
    Columns { found: Vec<String> },
    #[error("row {row} has {len} cells, expected {}", COLUMNS.len())]
    RowWidth { row: usize, len: usize },
}

/// pandas `orient="split"` layout.
#[derive(Debug, Serialize, Deserialize)]
struct SplitTable {
    columns: Vec<String>,
    #[serde(default)]
    index: Vec<u64>,
    data: Vec<Vec<String>>,
}

/// Write the corpus as UTF-8 JSON in split layout. Non-ASCII is written raw.
pub fn save(corpus: &Corpus, path: &Path) -> Result<(), CorpusError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let table = SplitTable {
        columns: COLUMNS.iter().map(|c| c.to_string()).collect(),
        index: (0..corpus.len() as u64).collect(),
        data: corpus.messages.iter().cloned().map(Message::into_row).collect(),
    };

    let mut writer = BufWriter::new(fs::File::create(path)?);
    serde_json::to_writer(&mut writer, &table)?;
    writer.flush()?;
    Ok(())
}

pub fn load(path: &Path) -> Result<Corpus, CorpusError> {
    let reader = BufReader::new(fs::File::open(path)?);
    let table: SplitTable = serde_json::from_reader(reader)?;

    if table.columns.iter().map(String::as_str).ne(COLUMNS) {
        return Err(CorpusError::Columns {
            found: table.columns,
        });
    }

    let mut corpus = Corpus::new();
    for (row, cells) in table.data.into_iter().enumerate() {
        let len = cells.len();
        let message = Message::from_row(cells).ok_or(CorpusError::RowWidth { row, len })?;
        corpus.push(message);
    }
    Ok(corpus)
}

/// Summary shown by the `stats` command.
pub struct CorpusStats {
    pub messages: usize,
    pub threads: usize,
    pub authors: usize,
    pub avg_chars: f64,
    pub top_authors: Vec<(String, usize)>,
}

pub fn stats(corpus: &Corpus, top: usize) -> CorpusStats {
    let mut per_author: HashMap<&str, usize> = HashMap::new();
    let mut titles: HashSet<&str> = HashSet::new();
    let mut chars = 0usize;

    for m in corpus.messages() {
        *per_author.entry(m.user.as_str()).or_default() += 1;
        titles.insert(m.title.as_str());
        chars += m.text.chars().count();
    }

    let mut top_authors: Vec<(String, usize)> = per_author
        .iter()
        .map(|(user, n)| (user.to_string(), *n))
        .collect();
    top_authors.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_authors.truncate(top);

    let avg_chars = if corpus.is_empty() {
        0.0
    } else {
        chars as f64 / corpus.len() as f64
    };

    CorpusStats {
        messages: corpus.len(),
        threads: titles.len(),
        authors: per_author.len(),
        avg_chars,
        top_authors,
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn msg(user: &str, title: &str, text: &str) -> Message {
        Message {
            user: user.into(),
            date: "12/03/2010 a las 14:35".into(),
            title: title.into(),
            text: text.into(),
        }
    }

    fn sample() -> Corpus {
        let mut c = Corpus::new();
        c.push(msg("María", "¿Cómo dejarlo?", "Llevo tres años sin jugar, ¡ánimo! 💪"));
        c.push(msg("José", "¿Cómo dejarlo?", "Gracias por compartir / un abrazo"));
        c.push(msg("María", "Recaídas", "Hoy ha sido un día difícil\ncon saltos de línea"));
        c
    }

    #[test]
    fn roundtrip_preserves_non_ascii() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/corpus.json");
        let corpus = sample();

        save(&corpus, &path).unwrap();
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("María"));
        assert!(raw.contains("💪"));
        assert!(!raw.contains("\\u00"));

        let reloaded = load(&path).unwrap();
        assert_eq!(reloaded, corpus);
    }

    #[test]
    fn split_layout_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("corpus.json");
        save(&sample(), &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["columns"], serde_json::json!(["user", "date", "title", "text"]));
        assert_eq!(value["index"], serde_json::json!([0, 1, 2]));
        assert_eq!(value["data"][1][0], "José");
    }

    #[test]
    fn loads_pandas_output() {
        // pandas escapes forward slashes
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pandas.json");
        std::fs::write(
            &path,
            r#"{"columns":["user","date","title","text"],"index":[0],"data":[["Ana","01\/02\/2011 a las 10:00","Tema","¿Qué tal?"]]}"#,
        )
        .unwrap();
        let corpus = load(&path).unwrap();
        assert_eq!(corpus.len(), 1);
        assert_eq!(corpus.messages()[0].date, "01/02/2011 a las 10:00");
        assert_eq!(corpus.messages()[0].text, "¿Qué tal?");
    }

    #[test]
    fn wrong_columns_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(&path, r#"{"columns":["a","b"],"index":[],"data":[]}"#).unwrap();
        assert!(matches!(load(&path), Err(CorpusError::Columns { .. })));
    }

    #[test]
    fn short_row_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        std::fs::write(
            &path,
            r#"{"columns":["user","date","title","text"],"index":[0],"data":[["a","b","c"]]}"#,
        )
        .unwrap();
        assert!(matches!(
            load(&path),
            Err(CorpusError::RowWidth { row: 0, len: 3 })
        ));
    }

    #[test]
    fn stats_counts() {
        let s = stats(&sample(), 5);
        assert_eq!(s.messages, 3);
        assert_eq!(s.threads, 2);
        assert_eq!(s.authors, 2);
        assert_eq!(s.top_authors[0], ("María".to_string(), 2));
    }
}
