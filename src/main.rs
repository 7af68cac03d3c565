mod analysis;
mod assembly;
mod config;
mod corpus;
mod discovery;
mod fetch;
mod parser;
mod wordcloud;

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use analysis::keywords::KeywordScores;
use analysis::RankedTerm;
use config::Settings;
use corpus::Corpus;

#[derive(Parser)]
#[command(name = "forum_corpus", about = "Forum thread scraper and text analysis")]
struct Cli {
    /// Settings file (default: ./forum_corpus.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the forum listing and print thread links
    Discover {
        /// Max listing pages to visit
        #[arg(short = 'n', long)]
        pages: Option<usize>,
    },
    /// Discover threads, extract their messages and save the corpus
    Scrape {
        /// Max listing pages to visit
        #[arg(short = 'n', long)]
        pages: Option<usize>,
        /// Corpus output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Top terms by summed TF-IDF weight
    Tfidf {
        /// Corpus file
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Number of terms to show
        #[arg(short = 'k', long)]
        top: Option<usize>,
    },
    /// Top terms by raw occurrence count
    Frequency {
        #[arg(short, long)]
        input: Option<PathBuf>,
        #[arg(short = 'k', long)]
        top: Option<usize>,
    },
    /// Embedding-based keywords summed over the corpus
    Keywords {
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// Number of keywords to show (default: all)
        #[arg(short = 'k', long)]
        top: Option<usize>,
    },
    /// Render the keyword word cloud to PNG
    Wordcloud {
        #[arg(short, long)]
        input: Option<PathBuf>,
        /// PNG output file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Show corpus statistics
    Stats {
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
    /// Scrape, then run every analysis and render the word cloud
    Run {
        #[arg(short = 'n', long)]
        pages: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let mut settings = config::load(cli.config.as_deref())?;

    let result = match cli.command {
        Commands::Discover { pages } => {
            if let Some(n) = pages {
                settings.scrape.page_budget = n;
            }
            settings.validate()?;
            let client = fetch::client()?;
            let links = discovery::discover_thread_links(&client, &settings.scrape).await?;
            for link in &links {
                println!("{}", link);
            }
            println!("\n{} thread links", links.len());
            Ok(())
        }
        Commands::Scrape { pages, output } => {
            if let Some(n) = pages {
                settings.scrape.page_budget = n;
            }
            if let Some(path) = output {
                settings.scrape.corpus_path = path;
            }
            settings.validate()?;
            scrape(&settings).await?;
            Ok(())
        }
        Commands::Tfidf { input, top } => {
            let corpus = load_corpus(&settings, input.as_deref())?;
            let ranking = analysis::tfidf_ranking(
                &corpus.texts(),
                &stopwords(&settings)?,
                settings.analysis.min_df,
                top.unwrap_or(settings.analysis.tfidf_top),
            )?;
            print_ranking(&ranking, None);
            Ok(())
        }
        Commands::Frequency { input, top } => {
            let corpus = load_corpus(&settings, input.as_deref())?;
            let ranking = analysis::frequency_ranking(
                &corpus.texts(),
                &stopwords(&settings)?,
                settings.analysis.min_df,
                top.unwrap_or(settings.analysis.frequency_top),
            )?;
            print_frequency(&ranking);
            Ok(())
        }
        Commands::Keywords { input, top } => {
            let corpus = load_corpus(&settings, input.as_deref())?;
            let scores = keywords(&corpus, &settings).await?;
            print_ranking(&scores.ranked(), top);
            Ok(())
        }
        Commands::Wordcloud { input, output } => {
            if let Some(path) = output {
                settings.wordcloud.output_path = path;
            }
            settings.validate()?;
            let corpus = load_corpus(&settings, input.as_deref())?;
            let scores = keywords(&corpus, &settings).await?;
            render_cloud(&scores, &settings)
        }
        Commands::Stats { input } => {
            let corpus = load_corpus(&settings, input.as_deref())?;
            let s = corpus::stats(&corpus, 10);
            println!("Messages:  {}", s.messages);
            println!("Threads:   {}", s.threads);
            println!("Authors:   {}", s.authors);
            println!("Avg chars: {:.1}", s.avg_chars);
            if !s.top_authors.is_empty() {
                println!("\n--- Top authors ---");
                for (user, n) in &s.top_authors {
                    println!("  {:<24} {:>6}", truncate(user, 24), n);
                }
            }
            Ok(())
        }
        Commands::Run { pages } => {
            if let Some(n) = pages {
                settings.scrape.page_budget = n;
            }
            settings.validate()?;

            // Phase 1: scrape and persist
            let t_scrape = Instant::now();
            let corpus = scrape(&settings).await?;
            println!("Scraped in {}", format_duration(t_scrape.elapsed()));

            // Phase 2: analyses (an empty corpus fails here)
            let t_analysis = Instant::now();
            let report = analyse(&corpus, &settings).await?;
            println!("\n--- TF-IDF ---");
            print_ranking(&report.tfidf, None);
            println!("\n--- Frequency ---");
            print_frequency(&report.frequency);
            println!("\n--- Keywords ---");
            print_ranking(&report.keywords.ranked(), None);
            println!("Analysed in {}", format_duration(t_analysis.elapsed()));

            // Phase 3: word cloud
            render_cloud(&report.keywords, &settings)
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn scrape(settings: &Settings) -> anyhow::Result<Corpus> {
    let client = fetch::client()?;
    let markers = parser::ThreadMarkers::from_settings(&settings.thread)
        .context("Invalid date pattern")?;

    let links = discovery::discover_thread_links(&client, &settings.scrape).await?;
    println!("Scraping {} threads...", links.len());
    let (corpus, stats) = assembly::assemble_corpus(&client, &links, &markers, Corpus::new()).await?;
    println!(
        "Done: {} threads ({} ok, {} errors), {} messages.",
        stats.total, stats.ok, stats.errors, stats.messages
    );

    let path = &settings.scrape.corpus_path;
    corpus::save(&corpus, path).with_context(|| format!("Failed to save {}", path.display()))?;
    println!("Saved corpus to {}", path.display());
    Ok(corpus)
}

fn load_corpus(settings: &Settings, input: Option<&Path>) -> anyhow::Result<Corpus> {
    let path = input.unwrap_or(&settings.scrape.corpus_path);
    let corpus =
        corpus::load(path).with_context(|| format!("Failed to load {}", path.display()))?;
    tracing::info!("Loaded {} messages from {}", corpus.len(), path.display());
    Ok(corpus)
}

fn stopwords(settings: &Settings) -> anyhow::Result<HashSet<String>> {
    analysis::stopwords::load(settings.analysis.stopwords_file.as_deref())
}

/// Rankings printed by `run`.
struct Report {
    tfidf: Vec<RankedTerm>,
    frequency: Vec<RankedTerm>,
    keywords: KeywordScores,
}

async fn analyse(corpus: &Corpus, settings: &Settings) -> anyhow::Result<Report> {
    let stop = stopwords(settings)?;
    let docs = corpus.texts();
    let a = &settings.analysis;
    let tfidf = analysis::tfidf_ranking(&docs, &stop, a.min_df, a.tfidf_top)?;
    let frequency = analysis::frequency_ranking(&docs, &stop, a.min_df, a.frequency_top)?;
    let keywords = keywords(corpus, settings).await?;
    Ok(Report {
        tfidf,
        frequency,
        keywords,
    })
}

fn print_frequency(ranking: &[RankedTerm]) {
    for (i, t) in ranking.iter().enumerate() {
        println!("{}     {}   {}", i, t.term, t.score as u64);
    }
}

async fn keywords(corpus: &Corpus, settings: &Settings) -> anyhow::Result<KeywordScores> {
    let embedder = analysis::embed::from_settings(&settings.embedding)?;
    analysis::keywords::extract_keywords(
        &corpus.texts(),
        &stopwords(settings)?,
        settings.analysis.keywords_per_doc,
        embedder.as_ref(),
    )
    .await
}

fn render_cloud(scores: &KeywordScores, settings: &Settings) -> anyhow::Result<()> {
    let output = &settings.wordcloud.output_path;
    let placed = wordcloud::render(&scores.ranked(), &settings.wordcloud, output)?;
    println!("Word cloud with {} words written to {}", placed, output.display());
    Ok(())
}

fn print_ranking(ranking: &[RankedTerm], top: Option<usize>) {
    let n = top.unwrap_or(ranking.len()).min(ranking.len());
    for (i, t) in ranking[..n].iter().enumerate() {
        println!("{:>3}  {:<24} {:.4}", i, truncate(&t.term, 24), t.score);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

// ── Tests ──
