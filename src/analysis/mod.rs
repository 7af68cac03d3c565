pub mod embed;
pub mod keywords;
pub mod stopwords;
pub mod tokenize;
pub mod vectorize;

use std::collections::HashSet;

use thiserror::Error;
use tracing::info;

use vectorize::TermMatrix;

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("corpus has no documents")]
    EmptyCorpus,
    #[error("no terms left after pruning (min_df = {min_df})")]
    EmptyVocabulary { min_df: usize },
}

/// One entry of a ranking.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedTerm {
    pub term: String,
    pub score: f64,
}

/// Sort descending by score, ties by term, and keep the first `top` entries.
pub fn rank(scores: impl IntoIterator<Item = (String, f64)>, top: Option<usize>) -> Vec<RankedTerm> {
    let mut ranked: Vec<RankedTerm> = scores
        .into_iter()
        .map(|(term, score)| RankedTerm { term, score })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score).then_with(|| a.term.cmp(&b.term)));
    if let Some(n) = top {
        ranked.truncate(n);
    }
    ranked
}

/// Terms with the largest summed TF-IDF weight.
pub fn tfidf_ranking(
    docs: &[&str],
    stopwords: &HashSet<String>,
    min_df: usize,
    top: usize,
) -> Result<Vec<RankedTerm>, AnalysisError> {
    let matrix = TermMatrix::build(docs, stopwords, min_df)?;
    info!(
        "TF-IDF over {} documents, {} terms",
        matrix.n_docs(),
        matrix.vocabulary().len()
    );
    let totals = matrix.tfidf_totals();
    Ok(rank(
        matrix.vocabulary().iter().cloned().zip(totals),
        Some(top),
    ))
}

/// Terms with the most occurrences across the corpus.
pub fn frequency_ranking(
    docs: &[&str],
    stopwords: &HashSet<String>,
    min_df: usize,
    top: usize,
) -> Result<Vec<RankedTerm>, AnalysisError> {
    let matrix = TermMatrix::build(docs, stopwords, min_df)?;
    info!(
        "Term frequency over {} documents, {} terms",
        matrix.n_docs(),
        matrix.vocabulary().len()
    );
    let totals = matrix.term_totals();
    Ok(rank(
        matrix.vocabulary().iter().cloned().zip(totals),
        Some(top),
    ))
}

// ── Tests ──
