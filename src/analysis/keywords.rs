use std::collections::{BTreeSet, HashMap, HashSet};

use anyhow::{bail, Result};
use tracing::info;

use super::embed::{cosine, Embedder};
use super::tokenize::candidate_words;
use super::{rank, AnalysisError, RankedTerm};

/// Keyword to score, summed over every document's extracted keywords.
#[derive(Debug, Default, Clone)]
pub struct KeywordScores {
    scores: HashMap<String, f64>,
}

impl KeywordScores {
    pub fn add(&mut self, keyword: &str, score: f64) {
        *self.scores.entry(keyword.to_string()).or_insert(0.0) += score;
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn get(&self, keyword: &str) -> Option<f64> {
        self.scores.get(keyword).copied()
    }

    /// All keywords, highest accumulated score first.
    pub fn ranked(&self) -> Vec<RankedTerm> {
        rank(self.scores.iter().map(|(k, v)| (k.clone(), *v)), None)
    }
}

fn round4(x: f32) -> f64 {
    (f64::from(x) * 10_000.0).round() / 10_000.0
}

/// Extract the `per_doc` candidates closest to each document and accumulate
/// their similarities.
///
/// Candidates are embedded once for the whole corpus; only documents with at
/// least one candidate are embedded.
pub async fn extract_keywords(
    docs: &[&str],
    stopwords: &HashSet<String>,
    per_doc: usize,
    embedder: &dyn Embedder,
) -> Result<KeywordScores> {
    if docs.is_empty() {
        return Err(AnalysisError::EmptyCorpus.into());
    }

    let candidates: Vec<(usize, BTreeSet<String>)> = docs
        .iter()
        .enumerate()
        .map(|(i, doc)| (i, candidate_words(doc, stopwords)))
        .filter(|(_, words)| !words.is_empty())
        .collect();

    let vocabulary: Vec<String> = candidates
        .iter()
        .flat_map(|(_, words)| words.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();
    info!(
        "Keyword extraction over {} documents ({} with candidates), {} candidate words",
        docs.len(),
        candidates.len(),
        vocabulary.len()
    );

    let mut scores = KeywordScores::default();
    if candidates.is_empty() {
        return Ok(scores);
    }

    let word_vectors = embedder.embed(&vocabulary).await?;
    let doc_texts: Vec<String> = candidates.iter().map(|(i, _)| docs[*i].to_string()).collect();
    let doc_vectors = embedder.embed(&doc_texts).await?;
    if word_vectors.len() != vocabulary.len() || doc_vectors.len() != doc_texts.len() {
        bail!("Embedder returned the wrong number of vectors");
    }

    let word_index: HashMap<&str, usize> = vocabulary
        .iter()
        .enumerate()
        .map(|(i, w)| (w.as_str(), i))
        .collect();

    for ((_, words), doc_vec) in candidates.iter().zip(&doc_vectors) {
        let mut scored: Vec<(&str, f64)> = words
            .iter()
            .map(|w| {
                let v = &word_vectors[word_index[w.as_str()]];
                (w.as_str(), round4(cosine(v, doc_vec)))
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        for (word, score) in scored.into_iter().take(per_doc) {
            scores.add(word, score);
        }
    }

    Ok(scores)
}

// ── Tests ──
