use std::collections::{BTreeMap, HashMap, HashSet};

use super::tokenize::terms;
use super::AnalysisError;

/// Sparse term counts per document over a pruned, sorted vocabulary.
#[derive(Debug)]
pub struct TermMatrix {
    vocabulary: Vec<String>,
    /// `(term index, count)` pairs per document.
    rows: Vec<Vec<(usize, u32)>>,
    doc_freq: Vec<usize>,
}

impl TermMatrix {
    /// Count terms of every document, keeping those found in at least
    /// `min_df` documents.
    pub fn build(
        docs: &[&str],
        stopwords: &HashSet<String>,
        min_df: usize,
    ) -> Result<Self, AnalysisError> {
        if docs.is_empty() {
            return Err(AnalysisError::EmptyCorpus);
        }

        let counted: Vec<HashMap<String, u32>> = docs
            .iter()
            .map(|doc| {
                let mut counts = HashMap::new();
                for term in terms(doc, stopwords) {
                    *counts.entry(term).or_insert(0) += 1;
                }
                counts
            })
            .collect();

        let mut df: BTreeMap<&str, usize> = BTreeMap::new();
        for counts in &counted {
            for term in counts.keys() {
                *df.entry(term.as_str()).or_insert(0) += 1;
            }
        }
        if df.is_empty() {
            return Err(AnalysisError::EmptyVocabulary { min_df });
        }

        let kept: Vec<(&str, usize)> = df.into_iter().filter(|(_, n)| *n >= min_df).collect();
        if kept.is_empty() {
            return Err(AnalysisError::EmptyVocabulary { min_df });
        }
        let index: HashMap<&str, usize> =
            kept.iter().enumerate().map(|(i, (t, _))| (*t, i)).collect();

        let rows = counted
            .iter()
            .map(|counts| {
                let mut row: Vec<(usize, u32)> = counts
                    .iter()
                    .filter_map(|(t, n)| index.get(t.as_str()).map(|&i| (i, *n)))
                    .collect();
                row.sort_unstable();
                row
            })
            .collect();

        Ok(TermMatrix {
            vocabulary: kept.iter().map(|(t, _)| t.to_string()).collect(),
            doc_freq: kept.iter().map(|(_, n)| *n).collect(),
            rows,
        })
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn n_docs(&self) -> usize {
        self.rows.len()
    }

    /// Raw occurrences of each term across the corpus.
    pub fn term_totals(&self) -> Vec<f64> {
        let mut totals = vec![0.0; self.vocabulary.len()];
        for row in &self.rows {
            for &(i, n) in row {
                totals[i] += f64::from(n);
            }
        }
        totals
    }

    /// Smoothed inverse document frequency: `ln((1 + n) / (1 + df)) + 1`.
    pub fn idf(&self) -> Vec<f64> {
        let n = self.n_docs() as f64;
        self.doc_freq
            .iter()
            .map(|&df| ((1.0 + n) / (1.0 + df as f64)).ln() + 1.0)
            .collect()
    }

    /// Per-term sum of the L2-normalised TF-IDF weights of every document.
    pub fn tfidf_totals(&self) -> Vec<f64> {
        let idf = self.idf();
        let mut totals = vec![0.0; self.vocabulary.len()];
        for row in &self.rows {
            let weights: Vec<(usize, f64)> =
                row.iter().map(|&(i, n)| (i, f64::from(n) * idf[i])).collect();
            let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
            if norm == 0.0 {
                continue;
            }
            for (i, w) in weights {
                totals[i] += w / norm;
            }
        }
        totals
    }
}

// ── Tests ──
