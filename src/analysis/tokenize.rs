use std::collections::{BTreeSet, HashSet};
use std::sync::LazyLock;

use regex::Regex;

/// Letter-only terms of four or more characters, accented vowels included.
static TERM_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b[a-zA-ZÁÉÍÓÚáéíóú]{4,}\b").unwrap());

/// Any word of two or more word characters.
static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b\w\w+\b").unwrap());

/// Terms fed to the TF-IDF and frequency vectorizers, in document order.
pub fn terms(doc: &str, stopwords: &HashSet<String>) -> Vec<String> {
    matches(&TERM_RE, doc, stopwords)
}

/// Distinct keyword candidates of a document, sorted.
pub fn candidate_words(doc: &str, stopwords: &HashSet<String>) -> BTreeSet<String> {
    matches(&WORD_RE, doc, stopwords).into_iter().collect()
}

fn matches(re: &Regex, doc: &str, stopwords: &HashSet<String>) -> Vec<String> {
    let lowered = doc.to_lowercase();
    re.find_iter(&lowered)
        .map(|m| m.as_str())
        .filter(|t| !stopwords.contains(*t))
        .map(str::to_string)
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn stop() -> HashSet<String> {
        ["para", "porque", "está"].iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn terms_are_lowercased_and_long() {
        let t = terms("El JUEGO es una trampa, Juego y más juego.", &stop());
        assert_eq!(t, vec!["juego", "trampa", "juego", "juego"]);
    }

    #[test]
    fn accented_vowels_kept() {
        let t = terms("Adicción y recaída", &stop());
        assert_eq!(t, vec!["adicción", "recaída"]);
    }

    #[test]
    fn words_with_other_letters_dropped() {
        // ñ and ü are word characters outside the term class
        let t = terms("España pingüino niños casa", &stop());
        assert_eq!(t, vec!["casa"]);
    }

    #[test]
    fn digits_break_terms() {
        assert!(terms("abcd1234 casa2", &stop()).is_empty());
    }

    #[test]
    fn stopwords_removed() {
        let t = terms("Porque está para siempre", &stop());
        assert_eq!(t, vec!["siempre"]);
    }

    #[test]
    fn candidates_are_distinct_words() {
        let c = candidate_words("Ya no juego, NO juego; año 2010 y ñu", &stop());
        let v: Vec<&str> = c.iter().map(String::as_str).collect();
        assert_eq!(v, vec!["2010", "año", "juego", "no", "ya", "ñu"]);
    }
}
