//! Lemma extraction
//!
//! Turns text (or raw HTML) into a map from dictionary form to the number of
//! times it occurs. Function words and tokens the analyzer cannot handle are
//! dropped.

use crate::morph::Morphology;
use crate::parse::visible_text;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Lower-cased tokens: maximal runs of letters and digits
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(|token| token.to_lowercase())
}

/// Lemma extractor backed by a shared morphological analyzer
#[derive(Clone)]
pub struct LemmaExtractor {
    morphology: Arc<dyn Morphology>,
}

impl LemmaExtractor {
    pub fn new(morphology: Arc<dyn Morphology>) -> Self {
        Self { morphology }
    }

    pub fn morphology(&self) -> &Arc<dyn Morphology> {
        &self.morphology
    }

    /// Dictionary form of one lower-cased token, or `None` for function
    /// words and tokens that fail analysis
    pub fn lemma_of(&self, word: &str) -> Option<String> {
        let forms = self.morphology.analyze(word)?;
        if forms.iter().any(|form| form.part_of_speech.is_functional()) {
            return None;
        }
        forms.into_iter().next().map(|form| form.lemma)
    }

    /// Count lemma occurrences in plain text
    pub fn collect_lemmas(&self, text: &str) -> HashMap<String, usize> {
        let mut lemmas = HashMap::new();
        for token in tokenize(text) {
            if let Some(lemma) = self.lemma_of(&token) {
                *lemmas.entry(lemma).or_insert(0) += 1;
            }
        }
        lemmas
    }

    /// Count lemma occurrences in the visible text of an HTML document
    pub fn lemmas_from_html(&self, html: &str) -> HashMap<String, usize> {
        self.collect_lemmas(&visible_text(html))
    }

    /// Distinct lemmas of a query, in order of first appearance
    pub fn lemma_set(&self, text: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        tokenize(text)
            .filter_map(|token| self.lemma_of(&token))
            .filter(|lemma| seen.insert(lemma.clone()))
            .collect()
    }

    /// Words of `text` that inflect `lemma`, lower-cased, distinct and in
    /// order of first appearance
    pub fn inflections_in(&self, text: &str, lemma: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let vocabulary: Vec<String> = tokenize(text)
            .filter(|token| seen.insert(token.clone()))
            .collect();
        self.morphology.inflections(lemma, &vocabulary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morph::SnowballMorphology;

    fn extractor() -> LemmaExtractor {
        LemmaExtractor::new(Arc::new(SnowballMorphology::new()))
    }

    #[test]
    fn test_tokenize() {
        let tokens: Vec<String> = tokenize("Hello, World! 42 times-over").collect();
        assert_eq!(tokens, vec!["hello", "world", "42", "times", "over"]);
    }

    #[test]
    fn test_collect_lemmas_counts_forms() {
        let lemmas = extractor().collect_lemmas("The dog and the dogs. A cat!");
        assert_eq!(lemmas.get("dog"), Some(&2));
        assert_eq!(lemmas.get("cat"), Some(&1));
        assert!(!lemmas.contains_key("the"));
        assert!(!lemmas.contains_key("and"));
    }

    #[test]
    fn test_collect_lemmas_russian() {
        let lemmas = extractor().collect_lemmas("Повторное появление леопарда в Осетии и леопарды");
        let e = extractor();
        let leopard = e.lemma_of("леопарда").unwrap();
        assert_eq!(lemmas.get(&leopard), Some(&2));
        // "в" and "и" are function words
        assert!(!lemmas.contains_key("в"));
        assert!(!lemmas.contains_key("и"));
    }

    #[test]
    fn test_digits_are_dropped() {
        let lemmas = extractor().collect_lemmas("2024 year");
        assert_eq!(lemmas.len(), 1);
    }

    #[test]
    fn test_lemmas_from_html_ignores_boilerplate() {
        let html = "<html><body><nav>dogs</nav><p>cats cats</p><script>dog()</script></body></html>";
        let lemmas = extractor().lemmas_from_html(html);
        assert_eq!(lemmas.len(), 1);
        assert_eq!(lemmas.get("cat"), Some(&2));
    }

    #[test]
    fn test_lemma_set_is_distinct_and_ordered() {
        let set = extractor().lemma_set("dogs chase cats, dog");
        assert_eq!(set.len(), 3);
        assert_eq!(set[0], "dog");
        assert_eq!(set[2], "cat");
    }

    #[test]
    fn test_inflections_in_text() {
        let e = extractor();
        assert_eq!(e.inflections_in("Dog dogs dog cat", "dog"), vec!["dog", "dogs"]);
        assert_eq!(e.inflections_in("Dog dogs dog cat", "cat"), vec!["cat"]);
        assert!(e.inflections_in("Dog dogs", "fish").is_empty());
    }
}
