//! Highlighted excerpts for search results

use crate::lemma::{tokenize, LemmaExtractor};
use regex::{Regex, RegexBuilder};

/// Builds a short highlighted excerpt of page text around a query match
#[derive(Clone)]
pub struct SnippetBuilder {
    extractor: LemmaExtractor,
    length: usize,
    lookback: usize,
}

impl SnippetBuilder {
    pub fn new(extractor: LemmaExtractor, length: usize, lookback: usize) -> Self {
        Self {
            extractor,
            length,
            lookback,
        }
    }

    /// Excerpt of `text` around `query`, with matches wrapped in `<b>`.
    ///
    /// A literal whole-word match of the query is preferred. Otherwise the
    /// first query word whose lemma occurs in the text is used, and every
    /// word of the text with that lemma is highlighted. Returns an empty
    /// string when nothing matches.
    pub fn build(&self, text: &str, query: &str) -> String {
        let query = query.trim();
        if query.is_empty() || text.is_empty() {
            return String::new();
        }

        if let Some(excerpt) = self.excerpt_around(text, query) {
            return highlight(&excerpt, &[query.to_string()]).unwrap_or(excerpt);
        }

        self.build_from_lemmas(text, query).unwrap_or_default()
    }

    fn build_from_lemmas(&self, text: &str, query: &str) -> Option<String> {
        let forms = tokenize(query)
            .filter_map(|token| self.extractor.lemma_of(&token))
            .map(|lemma| self.extractor.inflections_in(text, &lemma))
            .find(|forms| !forms.is_empty())?;
        let representative = forms.first()?;

        let excerpt = self.excerpt_around(text, representative)?;
        Some(highlight(&excerpt, &forms).unwrap_or(excerpt))
    }

    /// The matched sentence fitted to the configured length
    fn excerpt_around(&self, text: &str, term: &str) -> Option<String> {
        let (sentence, end) = self.sentence_around(text, term)?;
        Some(fit_to_length(&sentence, &text[end..], self.length))
    }

    /// The sentence containing the first whole-word match of `term`, starting
    /// at most `lookback` characters before it, and the byte offset where the
    /// match ends in `text`
    fn sentence_around(&self, text: &str, term: &str) -> Option<(String, usize)> {
        let pattern = format!(
            r"([^.?!]{{0,{}}}\b{}\b[^.?!]*)([.?!]|$)",
            self.lookback,
            regex::escape(term)
        );
        let re = RegexBuilder::new(&pattern)
            .case_insensitive(true)
            .build()
            .ok()?;
        let caps = re.captures(text)?;
        let end = caps.get(0)?.end();
        let sentence = format!(
            "{}{}",
            caps.get(1).map_or("", |m| m.as_str()),
            caps.get(2).map_or("", |m| m.as_str())
        );
        Some((sentence.trim().to_string(), end))
    }
}

/// Fit a matched sentence to `length` characters: a long sentence is cut,
/// a short one is padded with the text that follows it. An ellipsis marks
/// any text left out after the excerpt.
fn fit_to_length(sentence: &str, following: &str, length: usize) -> String {
    let used = sentence.chars().count();
    if used >= length {
        return trim_to_length(sentence, length);
    }

    let following = following.trim();
    if following.is_empty() {
        return sentence.to_string();
    }
    let remaining = length - used;
    if following.chars().count() <= remaining {
        return format!("{} {}", sentence, following);
    }

    let cut: String = following.chars().take(remaining).collect();
    let cut = match cut.rfind(char::is_whitespace) {
        Some(idx) => cut[..idx].trim_end(),
        None => "",
    };
    if cut.is_empty() {
        format!("{}...", sentence)
    } else {
        format!("{} {}...", sentence, cut)
    }
}

/// Cut `sentence` to at most `length` characters at a word boundary,
/// appending an ellipsis when anything was removed
fn trim_to_length(sentence: &str, length: usize) -> String {
    if sentence.chars().count() <= length {
        return sentence.to_string();
    }

    let cut: String = sentence.chars().take(length).collect();
    let cut = match cut.rfind(char::is_whitespace) {
        Some(idx) if idx > 0 => &cut[..idx],
        _ => cut.as_str(),
    };
    format!("{}...", cut.trim_end())
}

/// Wrap every whole-word, case-insensitive occurrence of any term in `<b>`
fn highlight(excerpt: &str, terms: &[String]) -> Option<String> {
    let alternation = terms
        .iter()
        .filter(|t| !t.is_empty())
        .map(|t| regex::escape(t))
        .collect::<Vec<_>>()
        .join("|");
    if alternation.is_empty() {
        return None;
    }

    let re = Regex::new(&format!(r"(?i)\b(?:{})\b", alternation)).ok()?;
    Some(re.replace_all(excerpt, "<b>$0</b>").into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::morph::SnowballMorphology;
    use std::sync::Arc;

    fn builder() -> SnippetBuilder {
        SnippetBuilder::new(
            LemmaExtractor::new(Arc::new(SnowballMorphology::new())),
            245,
            170,
        )
    }

    #[test]
    fn test_literal_match_is_highlighted() {
        let text = "Intro sentence. The quick dog jumps over the Dog house! Another one.";
        let snippet = builder().build(text, "dog");
        assert_eq!(
            snippet,
            "The quick <b>dog</b> jumps over the <b>Dog</b> house! Another one."
        );
    }

    #[test]
    fn test_lemma_fallback_highlights_all_forms() {
        let text = "Nothing here. Several dogs met another dog in the park. End.";
        let snippet = builder().build(text, "dog owners");
        assert!(snippet.starts_with("Several <b>dogs</b> met another <b>dog</b>"));
    }

    #[test]
    fn test_literal_match_requires_whole_word() {
        // "cat" only occurs inside "category", and no lemma matches either
        let snippet = builder().build("A category of things.", "cat");
        assert_eq!(snippet, "");
    }

    #[test]
    fn test_no_match_returns_empty() {
        assert_eq!(builder().build("Dogs and cats.", "fish"), "");
        assert_eq!(builder().build("Dogs and cats.", "   "), "");
    }

    #[test]
    fn test_long_sentence_is_trimmed_at_word_boundary() {
        let filler = "word ".repeat(100);
        let text = format!("Leopard {}", filler);
        let snippet = builder().build(&text, "leopard");
        assert!(snippet.starts_with("<b>Leopard</b> word"));
        assert!(snippet.ends_with("..."));
        assert!(!snippet.ends_with(" ..."));
    }

    #[test]
    fn test_trim_is_char_safe() {
        let sentence = "леопард ".repeat(60);
        let trimmed = trim_to_length(sentence.trim(), 245);
        assert!(trimmed.chars().count() <= 248);
        assert!(trimmed.ends_with("леопард..."));
    }

    #[test]
    fn test_russian_lemma_fallback() {
        let text = "Повторное появление леопарда в Осетии. Другая новость.";
        let snippet = builder().build(text, "леопарды");
        assert_eq!(
            snippet,
            "Повторное появление <b>леопарда</b> в Осетии. Другая новость."
        );
    }

    #[test]
    fn test_short_sentence_is_padded_with_following_text() {
        let builder = SnippetBuilder::new(
            LemmaExtractor::new(Arc::new(SnowballMorphology::new())),
            40,
            170,
        );
        let text = "Leopard spotted. It was seen near the river bank at dawn. Officials confirmed it.";
        assert_eq!(
            builder.build(text, "leopard"),
            "<b>Leopard</b> spotted. It was seen near the..."
        );
    }

    #[test]
    fn test_fit_to_length() {
        assert_eq!(fit_to_length("Short.", "", 20), "Short.");
        assert_eq!(fit_to_length("Short.", " Rest of it.", 20), "Short. Rest of it.");
        assert_eq!(fit_to_length("Short.", " Unbreakablewordhere", 10), "Short....");
    }
}
