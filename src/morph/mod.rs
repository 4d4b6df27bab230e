//! Morphological analysis
//!
//! Maps a lower-cased token to its dictionary forms and part of speech.
//! The default analyzer pairs a function-word lexicon with Snowball stemming,
//! choosing the Russian or English stemmer from the token's script.

mod lexicon;

use rust_stemmers::{Algorithm, Stemmer};

/// Coarse part-of-speech tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartOfSpeech {
    Preposition,
    Conjunction,
    Particle,
    Interjection,
    Article,
    Other,
}

impl PartOfSpeech {
    /// Purely functional words carry no search meaning
    pub fn is_functional(&self) -> bool {
        !matches!(self, PartOfSpeech::Other)
    }
}

/// One analysis of a word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordForm {
    pub lemma: String,
    pub part_of_speech: PartOfSpeech,
}

/// Morphological analyzer interface
pub trait Morphology: Send + Sync {
    /// All analyses of a lower-cased word, or `None` if the word cannot be analyzed
    fn analyze(&self, word: &str) -> Option<Vec<WordForm>>;

    /// Dictionary forms of a word, in analysis order
    fn normal_forms(&self, word: &str) -> Vec<String> {
        self.analyze(word)
            .map(|forms| forms.into_iter().map(|f| f.lemma).collect())
            .unwrap_or_default()
    }

    /// Words of `vocabulary` that are inflected forms of `lemma`, distinct
    /// and in vocabulary order
    fn inflections(&self, lemma: &str, vocabulary: &[String]) -> Vec<String> {
        let mut forms: Vec<String> = Vec::new();
        for word in vocabulary {
            if forms.contains(word) {
                continue;
            }
            if self.normal_forms(word).iter().any(|form| form == lemma) {
                forms.push(word.clone());
            }
        }
        forms
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Script {
    Cyrillic,
    Latin,
}

fn detect_script(word: &str) -> Option<Script> {
    let mut script = None;
    for c in word.chars() {
        let current = match c {
            'а'..='я' | 'ё' => Script::Cyrillic,
            'a'..='z' => Script::Latin,
            '-' | '\'' => continue,
            _ => return None,
        };
        match script {
            None => script = Some(current),
            Some(s) if s != current => return None,
            Some(_) => {}
        }
    }
    script
}

/// Snowball-stemming analyzer for Russian and English text
pub struct SnowballMorphology {
    russian: Stemmer,
    english: Stemmer,
}

impl SnowballMorphology {
    pub fn new() -> Self {
        Self {
            russian: Stemmer::create(Algorithm::Russian),
            english: Stemmer::create(Algorithm::English),
        }
    }
}

impl Default for SnowballMorphology {
    fn default() -> Self {
        Self::new()
    }
}

impl Morphology for SnowballMorphology {
    fn analyze(&self, word: &str) -> Option<Vec<WordForm>> {
        let script = detect_script(word)?;

        if let Some(pos) = lexicon::lookup(word) {
            return Some(vec![WordForm {
                lemma: word.to_string(),
                part_of_speech: pos,
            }]);
        }

        let lemma = match script {
            Script::Cyrillic => {
                let folded = word.replace('ё', "е");
                self.russian.stem(&folded).into_owned()
            }
            Script::Latin => self.english.stem(word).into_owned(),
        };
        if lemma.is_empty() {
            return None;
        }

        Some(vec![WordForm {
            lemma,
            part_of_speech: PartOfSpeech::Other,
        }])
    }
}
