//! Function-word lexicons
//!
//! Closed word classes are small enough to list. Anything not listed here is
//! treated as a content word and handed to the stemmer.

use super::PartOfSpeech;

const RU_PREPOSITIONS: &[&str] = &[
    "в", "во", "на", "по", "с", "со", "к", "ко", "о", "об", "обо", "от", "ото", "до", "из",
    "изо", "у", "за", "над", "под", "подо", "при", "про", "через", "без", "для", "между",
    "перед", "передо", "около", "вокруг", "после", "среди", "кроме", "вместо", "ради",
    "сквозь", "вдоль", "из-за", "из-под",
];

const RU_CONJUNCTIONS: &[&str] = &[
    "и", "а", "но", "или", "либо", "да", "что", "чтобы", "если", "когда", "как", "потому",
    "поэтому", "зато", "однако", "тоже", "также", "хотя", "будто", "словно", "пока", "ибо",
    "то", "ни", "причем", "притом",
];

const RU_PARTICLES: &[&str] = &[
    "не", "ни", "же", "ли", "бы", "б", "ведь", "вот", "вон", "уж", "даже", "лишь", "только",
    "разве", "неужели", "пусть", "пускай", "ка", "-то", "ж", "мол",
];

const RU_INTERJECTIONS: &[&str] = &[
    "ах", "ох", "эх", "ой", "ай", "ух", "увы", "ура", "эй", "ну", "фу", "ага", "ого", "тьфу",
];

const EN_ARTICLES: &[&str] = &["a", "an", "the"];

const EN_PREPOSITIONS: &[&str] = &[
    "in", "on", "at", "by", "for", "with", "about", "against", "between", "into", "through",
    "during", "before", "after", "above", "below", "to", "from", "up", "down", "of", "off",
    "over", "under", "onto", "upon", "within", "without", "via", "per", "toward", "towards",
    "among", "across", "behind", "beyond", "near",
];

const EN_CONJUNCTIONS: &[&str] = &[
    "and", "or", "but", "nor", "so", "yet", "if", "because", "although", "though", "while",
    "whereas", "unless", "until", "since", "than", "whether", "that",
];

const EN_PARTICLES: &[&str] = &["not", "no"];

const EN_INTERJECTIONS: &[&str] = &["oh", "ah", "wow", "hey", "alas", "oops", "ouch", "hooray"];

/// Look up a lower-cased word in the closed-class tables
pub fn lookup(word: &str) -> Option<PartOfSpeech> {
    let tables: [(&[&str], PartOfSpeech); 9] = [
        (RU_PREPOSITIONS, PartOfSpeech::Preposition),
        (RU_PARTICLES, PartOfSpeech::Particle),
        (RU_CONJUNCTIONS, PartOfSpeech::Conjunction),
        (RU_INTERJECTIONS, PartOfSpeech::Interjection),
        (EN_ARTICLES, PartOfSpeech::Article),
        (EN_PREPOSITIONS, PartOfSpeech::Preposition),
        (EN_CONJUNCTIONS, PartOfSpeech::Conjunction),
        (EN_PARTICLES, PartOfSpeech::Particle),
        (EN_INTERJECTIONS, PartOfSpeech::Interjection),
    ];

    tables
        .iter()
        .find(|(words, _)| words.contains(&word))
        .map(|(_, pos)| *pos)
}
