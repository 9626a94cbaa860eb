//! Morphological normalization backends
//!
//! The lemmatizer never looks at word structure itself; it asks a
//! [`Morphology`] implementation for normal forms and for the part-of-speech
//! question it cares about (is this a function word?).

use rust_stemmers::{Algorithm, Stemmer};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// A pluggable word normalizer
pub trait Morphology: Send + Sync {
    /// Returns candidate normal forms for a lowercase word, most likely first
    fn normal_forms(&self, word: &str) -> Vec<String>;

    /// Returns true for conjunctions, prepositions, particles and interjections
    fn is_function_word(&self, word: &str) -> bool;
}

/// Russian conjunctions, prepositions, particles and interjections
const RUSSIAN_FUNCTION_WORDS: &[&str] = &[
    // conjunctions
    "и", "а", "но", "да", "или", "либо", "ни", "что", "чтобы", "как", "если", "то",
    "тоже", "также", "зато", "однако", "когда", "пока", "хотя", "будто", "словно",
    "потому", "поэтому", "причем", "притом", "итак", "нежели", "едва",
    // prepositions
    "в", "во", "на", "с", "со", "к", "ко", "по", "за", "из", "изо", "от", "ото", "до",
    "о", "об", "обо", "у", "для", "без", "безо", "под", "подо", "над", "надо", "при",
    "про", "через", "между", "перед", "передо", "около", "вокруг", "после", "среди",
    "сквозь", "вдоль", "возле", "кроме", "ради", "вместо", "против",
    // particles
    "не", "же", "ли", "бы", "б", "ж", "ль", "вот", "вон", "лишь", "только", "даже",
    "уже", "ещё", "еще", "разве", "неужели", "ведь", "пусть", "пускай", "давай",
    // interjections
    "ах", "ох", "эх", "ой", "ай", "ух", "ого", "ну", "ага", "увы", "ура", "эй", "ау",
    "фу", "брр", "ишь",
];

/// Russian morphology: an optional form→lemma dictionary backed by the
/// Snowball Russian stemmer
pub struct RussianMorphology {
    stemmer: Stemmer,
    dictionary: HashMap<String, String>,
    function_words: HashSet<&'static str>,
}

impl RussianMorphology {
    /// Creates a stemmer-only morphology
    pub fn new() -> Self {
        Self {
            stemmer: Stemmer::create(Algorithm::Russian),
            dictionary: HashMap::new(),
            function_words: RUSSIAN_FUNCTION_WORDS.iter().copied().collect(),
        }
    }

    /// Creates a morphology that consults a `form<TAB>lemma` file first
    ///
    /// # Errors
    ///
    /// Returns an IO error if the file cannot be read. Malformed lines are
    /// skipped.
    pub fn with_dictionary(path: &Path) -> std::io::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::new().with_entries(parse_dictionary(&content)))
    }

    /// Adds dictionary entries, overriding earlier ones for the same form
    pub fn with_entries(mut self, entries: impl IntoIterator<Item = (String, String)>) -> Self {
        self.dictionary.extend(entries);
        self
    }

    /// Number of dictionary overrides loaded
    pub fn dictionary_len(&self) -> usize {
        self.dictionary.len()
    }
}

impl Default for RussianMorphology {
    fn default() -> Self {
        Self::new()
    }
}

impl Morphology for RussianMorphology {
    fn normal_forms(&self, word: &str) -> Vec<String> {
        let mut forms = Vec::with_capacity(2);
        if let Some(lemma) = self.dictionary.get(word) {
            forms.push(lemma.clone());
        }

        let stem = self.stemmer.stem(word).into_owned();
        if !stem.is_empty() && !forms.contains(&stem) {
            forms.push(stem);
        }

        forms
    }

    fn is_function_word(&self, word: &str) -> bool {
        self.function_words.contains(word)
    }
}

/// Parses `form<TAB>lemma` lines; blank lines and `#` comments are ignored
fn parse_dictionary(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .filter_map(|line| {
            let (form, lemma) = line.split_once('\t')?;
            let form = form.trim().to_lowercase().replace('ё', "е");
            let lemma = lemma.trim().to_lowercase().replace('ё', "е");
            if form.is_empty() || lemma.is_empty() {
                None
            } else {
                Some((form, lemma))
            }
        })
        .collect()
}
