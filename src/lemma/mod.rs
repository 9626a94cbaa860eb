//! Lemmatization: raw text to lemma frequency maps
//!
//! The lemmatizer lowercases text, folds `ё` into `е`, keeps only runs of the
//! Cyrillic alphabet and hands each token to a [`Morphology`] backend. The
//! first normal form returned becomes the token's lemma; function words are
//! dropped before they ever reach the index.

mod morphology;

pub use morphology::{Morphology, RussianMorphology};

use crate::config::LemmatizerConfig;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Lemma → occurrence count for one document
pub type LemmaFrequencies = HashMap<String, u32>;

/// Turns text into lemma frequency maps
#[derive(Clone)]
pub struct Lemmatizer {
    morphology: Option<Arc<dyn Morphology>>,
}

impl Lemmatizer {
    /// Creates a lemmatizer over the given morphology backend
    pub fn new(morphology: Arc<dyn Morphology>) -> Self {
        Self {
            morphology: Some(morphology),
        }
    }

    /// Creates a lemmatizer backed by the built-in Russian morphology
    pub fn russian() -> Self {
        Self::new(Arc::new(RussianMorphology::new()))
    }

    /// Creates a lemmatizer whose backend failed to initialize
    ///
    /// Every extraction returns an empty map.
    pub fn unavailable() -> Self {
        Self { morphology: None }
    }

    /// Builds the lemmatizer described by the configuration
    ///
    /// A dictionary that cannot be loaded leaves the lemmatizer unavailable
    /// rather than failing startup; crawling still runs, unindexed.
    pub fn from_config(config: &LemmatizerConfig) -> Self {
        let Some(path) = &config.dictionary else {
            return Self::russian();
        };

        match RussianMorphology::with_dictionary(Path::new(path)) {
            Ok(morphology) => {
                tracing::info!(
                    "Loaded {} dictionary forms from {}",
                    morphology.dictionary_len(),
                    path
                );
                Self::new(Arc::new(morphology))
            }
            Err(e) => {
                tracing::warn!(
                    "Morphology dictionary {} unavailable ({}); pages will not be indexed",
                    path,
                    e
                );
                Self::unavailable()
            }
        }
    }

    /// Returns true if a morphology backend is loaded
    pub fn is_available(&self) -> bool {
        self.morphology.is_some()
    }

    /// Extracts the lemma frequency map of a text
    ///
    /// # Example
    ///
    /// ```
    /// use lemma_search::Lemmatizer;
    ///
    /// let lemmas = Lemmatizer::russian().extract_lemmas("Кот и коты!");
    /// assert_eq!(lemmas.get("кот"), Some(&2));
    /// assert!(!lemmas.contains_key("и"));
    /// ```
    pub fn extract_lemmas(&self, text: &str) -> LemmaFrequencies {
        let mut frequencies = LemmaFrequencies::new();
        let Some(morphology) = &self.morphology else {
            return frequencies;
        };

        let cleaned = clean_text(text);
        for token in cleaned.split_whitespace() {
            if let Some(lemma) = lemma_of_token(morphology.as_ref(), token) {
                *frequencies.entry(lemma).or_insert(0) += 1;
            }
        }

        frequencies
    }

    /// Returns the lemma of a single word, or `None` for function words,
    /// non-alphabet words and an unavailable backend
    pub fn lemma_of(&self, word: &str) -> Option<String> {
        let morphology = self.morphology.as_ref()?;
        let token = fold_word(word);
        if token.is_empty() || !token.chars().all(is_alphabet_char) {
            return None;
        }
        lemma_of_token(morphology.as_ref(), &token)
    }
}

impl std::fmt::Debug for Lemmatizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lemmatizer")
            .field("available", &self.is_available())
            .finish()
    }
}

fn lemma_of_token(morphology: &dyn Morphology, token: &str) -> Option<String> {
    if token.is_empty() || morphology.is_function_word(token) {
        return None;
    }

    morphology
        .normal_forms(token)
        .into_iter()
        .next()
        .filter(|lemma| !lemma.trim().is_empty())
}

/// Returns true for letters of the indexed alphabet (after folding)
pub(crate) fn is_alphabet_char(c: char) -> bool {
    ('а'..='я').contains(&c)
}

fn fold_word(word: &str) -> String {
    word.to_lowercase().replace('ё', "е")
}

/// Lowercases, folds `ё`, and blanks everything outside the alphabet
fn clean_text(text: &str) -> String {
    fold_word(text)
        .chars()
        .map(|c| if is_alphabet_char(c) { c } else { ' ' })
        .collect()
}
