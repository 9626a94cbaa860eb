//! Highlighted snippet extraction
//!
//! Words whose lemma is one of the query lemmas are wrapped in `<b>…</b>`.
//! The snippet is a character window that starts a little before the first
//! highlighted word.

use crate::lemma::Lemmatizer;
use std::collections::HashSet;

/// Maximum snippet length in characters, ellipses excluded
pub const SNIPPET_LENGTH: usize = 216;

/// Characters of context kept before the first highlighted word
pub const SNIPPET_LEAD: usize = 22;

const MARK_OPEN: &str = "<b>";
const MARK_CLOSE: &str = "</b>";
const ELLIPSIS: &str = "...";

/// Builds the snippet of `text` for a query
///
/// # Arguments
///
/// * `lemmatizer` - Used to lemmatize each word of the text
/// * `query_lemmas` - The query lemmas, rarest first
/// * `text` - Plain text of the page
///
/// # Example
///
/// ```
/// use lemma_search::search::snippet;
/// use lemma_search::Lemmatizer;
///
/// let text = "Мой кот спит.";
/// let lemmas = vec!["кот".to_string()];
/// assert_eq!(snippet(&Lemmatizer::russian(), &lemmas, text), "Мой <b>кот</b> спит.");
/// ```
pub fn snippet(lemmatizer: &Lemmatizer, query_lemmas: &[String], text: &str) -> String {
    let wanted: HashSet<&str> = query_lemmas.iter().map(String::as_str).collect();
    let mut is_match = |word: &str| {
        lemmatizer
            .lemma_of(word)
            .map(|lemma| wanted.contains(lemma.as_str()))
            .unwrap_or(false)
    };

    let mut marked: String = split_blocks(text)
        .map(|block| highlight(block, &mut is_match))
        .collect();

    if !marked.contains(MARK_OPEN) {
        if let Some(rarest) = query_lemmas.first() {
            marked = highlight_similar(text, rarest);
        }
    }

    window(&marked)
}

/// Splits text into sentence-like blocks, terminators kept
fn split_blocks(text: &str) -> impl Iterator<Item = &str> {
    text.split_inclusive(['.', '!', '?'])
}

/// Wraps every alphabetic word accepted by `is_match` in emphasis markers
fn highlight(block: &str, is_match: &mut impl FnMut(&str) -> bool) -> String {
    let mut out = String::with_capacity(block.len());
    let mut word_start: Option<usize> = None;

    for (i, c) in block.char_indices() {
        if c.is_alphabetic() {
            word_start.get_or_insert(i);
            continue;
        }
        if let Some(start) = word_start.take() {
            push_word(&mut out, &block[start..i], is_match);
        }
        out.push(c);
    }
    if let Some(start) = word_start {
        push_word(&mut out, &block[start..], is_match);
    }

    out
}

fn push_word(out: &mut String, word: &str, is_match: &mut impl FnMut(&str) -> bool) {
    if is_match(word) {
        out.push_str(MARK_OPEN);
        out.push_str(word);
        out.push_str(MARK_CLOSE);
    } else {
        out.push_str(word);
    }
}

/// Marks the first word containing the first half of `lemma`
///
/// Used when no word lemmatizes to a query lemma, e.g. when the stored text
/// uses a form the morphology cannot reduce.
fn highlight_similar(text: &str, lemma: &str) -> String {
    let half: String = {
        let chars: Vec<char> = lemma.chars().collect();
        chars[..chars.len().div_ceil(2)].iter().collect()
    };
    if half.is_empty() {
        return text.to_string();
    }

    let mut found = false;
    let mut is_similar = |word: &str| {
        if found {
            return false;
        }
        found = word.to_lowercase().replace('ё', "е").contains(&half);
        found
    };

    highlight(text, &mut is_similar)
}

/// Cuts the snippet window around the first marker
fn window(marked: &str) -> String {
    let chars: Vec<char> = marked.chars().collect();
    let first_marker = marked
        .find(MARK_OPEN)
        .map(|byte| marked[..byte].chars().count())
        .unwrap_or(0);

    let start = first_marker.saturating_sub(SNIPPET_LEAD);
    let end = chars.len().min(start + SNIPPET_LENGTH);

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.extend(&chars[start..end]);
    if end < chars.len() {
        snippet.push_str(ELLIPSIS);
    }
    snippet
}
