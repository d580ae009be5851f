use regex::Regex;
use std::collections::BTreeMap;
use std::sync::LazyLock;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\p{L}\p{N}]+").expect("word pattern is valid"));

/// Shortest word that is worth a posting.
pub const MIN_WORD_CHARS: usize = 3;

/// Where and how often a word occurs in one text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordStat {
    pub hits: u32,
    /// Index of the first occurrence among all indexable words.
    pub first_position: u32,
}

/// Lowercased indexable words in text order, repeats included.
pub fn tokenize(text: &str) -> Vec<String> {
    WORD.find_iter(&text.to_lowercase())
        .map(|m| m.as_str().to_string())
        .filter(|word| word.chars().count() >= MIN_WORD_CHARS)
        .collect()
}

/// A text reduced to its distinct words.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Condensed {
    pub words: BTreeMap<String, WordStat>,
    pub word_count: u32,
}

pub fn condense(text: &str) -> Condensed {
    let mut words: BTreeMap<String, WordStat> = BTreeMap::new();
    let mut word_count = 0u32;

    for (position, word) in tokenize(text).into_iter().enumerate() {
        word_count += 1;
        words
            .entry(word)
            .and_modify(|stat| stat.hits += 1)
            .or_insert(WordStat {
                hits: 1,
                first_position: position as u32,
            });
    }

    Condensed { words, word_count }
}
