//! Text splitting and hashed word encoding.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{PreprocessError, Result};

/// Punctuation, tab and newline: the characters stripped from text by default.
pub const DEFAULT_FILTERS: &str = "!\"#$%&()*+,-./:;<=>?@[\\]^_`{|}~\t\n";

/// How raw text is broken into words.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSplitConfig {
    /// Every character in this string is replaced by `split` before splitting.
    pub filters: String,
    pub lower: bool,
    /// Word separator.
    pub split: String,
}

impl Default for TextSplitConfig {
    fn default() -> Self {
        TextSplitConfig {
            filters: DEFAULT_FILTERS.to_string(),
            lower: true,
            split: " ".to_string(),
        }
    }
}

impl TextSplitConfig {
    pub fn validate(&self) -> Result<()> {
        if self.split.is_empty() {
            return Err(PreprocessError::config("split separator must not be empty"));
        }
        Ok(())
    }
}

/// Split `text` into words: lowercase (optionally), replace filter
/// characters with the separator, split, and drop empty pieces.
pub fn text_to_word_sequence(text: &str, config: &TextSplitConfig) -> Result<Vec<String>> {
    config.validate()?;
    let text = if config.lower { text.to_lowercase() } else { text.to_string() };
    let mut replaced = String::with_capacity(text.len());
    for c in text.chars() {
        if config.filters.contains(c) {
            replaced.push_str(&config.split);
        } else {
            replaced.push(c);
        }
    }
    Ok(replaced
        .split(config.split.as_str())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect())
}

/// Hash used by [`hashing_trick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashFunction {
    /// std SipHash with fixed keys. Stable within a build, not across Rust releases.
    #[default]
    Default,
    /// MD5 digest read as a big-endian 128-bit integer. Stable everywhere.
    Md5,
}

impl HashFunction {
    fn hash_word(&self, word: &str) -> u128 {
        match self {
            HashFunction::Default => {
                let mut hasher = DefaultHasher::new();
                word.hash(&mut hasher);
                u128::from(hasher.finish())
            }
            HashFunction::Md5 => u128::from_be_bytes(md5::compute(word.as_bytes()).0),
        }
    }
}

impl FromStr for HashFunction {
    type Err = PreprocessError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "hash" | "default" => Ok(HashFunction::Default),
            "md5" => Ok(HashFunction::Md5),
            other => Err(PreprocessError::config(format!(
                "hash_function must be \"hash\" or \"md5\", got \"{}\"",
                other
            ))),
        }
    }
}

/// Map every word of `text` to `hash(word) mod (n - 1) + 1`. Distinct words
/// may collide; index 0 is never produced.
pub fn hashing_trick(text: &str, n: usize, hash_function: HashFunction, config: &TextSplitConfig) -> Result<Vec<usize>> {
    if n < 2 {
        return Err(PreprocessError::config(format!(
            "hashing space size must be at least 2, got {}",
            n
        )));
    }
    let buckets = (n - 1) as u128;
    Ok(text_to_word_sequence(text, config)?
        .iter()
        .map(|w| (hash_function.hash_word(w) % buckets) as usize + 1)
        .collect())
}

/// One-hot encode a text into word indices in `[1, n)` using the default hash.
pub fn one_hot(text: &str, n: usize, config: &TextSplitConfig) -> Result<Vec<usize>> {
    hashing_trick(text, n, HashFunction::Default, config)
}
