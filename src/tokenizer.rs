use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::info;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::error::{PreprocessError, Result};
use crate::text::{text_to_word_sequence, TextSplitConfig};

/// Placeholder that occupies index 0 while the vocabulary is ranked, so real
/// words start at 1. Index 0 is left for padding.
#[cfg(feature = "with_tokenizers")]
const RESERVED_TOKEN: &str = "[PAD]";

/// Tokenizer options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizerConfig {
    /// Only indices below this bound are emitted when converting texts.
    /// The fitted index itself keeps every word.
    pub num_words: Option<usize>,
    #[serde(flatten)]
    pub split: TextSplitConfig,
    /// Treat every character as a token instead of splitting into words.
    pub char_level: bool,
    /// Replacement for out-of-vocabulary words. It takes index 1 when set.
    pub oov_token: Option<String>,
}

/// Weighting used by [`Tokenizer::sequences_to_matrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MatrixMode {
    #[default]
    Binary,
    Count,
    Freq,
    Tfidf,
}

impl FromStr for MatrixMode {
    type Err = PreprocessError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "binary" => Ok(MatrixMode::Binary),
            "count" => Ok(MatrixMode::Count),
            "freq" => Ok(MatrixMode::Freq),
            "tfidf" => Ok(MatrixMode::Tfidf),
            other => Err(PreprocessError::config(format!(
                "mode must be one of binary, count, freq, tfidf; got \"{}\"",
                other
            ))),
        }
    }
}

/// Word tokenizer that indexes words by descending corpus frequency.
///
/// Ranking is delegated to the `tokenizers` crate's word-level trainer; this
/// type keeps the resulting index plus the per-document statistics needed
/// for tf-idf weighting.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Tokenizer {
    config: TokenizerConfig,
    word_index: HashMap<String, usize>,
    index_word: HashMap<usize, String>,
    word_docs: HashMap<String, u64>,
    index_docs: HashMap<usize, u64>,
    document_count: u64,
}

impl Tokenizer {
    pub fn new(config: TokenizerConfig) -> Result<Self> {
        config.split.validate()?;
        if config.num_words == Some(0) {
            return Err(PreprocessError::config("num_words must be positive when set"));
        }
        Ok(Tokenizer {
            config,
            ..Default::default()
        })
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    fn split_text(config: &TokenizerConfig, text: &str) -> Result<Vec<String>> {
        if config.char_level {
            let text = if config.split.lower { text.to_lowercase() } else { text.to_string() };
            return Ok(text.chars().map(String::from).collect());
        }
        text_to_word_sequence(text, &config.split)
    }

    /// Build the word index from `texts`. Any previously fitted vocabulary
    /// and document statistics are replaced.
    pub fn fit_on_texts<S>(&mut self, texts: &[S]) -> Result<()>
    where
        S: AsRef<str> + Sync,
    {
        let vocab = train_vocabulary(&self.config, texts)?;

        self.word_docs.clear();
        for text in texts {
            let words = Self::split_text(&self.config, text.as_ref())?;
            let unique: HashSet<String> = words.into_iter().collect();
            for w in unique {
                *self.word_docs.entry(w).or_default() += 1;
            }
        }
        self.document_count = texts.len() as u64;

        self.word_index = vocab
            .into_iter()
            .filter(|(_, id)| *id != 0)
            .map(|(w, id)| (w, id as usize))
            .collect();
        self.index_word = self.word_index.iter().map(|(w, &i)| (i, w.clone())).collect();
        self.index_docs = self
            .word_docs
            .iter()
            .filter_map(|(w, &c)| self.word_index.get(w).map(|&i| (i, c)))
            .collect();

        info!(
            "Tokenizer fitted: documents={} words={} num_words={:?} oov_token={:?}",
            self.document_count,
            self.word_index.len(),
            self.config.num_words,
            self.config.oov_token
        );
        Ok(())
    }

    /// Add document statistics for already-indexed sequences; used by tf-idf.
    pub fn fit_on_sequences(&mut self, sequences: &[Vec<usize>]) {
        self.document_count += sequences.len() as u64;
        for seq in sequences {
            let unique: HashSet<usize> = seq.iter().copied().collect();
            for i in unique {
                *self.index_docs.entry(i).or_default() += 1;
            }
        }
    }

    fn oov_index(&self) -> Option<usize> {
        self.config
            .oov_token
            .as_ref()
            .and_then(|t| self.word_index.get(t).copied())
    }

    fn within_limit(&self, index: usize) -> bool {
        self.config.num_words.map_or(true, |n| index < n)
    }

    /// Convert texts to index sequences. Unknown words and words at or above
    /// `num_words` become the oov index, or are dropped without one.
    pub fn texts_to_sequences<S: AsRef<str>>(&self, texts: &[S]) -> Result<Vec<Vec<usize>>> {
        let oov = self.oov_index();
        texts
            .iter()
            .map(|text| {
                let words = Self::split_text(&self.config, text.as_ref())?;
                Ok(words
                    .iter()
                    .filter_map(|w| match self.word_index.get(w) {
                        Some(&i) if self.within_limit(i) => Some(i),
                        _ => oov,
                    })
                    .collect())
            })
            .collect()
    }

    /// Map index sequences back to space-joined text, with the same
    /// `num_words` and oov rules as [`Tokenizer::texts_to_sequences`].
    pub fn sequences_to_texts(&self, sequences: &[Vec<usize>]) -> Vec<String> {
        let oov_word = self
            .oov_index()
            .and_then(|i| self.index_word.get(&i))
            .map(String::as_str);
        sequences
            .iter()
            .map(|seq| {
                seq.iter()
                    .filter_map(|i| match self.index_word.get(i) {
                        Some(w) if self.within_limit(*i) => Some(w.as_str()),
                        _ => oov_word,
                    })
                    .collect::<Vec<&str>>()
                    .join(" ")
            })
            .collect()
    }

    pub fn texts_to_matrix<S: AsRef<str>>(&self, texts: &[S], mode: MatrixMode) -> Result<Array2<f64>> {
        let sequences = self.texts_to_sequences(texts)?;
        self.sequences_to_matrix(&sequences, mode)
    }

    /// Bag-of-words matrix of shape `(sequences.len(), width)` where width is
    /// `num_words`, or the index size plus one when no limit is configured.
    pub fn sequences_to_matrix(&self, sequences: &[Vec<usize>], mode: MatrixMode) -> Result<Array2<f64>> {
        let width = match self.config.num_words {
            Some(n) => n,
            None if !self.word_index.is_empty() => self.word_index.len() + 1,
            None => {
                return Err(PreprocessError::NotFitted(
                    "specify num_words or fit the tokenizer before building a matrix".to_string(),
                ))
            }
        };
        if mode == MatrixMode::Tfidf && self.document_count == 0 {
            return Err(PreprocessError::NotFitted(
                "fit the tokenizer on some data before using tfidf mode".to_string(),
            ));
        }

        let mut out = Array2::<f64>::zeros((sequences.len(), width));
        for (row, seq) in sequences.iter().enumerate() {
            if seq.is_empty() {
                continue;
            }
            let mut counts: HashMap<usize, u64> = HashMap::new();
            for &j in seq.iter().filter(|&&j| j < width) {
                *counts.entry(j).or_default() += 1;
            }
            for (j, c) in counts {
                out[[row, j]] = match mode {
                    MatrixMode::Binary => 1.0,
                    MatrixMode::Count => c as f64,
                    MatrixMode::Freq => c as f64 / seq.len() as f64,
                    MatrixMode::Tfidf => {
                        let tf = 1.0 + (c as f64).ln();
                        let docs = self.index_docs.get(&j).copied().unwrap_or(0);
                        let idf = (1.0 + self.document_count as f64 / (1.0 + docs as f64)).ln();
                        tf * idf
                    }
                };
            }
        }
        Ok(out)
    }

    pub fn word_index(&self) -> &HashMap<String, usize> {
        &self.word_index
    }

    pub fn index_word(&self, index: usize) -> Option<&str> {
        self.index_word.get(&index).map(String::as_str)
    }

    pub fn token_to_id(&self, token: &str) -> Option<usize> {
        self.word_index.get(token).copied()
    }

    /// Size of the index including the reserved padding slot 0.
    pub fn vocab_size(&self) -> usize {
        self.word_index.len() + 1
    }

    /// Number of documents per word, as counted by the last fit.
    pub fn word_docs(&self) -> &HashMap<String, u64> {
        &self.word_docs
    }

    pub fn document_count(&self) -> u64 {
        self.document_count
    }

    pub fn num_words(&self) -> Option<usize> {
        self.config.num_words
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        fs::write(path.as_ref(), self.to_json()?)?;
        info!("Tokenizer saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let s = fs::read_to_string(path.as_ref())?;
        Self::from_json(&s)
    }
}

#[cfg(feature = "with_tokenizers")]
fn train_vocabulary<S>(config: &TokenizerConfig, texts: &[S]) -> Result<HashMap<String, u32>>
where
    S: AsRef<str> + Sync,
{
    use tokenizers::models::wordlevel::{WordLevel, WordLevelTrainer};
    use tokenizers::{AddedToken, Model, Trainer};

    let mut special_tokens = vec![AddedToken::from(RESERVED_TOKEN, true)];
    if let Some(oov) = &config.oov_token {
        special_tokens.push(AddedToken::from(oov.clone(), true));
    }
    let mut trainer = WordLevelTrainer::builder()
        .min_frequency(0)
        .vocab_size(usize::MAX)
        .show_progress(false)
        .special_tokens(special_tokens)
        .build()
        .map_err(|e| PreprocessError::Tokenizer(e.to_string()))?;

    trainer
        .feed(texts.iter().map(|t| t.as_ref()), |text| {
            Tokenizer::split_text(config, text).map_err(Into::into)
        })
        .map_err(|e| PreprocessError::Tokenizer(e.to_string()))?;

    let mut model = WordLevel::default();
    trainer
        .train(&mut model)
        .map_err(|e| PreprocessError::Tokenizer(e.to_string()))?;
    Ok(model.get_vocab())
}

#[cfg(not(feature = "with_tokenizers"))]
fn train_vocabulary<S>(_config: &TokenizerConfig, _texts: &[S]) -> Result<HashMap<String, u32>>
where
    S: AsRef<str> + Sync,
{
    Err(PreprocessError::FeatureDisabled("with_tokenizers"))
}

#[cfg(all(test, feature = "with_tokenizers"))]
mod tests {
    use super::*;

    fn corpus() -> Vec<&'static str> {
        vec!["The cat sat on the mat.", "The dog ate my homework!", "A cat, a dog."]
    }

    fn fitted(config: TokenizerConfig) -> Tokenizer {
        let mut tok = Tokenizer::new(config).expect("config");
        tok.fit_on_texts(&corpus()).expect("fit");
        tok
    }

    #[test]
    fn most_frequent_word_gets_index_one() {
        let tok = fitted(TokenizerConfig::default());
        assert_eq!(tok.token_to_id("the"), Some(1));
        // "a", "cat", "dog" tie at 2 and are ordered alphabetically
        assert_eq!(tok.token_to_id("a"), Some(2));
        assert_eq!(tok.token_to_id("cat"), Some(3));
        assert_eq!(tok.token_to_id("dog"), Some(4));
        assert_eq!(tok.index_word(1), Some("the"));
        assert_eq!(tok.document_count(), 3);
        assert_eq!(tok.word_docs()["cat"], 2);
        assert!(tok.word_index().values().all(|&i| i != 0));
        assert_eq!(tok.vocab_size(), tok.word_index().len() + 1);
    }

    #[test]
    fn oov_token_takes_index_one() {
        let tok = fitted(TokenizerConfig {
            oov_token: Some("<oov>".to_string()),
            ..Default::default()
        });
        assert_eq!(tok.token_to_id("<oov>"), Some(1));
        assert_eq!(tok.token_to_id("the"), Some(2));
        let seqs = tok.texts_to_sequences(&["the zebra"]).unwrap();
        assert_eq!(seqs, vec![vec![2, 1]]);
        assert_eq!(tok.sequences_to_texts(&seqs), vec!["the <oov>".to_string()]);
    }

    #[test]
    fn num_words_limits_emitted_indices() {
        let tok = fitted(TokenizerConfig {
            num_words: Some(3),
            ..Default::default()
        });
        let seqs = tok.texts_to_sequences(&["the cat a dog"]).unwrap();
        assert_eq!(seqs, vec![vec![1, 2]]);
        assert!(tok.word_index().len() > 3);
    }

    #[test]
    fn char_level_indexes_characters() {
        let tok = fitted(TokenizerConfig {
            char_level: true,
            ..Default::default()
        });
        assert!(tok.token_to_id(" ").is_some());
        assert!(tok.token_to_id("T").is_none());
        assert!(tok.token_to_id("t").is_some());
    }

    #[test]
    fn matrix_modes() {
        let tok = fitted(TokenizerConfig::default());
        let texts = ["the the cat"];
        let width = tok.vocab_size();

        let binary = tok.texts_to_matrix(&texts, MatrixMode::Binary).unwrap();
        assert_eq!(binary.dim(), (1, width));
        assert_eq!(binary[[0, 1]], 1.0);
        assert_eq!(binary[[0, 3]], 1.0);
        assert_eq!(binary.sum(), 2.0);

        let count = tok.texts_to_matrix(&texts, MatrixMode::Count).unwrap();
        assert_eq!(count[[0, 1]], 2.0);

        let freq = tok.texts_to_matrix(&texts, MatrixMode::Freq).unwrap();
        assert!((freq[[0, 1]] - 2.0 / 3.0).abs() < 1e-12);

        let tfidf = tok.texts_to_matrix(&texts, MatrixMode::Tfidf).unwrap();
        // "the" appears in 2 of 3 documents
        let expected = (1.0 + 2f64.ln()) * (1.0 + 3.0 / 3.0f64).ln();
        assert!((tfidf[[0, 1]] - expected).abs() < 1e-12);
    }

    #[test]
    fn fit_on_sequences_feeds_tfidf() {
        let mut tok = Tokenizer::new(TokenizerConfig {
            num_words: Some(4),
            ..Default::default()
        })
        .unwrap();
        assert!(tok.sequences_to_matrix(&[vec![1]], MatrixMode::Tfidf).is_err());
        tok.fit_on_sequences(&[vec![1, 2], vec![2, 3]]);
        assert_eq!(tok.document_count(), 2);
        let m = tok.sequences_to_matrix(&[vec![2, 9]], MatrixMode::Tfidf).unwrap();
        let expected = (1.0 + 2.0 / 3.0f64).ln();
        assert!((m[[0, 2]] - expected).abs() < 1e-12);
    }

    #[test]
    fn json_round_trip_preserves_index() {
        let tok = fitted(TokenizerConfig {
            oov_token: Some("<unk>".to_string()),
            num_words: Some(10),
            ..Default::default()
        });
        let restored = Tokenizer::from_json(&tok.to_json().unwrap()).unwrap();
        assert_eq!(restored, tok);
        assert_eq!(
            restored.texts_to_sequences(&["my homework"]).unwrap(),
            tok.texts_to_sequences(&["my homework"]).unwrap()
        );
    }

    #[test]
    fn refit_replaces_vocabulary() {
        let mut tok = fitted(TokenizerConfig::default());
        tok.fit_on_texts(&["zebra zebra"]).unwrap();
        assert_eq!(tok.token_to_id("zebra"), Some(1));
        assert_eq!(tok.token_to_id("cat"), None);
        assert_eq!(tok.document_count(), 1);
    }
}

#[cfg(test)]
mod config_tests {
    use super::*;

    #[test]
    fn rejects_zero_num_words_and_empty_split() {
        assert!(Tokenizer::new(TokenizerConfig {
            num_words: Some(0),
            ..Default::default()
        })
        .is_err());
        let mut cfg = TokenizerConfig::default();
        cfg.split.split = String::new();
        assert!(Tokenizer::new(cfg).is_err());
    }

    #[test]
    fn unfitted_tokenizer_has_no_matrix_width() {
        let tok = Tokenizer::new(TokenizerConfig::default()).unwrap();
        let err = tok.sequences_to_matrix(&[vec![1]], MatrixMode::Count).unwrap_err();
        assert!(matches!(err, PreprocessError::NotFitted(_)));
        assert!("bag".parse::<MatrixMode>().is_err());
    }
}
