use log::debug;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use crate::error::{PreprocessError, Result};

/// Options for [`skipgrams`].
#[derive(Debug, Clone, PartialEq)]
pub struct SkipgramConfig {
    /// Distance between the target word and the furthest context word.
    pub window_size: usize,
    /// Ratio of negative pairs to positive pairs.
    pub negative_samples: f64,
    pub shuffle: bool,
    /// Keep probability per word rank, usually from [`make_sampling_table`].
    pub sampling_table: Option<Vec<f64>>,
    pub seed: Option<u64>,
}

impl Default for SkipgramConfig {
    fn default() -> Self {
        SkipgramConfig {
            window_size: 4,
            negative_samples: 1.0,
            shuffle: true,
            sampling_table: None,
            seed: None,
        }
    }
}

/// Word pairs and their labels (1 for a true context pair, 0 for a negative sample).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Skipgrams {
    pub couples: Vec<(usize, usize)>,
    pub labels: Vec<u8>,
}

impl Skipgrams {
    /// Labels as two-class one-hot rows: `[1, 0]` for negatives, `[0, 1]` for positives.
    pub fn categorical_labels(&self) -> Vec<[u8; 2]> {
        self.labels.iter().map(|&l| [1 - l, l]).collect()
    }

    pub fn len(&self) -> usize {
        self.couples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.couples.is_empty()
    }
}

/// Generate (target, context) word pairs from a sequence of word indices.
///
/// Index 0 is treated as padding and never paired. With a sampling table,
/// each target word `w` is kept with probability `table[w]`.
pub fn skipgrams(sequence: &[usize], vocabulary_size: usize, config: &SkipgramConfig) -> Result<Skipgrams> {
    if !config.negative_samples.is_finite() || config.negative_samples < 0.0 {
        return Err(PreprocessError::config(format!(
            "negative_samples must be a non-negative number, got {}",
            config.negative_samples
        )));
    }
    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    };

    let mut couples = Vec::new();
    for (i, &wi) in sequence.iter().enumerate() {
        if wi == 0 {
            continue;
        }
        if let Some(table) = &config.sampling_table {
            let keep = table.get(wi).copied().unwrap_or(1.0);
            if keep < rng.random::<f64>() {
                continue;
            }
        }
        let start = i.saturating_sub(config.window_size);
        let end = i
            .saturating_add(config.window_size)
            .saturating_add(1)
            .min(sequence.len());
        for (j, &wj) in sequence.iter().enumerate().take(end).skip(start) {
            if j != i && wj != 0 {
                couples.push((wi, wj));
            }
        }
    }
    let mut labels = vec![1u8; couples.len()];

    let num_negative = (labels.len() as f64 * config.negative_samples) as usize;
    if num_negative > 0 {
        if vocabulary_size < 2 {
            return Err(PreprocessError::config(format!(
                "vocabulary_size must be at least 2 to draw negative samples, got {}",
                vocabulary_size
            )));
        }
        let mut words: Vec<usize> = couples.iter().map(|c| c.0).collect();
        words.shuffle(&mut rng);
        for k in 0..num_negative {
            couples.push((words[k % words.len()], rng.random_range(1..vocabulary_size)));
        }
        labels.resize(labels.len() + num_negative, 0);
    }

    if config.shuffle {
        let mut order: Vec<usize> = (0..couples.len()).collect();
        order.shuffle(&mut rng);
        couples = order.iter().map(|&k| couples[k]).collect();
        labels = order.iter().map(|&k| labels[k]).collect();
    }

    debug!(
        "skipgrams: sequence_len={} pairs={} negatives={}",
        sequence.len(),
        couples.len(),
        num_negative
    );
    Ok(Skipgrams { couples, labels })
}

/// Word-rank based keep probabilities for [`skipgrams`], following a Zipf
/// approximation of word frequencies. Entry `i` is the probability of
/// keeping the `i`-th most common word.
pub fn make_sampling_table(size: usize, sampling_factor: f64) -> Vec<f64> {
    const GAMMA: f64 = 0.577;
    (0..size)
        .map(|i| {
            let rank = i.max(1) as f64;
            let inv_fq = rank * (rank.ln() + GAMMA) + 0.5 - 1.0 / (12.0 * rank);
            let f = sampling_factor * inv_fq;
            (f / f.sqrt()).min(1.0)
        })
        .collect()
}
