//! Sequence preprocessing: padding/truncation to a fixed width and skip-gram
//! pair generation.

mod padding;
mod skipgrams;

pub use padding::{
    pad_sequences, resolve_maxlen, AsToken, PadConfig, PaddedMatrix, Padding, SequenceElement, Truncating,
};
pub use skipgrams::{make_sampling_table, skipgrams, SkipgramConfig, Skipgrams};
