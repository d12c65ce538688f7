use std::fmt;
use std::str::FromStr;

#[cfg(feature = "dtype_f16")]
use half::f16;
use log::debug;
use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::dtype::DType;
use crate::error::{PreprocessError, Result};

/// Side of a sequence that receives fill values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Padding {
    #[default]
    Pre,
    Post,
}

/// Side of an over-long sequence that gets dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Truncating {
    #[default]
    Pre,
    Post,
}

fn parse_side(kind: &str, s: &str) -> Result<bool> {
    match s {
        "pre" => Ok(true),
        "post" => Ok(false),
        other => Err(PreprocessError::config(format!(
            "{} must be \"pre\" or \"post\", got \"{}\"",
            kind, other
        ))),
    }
}

impl FromStr for Padding {
    type Err = PreprocessError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(if parse_side("padding", s)? { Padding::Pre } else { Padding::Post })
    }
}

impl FromStr for Truncating {
    type Err = PreprocessError;

    fn from_str(s: &str) -> Result<Self> {
        Ok(if parse_side("truncating", s)? { Truncating::Pre } else { Truncating::Post })
    }
}

impl fmt::Display for Padding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Padding::Pre => "pre",
            Padding::Post => "post",
        })
    }
}

impl fmt::Display for Truncating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Truncating::Pre => "pre",
            Truncating::Post => "post",
        })
    }
}

/// Options for [`pad_sequences`].
///
/// The defaults pad and truncate at the front, emit `int32` and fill with zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PadConfig {
    /// Width of every output row. `None` uses the longest input sequence.
    pub maxlen: Option<usize>,
    pub dtype: DType,
    pub padding: Padding,
    pub truncating: Truncating,
    /// Value written to padded cells, cast to `dtype`.
    pub fill_value: f64,
}

impl Default for PadConfig {
    fn default() -> Self {
        PadConfig {
            maxlen: None,
            dtype: DType::Int32,
            padding: Padding::Pre,
            truncating: Truncating::Pre,
            fill_value: 0.0,
        }
    }
}

impl PadConfig {
    pub fn with_maxlen(mut self, maxlen: usize) -> Self {
        self.maxlen = Some(maxlen);
        self
    }

    pub fn with_dtype(mut self, dtype: DType) -> Self {
        self.dtype = dtype;
        self
    }

    pub fn with_padding(mut self, padding: Padding) -> Self {
        self.padding = padding;
        self
    }

    pub fn with_truncating(mut self, truncating: Truncating) -> Self {
        self.truncating = truncating;
        self
    }

    pub fn with_fill_value(mut self, fill_value: f64) -> Self {
        self.fill_value = fill_value;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.maxlen == Some(0) {
            return Err(PreprocessError::config("maxlen must be a positive integer, got 0"));
        }
        #[cfg(not(feature = "dtype_f16"))]
        if self.dtype == DType::Float16 {
            return Err(PreprocessError::FeatureDisabled("dtype_f16"));
        }
        Ok(())
    }
}

/// Normalize a caller-supplied `maxlen` that may be absent or non-positive.
pub fn resolve_maxlen(maxlen: Option<i64>) -> Result<Option<usize>> {
    match maxlen {
        None => Ok(None),
        Some(n) if n > 0 => usize::try_from(n)
            .map(Some)
            .map_err(|_| PreprocessError::config(format!("maxlen {} is too large", n))),
        Some(n) => Err(PreprocessError::config(format!(
            "maxlen must be a positive integer, got {}",
            n
        ))),
    }
}

/// A token value before integer coercion, as handed over by a host language.
#[derive(Debug, Clone, PartialEq)]
pub enum SequenceElement {
    Int(i64),
    Float(f64),
    Text(String),
}

impl From<i64> for SequenceElement {
    fn from(v: i64) -> Self {
        SequenceElement::Int(v)
    }
}

impl From<f64> for SequenceElement {
    fn from(v: f64) -> Self {
        SequenceElement::Float(v)
    }
}

impl From<&str> for SequenceElement {
    fn from(v: &str) -> Self {
        SequenceElement::Text(v.to_string())
    }
}

impl From<String> for SequenceElement {
    fn from(v: String) -> Self {
        SequenceElement::Text(v)
    }
}

/// Coercion of a single token to `i64`. The error string describes why the
/// value was rejected.
pub trait AsToken {
    fn as_token(&self) -> std::result::Result<i64, String>;
}

macro_rules! lossless_token {
    ($($t:ty),*) => {
        $(impl AsToken for $t {
            fn as_token(&self) -> std::result::Result<i64, String> {
                Ok(i64::from(*self))
            }
        })*
    };
}

macro_rules! checked_token {
    ($($t:ty),*) => {
        $(impl AsToken for $t {
            fn as_token(&self) -> std::result::Result<i64, String> {
                i64::try_from(*self).map_err(|_| format!("{} is out of the int64 range", self))
            }
        })*
    };
}

lossless_token!(i8, i16, i32, i64, u8, u16, u32);
checked_token!(u64, usize, isize);

fn float_token(v: f64) -> std::result::Result<i64, String> {
    if !v.is_finite() {
        return Err(format!("{} is not a finite number", v));
    }
    if v.fract() != 0.0 {
        return Err(format!("{} is not an integer", v));
    }
    // 2^63 is exactly representable, anything at or above it overflows.
    if v < -9_223_372_036_854_775_808.0 || v >= 9_223_372_036_854_775_808.0 {
        return Err(format!("{} is out of the int64 range", v));
    }
    Ok(v as i64)
}

impl AsToken for f64 {
    fn as_token(&self) -> std::result::Result<i64, String> {
        float_token(*self)
    }
}

impl AsToken for f32 {
    fn as_token(&self) -> std::result::Result<i64, String> {
        float_token(f64::from(*self))
    }
}

impl AsToken for str {
    fn as_token(&self) -> std::result::Result<i64, String> {
        self.trim()
            .parse::<i64>()
            .map_err(|_| format!("\"{}\" is not an integer", self))
    }
}

impl AsToken for String {
    fn as_token(&self) -> std::result::Result<i64, String> {
        self.as_str().as_token()
    }
}

impl AsToken for SequenceElement {
    fn as_token(&self) -> std::result::Result<i64, String> {
        match self {
            SequenceElement::Int(v) => Ok(*v),
            SequenceElement::Float(v) => float_token(*v),
            SequenceElement::Text(s) => s.as_token(),
        }
    }
}

impl<T: AsToken + ?Sized> AsToken for &T {
    fn as_token(&self) -> std::result::Result<i64, String> {
        (**self).as_token()
    }
}

/// Rectangular result of [`pad_sequences`], one variant per output dtype.
#[derive(Debug, Clone, PartialEq)]
pub enum PaddedMatrix {
    Int32(Array2<i32>),
    Int64(Array2<i64>),
    #[cfg(feature = "dtype_f16")]
    Float16(Array2<f16>),
    Float32(Array2<f32>),
    Float64(Array2<f64>),
}

impl PaddedMatrix {
    /// (num_samples, num_timesteps)
    pub fn shape(&self) -> (usize, usize) {
        match self {
            PaddedMatrix::Int32(a) => a.dim(),
            PaddedMatrix::Int64(a) => a.dim(),
            #[cfg(feature = "dtype_f16")]
            PaddedMatrix::Float16(a) => a.dim(),
            PaddedMatrix::Float32(a) => a.dim(),
            PaddedMatrix::Float64(a) => a.dim(),
        }
    }

    pub fn dtype(&self) -> DType {
        match self {
            PaddedMatrix::Int32(_) => DType::Int32,
            PaddedMatrix::Int64(_) => DType::Int64,
            #[cfg(feature = "dtype_f16")]
            PaddedMatrix::Float16(_) => DType::Float16,
            PaddedMatrix::Float32(_) => DType::Float32,
            PaddedMatrix::Float64(_) => DType::Float64,
        }
    }

    pub fn as_int32(&self) -> Option<&Array2<i32>> {
        match self {
            PaddedMatrix::Int32(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_int64(&self) -> Option<&Array2<i64>> {
        match self {
            PaddedMatrix::Int64(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_float32(&self) -> Option<&Array2<f32>> {
        match self {
            PaddedMatrix::Float32(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_float64(&self) -> Option<&Array2<f64>> {
        match self {
            PaddedMatrix::Float64(a) => Some(a),
            _ => None,
        }
    }

    /// Widen every cell to `f64`, whatever the storage type.
    pub fn to_f64_array(&self) -> Array2<f64> {
        match self {
            PaddedMatrix::Int32(a) => a.mapv(f64::from),
            PaddedMatrix::Int64(a) => a.mapv(|v| v as f64),
            #[cfg(feature = "dtype_f16")]
            PaddedMatrix::Float16(a) => a.mapv(f64::from),
            PaddedMatrix::Float32(a) => a.mapv(f64::from),
            PaddedMatrix::Float64(a) => a.clone(),
        }
    }
}

/// Slice of `seq` that survives truncation to `num_timesteps`, together with
/// the index of its first element in `seq`.
fn kept_window(seq: &[i64], num_timesteps: usize, truncating: Truncating) -> (&[i64], usize) {
    if seq.len() <= num_timesteps {
        return (seq, 0);
    }
    match truncating {
        Truncating::Pre => {
            let start = seq.len() - num_timesteps;
            (&seq[start..], start)
        }
        Truncating::Post => (&seq[..num_timesteps], 0),
    }
}

fn fill_rows<A, F>(
    batch: &[Vec<i64>],
    num_timesteps: usize,
    config: &PadConfig,
    fill: A,
    convert: F,
) -> Result<Array2<A>>
where
    A: Clone,
    F: Fn(i64) -> Option<A>,
{
    let mut out = Array2::from_elem((batch.len(), num_timesteps), fill);
    for (i, seq) in batch.iter().enumerate() {
        let (kept, source_offset) = kept_window(seq, num_timesteps, config.truncating);
        let offset = match config.padding {
            Padding::Post => 0,
            Padding::Pre => num_timesteps - kept.len(),
        };
        for (j, &token) in kept.iter().enumerate() {
            out[[i, offset + j]] = convert(token).ok_or_else(|| PreprocessError::InvalidSequenceElement {
                row: i,
                column: source_offset + j,
                reason: format!("{} does not fit in {}", token, config.dtype),
            })?;
        }
    }
    Ok(out)
}

fn coerce_batch<S, T>(sequences: &[S]) -> Result<Vec<Vec<i64>>>
where
    S: AsRef<[T]>,
    T: AsToken,
{
    sequences
        .iter()
        .enumerate()
        .map(|(row, seq)| {
            seq.as_ref()
                .iter()
                .enumerate()
                .map(|(column, el)| {
                    el.as_token()
                        .map_err(|reason| PreprocessError::InvalidSequenceElement { row, column, reason })
                })
                .collect::<Result<Vec<i64>>>()
        })
        .collect()
}

/// Pad and truncate a batch of variable-length sequences into a
/// `(num_samples, num_timesteps)` matrix.
///
/// `num_timesteps` is `config.maxlen` when set, otherwise the length of the
/// longest sequence (zero for an empty batch). Every element of every
/// sequence is coerced to an integer first, so a bad token fails the whole
/// call even if it would have been truncated away.
///
/// ```
/// use preprocessing_engine::sequence::{pad_sequences, PadConfig};
///
/// let m = pad_sequences(&[vec![1, 2, 3], vec![4]], &PadConfig::default()).unwrap();
/// let rows = m.as_int32().unwrap();
/// assert_eq!(rows.row(1).to_vec(), vec![0, 0, 4]);
/// ```
pub fn pad_sequences<S, T>(sequences: &[S], config: &PadConfig) -> Result<PaddedMatrix>
where
    S: AsRef<[T]>,
    T: AsToken,
{
    config.validate()?;
    let batch = coerce_batch(sequences)?;
    let num_timesteps = config
        .maxlen
        .unwrap_or_else(|| batch.iter().map(Vec::len).max().unwrap_or(0));
    debug!(
        "pad_sequences: num_samples={} num_timesteps={} dtype={} padding={} truncating={}",
        batch.len(),
        num_timesteps,
        config.dtype,
        config.padding,
        config.truncating
    );

    let fill = config.fill_value;
    let matrix = match config.dtype {
        DType::Int32 => PaddedMatrix::Int32(fill_rows(&batch, num_timesteps, config, fill as i32, |v| {
            i32::try_from(v).ok()
        })?),
        DType::Int64 => PaddedMatrix::Int64(fill_rows(&batch, num_timesteps, config, fill as i64, Some)?),
        DType::Float32 => PaddedMatrix::Float32(fill_rows(&batch, num_timesteps, config, fill as f32, |v| {
            Some(v as f32)
        })?),
        DType::Float64 => PaddedMatrix::Float64(fill_rows(&batch, num_timesteps, config, fill, |v| {
            Some(v as f64)
        })?),
        #[cfg(feature = "dtype_f16")]
        DType::Float16 => PaddedMatrix::Float16(fill_rows(
            &batch,
            num_timesteps,
            config,
            f16::from_f64(fill),
            |v| Some(f16::from_f64(v as f64)),
        )?),
        #[cfg(not(feature = "dtype_f16"))]
        DType::Float16 => return Err(PreprocessError::FeatureDisabled("dtype_f16")),
    };
    Ok(matrix)
}
