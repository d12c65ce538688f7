//! Preprocessing utilities for deep-learning input pipelines: sequence
//! padding, text tokenization and image loading, with optional Python
//! bindings.

#[cfg(feature = "python_bindings")]
use ndarray::ArrayD;
#[cfg(feature = "python_bindings")]
use pyo3::prelude::*;
#[cfg(feature = "python_bindings")]
use pyo3::types::{PyFloat, PyString};

pub mod backend;
pub mod dtype;
pub mod error;
pub mod io;
pub mod sequence;
pub mod text;
pub mod tokenizer;

pub use error::{PreprocessError, Result};
pub use sequence::{pad_sequences, PadConfig, PaddedMatrix};

#[cfg(feature = "python_bindings")]
use crate::io::image::{ColorMode, DataFormat, ImageHandle, Interpolation, LoadImageOptions};
#[cfg(feature = "python_bindings")]
use crate::sequence::{Padding, SequenceElement, Truncating};
#[cfg(feature = "python_bindings")]
use crate::text::{HashFunction, TextSplitConfig, DEFAULT_FILTERS};
#[cfg(feature = "python_bindings")]
use crate::tokenizer::{MatrixMode, Tokenizer, TokenizerConfig};

#[cfg(feature = "python_bindings")]
impl From<PreprocessError> for PyErr {
    fn from(e: PreprocessError) -> Self {
        use pyo3::exceptions::{PyIOError, PyRuntimeError, PyValueError};
        match e {
            PreprocessError::Image(_) | PreprocessError::Io(_) => PyIOError::new_err(e.to_string()),
            PreprocessError::FeatureDisabled(_) => PyRuntimeError::new_err(e.to_string()),
            _ => PyValueError::new_err(e.to_string()),
        }
    }
}

/// Accept a Python int, or a float with no fractional part, as an integer argument.
#[cfg(feature = "python_bindings")]
fn int_arg(obj: &Bound<'_, PyAny>, name: &str) -> PyResult<i64> {
    if obj.is_instance_of::<PyFloat>() {
        let v: f64 = obj.extract()?;
        if v.is_finite() && v.fract() == 0.0 && v.abs() < 9_223_372_036_854_775_808.0 {
            return Ok(v as i64);
        }
        return Err(pyo3::exceptions::PyValueError::new_err(format!(
            "{} must be an integer, got {}",
            name, v
        )));
    }
    obj.extract::<i64>().map_err(|_| {
        pyo3::exceptions::PyTypeError::new_err(format!(
            "{} must be an integer, got {}",
            name,
            obj.get_type()
        ))
    })
}

#[cfg(feature = "python_bindings")]
fn usize_arg(obj: &Bound<'_, PyAny>, name: &str) -> PyResult<usize> {
    let v = int_arg(obj, name)?;
    usize::try_from(v).map_err(|_| {
        pyo3::exceptions::PyValueError::new_err(format!("{} must be non-negative, got {}", name, v))
    })
}

#[cfg(feature = "python_bindings")]
fn sequence_element(obj: &Bound<'_, PyAny>, row: usize, column: usize) -> PyResult<SequenceElement> {
    if obj.is_instance_of::<PyString>() {
        return Ok(SequenceElement::Text(obj.extract()?));
    }
    if let Ok(v) = obj.extract::<i64>() {
        return Ok(SequenceElement::Int(v));
    }
    if let Ok(v) = obj.extract::<f64>() {
        return Ok(SequenceElement::Float(v));
    }
    Err(PreprocessError::InvalidSequenceElement {
        row,
        column,
        reason: format!("unsupported element of type {}", obj.get_type()),
    }
    .into())
}

#[cfg(feature = "python_bindings")]
fn rows<T: Clone>(a: &ndarray::Array2<T>) -> Vec<Vec<T>> {
    a.outer_iter().map(|r| r.to_vec()).collect()
}

/// Pads sequences to the same length.
///
/// Returns a list of rows; integer dtypes yield Python ints, float dtypes
/// yield floats.
#[cfg(feature = "python_bindings")]
#[pyfunction]
#[pyo3(name = "pad_sequences", signature = (sequences, maxlen=None, dtype="int32", padding="pre", truncating="pre", value=0.0))]
fn py_pad_sequences(
    py: Python<'_>,
    sequences: &Bound<'_, PyAny>,
    maxlen: Option<&Bound<'_, PyAny>>,
    dtype: &str,
    padding: &str,
    truncating: &str,
    value: f64,
) -> PyResult<PyObject> {
    let mut batch: Vec<Vec<SequenceElement>> = Vec::new();
    for (row, seq) in sequences.try_iter()?.enumerate() {
        let seq = seq?;
        let mut elements = Vec::new();
        for (column, el) in seq.try_iter()?.enumerate() {
            elements.push(sequence_element(&el?, row, column)?);
        }
        batch.push(elements);
    }
    let maxlen = match maxlen {
        Some(m) if !m.is_none() => Some(int_arg(m, "maxlen")?),
        _ => None,
    };
    let config = PadConfig {
        maxlen: crate::sequence::resolve_maxlen(maxlen)?,
        dtype: dtype.parse()?,
        padding: padding.parse::<Padding>()?,
        truncating: truncating.parse::<Truncating>()?,
        fill_value: value,
    };
    let out = match pad_sequences(&batch, &config)? {
        PaddedMatrix::Int32(a) => rows(&a).into_pyobject(py)?.unbind(),
        PaddedMatrix::Int64(a) => rows(&a).into_pyobject(py)?.unbind(),
        #[cfg(feature = "dtype_f16")]
        PaddedMatrix::Float16(a) => rows(&a.mapv(f32::from)).into_pyobject(py)?.unbind(),
        PaddedMatrix::Float32(a) => rows(&a).into_pyobject(py)?.unbind(),
        PaddedMatrix::Float64(a) => rows(&a).into_pyobject(py)?.unbind(),
    };
    Ok(out)
}

#[cfg(feature = "python_bindings")]
fn split_config(filters: &str, lower: bool, split: &str) -> TextSplitConfig {
    TextSplitConfig {
        filters: filters.to_string(),
        lower,
        split: split.to_string(),
    }
}

#[cfg(feature = "python_bindings")]
#[pyfunction]
#[pyo3(signature = (text, filters=DEFAULT_FILTERS, lower=true, split=" "))]
fn text_to_word_sequence(text: &str, filters: &str, lower: bool, split: &str) -> PyResult<Vec<String>> {
    Ok(crate::text::text_to_word_sequence(text, &split_config(filters, lower, split))?)
}

#[cfg(feature = "python_bindings")]
#[pyfunction]
#[pyo3(signature = (text, n, filters=DEFAULT_FILTERS, lower=true, split=" "))]
fn text_one_hot(text: &str, n: &Bound<'_, PyAny>, filters: &str, lower: bool, split: &str) -> PyResult<Vec<usize>> {
    let n = usize_arg(n, "n")?;
    Ok(crate::text::one_hot(text, n, &split_config(filters, lower, split))?)
}

#[cfg(feature = "python_bindings")]
#[pyfunction]
#[pyo3(signature = (text, n, hash_function="hash", filters=DEFAULT_FILTERS, lower=true, split=" "))]
fn text_hashing_trick(
    text: &str,
    n: &Bound<'_, PyAny>,
    hash_function: &str,
    filters: &str,
    lower: bool,
    split: &str,
) -> PyResult<Vec<usize>> {
    let n = usize_arg(n, "n")?;
    let hash_function: HashFunction = hash_function.parse()?;
    Ok(crate::text::hashing_trick(text, n, hash_function, &split_config(filters, lower, split))?)
}

/// Generates skip-gram couples and labels from a sequence of word indices.
#[cfg(feature = "python_bindings")]
#[pyfunction]
#[pyo3(name = "skipgrams", signature = (sequence, vocabulary_size, window_size=4, negative_samples=1.0, shuffle=true, categorical=false, sampling_table=None, seed=None))]
#[allow(clippy::too_many_arguments)]
fn py_skipgrams(
    py: Python<'_>,
    sequence: Vec<usize>,
    vocabulary_size: &Bound<'_, PyAny>,
    window_size: usize,
    negative_samples: f64,
    shuffle: bool,
    categorical: bool,
    sampling_table: Option<Vec<f64>>,
    seed: Option<u64>,
) -> PyResult<(Vec<(usize, usize)>, PyObject)> {
    let config = crate::sequence::SkipgramConfig {
        window_size,
        negative_samples,
        shuffle,
        sampling_table,
        seed,
    };
    let vocabulary_size = usize_arg(vocabulary_size, "vocabulary_size")?;
    let sg = crate::sequence::skipgrams(&sequence, vocabulary_size, &config)?;
    // Vec<u8> would convert to bytes
    let labels = if categorical {
        sg.categorical_labels()
            .iter()
            .map(|l| vec![u32::from(l[0]), u32::from(l[1])])
            .collect::<Vec<_>>()
            .into_pyobject(py)?
            .unbind()
    } else {
        sg.labels
            .iter()
            .map(|&l| u32::from(l))
            .collect::<Vec<_>>()
            .into_pyobject(py)?
            .unbind()
    };
    Ok((sg.couples, labels))
}

#[cfg(feature = "python_bindings")]
#[pyfunction]
#[pyo3(signature = (size, sampling_factor=1e-5))]
fn make_sampling_table(size: &Bound<'_, PyAny>, sampling_factor: f64) -> PyResult<Vec<f64>> {
    Ok(crate::sequence::make_sampling_table(usize_arg(size, "size")?, sampling_factor))
}

/// A decoded image.
#[cfg(feature = "python_bindings")]
#[pyclass(name = "Image")]
#[derive(Clone)]
struct PyImage(ImageHandle);

#[cfg(feature = "python_bindings")]
#[pymethods]
impl PyImage {
    #[getter]
    fn width(&self) -> u32 {
        self.0.width()
    }

    #[getter]
    fn height(&self) -> u32 {
        self.0.height()
    }

    #[getter]
    fn channels(&self) -> usize {
        self.0.channels()
    }

    #[getter]
    fn mode(&self) -> &'static str {
        match self.0.color_mode() {
            ColorMode::Grayscale => "grayscale",
            ColorMode::Rgb => "rgb",
            ColorMode::Rgba => "rgba",
        }
    }

    #[pyo3(signature = (data_format="channels_last"))]
    fn to_array(&self, data_format: &str) -> PyResult<PyImageArray> {
        image_to_array(self, data_format)
    }

    fn __repr__(&self) -> String {
        format!("Image(width={}, height={}, mode={})", self.0.width(), self.0.height(), self.mode())
    }
}

/// Float pixel array produced by `image_to_array`.
#[cfg(feature = "python_bindings")]
#[pyclass(name = "ImageArray")]
#[derive(Clone)]
struct PyImageArray(ArrayD<f32>);

#[cfg(feature = "python_bindings")]
#[pymethods]
impl PyImageArray {
    #[getter]
    fn shape(&self) -> Vec<usize> {
        self.0.shape().to_vec()
    }

    /// Return a (flat_list, shape, dtype) tuple for numpy construction.
    fn to_numpy(&self) -> (Vec<f32>, Vec<usize>, String) {
        let flat = self.0.iter().cloned().collect::<Vec<f32>>();
        (flat, self.shape(), crate::dtype::DType::Float32.as_str().to_string())
    }

    fn expand_dims(&self, axis: &Bound<'_, PyAny>) -> PyResult<PyImageArray> {
        let axis = int_arg(axis, "axis")? as isize;
        Ok(PyImageArray(io::array::expand_dims(self.0.clone(), axis)?))
    }
}

/// Loads an image from disk.
#[cfg(feature = "python_bindings")]
#[pyfunction]
#[pyo3(signature = (path, grayscale=false, color_mode="rgb", target_size=None, interpolation="nearest"))]
fn image_load(
    path: &str,
    grayscale: bool,
    color_mode: &str,
    target_size: Option<&Bound<'_, PyAny>>,
    interpolation: &str,
) -> PyResult<PyImage> {
    let mut options = LoadImageOptions {
        color_mode: color_mode.parse::<ColorMode>()?,
        target_size: None,
        interpolation: interpolation.parse::<Interpolation>()?,
    }
    .with_grayscale(grayscale);
    if let Some(size) = target_size.filter(|s| !s.is_none()) {
        let (h, w): (Bound<'_, PyAny>, Bound<'_, PyAny>) = size.extract()?;
        let h = u32::try_from(usize_arg(&h, "target_size")?)
            .map_err(|_| pyo3::exceptions::PyValueError::new_err("target_size height is too large"))?;
        let w = u32::try_from(usize_arg(&w, "target_size")?)
            .map_err(|_| pyo3::exceptions::PyValueError::new_err("target_size width is too large"))?;
        options = options.with_target_size(h, w);
    }
    Ok(PyImage(io::image::load_image(path, &options)?))
}

/// Converts an image into a float array of raw pixel values.
#[cfg(feature = "python_bindings")]
#[pyfunction]
#[pyo3(signature = (img, data_format="channels_last"))]
fn image_to_array(img: &PyImage, data_format: &str) -> PyResult<PyImageArray> {
    let data_format: DataFormat = data_format.parse()?;
    Ok(PyImageArray(io::image::image_to_array(&img.0, data_format)?.into_dyn()))
}

#[cfg(feature = "python_bindings")]
#[pyclass(name = "Tokenizer")]
#[derive(Clone)]
struct PyTokenizer(Tokenizer);

#[cfg(feature = "python_bindings")]
#[pymethods]
impl PyTokenizer {
    #[new]
    #[pyo3(signature = (num_words=None, filters=DEFAULT_FILTERS, lower=true, split=" ", char_level=false, oov_token=None))]
    fn new(
        num_words: Option<&Bound<'_, PyAny>>,
        filters: &str,
        lower: bool,
        split: &str,
        char_level: bool,
        oov_token: Option<String>,
    ) -> PyResult<Self> {
        let num_words = match num_words {
            Some(n) if !n.is_none() => Some(usize_arg(n, "num_words")?),
            _ => None,
        };
        let config = TokenizerConfig {
            num_words,
            split: split_config(filters, lower, split),
            char_level,
            oov_token,
        };
        Ok(PyTokenizer(Tokenizer::new(config)?))
    }

    fn fit_on_texts(&mut self, texts: Vec<String>) -> PyResult<()> {
        Ok(self.0.fit_on_texts(&texts)?)
    }

    fn fit_on_sequences(&mut self, sequences: Vec<Vec<usize>>) {
        self.0.fit_on_sequences(&sequences)
    }

    fn texts_to_sequences(&self, texts: Vec<String>) -> PyResult<Vec<Vec<usize>>> {
        Ok(self.0.texts_to_sequences(&texts)?)
    }

    fn sequences_to_texts(&self, sequences: Vec<Vec<usize>>) -> Vec<String> {
        self.0.sequences_to_texts(&sequences)
    }

    #[pyo3(signature = (texts, mode="binary"))]
    fn texts_to_matrix(&self, texts: Vec<String>, mode: &str) -> PyResult<Vec<Vec<f64>>> {
        let m = self.0.texts_to_matrix(&texts, mode.parse::<MatrixMode>()?)?;
        Ok(rows(&m))
    }

    #[pyo3(signature = (sequences, mode="binary"))]
    fn sequences_to_matrix(&self, sequences: Vec<Vec<usize>>, mode: &str) -> PyResult<Vec<Vec<f64>>> {
        let m = self.0.sequences_to_matrix(&sequences, mode.parse::<MatrixMode>()?)?;
        Ok(rows(&m))
    }

    #[getter]
    fn word_index(&self) -> std::collections::HashMap<String, usize> {
        self.0.word_index().clone()
    }

    #[getter]
    fn word_docs(&self) -> std::collections::HashMap<String, u64> {
        self.0.word_docs().clone()
    }

    #[getter]
    fn document_count(&self) -> u64 {
        self.0.document_count()
    }

    #[getter]
    fn num_words(&self) -> Option<usize> {
        self.0.num_words()
    }

    fn vocab_size(&self) -> usize {
        self.0.vocab_size()
    }

    fn token_to_id(&self, token: &str) -> Option<usize> {
        self.0.token_to_id(token)
    }

    fn id_to_token(&self, id: usize) -> Option<String> {
        self.0.index_word(id).map(str::to_string)
    }

    fn to_json(&self) -> PyResult<String> {
        Ok(self.0.to_json()?)
    }

    #[staticmethod]
    fn from_json(json: &str) -> PyResult<Self> {
        Ok(PyTokenizer(Tokenizer::from_json(json)?))
    }

    fn save(&self, path: &str) -> PyResult<()> {
        Ok(self.0.save(path)?)
    }

    #[staticmethod]
    fn from_file(path: &str) -> PyResult<Self> {
        Ok(PyTokenizer(Tokenizer::from_file(path)?))
    }
}

/// Python extension module.
#[cfg(feature = "python_bindings")]
#[pymodule]
fn preprocessing_engine(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PyImage>()?;
    m.add_class::<PyImageArray>()?;
    m.add_class::<PyTokenizer>()?;
    m.add_function(pyo3::wrap_pyfunction!(py_pad_sequences, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(text_to_word_sequence, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(text_one_hot, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(text_hashing_trick, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(py_skipgrams, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(make_sampling_table, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(image_load, m)?)?;
    m.add_function(pyo3::wrap_pyfunction!(image_to_array, m)?)?;
    m.add("DEFAULT_FILTERS", DEFAULT_FILTERS)?;
    Ok(())
}
