use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PreprocessError;

/// Element type of a padded sequence matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DType {
    #[default]
    Int32,
    Int64,
    Float16,
    Float32,
    Float64,
}

impl DType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DType::Int32 => "int32",
            DType::Int64 => "int64",
            DType::Float16 => "float16",
            DType::Float32 => "float32",
            DType::Float64 => "float64",
        }
    }

    pub fn parse(s: &str) -> Option<DType> {
        match s.to_lowercase().as_str() {
            "int32" | "i32" | "int" => Some(DType::Int32),
            "int64" | "i64" | "long" => Some(DType::Int64),
            "float16" | "f16" | "half" => Some(DType::Float16),
            "float32" | "f32" | "float" => Some(DType::Float32),
            "float64" | "f64" | "double" => Some(DType::Float64),
            _ => None,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DType {
    type Err = PreprocessError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DType::parse(s).ok_or_else(|| PreprocessError::config(format!("Unknown dtype: {}", s)))
    }
}
