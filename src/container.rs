// src/container.rs

//! Named-tensor containers.
//!
//! A container maps path-like names (`/X`, `/target`, `/data`, ...) to dense
//! row-major tensors holding either numbers or strings. Files ending in
//! `.json` are read and written as JSON, where NaN is stored as `null`;
//! every other extension uses the compact bincode encoding.

use log::debug;
use ndarray::{Array1, Array2};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::error::{AnalysisError, Result};

/// On-disk encoding, chosen from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialFormat {
    Json,
    Bincode,
}

impl SerialFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => SerialFormat::Json,
            _ => SerialFormat::Bincode,
        }
    }
}

/// Reads any serde value from `path` in the format implied by its extension.
pub(crate) fn read_serialized<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| AnalysisError::io(path, e))?;
    let mut reader = BufReader::new(file);
    match SerialFormat::from_path(path) {
        SerialFormat::Json => serde_json::from_reader(reader).map_err(|e| AnalysisError::Decode {
            path: path.to_path_buf(),
            message: e.to_string(),
        }),
        SerialFormat::Bincode => {
            bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard()).map_err(
                |e| AnalysisError::Decode {
                    path: path.to_path_buf(),
                    message: e.to_string(),
                },
            )
        }
    }
}

/// Writes any serde value to `path` in the format implied by its extension.
pub(crate) fn write_serialized<T: Serialize>(value: &T, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|e| AnalysisError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    match SerialFormat::from_path(path) {
        SerialFormat::Json => {
            serde_json::to_writer(&mut writer, value).map_err(|e| AnalysisError::Encode {
                what: path.display().to_string(),
                message: e.to_string(),
            })?;
        }
        SerialFormat::Bincode => {
            bincode::serde::encode_into_std_write(value, &mut writer, bincode::config::standard())
                .map_err(|e| AnalysisError::Encode {
                    what: path.display().to_string(),
                    message: e.to_string(),
                })?;
        }
    }
    writer.flush().map_err(|e| AnalysisError::io(path, e))
}

/// A single dense tensor, stored row-major.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Tensor {
    Numeric {
        shape: Vec<usize>,
        #[serde(with = "nan_as_null")]
        data: Vec<f64>,
    },
    Text {
        shape: Vec<usize>,
        data: Vec<String>,
    },
}

impl Tensor {
    pub fn shape(&self) -> &[usize] {
        match self {
            Tensor::Numeric { shape, .. } | Tensor::Text { shape, .. } => shape,
        }
    }

    fn len(&self) -> usize {
        match self {
            Tensor::Numeric { data, .. } => data.len(),
            Tensor::Text { data, .. } => data.len(),
        }
    }

    fn validate(&self, name: &str) -> Result<()> {
        let declared: usize = self.shape().iter().product();
        if declared != self.len() {
            return Err(AnalysisError::shape(
                format!("data length of tensor '{}'", name),
                declared,
                self.len(),
            ));
        }
        Ok(())
    }

    fn numeric_values(&self, name: &str) -> Result<Vec<f64>> {
        match self {
            Tensor::Numeric { data, .. } => Ok(data.clone()),
            Tensor::Text { data, .. } => data
                .iter()
                .map(|raw| {
                    raw.trim().parse::<f64>().map_err(|_| AnalysisError::InvalidValue {
                        context: format!("numeric read of tensor '{}'", name),
                        value: raw.clone(),
                    })
                })
                .collect(),
        }
    }

    fn text_values(&self) -> Vec<String> {
        match self {
            Tensor::Numeric { data, .. } => data.iter().map(|&v| format_number(v)).collect(),
            Tensor::Text { data, .. } => data.clone(),
        }
    }
}

/// Formats a number the way a string cast of a float array does: integral
/// values keep one decimal, NaN becomes `nan`.
pub fn format_number(value: f64) -> String {
    if value.is_nan() {
        "nan".to_string()
    } else if value.is_infinite() {
        let text = if value > 0.0 { "inf" } else { "-inf" };
        text.to_string()
    } else if value.fract() == 0.0 && value.abs() < 1e16 {
        format!("{:.1}", value)
    } else {
        format!("{}", value)
    }
}

mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(values.iter().map(|v| if v.is_nan() { None } else { Some(*v) }))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let raw: Vec<Option<f64>> = Vec::deserialize(deserializer)?;
        Ok(raw.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

/// A file of named tensors.
#[derive(Serialize, Deserialize, Debug, Default, Clone)]
pub struct TensorContainer {
    tensors: BTreeMap<String, Tensor>,
    #[serde(skip)]
    origin: Option<PathBuf>,
}

fn normalize_name(name: &str) -> &str {
    name.trim_start_matches('/')
}

impl TensorContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens a container file.
    ///
    /// # Errors
    /// `Io` if the file cannot be opened, `Decode` if its contents are not a container.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut container: TensorContainer = read_serialized(path)?;
        container.origin = Some(path.to_path_buf());
        debug!(
            "Opened container {} with tensors {:?}",
            path.display(),
            container.tensors.keys().collect::<Vec<_>>()
        );
        Ok(container)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_serialized(self, path.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tensors.contains_key(normalize_name(name))
    }

    pub fn insert(&mut self, name: &str, tensor: Tensor) {
        self.tensors.insert(normalize_name(name).to_string(), tensor);
    }

    pub fn insert_matrix(&mut self, name: &str, matrix: &Array2<f64>) {
        self.insert(
            name,
            Tensor::Numeric {
                shape: vec![matrix.nrows(), matrix.ncols()],
                data: matrix.iter().copied().collect(),
            },
        );
    }

    pub fn insert_vector(&mut self, name: &str, values: &[f64]) {
        self.insert(
            name,
            Tensor::Numeric {
                shape: vec![values.len()],
                data: values.to_vec(),
            },
        );
    }

    pub fn insert_strings<S: AsRef<str>>(&mut self, name: &str, values: &[S]) {
        self.insert(
            name,
            Tensor::Text {
                shape: vec![values.len()],
                data: values.iter().map(|v| v.as_ref().to_string()).collect(),
            },
        );
    }

    pub fn insert_string_matrix(&mut self, name: &str, matrix: &Array2<String>) {
        self.insert(
            name,
            Tensor::Text {
                shape: vec![matrix.nrows(), matrix.ncols()],
                data: matrix.iter().cloned().collect(),
            },
        );
    }

    fn tensor(&self, name: &str) -> Result<&Tensor> {
        let tensor = self
            .tensors
            .get(normalize_name(name))
            .ok_or_else(|| AnalysisError::MissingKey {
                key: name.to_string(),
                file: self
                    .origin
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "<in-memory container>".to_string()),
            })?;
        tensor.validate(name)?;
        Ok(tensor)
    }

    fn matrix_dims(&self, name: &str, tensor: &Tensor) -> Result<(usize, usize)> {
        match tensor.shape() {
            [rows, cols] => Ok((*rows, *cols)),
            other => Err(AnalysisError::shape(
                format!("rank of tensor '{}'", name),
                2,
                other.len(),
            )),
        }
    }

    fn vector_len(&self, name: &str, tensor: &Tensor) -> Result<usize> {
        match tensor.shape() {
            [n] => Ok(*n),
            [1, n] | [n, 1] => Ok(*n),
            other => Err(AnalysisError::shape(
                format!("rank of tensor '{}'", name),
                1,
                other.len(),
            )),
        }
    }

    /// Reads a rank-2 tensor as a numeric matrix, parsing strings if needed.
    pub fn read_matrix(&self, name: &str) -> Result<Array2<f64>> {
        let tensor = self.tensor(name)?;
        let dims = self.matrix_dims(name, tensor)?;
        let values = tensor.numeric_values(name)?;
        Array2::from_shape_vec(dims, values)
            .map_err(|_| AnalysisError::shape(format!("tensor '{}'", name), dims.0 * dims.1, tensor.len()))
    }

    /// Reads a rank-1 tensor (or a single row/column matrix) as a numeric vector.
    pub fn read_vector(&self, name: &str) -> Result<Array1<f64>> {
        let tensor = self.tensor(name)?;
        self.vector_len(name, tensor)?;
        Ok(Array1::from(tensor.numeric_values(name)?))
    }

    /// Reads a rank-1 tensor as strings, formatting numbers if needed.
    pub fn read_string_vector(&self, name: &str) -> Result<Vec<String>> {
        let tensor = self.tensor(name)?;
        self.vector_len(name, tensor)?;
        Ok(tensor.text_values())
    }

    /// Reads a rank-2 tensor as a string matrix, formatting numbers if needed.
    pub fn read_string_matrix(&self, name: &str) -> Result<Array2<String>> {
        let tensor = self.tensor(name)?;
        let dims = self.matrix_dims(name, tensor)?;
        Array2::from_shape_vec(dims, tensor.text_values())
            .map_err(|_| AnalysisError::shape(format!("tensor '{}'", name), dims.0 * dims.1, tensor.len()))
    }
}
