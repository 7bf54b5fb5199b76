// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Every failure the scoring and visualization pipelines can report.
///
/// Nothing in the crate recovers from these; callers are expected to abort the
/// run and surface the message.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Tensor '{key}' was not found in {file}.")]
    MissingKey { key: String, file: String },

    #[error("I/O failure on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode {}: {message}", .path.display())]
    Decode { path: PathBuf, message: String },

    #[error("Failed to encode {what}: {message}")]
    Encode { what: String, message: String },

    #[error("Label '{label}' is not part of the {scheme} encoding.")]
    UnknownCategory { label: String, scheme: String },

    #[error("Cannot compute {quantity}: {reason}")]
    InsufficientData {
        quantity: &'static str,
        reason: String,
    },

    #[error("Feature column {column} has zero variance and cannot be standardized.")]
    DegenerateColumn { column: usize },

    #[error("Shape mismatch in {context}: expected {expected}, found {found}.")]
    ShapeMismatch {
        context: String,
        expected: usize,
        found: usize,
    },

    #[error("Invalid value '{value}' in {context}.")]
    InvalidValue { context: String, value: String },

    #[error("Clinical field '{field}' is not present in the clinical table.")]
    MissingField { field: String },

    #[error("Three components starting at index {first} were requested but only {available} are available.")]
    ComponentOutOfRange { first: usize, available: usize },

    #[error("Linear algebra backend failed: {0}")]
    LinearAlgebra(String),
}

impl AnalysisError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        AnalysisError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn shape(context: impl Into<String>, expected: usize, found: usize) -> Self {
        AnalysisError::ShapeMismatch {
            context: context.into(),
            expected,
            found,
        }
    }
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
