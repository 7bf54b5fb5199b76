// src/metrics.rs

//! Regression scores and the records written by the scoring pipeline.

use log::info;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::error::{AnalysisError, Result};

/// `{"mse": .., "r2": .., "mse_baseline": ..}`
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ScoreRecord {
    pub mse: f64,
    pub r2: f64,
    pub mse_baseline: f64,
}

/// `{"y_true": [..], "y_pred": [..]}`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PredictionRecord {
    pub y_true: Vec<f64>,
    pub y_pred: Vec<f64>,
}

impl PredictionRecord {
    pub fn new(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Self {
        Self {
            y_true: y_true.to_vec(),
            y_pred: y_pred.to_vec(),
        }
    }
}

fn check_paired(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<()> {
    if y_true.len() != y_pred.len() {
        return Err(AnalysisError::shape(
            "prediction length",
            y_true.len(),
            y_pred.len(),
        ));
    }
    if y_true.is_empty() {
        return Err(AnalysisError::InsufficientData {
            quantity: "regression scores",
            reason: "the evaluation set is empty".to_string(),
        });
    }
    Ok(())
}

pub fn mean_squared_error(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<f64> {
    check_paired(y_true, y_pred)?;
    let sum_sq: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    Ok(sum_sq / y_true.len() as f64)
}

/// Coefficient of determination `1 - SS_res / SS_tot`.
///
/// When `y_true` is constant the ratio is undefined; the score is then `1.0`
/// for a perfect prediction and `0.0` otherwise.
pub fn r2_score(y_true: ArrayView1<f64>, y_pred: ArrayView1<f64>) -> Result<f64> {
    check_paired(y_true, y_pred)?;
    let mean_true = y_true.sum() / y_true.len() as f64;
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred.iter())
        .map(|(t, p)| (t - p).powi(2))
        .sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean_true).powi(2)).sum();

    if ss_tot == 0.0 {
        return Ok(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Ok(1.0 - ss_res / ss_tot)
}

/// Error of a constant predictor equal to the training-set mean.
pub fn baseline_mse(y_true: ArrayView1<f64>, y_train: ArrayView1<f64>) -> Result<f64> {
    if y_train.is_empty() {
        return Err(AnalysisError::InsufficientData {
            quantity: "mse_baseline",
            reason: "the training target is empty".to_string(),
        });
    }
    if y_true.is_empty() {
        return Err(AnalysisError::InsufficientData {
            quantity: "mse_baseline",
            reason: "the evaluation set is empty".to_string(),
        });
    }
    let trivial_prediction = y_train.sum() / y_train.len() as f64;
    let sum_sq: f64 = y_true.iter().map(|t| (t - trivial_prediction).powi(2)).sum();
    Ok(sum_sq / y_true.len() as f64)
}

pub fn compute_scores(
    y_true: ArrayView1<f64>,
    y_pred: ArrayView1<f64>,
    y_train: ArrayView1<f64>,
) -> Result<ScoreRecord> {
    let scores = ScoreRecord {
        mse: mean_squared_error(y_true, y_pred)?,
        r2: r2_score(y_true, y_pred)?,
        mse_baseline: baseline_mse(y_true, y_train)?,
    };
    info!(
        "Scores over {} samples: mse={:.6}, r2={:.6}, mse_baseline={:.6}",
        y_true.len(),
        scores.mse,
        scores.r2,
        scores.mse_baseline
    );
    Ok(scores)
}

/// Writes any record as a single JSON document.
pub fn write_json_record<T: Serialize, P: AsRef<Path>>(record: &T, path: P) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path).map_err(|e| AnalysisError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, record).map_err(|e| AnalysisError::Encode {
        what: path.display().to_string(),
        message: e.to_string(),
    })?;
    writer.flush().map_err(|e| AnalysisError::io(path, e))
}
