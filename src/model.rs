// src/model.rs

use log::info;
use ndarray::{Array1, Array2, ArrayView2, Axis};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::container::{read_serialized, write_serialized};
use crate::error::{AnalysisError, Result};

/// Anything that maps a feature matrix (samples x features) to one prediction per sample.
pub trait Predictor {
    /// Number of feature columns the predictor expects.
    fn n_features(&self) -> usize;

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>>;
}

/// A pre-trained regressor as stored on disk.
///
/// Artifacts are bincode files, or JSON when the path ends in `.json`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RegressorArtifact {
    /// `y = X w + b`
    Linear {
        coefficients: Array1<f64>,
        intercept: f64,
    },
    /// Regression on principal component scores.
    ///
    /// Inputs are standardized with `mean`/`scale`, projected onto `rotation`
    /// (features x components) and passed through a linear head over the
    /// component scores.
    PrincipalComponent {
        mean: Array1<f64>,
        scale: Array1<f64>,
        rotation: Array2<f64>,
        coefficients: Array1<f64>,
        intercept: f64,
    },
}

impl RegressorArtifact {
    /// Loads and validates an artifact.
    ///
    /// # Errors
    /// `Io`/`Decode` if the file cannot be read, `Decode` if the stored
    /// dimensions are inconsistent or any scale factor is not positive and finite.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let artifact: RegressorArtifact = read_serialized(path)?;
        artifact.validate().map_err(|message| AnalysisError::Decode {
            path: path.to_path_buf(),
            message,
        })?;
        info!(
            "Loaded {} regressor expecting {} features from {}",
            artifact.kind(),
            artifact.n_features(),
            path.display()
        );
        Ok(artifact)
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        write_serialized(self, path.as_ref())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            RegressorArtifact::Linear { .. } => "linear",
            RegressorArtifact::PrincipalComponent { .. } => "principal-component",
        }
    }

    fn validate(&self) -> std::result::Result<(), String> {
        match self {
            RegressorArtifact::Linear { .. } => Ok(()),
            RegressorArtifact::PrincipalComponent {
                mean,
                scale,
                rotation,
                coefficients,
                ..
            } => {
                if mean.len() != scale.len() || mean.len() != rotation.nrows() {
                    return Err(format!(
                        "inconsistent feature dimensions: mean={}, scale={}, rotation_features={}",
                        mean.len(),
                        scale.len(),
                        rotation.nrows()
                    ));
                }
                if coefficients.len() != rotation.ncols() {
                    return Err(format!(
                        "{} coefficients for {} components",
                        coefficients.len(),
                        rotation.ncols()
                    ));
                }
                if scale.iter().any(|&s| !s.is_finite() || s <= 0.0) {
                    return Err("scale vector contains non-positive or non-finite values".to_string());
                }
                Ok(())
            }
        }
    }
}

impl Predictor for RegressorArtifact {
    fn n_features(&self) -> usize {
        match self {
            RegressorArtifact::Linear { coefficients, .. } => coefficients.len(),
            RegressorArtifact::PrincipalComponent { mean, .. } => mean.len(),
        }
    }

    fn predict(&self, x: ArrayView2<f64>) -> Result<Array1<f64>> {
        if x.ncols() != self.n_features() {
            return Err(AnalysisError::shape(
                format!("feature count for the {} regressor", self.kind()),
                self.n_features(),
                x.ncols(),
            ));
        }
        match self {
            RegressorArtifact::Linear {
                coefficients,
                intercept,
            } => Ok(x.dot(coefficients) + *intercept),
            RegressorArtifact::PrincipalComponent {
                mean,
                scale,
                rotation,
                coefficients,
                intercept,
            } => {
                let mut standardized = x.to_owned();
                for mut row in standardized.axis_iter_mut(Axis(0)) {
                    ndarray::Zip::from(&mut row)
                        .and(mean)
                        .and(scale)
                        .for_each(|value, &m, &s| *value = (*value - m) / s);
                }
                let scores = standardized.dot(rotation);
                Ok(scores.dot(coefficients) + *intercept)
            }
        }
    }
}
