// src/scoring.rs

//! Evaluation of a pre-trained regressor on held-out data.

use log::info;
use ndarray::{Array1, Array2};
use std::path::{Path, PathBuf};

use crate::container::TensorContainer;
use crate::encoding::{parse_numeric_labels, LabelEncoder, PATHOLOGIC_STAGE};
use crate::error::{AnalysisError, Result};
use crate::metrics::{compute_scores, write_json_record, PredictionRecord, ScoreRecord};
use crate::model::{Predictor, RegressorArtifact};

/// Feature tensor name, stored features x samples.
pub const FEATURES: &str = "/X";
/// Target label tensor name.
pub const TARGET: &str = "/target";

/// Reads `/X` (transposed to samples x features) and `/target` as strings.
pub fn load_features_and_target<P: AsRef<Path>>(path: P) -> Result<(Array2<f64>, Vec<String>)> {
    let path = path.as_ref();
    let container = TensorContainer::open(path)?;
    let x = container.read_matrix(FEATURES)?.reversed_axes();
    let y = container.read_string_vector(TARGET)?;
    if x.nrows() != y.len() {
        return Err(AnalysisError::shape(
            format!("{} samples vs {} labels in {}", FEATURES, TARGET, path.display()),
            x.nrows(),
            y.len(),
        ));
    }
    info!(
        "Loaded {} samples x {} features from {}",
        x.nrows(),
        x.ncols(),
        path.display()
    );
    Ok((x, y))
}

/// Inputs and outputs of one scoring run.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub model: PathBuf,
    pub train: PathBuf,
    pub test: PathBuf,
    pub score_output: PathBuf,
    pub other_output: PathBuf,
    /// Name of the predicted quantity. Only `pathologic_stage` goes through the encoder.
    pub target: String,
    pub encoder: LabelEncoder,
}

impl ScoringConfig {
    /// A configuration for the default stage target with the built-in stage table.
    pub fn new(
        model: impl Into<PathBuf>,
        train: impl Into<PathBuf>,
        test: impl Into<PathBuf>,
        score_output: impl Into<PathBuf>,
        other_output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            model: model.into(),
            train: train.into(),
            test: test.into(),
            score_output: score_output.into(),
            other_output: other_output.into(),
            target: PATHOLOGIC_STAGE.to_string(),
            encoder: LabelEncoder::pathologic_stage(),
        }
    }

    fn encode_target(&self, labels: &[String]) -> Result<Array1<f64>> {
        if self.target == PATHOLOGIC_STAGE {
            self.encoder.encode(labels)
        } else {
            parse_numeric_labels(&self.target, labels)
        }
    }
}

/// Predicts the test set, scores it against the train-mean baseline and
/// writes both JSON records. Nothing is written if any step fails.
pub fn run_scoring(config: &ScoringConfig) -> Result<ScoreRecord> {
    let model = RegressorArtifact::load(&config.model)?;

    let (x_test, test_labels) = load_features_and_target(&config.test)?;
    let y_test = config.encode_target(&test_labels)?;
    let y_pred = model.predict(x_test.view())?;

    let (_, train_labels) = load_features_and_target(&config.train)?;
    let y_train = config.encode_target(&train_labels)?;

    let scores = compute_scores(y_test.view(), y_pred.view(), y_train.view())?;
    let predictions = PredictionRecord::new(y_test.view(), y_pred.view());

    write_json_record(&scores, &config.score_output)?;
    write_json_record(&predictions, &config.other_output)?;
    info!(
        "Wrote scores to {} and predictions to {}",
        config.score_output.display(),
        config.other_output.display()
    );
    Ok(scores)
}
