// Embedding analyses: regression scoring and principal component visualization

#![doc = include_str!("../README.md")]

pub mod alignment;
pub mod container;
pub mod embedding;
pub mod encoding;
pub mod error;
pub mod linalg_backends;
pub mod metrics;
pub mod model;
pub mod pca;
pub mod plot;
pub mod scoring;
pub mod visualization;

pub use alignment::{AlignedClinical, ClinicalTable, MISSING_SENTINEL};
pub use container::TensorContainer;
pub use embedding::{Embedding, EmbeddingLayout};
pub use encoding::{LabelEncoder, UnknownCategoryPolicy};
pub use error::{AnalysisError, Result};
pub use metrics::{PredictionRecord, ScoreRecord};
pub use model::{Predictor, RegressorArtifact};
pub use pca::{ComponentDecomposition, PcaProjector, ScoreScaling};
pub use plot::{DisplayNames, Figure, PlotComposer, PlotInput};
pub use scoring::{run_scoring, ScoringConfig};
pub use visualization::{run_visualization, VisualizationConfig, VisualizationSummary};

#[cfg(test)]
mod pca_tests;
