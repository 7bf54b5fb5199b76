// src/visualization.rs

//! Embedding → principal components → annotated 3D scatter.

use log::info;
use std::path::PathBuf;

use crate::alignment::ClinicalTable;
use crate::embedding::{Embedding, EmbeddingLayout};
use crate::error::Result;
use crate::pca::{component_triple, PcaProjector, ScoreScaling};
use crate::plot::{write_scores_tsv, DisplayNames, PlotComposer, PlotInput};

pub const DEFAULT_CLINICAL_FIELDS: [&str; 2] = ["gender", "hpv_status"];

/// Inputs, outputs and lookup tables of one visualization run.
#[derive(Debug, Clone)]
pub struct VisualizationConfig {
    pub model_data: PathBuf,
    pub clinical_data: PathBuf,
    /// First of the three plotted components, 0-based.
    pub first_pc: usize,
    pub output: PathBuf,
    pub exclude_groups: Vec<String>,
    pub clinical_fields: Vec<String>,
    pub display_names: DisplayNames,
    pub layout: EmbeddingLayout,
    pub scaling: ScoreScaling,
    pub scores_tsv: Option<PathBuf>,
}

impl VisualizationConfig {
    pub fn new(
        model_data: impl Into<PathBuf>,
        clinical_data: impl Into<PathBuf>,
        first_pc: usize,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            model_data: model_data.into(),
            clinical_data: clinical_data.into(),
            first_pc,
            output: output.into(),
            exclude_groups: Vec::new(),
            clinical_fields: DEFAULT_CLINICAL_FIELDS.iter().map(|f| f.to_string()).collect(),
            display_names: DisplayNames::default(),
            layout: EmbeddingLayout::default(),
            scaling: ScoreScaling::default(),
            scores_tsv: None,
        }
    }
}

/// Summary of a finished run.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualizationSummary {
    pub n_samples: usize,
    pub n_components: usize,
    pub components: [usize; 3],
    pub unmatched_clinical: usize,
}

pub fn run_visualization(config: &VisualizationConfig) -> Result<VisualizationSummary> {
    let embedding =
        Embedding::load(&config.model_data, &config.layout)?.without_groups(&config.exclude_groups);

    let decomposition = PcaProjector::new().decompose(embedding.values.view())?;
    let components = component_triple(config.first_pc, decomposition.n_components())?;
    let coordinates = decomposition.projected(config.scaling);

    let clinical = ClinicalTable::load(&config.clinical_data, &config.clinical_fields)?
        .align_to(&embedding.sample_ids);

    let figure = PlotComposer::new(config.display_names.clone()).compose(&PlotInput {
        coordinates: coordinates.view(),
        loadings: decomposition.vh().view(),
        components,
        sample_ids: &embedding.sample_ids,
        groups: &embedding.groups,
        pathways: &embedding.pathways,
        clinical: &clinical,
    })?;
    figure.write_html(&config.output)?;

    if let Some(tsv) = &config.scores_tsv {
        write_scores_tsv(tsv, &embedding.sample_ids, &embedding.groups, coordinates.view())?;
    }

    info!(
        "Plotted PC {}-{} for {} samples.",
        components[0] + 1,
        components[2] + 1,
        embedding.n_samples()
    );
    Ok(VisualizationSummary {
        n_samples: embedding.n_samples(),
        n_components: decomposition.n_components(),
        components,
        unmatched_clinical: clinical.unmatched,
    })
}
