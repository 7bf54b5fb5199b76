// src/embedding.rs

use log::{info, warn};
use ndarray::{Array2, Axis};
use std::collections::HashSet;
use std::path::Path;

use crate::container::TensorContainer;
use crate::error::{AnalysisError, Result};

/// Where an embedding model keeps its tensors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddingLayout {
    pub embedding: String,
    pub sample_ids: String,
    pub sample_groups: String,
    pub pathways: String,
}

impl Default for EmbeddingLayout {
    fn default() -> Self {
        Self {
            embedding: "/embedding".to_string(),
            sample_ids: "/sample_ids".to_string(),
            sample_groups: "/sample_groups".to_string(),
            pathways: "/pathways".to_string(),
        }
    }
}

/// An embedding with its sample and pathway annotations.
#[derive(Debug, Clone)]
pub struct Embedding {
    /// samples x pathways
    pub values: Array2<f64>,
    pub sample_ids: Vec<String>,
    pub groups: Vec<String>,
    pub pathways: Vec<String>,
}

impl Embedding {
    pub fn new(
        values: Array2<f64>,
        sample_ids: Vec<String>,
        groups: Vec<String>,
        pathways: Vec<String>,
    ) -> Result<Self> {
        if sample_ids.len() != values.nrows() {
            return Err(AnalysisError::shape(
                "embedding rows vs sample ids",
                values.nrows(),
                sample_ids.len(),
            ));
        }
        if groups.len() != values.nrows() {
            return Err(AnalysisError::shape(
                "embedding rows vs sample groups",
                values.nrows(),
                groups.len(),
            ));
        }
        if pathways.len() != values.ncols() {
            return Err(AnalysisError::shape(
                "embedding columns vs pathway names",
                values.ncols(),
                pathways.len(),
            ));
        }
        Ok(Self {
            values,
            sample_ids,
            groups,
            pathways,
        })
    }

    pub fn load<P: AsRef<Path>>(path: P, layout: &EmbeddingLayout) -> Result<Self> {
        let path = path.as_ref();
        let container = TensorContainer::open(path)?;
        let embedding = Self::new(
            container.read_matrix(&layout.embedding)?,
            container.read_string_vector(&layout.sample_ids)?,
            container.read_string_vector(&layout.sample_groups)?,
            container.read_string_vector(&layout.pathways)?,
        )?;
        info!(
            "Loaded embedding with {} samples x {} pathways from {}",
            embedding.n_samples(),
            embedding.pathways.len(),
            path.display()
        );
        Ok(embedding)
    }

    pub fn n_samples(&self) -> usize {
        self.values.nrows()
    }

    /// Drops every sample whose group is in `excluded`, keeping the original order.
    pub fn without_groups<S: AsRef<str>>(self, excluded: &[S]) -> Self {
        if excluded.is_empty() {
            return self;
        }
        let excluded: HashSet<&str> = excluded.iter().map(|g| g.as_ref()).collect();
        for group in &excluded {
            if !self.groups.iter().any(|g| g.as_str() == *group) {
                warn!("Excluded group '{}' does not occur in the embedding.", group);
            }
        }

        let kept: Vec<usize> = self
            .groups
            .iter()
            .enumerate()
            .filter(|(_, group)| !excluded.contains(group.as_str()))
            .map(|(idx, _)| idx)
            .collect();
        info!(
            "Keeping {} of {} samples after excluding groups {:?}.",
            kept.len(),
            self.n_samples(),
            excluded
        );

        Self {
            values: self.values.select(Axis(0), &kept),
            sample_ids: kept.iter().map(|&i| self.sample_ids[i].clone()).collect(),
            groups: kept.iter().map(|&i| self.groups[i].clone()).collect(),
            pathways: self.pathways,
        }
    }
}

/// Splits a comma-separated group list, ignoring empty entries.
pub fn parse_groups(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(str::to_string)
        .collect()
}
