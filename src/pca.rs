// src/pca.rs

//! Principal component projection of an embedding matrix.

use log::{debug, info};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{AnalysisError, Result};
use crate::linalg_backends::{BackendSVD, NdarrayLinAlgBackend};

/// Relative tolerance under which a column's standard deviation counts as zero.
///
/// A column is degenerate when `std <= DEGENERATE_STD_TOLERANCE * max|x|` over that
/// column, so an all-zero column is degenerate too.
pub const DEGENERATE_STD_TOLERANCE: f64 = 1e-12;

/// Which sample coordinates a plot uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScoreScaling {
    /// Left singular vectors `U`.
    #[default]
    Unscaled,
    /// `U * diag(s)`, i.e. the standardized data projected onto the loadings.
    SingularValues,
}

/// A column-standardized copy of a matrix together with the statistics used.
#[derive(Debug, Clone)]
pub struct Standardized {
    pub data: Array2<f64>,
    pub mean: Array1<f64>,
    pub scale: Array1<f64>,
}

/// Subtracts each column's mean and divides by its population standard deviation.
///
/// # Errors
/// - `InsufficientData` for fewer than 2 samples or zero features.
/// - `InvalidValue` for NaN or infinite entries.
/// - `DegenerateColumn` for a zero-variance column.
pub fn standardize(x: ArrayView2<f64>) -> Result<Standardized> {
    let (n_samples, n_features) = x.dim();
    if n_samples < 2 || n_features == 0 {
        return Err(AnalysisError::InsufficientData {
            quantity: "principal components",
            reason: format!(
                "need at least 2 samples and 1 feature, got {} x {}",
                n_samples, n_features
            ),
        });
    }

    for (column_idx, column) in x.axis_iter(Axis(1)).enumerate() {
        if let Some(bad) = column.iter().find(|v| !v.is_finite()) {
            return Err(AnalysisError::InvalidValue {
                context: format!("feature column {}", column_idx),
                value: bad.to_string(),
            });
        }
    }

    let mean = x.mean_axis(Axis(0)).ok_or_else(|| AnalysisError::InsufficientData {
        quantity: "column means",
        reason: "matrix has no rows".to_string(),
    })?;
    let mut data = &x - &mean;
    let scale = data.map_axis(Axis(0), |column| column.std(0.0));

    for (column_idx, (&sd, column)) in scale.iter().zip(x.axis_iter(Axis(1))).enumerate() {
        let magnitude = column.iter().fold(0.0_f64, |acc, v| acc.max(v.abs()));
        if sd <= DEGENERATE_STD_TOLERANCE * magnitude {
            return Err(AnalysisError::DegenerateColumn { column: column_idx });
        }
    }
    data /= &scale;

    Ok(Standardized { data, mean, scale })
}

/// The result of decomposing a standardized matrix `Z = U diag(s) Vh`.
#[derive(Debug, Clone)]
pub struct ComponentDecomposition {
    u: Array2<f64>,
    singular_values: Array1<f64>,
    vh: Array2<f64>,
    mean: Array1<f64>,
    scale: Array1<f64>,
}

impl ComponentDecomposition {
    pub fn n_components(&self) -> usize {
        self.singular_values.len()
    }

    /// Left singular vectors, samples x components.
    pub fn u(&self) -> &Array2<f64> {
        &self.u
    }

    pub fn singular_values(&self) -> &Array1<f64> {
        &self.singular_values
    }

    /// Loadings, components x features. Rows are orthonormal.
    pub fn vh(&self) -> &Array2<f64> {
        &self.vh
    }

    pub fn mean(&self) -> &Array1<f64> {
        &self.mean
    }

    pub fn scale(&self) -> &Array1<f64> {
        &self.scale
    }

    /// Fraction of total variance carried by each component.
    pub fn explained_variance_ratio(&self) -> Array1<f64> {
        let squared = self.singular_values.mapv(|s| s * s);
        let total = squared.sum();
        if total > 0.0 {
            squared / total
        } else {
            Array1::zeros(squared.len())
        }
    }

    /// Sample coordinates in component space.
    pub fn projected(&self, scaling: ScoreScaling) -> Array2<f64> {
        match scaling {
            ScoreScaling::Unscaled => self.u.clone(),
            ScoreScaling::SingularValues => &self.u * &self.singular_values,
        }
    }

    /// `U diag(s) Vh`, which equals the standardized input.
    pub fn reconstruct(&self) -> Array2<f64> {
        (&self.u * &self.singular_values).dot(&self.vh)
    }

    /// Loading vector of one component across all features.
    pub fn loading(&self, component: usize) -> Option<ArrayView1<'_, f64>> {
        (component < self.n_components()).then(|| self.vh.row(component))
    }
}

/// `PC 1`, `PC 2`, ... for `n` components.
pub fn component_names(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("PC {}", i)).collect()
}

/// The three consecutive components starting at `first` (0-based).
pub fn component_triple(first: usize, available: usize) -> Result<[usize; 3]> {
    if first.checked_add(3).map_or(true, |end| end > available) {
        return Err(AnalysisError::ComponentOutOfRange { first, available });
    }
    Ok([first, first + 1, first + 2])
}

/// Standardizes a matrix and decomposes it with the configured SVD backend.
#[derive(Debug, Default, Clone, Copy)]
pub struct PcaProjector<B: BackendSVD = NdarrayLinAlgBackend> {
    backend: B,
}

impl PcaProjector {
    pub fn new() -> Self {
        Self {
            backend: NdarrayLinAlgBackend,
        }
    }
}

impl<B: BackendSVD> PcaProjector<B> {
    pub fn with_backend(backend: B) -> Self {
        Self { backend }
    }

    /// Decomposes `x` (samples x features) into `min(n, d)` components.
    ///
    /// Component signs are fixed so the largest-magnitude loading of each
    /// component is positive; the matching column of `U` is flipped with it.
    pub fn decompose(&self, x: ArrayView2<f64>) -> Result<ComponentDecomposition> {
        let (n_samples, n_features) = x.dim();
        info!(
            "Standardizing embedding matrix ({} samples x {} features).",
            n_samples, n_features
        );
        let Standardized { data, mean, scale } = standardize(x)?;

        let svd = self.backend.thin_svd(data)?;
        let mut u = svd.u;
        let mut vh = svd.vt;
        let singular_values = svd.s;

        for (component, mut loading) in vh.axis_iter_mut(Axis(0)).enumerate() {
            let pivot = loading
                .iter()
                .copied()
                .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
            if pivot < 0.0 {
                loading.mapv_inplace(|v| -v);
                u.column_mut(component).mapv_inplace(|v| -v);
            }
        }

        let decomposition = ComponentDecomposition {
            u,
            singular_values,
            vh,
            mean,
            scale,
        };
        let ratio = decomposition.explained_variance_ratio();
        info!(
            "Computed {} principal components.",
            decomposition.n_components()
        );
        for (i, r) in ratio.iter().take(5).enumerate() {
            debug!("PC {} explains {:.2}% of variance.", i + 1, r * 100.0);
        }
        Ok(decomposition)
    }
}
