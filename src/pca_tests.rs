use crate::error::{AnalysisError, Result};
use crate::linalg_backends::{BackendSVD, NdarrayLinAlgBackend, SVDOutput};
use crate::pca::{component_names, component_triple, standardize, PcaProjector, ScoreScaling};
use std::cell::Cell;
use approx::assert_abs_diff_eq;
use ndarray::{array, Array2, Axis};
use ndarray_linalg::{Eigh, UPLO};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn generate_random_data(n_samples: usize, n_features: usize, seed: u64) -> Array2<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    Array2::from_shape_fn((n_samples, n_features), |_| rng.gen_range(-3.0..3.0))
}

fn assert_matrices_close(a: &Array2<f64>, b: &Array2<f64>, tolerance: f64) {
    assert_eq!(a.dim(), b.dim(), "Matrix dimensions differ");
    for ((idx, x), y) in a.indexed_iter().zip(b.iter()) {
        assert!(
            (x - y).abs() < tolerance,
            "Mismatch at {:?}: {} vs {} (diff: {})",
            idx,
            x,
            y,
            (x - y).abs()
        );
    }
}

#[cfg(test)]
mod standardize_tests {
    use super::*;

    #[test]
    fn columns_have_zero_mean_and_unit_variance() {
        let x = generate_random_data(40, 6, 7);
        let standardized = standardize(x.view()).unwrap();
        for column in standardized.data.axis_iter(Axis(1)) {
            assert_abs_diff_eq!(column.mean().unwrap(), 0.0, epsilon = 1e-12);
            assert_abs_diff_eq!(column.std(0.0), 1.0, epsilon = 1e-12);
        }
        assert_eq!(standardized.mean.len(), 6);
        assert_eq!(standardized.scale.len(), 6);
    }

    #[test]
    fn zero_variance_column_is_degenerate() {
        let x = array![[1.0, 0.1, 5.0], [2.0, 0.1, 3.0], [3.0, 0.1, 4.0]];
        match standardize(x.view()) {
            Err(AnalysisError::DegenerateColumn { column }) => assert_eq!(column, 1),
            other => panic!("expected DegenerateColumn, got {:?}", other),
        }
    }

    #[test]
    fn projector_refuses_degenerate_input() {
        let x = array![[1.0, 7.0], [2.0, 7.0], [4.0, 7.0], [8.0, 7.0]];
        assert!(matches!(
            PcaProjector::new().decompose(x.view()),
            Err(AnalysisError::DegenerateColumn { column: 1 })
        ));
    }

    #[test]
    fn tiny_but_varying_column_is_kept() {
        let x = array![[1.0, 1e-13], [2.0, 2e-13], [4.0, 3e-13]];
        let standardized = standardize(x.view()).unwrap();
        let column = standardized.data.column(1);
        assert_abs_diff_eq!(column.mean().unwrap(), 0.0, epsilon = 1e-9);
        assert_abs_diff_eq!(column.std(0.0), 1.0, epsilon = 1e-9);
        assert!(standardized.scale[1] > 0.0);
    }

    #[test]
    fn all_zero_column_is_degenerate() {
        let x = array![[1.0, 0.0], [2.0, 0.0], [3.0, 0.0]];
        assert!(matches!(
            standardize(x.view()),
            Err(AnalysisError::DegenerateColumn { column: 1 })
        ));
    }

    #[test]
    fn too_few_samples() {
        let x = array![[1.0, 2.0, 3.0]];
        assert!(matches!(
            standardize(x.view()),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }

    #[test]
    fn non_finite_values_are_rejected() {
        let x = array![[1.0, 2.0], [f64::NAN, 3.0], [0.0, 1.0]];
        assert!(matches!(
            standardize(x.view()),
            Err(AnalysisError::InvalidValue { .. })
        ));
    }
}

#[cfg(test)]
mod decomposition_tests {
    use super::*;

    fn check_decomposition(n_samples: usize, n_features: usize, seed: u64) {
        let x = generate_random_data(n_samples, n_features, seed);
        let decomposition = PcaProjector::new().decompose(x.view()).unwrap();
        let k = n_samples.min(n_features);

        assert_eq!(decomposition.n_components(), k);
        assert_eq!(decomposition.u().dim(), (n_samples, k));
        assert_eq!(decomposition.vh().dim(), (k, n_features));

        // U diag(s) Vh reproduces the standardized matrix.
        let standardized = standardize(x.view()).unwrap().data;
        assert_matrices_close(&decomposition.reconstruct(), &standardized, 1e-9);

        // Loadings are orthonormal.
        let gram = decomposition.vh().dot(&decomposition.vh().t());
        assert_matrices_close(&gram, &Array2::eye(k), 1e-9);

        // Singular values are sorted and non-negative.
        let s = decomposition.singular_values();
        for pair in s.windows(2) {
            assert!(pair[0] + 1e-12 >= pair[1]);
        }
        assert!(s.iter().all(|&v| v >= 0.0));

        let ratio_sum: f64 = decomposition.explained_variance_ratio().sum();
        assert_abs_diff_eq!(ratio_sum, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn tall_matrices() {
        for seed in 0..5 {
            check_decomposition(30, 5, seed);
        }
    }

    #[test]
    fn wide_matrices() {
        for seed in 0..5 {
            check_decomposition(6, 25, seed);
        }
    }

    #[test]
    fn square_matrix() {
        check_decomposition(12, 12, 1337);
    }

    #[test]
    fn variances_match_correlation_eigenvalues() {
        let x = generate_random_data(50, 4, 42);
        let n = x.nrows() as f64;
        let decomposition = PcaProjector::new().decompose(x.view()).unwrap();

        let z = standardize(x.view()).unwrap().data;
        let correlation = z.t().dot(&z) / n;
        let (eigenvalues, _) = correlation.eigh(UPLO::Upper).unwrap();
        let mut eigenvalues = eigenvalues.to_vec();
        eigenvalues.sort_by(|a, b| b.partial_cmp(a).unwrap());

        for (s, lambda) in decomposition.singular_values().iter().zip(eigenvalues.iter()) {
            assert_abs_diff_eq!(s * s / n, *lambda, epsilon = 1e-9);
        }
    }

    #[test]
    fn signs_are_deterministic() {
        let x = generate_random_data(20, 8, 3);
        let decomposition = PcaProjector::new().decompose(x.view()).unwrap();
        for row in decomposition.vh().axis_iter(Axis(0)) {
            let pivot = row
                .iter()
                .copied()
                .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
            assert!(pivot > 0.0);
        }
    }

    #[test]
    fn scaled_scores_are_projection_onto_loadings() {
        let x = generate_random_data(15, 4, 9);
        let decomposition = PcaProjector::new().decompose(x.view()).unwrap();
        let z = standardize(x.view()).unwrap().data;
        let projected = z.dot(&decomposition.vh().t());
        assert_matrices_close(
            &decomposition.projected(ScoreScaling::SingularValues),
            &projected,
            1e-9,
        );
        assert_matrices_close(
            &decomposition.projected(ScoreScaling::Unscaled),
            decomposition.u(),
            1e-15,
        );
    }

    #[test]
    fn loading_lookup() {
        let x = generate_random_data(10, 3, 11);
        let decomposition = PcaProjector::new().decompose(x.view()).unwrap();
        assert_eq!(decomposition.loading(2).unwrap().len(), 3);
        assert!(decomposition.loading(3).is_none());
    }
}

#[cfg(test)]
mod component_selection_tests {
    use super::*;

    #[test]
    fn names_are_one_based() {
        assert_eq!(component_names(3), vec!["PC 1", "PC 2", "PC 3"]);
    }

    #[test]
    fn triples_must_fit() {
        assert_eq!(component_triple(0, 3).unwrap(), [0, 1, 2]);
        assert_eq!(component_triple(2, 5).unwrap(), [2, 3, 4]);
        assert!(matches!(
            component_triple(3, 5),
            Err(AnalysisError::ComponentOutOfRange { first: 3, available: 5 })
        ));
    }

    #[test]
    fn huge_first_index_is_out_of_range() {
        match component_triple(usize::MAX, 5) {
            Err(AnalysisError::ComponentOutOfRange { first, available }) => {
                assert_eq!(first, usize::MAX);
                assert_eq!(available, 5);
            }
            other => panic!("expected ComponentOutOfRange, got {:?}", other),
        }
        assert!(component_triple(usize::MAX - 2, usize::MAX).is_err());
    }
}

#[cfg(test)]
mod backend_tests {
    use super::*;

    struct CountingBackend<'a> {
        calls: &'a Cell<usize>,
    }

    impl BackendSVD for CountingBackend<'_> {
        fn thin_svd(&self, matrix: Array2<f64>) -> Result<SVDOutput> {
            self.calls.set(self.calls.get() + 1);
            NdarrayLinAlgBackend.thin_svd(matrix)
        }
    }

    struct FailingBackend;

    impl BackendSVD for FailingBackend {
        fn thin_svd(&self, _matrix: Array2<f64>) -> Result<SVDOutput> {
            Err(AnalysisError::LinearAlgebra("did not converge".to_string()))
        }
    }

    #[test]
    fn custom_backend_is_used() {
        let calls = Cell::new(0);
        let x = generate_random_data(12, 4, 21);
        let decomposition = PcaProjector::with_backend(CountingBackend { calls: &calls })
            .decompose(x.view())
            .unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(decomposition.n_components(), 4);

        let reference = standardize(x.view()).unwrap();
        assert_eq!(decomposition.mean(), &reference.mean);
        assert_eq!(decomposition.scale(), &reference.scale);
    }

    #[test]
    fn backend_failure_propagates() {
        let x = generate_random_data(5, 3, 2);
        assert!(matches!(
            PcaProjector::with_backend(FailingBackend).decompose(x.view()),
            Err(AnalysisError::LinearAlgebra(_))
        ));
    }
}
