// src/linalg_backends.rs

use ndarray::{s, Array1, Array2};
use ndarray_linalg::SVDInto as NdLinalgSVDInto;

use crate::error::{AnalysisError, Result};

/// Output of a thin Singular Value Decomposition `A = U diag(s) Vt`.
///
/// For an `n x d` input with `k = min(n, d)`: `u` is `n x k`, `s` has length
/// `k` (descending), `vt` is `k x d`.
#[derive(Debug)]
pub struct SVDOutput {
    pub u: Array2<f64>,
    pub s: Array1<f64>,
    pub vt: Array2<f64>,
}

/// Trait for Singular Value Decomposition.
pub trait BackendSVD {
    fn thin_svd(&self, matrix: Array2<f64>) -> Result<SVDOutput>;
}

/// LAPACK-backed SVD through `ndarray-linalg`.
#[derive(Debug, Default, Copy, Clone)]
pub struct NdarrayLinAlgBackend;

impl BackendSVD for NdarrayLinAlgBackend {
    fn thin_svd(&self, matrix: Array2<f64>) -> Result<SVDOutput> {
        let (nrows, ncols) = matrix.dim();
        let k = nrows.min(ncols);
        if k == 0 {
            return Ok(SVDOutput {
                u: Array2::zeros((nrows, 0)),
                s: Array1::zeros(0),
                vt: Array2::zeros((0, ncols)),
            });
        }

        // LAPACK returns the full square factors; keep the leading k.
        let (u, s, vt) = matrix
            .svd_into(true, true)
            .map_err(|e| AnalysisError::LinearAlgebra(format!("SVD failed: {}", e)))?;
        let u = u.ok_or_else(|| AnalysisError::LinearAlgebra("SVD did not return U".to_string()))?;
        let vt = vt.ok_or_else(|| AnalysisError::LinearAlgebra("SVD did not return Vt".to_string()))?;

        Ok(SVDOutput {
            u: u.slice(s![.., ..k]).to_owned(),
            s: s.slice(s![..k]).to_owned(),
            vt: vt.slice(s![..k, ..]).to_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn thin_factors_have_expected_shapes() {
        let wide = array![[1.0, 2.0, 3.0, 4.0], [2.0, 0.0, 1.0, -1.0]];
        let out = NdarrayLinAlgBackend.thin_svd(wide.clone()).unwrap();
        assert_eq!(out.u.dim(), (2, 2));
        assert_eq!(out.s.len(), 2);
        assert_eq!(out.vt.dim(), (2, 4));

        let rebuilt = out.u.dot(&Array2::from_diag(&out.s)).dot(&out.vt);
        for (a, b) in rebuilt.iter().zip(wide.iter()) {
            assert_abs_diff_eq!(*a, *b, epsilon = 1e-10);
        }

        let tall = wide.t().to_owned();
        let out = NdarrayLinAlgBackend.thin_svd(tall).unwrap();
        assert_eq!(out.u.dim(), (4, 2));
        assert_eq!(out.vt.dim(), (2, 2));
        assert!(out.s[0] >= out.s[1]);
    }
}
