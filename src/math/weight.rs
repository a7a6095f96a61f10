//! Observation weight matrix (inverse error covariance).
//!
//! The observation vector is stacked as `[dRA_0 .. dRA_{N-1}, dDec_0 .. dDec_{N-1}]`.
//! Errors of different sources are independent, so the `2N x 2N` covariance only
//! couples entries `i` and `i + N`. After permuting to `(dRA_i, dDec_i)` pairs it is
//! block diagonal, and its inverse is the set of inverted 2x2 blocks:
//!
//! ```text
//! C_i = [ σa²     ρσaσd ]      W_i = 1 / (σa²σd²(1 - ρ²)) * [  σd²    -ρσaσd ]
//!       [ ρσaσd   σd²   ]                                   [ -ρσaσd   σa²   ]
//! ```

use nalgebra::{DMatrix, DVector};

use crate::error::VshError;

/// Inverse of one observation's 2x2 error covariance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeightBlock {
    pub w_aa: f64,
    pub w_ad: f64,
    pub w_dd: f64,
}

/// Weight matrix of a stacked `(dRA, dDec)` observation vector.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightMatrix {
    blocks: Vec<WeightBlock>,
    sigmas: Vec<(f64, f64, f64)>,
}

impl WeightMatrix {
    /// Assemble and invert the covariance.
    ///
    /// `corr` holds RA/Dec correlation coefficients; without it the errors are
    /// independent and the matrix is diagonal.
    pub fn new(e_dra: &[f64], e_ddec: &[f64], corr: Option<&[f64]>) -> Result<Self, VshError> {
        let n = e_dra.len();
        if e_ddec.len() != n {
            return Err(VshError::ShapeMismatch {
                field: "e_ddec",
                expected: n,
                found: e_ddec.len(),
            });
        }
        if let Some(c) = corr {
            if c.len() != n {
                return Err(VshError::ShapeMismatch {
                    field: "corr",
                    expected: n,
                    found: c.len(),
                });
            }
        }

        let mut blocks = Vec::with_capacity(n);
        let mut sigmas = Vec::with_capacity(n);
        for i in 0..n {
            let rho = corr.map_or(0.0, |c| c[i]);
            blocks.push(invert_block(i, e_dra[i], e_ddec[i], rho)?);
            sigmas.push((e_dra[i], e_ddec[i], rho));
        }

        Ok(Self { blocks, sigmas })
    }

    /// Number of observations `N` (the matrix is `2N x 2N`).
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// `Jᵀ W` for a `2N x P` design matrix, without materializing `W`.
    pub fn jt_w(&self, jac: &DMatrix<f64>) -> Result<DMatrix<f64>, VshError> {
        let n = self.blocks.len();
        if jac.nrows() != 2 * n {
            return Err(VshError::ShapeMismatch {
                field: "design rows",
                expected: 2 * n,
                found: jac.nrows(),
            });
        }

        let p = jac.ncols();
        let mut out = DMatrix::<f64>::zeros(p, 2 * n);
        for (i, b) in self.blocks.iter().enumerate() {
            for k in 0..p {
                let ja = jac[(i, k)];
                let jd = jac[(i + n, k)];
                out[(k, i)] = ja * b.w_aa + jd * b.w_ad;
                out[(k, i + n)] = ja * b.w_ad + jd * b.w_dd;
            }
        }
        Ok(out)
    }

    /// Dense `2N x 2N` weight matrix in the stacked layout.
    pub fn to_dense(&self) -> DMatrix<f64> {
        let n = self.blocks.len();
        let mut w = DMatrix::<f64>::zeros(2 * n, 2 * n);
        for (i, b) in self.blocks.iter().enumerate() {
            w[(i, i)] = b.w_aa;
            w[(i + n, i + n)] = b.w_dd;
            w[(i, i + n)] = b.w_ad;
            w[(i + n, i)] = b.w_ad;
        }
        w
    }

    /// Dense `2N x 2N` covariance the weights were derived from.
    pub fn covariance_dense(&self) -> DMatrix<f64> {
        let n = self.sigmas.len();
        let mut c = DMatrix::<f64>::zeros(2 * n, 2 * n);
        for (i, &(sa, sd, rho)) in self.sigmas.iter().enumerate() {
            c[(i, i)] = sa * sa;
            c[(i + n, i + n)] = sd * sd;
            c[(i, i + n)] = rho * sa * sd;
            c[(i + n, i)] = rho * sa * sd;
        }
        c
    }
}

fn invert_block(index: usize, sa: f64, sd: f64, rho: f64) -> Result<WeightBlock, VshError> {
    if !(sa.is_finite() && sa > 0.0 && sd.is_finite() && sd > 0.0) {
        return Err(VshError::SingularCovariance {
            index,
            reason: format!("uncertainties must be finite and > 0 (got {sa}, {sd})"),
        });
    }
    if !rho.is_finite() || rho.abs() >= 1.0 {
        return Err(VshError::SingularCovariance {
            index,
            reason: format!("correlation must lie in (-1, 1) (got {rho})"),
        });
    }

    let va = sa * sa;
    let vd = sd * sd;
    let cov = rho * sa * sd;
    let det = va * vd - cov * cov;
    if !(det.is_finite() && det > 0.0) {
        return Err(VshError::SingularCovariance {
            index,
            reason: format!("covariance determinant is {det}"),
        });
    }

    Ok(WeightBlock {
        w_aa: vd / det,
        w_ad: -cov / det,
        w_dd: va / det,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn weight_matrix_is_symmetric_and_inverts_covariance() {
        let e_dra = [1.0, 2.5, 0.3, 4.0];
        let e_ddec = [1.5, 0.7, 0.3, 2.0];
        let corr = [0.0, 0.4, -0.9, 0.2];
        let w = WeightMatrix::new(&e_dra, &e_ddec, Some(&corr)).unwrap();

        let dense = w.to_dense();
        assert_eq!(dense.shape(), (8, 8));
        assert_abs_diff_eq!(dense.clone(), dense.transpose(), epsilon = 1e-15);
        assert!(dense.clone().cholesky().is_some(), "weight matrix must be positive definite");

        let ident = &dense * w.covariance_dense();
        assert_abs_diff_eq!(ident, DMatrix::<f64>::identity(8, 8), epsilon = 1e-10);
    }

    #[test]
    fn no_correlation_gives_diagonal_weights() {
        let w = WeightMatrix::new(&[2.0, 4.0], &[1.0, 0.5], None).unwrap();
        let dense = w.to_dense();
        let expected = DMatrix::from_diagonal(&DVector::from_row_slice(&[0.25, 0.0625, 1.0, 4.0]));
        assert_abs_diff_eq!(dense, expected, epsilon = 1e-15);
    }

    #[test]
    fn jt_w_matches_dense_product() {
        let w = WeightMatrix::new(&[1.0, 2.0, 3.0], &[0.5, 1.0, 1.5], Some(&[0.3, -0.2, 0.6])).unwrap();
        let jac = DMatrix::from_fn(6, 2, |r, c| (r as f64 + 1.0) * (c as f64 - 0.5));
        let fast = w.jt_w(&jac).unwrap();
        let slow = jac.transpose() * w.to_dense();
        assert_abs_diff_eq!(fast, slow, epsilon = 1e-12);
    }

    #[test]
    fn jt_w_rejects_wrong_row_count() {
        let w = WeightMatrix::new(&[1.0, 2.0], &[1.0, 2.0], None).unwrap();
        let jac = DMatrix::<f64>::zeros(3, 2);
        assert_eq!(
            w.jt_w(&jac).unwrap_err(),
            VshError::ShapeMismatch {
                field: "design rows",
                expected: 4,
                found: 3,
            }
        );
    }

    #[test]
    fn degenerate_covariances_are_rejected() {
        assert!(matches!(
            WeightMatrix::new(&[1.0, 0.0], &[1.0, 1.0], None),
            Err(VshError::SingularCovariance { index: 1, .. })
        ));
        assert!(matches!(
            WeightMatrix::new(&[1.0], &[1.0], Some(&[1.0])),
            Err(VshError::SingularCovariance { index: 0, .. })
        ));
        assert!(matches!(
            WeightMatrix::new(&[1.0], &[1.0, 2.0], None),
            Err(VshError::ShapeMismatch { .. })
        ));
    }
}
