//! Weighted least squares with a full observation weight matrix.
//!
//! We solve the normal equations
//!
//! ```text
//! (Jᵀ W J) x = Jᵀ W b
//! ```
//!
//! `Jᵀ W J` is symmetric positive definite whenever the design columns are linearly
//! independent, so we factorize it with Cholesky. The same factor gives the parameter
//! covariance `(Jᵀ W J)⁻¹` for the formal errors and correlations.

use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::VshError;
use crate::math::WeightMatrix;

/// Smallest accepted squared Cholesky pivot, relative to the largest diagonal entry.
const PIVOT_TOL: f64 = 1e-12;

/// Estimate, formal uncertainties, and correlation matrix of one solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LsqSolution {
    pub params: Vec<f64>,
    pub sigmas: Vec<f64>,
    /// Row-major `P x P` correlation matrix.
    pub correlation: Vec<Vec<f64>>,
}

impl LsqSolution {
    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

/// Solve the weighted normal equations.
///
/// `b` is the stacked `(dRA, dDec)` observation vector matching the rows of `jac`.
pub fn solve_weighted(
    jac: &DMatrix<f64>,
    weights: &WeightMatrix,
    b: &DVector<f64>,
) -> Result<LsqSolution, VshError> {
    let p = jac.ncols();
    if b.len() != jac.nrows() {
        return Err(VshError::ShapeMismatch {
            field: "observations",
            expected: jac.nrows(),
            found: b.len(),
        });
    }
    let jtw = weights.jt_w(jac)?;
    let normal = &jtw * jac;
    let rhs = &jtw * b;

    let scale = (0..p).map(|k| normal[(k, k)]).fold(0.0, f64::max);
    let chol = normal
        .cholesky()
        .ok_or(VshError::SingularNormalMatrix { size: p })?;

    // Rank deficiency can survive factorization as rounding-level pivots.
    let l = chol.l();
    if (0..p).any(|k| l[(k, k)] * l[(k, k)] <= PIVOT_TOL * scale) {
        return Err(VshError::SingularNormalMatrix { size: p });
    }

    let x = chol.solve(&rhs);
    let cov = chol.inverse();

    let sigmas: Vec<f64> = (0..p).map(|k| cov[(k, k)].sqrt()).collect();
    if x.iter().chain(sigmas.iter()).any(|v| !v.is_finite()) {
        return Err(VshError::SingularNormalMatrix { size: p });
    }

    let correlation = (0..p)
        .map(|k| {
            (0..p)
                .map(|l| cov[(k, l)] / (sigmas[k] * sigmas[l]))
                .collect()
        })
        .collect();

    Ok(LsqSolution {
        params: x.iter().copied().collect(),
        sigmas,
        correlation,
    })
}
