//! Single degree-1 VSH solve over a set of observations.
//!
//! A `FitContext` bundles what one solve needs (the observations, the design matrix
//! and the weight matrix) so the iterator can rebuild it for each kept
//! subset without threading loose arrays around.

use nalgebra::{DMatrix, DVector};

use crate::domain::{FitMode, ObservationSet};
use crate::error::VshError;
use crate::math::{LsqSolution, WeightMatrix, design_matrix, forward, solve_weighted};

/// Observed minus computed `(dRA*cosDec, dDec)`, index-aligned with the observations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Residuals {
    pub ra: Vec<f64>,
    pub dec: Vec<f64>,
}

impl Residuals {
    pub fn len(&self) -> usize {
        self.ra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ra.is_empty()
    }
}

/// Everything needed to solve one weighted least-squares problem.
#[derive(Debug, Clone)]
pub struct FitContext<'a> {
    obs: &'a ObservationSet,
    jac: DMatrix<f64>,
    weights: WeightMatrix,
}

impl<'a> FitContext<'a> {
    /// Build the design and weight matrices for `obs`.
    pub fn new(obs: &'a ObservationSet, mode: FitMode) -> Result<Self, VshError> {
        let p = mode.param_count();
        if 2 * obs.len() < p {
            return Err(VshError::InsufficientData {
                kept: obs.len(),
                params: p,
            });
        }

        let jac = design_matrix(&obs.ra(), &obs.dec(), mode)?;
        let corr = obs.corr();
        let weights = WeightMatrix::new(&obs.e_dra(), &obs.e_ddec(), Some(&corr))?;

        Ok(Self { obs, jac, weights })
    }

    /// Stacked `[dRA.., dDec..]` observation vector.
    pub fn observation_vector(&self) -> DVector<f64> {
        let n = self.obs.len();
        let mut b = DVector::<f64>::zeros(2 * n);
        for (i, o) in self.obs.iter().enumerate() {
            b[i] = o.dra;
            b[i + n] = o.ddec;
        }
        b
    }

    pub fn solve(&self) -> Result<LsqSolution, VshError> {
        solve_weighted(&self.jac, &self.weights, &self.observation_vector())
    }
}

/// Fit the degree-1 VSH parameters of `mode` to all of `obs`.
pub fn solve_deg01(obs: &ObservationSet, mode: FitMode) -> Result<LsqSolution, VshError> {
    FitContext::new(obs, mode)?.solve()
}

/// Residuals of `obs` against the exact forward model at `params`.
pub fn residuals(obs: &ObservationSet, params: &[f64], mode: FitMode) -> Result<Residuals, VshError> {
    let (model_ra, model_dec) = forward(&obs.ra(), &obs.dec(), params, mode)?;
    let ra = obs.iter().zip(&model_ra).map(|(o, m)| o.dra - m).collect();
    let dec = obs.iter().zip(&model_dec).map(|(o, m)| o.ddec - m).collect();
    Ok(Residuals { ra, dec })
}
