//! Weighted summary statistics and the 2-D chi-square.

use serde::{Deserialize, Serialize};

use crate::domain::Observation;

/// Weighted mean, weighted rms, and weighted standard deviation of a sample.
///
/// Weights are `1/σ²`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedStats {
    pub mean: f64,
    pub wrms: f64,
    pub std: f64,
}

/// Weighted statistics of `x` given its formal errors.
///
/// Returns `None` for an empty sample or non-positive total weight.
pub fn weighted_stats(x: &[f64], err: &[f64]) -> Option<WeightedStats> {
    if x.is_empty() || x.len() != err.len() {
        return None;
    }

    let mut sw = 0.0;
    let mut swx = 0.0;
    let mut swx2 = 0.0;
    for (&xi, &ei) in x.iter().zip(err) {
        let w = 1.0 / (ei * ei);
        if !w.is_finite() {
            return None;
        }
        sw += w;
        swx += w * xi;
        swx2 += w * xi * xi;
    }
    if sw <= 0.0 {
        return None;
    }

    let mean = swx / sw;
    let wrms = (swx2 / sw).sqrt();
    let var = x
        .iter()
        .zip(err)
        .map(|(&xi, &ei)| (xi - mean).powi(2) / (ei * ei))
        .sum::<f64>()
        / sw;

    Some(WeightedStats {
        mean,
        wrms,
        std: var.sqrt(),
    })
}

/// Root mean square about zero with an `n - 1` denominator.
///
/// Single-element samples fall back to the plain mean square.
pub fn rms(x: &[f64]) -> f64 {
    if x.is_empty() {
        return 0.0;
    }
    let dof = (x.len() - 1).max(1) as f64;
    (x.iter().map(|v| v * v).sum::<f64>() / dof).sqrt()
}

/// Weighted rms of residuals: `sqrt(Σ(r/σ)² / Σσ⁻²)`.
pub fn wrms(x: &[f64], err: &[f64]) -> f64 {
    weighted_stats(x, err).map_or(0.0, |s| s.wrms)
}

/// Chi-square of 2-D residuals under each observation's RA/Dec covariance.
///
/// With `n_params = Some(p)` the value is divided by the `2N - p` degrees of freedom.
/// Observations whose covariance is not positive definite are skipped.
pub fn chi2_2d(obs: &[Observation], res_ra: &[f64], res_dec: &[f64], n_params: Option<usize>) -> f64 {
    let mut chi2 = 0.0;
    let mut used = 0usize;
    for ((o, &ra), &dec) in obs.iter().zip(res_ra).zip(res_dec) {
        let va = o.e_dra * o.e_dra;
        let vd = o.e_ddec * o.e_ddec;
        let cov = o.cov();
        let det = va * vd - cov * cov;
        if !(det.is_finite() && det > 0.0) {
            continue;
        }
        chi2 += (vd * ra * ra - 2.0 * cov * ra * dec + va * dec * dec) / det;
        used += 1;
    }

    match n_params {
        Some(p) => {
            let dof = (2 * used).saturating_sub(p);
            if dof == 0 { f64::NAN } else { chi2 / dof as f64 }
        }
        None => chi2,
    }
}
