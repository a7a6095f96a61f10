//! Iterative degree-1 VSH fitting with outlier elimination.
//!
//! The loop has two states, fitting and converged:
//!
//! 1. fit the currently kept observations
//! 2. evaluate residuals with the exact forward model
//! 3. apply the elimination criterion to the kept observations
//! 4. stop when the kept index set is unchanged, otherwise refit
//!
//! Convergence compares index sets, not counts. Criteria only ever drop indices from
//! the kept set, so its size is non-increasing and the loop ends after at most
//! `N + 1` fits.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{ElimMode, ElimOptions, FitMode, ObservationSet};
use crate::error::VshError;
use crate::fit::elimination::{elim_angsep, elim_nsigma, elim_norsep};
use crate::fit::norsep::{Separation, separations};
use crate::fit::solver::{Residuals, residuals, solve_deg01};
use crate::math::{LsqSolution, WeightedStats, chi2_2d, weighted_stats};

/// Relative size of the smallest clipping threshold used by `sigma` elimination.
const CLIP_FLOOR_REL: f64 = 1e-9;

/// Sample sizes of one fitting pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IterationRecord {
    pub iteration: usize,
    pub n_kept: usize,
    pub n_rejected: usize,
}

/// Weighted statistics of the RA and Dec components of a sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisStats {
    pub ra: Option<WeightedStats>,
    pub dec: Option<WeightedStats>,
}

/// Converged result of `vsh_deg01_fit`.
#[derive(Debug, Clone, PartialEq)]
pub struct Deg01Fit {
    pub mode: FitMode,
    pub elim: ElimMode,
    pub solution: LsqSolution,
    /// Indices (into the input set) used by the final fit, ascending.
    pub kept: Vec<usize>,
    /// Indices rejected as outliers, ascending.
    pub outliers: Vec<usize>,
    /// Indices whose normalized separation is undefined (`|C| >= 1`).
    pub degenerate: Vec<usize>,
    /// Residuals of every input observation at the final parameters.
    pub residuals: Residuals,
    pub history: Vec<IterationRecord>,
    /// Weighted statistics of the input differences.
    pub apriori: AxisStats,
    /// Weighted statistics of the kept residuals.
    pub posteriori: AxisStats,
    /// Reduced chi-square of the kept residuals.
    pub reduced_chi2: f64,
}

/// Fit degree-1 VSH parameters with iterative outlier elimination.
pub fn vsh_deg01_fit(
    obs: &ObservationSet,
    mode: FitMode,
    opts: &ElimOptions,
) -> Result<Deg01Fit, VshError> {
    let n = obs.len();
    let p = mode.param_count();
    if n == 0 {
        return Err(VshError::InsufficientData { kept: 0, params: p });
    }
    validate_options(opts)?;

    let apriori = AxisStats {
        ra: weighted_stats(&obs.dra(), &obs.e_dra()),
        dec: weighted_stats(&obs.ddec(), &obs.e_ddec()),
    };

    let seps = match opts.mode {
        ElimMode::AngSep | ElimMode::NorSep | ElimMode::NorAng => separations(obs),
        ElimMode::None | ElimMode::Sigma => Vec::new(),
    };
    let degenerate: Vec<usize> = seps
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_degenerate())
        .map(|(i, _)| i)
        .collect();
    if !degenerate.is_empty() {
        warn!(
            count = degenerate.len(),
            "observations with degenerate RA/Dec correlation are excluded"
        );
    }

    let cap = opts.max_iterations.unwrap_or(n + 1);
    // A unit correlation makes the observation's covariance block singular, so it can
    // neither be weighted nor tested.
    let mut kept: Vec<usize> = (0..n).filter(|i| !degenerate.contains(i)).collect();
    let mut history = Vec::new();

    let solution = loop {
        if history.len() >= cap {
            return Err(VshError::IterationLimit(cap));
        }

        let subset = obs.subset(&kept);
        let solution = solve_deg01(&subset, mode)?;
        history.push(IterationRecord {
            iteration: history.len() + 1,
            n_kept: kept.len(),
            n_rejected: n - kept.len(),
        });
        debug!(
            iteration = history.len(),
            n_kept = kept.len(),
            mode = %mode,
            "fitted kept sample"
        );

        let next = match opts.mode {
            ElimMode::None => break solution,
            ElimMode::Sigma => {
                let res = residuals(&subset, &solution.params, mode)?;
                let floor = clip_floor(&subset);
                let keep = elim_nsigma(
                    &res.ra,
                    &res.dec,
                    &subset.e_dra(),
                    &subset.e_ddec(),
                    opts.n_sigma,
                    opts.use_wrms,
                    floor,
                );
                select(&kept, &keep)
            }
            ElimMode::AngSep => {
                let keep = elim_angsep(&kept_seps(&seps, &kept), opts.max_angsep);
                select(&kept, &keep)
            }
            ElimMode::NorSep => {
                let keep = elim_norsep(&kept_seps(&seps, &kept), opts.max_norsep);
                select(&kept, &keep)
            }
            ElimMode::NorAng => {
                let current = kept_seps(&seps, &kept);
                let by_ang = elim_angsep(&current, opts.max_angsep);
                let by_nor = elim_norsep(&current, opts.max_norsep);
                let keep: Vec<bool> = by_ang.iter().zip(&by_nor).map(|(a, b)| *a && *b).collect();
                select(&kept, &keep)
            }
        };

        if next == kept {
            break solution;
        }
        kept = next;
    };

    let outliers: Vec<usize> = complement(&kept, n);
    let residuals_all = residuals(obs, &solution.params, mode)?;

    let kept_set = obs.subset(&kept);
    let kept_ra: Vec<f64> = kept.iter().map(|&i| residuals_all.ra[i]).collect();
    let kept_dec: Vec<f64> = kept.iter().map(|&i| residuals_all.dec[i]).collect();
    let posteriori = AxisStats {
        ra: weighted_stats(&kept_ra, &kept_set.e_dra()),
        dec: weighted_stats(&kept_dec, &kept_set.e_ddec()),
    };
    let reduced_chi2 = chi2_2d(kept_set.as_slice(), &kept_ra, &kept_dec, Some(p));

    info!(
        mode = %mode,
        elim = %opts.mode,
        iterations = history.len(),
        n_kept = kept.len(),
        n_outliers = outliers.len(),
        "degree-1 VSH fit converged"
    );

    Ok(Deg01Fit {
        mode,
        elim: opts.mode,
        solution,
        kept,
        outliers,
        degenerate,
        residuals: residuals_all,
        history,
        apriori,
        posteriori,
        reduced_chi2,
    })
}

fn validate_options(opts: &ElimOptions) -> Result<(), VshError> {
    if opts.max_iterations == Some(0) {
        return Err(VshError::InvalidInput(
            "maximum number of iterations must be > 0".to_string(),
        ));
    }
    let positive = |v: f64| v.is_finite() && v > 0.0;
    match opts.mode {
        ElimMode::Sigma if !positive(opts.n_sigma) => Err(VshError::InvalidInput(format!(
            "n-sigma must be finite and > 0 (got {})",
            opts.n_sigma
        ))),
        ElimMode::AngSep | ElimMode::NorAng if !positive(opts.max_angsep) => {
            Err(VshError::InvalidInput(format!(
                "maximum angular separation must be finite and > 0 (got {})",
                opts.max_angsep
            )))
        }
        ElimMode::NorSep | ElimMode::NorAng if !positive(opts.max_norsep) => {
            Err(VshError::InvalidInput(format!(
                "maximum normalized separation must be finite and > 0 (got {})",
                opts.max_norsep
            )))
        }
        _ => Ok(()),
    }
}

fn kept_seps<'a>(seps: &'a [Separation], kept: &[usize]) -> Vec<&'a Separation> {
    kept.iter().map(|&i| &seps[i]).collect()
}

/// Indices of `kept` whose mask entry is true.
fn select(kept: &[usize], keep: &[bool]) -> Vec<usize> {
    kept.iter()
        .zip(keep)
        .filter(|(_, k)| **k)
        .map(|(&i, _)| i)
        .collect()
}

/// `0..n` minus the ascending `kept` indices.
fn complement(kept: &[usize], n: usize) -> Vec<usize> {
    let mut mask = vec![true; n];
    for &i in kept {
        mask[i] = false;
    }
    (0..n).filter(|&i| mask[i]).collect()
}

fn clip_floor(obs: &ObservationSet) -> f64 {
    let scale = obs
        .iter()
        .map(|o| o.dra.abs().max(o.ddec.abs()))
        .fold(1.0, f64::max);
    CLIP_FLOOR_REL * scale
}
