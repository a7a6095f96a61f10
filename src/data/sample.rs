//! Synthetic position differences drawn from a known degree-1 VSH field.
//!
//! Sources are spread uniformly over the sphere. Each difference is the exact field
//! value plus Gaussian noise (optionally correlated between RA and Dec) and, with a
//! small probability, a gross error.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use std::f64::consts::TAU;

use crate::domain::{FitMode, Observation, ObservationSet};
use crate::error::VshError;
use crate::math::forward;

/// What to simulate. Angles in radians, everything else in µas.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSpec {
    pub count: usize,
    /// True field `(g1, g2, g3, r1, r2, r3)`.
    pub params: Vec<f64>,
    /// Standard deviation of the injected noise on each axis.
    pub noise: f64,
    /// Formal error reported for each axis.
    pub error: f64,
    /// RA/Dec correlation of both the injected noise and the reported errors.
    pub corr: f64,
    /// Probability that an observation also gets a gross error.
    pub outlier_prob: f64,
    /// Standard deviation of gross errors.
    pub outlier_scale: f64,
}

impl Default for SampleSpec {
    fn default() -> Self {
        Self {
            count: 1000,
            params: vec![0.0; 6],
            noise: 0.0,
            error: 1.0,
            corr: 0.0,
            outlier_prob: 0.0,
            outlier_scale: 0.0,
        }
    }
}

impl SampleSpec {
    fn validate(&self) -> Result<(), VshError> {
        if self.params.len() != FitMode::Full.param_count() {
            return Err(VshError::ShapeMismatch {
                field: "params",
                expected: FitMode::Full.param_count(),
                found: self.params.len(),
            });
        }
        if !(self.noise.is_finite() && self.noise >= 0.0) {
            return Err(VshError::InvalidInput(format!("noise must be >= 0 (got {})", self.noise)));
        }
        if !(self.error.is_finite() && self.error > 0.0) {
            return Err(VshError::InvalidInput(format!("error must be > 0 (got {})", self.error)));
        }
        if !(self.corr.is_finite() && self.corr.abs() < 1.0) {
            return Err(VshError::InvalidInput(format!(
                "correlation must lie in (-1, 1) (got {})",
                self.corr
            )));
        }
        if !(0.0..1.0).contains(&self.outlier_prob) {
            return Err(VshError::InvalidInput(format!(
                "outlier probability must lie in [0, 1) (got {})",
                self.outlier_prob
            )));
        }
        if !(self.outlier_scale.is_finite() && self.outlier_scale >= 0.0) {
            return Err(VshError::InvalidInput(format!(
                "outlier scale must be >= 0 (got {})",
                self.outlier_scale
            )));
        }
        Ok(())
    }
}

/// Draw a reproducible sample for `spec`.
pub fn generate_observations(spec: &SampleSpec, seed: u64) -> Result<ObservationSet, VshError> {
    spec.validate()?;

    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| VshError::InvalidInput(format!("Noise distribution error: {e}")))?;

    let mut ra = Vec::with_capacity(spec.count);
    let mut dec = Vec::with_capacity(spec.count);
    for _ in 0..spec.count {
        ra.push(rng.gen_range(0.0..TAU));
        dec.push(rng.gen_range(-1.0_f64..1.0).asin());
    }

    let (model_ra, model_dec) = forward(&ra, &dec, &spec.params, FitMode::Full)?;
    let mix = (1.0 - spec.corr * spec.corr).sqrt();

    let mut observations = Vec::with_capacity(spec.count);
    for i in 0..spec.count {
        let z1: f64 = normal.sample(&mut rng);
        let z2: f64 = normal.sample(&mut rng);
        let mut dra = model_ra[i] + spec.noise * z1;
        let mut ddec = model_dec[i] + spec.noise * (spec.corr * z1 + mix * z2);

        if spec.outlier_prob > 0.0 && rng.gen_bool(spec.outlier_prob) {
            dra += spec.outlier_scale * normal.sample(&mut rng);
            ddec += spec.outlier_scale * normal.sample(&mut rng);
        }

        observations.push(Observation {
            name: format!("SIM-{:05}", i + 1),
            ra: ra[i],
            dec: dec[i],
            dra,
            ddec,
            e_dra: spec.error,
            e_ddec: spec.error,
            corr: spec.corr,
        });
    }

    Ok(ObservationSet::new(observations))
}
