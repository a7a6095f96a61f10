//! Normalized separation between the two catalog positions of a source.
//!
//! For normalized coordinate differences `X_a = dRA/σ_dRA`, `X_d = dDec/σ_dDec` and the
//! correlation `C` between them:
//!
//! ```text
//! X² = [X_a X_d] · [[1, C], [C, 1]]⁻¹ · [X_a X_d]ᵀ
//!    = (X_a² - 2 C X_a X_d + X_d²) / (1 - C²)
//! ```
//!
//! The 2x2 matrix is singular for `|C| = 1`; such observations get an error of their
//! own and do not affect the others.

use crate::domain::{Observation, ObservationSet};
use crate::error::VshError;

/// Separation diagnostics of one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct Separation {
    /// Angular separation `sqrt(dRA² + dDec²)` (µas).
    pub ang_sep: f64,
    pub x_a: f64,
    pub x_d: f64,
    pub corr: f64,
    /// Normalized separation, or the degenerate-correlation error for this observation.
    pub x: Result<f64, VshError>,
}

impl Separation {
    pub fn is_degenerate(&self) -> bool {
        self.x.is_err()
    }
}

/// Normalized separation from normalized differences and their correlation.
///
/// `index` only labels the error.
pub fn normalized_separation(x_a: f64, x_d: f64, corr: f64, index: usize) -> Result<f64, VshError> {
    if !corr.is_finite() || corr.abs() >= 1.0 {
        return Err(VshError::DegenerateCorrelation { index, corr });
    }
    let q = (x_a * x_a - 2.0 * corr * x_a * x_d + x_d * x_d) / (1.0 - corr * corr);
    Ok(q.max(0.0).sqrt())
}

/// Correlation of a two-catalog difference from each catalog's own RA/Dec errors.
///
/// `C = (σa1 σd1 ρ1 + σa2 σd2 ρ2) / (sqrt(σa1² + σa2²) · sqrt(σd1² + σd2²))`
pub fn combined_correlation(
    (sa1, sd1, rho1): (f64, f64, f64),
    (sa2, sd2, rho2): (f64, f64, f64),
) -> f64 {
    let cov = sa1 * sd1 * rho1 + sa2 * sd2 * rho2;
    let norm = sa1.hypot(sa2) * sd1.hypot(sd2);
    if norm > 0.0 { cov / norm } else { 0.0 }
}

/// Separation diagnostics of one observation.
pub fn separation(obs: &Observation, index: usize) -> Separation {
    let x_a = obs.dra / obs.e_dra;
    let x_d = obs.ddec / obs.e_ddec;
    Separation {
        ang_sep: obs.ang_sep(),
        x_a,
        x_d,
        corr: obs.corr,
        x: normalized_separation(x_a, x_d, obs.corr, index),
    }
}

/// Separation diagnostics for every observation, index-aligned with `obs`.
pub fn separations(obs: &ObservationSet) -> Vec<Separation> {
    obs.iter().enumerate().map(|(i, o)| separation(o, i)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn obs(dra: f64, ddec: f64, e_dra: f64, e_ddec: f64, corr: f64) -> Observation {
        Observation {
            name: "S".to_string(),
            ra: 0.0,
            dec: 0.0,
            dra,
            ddec,
            e_dra,
            e_ddec,
            corr,
        }
    }

    #[test]
    fn zero_correlation_reduces_to_hypot() {
        for &(xa, xd) in &[(0.0, 0.0), (3.0, 4.0), (-1.5, 2.25), (1e3, -7.0)] {
            let x = normalized_separation(xa, xd, 0.0, 0).unwrap();
            assert_relative_eq!(x, f64::hypot(xa, xd), max_relative = 1e-14);
        }
    }

    #[test]
    fn correlation_matches_explicit_inverse() {
        let (xa, xd, c) = (1.2, -0.7, 0.35);
        let m = nalgebra::Matrix2::new(1.0, c, c, 1.0).try_inverse().unwrap();
        let v = nalgebra::Vector2::new(xa, xd);
        let quad: f64 = (v.transpose() * m * v)[(0, 0)];
        let expected = quad.sqrt();
        assert_relative_eq!(normalized_separation(xa, xd, c, 0).unwrap(), expected, epsilon = 1e-12);
    }

    #[test]
    fn degenerate_correlation_is_per_observation() {
        let set = ObservationSet::new(vec![
            obs(3.0, 4.0, 1.0, 1.0, 0.0),
            obs(1.0, 1.0, 1.0, 1.0, 1.0),
            obs(6.0, 8.0, 2.0, 2.0, 0.0),
        ]);
        let seps = separations(&set);
        assert_relative_eq!(seps[0].x.clone().unwrap(), 5.0, epsilon = 1e-12);
        assert_eq!(
            seps[1].x,
            Err(VshError::DegenerateCorrelation { index: 1, corr: 1.0 })
        );
        assert!(seps[1].is_degenerate());
        assert_relative_eq!(seps[2].x.clone().unwrap(), 5.0, epsilon = 1e-12);
        assert_relative_eq!(seps[2].ang_sep, 10.0, epsilon = 1e-12);
    }

    #[test]
    fn combined_correlation_weights_by_uncertainty() {
        // Identical catalogs: the combined correlation equals the individual one.
        let c = combined_correlation((1.0, 2.0, 0.4), (1.0, 2.0, 0.4));
        assert_relative_eq!(c, 0.4, epsilon = 1e-12);

        // A much more precise second catalog barely contributes.
        let c = combined_correlation((1.0, 1.0, 0.5), (1e-3, 1e-3, -0.9));
        assert!((c - 0.5).abs() < 1e-3);
    }
}
