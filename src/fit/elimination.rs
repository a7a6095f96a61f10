//! Outlier elimination criteria.
//!
//! Each criterion returns a keep-mask aligned with its inputs. The iterator applies
//! them to the currently kept observations only, so an observation once rejected
//! stays rejected.

use crate::fit::norsep::Separation;
use crate::math::{rms, wrms};

/// `n`-sigma clipping on RA and Dec residuals.
///
/// The per-axis scale is the rms about zero (`n - 1` denominator) or, with `use_wrms`,
/// the weighted rms. An observation is kept only if it passes on both axes. `floor` is
/// the smallest threshold used, so residuals at rounding level are never clipped
/// against a vanishing scale.
pub fn elim_nsigma(
    res_ra: &[f64],
    res_dec: &[f64],
    err_ra: &[f64],
    err_dec: &[f64],
    n: f64,
    use_wrms: bool,
    floor: f64,
) -> Vec<bool> {
    let (s_ra, s_dec) = if use_wrms {
        (wrms(res_ra, err_ra), wrms(res_dec, err_dec))
    } else {
        (rms(res_ra), rms(res_dec))
    };
    let lim_ra = (n * s_ra).max(floor);
    let lim_dec = (n * s_dec).max(floor);

    res_ra
        .iter()
        .zip(res_dec)
        .map(|(r, d)| r.abs() <= lim_ra && d.abs() <= lim_dec)
        .collect()
}

/// Keep observations whose angular separation is at most `max_sep` (µas).
pub fn elim_angsep(seps: &[&Separation], max_sep: f64) -> Vec<bool> {
    seps.iter().map(|s| s.ang_sep <= max_sep).collect()
}

/// Keep observations whose normalized separation is at most `max_x`.
///
/// Observations with a degenerate correlation have no normalized separation and are
/// rejected.
pub fn elim_norsep(seps: &[&Separation], max_x: f64) -> Vec<bool> {
    seps.iter()
        .map(|s| matches!(s.x, Ok(x) if x <= max_x))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VshError;

    fn sep(ang_sep: f64, x: Result<f64, VshError>) -> Separation {
        Separation {
            ang_sep,
            x_a: 0.0,
            x_d: 0.0,
            corr: 0.0,
            x,
        }
    }

    #[test]
    fn nsigma_rejects_on_either_axis() {
        let mut ra = vec![0.5, -0.4, 0.3, -0.2, 0.1, 0.0, 0.2, -0.3, 0.4, -0.5];
        let mut dec = ra.iter().map(|v| -v).collect::<Vec<f64>>();
        ra.push(20.0);
        dec.push(0.0);
        ra.push(0.0);
        dec.push(-20.0);
        let err = vec![1.0; ra.len()];

        let keep = elim_nsigma(&ra, &dec, &err, &err, 2.0, false, 0.0);
        assert_eq!(keep.iter().filter(|k| **k).count(), 10);
        assert!(!keep[10]);
        assert!(!keep[11]);
    }

    #[test]
    fn nsigma_floor_keeps_perfect_fits() {
        let ra = [1e-17, -2e-17, 0.0, 3e-16];
        let dec = [0.0, 1e-17, -1e-17, 0.0];
        let err = [1.0; 4];
        let keep = elim_nsigma(&ra, &dec, &err, &err, 1.0, false, 1e-9);
        assert!(keep.iter().all(|k| *k));
    }

    #[test]
    fn nsigma_wrms_scale_downweights_noisy_points() {
        // The large residual has a large error, so the weighted scale stays small
        // and that residual is clipped.
        let ra = [1.0, -1.0, 1.0, -1.0, 8.0];
        let dec = [0.0; 5];
        let err_ra = [1.0, 1.0, 1.0, 1.0, 100.0];
        let err_dec = [1.0; 5];
        let plain = elim_nsigma(&ra, &dec, &err_ra, &err_dec, 2.0, false, 0.0);
        let weighted = elim_nsigma(&ra, &dec, &err_ra, &err_dec, 2.0, true, 0.0);
        assert!(plain[4]);
        assert!(!weighted[4]);
        assert!(weighted[..4].iter().all(|k| *k));
    }

    #[test]
    fn separation_criteria() {
        let a = sep(5_000.0, Ok(2.0));
        let b = sep(15_000.0, Ok(3.0));
        let c = sep(1_000.0, Ok(12.0));
        let d = sep(1_000.0, Err(VshError::DegenerateCorrelation { index: 3, corr: 1.0 }));
        let all = [&a, &b, &c, &d];

        assert_eq!(elim_angsep(&all, 10.0e3), vec![true, false, true, true]);
        assert_eq!(elim_norsep(&all, 10.0), vec![true, true, false, false]);
    }
}
