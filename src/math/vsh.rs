//! First-degree vector spherical harmonics: forward model and design matrix.
//!
//! With rotation `(r1, r2, r3)` and glide `(g1, g2, g3)`:
//!
//! ```text
//! dRA*cosDec = -r1 cosRA sinDE - r2 sinRA sinDE + r3 cosDE - g1 sinRA + g2 cosRA
//! dDec       =  r1 sinRA - r2 cosRA - g1 cosRA sinDE - g2 sinRA sinDE + g3 cosDE
//! ```
//!
//! Parameter vectors are ordered as in `FitMode::param_names`: glide first in
//! full mode.

use nalgebra::DMatrix;

use crate::domain::FitMode;
use crate::error::VshError;

/// Partials of `(dRA*cosDec, dDec)` w.r.t. `(g1, g2, g3, r1, r2, r3)` at one position.
fn partials(ra: f64, dec: f64) -> ([f64; 6], [f64; 6]) {
    let (sa, ca) = ra.sin_cos();
    let (sd, cd) = dec.sin_cos();

    let d_ra = [-sa, ca, 0.0, -ca * sd, -sa * sd, cd];
    let d_dec = [-ca * sd, -sa * sd, cd, sa, -ca, 0.0];
    (d_ra, d_dec)
}

/// Column range of the full partials used by `mode`.
fn columns(mode: FitMode) -> std::ops::Range<usize> {
    match mode {
        FitMode::Full => 0..6,
        FitMode::Glide => 0..3,
        FitMode::Rotation => 3..6,
    }
}

/// Build the `2N x P` design matrix.
///
/// Rows `0..N` are the RA-equation partials, rows `N..2N` the Dec-equation partials.
pub fn design_matrix(ra: &[f64], dec: &[f64], mode: FitMode) -> Result<DMatrix<f64>, VshError> {
    if ra.len() != dec.len() {
        return Err(VshError::ShapeMismatch {
            field: "dec",
            expected: ra.len(),
            found: dec.len(),
        });
    }

    let n = ra.len();
    let cols = columns(mode);
    let mut jac = DMatrix::<f64>::zeros(2 * n, mode.param_count());

    for i in 0..n {
        let (d_ra, d_dec) = partials(ra[i], dec[i]);
        for (j, k) in cols.clone().enumerate() {
            jac[(i, j)] = d_ra[k];
            jac[(i + n, j)] = d_dec[k];
        }
    }

    Ok(jac)
}

/// Evaluate the model at each position.
///
/// Returns `(dRA*cosDec, dDec)` in the unit of `params`.
pub fn forward(
    ra: &[f64],
    dec: &[f64],
    params: &[f64],
    mode: FitMode,
) -> Result<(Vec<f64>, Vec<f64>), VshError> {
    if ra.len() != dec.len() {
        return Err(VshError::ShapeMismatch {
            field: "dec",
            expected: ra.len(),
            found: dec.len(),
        });
    }
    if params.len() != mode.param_count() {
        return Err(VshError::ShapeMismatch {
            field: "params",
            expected: mode.param_count(),
            found: params.len(),
        });
    }

    let (g, r) = match mode {
        FitMode::Full => (
            [params[0], params[1], params[2]],
            [params[3], params[4], params[5]],
        ),
        FitMode::Glide => ([params[0], params[1], params[2]], [0.0; 3]),
        FitMode::Rotation => ([0.0; 3], [params[0], params[1], params[2]]),
    };

    let mut dra = Vec::with_capacity(ra.len());
    let mut ddec = Vec::with_capacity(ra.len());
    for (&a, &d) in ra.iter().zip(dec) {
        let (sa, ca) = a.sin_cos();
        let (sd, cd) = d.sin_cos();
        dra.push(-r[0] * ca * sd - r[1] * sa * sd + r[2] * cd - g[0] * sa + g[1] * ca);
        ddec.push(r[0] * sa - r[1] * ca - g[0] * ca * sd - g[1] * sa * sd + g[2] * cd);
    }

    Ok((dra, ddec))
}
