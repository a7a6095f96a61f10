//! CSV exports.
//!
//! - per-observation residuals of each fit, meant for spreadsheets or plotting scripts
//! - position differences in the layout `io::ingest` reads back (used by `simulate`)

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{FitMode, ObservationSet};
use crate::error::AppError;
use crate::fit::{Deg01Fit, separation};

/// Write per-observation residuals for every fit to a CSV file.
pub fn write_residuals_csv(
    path: &Path,
    obs: &ObservationSet,
    fits: &BTreeMap<FitMode, Deg01Fit>,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    write_residuals(BufWriter::new(file), obs, fits)
}

/// Write a position-difference CSV file.
pub fn write_differences_csv(path: &Path, obs: &ObservationSet) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    write_differences(BufWriter::new(file), obs)
}

pub fn write_residuals<W: Write>(
    out: W,
    obs: &ObservationSet,
    fits: &BTreeMap<FitMode, Deg01Fit>,
) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record([
            "fit_mode",
            "name",
            "ra_deg",
            "dec_deg",
            "dra_uas",
            "ddec_uas",
            "dra_err_uas",
            "ddec_err_uas",
            "corr",
            "res_ra_uas",
            "res_dec_uas",
            "x_a",
            "x_d",
            "norsep",
            "outlier",
        ])
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for (mode, fit) in fits {
        let mut outlier = vec![false; obs.len()];
        for &i in &fit.outliers {
            outlier[i] = true;
        }

        for (i, o) in obs.iter().enumerate() {
            let sep = separation(o, i);
            writer
                .write_record([
                    mode.to_string(),
                    o.name.clone(),
                    format!("{:.10}", o.ra.to_degrees()),
                    format!("{:.10}", o.dec.to_degrees()),
                    format!("{:.3}", o.dra),
                    format!("{:.3}", o.ddec),
                    format!("{:.3}", o.e_dra),
                    format!("{:.3}", o.e_ddec),
                    format!("{:.6}", o.corr),
                    format!("{:.3}", fit.residuals.ra[i]),
                    format!("{:.3}", fit.residuals.dec[i]),
                    format!("{:.4}", sep.x_a),
                    format!("{:.4}", sep.x_d),
                    sep.x.map(|x| format!("{x:.4}")).unwrap_or_default(),
                    u8::from(outlier[i]).to_string(),
                ])
                .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
        }
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV: {e}")))
}

pub fn write_differences<W: Write>(out: W, obs: &ObservationSet) -> Result<(), AppError> {
    let mut writer = csv::Writer::from_writer(out);
    writer
        .write_record([
            "name",
            "ra_deg",
            "dec_deg",
            "dra_uas",
            "ddec_uas",
            "dra_err_uas",
            "ddec_err_uas",
            "corr",
        ])
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;

    for o in obs {
        writer
            .write_record([
                o.name.clone(),
                format!("{:.12}", o.ra.to_degrees()),
                format!("{:.12}", o.dec.to_degrees()),
                format!("{:.6}", o.dra),
                format!("{:.6}", o.ddec),
                format!("{:.6}", o.e_dra),
                format!("{:.6}", o.e_ddec),
                format!("{:.6}", o.corr),
            ])
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }

    writer
        .flush()
        .map_err(|e| AppError::new(2, format!("Failed to write CSV: {e}")))
}
