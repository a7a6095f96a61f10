//! Shared "fit pipeline" logic.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! read input -> (cross-match -> difference) -> fit each mode -> log
//!
//! The CLI then only deals with presentation and exports.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::catalog::{crossmatch, position_differences};
use crate::domain::{FitConfig, FitMode, InputSource, InputSummary, ObservationSet};
use crate::error::AppError;
use crate::fit::{Deg01Fit, vsh_deg01_fit};
use crate::io::{RowError, load_catalog, load_differences};
use crate::report::write_fit_log;

/// All computed outputs of a single `vsh fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub input: InputSummary,
    pub observations: ObservationSet,
    pub fits: BTreeMap<FitMode, Deg01Fit>,
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(config: &FitConfig) -> Result<RunOutput, AppError> {
    let (observations, input) = load_observations(&config.input)?;
    info!(n_obs = observations.len(), "observations loaded");

    let fits = fit_modes(&observations, config)?;

    if let Some(path) = &config.log_path {
        write_log_file(path, &fits)?;
    }

    Ok(RunOutput {
        input,
        observations,
        fits,
    })
}

/// Fit every mode requested by `config`.
pub fn fit_modes(
    observations: &ObservationSet,
    config: &FitConfig,
) -> Result<BTreeMap<FitMode, Deg01Fit>, AppError> {
    let mut fits = BTreeMap::new();
    for mode in config.mode_spec.modes() {
        let fit = vsh_deg01_fit(observations, mode, &config.elim)
            .map_err(|e| AppError::from(e).context(format!("{mode} fit")))?;
        fits.insert(mode, fit);
    }
    Ok(fits)
}

/// Read the observations described by `source`.
pub fn load_observations(source: &InputSource) -> Result<(ObservationSet, InputSummary), AppError> {
    match source {
        InputSource::Differences(path) => {
            let data = load_differences(path)?;
            report_row_errors(path, &data.row_errors);
            let summary = InputSummary {
                description: path.display().to_string(),
                rows_read: data.rows_read,
                rows_skipped: data.row_errors.len(),
                matched: None,
                n_obs: data.observations.len(),
            };
            Ok((data.observations, summary))
        }
        InputSource::Catalogs {
            cat1,
            format1,
            cat2,
            format2,
        } => {
            let c1 = load_catalog(cat1, *format1)?;
            report_row_errors(cat1, &c1.row_errors);
            let c2 = load_catalog(cat2, *format2)?;
            report_row_errors(cat2, &c2.row_errors);

            let pairs = crossmatch(&c1.entries, &c2.entries);
            info!(
                cat1 = c1.entries.len(),
                cat2 = c2.entries.len(),
                common = pairs.len(),
                "catalogs cross-matched"
            );
            let observations = position_differences(&c1.entries, &c2.entries, &pairs);
            if observations.is_empty() {
                return Err(AppError::new(3, "The two catalogs have no usable sources in common."));
            }

            let summary = InputSummary {
                description: format!(
                    "{} ({:?}) - {} ({:?})",
                    cat1.display(),
                    format1,
                    cat2.display(),
                    format2
                ),
                rows_read: c1.rows_read + c2.rows_read,
                rows_skipped: c1.row_errors.len() + c2.row_errors.len(),
                matched: Some(pairs.len()),
                n_obs: observations.len(),
            };
            Ok((observations, summary))
        }
    }
}

fn report_row_errors(path: &Path, errors: &[RowError]) {
    for e in errors {
        warn!(
            file = %path.display(),
            line = e.line,
            name = e.name.as_deref().unwrap_or(""),
            "skipped row: {}",
            e.message
        );
    }
}

fn write_log_file(path: &Path, fits: &BTreeMap<FitMode, Deg01Fit>) -> Result<(), AppError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| {
            AppError::new(2, format!("Failed to create log directory '{}': {e}", dir.display()))
        })?;
    }
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create log '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    for fit in fits.values() {
        write_fit_log(&mut out, fit)
            .map_err(|e| AppError::new(2, format!("Failed to write log '{}': {e}", path.display())))?;
    }
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to write log '{}': {e}", path.display())))
}
