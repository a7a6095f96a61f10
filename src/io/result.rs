//! Read/write fit result JSON files.
//!
//! A result file holds, for each fit mode of a run, the estimated parameters with
//! their formal errors and correlation matrix, the rejected observations, and the
//! elimination history.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{ElimMode, FitMode, ObservationSet};
use crate::error::AppError;
use crate::fit::{AxisStats, Deg01Fit, IterationRecord};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    pub tool: String,
    pub n_obs: usize,
    pub fits: Vec<FitRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FitRecord {
    pub mode: FitMode,
    pub elim: ElimMode,
    pub param_names: Vec<String>,
    /// µas.
    pub params: Vec<f64>,
    pub sigmas: Vec<f64>,
    pub correlation: Vec<Vec<f64>>,
    pub n_kept: usize,
    pub outliers: Vec<String>,
    pub degenerate: Vec<String>,
    pub history: Vec<IterationRecord>,
    pub apriori: AxisStats,
    pub posteriori: AxisStats,
    pub reduced_chi2: Option<f64>,
}

impl FitRecord {
    pub fn from_fit(fit: &Deg01Fit, obs: &ObservationSet) -> Self {
        let names = |idx: &[usize]| -> Vec<String> {
            idx.iter().map(|&i| obs.as_slice()[i].name.clone()).collect()
        };
        Self {
            mode: fit.mode,
            elim: fit.elim,
            param_names: fit.mode.param_names().iter().map(|s| s.to_string()).collect(),
            params: fit.solution.params.clone(),
            sigmas: fit.solution.sigmas.clone(),
            correlation: fit.solution.correlation.clone(),
            n_kept: fit.kept.len(),
            outliers: names(&fit.outliers),
            degenerate: names(&fit.degenerate),
            history: fit.history.clone(),
            apriori: fit.apriori,
            posteriori: fit.posteriori,
            // JSON has no NaN.
            reduced_chi2: fit.reduced_chi2.is_finite().then_some(fit.reduced_chi2),
        }
    }
}

pub fn build_result_file(obs: &ObservationSet, fits: &BTreeMap<FitMode, Deg01Fit>) -> ResultFile {
    ResultFile {
        tool: "vsh".to_string(),
        n_obs: obs.len(),
        fits: fits.values().map(|f| FitRecord::from_fit(f, obs)).collect(),
    }
}

/// Write a result JSON file.
pub fn write_result_json(
    path: &Path,
    obs: &ObservationSet,
    fits: &BTreeMap<FitMode, Deg01Fit>,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create result JSON '{}': {e}", path.display())))?;

    let mut out = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut out, &build_result_file(obs, fits))
        .map_err(|e| AppError::new(2, format!("Failed to write result JSON: {e}")))?;
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to write result JSON: {e}")))
}

/// Read a result JSON file.
pub fn read_result_json(path: &Path) -> Result<ResultFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open result JSON '{}': {e}", path.display())))?;
    let result: ResultFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid result JSON: {e}")))?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use crate::data::sample::{SampleSpec, generate_observations};
    use crate::domain::ElimOptions;
    use crate::fit::vsh_deg01_fit;

    fn sample_fits() -> (ObservationSet, BTreeMap<FitMode, Deg01Fit>) {
        let spec = SampleSpec {
            count: 60,
            params: vec![0.0, 0.0, 0.0, 5.0, 0.0, 0.0],
            noise: 1.0,
            ..SampleSpec::default()
        };
        let obs = generate_observations(&spec, 17).unwrap();
        let mut fits = BTreeMap::new();
        for mode in [FitMode::Glide, FitMode::Full] {
            fits.insert(mode, vsh_deg01_fit(&obs, mode, &ElimOptions::default()).unwrap());
        }
        (obs, fits)
    }

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("vsh-result-{}-{name}", std::process::id()))
    }

    #[test]
    fn result_json_keeps_mode_order_and_names() {
        let (obs, fits) = sample_fits();
        let file = build_result_file(&obs, &fits);
        let json = serde_json::to_string(&file).unwrap();
        let back: ResultFile = serde_json::from_str(&json).unwrap();

        assert_eq!(back.n_obs, 60);
        assert_eq!(back.fits[0].mode, FitMode::Full);
        assert_eq!(back.fits[0].param_names, vec!["G1", "G2", "G3", "R1", "R2", "R3"]);
        assert_eq!(back.fits[1].mode, FitMode::Glide);
        assert_eq!(back.fits[1].params.len(), 3);
        assert!(json.contains("\"mode\":\"full\""));
        assert!(json.contains("\"elim\":\"sigma\""));
    }

    #[test]
    fn result_json_file_reads_back() {
        let (obs, fits) = sample_fits();
        let path = temp_path("fits.json");
        write_result_json(&path, &obs, &fits).unwrap();
        let back = read_result_json(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        let expected = build_result_file(&obs, &fits);
        assert_eq!(back.tool, expected.tool);
        assert_eq!(back.n_obs, expected.n_obs);
        assert_eq!(back.fits.len(), expected.fits.len());
        for (got, want) in back.fits.iter().zip(&expected.fits) {
            assert_eq!(got.mode, want.mode);
            assert_eq!(got.elim, want.elim);
            assert_eq!(got.param_names, want.param_names);
            assert_eq!(got.n_kept, want.n_kept);
            assert_eq!(got.outliers, want.outliers);
            assert_eq!(got.history, want.history);
            for (a, b) in got.params.iter().zip(&want.params) {
                assert_relative_eq!(*a, *b, max_relative = 1e-12);
            }
            for (a, b) in got.sigmas.iter().zip(&want.sigmas) {
                assert_relative_eq!(*a, *b, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn result_json_read_errors_are_input_errors() {
        let missing = temp_path("missing.json");
        let err = read_result_json(&missing).unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let garbage = temp_path("garbage.json");
        std::fs::write(&garbage, "{\"tool\": 1").unwrap();
        let err = read_result_json(&garbage).unwrap_err();
        let _ = std::fs::remove_file(&garbage);
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("Invalid result JSON"));
    }
}
