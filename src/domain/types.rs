//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during fitting
//! - exported to JSON/CSV
//! - driven from CLI flags (`ValueEnum`) or from plain strings (`FromStr`)

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::NaiveDate;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::VshError;

/// Which degree-1 VSH parameters are estimated.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum FitMode {
    /// Glide and rotation: `(g1, g2, g3, r1, r2, r3)`.
    Full,
    /// Rotation only: `(r1, r2, r3)`.
    Rotation,
    /// Glide only: `(g1, g2, g3)`.
    Glide,
}

impl FitMode {
    pub const ALL: [FitMode; 3] = [FitMode::Full, FitMode::Rotation, FitMode::Glide];

    /// Number of fitted parameters.
    pub fn param_count(self) -> usize {
        match self {
            FitMode::Full => 6,
            FitMode::Rotation | FitMode::Glide => 3,
        }
    }

    /// Parameter labels in solution-vector order.
    pub fn param_names(self) -> &'static [&'static str] {
        match self {
            FitMode::Full => &["G1", "G2", "G3", "R1", "R2", "R3"],
            FitMode::Rotation => &["R1", "R2", "R3"],
            FitMode::Glide => &["G1", "G2", "G3"],
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FitMode::Full => "full",
            FitMode::Rotation => "rotation",
            FitMode::Glide => "glide",
        }
    }
}

impl fmt::Display for FitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FitMode {
    type Err = VshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "full" => Ok(FitMode::Full),
            "rotation" => Ok(FitMode::Rotation),
            "glide" => Ok(FitMode::Glide),
            _ => Err(VshError::UnknownFitMode(s.to_string())),
        }
    }
}

/// Which fit mode(s) a run should estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ModeSpec {
    Full,
    Rotation,
    Glide,
    /// Fit every mode and report them side by side.
    All,
}

impl ModeSpec {
    pub fn modes(self) -> Vec<FitMode> {
        match self {
            ModeSpec::Full => vec![FitMode::Full],
            ModeSpec::Rotation => vec![FitMode::Rotation],
            ModeSpec::Glide => vec![FitMode::Glide],
            ModeSpec::All => FitMode::ALL.to_vec(),
        }
    }
}

/// Outlier elimination criterion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ElimMode {
    /// Single pass, nothing rejected.
    None,
    /// Reject residuals beyond `n` times the per-axis scale.
    Sigma,
    /// Reject angular separations above a fixed threshold.
    #[value(name = "angsep")]
    #[serde(rename = "angsep")]
    AngSep,
    /// Reject normalized separations above a fixed threshold.
    #[value(name = "norsep")]
    #[serde(rename = "norsep")]
    NorSep,
    /// Keep only observations passing both `norsep` and `angsep`.
    #[value(name = "nor-ang", alias = "nor_ang")]
    NorAng,
}

impl ElimMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ElimMode::None => "none",
            ElimMode::Sigma => "sigma",
            ElimMode::AngSep => "angsep",
            ElimMode::NorSep => "norsep",
            ElimMode::NorAng => "nor_ang",
        }
    }
}

impl fmt::Display for ElimMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ElimMode {
    type Err = VshError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" => Ok(ElimMode::None),
            "sigma" => Ok(ElimMode::Sigma),
            "angsep" => Ok(ElimMode::AngSep),
            "norsep" => Ok(ElimMode::NorSep),
            "nor_ang" | "nor-ang" => Ok(ElimMode::NorAng),
            _ => Err(VshError::UnknownElimMode(s.to_string())),
        }
    }
}

/// Outlier elimination settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElimOptions {
    pub mode: ElimMode,
    /// Clipping strength for `sigma` mode.
    pub n_sigma: f64,
    /// Use the weighted rms instead of the plain rms as the `sigma` scale.
    pub use_wrms: bool,
    /// Maximum accepted angular separation (µas) for `angsep` / `nor_ang`.
    pub max_angsep: f64,
    /// Maximum accepted normalized separation for `norsep` / `nor_ang`.
    pub max_norsep: f64,
    /// Hard cap on refits. `None` relies on the natural bound (n + 1 passes).
    pub max_iterations: Option<usize>,
}

impl Default for ElimOptions {
    fn default() -> Self {
        Self {
            mode: ElimMode::Sigma,
            n_sigma: 3.0,
            use_wrms: false,
            max_angsep: 10.0e3,
            max_norsep: 10.0,
            max_iterations: None,
        }
    }
}

impl ElimOptions {
    /// Options for a plain single-pass fit.
    pub fn none() -> Self {
        Self {
            mode: ElimMode::None,
            ..Self::default()
        }
    }
}

/// One source's position difference between the two compared catalogs.
///
/// Angles are in radians, differences and their uncertainties in µas.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub name: String,
    pub ra: f64,
    pub dec: f64,
    /// `ΔRA·cos(Dec)`.
    pub dra: f64,
    pub ddec: f64,
    pub e_dra: f64,
    pub e_ddec: f64,
    /// Correlation coefficient between the `dra` and `ddec` errors.
    pub corr: f64,
}

impl Observation {
    /// Covariance between the `dra` and `ddec` errors (µas²).
    pub fn cov(&self) -> f64 {
        self.corr * self.e_dra * self.e_ddec
    }

    /// Unnormalized angular separation between the two catalog positions (µas).
    pub fn ang_sep(&self) -> f64 {
        self.dra.hypot(self.ddec)
    }
}

/// Index-aligned collection of observations.
///
/// Never mutated in place; fits work on subsets produced by `subset`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObservationSet {
    observations: Vec<Observation>,
}

impl ObservationSet {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// Build a set from parallel arrays.
    ///
    /// Every array must have the length of `ra`. Without `corr` the RA/Dec errors
    /// are treated as independent.
    #[allow(clippy::too_many_arguments)]
    pub fn from_columns(
        ra: &[f64],
        dec: &[f64],
        dra: &[f64],
        ddec: &[f64],
        e_dra: &[f64],
        e_ddec: &[f64],
        corr: Option<&[f64]>,
    ) -> Result<Self, VshError> {
        let n = ra.len();
        check_len("dec", n, dec.len())?;
        check_len("dra", n, dra.len())?;
        check_len("ddec", n, ddec.len())?;
        check_len("e_dra", n, e_dra.len())?;
        check_len("e_ddec", n, e_ddec.len())?;
        if let Some(c) = corr {
            check_len("corr", n, c.len())?;
        }

        let observations = (0..n)
            .map(|i| Observation {
                name: i.to_string(),
                ra: ra[i],
                dec: dec[i],
                dra: dra[i],
                ddec: ddec[i],
                e_dra: e_dra[i],
                e_ddec: e_ddec[i],
                corr: corr.map_or(0.0, |c| c[i]),
            })
            .collect();

        Ok(Self { observations })
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn as_slice(&self) -> &[Observation] {
        &self.observations
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Observation> {
        self.observations.iter()
    }

    /// Observations at `indices`, in the given order.
    ///
    /// # Panics
    /// Panics if an index is out of range. Indices come from this set's own range.
    pub fn subset(&self, indices: &[usize]) -> ObservationSet {
        ObservationSet {
            observations: indices.iter().map(|&i| self.observations[i].clone()).collect(),
        }
    }

    pub fn ra(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.ra).collect()
    }

    pub fn dec(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.dec).collect()
    }

    pub fn dra(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.dra).collect()
    }

    pub fn ddec(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.ddec).collect()
    }

    pub fn e_dra(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.e_dra).collect()
    }

    pub fn e_ddec(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.e_ddec).collect()
    }

    pub fn corr(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.corr).collect()
    }
}

impl<'a> IntoIterator for &'a ObservationSet {
    type Item = &'a Observation;
    type IntoIter = std::slice::Iter<'a, Observation>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.iter()
    }
}

fn check_len(field: &'static str, expected: usize, found: usize) -> Result<(), VshError> {
    if expected == found {
        Ok(())
    } else {
        Err(VshError::ShapeMismatch {
            field,
            expected,
            found,
        })
    }
}

/// On-disk catalog layouts understood by the readers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CatalogFormat {
    /// getpar `.sou` spool extract.
    Sou,
    /// ICRF2 data file.
    Icrf2,
    /// Generic CSV (`name, ra_deg, dec_deg, ra_err_mas, dec_err_mas[, corr][, flag]`).
    Csv,
}

/// One source of an input catalog.
///
/// `ra`/`dec` are in radians, uncertainties in mas. `ra_err` is the error on RA
/// itself (not scaled by `cos(dec)`).
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub name: String,
    pub ra: f64,
    pub dec: f64,
    pub ra_err: f64,
    pub dec_err: f64,
    pub corr: f64,
    /// Source category (ICRF2 `D`/`V`/`N`, or a free-form CSV flag).
    pub flag: Option<String>,
    /// Solution statistics carried by `.sou` files.
    pub sessions: Option<SessionStats>,
}

/// Usage statistics of a source in a VLBI solution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStats {
    pub obs_used: u32,
    pub obs_total: u32,
    pub sessions_used: u32,
    pub sessions_total: u32,
    pub first_session: Option<NaiveDate>,
    pub last_session: Option<NaiveDate>,
}

/// Where a run reads its observations from.
#[derive(Debug, Clone)]
pub enum InputSource {
    /// A CSV of precomputed position differences.
    Differences(PathBuf),
    /// Two catalogs to cross-match and difference (`cat1 - cat2`).
    Catalogs {
        cat1: PathBuf,
        format1: CatalogFormat,
        cat2: PathBuf,
        format2: CatalogFormat,
    },
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub input: InputSource,
    pub mode_spec: ModeSpec,
    pub elim: ElimOptions,

    /// Fit log destination. `None` skips the log file.
    pub log_path: Option<PathBuf>,
    pub export_results: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

/// What the pipeline read before fitting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputSummary {
    /// Human-readable input description (file names, formats).
    pub description: String,
    pub rows_read: usize,
    pub rows_skipped: usize,
    /// Sources common to both catalogs, when differencing catalogs.
    pub matched: Option<usize>,
    /// Observations handed to the fit.
    pub n_obs: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_columns_rejects_mismatched_lengths() {
        let err = ObservationSet::from_columns(
            &[0.0, 1.0],
            &[0.0, 1.0],
            &[0.0, 1.0],
            &[0.0],
            &[1.0, 1.0],
            &[1.0, 1.0],
            None,
        )
        .unwrap_err();
        assert_eq!(
            err,
            VshError::ShapeMismatch {
                field: "ddec",
                expected: 2,
                found: 1
            }
        );

        let err = ObservationSet::from_columns(
            &[0.0],
            &[0.0],
            &[0.0],
            &[0.0],
            &[1.0],
            &[1.0],
            Some(&[0.1, 0.2]),
        )
        .unwrap_err();
        assert!(matches!(err, VshError::ShapeMismatch { field: "corr", .. }));
    }

    #[test]
    fn from_columns_defaults_to_independent_errors() {
        let set = ObservationSet::from_columns(
            &[0.1, 0.2],
            &[0.3, 0.4],
            &[1.0, 2.0],
            &[3.0, 4.0],
            &[1.0, 1.0],
            &[2.0, 2.0],
            None,
        )
        .unwrap();
        assert_eq!(set.len(), 2);
        assert!(set.iter().all(|o| o.corr == 0.0));
        assert_eq!(set.subset(&[1]).dra(), vec![2.0]);
    }

    #[test]
    fn mode_strings_parse_or_fail_loudly() {
        assert_eq!("rotation".parse::<FitMode>().unwrap(), FitMode::Rotation);
        assert_eq!(" Full ".parse::<FitMode>().unwrap(), FitMode::Full);
        assert!(matches!(
            "spin".parse::<FitMode>(),
            Err(VshError::UnknownFitMode(_))
        ));

        assert_eq!("None".parse::<ElimMode>().unwrap(), ElimMode::None);
        assert_eq!("nor_ang".parse::<ElimMode>().unwrap(), ElimMode::NorAng);
        assert!(matches!(
            "median".parse::<ElimMode>(),
            Err(VshError::UnknownElimMode(_))
        ));
    }

    #[test]
    fn full_mode_orders_glide_before_rotation() {
        assert_eq!(FitMode::Full.param_count(), 6);
        assert_eq!(FitMode::Full.param_names()[0], "G1");
        assert_eq!(FitMode::Full.param_names()[3], "R1");
        assert_eq!(ModeSpec::All.modes().len(), 3);
    }
}
