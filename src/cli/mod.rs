//! Command-line parsing for the degree-1 VSH fitter.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting code.

use std::path::PathBuf;

use clap::{ArgGroup, Parser, Subcommand};

use crate::domain::{CatalogFormat, ElimMode, ModeSpec};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "vsh",
    version,
    about = "Rotation and glide between astrometric catalogs (degree-1 VSH fit)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit rotation and/or glide to position differences, print a summary, and
    /// optionally write a log and exports.
    Fit(FitArgs),
    /// Write a synthetic position-difference CSV drawn from a known field.
    Simulate(SimulateArgs),
}

/// Options for `vsh fit`.
#[derive(Debug, Parser, Clone)]
#[command(group(ArgGroup::new("input").required(true).args(["diff", "cat1"])))]
pub struct FitArgs {
    /// CSV of precomputed position differences.
    #[arg(long, value_name = "CSV")]
    pub diff: Option<PathBuf>,

    /// First catalog (differences are `cat1 - cat2`).
    #[arg(long, value_name = "FILE", requires = "cat2")]
    pub cat1: Option<PathBuf>,

    /// Second catalog.
    #[arg(long, value_name = "FILE", requires = "cat1")]
    pub cat2: Option<PathBuf>,

    /// Format of the first catalog.
    #[arg(long, value_enum, default_value_t = CatalogFormat::Sou)]
    pub format1: CatalogFormat,

    /// Format of the second catalog.
    #[arg(long, value_enum, default_value_t = CatalogFormat::Icrf2)]
    pub format2: CatalogFormat,

    /// Which parameters to fit (`all` runs every mode).
    #[arg(long, value_enum, default_value_t = ModeSpec::Full)]
    pub fit_mode: ModeSpec,

    /// Outlier elimination criterion.
    #[arg(long, value_enum, default_value_t = ElimMode::Sigma)]
    pub elim: ElimMode,

    /// Clipping strength for `--elim sigma`.
    #[arg(long, default_value_t = 3.0)]
    pub n_sigma: f64,

    /// Use the weighted rms as the clipping scale.
    #[arg(long)]
    pub wrms: bool,

    /// Maximum angular separation (uas) for `angsep` / `nor-ang`.
    #[arg(long, default_value_t = 10.0e3)]
    pub max_angsep: f64,

    /// Maximum normalized separation for `norsep` / `nor-ang`.
    #[arg(long, default_value_t = 10.0)]
    pub max_norsep: f64,

    /// Give up if elimination has not converged after this many fits.
    #[arg(long)]
    pub max_iter: Option<usize>,

    /// Write the fit log to this file (defaults to `$VSH_LOG_DIR/vsh_fit.log` when set).
    #[arg(long, value_name = "PATH")]
    pub log: Option<PathBuf>,

    /// Export per-observation residuals to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export estimates, errors and correlations to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

/// Options for `vsh simulate`.
#[derive(Debug, Parser, Clone)]
pub struct SimulateArgs {
    /// Output CSV (readable by `vsh fit --diff`).
    #[arg(short, long, value_name = "CSV")]
    pub output: PathBuf,

    /// Number of sources.
    #[arg(short = 'n', long, default_value_t = 1000)]
    pub count: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Rotation `R1,R2,R3` (uas).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_value = "0,0,0")]
    pub rotation: Vec<f64>,

    /// Glide `G1,G2,G3` (uas).
    #[arg(long, value_delimiter = ',', allow_hyphen_values = true, default_value = "0,0,0")]
    pub glide: Vec<f64>,

    /// Gaussian noise per axis (uas).
    #[arg(long, default_value_t = 10.0)]
    pub noise: f64,

    /// Reported formal error per axis (uas). Defaults to the noise level.
    #[arg(long)]
    pub error: Option<f64>,

    /// RA/Dec error correlation.
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub corr: f64,

    /// Probability of a gross error per source.
    #[arg(long, default_value_t = 0.0)]
    pub outlier_prob: f64,

    /// Standard deviation of gross errors (uas).
    #[arg(long, default_value_t = 1000.0)]
    pub outlier_scale: f64,
}
