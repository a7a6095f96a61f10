//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and installs the `tracing` subscriber
//! - parses CLI arguments
//! - runs the fit pipeline and prints the summary
//! - writes optional exports

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use crate::cli::{Command, FitArgs, SimulateArgs};
use crate::data::sample::{SampleSpec, generate_observations};
use crate::domain::{ElimOptions, FitConfig, InputSource};
use crate::error::AppError;

pub mod pipeline;

/// Directory for fit logs when `--log` is not given.
const LOG_DIR_VAR: &str = "VSH_LOG_DIR";
const DEFAULT_LOG_NAME: &str = "vsh_fit.log";

/// Entry point for the `vsh` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    crate::logging::init_tracing();

    let cli = crate::cli::Cli::parse();
    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Simulate(args) => handle_simulate(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let log_dir = std::env::var_os(LOG_DIR_VAR).map(PathBuf::from);
    let config = fit_config_from_args(&args, log_dir)?;
    let run = pipeline::run_fit(&config)?;

    println!(
        "{}",
        crate::report::format_run_summary(&run.input, &run.fits, &config.elim)
    );

    // Optional exports.
    if let Some(path) = &config.export_results {
        crate::io::export::write_residuals_csv(path, &run.observations, &run.fits)?;
        info!(path = %path.display(), "residuals exported");
    }
    if let Some(path) = &config.export_json {
        crate::io::result::write_result_json(path, &run.observations, &run.fits)?;
        info!(path = %path.display(), "results exported");
    }
    if let Some(path) = &config.log_path {
        info!(path = %path.display(), "fit log written");
    }

    Ok(())
}

fn handle_simulate(args: SimulateArgs) -> Result<(), AppError> {
    let spec = sample_spec_from_args(&args)?;
    let obs = generate_observations(&spec, args.seed)?;
    crate::io::export::write_differences_csv(&args.output, &obs)?;
    println!("Wrote {} simulated sources to {}", obs.len(), args.output.display());
    Ok(())
}

/// Map `vsh fit` flags to a run configuration.
///
/// `log_dir` supplies the default log location when `--log` is absent.
pub fn fit_config_from_args(args: &FitArgs, log_dir: Option<PathBuf>) -> Result<FitConfig, AppError> {
    let input = match (&args.diff, &args.cat1, &args.cat2) {
        (Some(diff), None, None) => InputSource::Differences(diff.clone()),
        (None, Some(cat1), Some(cat2)) => InputSource::Catalogs {
            cat1: cat1.clone(),
            format1: args.format1,
            cat2: cat2.clone(),
            format2: args.format2,
        },
        _ => {
            return Err(AppError::new(
                2,
                "Give either `--diff <csv>` or both `--cat1` and `--cat2`.",
            ));
        }
    };

    Ok(FitConfig {
        input,
        mode_spec: args.fit_mode,
        elim: ElimOptions {
            mode: args.elim,
            n_sigma: args.n_sigma,
            use_wrms: args.wrms,
            max_angsep: args.max_angsep,
            max_norsep: args.max_norsep,
            max_iterations: args.max_iter,
        },
        log_path: args
            .log
            .clone()
            .or_else(|| log_dir.map(|dir| dir.join(DEFAULT_LOG_NAME))),
        export_results: args.export.clone(),
        export_json: args.export_json.clone(),
    })
}

fn sample_spec_from_args(args: &SimulateArgs) -> Result<SampleSpec, AppError> {
    if args.glide.len() != 3 || args.rotation.len() != 3 {
        return Err(AppError::new(
            2,
            "`--glide` and `--rotation` each take three comma-separated values.",
        ));
    }
    let params = args.glide.iter().chain(&args.rotation).copied().collect();

    Ok(SampleSpec {
        count: args.count,
        params,
        noise: args.noise,
        error: args.error.unwrap_or(if args.noise > 0.0 { args.noise } else { 1.0 }),
        corr: args.corr,
        outlier_prob: args.outlier_prob,
        outlier_scale: args.outlier_scale,
    })
}
