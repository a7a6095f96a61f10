//! `vsh-fit` library crate.
//!
//! Estimates the rotation and glide (degree-1 vector spherical harmonics) between two
//! astrometric catalogs by weighted least squares with correlated RA/Dec errors and
//! iterative outlier elimination.
//!
//! The binary (`vsh`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the fitting core can be driven from plain arrays by other tools

pub mod app;
pub mod catalog;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod report;

pub use domain::{ElimMode, ElimOptions, FitMode, Observation, ObservationSet};
pub use error::VshError;
pub use fit::{Deg01Fit, vsh_deg01_fit};
