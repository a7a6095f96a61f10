//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - fit configuration enums (`FitMode`, `ModeSpec`, `ElimMode`, `CatalogFormat`)
//! - position-difference observations (`Observation`, `ObservationSet`)
//! - catalog entries produced by the readers (`CatalogEntry`)
//! - the run configuration (`FitConfig`)

pub mod types;

pub use types::*;
