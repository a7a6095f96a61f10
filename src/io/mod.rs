//! Input/output helpers.
//!
//! - catalog readers for `.sou`, ICRF2, and CSV catalogs (`catalog`)
//! - CSV ingest + validation (`ingest`)
//! - residual and position-difference CSV exports (`export`)
//! - result JSON read/write (`result`)

pub mod catalog;
pub mod export;
pub mod ingest;
pub mod result;

pub use catalog::*;
pub use export::*;
pub use ingest::*;
pub use result::*;
