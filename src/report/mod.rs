//! Reporting utilities: the plain-text fit log and the terminal summary.
//!
//! We keep formatting code in one place so the fitting code stays free of output
//! concerns.

pub mod format;
pub mod log;

pub use format::*;
pub use log::*;
