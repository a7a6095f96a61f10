//! Mathematical utilities: VSH basis, weights, statistics, and weighted least squares.

pub mod ols;
pub mod stats;
pub mod vsh;
pub mod weight;

pub use ols::*;
pub use stats::*;
pub use vsh::*;
pub use weight::*;
