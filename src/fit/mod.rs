//! Degree-1 VSH fitting.
//!
//! Responsibilities:
//!
//! - build and solve one weighted least-squares problem (`solver`)
//! - compute angular and normalized separations (`norsep`)
//! - flag outliers by sigma clipping or separation thresholds (`elimination`)
//! - iterate fit and elimination to a fixed point (`iterate`)

pub mod elimination;
pub mod iterate;
pub mod norsep;
pub mod solver;

pub use elimination::*;
pub use iterate::*;
pub use norsep::*;
pub use solver::*;
