//! Error types.
//!
//! - `VshError` is returned by the library (fitting, weighting, readers' core checks).
//!   Each variant is a distinct failure kind so callers can react to it.
//! - `AppError` is what the `vsh` binary reports: a message plus a process exit code.

use thiserror::Error;

/// Failure kinds of the VSH fitting core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VshError {
    /// Index-aligned per-observation arrays disagree in length.
    #[error("Array length mismatch: `{field}` has {found} entries, expected {expected}")]
    ShapeMismatch {
        field: &'static str,
        expected: usize,
        found: usize,
    },

    /// The 2x2 error covariance of one observation is not positive definite.
    #[error("Singular covariance for observation {index}: {reason}")]
    SingularCovariance { index: usize, reason: String },

    /// `Jᵀ W J` could not be factorized (degenerate or insufficient geometry).
    #[error("Normal-equations matrix ({size}x{size}) is not positive definite")]
    SingularNormalMatrix { size: usize },

    /// `|C| >= 1` in the normalized-separation metric of one observation.
    #[error("Degenerate RA/Dec correlation {corr} for observation {index}")]
    DegenerateCorrelation { index: usize, corr: f64 },

    #[error("Unknown fit mode '{0}' (expected full, rotation or glide)")]
    UnknownFitMode(String),

    #[error("Unknown elimination mode '{0}' (expected none, sigma, angsep, norsep or nor_ang)")]
    UnknownElimMode(String),

    /// Too few observations remain to determine the parameters.
    #[error("Insufficient data: {kept} observation(s) left for {params} parameter(s)")]
    InsufficientData { kept: usize, params: usize },

    /// Outlier elimination did not reach a fixed point within the iteration cap.
    #[error("Outlier elimination did not converge after {0} iterations")]
    IterationLimit(usize),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl VshError {
    /// Process exit code used when this error ends a CLI run.
    pub fn exit_code(&self) -> u8 {
        match self {
            VshError::ShapeMismatch { .. }
            | VshError::UnknownFitMode(_)
            | VshError::UnknownElimMode(_)
            | VshError::InvalidInput(_) => 2,
            VshError::InsufficientData { .. } => 3,
            VshError::SingularCovariance { .. }
            | VshError::SingularNormalMatrix { .. }
            | VshError::DegenerateCorrelation { .. }
            | VshError::IterationLimit(_) => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    /// Prefix the message, keeping the exit code.
    pub fn context(self, what: impl std::fmt::Display) -> Self {
        Self {
            exit_code: self.exit_code,
            message: format!("{what}: {}", self.message),
        }
    }
}

impl From<VshError> for AppError {
    fn from(err: VshError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vsh_errors_map_to_exit_codes() {
        let shape = VshError::ShapeMismatch {
            field: "dec",
            expected: 3,
            found: 2,
        };
        assert_eq!(AppError::from(shape).exit_code(), 2);

        let few = VshError::InsufficientData { kept: 0, params: 6 };
        assert_eq!(AppError::from(few).exit_code(), 3);

        let singular = VshError::SingularNormalMatrix { size: 6 };
        let app = AppError::from(singular);
        assert_eq!(app.exit_code(), 4);
        assert!(app.to_string().contains("6x6"));
    }
}
