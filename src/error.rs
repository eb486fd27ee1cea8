//! Error type shared by the library and the `cosmofit` binary.
//!
//! Every variant maps to a process exit code so the binary can report
//! failures the same way regardless of where they originate.

use crate::domain::CosmoParams;

#[derive(Debug, Clone, thiserror::Error)]
pub enum AppError {
    /// Invalid flag values or settings.
    #[error("{message}")]
    Config { message: String },

    /// File open/read/write or (de)serialization failures.
    #[error("{message}")]
    Io { message: String },

    /// Not enough usable observations.
    #[error("{message}")]
    Input { message: String },

    /// Evaluation outside the physical domain of the model.
    #[error("domain error at z={z}: {message}")]
    Domain { z: f64, message: String },

    /// Adaptive quadrature ran out of subintervals.
    #[error(
        "quadrature over [{lower}, {upper}] did not converge: error estimate {abs_err:e} after {intervals} subintervals"
    )]
    Integration {
        lower: f64,
        upper: f64,
        abs_err: f64,
        intervals: usize,
    },

    /// The optimizer stopped without a converged, feasible solution.
    #[error("optimization failed: {reason} (last iterate {params}, chi-square {objective})")]
    Optimization {
        reason: String,
        params: CosmoParams,
        objective: f64,
    },
}

impl AppError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io {
            message: message.into(),
        }
    }

    pub fn input(message: impl Into<String>) -> Self {
        Self::Input {
            message: message.into(),
        }
    }

    pub fn domain(z: f64, message: impl Into<String>) -> Self {
        Self::Domain {
            z,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config { .. } | AppError::Io { .. } => 2,
            AppError::Input { .. } => 3,
            AppError::Domain { .. } | AppError::Integration { .. } | AppError::Optimization { .. } => 4,
        }
    }

    /// True for failures caused by evaluating the model at a bad point.
    ///
    /// The optimizer treats these as rejected trial points rather than fatal errors.
    pub fn is_evaluation_failure(&self) -> bool {
        matches!(self, AppError::Domain { .. } | AppError::Integration { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_by_class() {
        assert_eq!(AppError::config("x").exit_code(), 2);
        assert_eq!(AppError::io("x").exit_code(), 2);
        assert_eq!(AppError::input("x").exit_code(), 3);
        assert_eq!(AppError::domain(1.0, "x").exit_code(), 4);
    }

    #[test]
    fn optimization_error_reports_last_iterate() {
        let err = AppError::Optimization {
            reason: "iteration cap reached".to_string(),
            params: CosmoParams::new(0.7, 0.3, -1.0),
            objective: 0.5,
        };
        let msg = err.to_string();
        assert!(msg.contains("iteration cap reached"));
        assert!(msg.contains("ΩΛ=0.7000"));
        assert!(msg.contains("0.5"));
    }
}
