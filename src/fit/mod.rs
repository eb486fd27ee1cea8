//! Parameter estimation.
//!
//! Responsibilities:
//!
//! - score a parameter vector against observations (chi-square)
//! - describe the active linear constraints
//! - minimize the score under those constraints

pub mod constraints;
pub mod objective;
pub mod optimizer;

pub use constraints::*;
pub use objective::*;
pub use optimizer::*;
