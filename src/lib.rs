//! `cosmo-fit` library crate.
//!
//! The binary (`cosmofit`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the model evaluator (`models::distance_modulus`) can be reused to
//!   regenerate curves at arbitrary redshift

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod logging;
pub mod math;
pub mod models;
pub mod plot;
pub mod report;
