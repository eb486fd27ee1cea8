//! Observation preparation: redshift binning and synthetic samples.

pub mod binning;
pub mod synthetic;

pub use binning::*;
pub use synthetic::*;
