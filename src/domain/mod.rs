//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the cosmological parameter vector (`CosmoParams`)
//! - observations, bins and model curve samples
//! - run configuration (`FitConfig`, `TableSpec`, solver settings)
//! - fit outputs and the exported curve file

pub mod types;

pub use types::*;
