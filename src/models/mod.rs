//! Cosmological model evaluation.
//!
//! Models are implemented as small, pure functions so that fitting and reporting
//! code can stay generic over the parameter vector.

pub mod cosmology;

pub use cosmology::*;
