//! Mathematical utilities: adaptive quadrature and linear constraint reduction.

pub mod linear;
pub mod quad;

pub use linear::*;
pub use quad::*;
