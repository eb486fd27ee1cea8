//! Input/output helpers.
//!
//! - observation ingest from mrt or CSV tables, with row validation (`ingest`)
//! - result exports (CSV/JSON) (`export`)
//! - curve JSON read/write (`curve`)

pub mod curve;
pub mod export;
pub mod ingest;

pub use curve::*;
pub use export::*;
pub use ingest::*;

