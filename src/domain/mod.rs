//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the spectral model table (`ModelKind`, `ParamSpec`)
//! - parsed fit outputs (`ModelRecord`, `ResultSet`, ...)
//! - the unit of batch processing (`Target`) and its lifecycle states

pub mod model;
pub mod target;
pub mod types;

pub use model::*;
pub use target::*;
pub use types::*;
