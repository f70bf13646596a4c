//! Fit-log parsing.
//!
//! - `scan`: tolerant line scanner and number extraction
//! - `log`: turns one fit log into a `ModelRecord`

pub mod log;
pub mod scan;

pub use log::*;
pub use scan::*;
