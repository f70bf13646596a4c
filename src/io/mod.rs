//! Input/output helpers.
//!
//! - batch input classification and target lists (`targets`)
//! - input file resolution by glob pattern (`resolve`)
//! - the append-only failure log (`failure_log`)
//! - CSV tables and the batch summary (`tables`)
//! - the combined JSON run report (`run_report`)

pub mod failure_log;
pub mod resolve;
pub mod run_report;
pub mod tables;
pub mod targets;

pub use failure_log::*;
pub use resolve::*;
pub use run_report::*;
pub use tables::*;
pub use targets::*;
