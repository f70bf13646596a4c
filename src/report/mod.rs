//! Reporting: from parsed logs to tables and terminal output.
//!
//! - `aggregate`: per-Target `ResultSet` from its fit logs
//! - `tables`: canonical-order parameter, statistic and flux tables
//! - `format`: terminal rendering

pub mod aggregate;
pub mod format;
pub mod tables;

pub use aggregate::*;
pub use format::*;
pub use tables::*;
