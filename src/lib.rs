//! `xspec-batch` library crate.
//!
//! The binary (`xsb`) is a thin wrapper around this library so that:
//!
//! - the pipeline is testable without spawning the binary
//! - the fit engine can be swapped (a helper program in production, a stub
//!   in tests) behind the `engine::FitEngine` trait

pub mod app;
pub mod cli;
pub mod config;
pub mod domain;
pub mod engine;
pub mod error;
pub mod io;
pub mod logging;
pub mod parse;
pub mod report;
