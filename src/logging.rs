//! Tracing subscriber setup.
//!
//! Diagnostics go to stderr; stdout is reserved for progress lines and
//! result tables. `XSB_LOG` (an `EnvFilter` directive) overrides the level
//! chosen from `-v` flags.

use tracing_subscriber::EnvFilter;

pub const ENV_LOG: &str = "XSB_LOG";

/// Default filter for a `-v` count.
pub fn default_level(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Install the global subscriber. A second call is a no-op.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_env(ENV_LOG).unwrap_or_else(|_| EnvFilter::new(default_level(verbosity)));

    if let Err(e) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
    {
        tracing::debug!("tracing subscriber already installed: {e}");
    }
}
