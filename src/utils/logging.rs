//! Logging setup for model-sync
//!
//! Structured diagnostics go through `tracing`; the styled operator
//! output is the Interaction Shim's job.

use tracing::Level;
use tracing_subscriber::{fmt, EnvFilter};

use crate::error::{Error, Result};

/// Initialize logging from the CLI verbosity and format flags
pub fn init_logging(verbosity: &str, format: &str) -> Result<()> {
    let level = match verbosity.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let directive = format!("model_sync={level}")
        .parse()
        .map_err(|e| Error::Config(format!("Invalid log directive: {e}")))?;
    let env_filter = EnvFilter::from_default_env().add_directive(directive);

    if format.eq_ignore_ascii_case("json") {
        let subscriber = fmt::Subscriber::builder()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| Error::Config(e.to_string()))?;
    } else {
        let subscriber = fmt::Subscriber::builder()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .finish();
        tracing::subscriber::set_global_default(subscriber)
            .map_err(|e| Error::Config(e.to_string()))?;
    }

    Ok(())
}
