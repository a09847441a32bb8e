//! stderr logging bootstrap.

use anyhow::{Context, Result};
use flexi_logger::{Logger, LoggerHandle};

/// Level used when `RUST_LOG` is unset.
pub fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "info"
    } else {
        "warn"
    }
}

/// Starts logging to stderr. `RUST_LOG` overrides the level chosen by `verbose`.
///
/// The returned handle must stay alive for the rest of the process.
pub fn init_logging(verbose: bool) -> Result<LoggerHandle> {
    Logger::try_with_env_or_str(default_level(verbose))
        .context("invalid log specification")?
        .log_to_stderr()
        .format(flexi_logger::colored_default_format)
        .start()
        .context("failed to start logger")
}
