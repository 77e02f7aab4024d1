use anyhow::{Context, Result};
use flexi_logger::{Logger, LoggerHandle};

fn level_for_verbosity(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    }
}

/// Starts stderr logging. `RUST_LOG` wins over the `-v` count. Keep the handle alive.
pub fn init(verbose: u8) -> Result<LoggerHandle> {
    Logger::try_with_env_or_str(level_for_verbosity(verbose))
        .context("invalid log specification")?
        .log_to_stderr()
        .start()
        .context("failed to start logger")
}
