//! Subscriber setup for the command-line driver

use tracing_subscriber::EnvFilter;

use crate::config::LogLevel;

/// Filter for `level`, unless `RUST_LOG` is set
pub fn env_filter(level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_filter()))
}

/// Install the global fmt subscriber writing to stderr.
///
/// Calling this twice is harmless; the second install is ignored.
pub fn init_logging(level: LogLevel) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_twice() {
        init_logging(LogLevel::Quiet);
        init_logging(LogLevel::Debug);
        tracing::info!("still fine");
    }
}
