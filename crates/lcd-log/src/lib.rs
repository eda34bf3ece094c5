//! Logging setup for LCD client applications.
//!
//! Library crates log through the re-exported `tracing` macros and never
//! install a subscriber themselves. Binaries and tests pick one of the
//! `init_*` functions below.

use serde::{Deserialize, Serialize};

pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};
pub use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub type InitResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;

/// Subscriber settings, usually embedded in an application config file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive, e.g. `info` or `lcd_client=debug,warn`
    pub level: String,
    /// Emit one JSON object per event instead of human readable lines
    pub json: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Install the global subscriber described by `config`
pub fn init_with_config(config: &LogConfig) -> InitResult {
    let json_layer = config.json.then(|| {
        fmt::layer()
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
    });
    let text_layer = (!config.json).then(|| fmt::layer().with_target(true));

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.level)?)
        .with(json_layer)
        .with(text_layer)
        .try_init()?;

    Ok(())
}

/// JSON output filtered by `RUST_LOG`, `info` when unset
pub fn init_tracing() -> InitResult {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_file(true)
                .with_line_number(true)
                .json(),
        )
        .try_init()?;

    Ok(())
}

/// JSON output with an explicit filter directive
pub fn init_tracing_with_level(level: &str) -> InitResult {
    init_with_config(&LogConfig {
        level: level.to_string(),
        json: true,
    })
}

/// Debug level output captured by the test harness
pub fn init_tracing_test() -> InitResult {
    tracing_subscriber::registry()
        .with(EnvFilter::new("debug"))
        .with(fmt::layer().with_test_writer())
        .try_init()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.json);
    }

    #[test]
    fn test_second_init_fails() {
        let _ = init_tracing_test();
        assert!(init_tracing_test().is_err());
        info!(target: "lcd_log", "still logging");
    }

    #[test]
    fn test_bad_directive_rejected() {
        let config = LogConfig {
            level: "lcd_client=notalevel".to_string(),
            json: false,
        };
        assert!(init_with_config(&config).is_err());
    }
}
