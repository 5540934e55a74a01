//! Tracing subscriber setup.

use crate::config::EngineConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Maps a configured log level onto an `EnvFilter` directive.
pub fn filter_directive(level: &str, verbose: u8) -> &'static str {
    if verbose > 1 {
        return "debug";
    }
    match level {
        "debug" => "debug",
        "warning" | "warn" => "warn",
        "critical" | "error" => "error",
        _ => "info",
    }
}

/// Installs a stderr subscriber. Safe to call more than once.
pub fn init_logging(config: &EngineConfig, verbose: u8) {
    let filter = filter_directive(&config.log_level, verbose);
    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(tracing_subscriber::EnvFilter::new(filter))
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_directive() {
        assert_eq!(filter_directive("info", 0), "info");
        assert_eq!(filter_directive("warning", 0), "warn");
        assert_eq!(filter_directive("critical", 1), "error");
        assert_eq!(filter_directive("info", 2), "debug");
        assert_eq!(filter_directive("bogus", 0), "info");
    }

    #[test]
    fn test_init_twice() {
        let config = EngineConfig::default();
        init_logging(&config, 0);
        init_logging(&config, 3);
    }
}
