//! Configuration management for the location bridge

use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub struct Config {
    /// Directory of section documents (spine order = file name order)
    pub sections_dir: Option<PathBuf>,
    pub overlay: OverlayTiming,
}

/// Delays used by the overlay synchronizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayTiming {
    /// Debounce window for sections whose overlay already exists
    pub coalesce: Duration,
    /// First fallback drain for sections without an overlay
    pub retry_short: Duration,
    /// Second fallback drain for sections without an overlay
    pub retry_long: Duration,
    /// Re-apply delay after a section finishes loading
    pub section_loaded: Duration,
    /// Drain delay after the overlay is created
    pub overlay_ready: Duration,
}

impl Default for OverlayTiming {
    fn default() -> Self {
        OverlayTiming {
            coalesce: Duration::from_millis(50),
            retry_short: Duration::from_millis(300),
            retry_long: Duration::from_millis(1500),
            section_loaded: Duration::from_millis(100),
            overlay_ready: Duration::from_millis(10),
        }
    }
}

impl Config {
    /// Read configuration from the environment; unset or unparseable values
    /// keep their defaults.
    pub fn from_env() -> Self {
        let defaults = OverlayTiming::default();
        Config {
            sections_dir: env::var("XPOINTER_SECTIONS_DIR")
                .ok()
                .filter(|dir| !dir.is_empty())
                .map(PathBuf::from),
            overlay: OverlayTiming {
                coalesce: millis_from_env("OVERLAY_COALESCE_MS", defaults.coalesce),
                retry_short: millis_from_env("OVERLAY_RETRY_SHORT_MS", defaults.retry_short),
                retry_long: millis_from_env("OVERLAY_RETRY_LONG_MS", defaults.retry_long),
                section_loaded: millis_from_env(
                    "OVERLAY_SECTION_LOADED_MS",
                    defaults.section_loaded,
                ),
                overlay_ready: millis_from_env("OVERLAY_READY_MS", defaults.overlay_ready),
            },
        }
    }
}

fn millis_from_env(name: &str, default: Duration) -> Duration {
    match env::var(name) {
        Ok(value) => match value.trim().parse::<u64>() {
            Ok(ms) => Duration::from_millis(ms),
            Err(_) => {
                tracing::warn!(var = name, value = %value, "Ignoring invalid duration");
                default
            }
        },
        Err(_) => default,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_timing() {
        let timing = Config::default().overlay;
        assert_eq!(timing.coalesce, Duration::from_millis(50));
        assert_eq!(timing.retry_short, Duration::from_millis(300));
        assert_eq!(timing.retry_long, Duration::from_millis(1500));
        assert_eq!(timing.section_loaded, Duration::from_millis(100));
        assert_eq!(timing.overlay_ready, Duration::from_millis(10));
        assert!(timing.retry_short < timing.retry_long);
    }

    // Only this test touches these variables, so it cannot race the others
    #[test]
    fn test_from_env_overrides() {
        env::set_var("XPOINTER_SECTIONS_DIR", "/tmp/book/OEBPS");
        env::set_var("OVERLAY_COALESCE_MS", "25");
        env::set_var("OVERLAY_RETRY_LONG_MS", "not-a-number");

        let config = Config::from_env();

        env::remove_var("XPOINTER_SECTIONS_DIR");
        env::remove_var("OVERLAY_COALESCE_MS");
        env::remove_var("OVERLAY_RETRY_LONG_MS");

        assert_eq!(config.sections_dir, Some(PathBuf::from("/tmp/book/OEBPS")));
        assert_eq!(config.overlay.coalesce, Duration::from_millis(25));
        assert_eq!(config.overlay.retry_long, Duration::from_millis(1500));
        assert_eq!(config.overlay.retry_short, Duration::from_millis(300));
    }
}
