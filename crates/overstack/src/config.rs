#![forbid(unsafe_code)]

//! Stack controller tuning.
//!
//! With the `policy-config` feature, a [`StackConfig`] can be loaded from a
//! TOML document:
//!
//! ```toml
//! [stack]
//! grace_window_ms = 300
//! sweep_interval_ms = 100
//! ```
//!
//! Missing keys keep their defaults.

use std::time::Duration;

use crate::error::ConfigError;

/// Default retention for a closing instance before forced removal.
pub const DEFAULT_GRACE_WINDOW: Duration = Duration::from_millis(300);

/// Default period of the closing-instance sweep.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_millis(100);

/// Timing policy for the stack controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackConfig {
    /// How long a `closing` instance stays mounted without an unmount signal.
    pub grace_window: Duration,
    /// How often the sweep runs while anything is closing.
    pub sweep_interval: Duration,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            grace_window: DEFAULT_GRACE_WINDOW,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl StackConfig {
    /// Config with default timings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the grace window.
    #[must_use]
    pub fn grace_window(mut self, grace_window: Duration) -> Self {
        self.grace_window = grace_window;
        self
    }

    /// Set the sweep interval.
    #[must_use]
    pub fn sweep_interval(mut self, sweep_interval: Duration) -> Self {
        self.sweep_interval = sweep_interval;
        self
    }

    /// Reject timings the controller cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sweep_interval.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "sweep_interval_ms",
                reason: "must be non-zero",
            });
        }
        Ok(())
    }

    /// Parse and validate a TOML policy document.
    #[cfg(feature = "policy-config")]
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let doc: policy::PolicyDocument =
            toml::from_str(source).map_err(|err| ConfigError::Parse(err.to_string()))?;
        let config = doc.stack.unwrap_or_default().apply(Self::default());
        config.validate()?;
        tracing::debug!(
            grace_window = ?config.grace_window,
            sweep_interval = ?config.sweep_interval,
            "loaded stack config"
        );
        Ok(config)
    }
}

#[cfg(feature = "policy-config")]
mod policy {
    use std::time::Duration;

    use serde::Deserialize;

    use super::StackConfig;

    #[derive(Debug, Default, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub(super) struct PolicyDocument {
        pub(super) stack: Option<StackSection>,
    }

    #[derive(Debug, Default, Deserialize)]
    #[serde(deny_unknown_fields)]
    pub(super) struct StackSection {
        grace_window_ms: Option<u64>,
        sweep_interval_ms: Option<u64>,
    }

    impl StackSection {
        pub(super) fn apply(self, mut config: StackConfig) -> StackConfig {
            if let Some(ms) = self.grace_window_ms {
                config.grace_window = Duration::from_millis(ms);
            }
            if let Some(ms) = self.sweep_interval_ms {
                config.sweep_interval = Duration::from_millis(ms);
            }
            config
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = StackConfig::default();
        assert_eq!(config.grace_window, Duration::from_millis(300));
        assert_eq!(config.sweep_interval, Duration::from_millis(100));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn builder_overrides() {
        let config = StackConfig::new()
            .grace_window(Duration::from_millis(50))
            .sweep_interval(Duration::from_millis(10));
        assert_eq!(config.grace_window, Duration::from_millis(50));
        assert_eq!(config.sweep_interval, Duration::from_millis(10));
    }

    #[test]
    fn zero_sweep_interval_rejected() {
        let config = StackConfig::new().sweep_interval(Duration::ZERO);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue {
                field: "sweep_interval_ms",
                ..
            })
        ));
    }

    #[test]
    fn zero_grace_window_is_allowed() {
        let config = StackConfig::new().grace_window(Duration::ZERO);
        assert!(config.validate().is_ok());
    }

    #[cfg(feature = "policy-config")]
    mod toml_policy {
        use super::*;

        #[test]
        fn partial_document_keeps_defaults() {
            let config = StackConfig::from_toml_str("[stack]\ngrace_window_ms = 120\n")
                .expect("valid policy");
            assert_eq!(config.grace_window, Duration::from_millis(120));
            assert_eq!(config.sweep_interval, DEFAULT_SWEEP_INTERVAL);
        }

        #[test]
        fn empty_document_is_default() {
            assert_eq!(
                StackConfig::from_toml_str("").expect("empty policy"),
                StackConfig::default()
            );
        }

        #[test]
        fn unknown_key_is_parse_error() {
            let err = StackConfig::from_toml_str("[stack]\ngrace = 1\n").unwrap_err();
            assert!(matches!(err, ConfigError::Parse(_)));
        }

        #[derive(Clone, Default)]
        struct Capture(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);

        impl std::io::Write for Capture {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().expect("capture lock").extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        #[test]
        fn huge_window_is_logged_as_duration() {
            let capture = Capture::default();
            let writer = capture.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(tracing::Level::DEBUG)
                .with_ansi(false)
                .with_writer(move || writer.clone())
                .finish();

            let config = tracing::subscriber::with_default(subscriber, || {
                StackConfig::from_toml_str(&format!("[stack]\ngrace_window_ms = {}\n", i64::MAX))
            })
            .expect("valid policy");

            let window = Duration::from_millis(i64::MAX as u64);
            assert_eq!(config.grace_window, window);
            let output = String::from_utf8(capture.0.lock().expect("capture lock").clone())
                .expect("utf8 log output");
            assert!(output.contains(&format!("grace_window={window:?}")));
            assert!(output.contains("sweep_interval=100ms"));
        }

        #[test]
        fn zero_interval_is_invalid() {
            let err = StackConfig::from_toml_str("[stack]\nsweep_interval_ms = 0\n").unwrap_err();
            assert!(matches!(err, ConfigError::InvalidValue { .. }));
        }
    }
}
