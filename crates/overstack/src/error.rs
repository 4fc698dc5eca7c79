#![forbid(unsafe_code)]

//! Error types.
//!
//! Only registry construction, configuration loading and the command facade
//! return errors. Stack transitions themselves are total.

/// Errors raised at the registry and command boundaries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OverlayError {
    /// Two definitions were registered under the same name.
    DuplicateName(&'static str),
    /// A command referenced a name missing from the registry.
    UnknownOverlay(String),
    /// A props bag did not have the type the definition declares.
    PropsMismatch {
        name: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

impl std::fmt::Display for OverlayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DuplicateName(name) => write!(f, "overlay '{name}' is registered twice"),
            Self::UnknownOverlay(name) => write!(f, "no overlay named '{name}' is registered"),
            Self::PropsMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "overlay '{name}' expects props of type {expected}, got {found}"
            ),
        }
    }
}

impl std::error::Error for OverlayError {}

/// Errors from building or loading a [`StackConfig`](crate::StackConfig).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The policy document could not be parsed.
    Parse(String),
    /// A field had an unusable value.
    InvalidValue {
        field: &'static str,
        reason: &'static str,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(msg) => write!(f, "config parse error: {msg}"),
            Self::InvalidValue { field, reason } => {
                write!(f, "invalid value for '{field}': {reason}")
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_messages() {
        assert_eq!(
            OverlayError::DuplicateName("confirm").to_string(),
            "overlay 'confirm' is registered twice"
        );
        assert_eq!(
            OverlayError::UnknownOverlay("nope".into()).to_string(),
            "no overlay named 'nope' is registered"
        );
        let mismatch = OverlayError::PropsMismatch {
            name: "profile",
            expected: "u32",
            found: "alloc::string::String",
        };
        assert!(mismatch.to_string().contains("expects props of type u32"));
        assert_eq!(
            ConfigError::InvalidValue {
                field: "sweep_interval_ms",
                reason: "must be non-zero",
            }
            .to_string(),
            "invalid value for 'sweep_interval_ms': must be non-zero"
        );
    }
}
