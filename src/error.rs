//! Error types for the evaluation core.
//!
//! Two failure channels exist and are never mixed. Recoverable conditions
//! (rule-set parsing, validation, I/O) surface as [`Error`]. Broken caller
//! contracts (setting the connection twice, double-marking a domain check,
//! destroying a context with an asynchronous step outstanding) terminate the
//! request path with a `contract violation` panic and are not representable
//! as an [`Error`] value.

use thiserror::Error;

/// Result type alias using the crate's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Recoverable error raised while loading or validating rule sets.
#[derive(Error, Debug)]
pub enum Error {
    /// Error during rule-set validation
    #[error("rule set validation error: {message}")]
    Validation {
        /// Detailed error message
        message: String,
        /// Field that caused the error, if applicable
        field: Option<String>,
    },

    /// Error during rule-set parsing
    #[error("rule set parse error: {message}")]
    Parse {
        /// Detailed error message
        message: String,
    },

    /// Configuration error
    #[error("configuration error: {message}")]
    Config {
        /// Detailed error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: None,
        }
    }

    /// Create a validation error with field context.
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Error::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Create a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Error::Parse {
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Error::Config {
            message: message.into(),
        }
    }

    /// Get the error category for logging.
    pub fn category(&self) -> &'static str {
        match self {
            Error::Validation { .. } => "validation",
            Error::Parse { .. } => "parse",
            Error::Config { .. } => "config",
            Error::Io(_) => "io",
            Error::Serialization(_) => "serialization",
            Error::Yaml(_) => "yaml",
        }
    }
}

/// Terminate the request path on a broken caller contract.
///
/// The message always carries the `contract violation` prefix so a test
/// harness can assert on the failure deterministically.
#[cold]
#[track_caller]
pub(crate) fn contract_violation(message: &str) -> ! {
    panic!("contract violation: {message}");
}

/// Enforce a caller contract; diverges through [`contract_violation`] when
/// the condition does not hold.
macro_rules! contract {
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            $crate::error::contract_violation(&format!($($arg)+));
        }
    };
}
pub(crate) use contract;
