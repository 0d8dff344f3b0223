//! Error types for vstester

use thiserror::Error;

/// Result type alias using vstester Error
pub type Result<T> = std::result::Result<T, Error>;

/// vstester error types
#[derive(Error, Debug)]
pub enum Error {
    /// The application never reached its ready state. Fatal for the run.
    #[error("Application did not become ready within {seconds}s")]
    LaunchTimeout { seconds: u64 },

    #[error("Failed to launch application: {0}")]
    LaunchFailed(String),

    /// A single bounded wait expired. Scoped to the operation that issued it.
    #[error("Timed out after {timeout_ms}ms waiting for {what}")]
    OperationTimeout { what: String, timeout_ms: u64 },

    /// Carries the label that was requested, not the last one resolved.
    #[error("Item {0} not found")]
    ItemNotFound(String),

    #[error("No element matching {0}")]
    ElementNotFound(String),

    #[error("Path must contain at least one label")]
    EmptyPath,

    #[error("Teardown failed: {0}")]
    TeardownFailure(String),

    #[error("Automation error: {0}")]
    Automation(String),

    #[error("Invalid session state transition: {from} -> {to}")]
    InvalidStateTransition { from: String, to: String },

    #[error("Test spec parse error: {0}")]
    SpecParse(String),

    #[error("Test case failed: {0}")]
    CaseFailed(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for an [`Error::OperationTimeout`] over a `Duration`.
    pub fn timeout(what: impl Into<String>, timeout: std::time::Duration) -> Self {
        Error::OperationTimeout {
            what: what.into(),
            timeout_ms: timeout.as_millis() as u64,
        }
    }

    /// Whether this error aborts the whole run rather than one test case.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::LaunchTimeout { .. } | Error::LaunchFailed(_))
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::InvalidConfig(e.to_string())
    }
}
