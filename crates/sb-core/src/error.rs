//! Error types for saasbridge-core.
//!
//! Only conditions that stop an invocation before (or instead of) producing
//! results are errors. Non-success responses and per-record failures are
//! reported through sinks and [`ChangeOperation`](crate::ChangeOperation)s.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
#[error("{kind}")]
pub struct Error {
    pub kind: ErrorKind,
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, source: None }
    }

    /// Shorthand for a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Config(message.into()))
    }

    /// Returns true if the error was raised before any network call.
    pub fn is_fatal_precondition(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Config(_)
                | ErrorKind::MissingCondition(_)
                | ErrorKind::UnsupportedOperation(_)
                | ErrorKind::MissingMapping(_)
        )
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ErrorKind {
    /// Missing credential, base URL or other integration setting.
    #[error("Configuration error: {0}")]
    Config(String),
    /// A condition the adapter cannot run without was not supplied.
    #[error("Missing required condition: {0}")]
    MissingCondition(String),
    /// Unknown action or operation name.
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),
    /// A prerequisite mapping record could not be found.
    #[error("Missing mapping: {0}")]
    MissingMapping(String),
    /// The transport failed to produce a response.
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("JSON error: {0}")]
    Json(String),
    #[error("{0}")]
    Other(String),
}

impl From<saasbridge_client::Error> for Error {
    fn from(err: saasbridge_client::Error) -> Self {
        let kind = match &err.kind {
            saasbridge_client::ErrorKind::Config(msg) => ErrorKind::Config(msg.clone()),
            _ => ErrorKind::Transport(err.to_string()),
        };
        Error {
            kind,
            source: Some(Box::new(err)),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Json(err.to_string()),
            source: Some(Box::new(err)),
        }
    }
}
