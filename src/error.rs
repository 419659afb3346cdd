use miette::{Diagnostic, Result};
use reqwest::StatusCode;
use thiserror::Error;

/// Main error type for the sync service
#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error("Invalid input: {0}")]
    #[diagnostic(code(familysync::input))]
    Input(String),

    #[error("Unauthorized")]
    #[diagnostic(code(familysync::unauthorized))]
    Unauthorized,

    #[error("Calendar not found: {0}")]
    #[diagnostic(code(familysync::calendar_not_found))]
    CalendarNotFound(String),

    #[error("Invalid calendar URL: \"{0}\" - please update the calendar with a valid https:// link")]
    #[diagnostic(
        code(familysync::invalid_url),
        help("only http:// and https:// feed URLs can be synced")
    )]
    InvalidUrl(String),

    #[error("fetch failed: {status} {reason}")]
    #[diagnostic(code(familysync::fetch_status))]
    FetchStatus { status: u16, reason: String },

    #[error("Transport error: {0}")]
    #[diagnostic(code(familysync::transport))]
    Transport(String),

    #[error("Persistence error: {0}")]
    #[diagnostic(code(familysync::persistence))]
    Persistence(String),

    #[error("A sync is already running for calendar {0}")]
    #[diagnostic(code(familysync::sync_in_progress))]
    SyncInProgress(String),

    #[error("Configuration error: {0}")]
    #[diagnostic(code(familysync::config))]
    Config(String),

    #[error("Component error: {0}")]
    #[diagnostic(code(familysync::component))]
    Component(String),

    #[error(transparent)]
    #[diagnostic(code(familysync::io))]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(familysync::serialization))]
    Serialization(String),

    #[error("Other error: {0}")]
    #[diagnostic(code(familysync::other))]
    Other(String),
}

impl Error {
    /// Status code an HTTP route should answer with for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Unauthorized => StatusCode::UNAUTHORIZED,
            Error::Input(_) | Error::InvalidUrl(_) => StatusCode::BAD_REQUEST,
            Error::CalendarNotFound(_) => StatusCode::NOT_FOUND,
            Error::SyncInProgress(_) => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Whether retrying on the next scheduled sync may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::FetchStatus { .. }
                | Error::Transport(_)
                | Error::Persistence(_)
                | Error::SyncInProgress(_)
        )
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Error::Transport(format!("request timed out: {}", err))
        } else {
            Error::Transport(err.to_string())
        }
    }
}

impl From<redis::RedisError> for Error {
    fn from(err: redis::RedisError) -> Self {
        Error::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// Type alias for Result with our Error type
pub type SyncResult<T> = Result<T, Error>;

/// Helper to create input errors
pub fn input_error(message: &str) -> Error {
    Error::Input(message.to_string())
}

/// Helper to create configuration errors
pub fn config_error(message: &str) -> Error {
    Error::Config(message.to_string())
}

/// Helper to create persistence errors
pub fn persistence_error(message: &str) -> Error {
    Error::Persistence(message.to_string())
}

/// Helper to create component errors
pub fn component_error(message: &str) -> Error {
    Error::Component(message.to_string())
}
