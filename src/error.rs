use reqwest::StatusCode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SimpleGithubError {
    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Request failed with status {status}: {message}")]
    HttpStatus { status: StatusCode, message: String },

    #[error("Authorization rejected ({status}): {message}")]
    AuthRejected { status: StatusCode, message: String },

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Call cancelled")]
    Cancelled,

    #[error("Bad argument: {0}")]
    BadArgument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Fieldless view of [`SimpleGithubError`] for callers that only branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    HttpStatus,
    AuthRejected,
    NotFound,
    MalformedPayload,
    Cancelled,
    BadArgument,
    Io,
    Storage,
    Config,
}

impl SimpleGithubError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimpleGithubError::Transport(_) => ErrorKind::Transport,
            SimpleGithubError::HttpStatus { .. } => ErrorKind::HttpStatus,
            SimpleGithubError::AuthRejected { .. } => ErrorKind::AuthRejected,
            SimpleGithubError::NotFound(_) => ErrorKind::NotFound,
            SimpleGithubError::MalformedPayload(_) => ErrorKind::MalformedPayload,
            SimpleGithubError::Cancelled => ErrorKind::Cancelled,
            SimpleGithubError::BadArgument(_) => ErrorKind::BadArgument,
            SimpleGithubError::Io(_) => ErrorKind::Io,
            SimpleGithubError::Storage(_) => ErrorKind::Storage,
            SimpleGithubError::Config(_) => ErrorKind::Config,
        }
    }

    /// Status code carried by the error, if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            SimpleGithubError::HttpStatus { status, .. }
            | SimpleGithubError::AuthRejected { status, .. } => Some(*status),
            SimpleGithubError::NotFound(_) => Some(StatusCode::NOT_FOUND),
            SimpleGithubError::Transport(e) => e.status(),
            _ => None,
        }
    }

    /// The short message a consumer shows to the user.
    pub fn message(&self) -> String {
        match self {
            SimpleGithubError::HttpStatus { message, .. }
            | SimpleGithubError::AuthRejected { message, .. } => message.clone(),
            SimpleGithubError::NotFound(what) => what.clone(),
            other => other.to_string(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, SimpleGithubError::Cancelled)
    }
}

impl From<serde_json::Error> for SimpleGithubError {
    fn from(err: serde_json::Error) -> Self {
        SimpleGithubError::MalformedPayload(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, SimpleGithubError>;
