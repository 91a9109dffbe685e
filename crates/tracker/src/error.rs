use actors::actor::ActorError;
use demurrage::{error_code, RequestError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server answered with {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error(transparent)]
    Request(#[from] RequestError),
    #[error("a stop event is already open")]
    AlreadyTracking,
    #[error("no stop event is open")]
    NotTracking,
    #[error("coordinator unavailable: {0}")]
    Actor(#[from] ActorError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("invalid json: {0}")]
    Json(#[from] serde_json::Error),
}

impl TrackerError {
    /// Whether the server refused to open an event because one is already
    /// open for the user.
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::AlreadyTracking | Self::Request(RequestError::Conflict(_)) => true,
            Self::Api { code, .. } => code.as_deref() == Some(error_code::CONFLICT),
            _ => false,
        }
    }

    /// Whether the event to close was no longer open on the server.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotTracking
                | Self::Request(RequestError::NotFound)
                | Self::Api { status: 404, .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, TrackerError>;
