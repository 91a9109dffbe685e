use std::error::Error;

use model::{company::Company, session::Session, user::User, WithId};
use thiserror::Error;

pub mod client;
pub mod database;
pub mod memory;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("the requested item does not exist")]
    NotFound,
    #[error("{0}")]
    Invalid(String),
    #[error("{0}")]
    Conflict(String),
    #[error("missing or invalid credentials")]
    Unauthorized,
    #[error("insufficient permissions")]
    Forbidden,
    #[error(transparent)]
    Other(Box<dyn Error + Send + Sync>),
}

/// Machine readable error codes, sent next to the human readable message.
pub mod error_code {
    pub const NOT_FOUND: &str = "not_found";
    pub const INVALID: &str = "invalid";
    pub const CONFLICT: &str = "conflict";
    pub const UNAUTHORIZED: &str = "unauthorized";
    pub const FORBIDDEN: &str = "forbidden";
    pub const INTERNAL: &str = "internal";
}

impl RequestError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound => error_code::NOT_FOUND,
            Self::Invalid(_) => error_code::INVALID,
            Self::Conflict(_) => error_code::CONFLICT,
            Self::Unauthorized => error_code::UNAUTHORIZED,
            Self::Forbidden => error_code::FORBIDDEN,
            Self::Other(_) => error_code::INTERNAL,
        }
    }

    pub fn invalid<S: Into<String>>(message: S) -> Self {
        Self::Invalid(message.into())
    }

    pub fn other<T: Error + Send + Sync + 'static>(why: T) -> Self {
        Self::Other(Box::new(why))
    }
}

impl From<database::DatabaseError> for RequestError {
    fn from(value: database::DatabaseError) -> Self {
        match value {
            database::DatabaseError::NotFound => Self::NotFound,
            database::DatabaseError::Conflict => {
                Self::Conflict("The entry conflicts with an existing one.".to_owned())
            }
            database::DatabaseError::Other(why) => Self::Other(why),
        }
    }
}

pub type RequestResult<O> = Result<O, RequestError>;

/// The authenticated user a request is performed for.
#[derive(Debug, Clone)]
pub struct Caller {
    pub session: WithId<Session>,
    pub user: WithId<User>,
    pub company: WithId<Company>,
}

impl Caller {
    pub fn is_admin(&self) -> bool {
        self.user.content.is_admin()
    }

    pub fn require_admin(&self) -> RequestResult<()> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(RequestError::Forbidden)
        }
    }
}
