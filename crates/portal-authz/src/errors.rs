use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthzError {
    #[error("unknown role: {0}")]
    UnknownRole(String),
    #[error("malformed token: {0}")]
    MalformedToken(String),
    #[error("invalid token payload: {0}")]
    InvalidPayload(String),
}

pub type AuthzResult<T> = Result<T, AuthzError>;
