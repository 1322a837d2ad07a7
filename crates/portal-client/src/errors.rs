use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("unexpected status {status} from {endpoint}")]
    Status { status: u16, endpoint: String },
    #[error("identity response carried no usable role")]
    MissingRole,
    #[error("invalid phone number: {0}")]
    InvalidPhoneNumber(String),
    #[error("pagination cursor repeated: {0}")]
    CursorLoop(String),
}

pub type ClientResult<T> = Result<T, ClientError>;

impl ClientError {
    /// True for failures worth retrying later (network or 5xx).
    pub fn is_transient(&self) -> bool {
        match self {
            ClientError::Http(err) => err.is_connect() || err.is_timeout() || err.is_request(),
            ClientError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}
