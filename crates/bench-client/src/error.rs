use std::time::Duration;

pub type Result<T> = core::result::Result<T, ClientError>;

/// Transport-level failures. All of these end the benchmark.
#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("failed to decode response body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ClientError {
    pub(crate) fn from_reqwest(error: reqwest::Error, timeout: Duration) -> Self {
        if error.is_timeout() {
            ClientError::Timeout(timeout)
        } else if error.is_connect() {
            ClientError::Connection(error.to_string())
        } else {
            ClientError::Http(error)
        }
    }
}
