use thiserror::Error;

use crate::models::ErrorKind;

/// Failures of a single question sent to the relay.
#[derive(Error, Debug)]
pub enum VqaError {
    #[error("image payload is empty")]
    EmptyImage,

    #[error("could not reach the relay: {0}")]
    Transport(String),

    #[error("no answer within {0} ms")]
    Timeout(u64),

    #[error("model is loading: {0}")]
    UpstreamBusy(String),

    #[error("relay does not accept this request method (HTTP 405)")]
    MethodNotAllowed,

    #[error("relay rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("upstream failure (HTTP {status}): {message}")]
    Upstream { status: u16, message: String },

    #[error("malformed relay response: {0}")]
    MalformedResponse(String),
}

impl VqaError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            VqaError::EmptyImage => ErrorKind::EncodingFailure,
            VqaError::Transport(_) => ErrorKind::TransportFailure,
            VqaError::Timeout(_) => ErrorKind::Timeout,
            VqaError::UpstreamBusy(_) => ErrorKind::UpstreamBusy,
            VqaError::MethodNotAllowed | VqaError::Rejected { .. } => ErrorKind::UpstreamRejected,
            VqaError::Upstream { .. } | VqaError::MalformedResponse(_) => ErrorKind::UpstreamError,
        }
    }
}

/// Problems with the file the user picked.
#[derive(Error, Debug)]
pub enum UploadError {
    #[error("{path} is not an image file (expected jpg, png, webp, gif or bmp)")]
    NotAnImage { path: String },

    #[error("{path} is empty")]
    Empty { path: String },

    #[error("{path} is {size} bytes, the limit is {limit} bytes")]
    TooLarge { path: String, size: u64, limit: u64 },

    #[error("cannot read {path}: {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Failures of the relay's call to the hosted model.
#[derive(Error, Debug)]
pub enum UpstreamError {
    #[error("model is loading")]
    Loading { estimated_time: Option<f64> },

    #[error("model API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("model API unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected model response: {0}")]
    Parse(String),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("{key} must be set")]
    Missing { key: &'static str },

    #[error("invalid {key} value '{value}': {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
