use serde::Deserialize;
use thiserror::Error;

/// Transport and status errors. `Clone` so a single failed request can be
/// handed to every caller waiting on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("Invalid URL")]
    InvalidUrl,

    #[error("Invalid response from server")]
    InvalidResponse,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to decode response: {0}")]
    DecodeError(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    ServerError(String),

    #[error("HTTP error: {0}")]
    HttpError(u16),

    #[error("Network error: {0}")]
    Transport(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Error body the backend returns for 400/401/5xx.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: String,
}

impl ApiError {
    /// Map a non-2xx status and its body to an error kind.
    pub fn from_status(status: u16, body: &[u8]) -> Self {
        let message = || {
            serde_json::from_slice::<ErrorEnvelope>(body)
                .ok()
                .map(|e| e.error)
                .filter(|m| !m.trim().is_empty())
        };
        match status {
            400 => ApiError::BadRequest(message().unwrap_or_else(|| "Bad request".into())),
            401 => ApiError::Unauthorized(message().unwrap_or_else(|| "Unauthorized".into())),
            500..=599 => ApiError::ServerError(message().unwrap_or_else(|| "Server error".into())),
            other => ApiError::HttpError(other),
        }
    }

    /// Status code when the error came from an HTTP response and the
    /// exact code is known.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::BadRequest(_) => Some(400),
            ApiError::Unauthorized(_) => Some(401),
            ApiError::HttpError(status) => Some(*status),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            ApiError::InvalidUrl
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}
