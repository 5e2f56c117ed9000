use thiserror::Error;
use whateat_net::ApiError;

/// Auth failures. `Clone` because a single refresh result is delivered to
/// every caller that waited on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("You are not logged in")]
    NotLoggedIn,

    #[error("Your session has expired. Please sign in again.")]
    SessionExpired,

    #[error("Failed to get identity token from Apple")]
    MissingIdentityToken,

    #[error("{0}")]
    BackendAuthFailed(String),

    #[error("Secure storage error: {0}")]
    Secrets(String),

    #[error(transparent)]
    Api(#[from] ApiError),
}

impl From<whateat_store::StoreError> for AuthError {
    fn from(e: whateat_store::StoreError) -> Self {
        AuthError::Secrets(e.to_string())
    }
}

/// Cover photo upload failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("The cover photo couldn't be processed.")]
    InvalidImageData,

    #[error("The selected image exceeds the {} upload limit.", format_size(*max_bytes))]
    ImageTooLarge { max_bytes: usize },

    #[error("The upload failed with status code {status}.")]
    UploadFailed { status: u16 },

    #[error(transparent)]
    Api(#[from] ApiError),
}

fn format_size(bytes: usize) -> String {
    const MIB: usize = 1024 * 1024;
    if bytes >= MIB && bytes % MIB == 0 {
        format!("{} MB", bytes / MIB)
    } else if bytes >= MIB {
        format!("{:.1} MB", bytes as f64 / MIB as f64)
    } else {
        format!("{} KB", bytes.div_ceil(1024))
    }
}

/// Error type of every store operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error("{0}")]
    Validation(String),
}

impl ClientError {
    /// HTTP status of the underlying API error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api(e) | ClientError::Auth(AuthError::Api(e)) => e.status(),
            ClientError::Upload(UploadError::Api(e)) => e.status(),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
