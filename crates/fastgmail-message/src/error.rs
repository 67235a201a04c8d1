//! Gmail-specific error types.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GmailError {
    #[error("Authentication required")]
    AuthRequired,

    #[error("Token expired")]
    TokenExpired,

    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Message id is required for this operation")]
    MissingMessageId,

    #[error("internalDate {0:?} is not a millisecond timestamp")]
    InvalidInternalDate(String),

    #[error("Cannot parse date {value:?}: {reason}")]
    DateParse { value: String, reason: String },

    #[error("Invalid date format {0:?}")]
    InvalidDateFormat(String),

    #[error("Invalid base64url payload: {0}")]
    Decode(String),

    #[error("{} already exists, pass overwrite to replace it", .0.display())]
    FileExists(PathBuf),

    #[error("Attachment {0} has no data")]
    AttachmentUnavailable(String),

    #[error("Batch item {id} failed with status {status}: {message}")]
    BatchItemFailed {
        id: String,
        status: u16,
        message: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
}

impl GmailError {
    /// User-friendly error message for display.
    pub fn user_message(&self) -> String {
        match self {
            Self::AuthRequired => "Please sign in to your Google account".to_string(),
            Self::TokenExpired => "Your session has expired. Please sign in again.".to_string(),
            Self::RateLimited(secs) => format!("Too many requests. Please wait {} seconds.", secs),
            Self::NotFound(_) => "Message or label not found".to_string(),
            Self::MissingMessageId => "The message has no id".to_string(),
            Self::InvalidInternalDate(_) | Self::DateParse { .. } => {
                "The message date is malformed".to_string()
            }
            Self::InvalidDateFormat(_) => "The date format setting is invalid".to_string(),
            Self::Decode(_) => "The message content could not be decoded".to_string(),
            Self::FileExists(path) => format!("{} already exists", path.display()),
            Self::AttachmentUnavailable(name) => format!("Attachment {} is empty", name),
            Self::BatchItemFailed { .. } => "Some labels could not be loaded".to_string(),
            Self::InvalidResponse(_) => "Received an unexpected response from Gmail".to_string(),
            Self::ApiError(msg) => format!("Gmail error: {}", msg),
            Self::Io(_) => "A file operation failed".to_string(),
            Self::NetworkError(_) => "Network error. Check your connection.".to_string(),
        }
    }

    /// Whether this error should trigger a token refresh.
    pub fn should_refresh_token(&self) -> bool {
        matches!(self, Self::TokenExpired | Self::AuthRequired)
    }

    /// Whether a caller could reasonably retry. Nothing in this crate retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::NetworkError(_) => true,
            Self::BatchItemFailed { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
