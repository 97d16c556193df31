use thiserror::Error;

/// Central error type for the stem-separator-client crate.
#[derive(Debug, Error)]
pub enum ClientError {
    // Generic fallback (wraps anyhow)
    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),

    // Domain-specific variants
    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("API error ({status}): {detail}")]
    Api { status: u16, detail: String },

    #[error("Log stream error: {0}")]
    Stream(String),

    #[error("Download dir not available")]
    DownloadDirUnavailable,
}

// --- Implement From conversions for common errors ---
impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Anyhow(e.into())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(e: serde_json::Error) -> Self {
        ClientError::Anyhow(e.into())
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(e: reqwest::Error) -> Self {
        ClientError::Anyhow(e.into())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
