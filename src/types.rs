// Type definitions and enums

use base64::Engine;

/// Errors returned by the language-model provider adapter.
///
/// The split between transient and fatal variants drives the retry policy:
/// transient errors are retried with backoff, fatal errors propagate at once.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider rate limit hit: {0}")]
    RateLimited(String),

    #[error("Provider unavailable ({status}): {message}")]
    Unavailable { status: u16, message: String },

    #[error("Provider authentication failed: {0}")]
    Auth(String),

    #[error("Malformed provider request: {0}")]
    InvalidRequest(String),

    #[error("Provider network error: {0}")]
    Network(String),

    #[error("Failed to parse provider response: {0}")]
    BadResponse(String),
}

impl ProviderError {
    /// Whether a retry with backoff can reasonably succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderError::RateLimited(_)
                | ProviderError::Unavailable { .. }
                | ProviderError::Network(_)
        )
    }

    /// Classify an HTTP status from the provider API.
    pub fn from_status(status: u16, message: String) -> Self {
        match status {
            429 => ProviderError::RateLimited(message),
            s if s >= 500 => ProviderError::Unavailable { status: s, message },
            401 | 403 => ProviderError::Auth(message),
            _ => ProviderError::InvalidRequest(message),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Agency pipeline aborted: {0}")]
    PipelineAborted(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type AppResult<T> = std::result::Result<T, AppError>;

/// Decoded inline image, either uploaded by the user as a data URL or
/// fetched from a scraped page's og:image.
#[derive(Debug, Clone)]
pub struct ImageData {
    pub media_type: String,
    pub bytes: Vec<u8>,
}

impl ImageData {
    /// Parse a `data:image/png;base64,...` URL as sent by browser clients.
    pub fn from_data_url(data_url: &str) -> Option<Self> {
        let rest = data_url.strip_prefix("data:")?;
        let (meta, payload) = rest.split_once(',')?;
        let media_type = meta.strip_suffix(";base64")?.to_string();
        if media_type.parse::<mime::Mime>().is_err() {
            return None;
        }
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload)
            .ok()?;
        Some(Self { media_type, bytes })
    }

    pub fn to_base64(&self) -> String {
        base64::engine::general_purpose::STANDARD.encode(&self.bytes)
    }
}
