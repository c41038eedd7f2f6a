//! Error types for the coin catalog engine

use thiserror::Error;

/// Errors that can occur when talking to a market data provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network request failed
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// Invalid response from provider
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    /// The provider does not know the requested coin
    #[error("Coin not found: {0}")]
    NotFound(String),

    /// Provider API error
    #[error("Provider API error: {0}")]
    ApiError(String),

    /// Timeout waiting for response
    #[error("Request timeout")]
    Timeout,

    /// The provider was configured with unusable settings
    #[error("Invalid provider configuration: {0}")]
    InvalidConfig(String),
}

impl ProviderError {
    /// Maps a transport error, keeping timeouts distinguishable
    pub fn from_transport(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::NetworkError(err)
        }
    }
}

/// Errors raised by a favorites persistence medium
#[derive(Debug, Error)]
pub enum StorageError {
    /// Underlying filesystem failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing the value would exceed the medium's quota
    #[error("Quota exceeded: {needed} bytes needed, {quota} bytes available")]
    QuotaExceeded { needed: usize, quota: usize },

    /// The medium cannot be used at all
    #[error("Storage unavailable: {0}")]
    Unavailable(String),
}

/// Errors surfaced to pages calling into the engine
///
/// Reaching the last page is not an error; see
/// [`Boundary::EndOfData`](crate::pager::Boundary::EndOfData).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CatalogError {
    /// Network, timeout, rate limit or parse failure. Retryable by the caller.
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// The requested coin does not exist upstream
    #[error("Coin {id} not found")]
    NotFound { id: String },

    /// Favorites could not be stored durably; the change lives for this session only
    #[error("Failed to persist favorites: {0}")]
    PersistFailed(String),
}

impl CatalogError {
    /// Creates a FetchFailed error
    pub fn fetch_failed(msg: impl Into<String>) -> Self {
        Self::FetchFailed(msg.into())
    }

    /// Creates a NotFound error
    pub fn not_found(id: &str) -> Self {
        Self::NotFound { id: id.to_string() }
    }

    /// Creates a PersistFailed error
    pub fn persist_failed(msg: impl Into<String>) -> Self {
        Self::PersistFailed(msg.into())
    }

    /// True when offering a manual retry makes sense
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::FetchFailed(_))
    }
}

impl From<ProviderError> for CatalogError {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::NotFound(id) => Self::NotFound { id },
            other => Self::FetchFailed(other.to_string()),
        }
    }
}

impl From<StorageError> for CatalogError {
    fn from(err: StorageError) -> Self {
        Self::PersistFailed(err.to_string())
    }
}
