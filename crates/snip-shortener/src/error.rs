use thiserror::Error;
use snip_core::{CacheError, CoreError, StoreError};

pub type Result<T> = std::result::Result<T, ShortenerError>;

/// Errors surfaced by the repository and the service.
///
/// The variants let a presentation layer tell a missing code apart from a
/// transient backend failure and from exhausted collision retries.
#[derive(Debug, Clone, Error)]
pub enum ShortenerError {
    #[error("short code not found: {0}")]
    NotFound(String),
    #[error("short code already exists: {0}")]
    DuplicateKey(String),
    #[error("too many duplicate attempts ({attempts})")]
    TooManyAttempts { attempts: u32 },
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("invalid short code: {0}")]
    InvalidShortCode(String),
    #[error("public host is not configured")]
    MissingPublicHost,
    #[error("cache error: {0}")]
    Cache(#[from] CacheError),
    #[error("storage error: {0}")]
    Storage(StoreError),
}

impl ShortenerError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ShortenerError::NotFound(_))
    }
}

impl From<StoreError> for ShortenerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::DuplicateKey(code) => Self::DuplicateKey(code),
            other => Self::Storage(other),
        }
    }
}

impl From<CoreError> for ShortenerError {
    fn from(value: CoreError) -> Self {
        match value {
            CoreError::InvalidShortCode(message) => Self::InvalidShortCode(message),
            CoreError::MissingPublicHost => Self::MissingPublicHost,
        }
    }
}
