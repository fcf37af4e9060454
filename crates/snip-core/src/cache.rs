use crate::error::CacheError;
use crate::shortcode::ShortCode;
use crate::shortened::ShortenedUrl;
use async_trait::async_trait;
use std::time::Duration;

pub type Result<T> = std::result::Result<T, CacheError>;

/// A volatile cache of [`ShortenedUrl`]s keyed by [`ShortCode`].
///
/// Values are stored as JSON `{shortCode, originalURL}`. Implementations
/// can use Redis, an in-process cache, or other backends. Each call is a
/// cancellable future; callers bound it with a timeout where needed.
#[async_trait]
pub trait UrlCache: Send + Sync + 'static {
    /// Get a record from the cache.
    ///
    /// Returns `Ok(None)` if the key is absent or expired. Reading does not
    /// extend the entry's lifetime.
    async fn get(&self, code: &ShortCode) -> Result<Option<ShortenedUrl>>;

    /// Store a record with a relative expiry.
    ///
    /// A zero `ttl` stores the entry without expiry.
    async fn put(&self, code: &ShortCode, value: &ShortenedUrl, ttl: Duration) -> Result<()>;

    /// Checks whether a live entry exists for `code`.
    async fn exists(&self, code: &ShortCode) -> Result<bool>;

    /// Remove a record from the cache.
    ///
    /// It is not an error if the key does not exist.
    async fn delete(&self, code: &ShortCode) -> Result<()>;

    /// Clears every entry in this cache's namespace.
    async fn flush(&self) -> Result<()>;

    /// Drops any stale entry for `code`, then stores `value`.
    async fn replace(&self, code: &ShortCode, value: &ShortenedUrl, ttl: Duration) -> Result<()> {
        self.delete(code).await?;
        self.put(code, value, ttl).await
    }
}
