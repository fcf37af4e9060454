use crate::error::StoreError;
use crate::shortcode::ShortCode;
use crate::shortened::ShortenedUrl;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, StoreError>;

/// The durable document store holding every [`ShortenedUrl`].
///
/// `short_code` carries a uniqueness constraint; a violating insert must
/// fail with [`StoreError::DuplicateKey`] so callers can retry with a new code.
#[async_trait]
pub trait UrlStore: Send + Sync + 'static {
    /// Looks up the record for `code`. Returns `None` if it does not exist.
    async fn find_by_short_code(&self, code: &ShortCode) -> Result<Option<ShortenedUrl>>;

    /// Inserts a new record.
    async fn insert(&self, url: &ShortenedUrl) -> Result<()>;

    /// Replaces the original URL of `code` and returns the updated record.
    /// Returns `None` if no record exists for `code`.
    async fn update_original_url(
        &self,
        code: &ShortCode,
        original_url: &str,
    ) -> Result<Option<ShortenedUrl>>;

    /// Deletes the record for `code`.
    /// Returns `true` if the record existed and was removed.
    async fn delete_by_short_code(&self, code: &ShortCode) -> Result<bool>;

    /// Returns every stored record.
    async fn list_all(&self) -> Result<Vec<ShortenedUrl>>;
}
