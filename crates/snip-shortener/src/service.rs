use crate::config::ShortenerConfig;
use crate::error::{Result, ShortenerError};
use crate::repository::ShortenedRepository;
use async_trait::async_trait;
use snip_core::{ShortCode, ShortenedUrl};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The operations offered to the presentation layer.
///
/// Every returned record carries its public `shortened_url`, derived from
/// the configured host at call time.
#[async_trait]
pub trait Shortener: Send + Sync + 'static {
    /// Creates a short code for `original_url`.
    async fn shorten_url(&self, original_url: &str) -> Result<ShortenedUrl>;

    /// Resolves a short code.
    async fn get_by_short_code(&self, code: &ShortCode) -> Result<ShortenedUrl>;

    /// Lists every shortened URL.
    async fn list_shortened_urls(&self) -> Result<Vec<ShortenedUrl>>;

    /// Deletes a shortened URL.
    async fn delete_shortened_url(&self, code: &ShortCode) -> Result<()>;

    /// Points an existing short code at a new URL.
    async fn update_shortened_url(&self, code: &ShortCode, original_url: &str)
        -> Result<ShortenedUrl>;
}

/// A concrete implementation of the [`Shortener`] trait.
///
/// Codes are derived from a hash of the URL, so two requests for the same
/// URL, or two URLs whose hashes share a prefix, collide. A collision is
/// retried with the attempt number as salt, up to `max_attempts` times.
#[derive(Debug)]
pub struct ShortenerService<R> {
    repository: Arc<R>,
    public_host: String,
    max_attempts: u32,
}

impl<R: ShortenedRepository> ShortenerService<R> {
    pub fn new(repository: R, config: &ShortenerConfig) -> Self {
        Self::from_shared(Arc::new(repository), config)
    }

    /// Creates a service over a repository that is also used elsewhere.
    pub fn from_shared(repository: Arc<R>, config: &ShortenerConfig) -> Self {
        Self {
            repository,
            public_host: config.public_host.clone(),
            max_attempts: config.max_attempts,
        }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    fn validate_url(url: &str) -> Result<()> {
        if url.trim().is_empty() {
            return Err(ShortenerError::InvalidUrl("URL cannot be empty".to_string()));
        }
        Ok(())
    }

    fn present(&self, mut url: ShortenedUrl) -> Result<ShortenedUrl> {
        url.attach_public_url(&self.public_host)?;
        Ok(url)
    }

    /// Attempt 1 is unsalted; attempt `n` is salted with `n`.
    fn candidate(original_url: &str, attempt: u32) -> ShortenedUrl {
        let salt = (attempt > 1).then(|| attempt.to_string());
        ShortenedUrl::generate(original_url, salt.as_deref())
    }
}

#[async_trait]
impl<R: ShortenedRepository> Shortener for ShortenerService<R> {
    async fn shorten_url(&self, original_url: &str) -> Result<ShortenedUrl> {
        Self::validate_url(original_url)?;
        // Fail before writing anything if the result could not be presented.
        if self.public_host.trim().is_empty() {
            return Err(ShortenerError::MissingPublicHost);
        }

        for attempt in 1..=self.max_attempts {
            let url = Self::candidate(original_url, attempt);
            match self.repository.insert(&url).await {
                Ok(()) => {
                    info!(code = %url.short_code, attempt, "Shortened URL");
                    return self.present(url);
                }
                Err(ShortenerError::DuplicateKey(code)) => {
                    debug!(%code, attempt, "Duplicate short code, retrying with salt");
                }
                Err(e) => return Err(e),
            }
        }

        warn!(attempts = self.max_attempts, "Giving up after repeated short code collisions");
        Err(ShortenerError::TooManyAttempts {
            attempts: self.max_attempts,
        })
    }

    async fn get_by_short_code(&self, code: &ShortCode) -> Result<ShortenedUrl> {
        let url = self.repository.get_by_short_code(code).await?;
        self.present(url)
    }

    async fn list_shortened_urls(&self) -> Result<Vec<ShortenedUrl>> {
        self.repository
            .list_all()
            .await?
            .into_iter()
            .map(|url| self.present(url))
            .collect()
    }

    async fn delete_shortened_url(&self, code: &ShortCode) -> Result<()> {
        self.repository.delete_by_short_code(code).await
    }

    async fn update_shortened_url(
        &self,
        code: &ShortCode,
        original_url: &str,
    ) -> Result<ShortenedUrl> {
        Self::validate_url(original_url)?;
        let url = self.repository.update_original_url(code, original_url).await?;
        self.present(url)
    }
}
