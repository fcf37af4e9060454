use crate::config::{PopulationSettings, ShortenerConfig};
use crate::error::{Result, ShortenerError};
use crate::population::PopulationPool;
use async_trait::async_trait;
use snip_core::{ShortCode, ShortenedUrl, UrlCache, UrlStore};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Persistence operations the service builds on.
#[async_trait]
pub trait ShortenedRepository: Send + Sync + 'static {
    /// Resolves `code`, or fails with [`ShortenerError::NotFound`].
    async fn get_by_short_code(&self, code: &ShortCode) -> Result<ShortenedUrl>;

    /// Persists a new record. A taken code fails with
    /// [`ShortenerError::DuplicateKey`].
    async fn insert(&self, url: &ShortenedUrl) -> Result<()>;

    /// Removes `code` durably and from the cache.
    async fn delete_by_short_code(&self, code: &ShortCode) -> Result<()>;

    /// Points `code` at `original_url` and returns the updated record.
    async fn update_original_url(&self, code: &ShortCode, original_url: &str)
        -> Result<ShortenedUrl>;

    /// Returns every stored record.
    async fn list_all(&self) -> Result<Vec<ShortenedUrl>>;
}

/// Cache-aside repository over a durable [`UrlStore`] and a [`UrlCache`].
///
/// - **Reads** try the cache first. On a miss the store is queried and the
///   record is handed to the population pool before it is returned. A cache
///   failure (as opposed to a miss) is surfaced without touching the store.
/// - **Inserts and updates** go to the store first; the cache is refreshed in
///   the background, so it never runs ahead of the store.
/// - **Deletes** invalidate the cache synchronously, so an acknowledged
///   delete cannot be followed by a stale read.
/// - **Listing** always reads the store.
#[derive(Debug)]
pub struct CachedRepository<S, C> {
    store: Arc<S>,
    cache: Arc<C>,
    population: PopulationPool,
}

impl<S: UrlStore, C: UrlCache> CachedRepository<S, C> {
    /// Creates the repository and starts its population workers.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(store: S, cache: C, config: &ShortenerConfig) -> Self {
        let cache = Arc::new(cache);
        let population = PopulationPool::spawn(Arc::clone(&cache), PopulationSettings::from(config));
        Self {
            store: Arc::new(store),
            cache,
            population,
        }
    }

    /// Returns a reference to the durable store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns a reference to the cache.
    pub fn cache(&self) -> &C {
        &self.cache
    }

    pub fn population(&self) -> &PopulationPool {
        &self.population
    }

    /// Drops every cached record. Administrative use only.
    pub async fn flush_cache(&self) -> Result<()> {
        warn!("Flushing URL cache");
        self.cache.flush().await?;
        Ok(())
    }

    /// Stops the population workers after the queued tasks are written.
    pub async fn shutdown(&self) {
        self.population.shutdown().await;
    }
}

#[async_trait]
impl<S: UrlStore, C: UrlCache> ShortenedRepository for CachedRepository<S, C> {
    async fn get_by_short_code(&self, code: &ShortCode) -> Result<ShortenedUrl> {
        trace!(code = %code, "Fetching URL record with cache");

        if let Some(url) = self.cache.get(code).await? {
            debug!(code = %code, "Served from cache");
            return Ok(url);
        }

        trace!(code = %code, "Cache miss, fetching from store");
        let epoch = self.population.epoch(code);
        let Some(url) = self.store.find_by_short_code(code).await? else {
            debug!(code = %code, "Short code not found in store");
            return Err(ShortenerError::NotFound(code.to_string()));
        };

        self.population.enqueue(url.clone(), epoch);
        Ok(url)
    }

    async fn insert(&self, url: &ShortenedUrl) -> Result<()> {
        trace!(code = %url.short_code, "Inserting URL record into store");
        let epoch = self.population.epoch(&url.short_code);
        self.store.insert(url).await?;
        debug!(code = %url.short_code, "Inserted URL record");

        self.population.enqueue(url.clone(), epoch);
        Ok(())
    }

    async fn delete_by_short_code(&self, code: &ShortCode) -> Result<()> {
        trace!(code = %code, "Deleting URL record");
        let existed = self.store.delete_by_short_code(code).await?;
        // Population tasks started before this point must not bring it back.
        self.population.revoke(code);

        // Invalidate even when the store had nothing, in case a stale entry
        // outlived an earlier delete.
        self.cache.delete(code).await?;

        if !existed {
            debug!(code = %code, "Nothing to delete");
            return Err(ShortenerError::NotFound(code.to_string()));
        }
        debug!(code = %code, "Deleted URL record");
        Ok(())
    }

    async fn update_original_url(
        &self,
        code: &ShortCode,
        original_url: &str,
    ) -> Result<ShortenedUrl> {
        trace!(code = %code, "Updating URL record");
        let epoch = self.population.epoch(code);
        let Some(updated) = self.store.update_original_url(code, original_url).await? else {
            return Err(ShortenerError::NotFound(code.to_string()));
        };
        debug!(code = %code, "Updated URL record");

        self.population.enqueue(updated.clone(), epoch);
        Ok(updated)
    }

    async fn list_all(&self) -> Result<Vec<ShortenedUrl>> {
        Ok(self.store.list_all().await?)
    }
}
