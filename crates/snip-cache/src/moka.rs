use async_trait::async_trait;
use moka::future::Cache;
use moka::Expiry;
use snip_core::{CacheError, ShortCode, ShortenedUrl, UrlCache};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

/// Type alias for cache results.
pub type Result<T> = std::result::Result<T, CacheError>;

const DEFAULT_MAX_CAPACITY: u64 = 10_000;

/// A serialized record together with the TTL it was stored with.
#[derive(Debug, Clone)]
struct CachedValue {
    json: Arc<str>,
    ttl: Option<Duration>,
}

/// Expires each entry after the TTL given to its own `put`.
struct PerEntryTtl;

impl Expiry<String, CachedValue> for PerEntryTtl {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CachedValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CachedValue,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }
}

/// An in-process implementation of [`UrlCache`] using Moka.
///
/// Records are held as JSON strings, the same shape the Redis cache stores,
/// so both backends round-trip identically. Every entry carries its own TTL
/// and reads never extend it. Suitable for single-node deployments and tests.
#[derive(Debug, Clone)]
pub struct MokaUrlCache {
    cache: Cache<String, CachedValue>,
}

impl MokaUrlCache {
    /// Creates a new Moka URL cache holding at most 10,000 entries.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_MAX_CAPACITY)
    }

    /// Creates a new Moka URL cache with a custom maximum capacity.
    pub fn with_capacity(max_capacity: u64) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_capacity)
            .expire_after(PerEntryTtl)
            .build();
        Self { cache }
    }
}

impl Default for MokaUrlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlCache for MokaUrlCache {
    async fn get(&self, code: &ShortCode) -> Result<Option<ShortenedUrl>> {
        trace!(code = %code, "Fetching URL record from Moka cache");

        let Some(cached) = self.cache.get(code.as_str()).await else {
            trace!(code = %code, "Cache miss in Moka");
            return Ok(None);
        };

        debug!(code = %code, "Cache hit in Moka");
        serde_json::from_str::<ShortenedUrl>(&cached.json)
            .map(Some)
            .map_err(|e| {
                warn!(code = %code, error = %e, "Failed to deserialize cached record");
                CacheError::InvalidData(format!("invalid cached value for key '{code}': {e}"))
            })
    }

    async fn put(&self, code: &ShortCode, value: &ShortenedUrl, ttl: Duration) -> Result<()> {
        trace!(code = %code, ttl_secs = ttl.as_secs(), "Storing URL record in Moka cache");

        let json = serde_json::to_string(value).map_err(|e| {
            warn!(code = %code, error = %e, "Failed to serialize record for caching");
            CacheError::Serialization(format!("failed to serialize cache value: {e}"))
        })?;

        let value = CachedValue {
            json: Arc::from(json),
            ttl: (!ttl.is_zero()).then_some(ttl),
        };
        self.cache.insert(code.as_str().to_string(), value).await;
        debug!(code = %code, "Cached record in Moka");
        Ok(())
    }

    async fn exists(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.cache.get(code.as_str()).await.is_some())
    }

    async fn delete(&self, code: &ShortCode) -> Result<()> {
        trace!(code = %code, "Removing URL record from Moka cache");
        self.cache.invalidate(code.as_str()).await;
        debug!(code = %code, "Removed record from Moka cache (if present)");
        Ok(())
    }

    async fn flush(&self) -> Result<()> {
        self.cache.invalidate_all();
        debug!("Flushed Moka cache");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn record(c: &str, url: &str) -> ShortenedUrl {
        ShortenedUrl::new(code(c), url)
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn put_and_get() {
        let cache = MokaUrlCache::new();
        let value = record("abc123", "https://example.com");

        cache.put(&code("abc123"), &value, HOUR).await.unwrap();

        let result = cache.get(&code("abc123")).await.unwrap();
        assert_eq!(result, Some(value));
    }

    #[tokio::test]
    async fn get_missing_is_none() {
        let cache = MokaUrlCache::new();
        assert!(cache.get(&code("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_drops_display_field() {
        let cache = MokaUrlCache::new();
        let mut value = record("abc123", "https://example.com");
        value.attach_public_url("http://localhost:8080").unwrap();

        cache.put(&code("abc123"), &value, HOUR).await.unwrap();

        let cached = cache.get(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(cached.shortened_url, None);
        assert_eq!(cached.original_url, "https://example.com");
    }

    #[tokio::test]
    async fn exists_checks() {
        let cache = MokaUrlCache::new();
        assert!(!cache.exists(&code("abc123")).await.unwrap());

        cache
            .put(&code("abc123"), &record("abc123", "https://example.com"), HOUR)
            .await
            .unwrap();
        assert!(cache.exists(&code("abc123")).await.unwrap());
    }

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let cache = MokaUrlCache::new();
        cache
            .put(
                &code("abc123"),
                &record("abc123", "https://example.com"),
                Duration::from_secs(1),
            )
            .await
            .unwrap();
        assert!(cache.exists(&code("abc123")).await.unwrap());

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(!cache.exists(&code("abc123")).await.unwrap());
        assert!(cache.get(&code("abc123")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn ttls_are_per_entry() {
        let cache = MokaUrlCache::new();
        cache
            .put(&code("short"), &record("short", "https://a.example"), Duration::from_secs(1))
            .await
            .unwrap();
        cache
            .put(&code("long"), &record("long", "https://b.example"), HOUR)
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(1500)).await;

        assert!(!cache.exists(&code("short")).await.unwrap());
        assert!(cache.exists(&code("long")).await.unwrap());
    }

    #[tokio::test]
    async fn zero_ttl_never_expires() {
        let cache = MokaUrlCache::new();
        cache
            .put(&code("abc123"), &record("abc123", "https://example.com"), Duration::ZERO)
            .await
            .unwrap();
        assert!(cache.exists(&code("abc123")).await.unwrap());
    }

    #[tokio::test]
    async fn put_overwrites_value() {
        let cache = MokaUrlCache::new();
        let c = code("abc123");
        cache.put(&c, &record("abc123", "https://old.example"), HOUR).await.unwrap();
        cache.put(&c, &record("abc123", "https://new.example"), HOUR).await.unwrap();

        let cached = cache.get(&c).await.unwrap().unwrap();
        assert_eq!(cached.original_url, "https://new.example");
    }

    #[tokio::test]
    async fn delete_is_idempotent() {
        let cache = MokaUrlCache::new();
        let c = code("abc123");
        cache.put(&c, &record("abc123", "https://example.com"), HOUR).await.unwrap();

        cache.delete(&c).await.unwrap();
        cache.delete(&c).await.unwrap();

        assert!(cache.get(&c).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn replace_overwrites_stale_entry() {
        let cache = MokaUrlCache::new();
        let c = code("abc123");
        cache.put(&c, &record("abc123", "https://old.example"), HOUR).await.unwrap();

        cache
            .replace(&c, &record("abc123", "https://new.example"), HOUR)
            .await
            .unwrap();

        let cached = cache.get(&c).await.unwrap().unwrap();
        assert_eq!(cached.original_url, "https://new.example");
    }

    #[tokio::test]
    async fn flush_clears_everything() {
        let cache = MokaUrlCache::new();
        for c in ["one", "two", "three"] {
            cache.put(&code(c), &record(c, "https://example.com"), HOUR).await.unwrap();
        }

        cache.flush().await.unwrap();

        for c in ["one", "two", "three"] {
            assert!(!cache.exists(&code(c)).await.unwrap());
        }
    }
}
