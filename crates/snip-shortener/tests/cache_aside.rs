use snip_cache::MokaUrlCache;
use snip_core::{ShortCode, UrlCache, UrlStore};
use snip_shortener::{
    CachedRepository, Shortener, ShortenerConfig, ShortenerError, ShortenerService,
};
use snip_storage::InMemoryStore;
use std::sync::Arc;
use std::time::Duration;

type Service = ShortenerService<CachedRepository<InMemoryStore, MokaUrlCache>>;

fn service() -> (Service, Arc<CachedRepository<InMemoryStore, MokaUrlCache>>) {
    let config = ShortenerConfig::builder()
        .public_host("https://sn.ip")
        .cache_ttl(Duration::from_secs(60))
        .build();
    let repository = Arc::new(CachedRepository::new(
        InMemoryStore::new(),
        MokaUrlCache::new(),
        &config,
    ));
    (
        ShortenerService::from_shared(Arc::clone(&repository), &config),
        repository,
    )
}

async fn wait_until_cached(
    repository: &CachedRepository<InMemoryStore, MokaUrlCache>,
    code: &ShortCode,
) {
    awaitility::at_most(Duration::from_secs(5))
        .poll_interval(Duration::from_millis(10))
        .until_async(|| async move { repository.cache().exists(code).await.unwrap() })
        .await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shorten_then_resolve_through_cache() {
    let (service, repository) = service();

    let created = service.shorten_url("https://example.com").await.unwrap();
    assert_eq!(created.short_code.as_str(), "10uu3CTZ0");
    assert_eq!(created.shortened_url.as_deref(), Some("https://sn.ip/10uu3CTZ0"));

    wait_until_cached(&repository, &created.short_code).await;

    // Remove the durable row; a cache hit must still resolve the code.
    repository
        .store()
        .delete_by_short_code(&created.short_code)
        .await
        .unwrap();
    let resolved = service.get_by_short_code(&created.short_code).await.unwrap();
    assert_eq!(resolved.original_url, "https://example.com");
    assert_eq!(resolved.shortened_url.as_deref(), Some("https://sn.ip/10uu3CTZ0"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn read_miss_repopulates_cache() {
    let (service, repository) = service();
    let created = service.shorten_url("https://example.com").await.unwrap();
    wait_until_cached(&repository, &created.short_code).await;

    repository.flush_cache().await.unwrap();
    assert!(!repository.cache().exists(&created.short_code).await.unwrap());

    service.get_by_short_code(&created.short_code).await.unwrap();
    wait_until_cached(&repository, &created.short_code).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn delete_is_not_served_from_cache() {
    let (service, repository) = service();
    let created = service.shorten_url("https://example.com").await.unwrap();
    wait_until_cached(&repository, &created.short_code).await;

    service.delete_shortened_url(&created.short_code).await.unwrap();

    let err = service.get_by_short_code(&created.short_code).await.unwrap_err();
    assert!(matches!(err, ShortenerError::NotFound(_)));

    let err = service.delete_shortened_url(&created.short_code).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn update_refreshes_cached_value() {
    // A single worker applies population tasks in the order they were queued.
    let config = ShortenerConfig::builder()
        .public_host("https://sn.ip")
        .workers(1)
        .build();
    let repository = Arc::new(CachedRepository::new(
        InMemoryStore::new(),
        MokaUrlCache::new(),
        &config,
    ));
    let service = ShortenerService::from_shared(Arc::clone(&repository), &config);

    let created = service.shorten_url("https://example.com").await.unwrap();
    service
        .update_shortened_url(&created.short_code, "https://example.org")
        .await
        .unwrap();

    let repository_ref = &repository;
    let code = &created.short_code;
    awaitility::at_most(Duration::from_secs(5))
        .poll_interval(Duration::from_millis(10))
        .until_async(|| async move {
            repository_ref
                .cache()
                .get(code)
                .await
                .unwrap()
                .is_some_and(|cached| cached.original_url == "https://example.org")
        })
        .await;

    let resolved = service.get_by_short_code(code).await.unwrap();
    assert_eq!(resolved.original_url, "https://example.org");
}
