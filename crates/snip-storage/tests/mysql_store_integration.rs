//! Requires Docker: run with `cargo test -p snip-storage -- --ignored`.

use std::time::Duration;

use snip_core::{ShortCode, ShortenedUrl, UrlStore};
use snip_storage::MySqlStore;
use snip_test_infra::mysql::{MySqlConfig, MySqlServer};
use sqlx::mysql::MySqlPoolOptions;

struct Fixture {
    _mysql: MySqlServer,
    store: MySqlStore,
}

impl Fixture {
    async fn start() -> Self {
        let mysql = MySqlServer::new(MySqlConfig::builder().build())
            .await
            .expect("start mysql");
        let url = mysql.database_url().await.expect("mysql url");
        let store = MySqlStore::new(connect_with_retry(&url).await);
        store.ensure_schema().await.expect("create schema");

        Self {
            _mysql: mysql,
            store,
        }
    }
}

async fn connect_with_retry(url: &str) -> sqlx::MySqlPool {
    let mut last_error = None;

    for _ in 0..20 {
        match MySqlPoolOptions::new()
            .max_connections(5)
            .connect(url)
            .await
        {
            Ok(pool) => return pool,
            Err(err) => {
                last_error = Some(err);
                tokio::time::sleep(Duration::from_millis(500)).await;
            }
        }
    }

    panic!("failed to connect mysql: {last_error:?}");
}

fn code(value: &str) -> ShortCode {
    ShortCode::new_unchecked(value)
}

fn url(c: &str, original: &str) -> ShortenedUrl {
    ShortenedUrl::new(code(c), original)
}

#[tokio::test]
#[ignore = "requires docker"]
async fn insert_and_find() {
    let fixture = Fixture::start().await;

    fixture
        .store
        .insert(&url("abc123", "https://example.com"))
        .await
        .unwrap();

    let found = fixture
        .store
        .find_by_short_code(&code("abc123"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.original_url, "https://example.com");
    assert!(fixture
        .store
        .find_by_short_code(&code("missing"))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
#[ignore = "requires docker"]
async fn duplicate_insert_maps_to_duplicate_key() {
    let fixture = Fixture::start().await;

    fixture
        .store
        .insert(&url("abc123", "https://example.com"))
        .await
        .unwrap();
    let err = fixture
        .store
        .insert(&url("abc123", "https://other.com"))
        .await
        .unwrap_err();

    assert!(err.is_duplicate_key(), "unexpected error: {err}");
}

#[tokio::test]
#[ignore = "requires docker"]
async fn update_delete_and_list() {
    let fixture = Fixture::start().await;
    let store = &fixture.store;

    store.insert(&url("first", "https://one.example")).await.unwrap();
    store.insert(&url("second", "https://two.example")).await.unwrap();

    let updated = store
        .update_original_url(&code("first"), "https://uno.example")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.original_url, "https://uno.example");

    // Same value again still reports the row as present.
    assert!(store
        .update_original_url(&code("first"), "https://uno.example")
        .await
        .unwrap()
        .is_some());
    assert!(store
        .update_original_url(&code("missing"), "https://x.example")
        .await
        .unwrap()
        .is_none());

    let listed: Vec<_> = store
        .list_all()
        .await
        .unwrap()
        .into_iter()
        .map(|u| (u.short_code.to_string(), u.original_url))
        .collect();
    assert_eq!(
        listed,
        vec![
            ("first".to_string(), "https://uno.example".to_string()),
            ("second".to_string(), "https://two.example".to_string()),
        ]
    );

    assert!(store.delete_by_short_code(&code("first")).await.unwrap());
    assert!(!store.delete_by_short_code(&code("first")).await.unwrap());
    assert_eq!(store.list_all().await.unwrap().len(), 1);
}
