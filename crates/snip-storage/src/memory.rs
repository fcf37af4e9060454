use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use snip_core::store::Result;
use snip_core::{ShortCode, ShortenedUrl, StoreError, UrlStore};

/// In-memory implementation of [`UrlStore`] using DashMap.
///
/// The map key doubles as the uniqueness constraint on `short_code`: an
/// insert for an occupied key fails with [`StoreError::DuplicateKey`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    storage: DashMap<ShortCode, String>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            storage: DashMap::new(),
        }
    }

    /// Creates a new in-memory store with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            storage: DashMap::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.storage.len()
    }

    pub fn is_empty(&self) -> bool {
        self.storage.is_empty()
    }
}

#[async_trait]
impl UrlStore for InMemoryStore {
    async fn find_by_short_code(&self, code: &ShortCode) -> Result<Option<ShortenedUrl>> {
        Ok(self
            .storage
            .get(code)
            .map(|entry| ShortenedUrl::new(code.clone(), entry.value().clone())))
    }

    async fn insert(&self, url: &ShortenedUrl) -> Result<()> {
        match self.storage.entry(url.short_code.clone()) {
            Entry::Occupied(_) => Err(StoreError::DuplicateKey(url.short_code.to_string())),
            Entry::Vacant(slot) => {
                slot.insert(url.original_url.clone());
                Ok(())
            }
        }
    }

    async fn update_original_url(
        &self,
        code: &ShortCode,
        original_url: &str,
    ) -> Result<Option<ShortenedUrl>> {
        let Some(mut entry) = self.storage.get_mut(code) else {
            return Ok(None);
        };
        *entry = original_url.to_string();
        Ok(Some(ShortenedUrl::new(code.clone(), original_url)))
    }

    async fn delete_by_short_code(&self, code: &ShortCode) -> Result<bool> {
        Ok(self.storage.remove(code).is_some())
    }

    async fn list_all(&self) -> Result<Vec<ShortenedUrl>> {
        let mut urls: Vec<ShortenedUrl> = self
            .storage
            .iter()
            .map(|entry| ShortenedUrl::new(entry.key().clone(), entry.value().clone()))
            .collect();
        urls.sort_by(|a, b| a.short_code.cmp(&b.short_code));
        Ok(urls)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn code(s: &str) -> ShortCode {
        ShortCode::new_unchecked(s)
    }

    fn url(c: &str, original: &str) -> ShortenedUrl {
        ShortenedUrl::new(code(c), original)
    }

    #[tokio::test]
    async fn insert_and_find() {
        let store = InMemoryStore::new();
        store.insert(&url("abc123", "https://example.com")).await.unwrap();

        let found = store.find_by_short_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(found.short_code, code("abc123"));
        assert_eq!(found.original_url, "https://example.com");
        assert_eq!(found.shortened_url, None);
    }

    #[tokio::test]
    async fn find_nonexistent() {
        let store = InMemoryStore::new();
        assert!(store.find_by_short_code(&code("nope")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn insert_duplicate_is_distinguishable() {
        let store = InMemoryStore::new();
        store.insert(&url("abc123", "https://example.com")).await.unwrap();

        let err = store
            .insert(&url("abc123", "https://other.com"))
            .await
            .unwrap_err();
        assert!(err.is_duplicate_key());

        // The original row is untouched.
        let found = store.find_by_short_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(found.original_url, "https://example.com");
    }

    #[tokio::test]
    async fn update_returns_updated_record() {
        let store = InMemoryStore::new();
        store.insert(&url("abc123", "https://old.com")).await.unwrap();

        let updated = store
            .update_original_url(&code("abc123"), "https://new.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.original_url, "https://new.com");

        let found = store.find_by_short_code(&code("abc123")).await.unwrap().unwrap();
        assert_eq!(found.original_url, "https://new.com");
    }

    #[tokio::test]
    async fn update_nonexistent() {
        let store = InMemoryStore::new();
        let updated = store
            .update_original_url(&code("nope"), "https://new.com")
            .await
            .unwrap();
        assert!(updated.is_none());
    }

    #[tokio::test]
    async fn delete_existing_and_missing() {
        let store = InMemoryStore::new();
        store.insert(&url("abc123", "https://example.com")).await.unwrap();

        assert!(store.delete_by_short_code(&code("abc123")).await.unwrap());
        assert!(!store.delete_by_short_code(&code("abc123")).await.unwrap());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn list_all_is_sorted_by_code() {
        let store = InMemoryStore::new();
        for c in ["ccc", "aaa", "bbb"] {
            store.insert(&url(c, "https://example.com")).await.unwrap();
        }

        let codes: Vec<_> = store
            .list_all()
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.short_code.to_string())
            .collect();
        assert_eq!(codes, ["aaa", "bbb", "ccc"]);
    }

    #[tokio::test]
    async fn concurrent_duplicate_inserts_admit_one() {
        let store = Arc::new(InMemoryStore::new());
        let mut handles = vec![];

        for i in 0..10u64 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store
                    .insert(&url("same", &format!("https://example{i}.com")))
                    .await
                    .is_ok()
            }));
        }

        let mut admitted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                admitted += 1;
            }
        }
        assert_eq!(admitted, 1);
        assert_eq!(store.len(), 1);
    }
}
