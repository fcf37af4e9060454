use async_trait::async_trait;
use snip_core::store::Result;
use snip_core::{ShortCode, ShortenedUrl, StoreError, UrlStore};
use sqlx::mysql::MySqlRow;
use sqlx::{MySqlPool, Row};
use tracing::{debug, trace};

const SCHEMA: &str = include_str!("../ddl/mysql/shortened_urls.sql");

/// MySQL implementation of the durable store.
///
/// Rows live in `shortened_urls`; the `uq_shortened_urls_short_code`
/// constraint enforces code uniqueness and surfaces as
/// [`StoreError::DuplicateKey`] on insert.
#[derive(Debug, Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    /// Creates a store from an existing MySQL connection pool.
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Creates a store by opening a new MySQL connection pool.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = MySqlPool::connect(database_url)
            .await
            .map_err(map_sqlx_error)?;
        Ok(Self::new(pool))
    }

    /// Creates the `shortened_urls` table if it does not exist yet.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        debug!("Ensured shortened_urls schema");
        Ok(())
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &MySqlPool {
        &self.pool
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(sqlx::error::DatabaseError::is_unique_violation)
}

fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    let message = err.to_string();

    match err {
        sqlx::Error::PoolTimedOut => StoreError::Timeout(message),
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StoreError::Unavailable(message),
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StoreError::InvalidData(message),
        _ => StoreError::Query(message),
    }
}

fn row_to_url(row: &MySqlRow) -> Result<ShortenedUrl> {
    let short_code: String = row.try_get("short_code").map_err(map_sqlx_error)?;
    let original_url: String = row.try_get("original_url").map_err(map_sqlx_error)?;
    Ok(ShortenedUrl::new(
        ShortCode::new_unchecked(short_code),
        original_url,
    ))
}

#[async_trait]
impl UrlStore for MySqlStore {
    async fn find_by_short_code(&self, code: &ShortCode) -> Result<Option<ShortenedUrl>> {
        trace!(code = %code, "Fetching URL record from MySQL");

        let row = sqlx::query(
            r#"
            SELECT short_code, original_url
            FROM shortened_urls
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_url).transpose()
    }

    async fn insert(&self, url: &ShortenedUrl) -> Result<()> {
        let result = sqlx::query(
            r#"
            INSERT INTO shortened_urls (short_code, original_url)
            VALUES (?, ?)
            "#,
        )
        .bind(url.short_code.as_str())
        .bind(&url.original_url)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(err) if is_unique_violation(&err) => {
                Err(StoreError::DuplicateKey(url.short_code.to_string()))
            }
            Err(err) => Err(map_sqlx_error(err)),
        }
    }

    async fn update_original_url(
        &self,
        code: &ShortCode,
        original_url: &str,
    ) -> Result<Option<ShortenedUrl>> {
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;

        // MySQL reports zero affected rows when the value is unchanged, so
        // existence is decided by reading the row back in the same transaction.
        sqlx::query(
            r#"
            UPDATE shortened_urls
            SET original_url = ?
            WHERE short_code = ?
            "#,
        )
        .bind(original_url)
        .bind(code.as_str())
        .execute(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let row = sqlx::query(
            r#"
            SELECT short_code, original_url
            FROM shortened_urls
            WHERE short_code = ?
            LIMIT 1
            "#,
        )
        .bind(code.as_str())
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit().await.map_err(map_sqlx_error)?;

        row.as_ref().map(row_to_url).transpose()
    }

    async fn delete_by_short_code(&self, code: &ShortCode) -> Result<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM shortened_urls
            WHERE short_code = ?
            "#,
        )
        .bind(code.as_str())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<ShortenedUrl>> {
        let rows = sqlx::query(
            r#"
            SELECT short_code, original_url
            FROM shortened_urls
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        rows.iter().map(row_to_url).collect()
    }
}
