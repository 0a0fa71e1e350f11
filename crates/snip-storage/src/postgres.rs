use crate::delete::ChunkStream;
use async_trait::async_trait;
use snip_core::store::{validate_batch, validate_delete, validate_put};
use snip_core::{BatchCode, BatchItem, OwnedUrl, Result, Store, StoreError, Upsert};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgExecutor, PgPool};
use tracing::{debug, info, trace};

const SCHEMA: &str = include_str!("../ddl/postgres/urls.sql");

const CODE_UNIQUE_INDEX: &str = "urls_shorted_url_uk";

const TABLE_EXISTS: &str = r#"
    SELECT EXISTS (
        SELECT FROM information_schema.tables
        WHERE table_schema = current_schema()
          AND table_name = 'urls'
    )
"#;

// `created_at` takes the transaction timestamp on insert while a conflict
// moves `updated_at` to the wall clock, so the two only match for rows this
// statement created, even when an earlier statement of the same transaction
// inserted the URL.
const UPSERT: &str = r#"
    INSERT INTO urls (original_url, shorted_url, user_id)
    VALUES ($1, $2, $3)
    ON CONFLICT (original_url) WHERE deleted_at IS NULL
    DO UPDATE SET updated_at = clock_timestamp()
    RETURNING (created_at = updated_at) AS is_new, shorted_url
"#;

const SOFT_DELETE: &str = r#"
    UPDATE urls
    SET deleted_at = now()
    WHERE shorted_url = ANY($1)
      AND user_id = $2
      AND deleted_at IS NULL
"#;

/// PostgreSQL implementation of the [`Store`] contract.
///
/// Deduplication relies on a partial unique index over active
/// `original_url` values and an `INSERT ... ON CONFLICT DO UPDATE` whose
/// `RETURNING` clause tells a fresh insert from a hit on an existing row, so
/// no separate existence check is needed. Deletes only set `deleted_at`;
/// codes are never reused.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a store from an existing connection pool.
    ///
    /// The schema is not checked; call [`ensure_schema`](Self::ensure_schema)
    /// when the table may be missing.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool and makes sure the schema exists.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(map_sqlx_error)?;

        let store = Self::new(pool);
        store.ensure_schema().await?;
        Ok(store)
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Creates the `urls` table and its indexes if the table is missing.
    ///
    /// Returns `true` when the schema was created.
    pub async fn ensure_schema(&self) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(TABLE_EXISTS)
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if exists {
            debug!("urls table already exists");
            return Ok(false);
        }

        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        info!("created urls table");
        Ok(true)
    }
}

async fn upsert<'e, E: PgExecutor<'e>>(
    executor: E,
    code: &str,
    original_url: &str,
    owner_id: &str,
) -> Result<Upsert<String>> {
    let result = sqlx::query_as::<_, (bool, String)>(UPSERT)
        .bind(original_url)
        .bind(code)
        .bind(owner_id)
        .fetch_one(executor)
        .await;

    match result {
        Ok((is_new, stored)) => Ok(Upsert::from_conflict(stored, !is_new)),
        Err(err) if is_code_conflict(&err) => Err(StoreError::CodeConflict(code.to_string())),
        Err(err) => Err(map_sqlx_error(err)),
    }
}

fn is_code_conflict(err: &sqlx::Error) -> bool {
    err.as_database_error().is_some_and(|db| {
        db.is_unique_violation() && db.constraint() == Some(CODE_UNIQUE_INDEX)
    })
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

fn to_count(value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| StoreError::InvalidData(format!("negative count {value}")))
}

#[async_trait]
impl Store for PostgresStore {
    async fn put(&self, code: &str, original_url: &str, owner_id: &str) -> Result<Upsert<String>> {
        validate_put(code, original_url, owner_id)?;
        let outcome = upsert(&self.pool, code, original_url, owner_id).await?;
        trace!(code = %outcome.value(), conflict = outcome.is_conflict(), "upserted url");
        Ok(outcome)
    }

    async fn put_batch(
        &self,
        items: &[BatchItem],
        owner_id: &str,
    ) -> Result<Upsert<Vec<BatchCode>>> {
        validate_batch(items, owner_id)?;

        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let mut codes = Vec::with_capacity(items.len());
        let mut conflict = false;

        for item in items {
            let outcome = upsert(&mut *tx, &item.code, &item.original_url, owner_id).await?;
            conflict |= outcome.is_conflict();
            codes.push(BatchCode {
                correlation_id: item.correlation_id.clone(),
                code: outcome.into_inner(),
            });
        }

        // Hitting an existing URL is not a reason to roll back.
        tx.commit().await.map_err(map_sqlx_error)?;

        trace!(items = items.len(), conflict, "upserted url batch");
        Ok(Upsert::from_conflict(codes, conflict))
    }

    async fn get(&self, code: &str) -> Result<String> {
        let row = sqlx::query_as::<_, (String, bool)>(
            r#"
            SELECT original_url, deleted_at IS NOT NULL AS is_deleted
            FROM urls
            WHERE shorted_url = $1
            LIMIT 1
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        match row {
            None => Err(StoreError::NotFound),
            Some((_, true)) => Err(StoreError::Gone),
            Some((original_url, false)) => Ok(original_url),
        }
    }

    async fn get_by_owner(&self, owner_id: &str) -> Result<Vec<OwnedUrl>> {
        let rows = sqlx::query_as::<_, (String, String)>(
            r#"
            SELECT shorted_url, original_url
            FROM urls
            WHERE user_id = $1
              AND deleted_at IS NULL
            ORDER BY id
            "#,
        )
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if rows.is_empty() {
            return Err(StoreError::NotFound);
        }

        Ok(rows
            .into_iter()
            .map(|(code, original_url)| OwnedUrl { code, original_url })
            .collect())
    }

    async fn soft_delete(&self, owner_id: &str, codes: Vec<String>) -> Result<()> {
        validate_delete(owner_id, &codes)?;
        let requested = codes.len();

        // One transaction for every chunk: a failing chunk rolls back all of
        // them when `tx` is dropped.
        let mut tx = self.pool.begin().await.map_err(map_sqlx_error)?;
        let mut chunks = ChunkStream::spawn(codes);
        let mut deleted = 0;

        while let Some(chunk) = chunks.next().await? {
            let result = sqlx::query(SOFT_DELETE)
                .bind(chunk)
                .bind(owner_id)
                .execute(&mut *tx)
                .await
                .map_err(map_sqlx_error)?;
            deleted += result.rows_affected();
        }

        tx.commit().await.map_err(map_sqlx_error)?;

        debug!(owner_id, requested, deleted, "soft-deleted urls");
        Ok(())
    }

    async fn count_records(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM urls")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        to_count(count)
    }

    async fn count_owners(&self) -> Result<u64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(DISTINCT user_id) FROM urls")
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        to_count(count)
    }

    async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        self.pool.close().await;
        info!("closed postgres pool");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_errors_map_to_availability_kinds() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolTimedOut),
            StoreError::Timeout(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::PoolClosed),
            StoreError::Unavailable(_)
        ));
    }

    #[test]
    fn decode_errors_map_to_invalid_data() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::RowNotFound),
            StoreError::InvalidData(_)
        ));
        assert!(matches!(
            map_sqlx_error(sqlx::Error::ColumnNotFound("is_new".to_string())),
            StoreError::InvalidData(_)
        ));
    }

    #[test]
    fn other_errors_map_to_query() {
        assert!(matches!(
            map_sqlx_error(sqlx::Error::Protocol("unexpected message".to_string())),
            StoreError::Query(_)
        ));
    }

    #[test]
    fn non_database_errors_are_not_code_conflicts() {
        assert!(!is_code_conflict(&sqlx::Error::RowNotFound));
    }

    #[test]
    fn negative_counts_are_rejected() {
        assert_eq!(to_count(3).unwrap(), 3);
        assert!(matches!(to_count(-1), Err(StoreError::InvalidData(_))));
    }

    #[test]
    fn schema_declares_both_unique_indexes() {
        assert!(SCHEMA.contains("urls_original_url_active_uk"));
        assert!(SCHEMA.contains(CODE_UNIQUE_INDEX));
    }
}
