use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::features::files::models::{NewUploadRecord, RecordUpdate, UploadRecord, UploadState};
use crate::features::files::store::{
    unique_ids, RecordFilter, SortDirection, SortField, StateCounts, StoreError, StoreResult,
    UploadRecordStore,
};

const RECORD_COLUMNS: &str = "id, original_name, storage_key, declared_size, actual_size, \
     content_type, extension, access_url, state, etag, error_message, note, created_at, updated_at";

/// Postgres-backed store over the `upload_records` table
pub struct PgUploadRecordStore {
    pool: PgPool,
}

impl PgUploadRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Map a unique violation on `storage_key` (PostgreSQL error code 23505)
fn handle_insert_error(e: sqlx::Error, storage_key: &str) -> StoreError {
    if let sqlx::Error::Database(db_err) = &e {
        if db_err.code() == Some(std::borrow::Cow::Borrowed("23505")) {
            return StoreError::DuplicateKey(storage_key.to_string());
        }
    }
    StoreError::Database(e)
}

fn sort_column(field: SortField) -> &'static str {
    match field {
        SortField::CreatedAt => "created_at",
        SortField::UpdatedAt => "updated_at",
        SortField::FileSize => "declared_size",
        SortField::OriginalName => "original_name",
    }
}

fn sort_keyword(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}

/// Escape LIKE wildcards so user input matches literally
fn like_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &RecordFilter) {
    builder.push(" WHERE TRUE");
    if let Some(name) = filter.original_name.as_deref() {
        builder
            .push(" AND original_name ILIKE ")
            .push_bind(like_pattern(name));
    }
    if let Some(state) = filter.state {
        builder.push(" AND state = ").push_bind(state);
    }
}

#[async_trait]
impl UploadRecordStore for PgUploadRecordStore {
    async fn create(&self, record: NewUploadRecord) -> StoreResult<UploadRecord> {
        let query = format!(
            r#"
            INSERT INTO upload_records
                (original_name, storage_key, declared_size, content_type, extension, note, state)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {RECORD_COLUMNS}
            "#
        );

        sqlx::query_as::<_, UploadRecord>(&query)
            .bind(&record.original_name)
            .bind(&record.storage_key)
            .bind(record.declared_size)
            .bind(&record.content_type)
            .bind(&record.extension)
            .bind(&record.note)
            .bind(UploadState::Pending)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| handle_insert_error(e, &record.storage_key))
    }

    async fn get(&self, id: i64) -> StoreResult<UploadRecord> {
        let query = format!("SELECT {RECORD_COLUMNS} FROM upload_records WHERE id = $1");

        sqlx::query_as::<_, UploadRecord>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(StoreError::NotFound(id))
    }

    async fn update(&self, id: i64, update: RecordUpdate) -> StoreResult<UploadRecord> {
        // The state predicate is re-checked after the row lock is taken, so
        // only one of several racing callbacks can match a Pending row.
        let query = format!(
            r#"
            UPDATE upload_records
            SET state = $2,
                actual_size = COALESCE($3, actual_size),
                etag = COALESCE($4, etag),
                access_url = $5,
                error_message = $6,
                updated_at = NOW()
            WHERE id = $1 AND state = $7
            RETURNING {RECORD_COLUMNS}
            "#
        );

        let updated = sqlx::query_as::<_, UploadRecord>(&query)
            .bind(id)
            .bind(update.target_state())
            .bind(update.actual_size())
            .bind(update.etag())
            .bind(update.access_url())
            .bind(update.error_message())
            .bind(UploadState::Pending)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(record) = updated {
            return Ok(record);
        }

        let current: Option<UploadState> =
            sqlx::query_scalar("SELECT state FROM upload_records WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        match current {
            Some(state) => Err(StoreError::InvalidTransition { id, state }),
            None => Err(StoreError::NotFound(id)),
        }
    }

    async fn list(
        &self,
        filter: &RecordFilter,
        offset: i64,
        limit: i64,
    ) -> StoreResult<(Vec<UploadRecord>, i64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM upload_records");
        push_filter(&mut count, filter);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut select =
            QueryBuilder::<Postgres>::new(format!("SELECT {RECORD_COLUMNS} FROM upload_records"));
        push_filter(&mut select, filter);
        let direction = sort_keyword(filter.sort_dir);
        select
            .push(format!(
                " ORDER BY {} {}, id {}",
                sort_column(filter.sort_by),
                direction,
                direction
            ))
            .push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let records = select
            .build_query_as::<UploadRecord>()
            .fetch_all(&self.pool)
            .await?;

        Ok((records, total))
    }

    async fn count_by_state(&self) -> StoreResult<StateCounts> {
        let rows: Vec<(UploadState, i64)> =
            sqlx::query_as("SELECT state, COUNT(*) FROM upload_records GROUP BY state")
                .fetch_all(&self.pool)
                .await?;

        let mut counts = StateCounts::default();
        for (state, count) in rows {
            counts.add(state, count);
        }
        Ok(counts)
    }

    async fn delete(&self, id: i64) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM upload_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    async fn delete_many(&self, ids: &[i64]) -> StoreResult<u64> {
        let ids = unique_ids(ids);
        let mut tx = self.pool.begin().await?;

        let found: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM upload_records WHERE id = ANY($1) FOR UPDATE")
                .bind(&ids)
                .fetch_all(&mut *tx)
                .await?;

        let missing: Vec<i64> = ids
            .iter()
            .copied()
            .filter(|id| !found.contains(id))
            .collect();
        if !missing.is_empty() {
            tx.rollback().await?;
            return Err(StoreError::MissingIds(missing));
        }

        let result = sqlx::query("DELETE FROM upload_records WHERE id = ANY($1)")
            .bind(&ids)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("50%_off"), "%50\\%\\_off%");
        assert_eq!(like_pattern("report"), "%report%");
    }

    #[test]
    fn test_filter_sql() {
        let filter = RecordFilter {
            original_name: Some("a".to_string()),
            state: Some(UploadState::Failed),
            ..Default::default()
        };
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM upload_records");
        push_filter(&mut builder, &filter);

        assert_eq!(
            builder.sql(),
            "SELECT COUNT(*) FROM upload_records WHERE TRUE AND original_name ILIKE $1 AND state = $2"
        );
    }

    #[test]
    fn test_sort_mapping() {
        assert_eq!(sort_column(SortField::FileSize), "declared_size");
        assert_eq!(sort_keyword(SortDirection::Desc), "DESC");
    }
}
