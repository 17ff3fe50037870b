//! Durable storage for upload records
//!
//! The store owns `created_at`/`updated_at` and enforces the two invariants
//! the upload lifecycle depends on: storage keys are unique, and a record
//! leaves `Pending` at most once.

mod memory_store;
mod pg_store;

pub use memory_store::MemoryUploadRecordStore;
pub use pg_store::PgUploadRecordStore;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::core::error::AppError;
use crate::features::files::models::{NewUploadRecord, RecordUpdate, UploadRecord, UploadState};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Upload record {0} not found")]
    NotFound(i64),

    #[error("Upload records not found: {0:?}")]
    MissingIds(Vec<i64>),

    #[error("Storage key '{0}' is already in use")]
    DuplicateKey(String),

    #[error("Upload record {id} is already {state}")]
    InvalidTransition { id: i64, state: UploadState },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) | StoreError::MissingIds(_) => AppError::NotFound(e.to_string()),
            StoreError::DuplicateKey(_) | StoreError::InvalidTransition { .. } => {
                AppError::Conflict(e.to_string())
            }
            StoreError::Database(e) => AppError::Database(e),
        }
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    FileSize,
    OriginalName,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Listing criteria
#[derive(Debug, Clone, Default)]
pub struct RecordFilter {
    /// Case-insensitive substring of the original file name
    pub original_name: Option<String>,
    pub state: Option<UploadState>,
    pub sort_by: SortField,
    pub sort_dir: SortDirection,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCounts {
    pub pending: i64,
    pub success: i64,
    pub failed: i64,
}

impl StateCounts {
    pub fn total(&self) -> i64 {
        self.pending + self.success + self.failed
    }

    pub fn add(&mut self, state: UploadState, count: i64) {
        match state {
            UploadState::Pending => self.pending += count,
            UploadState::Success => self.success += count,
            UploadState::Failed => self.failed += count,
        }
    }
}

#[async_trait]
pub trait UploadRecordStore: Send + Sync {
    /// Insert a Pending record; `DuplicateKey` if the storage key is taken
    async fn create(&self, record: NewUploadRecord) -> StoreResult<UploadRecord>;

    async fn get(&self, id: i64) -> StoreResult<UploadRecord>;

    /// Atomically move a Pending record to the update's terminal state.
    ///
    /// Exactly one concurrent caller wins; the others get `InvalidTransition`.
    async fn update(&self, id: i64, update: RecordUpdate) -> StoreResult<UploadRecord>;

    /// One page of matching records plus the total match count
    async fn list(
        &self,
        filter: &RecordFilter,
        offset: i64,
        limit: i64,
    ) -> StoreResult<(Vec<UploadRecord>, i64)>;

    async fn count_by_state(&self) -> StoreResult<StateCounts>;

    async fn delete(&self, id: i64) -> StoreResult<()>;

    /// Delete all of `ids` or none of them (`MissingIds`)
    async fn delete_many(&self, ids: &[i64]) -> StoreResult<u64>;
}

/// Sorted, de-duplicated copy of `ids`
pub(crate) fn unique_ids(ids: &[i64]) -> Vec<i64> {
    let mut ids = ids.to_vec();
    ids.sort_unstable();
    ids.dedup();
    ids
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_taxonomy() {
        assert!(matches!(
            AppError::from(StoreError::NotFound(7)),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(StoreError::DuplicateKey("k".into())),
            AppError::Conflict(_)
        ));
        assert!(matches!(
            AppError::from(StoreError::InvalidTransition {
                id: 7,
                state: UploadState::Success
            }),
            AppError::Conflict(_)
        ));
    }

    #[test]
    fn test_state_counts_total() {
        let mut counts = StateCounts::default();
        counts.add(UploadState::Pending, 2);
        counts.add(UploadState::Success, 3);
        counts.add(UploadState::Failed, 1);
        assert_eq!(counts.total(), 6);
    }

    #[test]
    fn test_unique_ids() {
        assert_eq!(unique_ids(&[3, 1, 3, 2, 1]), vec![1, 2, 3]);
    }
}
