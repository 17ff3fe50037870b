use std::sync::Arc;
use tracing::info;

use crate::core::error::{AppError, Result};
use crate::features::files::dtos::{FileListQuery, FileResponseDto, FileStatisticsDto};
use crate::features::files::store::UploadRecordStore;
use crate::shared::types::PaginationQuery;

/// Read and housekeeping operations over upload records
pub struct FileService {
    store: Arc<dyn UploadRecordStore>,
}

impl FileService {
    pub fn new(store: Arc<dyn UploadRecordStore>) -> Self {
        Self { store }
    }

    pub async fn get(&self, id: i64) -> Result<FileResponseDto> {
        let record = self.store.get(id).await?;
        Ok(record.into())
    }

    /// One page of records plus the total number of matches
    pub async fn list(
        &self,
        query: &FileListQuery,
        pagination: &PaginationQuery,
    ) -> Result<(Vec<FileResponseDto>, i64)> {
        let (records, total) = self
            .store
            .list(&query.filter(), pagination.offset(), pagination.limit())
            .await?;

        Ok((records.into_iter().map(Into::into).collect(), total))
    }

    pub async fn statistics(&self) -> Result<FileStatisticsDto> {
        let counts = self.store.count_by_state().await?;
        Ok(counts.into())
    }

    /// Remove the record only; the stored object is left in the bucket
    pub async fn delete(&self, id: i64) -> Result<()> {
        self.store.delete(id).await?;
        info!("Upload record deleted: id={}", id);
        Ok(())
    }

    /// Delete all of `ids`, or none of them if any is missing
    pub async fn delete_batch(&self, ids: &[i64]) -> Result<u64> {
        if ids.is_empty() {
            return Err(AppError::Validation(
                "At least one id is required".to_string(),
            ));
        }

        let deleted = self.store.delete_many(ids).await?;
        info!("Upload records deleted: count={}", deleted);
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::models::{NewUploadRecord, RecordUpdate, UploadState};
    use crate::features::files::store::MemoryUploadRecordStore;

    async fn seeded_service() -> (FileService, Arc<MemoryUploadRecordStore>) {
        let store = Arc::new(MemoryUploadRecordStore::new());
        for (name, size) in [("report.pdf", 2048), ("photo.png", 512), ("notes.txt", 64)] {
            store
                .create(NewUploadRecord {
                    original_name: name.to_string(),
                    storage_key: format!("uploads/{}", name),
                    declared_size: size,
                    content_type: None,
                    extension: None,
                    note: None,
                })
                .await
                .unwrap();
        }
        store
            .update(
                2,
                RecordUpdate::Fail {
                    error_message: Some("aborted".to_string()),
                },
            )
            .await
            .unwrap();

        (FileService::new(store.clone()), store)
    }

    #[tokio::test]
    async fn test_statistics_counts_each_state() {
        let (service, _) = seeded_service().await;

        let stats = service.statistics().await.unwrap();
        assert_eq!(stats.total_count, 3);
        assert_eq!(stats.status_counts.pending, 2);
        assert_eq!(stats.status_counts.failed, 1);
        assert_eq!(stats.status_counts.success, 0);
    }

    #[tokio::test]
    async fn test_get_missing_record_is_not_found() {
        let (service, _) = seeded_service().await;
        assert!(matches!(service.get(99).await, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_by_state() {
        let (service, _) = seeded_service().await;
        let query: FileListQuery =
            serde_json::from_value(serde_json::json!({ "status": "failed" })).unwrap();

        let (items, total) = service
            .list(&query, &PaginationQuery::default())
            .await
            .unwrap();
        assert_eq!(total, 1);
        assert_eq!(items[0].original_name, "photo.png");
        assert_eq!(items[0].status, UploadState::Failed);
    }

    #[tokio::test]
    async fn test_delete_batch_rejects_empty_and_missing_ids() {
        let (service, store) = seeded_service().await;

        assert!(matches!(
            service.delete_batch(&[]).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.delete_batch(&[1, 42]).await,
            Err(AppError::NotFound(_))
        ));
        assert!(store.get(1).await.is_ok());

        assert_eq!(service.delete_batch(&[1, 3]).await.unwrap(), 2);
        assert_eq!(service.statistics().await.unwrap().total_count, 1);
    }
}
