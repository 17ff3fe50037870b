use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::core::config::UploadConfig;
use crate::core::error::{AppError, Result};
use crate::features::files::models::{NewUploadRecord, RecordUpdate, UploadRecord};
use crate::features::files::store::{StoreError, UploadRecordStore};
use crate::features::uploads::dtos::{IssueSignatureDto, SignatureResponseDto, UploadCallbackDto};
use crate::features::uploads::services::{extension_of, KeyGenerator, UploadPolicy};
use crate::modules::storage::sigv4::SigningError;
use crate::modules::storage::PostPolicySigner;
use crate::shared::constants::{CALLBACK_STATUS_FAILED, CALLBACK_STATUS_SUCCESS};

/// Keys tried per issuance before a collision is reported as an internal error
const KEY_ATTEMPTS: usize = 2;

/// Issues direct-upload authorizations and reconciles their outcomes
pub struct UploadService {
    store: Arc<dyn UploadRecordStore>,
    signer: Arc<PostPolicySigner>,
    policy: UploadPolicy,
    keys: KeyGenerator,
    signature_expire_secs: i64,
    callback_url: Option<String>,
}

impl UploadService {
    pub fn new(
        store: Arc<dyn UploadRecordStore>,
        signer: Arc<PostPolicySigner>,
        config: &UploadConfig,
    ) -> Self {
        Self {
            store,
            signer,
            policy: UploadPolicy::from_config(config),
            keys: KeyGenerator::from_config(config),
            signature_expire_secs: config.signature_expire_secs,
            callback_url: config.callback_url.clone(),
        }
    }

    /// Validate the request, mint an authorization for a fresh key and record
    /// the attempt as Pending.
    ///
    /// Nothing is written unless validation and signing both succeed.
    pub async fn issue_signature(&self, dto: IssueSignatureDto) -> Result<SignatureResponseDto> {
        let file_name = dto.file_name.trim();
        if file_name.is_empty() {
            return Err(AppError::Validation("File name must not be blank".to_string()));
        }

        let declared_extension = dto
            .file_extension
            .as_deref()
            .map(|ext| ext.trim().trim_start_matches('.'))
            .filter(|ext| !ext.is_empty());

        self.policy
            .validate_request(dto.file_size, declared_extension, file_name)?;

        let extension = declared_extension
            .or_else(|| extension_of(file_name))
            .map(str::to_lowercase);

        let lifetime = Duration::try_seconds(self.signature_expire_secs)
            .ok_or(SigningError::ExpiryOutOfRange)?;

        for attempt in 1..=KEY_ATTEMPTS {
            let key = self.keys.generate(file_name);
            let auth = self.signer.mint(
                &key,
                self.policy.max_file_size(),
                lifetime,
                Utc::now(),
            )?;

            let created = self
                .store
                .create(NewUploadRecord {
                    original_name: file_name.to_string(),
                    storage_key: key,
                    declared_size: dto.file_size,
                    content_type: dto.content_type.clone(),
                    extension: extension.clone(),
                    note: dto.note.clone(),
                })
                .await;

            match created {
                Ok(record) => {
                    info!(
                        "Upload authorized: record_id={}, key={}, declared_size={}, expire={}",
                        record.id, record.storage_key, record.declared_size, auth.expire
                    );
                    return Ok(SignatureResponseDto::new(
                        auth,
                        self.callback_url.clone(),
                        record.id,
                    ));
                }
                Err(StoreError::DuplicateKey(key)) => {
                    warn!("Storage key collision on attempt {}: {}", attempt, key);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(AppError::Internal(
            "Could not allocate a unique storage key".to_string(),
        ))
    }

    /// Apply the reported outcome to a Pending record.
    ///
    /// A record that already reached Success or Failed is left untouched and
    /// the callback is rejected as a conflict, whatever it carries.
    pub async fn handle_callback(&self, dto: UploadCallbackDto) -> Result<UploadRecord> {
        let record = self.store.get(dto.record_id).await?;

        if record.state.is_terminal() {
            warn!(
                "Rejected callback for settled record: id={}, state={}",
                record.id, record.state
            );
            return Err(AppError::Conflict(format!(
                "Upload record {} is already {}",
                record.id, record.state
            )));
        }

        let update = self.build_update(&record, dto)?;
        let updated = self.store.update(record.id, update).await?;

        info!(
            "Upload reconciled: record_id={}, state={}, actual_size={:?}",
            updated.id, updated.state, updated.actual_size
        );

        Ok(updated)
    }

    fn build_update(&self, record: &UploadRecord, dto: UploadCallbackDto) -> Result<RecordUpdate> {
        if let Some(key) = dto.storage_key.as_deref() {
            if key != record.storage_key {
                debug!(
                    "Callback storage key mismatch: id={}, expected={}, got={}",
                    record.id, record.storage_key, key
                );
                return Err(AppError::Validation(
                    "Storage key does not match the upload record".to_string(),
                ));
            }
        }

        if dto.actual_file_size.is_some_and(|size| size < 0) {
            return Err(AppError::Validation(
                "Actual file size must not be negative".to_string(),
            ));
        }

        match dto.upload_status {
            CALLBACK_STATUS_SUCCESS => Ok(RecordUpdate::Complete {
                actual_size: dto.actual_file_size,
                etag: dto.etag,
                access_url: self.signer.access_url(&record.storage_key),
            }),
            CALLBACK_STATUS_FAILED => Ok(RecordUpdate::Fail {
                error_message: dto.error_message,
            }),
            other => Err(AppError::Validation(format!(
                "Invalid upload status: {}",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{parse_allowed_file_types, KeyTimezone, StorageConfig};
    use crate::features::files::models::UploadState;
    use crate::features::files::store::{
        MemoryUploadRecordStore, RecordFilter, StateCounts, StoreResult,
    };
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Memory store whose first `collisions` inserts report a taken key
    struct CollidingStore {
        inner: MemoryUploadRecordStore,
        collisions: AtomicUsize,
    }

    impl CollidingStore {
        fn new(collisions: usize) -> Self {
            Self {
                inner: MemoryUploadRecordStore::new(),
                collisions: AtomicUsize::new(collisions),
            }
        }
    }

    #[async_trait]
    impl UploadRecordStore for CollidingStore {
        async fn create(&self, record: NewUploadRecord) -> StoreResult<UploadRecord> {
            let collided = self
                .collisions
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if collided {
                return Err(StoreError::DuplicateKey(record.storage_key));
            }
            self.inner.create(record).await
        }

        async fn get(&self, id: i64) -> StoreResult<UploadRecord> {
            self.inner.get(id).await
        }

        async fn update(&self, id: i64, update: RecordUpdate) -> StoreResult<UploadRecord> {
            self.inner.update(id, update).await
        }

        async fn list(
            &self,
            filter: &RecordFilter,
            offset: i64,
            limit: i64,
        ) -> StoreResult<(Vec<UploadRecord>, i64)> {
            self.inner.list(filter, offset, limit).await
        }

        async fn count_by_state(&self) -> StoreResult<StateCounts> {
            self.inner.count_by_state().await
        }

        async fn delete(&self, id: i64) -> StoreResult<()> {
            self.inner.delete(id).await
        }

        async fn delete_many(&self, ids: &[i64]) -> StoreResult<u64> {
            self.inner.delete_many(ids).await
        }
    }

    fn storage_config() -> StorageConfig {
        StorageConfig {
            endpoint: "http://localhost:9000".to_string(),
            public_endpoint: "http://localhost:9000".to_string(),
            access_key: "AKIDEXAMPLE".to_string(),
            secret_key: "wJalrXUtnFEMI/K7MDENG+bPxRfiCYEXAMPLEKEY".to_string(),
            bucket: "uploads-bucket".to_string(),
            region: "us-east-1".to_string(),
            path_style: true,
            ensure_bucket: false,
            public_read: false,
        }
    }

    fn upload_config(max_file_size: i64, allowed: &str) -> UploadConfig {
        UploadConfig {
            max_file_size,
            allowed_file_types: parse_allowed_file_types(allowed),
            signature_expire_secs: 3600,
            key_prefix: "uploads".to_string(),
            key_timezone: KeyTimezone::Utc,
            callback_url: Some("http://api.local/api/uploads/callback".to_string()),
        }
    }

    fn service(max_file_size: i64, allowed: &str) -> (UploadService, Arc<MemoryUploadRecordStore>) {
        let store = Arc::new(MemoryUploadRecordStore::new());
        let signer = Arc::new(PostPolicySigner::new(&storage_config()).unwrap());
        let service = UploadService::new(
            store.clone(),
            signer,
            &upload_config(max_file_size, allowed),
        );
        (service, store)
    }

    fn colliding_service(collisions: usize) -> (UploadService, Arc<CollidingStore>) {
        let store = Arc::new(CollidingStore::new(collisions));
        let signer = Arc::new(PostPolicySigner::new(&storage_config()).unwrap());
        let service = UploadService::new(store.clone(), signer, &upload_config(10_000, "pdf"));
        (service, store)
    }

    fn report_request() -> IssueSignatureDto {
        IssueSignatureDto {
            file_name: "report.pdf".to_string(),
            file_size: 2048,
            content_type: Some("application/pdf".to_string()),
            file_extension: Some("pdf".to_string()),
            note: None,
        }
    }

    fn callback(record_id: i64, status: i32) -> UploadCallbackDto {
        UploadCallbackDto {
            record_id,
            storage_key: None,
            actual_file_size: None,
            etag: None,
            upload_status: status,
            error_message: None,
        }
    }

    fn assert_key_shape(key: &str) {
        let parts: Vec<&str> = key.split('/').collect();
        assert_eq!(parts.len(), 5, "unexpected key {}", key);
        assert_eq!(parts[0], "uploads");
        assert_eq!(parts[1].len(), 4);
        assert_eq!(parts[2].len(), 2);
        assert_eq!(parts[3].len(), 2);
        assert!(parts[4].ends_with(".pdf"));
    }

    #[tokio::test]
    async fn test_issue_creates_pending_record() {
        let (service, store) = service(10_000, "pdf,png");

        let response = service.issue_signature(report_request()).await.unwrap();

        assert_key_shape(&response.key);
        assert_eq!(response.host, "http://localhost:9000/uploads-bucket");
        assert_eq!(
            response.callback.as_deref(),
            Some("http://api.local/api/uploads/callback")
        );
        assert!(response.expire > Utc::now().timestamp());

        let record = store.get(response.record_id).await.unwrap();
        assert_eq!(record.state, UploadState::Pending);
        assert_eq!(record.storage_key, response.key);
        assert_eq!(record.declared_size, 2048);
        assert_eq!(record.extension.as_deref(), Some("pdf"));
        assert!(record.access_url.is_none());
    }

    #[tokio::test]
    async fn test_oversized_request_creates_nothing() {
        let (service, store) = service(1000, "pdf,png");

        let result = service.issue_signature(report_request()).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(store.count_by_state().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn test_disallowed_extension_creates_nothing() {
        let (service, store) = service(10_000, "png,jpg");

        let result = service.issue_signature(report_request()).await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert_eq!(store.count_by_state().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn test_declared_extension_allows_extensionless_name() {
        let (service, store) = service(10_000, "pdf,png");
        let mut request = report_request();
        request.file_name = "README".to_string();

        let response = service.issue_signature(request).await.unwrap();

        let last = response.key.rsplit('/').next().unwrap();
        assert!(!last.contains('.'), "unexpected key {}", response.key);
        let record = store.get(response.record_id).await.unwrap();
        assert_eq!(record.original_name, "README");
        assert_eq!(record.extension.as_deref(), Some("pdf"));
    }

    #[tokio::test]
    async fn test_key_collision_is_retried_once() {
        let (service, store) = colliding_service(1);

        let response = service.issue_signature(report_request()).await.unwrap();

        assert_key_shape(&response.key);
        let record = store.get(response.record_id).await.unwrap();
        assert_eq!(record.storage_key, response.key);
        assert_eq!(store.count_by_state().await.unwrap().total(), 1);
    }

    #[tokio::test]
    async fn test_repeated_key_collision_is_internal() {
        let (service, store) = colliding_service(usize::MAX);

        let result = service.issue_signature(report_request()).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(store.count_by_state().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn test_unrepresentable_lifetime_is_internal() {
        let store = Arc::new(MemoryUploadRecordStore::new());
        let signer = Arc::new(PostPolicySigner::new(&storage_config()).unwrap());
        let mut config = upload_config(10_000, "");
        config.signature_expire_secs = i64::MAX;
        let service = UploadService::new(store.clone(), signer, &config);

        let result = service.issue_signature(report_request()).await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(store.count_by_state().await.unwrap().total(), 0);
    }

    #[tokio::test]
    async fn test_blank_file_name_is_rejected() {
        let (service, _) = service(10_000, "");
        let mut request = report_request();
        request.file_name = "   ".to_string();

        assert!(matches!(
            service.issue_signature(request).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_issued_keys_are_unique() {
        let (service, _) = service(10_000, "");
        let mut keys = std::collections::HashSet::new();

        for _ in 0..50 {
            let response = service.issue_signature(report_request()).await.unwrap();
            assert!(keys.insert(response.key));
        }
    }

    #[tokio::test]
    async fn test_success_then_second_callback_conflicts() {
        let (service, store) = service(10_000, "pdf,png");
        let issued = service.issue_signature(report_request()).await.unwrap();

        let mut success = callback(issued.record_id, CALLBACK_STATUS_SUCCESS);
        success.actual_file_size = Some(12345);
        let updated = service.handle_callback(success).await.unwrap();

        assert_eq!(updated.state, UploadState::Success);
        assert_eq!(updated.actual_size, Some(12345));
        let expected_url = format!("http://localhost:9000/uploads-bucket/{}", issued.key);
        assert_eq!(updated.access_url.as_deref(), Some(expected_url.as_str()));

        let second = service
            .handle_callback(callback(issued.record_id, CALLBACK_STATUS_FAILED))
            .await;
        assert!(matches!(second, Err(AppError::Conflict(_))));

        let stored = store.get(issued.record_id).await.unwrap();
        assert_eq!(stored, updated);
    }

    #[tokio::test]
    async fn test_failed_callback_keeps_error_message() {
        let (service, _) = service(10_000, "");
        let issued = service.issue_signature(report_request()).await.unwrap();

        let mut failed = callback(issued.record_id, CALLBACK_STATUS_FAILED);
        failed.error_message = Some("network error".to_string());
        let updated = service.handle_callback(failed).await.unwrap();

        assert_eq!(updated.state, UploadState::Failed);
        assert!(updated.access_url.is_none());
        assert_eq!(updated.error_message.as_deref(), Some("network error"));
    }

    #[tokio::test]
    async fn test_callback_rejections() {
        let (service, store) = service(10_000, "");
        let issued = service.issue_signature(report_request()).await.unwrap();

        assert!(matches!(
            service.handle_callback(callback(999, CALLBACK_STATUS_SUCCESS)).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            service.handle_callback(callback(issued.record_id, 3)).await,
            Err(AppError::Validation(_))
        ));

        let mut wrong_key = callback(issued.record_id, CALLBACK_STATUS_SUCCESS);
        wrong_key.storage_key = Some("uploads/other.pdf".to_string());
        assert!(matches!(
            service.handle_callback(wrong_key).await,
            Err(AppError::Validation(_))
        ));

        assert_eq!(
            store.get(issued.record_id).await.unwrap().state,
            UploadState::Pending
        );
    }
}
