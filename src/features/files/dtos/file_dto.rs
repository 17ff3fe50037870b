use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::features::files::models::{UploadRecord, UploadState};
use crate::features::files::store::{RecordFilter, SortDirection, SortField, StateCounts};

/// Response DTO for an upload record
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileResponseDto {
    pub id: i64,
    /// Name the client gave the file
    pub original_name: String,
    /// Object key in the bucket
    pub storage_key: String,
    /// Size declared when the upload was authorized
    pub declared_size: i64,
    /// Size reported by a successful callback
    pub actual_size: Option<i64>,
    pub content_type: Option<String>,
    pub extension: Option<String>,
    /// Set only once the upload succeeded
    pub access_url: Option<String>,
    pub status: UploadState,
    pub etag: Option<String>,
    pub error_message: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UploadRecord> for FileResponseDto {
    fn from(record: UploadRecord) -> Self {
        Self {
            id: record.id,
            original_name: record.original_name,
            storage_key: record.storage_key,
            declared_size: record.declared_size,
            actual_size: record.actual_size,
            content_type: record.content_type,
            extension: record.extension,
            access_url: record.access_url,
            status: record.state,
            etag: record.etag,
            error_message: record.error_message,
            note: record.note,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Filter and sort parameters for listing upload records.
///
/// Paging comes from `PaginationQuery`, read from the same query string.
#[derive(Debug, Clone, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct FileListQuery {
    /// Case-insensitive substring of the original file name
    pub original_name: Option<String>,
    /// Filter by lifecycle state
    pub status: Option<UploadState>,
    /// createdAt (default), updatedAt, fileSize or originalName
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub sort_by: SortField,
    /// asc or desc (default)
    #[serde(default)]
    #[param(value_type = Option<String>)]
    pub sort_dir: SortDirection,
}

impl FileListQuery {
    pub fn filter(&self) -> RecordFilter {
        RecordFilter {
            original_name: self
                .original_name
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string),
            state: self.status,
            sort_by: self.sort_by,
            sort_dir: self.sort_dir,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatusCountsDto {
    pub pending: i64,
    pub success: i64,
    pub failed: i64,
}

/// Record counts overall and per state
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FileStatisticsDto {
    pub total_count: i64,
    pub status_counts: StatusCountsDto,
}

impl From<StateCounts> for FileStatisticsDto {
    fn from(counts: StateCounts) -> Self {
        Self {
            total_count: counts.total(),
            status_counts: StatusCountsDto {
                pending: counts.pending,
                success: counts.success,
                failed: counts.failed,
            },
        }
    }
}

/// Response DTO for delete operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteFileResponseDto {
    /// Number of records removed
    pub deleted: u64,
}

/// Request DTO for deleting several records at once
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct DeleteFilesDto {
    /// Every id must exist, otherwise nothing is deleted
    #[validate(length(min = 1, message = "At least one id is required"))]
    pub ids: Vec<i64>,
}
