use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};
use utoipa::ToSchema;

/// Lifecycle state of an upload record, matching the `upload_state` database enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type, ToSchema)]
#[sqlx(type_name = "upload_state", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum UploadState {
    Pending,
    Success,
    Failed,
}

impl UploadState {
    /// Success and Failed admit no further transition
    pub fn is_terminal(self) -> bool {
        !matches!(self, UploadState::Pending)
    }
}

impl std::fmt::Display for UploadState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UploadState::Pending => write!(f, "pending"),
            UploadState::Success => write!(f, "success"),
            UploadState::Failed => write!(f, "failed"),
        }
    }
}

/// Database model for an upload attempt
#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct UploadRecord {
    pub id: i64,
    pub original_name: String,
    pub storage_key: String,
    pub declared_size: i64,
    pub actual_size: Option<i64>,
    pub content_type: Option<String>,
    pub extension: Option<String>,
    pub access_url: Option<String>,
    pub state: UploadState,
    pub etag: Option<String>,
    pub error_message: Option<String>,
    pub note: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when a record is first written; always starts Pending
#[derive(Debug, Clone)]
pub struct NewUploadRecord {
    pub original_name: String,
    pub storage_key: String,
    pub declared_size: i64,
    pub content_type: Option<String>,
    pub extension: Option<String>,
    pub note: Option<String>,
}

/// The only mutations a record ever receives: Pending to a terminal state
#[derive(Debug, Clone, PartialEq)]
pub enum RecordUpdate {
    Complete {
        actual_size: Option<i64>,
        etag: Option<String>,
        access_url: String,
    },
    Fail {
        error_message: Option<String>,
    },
}

impl RecordUpdate {
    pub fn target_state(&self) -> UploadState {
        match self {
            RecordUpdate::Complete { .. } => UploadState::Success,
            RecordUpdate::Fail { .. } => UploadState::Failed,
        }
    }

    pub fn actual_size(&self) -> Option<i64> {
        match self {
            RecordUpdate::Complete { actual_size, .. } => *actual_size,
            RecordUpdate::Fail { .. } => None,
        }
    }

    pub fn etag(&self) -> Option<&str> {
        match self {
            RecordUpdate::Complete { etag, .. } => etag.as_deref(),
            RecordUpdate::Fail { .. } => None,
        }
    }

    pub fn access_url(&self) -> Option<&str> {
        match self {
            RecordUpdate::Complete { access_url, .. } => Some(access_url),
            RecordUpdate::Fail { .. } => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            RecordUpdate::Complete { .. } => None,
            RecordUpdate::Fail { error_message } => error_message.as_deref(),
        }
    }

    /// Apply to an in-memory record; callers check the record is Pending first
    pub fn apply(&self, record: &mut UploadRecord, now: DateTime<Utc>) {
        record.state = self.target_state();
        if let Some(size) = self.actual_size() {
            record.actual_size = Some(size);
        }
        if let Some(etag) = self.etag() {
            record.etag = Some(etag.to_string());
        }
        record.access_url = self.access_url().map(str::to_string);
        record.error_message = self.error_message().map(str::to_string);
        record.updated_at = now;
    }
}
