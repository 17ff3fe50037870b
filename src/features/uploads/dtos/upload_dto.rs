use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::modules::storage::UploadAuthorization;

/// Request DTO for issuing an upload authorization
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssueSignatureDto {
    /// Original file name (required)
    #[validate(length(min = 1, max = 255, message = "File name must be 1-255 characters"))]
    pub file_name: String,

    /// Declared size in bytes
    #[validate(range(min = 0, message = "File size must not be negative"))]
    pub file_size: i64,

    #[validate(length(max = 255, message = "Content type must not exceed 255 characters"))]
    pub content_type: Option<String>,

    /// Extension without the dot, e.g. "pdf"
    #[validate(length(max = 32, message = "File extension must not exceed 32 characters"))]
    pub file_extension: Option<String>,

    #[validate(length(max = 500, message = "Note must not exceed 500 characters"))]
    pub note: Option<String>,
}

/// Form fields for a direct browser POST to storage
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SignatureResponseDto {
    pub access_key_id: String,
    /// Base64-encoded POST policy
    pub policy: String,
    /// Hex signature over `policy`
    pub signature: String,
    /// Value for the `x-amz-algorithm` form field
    pub algorithm: String,
    /// Value for the `x-amz-credential` form field
    pub credential: String,
    /// Value for the `x-amz-date` form field
    pub date: String,
    /// URL to POST the form to
    pub host: String,
    /// Object key the upload must use
    pub key: String,
    /// Expiry, epoch seconds
    pub expire: i64,
    /// Where the outcome should be reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback: Option<String>,
    pub record_id: i64,
}

impl SignatureResponseDto {
    pub fn new(auth: UploadAuthorization, callback: Option<String>, record_id: i64) -> Self {
        Self {
            access_key_id: auth.access_key_id,
            policy: auth.policy,
            signature: auth.signature,
            algorithm: auth.algorithm,
            credential: auth.credential,
            date: auth.date,
            host: auth.host,
            key: auth.key,
            expire: auth.expire,
            callback,
            record_id,
        }
    }
}

/// Upload outcome reported after the direct upload finished or failed
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadCallbackDto {
    pub record_id: i64,

    /// When present, must equal the record's storage key
    pub storage_key: Option<String>,

    #[validate(range(min = 0, message = "Actual file size must not be negative"))]
    pub actual_file_size: Option<i64>,

    #[validate(length(max = 255, message = "ETag must not exceed 255 characters"))]
    pub etag: Option<String>,

    /// 1 = success, 2 = failed
    pub upload_status: i32,

    #[validate(length(max = 2000, message = "Error message must not exceed 2000 characters"))]
    pub error_message: Option<String>,
}
