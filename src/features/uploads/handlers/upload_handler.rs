use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::uploads::dtos::{IssueSignatureDto, SignatureResponseDto, UploadCallbackDto};
use crate::features::uploads::services::UploadService;
use crate::shared::types::ApiResponse;

/// Issue a direct-upload authorization
///
/// Returns the POST policy, its signature and the object key the client must
/// upload to. A Pending upload record is created for the key.
#[utoipa::path(
    post,
    path = "/api/uploads/signature",
    request_body = IssueSignatureDto,
    responses(
        (status = 201, description = "Upload authorized", body = ApiResponse<SignatureResponseDto>),
        (status = 400, description = "Validation error, oversized file or disallowed type")
    ),
    tag = "uploads"
)]
pub async fn issue_signature(
    State(service): State<Arc<UploadService>>,
    AppJson(dto): AppJson<IssueSignatureDto>,
) -> Result<(StatusCode, Json<ApiResponse<SignatureResponseDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let response = service.issue_signature(dto).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(response), None, None)),
    ))
}

/// Report the outcome of a direct upload
#[utoipa::path(
    post,
    path = "/api/uploads/callback",
    request_body = UploadCallbackDto,
    responses(
        (status = 200, description = "Outcome recorded"),
        (status = 400, description = "Invalid status, size or storage key"),
        (status = 404, description = "Upload record not found"),
        (status = 409, description = "Upload record already settled")
    ),
    tag = "uploads"
)]
pub async fn upload_callback(
    State(service): State<Arc<UploadService>>,
    AppJson(dto): AppJson<UploadCallbackDto>,
) -> Result<Json<ApiResponse<()>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    service.handle_callback(dto).await?;

    Ok(Json(ApiResponse::success(
        None,
        Some("Upload outcome recorded".to_string()),
        None,
    )))
}
