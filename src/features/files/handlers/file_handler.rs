use axum::{extract::State, Json};
use std::sync::Arc;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::{AppJson, AppPath, AppQuery};
use crate::features::files::dtos::{
    DeleteFileResponseDto, DeleteFilesDto, FileListQuery, FileResponseDto, FileStatisticsDto,
};
use crate::features::files::services::FileService;
use crate::shared::types::{ApiResponse, Meta, PaginationQuery};

/// List upload records (paginated)
#[utoipa::path(
    get,
    path = "/api/files",
    tag = "files",
    params(FileListQuery, PaginationQuery),
    responses(
        (status = 200, description = "Page of upload records", body = ApiResponse<Vec<FileResponseDto>>),
        (status = 400, description = "Invalid query parameters")
    )
)]
pub async fn list_files(
    State(service): State<Arc<FileService>>,
    AppQuery(query): AppQuery<FileListQuery>,
    AppQuery(pagination): AppQuery<PaginationQuery>,
) -> Result<Json<ApiResponse<Vec<FileResponseDto>>>> {
    let (items, total) = service.list(&query, &pagination).await?;

    Ok(Json(ApiResponse::success(
        Some(items),
        None,
        Some(Meta { total }),
    )))
}

/// Get an upload record by ID
#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = i64, Path, description = "Upload record ID")
    ),
    responses(
        (status = 200, description = "Upload record found", body = ApiResponse<FileResponseDto>),
        (status = 404, description = "Upload record not found")
    )
)]
pub async fn get_file(
    State(service): State<Arc<FileService>>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<ApiResponse<FileResponseDto>>> {
    let file = service.get(id).await?;
    Ok(Json(ApiResponse::success(Some(file), None, None)))
}

/// Count upload records per state
#[utoipa::path(
    get,
    path = "/api/files/statistics",
    tag = "files",
    responses(
        (status = 200, description = "Record counts", body = ApiResponse<FileStatisticsDto>)
    )
)]
pub async fn get_statistics(
    State(service): State<Arc<FileService>>,
) -> Result<Json<ApiResponse<FileStatisticsDto>>> {
    let stats = service.statistics().await?;
    Ok(Json(ApiResponse::success(Some(stats), None, None)))
}

/// Delete an upload record
#[utoipa::path(
    delete,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = i64, Path, description = "Upload record ID")
    ),
    responses(
        (status = 200, description = "Upload record deleted", body = ApiResponse<DeleteFileResponseDto>),
        (status = 404, description = "Upload record not found")
    )
)]
pub async fn delete_file(
    State(service): State<Arc<FileService>>,
    AppPath(id): AppPath<i64>,
) -> Result<Json<ApiResponse<DeleteFileResponseDto>>> {
    service.delete(id).await?;

    Ok(Json(ApiResponse::success(
        Some(DeleteFileResponseDto { deleted: 1 }),
        Some("File record deleted successfully".to_string()),
        None,
    )))
}

/// Delete several upload records
///
/// Nothing is deleted when any of the ids does not exist.
#[utoipa::path(
    delete,
    path = "/api/files/batch",
    tag = "files",
    request_body = DeleteFilesDto,
    responses(
        (status = 200, description = "Upload records deleted", body = ApiResponse<DeleteFileResponseDto>),
        (status = 400, description = "Empty id list"),
        (status = 404, description = "One or more records not found")
    )
)]
pub async fn delete_files(
    State(service): State<Arc<FileService>>,
    AppJson(dto): AppJson<DeleteFilesDto>,
) -> Result<Json<ApiResponse<DeleteFileResponseDto>>> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    let deleted = service.delete_batch(&dto.ids).await?;

    Ok(Json(ApiResponse::success(
        Some(DeleteFileResponseDto { deleted }),
        Some("File records deleted successfully".to_string()),
        None,
    )))
}
