use utoipa::{Modify, OpenApi};

use crate::features::files::{dtos as files_dtos, handlers as files_handlers, models as files_models};
use crate::features::files::store as files_store;
use crate::features::uploads::{dtos as uploads_dtos, handlers as uploads_handlers};
use crate::shared::types::{ApiResponse, Meta};

#[derive(OpenApi)]
#[openapi(
    paths(
        // Uploads
        uploads_handlers::issue_signature,
        uploads_handlers::upload_callback,
        // Files
        files_handlers::list_files,
        files_handlers::get_file,
        files_handlers::get_statistics,
        files_handlers::delete_file,
        files_handlers::delete_files,
    ),
    components(
        schemas(
            // Shared
            Meta,
            // Uploads
            uploads_dtos::IssueSignatureDto,
            uploads_dtos::SignatureResponseDto,
            uploads_dtos::UploadCallbackDto,
            ApiResponse<uploads_dtos::SignatureResponseDto>,
            // Files
            files_models::UploadState,
            files_store::SortField,
            files_store::SortDirection,
            files_dtos::FileResponseDto,
            files_dtos::FileStatisticsDto,
            files_dtos::StatusCountsDto,
            files_dtos::DeleteFilesDto,
            files_dtos::DeleteFileResponseDto,
            ApiResponse<files_dtos::FileResponseDto>,
            ApiResponse<Vec<files_dtos::FileResponseDto>>,
            ApiResponse<files_dtos::FileStatisticsDto>,
            ApiResponse<files_dtos::DeleteFileResponseDto>,
        )
    ),
    tags(
        (name = "uploads", description = "Direct-to-storage upload authorization and callbacks"),
        (name = "files", description = "Upload record queries and housekeeping"),
    ),
    info(
        title = "Direct Upload Broker API",
        version = "0.1.0",
        description = "Signs direct uploads to object storage and tracks their outcome",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
