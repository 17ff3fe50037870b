use axum::{
    routing::{delete, get},
    Router,
};
use std::sync::Arc;

use crate::features::files::handlers::{
    delete_file, delete_files, get_file, get_statistics, list_files,
};
use crate::features::files::services::FileService;

/// Create routes for the files feature
pub fn routes(file_service: Arc<FileService>) -> Router {
    Router::new()
        .route("/api/files", get(list_files))
        .route("/api/files/statistics", get(get_statistics))
        .route("/api/files/batch", delete(delete_files))
        .route("/api/files/{id}", get(get_file).delete(delete_file))
        .with_state(file_service)
}
