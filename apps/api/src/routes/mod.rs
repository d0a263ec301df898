pub mod health;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};

use crate::operations::handlers as operations;
use crate::persistence::handlers as persistence;
use crate::state::AppState;

/// Resume uploads carry whole PDFs; everything else keeps axum's default limit.
const UPLOAD_BODY_LIMIT: usize = 10 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Operation catalog
        .route("/api/v1/operations", get(operations::handle_list_operations))
        .route("/api/v1/operations/:name", post(operations::handle_execute))
        // Resumes
        .route(
            "/api/v1/resumes",
            get(persistence::handle_list_resumes).post(persistence::handle_save_resume),
        )
        .route(
            "/api/v1/resumes/generate",
            post(operations::handle_generate_resume),
        )
        .route(
            "/api/v1/resumes/upload",
            post(persistence::handle_upload_resume).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
        .route("/api/v1/resumes/:id", delete(persistence::handle_delete_resume))
        // Google Drive
        .route("/api/v1/drive/files", post(persistence::handle_save_to_drive))
        .route("/api/v1/drive/connect", get(persistence::handle_drive_connect))
        .route(
            "/api/v1/drive/oauth/callback",
            get(persistence::handle_oauth_callback),
        )
        .with_state(state)
}
