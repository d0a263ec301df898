//! Axum route handlers for stored resumes and the Google Drive integration.

use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    Json,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::resume::ResumeDocument;
use crate::persistence::{
    DeleteResumeRequest, SaveResumeRequest, SaveToDriveRequest, SavedResume, SavedToDrive,
    UploadResumeRequest,
};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerQuery {
    pub owner_user_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteQuery {
    pub owner_user_id: Option<String>,
    pub storage_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectQuery {
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectResponse {
    pub authorization_url: String,
}

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    /// Set by Google when the user declines consent.
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    pub connected: bool,
    pub user_id: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Resumes
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/resumes?ownerUserId=
pub async fn handle_list_resumes(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<ResumeDocument>>, AppError> {
    let resumes = state
        .gateway
        .list_resumes(query.owner_user_id.as_deref())
        .await?;
    Ok(Json(resumes))
}

/// POST /api/v1/resumes
pub async fn handle_save_resume(
    State(state): State<AppState>,
    Json(request): Json<SaveResumeRequest>,
) -> Result<Json<SavedResume>, AppError> {
    Ok(Json(state.gateway.save_resume(request).await?))
}

/// DELETE /api/v1/resumes/:id?ownerUserId=&storagePath=
pub async fn handle_delete_resume(
    State(state): State<AppState>,
    Path(resume_id): Path<Uuid>,
    Query(query): Query<DeleteQuery>,
) -> Result<StatusCode, AppError> {
    state
        .gateway
        .delete_resume(DeleteResumeRequest {
            owner_user_id: query.owner_user_id,
            resume_id,
            storage_path: query.storage_path,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/resumes/upload
///
/// Multipart form: `file` (PDF or text), `ownerUserId`, optional `title`.
pub async fn handle_upload_resume(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ResumeDocument>, AppError> {
    let mut owner_user_id = None;
    let mut title = None;
    let mut file: Option<(String, Option<String>, Bytes)> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("resume").to_string();
                let mime_type = field.content_type().map(str::to_string);
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid file: {e}")))?;
                file = Some((file_name, mime_type, data));
            }
            "ownerUserId" | "title" => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid field '{name}': {e}")))?;
                if name == "title" {
                    title = Some(value);
                } else {
                    owner_user_id = Some(value);
                }
            }
            _ => {}
        }
    }

    let (file_name, mime_type, bytes) =
        file.ok_or_else(|| AppError::Validation("multipart field 'file' is required".to_string()))?;
    let doc = state
        .gateway
        .upload_resume(UploadResumeRequest {
            owner_user_id,
            file_name,
            mime_type,
            bytes,
            title,
        })
        .await?;
    Ok(Json(doc))
}

// ────────────────────────────────────────────────────────────────────────────
// Google Drive
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/drive/files
pub async fn handle_save_to_drive(
    State(state): State<AppState>,
    Json(request): Json<SaveToDriveRequest>,
) -> Result<Json<SavedToDrive>, AppError> {
    Ok(Json(state.gateway.save_file_to_external_drive(request).await?))
}

/// GET /api/v1/drive/connect?userId=
///
/// Returns the Google consent URL the client should open.
pub async fn handle_drive_connect(
    State(state): State<AppState>,
    Query(query): Query<ConnectQuery>,
) -> Result<Json<ConnectResponse>, AppError> {
    let authorization_url = state
        .gateway
        .authorization_url(query.user_id.as_deref())
        .await?;
    Ok(Json(ConnectResponse { authorization_url }))
}

/// GET /api/v1/drive/oauth/callback?code=&state=
pub async fn handle_oauth_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<Json<CallbackResponse>, AppError> {
    if let Some(error) = query.error {
        return Err(AppError::Unauthenticated(format!(
            "Google authorization was not granted: {error}"
        )));
    }
    let (Some(code), Some(oauth_state)) = (query.code, query.state) else {
        return Err(AppError::Validation(
            "'code' and 'state' query parameters are required".to_string(),
        ));
    };
    let user_id = state
        .gateway
        .complete_authorization(&code, &oauth_state)
        .await?;
    Ok(Json(CallbackResponse {
        connected: true,
        user_id,
    }))
}
