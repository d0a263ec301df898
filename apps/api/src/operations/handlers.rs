//! Axum route handlers for the operation catalog.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppError;
use crate::operations::resume::{self, GeneratedResume, ResumeRequest};
use crate::operations::{OperationError, OperationKind, OperationSpec};
use crate::persistence::{require_owner, SaveResumeRequest};
use crate::state::AppState;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationSummary {
    pub name: &'static str,
    pub description: &'static str,
    pub backend: &'static str,
    pub input_schema: Value,
    pub output_schema: Value,
}

impl From<&OperationSpec> for OperationSummary {
    fn from(spec: &OperationSpec) -> Self {
        OperationSummary {
            name: spec.name,
            description: spec.description,
            backend: match spec.kind {
                OperationKind::Prompted { .. } => "llm",
                OperationKind::JobSearch => "job-search",
            },
            input_schema: spec.input.to_json_schema(),
            output_schema: spec.output.to_json_schema(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub operation: &'static str,
    pub data: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveOptions {
    pub owner_user_id: Option<String>,
    pub title: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResumeResponse {
    #[serde(flatten)]
    pub generated: GeneratedResume,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resume_id: Option<Uuid>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// GET /api/v1/operations
///
/// Lists every operation with its input and output JSON Schemas.
pub async fn handle_list_operations(State(state): State<AppState>) -> Json<Vec<OperationSummary>> {
    Json(state.catalog.iter().map(OperationSummary::from).collect())
}

/// POST /api/v1/operations/:name
///
/// Runs any catalog operation on an untyped JSON input.
pub async fn handle_execute(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(input): Json<Value>,
) -> Result<Json<OperationResponse>, AppError> {
    let spec = state.catalog.require(&name)?;
    let data = state.executor.execute(spec, &input).await?;
    Ok(Json(OperationResponse {
        operation: spec.name,
        data,
    }))
}

/// POST /api/v1/resumes/generate
///
/// Body: the `generate-resume` input plus an optional `save: {ownerUserId, title}`.
/// When `save` is given the generated resume is stored for that user.
pub async fn handle_generate_resume(
    State(state): State<AppState>,
    Json(mut body): Json<Value>,
) -> Result<Json<GenerateResumeResponse>, AppError> {
    let spec = state.catalog.require(resume::NAME)?;

    let save = match body.as_object_mut().and_then(|obj| obj.remove("save")) {
        None | Some(Value::Null) => None,
        Some(save) => Some(
            serde_json::from_value::<SaveOptions>(save)
                .map_err(|e| AppError::Validation(format!("Invalid 'save' options: {e}")))?,
        ),
    };
    // Checked before the model call so a request that cannot be stored costs nothing.
    if let Some(save) = &save {
        require_owner(save.owner_user_id.as_deref())?;
    }

    let validated = spec
        .input
        .validate(&body)
        .map_err(OperationError::InvalidInput)?;
    let request: ResumeRequest = serde_json::from_value(validated).map_err(OperationError::from)?;
    let generated: GeneratedResume = state.executor.run(spec, &request).await?;

    let resume_id = match save {
        Some(save) => {
            let title = save
                .title
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| format!("{} resume", request.user_details.full_name));
            let saved = state
                .gateway
                .save_resume(SaveResumeRequest {
                    owner_user_id: save.owner_user_id,
                    title,
                    content: generated.resume.clone(),
                    resume_id: None,
                })
                .await?;
            Some(saved.resume_id)
        }
        None => None,
    };

    Ok(Json(GenerateResumeResponse {
        generated,
        resume_id,
    }))
}
