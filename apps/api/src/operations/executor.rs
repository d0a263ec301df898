//! AI Operation Executor: the single pipeline every operation runs through.
//!
//! Flow: validate input → render prompt → one capability call →
//!       validate output → output check → typed result.
//!
//! There is exactly one capability call per execution. Malformed output is
//! reported, never retried or repaired.

use std::sync::Arc;

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::jobs::JobSearchProvider;
use crate::llm_client::{LanguageModel, ModelRequest};
use crate::operations::{OperationError, OperationKind, OperationSpec};

#[derive(Clone)]
pub struct Executor {
    model: Arc<dyn LanguageModel>,
    jobs: Arc<dyn JobSearchProvider>,
}

impl Executor {
    pub fn new(model: Arc<dyn LanguageModel>, jobs: Arc<dyn JobSearchProvider>) -> Self {
        Self { model, jobs }
    }

    /// Runs `spec` on an untyped input. On success the data conforms to
    /// `spec.output` and has passed the spec's output check.
    pub async fn execute(&self, spec: &OperationSpec, input: &Value) -> Result<Value, OperationError> {
        // Step 1: input shape. Never reaches the capability when invalid
        let input = spec.input.validate(input).map_err(|violation| {
            warn!(operation = spec.name, "Rejected input: {violation}");
            OperationError::InvalidInput(violation)
        })?;

        // Steps 2–4: render and call the capability once
        let raw = match &spec.kind {
            OperationKind::Prompted { system, template } => {
                let rendered = template.render(&input)?;
                let request = ModelRequest {
                    system: system.clone(),
                    prompt: rendered.text,
                    attachments: rendered.attachments,
                    output_schema: spec.output.to_json_schema(),
                };
                info!(
                    operation = spec.name,
                    attachments = request.attachments.len(),
                    "Calling LLM"
                );
                self.model.generate(&request).await.map_err(|e| {
                    warn!(operation = spec.name, "LLM call failed: {e}");
                    if e.is_malformed_output() {
                        OperationError::MalformedOutput(e.to_string())
                    } else {
                        OperationError::Provider(e.to_string())
                    }
                })?
            }
            OperationKind::JobSearch => {
                let query = input["query"].as_str().unwrap_or_default();
                let location = input["location"].as_str().unwrap_or_default();
                info!(operation = spec.name, "Searching jobs for {query:?} in {location:?}");
                let jobs = self.jobs.search(query, location).await.map_err(|e| {
                    warn!(operation = spec.name, "Job search failed: {e}");
                    OperationError::Provider(e.to_string())
                })?;
                json!({ "jobs": jobs })
            }
        };

        // Step 5: output shape, all-or-nothing
        let data = spec.output.validate(&raw).map_err(|violation| {
            warn!(operation = spec.name, "Output failed schema validation: {violation}");
            OperationError::MalformedOutput(violation.to_string())
        })?;

        let data = match spec.output_check {
            Some(check) => check(&input, data).map_err(|reason| {
                warn!(operation = spec.name, "Output failed check: {reason}");
                OperationError::MalformedOutput(reason)
            })?,
            None => data,
        };

        info!(operation = spec.name, "Operation succeeded");
        Ok(data)
    }

    /// Typed wrapper around `execute`.
    pub async fn run<I, O>(&self, spec: &OperationSpec, input: &I) -> Result<O, OperationError>
    where
        I: Serialize,
        O: DeserializeOwned,
    {
        let input = serde_json::to_value(input)?;
        let data = self.execute(spec, &input).await?;
        serde_json::from_value(data).map_err(|e| OperationError::MalformedOutput(e.to_string()))
    }
}
