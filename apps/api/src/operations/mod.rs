// AI operation contract layer.
// Each operation is a static registration: name, input schema, output schema and
// either a prompt template (LLM-backed) or the job-search provider.
// All LLM calls go through llm_client; no direct Anthropic calls here.

use serde_json::Value;
use thiserror::Error;

use crate::prompt::{Template, TemplateError};
use crate::schema::{Schema, SchemaViolation};

pub mod ats;
pub mod career;
pub mod catalog;
pub mod cover_letter;
pub mod executor;
pub mod handlers;
pub mod interview;
pub mod job_search;
pub mod resume;
pub mod similarity;
pub mod translation;

pub use catalog::Catalog;
pub use executor::Executor;

/// Post-hoc check run on schema-valid output. Receives the validated input and
/// the validated output; returns the (possibly filtered) output or a reason the
/// output is unusable.
pub type OutputCheck = fn(&Value, Value) -> Result<Value, String>;

#[derive(Debug, Error)]
pub enum OperationError {
    #[error("Unknown operation '{0}'")]
    UnknownOperation(String),

    #[error("Invalid input: {0}")]
    InvalidInput(SchemaViolation),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Malformed output: {0}")]
    MalformedOutput(String),

    #[error("Prompt rendering failed: {0}")]
    Render(#[from] TemplateError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("operation '{name}' has an invalid template: {source}")]
    Template {
        name: &'static str,
        #[source]
        source: TemplateError,
    },

    #[error("operation '{0}' is registered twice")]
    Duplicate(&'static str),
}

#[derive(Debug)]
pub enum OperationKind {
    Prompted {
        system: String,
        template: Template,
    },
    JobSearch,
}

/// Immutable once built; lives in the process-wide `Catalog`.
#[derive(Debug)]
pub struct OperationSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub input: Schema,
    pub output: Schema,
    pub kind: OperationKind,
    pub output_check: Option<OutputCheck>,
}

impl OperationSpec {
    /// Registers an LLM-backed operation. Fails if the template does not parse
    /// or references a field the input schema does not declare.
    pub fn prompted(
        name: &'static str,
        description: &'static str,
        input: Schema,
        output: Schema,
        system: impl Into<String>,
        template: &str,
    ) -> Result<Self, CatalogError> {
        let template = Template::parse(template)
            .and_then(|t| t.check(&input).map(|_| t))
            .map_err(|source| CatalogError::Template { name, source })?;
        Ok(Self {
            name,
            description,
            input,
            output,
            kind: OperationKind::Prompted {
                system: system.into(),
                template,
            },
            output_check: None,
        })
    }

    pub fn job_search(
        name: &'static str,
        description: &'static str,
        input: Schema,
        output: Schema,
    ) -> Self {
        Self {
            name,
            description,
            input,
            output,
            kind: OperationKind::JobSearch,
            output_check: None,
        }
    }

    pub fn with_output_check(mut self, check: OutputCheck) -> Self {
        self.output_check = Some(check);
        self
    }
}

/// Checks a score that must be within `[min, max]` or exactly the -1 sentinel.
pub(crate) fn check_score(field: &str, score: f64, min: f64, max: f64) -> Result<(), String> {
    if score == -1.0 || (min..=max).contains(&score) {
        Ok(())
    } else {
        Err(format!(
            "{field} {score} is outside {min}..={max} and is not the -1 sentinel"
        ))
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted capabilities shared by the operation tests.

    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use serde_json::Value;

    use crate::jobs::{JobListing, JobSearchError, JobSearchProvider};
    use crate::llm_client::{LanguageModel, LlmError, ModelRequest};

    pub enum Scripted {
        Reply(Value),
        ApiError,
        Unparseable,
    }

    /// Returns one scripted answer and records every request it receives.
    pub struct ScriptedModel {
        answer: Scripted,
        pub requests: Mutex<Vec<ModelRequest>>,
    }

    impl ScriptedModel {
        pub fn replying(value: Value) -> Arc<Self> {
            Arc::new(Self {
                answer: Scripted::Reply(value),
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn failing(answer: Scripted) -> Arc<Self> {
            Arc::new(Self {
                answer,
                requests: Mutex::new(Vec::new()),
            })
        }

        pub fn calls(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn last_request(&self) -> ModelRequest {
            self.requests.lock().unwrap().last().cloned().unwrap()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(&self, request: &ModelRequest) -> Result<Value, LlmError> {
            self.requests.lock().unwrap().push(request.clone());
            match &self.answer {
                Scripted::Reply(value) => Ok(value.clone()),
                Scripted::ApiError => Err(LlmError::Api {
                    status: 529,
                    message: "overloaded".into(),
                }),
                Scripted::Unparseable => Err(LlmError::Parse(
                    serde_json::from_str::<Value>("Sure! Here is").unwrap_err(),
                )),
            }
        }
    }

    #[derive(Default)]
    pub struct StaticJobs {
        pub listings: Vec<JobListing>,
        pub fail: bool,
        pub calls: AtomicUsize,
    }

    #[async_trait]
    impl JobSearchProvider for StaticJobs {
        async fn search(&self, _query: &str, _location: &str) -> Result<Vec<JobListing>, JobSearchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(JobSearchError::Api {
                    status: 503,
                    message: "unavailable".into(),
                });
            }
            Ok(self.listings.clone())
        }
    }
}
