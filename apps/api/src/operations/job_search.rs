use serde::{Deserialize, Serialize};

use crate::jobs::JobListing;
use crate::operations::OperationSpec;
use crate::schema::{Field, FieldKind, Schema};

pub const NAME: &str = "search-jobs";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSearchInput {
    pub query: String,
    pub location: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSearchResults {
    pub jobs: Vec<JobListing>,
}

/// Backed by the job-search provider rather than the LLM; the listings still
/// pass through the output schema like any model answer.
pub fn spec() -> OperationSpec {
    OperationSpec::job_search(
        NAME,
        "Searches current job listings by keyword and location.",
        Schema::new(vec![
            Field::required("query", FieldKind::String).describe("Role or keywords"),
            Field::required("location", FieldKind::String),
        ]),
        Schema::new(vec![Field::required(
            "jobs",
            FieldKind::array_of(FieldKind::object(vec![
                Field::required("id", FieldKind::String),
                Field::required("source", FieldKind::String),
                Field::required("title", FieldKind::String),
                Field::required("company", FieldKind::String),
                Field::required("location", FieldKind::String),
                Field::required("description", FieldKind::String),
                Field::required("url", FieldKind::String),
            ])),
        )]),
    )
}
