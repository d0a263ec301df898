use serde::{Deserialize, Serialize};

use crate::operations::{CatalogError, OperationSpec};
use crate::schema::{Field, FieldKind, Schema};

pub const NAME: &str = "generate-cover-letter";

const SYSTEM: &str = "You are an experienced career coach who writes concise, specific \
    cover letters. Use only facts present in the resume. Never invent employers, \
    degrees or metrics.";

const TEMPLATE: &str = r#"Write a cover letter for the position of {{jobTitle}} at {{companyName}}.

{{#if hiringManager}}
Address the letter to {{hiringManager}}.
{{else}}
Address the letter to the hiring team.
{{/if}}

RESUME:
{{resumeText}}

JOB DESCRIPTION:
{{jobDescription}}

Guidelines:
1. Three to four paragraphs, under 400 words
2. Open with the role and one concrete reason the candidate fits it
3. Connect two or three resume achievements to requirements in the job description
4. Close with a short call to action
5. Return the letter as plain text in the `coverLetter` field"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetterInput {
    pub resume_text: String,
    pub job_description: String,
    pub job_title: String,
    pub company_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hiring_manager: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverLetter {
    pub cover_letter: String,
}

pub fn spec() -> Result<OperationSpec, CatalogError> {
    OperationSpec::prompted(
        NAME,
        "Writes a cover letter tailored to a job from the candidate's resume.",
        Schema::new(vec![
            Field::required("resumeText", FieldKind::String),
            Field::required("jobDescription", FieldKind::String),
            Field::required("jobTitle", FieldKind::String),
            Field::required("companyName", FieldKind::String),
            Field::optional("hiringManager", FieldKind::String),
        ]),
        Schema::new(vec![Field::required("coverLetter", FieldKind::String)
            .describe("The full cover letter as plain text")]),
        SYSTEM,
        TEMPLATE,
    )
}
