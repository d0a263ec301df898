use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm_client::prompts::SCORE_SENTINEL_INSTRUCTION;
use crate::operations::{check_score, CatalogError, OperationSpec};
use crate::schema::{Field, FieldKind, Schema};

pub const NAME_TEXT: &str = "analyze-ats-text";
pub const NAME_DOCUMENT: &str = "analyze-ats-document";

const SYSTEM: &str = "You are an applicant tracking system (ATS) auditor. You judge how \
    well a resume will be parsed and ranked by automated screening software.";

const SCORING_RULES: &str = r#"Score the resume from 0 to 100 for ATS compatibility:
- Parseable structure (standard section headings, no tables or text in images)
- Keyword coverage{{#if jobDescription}} against the job description below{{/if}}
- Quantified achievements and consistent dates
If the resume is unreadable or empty, set score to -1 and explain why in feedback.

Return short overall feedback and a list of concrete, actionable suggestions."#;

const TEXT_TEMPLATE: &str = r#"%SCORING_RULES%

RESUME:
{{resumeText}}
{{#if jobDescription}}

JOB DESCRIPTION:
{{jobDescription}}
{{/if}}"#;

const DOCUMENT_TEMPLATE: &str = r#"%SCORING_RULES%

The resume is the attached document {{media document}}. Judge its layout as well as its text.
{{#if jobDescription}}

JOB DESCRIPTION:
{{jobDescription}}
{{/if}}"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtsTextInput {
    pub resume_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtsDocumentInput {
    /// `data:<mime>;base64,<payload>`, PDF or image.
    pub document: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AtsReport {
    /// 0 – 100, or exactly -1 when the resume could not be scored.
    pub score: f64,
    pub feedback: String,
    pub suggestions: Vec<String>,
}

pub fn text_spec() -> Result<OperationSpec, CatalogError> {
    Ok(OperationSpec::prompted(
        NAME_TEXT,
        "Scores a plain-text resume for ATS compatibility (0–100).",
        Schema::new(vec![
            Field::required("resumeText", FieldKind::String),
            Field::optional("jobDescription", FieldKind::String),
        ]),
        report_schema(),
        system(),
        &TEXT_TEMPLATE.replace("%SCORING_RULES%", SCORING_RULES),
    )?
    .with_output_check(check_output))
}

pub fn document_spec() -> Result<OperationSpec, CatalogError> {
    Ok(OperationSpec::prompted(
        NAME_DOCUMENT,
        "Scores an uploaded resume document (PDF or image) for ATS compatibility (0–100).",
        Schema::new(vec![
            Field::required("document", FieldKind::Media)
                .describe("Data URI of the resume, application/pdf or image/*"),
            Field::optional("jobDescription", FieldKind::String),
        ]),
        report_schema(),
        system(),
        &DOCUMENT_TEMPLATE.replace("%SCORING_RULES%", SCORING_RULES),
    )?
    .with_output_check(check_output))
}

fn system() -> String {
    format!("{SYSTEM} {SCORE_SENTINEL_INSTRUCTION}")
}

fn report_schema() -> Schema {
    Schema::new(vec![
        Field::required("score", FieldKind::Number)
            .describe("0 to 100, or -1 when the resume cannot be scored"),
        Field::required("feedback", FieldKind::String),
        Field::required("suggestions", FieldKind::array_of(FieldKind::String)),
    ])
}

fn check_output(_input: &Value, output: Value) -> Result<Value, String> {
    let report: AtsReport = serde_json::from_value(output.clone()).map_err(|e| e.to_string())?;
    check_score("score", report.score, 0.0, 100.0)?;
    Ok(output)
}
