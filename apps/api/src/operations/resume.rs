use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm_client::prompts::SCORE_SENTINEL_INSTRUCTION;
use crate::operations::{check_score, CatalogError, OperationSpec};
use crate::schema::{Field, FieldKind, Schema};

pub const NAME: &str = "generate-resume";

pub const STYLES: &[&str] = &["modern", "classic", "minimal", "creative"];

const SYSTEM: &str = "You are an expert resume writer. Use only the facts the candidate \
    provides. Rephrase and order them for impact, but never invent employers, dates, \
    degrees or numbers.";

const TEMPLATE: &str = r#"Write a complete resume in Markdown for {{userDetails.fullName}}.

CONTACT:
- Email: {{userDetails.email}}
{{#if userDetails.phone}}
- Phone: {{userDetails.phone}}
{{/if}}
{{#if userDetails.location}}
- Location: {{userDetails.location}}
{{/if}}
{{#if userDetails.linkedin}}
- LinkedIn: {{userDetails.linkedin}}
{{/if}}
{{#if userDetails.summary}}

SUMMARY PROVIDED BY THE CANDIDATE:
{{userDetails.summary}}
{{/if}}
{{#if userDetails.experience}}

EXPERIENCE:
{{#each userDetails.experience}}
- {{this.title}} at {{this.company}}{{#if this.startDate}} ({{this.startDate}} to {{#if this.endDate}}{{this.endDate}}{{else}}present{{/if}}){{/if}}
{{#if this.description}}
  {{this.description}}
{{/if}}
{{/each}}
{{/if}}
{{#if userDetails.education}}

EDUCATION:
{{#each userDetails.education}}
- {{this.degree}}, {{this.institution}}{{#if this.year}} ({{this.year}}){{/if}}
{{/each}}
{{/if}}
{{#if userDetails.skills}}

SKILLS:
{{#each userDetails.skills}}
- {{this}}
{{/each}}
{{/if}}
{{#if jobDescription}}

Tailor the resume to this job description and use its keywords where the facts support them:
{{jobDescription}}
{{/if}}
{{#if templatePreferences}}

STYLE:
{{#if templatePreferences.style}}
- Layout style: {{templatePreferences.style}}
{{/if}}
{{#if templatePreferences.tone}}
- Tone: {{templatePreferences.tone}}
{{/if}}
{{/if}}
{{#if photoDataUri}}

A profile photo is placed in the header separately. Do not mention it in the text.
{{/if}}

Return the Markdown in `resume`.{{#if jobDescription}} Also estimate `atsScore` (0 to 100) for the resume against the job description.{{/if}}"#;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExperienceEntry {
    pub title: String,
    pub company: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EducationEntry {
    pub degree: String,
    pub institution: String,
    /// Graduation year as sent: `2019` or `"2019"` or `"Expected 2026"`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub year: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDetails {
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default)]
    pub experience: Vec<ExperienceEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub skills: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemplatePreferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResumeRequest {
    pub user_details: UserDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub template_preferences: Option<TemplatePreferences>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub photo_data_uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedResume {
    /// Markdown.
    pub resume: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ats_score: Option<f64>,
}

// ────────────────────────────────────────────────────────────────────────────
// Registration
// ────────────────────────────────────────────────────────────────────────────

fn user_details_kind() -> FieldKind {
    FieldKind::object(vec![
        Field::required("fullName", FieldKind::String),
        Field::required("email", FieldKind::String),
        Field::optional("phone", FieldKind::String),
        Field::optional("location", FieldKind::String),
        Field::optional("linkedin", FieldKind::String),
        Field::optional("summary", FieldKind::String),
        Field::optional(
            "experience",
            FieldKind::array_of(FieldKind::object(vec![
                Field::required("title", FieldKind::String),
                Field::required("company", FieldKind::String),
                Field::optional("startDate", FieldKind::String),
                Field::optional("endDate", FieldKind::String),
                Field::optional("description", FieldKind::String),
            ])),
        ),
        Field::optional(
            "education",
            FieldKind::array_of(FieldKind::object(vec![
                Field::required("degree", FieldKind::String),
                Field::required("institution", FieldKind::String),
                Field::optional("year", FieldKind::NumberOrString),
            ])),
        ),
        Field::optional("skills", FieldKind::array_of(FieldKind::String)),
    ])
}

pub fn spec() -> Result<OperationSpec, CatalogError> {
    Ok(OperationSpec::prompted(
        NAME,
        "Writes a Markdown resume from structured candidate details, optionally tailored to a job.",
        Schema::new(vec![
            Field::required("userDetails", user_details_kind()),
            Field::optional("jobDescription", FieldKind::String),
            Field::optional(
                "templatePreferences",
                FieldKind::object(vec![
                    Field::optional("style", FieldKind::Enum(STYLES)),
                    Field::optional("tone", FieldKind::String),
                ]),
            ),
            Field::optional("photoDataUri", FieldKind::Media)
                .describe("Profile photo as an image data URI"),
        ]),
        Schema::new(vec![
            Field::required("resume", FieldKind::String).describe("The resume in Markdown"),
            Field::optional("atsScore", FieldKind::Number)
                .describe("0 to 100 against the job description, or -1 when it cannot be estimated"),
        ]),
        format!("{SYSTEM} {SCORE_SENTINEL_INSTRUCTION}"),
        TEMPLATE,
    )?
    .with_output_check(check_output))
}

fn check_output(_input: &Value, output: Value) -> Result<Value, String> {
    if let Some(score) = output.get("atsScore").and_then(Value::as_f64) {
        check_score("atsScore", score, 0.0, 100.0)?;
    }
    Ok(output)
}
