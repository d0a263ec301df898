use serde::{Deserialize, Serialize};

use crate::operations::{CatalogError, OperationSpec};
use crate::schema::{Field, FieldKind, Schema};

pub const NAME: &str = "analyze-skill-gaps";

const SYSTEM: &str = "You are a career counsellor. Base every gap and recommendation on \
    evidence in the resume; do not assume skills that are not mentioned.";

const TEMPLATE: &str = r#"Analyse the skill gaps in this resume and recommend career paths.

RESUME:
{{resumeText}}
{{#if careerGoals}}

CAREER GOALS:
{{careerGoals}}
{{/if}}
{{#if jobDescription}}

TARGET JOB DESCRIPTION:
{{jobDescription}}
{{/if}}

Return:
- skillGaps: the skills missing{{#if jobDescription}} for the target job{{else}} for the candidate's next career step{{/if}}, each with a short description of why it matters
- careerPathRecommendations: 2 to 4 roles the candidate could grow into, each with concrete steps
- additionalRecommendations: one paragraph of further advice (courses, certifications, networking)"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGapInput {
    pub resume_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub career_goals: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillGap {
    pub skill: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CareerPath {
    pub role: String,
    pub description: String,
    pub steps: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillGapReport {
    pub skill_gaps: Vec<SkillGap>,
    pub career_path_recommendations: Vec<CareerPath>,
    pub additional_recommendations: String,
}

pub fn spec() -> Result<OperationSpec, CatalogError> {
    OperationSpec::prompted(
        NAME,
        "Identifies skill gaps and recommends career paths with concrete next steps.",
        Schema::new(vec![
            Field::required("resumeText", FieldKind::String),
            Field::optional("careerGoals", FieldKind::String),
            Field::optional("jobDescription", FieldKind::String),
        ]),
        Schema::new(vec![
            Field::required(
                "skillGaps",
                FieldKind::array_of(FieldKind::object(vec![
                    Field::required("skill", FieldKind::String),
                    Field::required("description", FieldKind::String),
                ])),
            ),
            Field::required(
                "careerPathRecommendations",
                FieldKind::array_of(FieldKind::object(vec![
                    Field::required("role", FieldKind::String),
                    Field::required("description", FieldKind::String),
                    Field::required("steps", FieldKind::array_of(FieldKind::String)),
                ])),
            ),
            Field::required("additionalRecommendations", FieldKind::String),
        ]),
        SYSTEM,
        TEMPLATE,
    )
}
