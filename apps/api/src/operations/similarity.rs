use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm_client::prompts::SCORE_SENTINEL_INSTRUCTION;
use crate::operations::{check_score, CatalogError, OperationSpec};
use crate::schema::{Field, FieldKind, Schema};

pub const NAME: &str = "match-similarity";

const SYSTEM: &str = "You are a technical recruiter comparing a resume with a job \
    description. Judge overlap of skills, seniority and domain, not wording.";

const TEMPLATE: &str = r#"Rate how well this resume matches the job description.

similarityScore: a number from 0 to 1 (1 = perfect match).
If the resume or job description is too short or unreadable to compare, use -1.

Also list concrete suggestions that would raise the match, and, where you can,
the keywords the two documents share and the ones the resume is missing.

RESUME:
{{resume}}

JOB DESCRIPTION:
{{jobDescription}}"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityInput {
    pub resume: String,
    pub job_description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimilarityReport {
    /// 0.0 – 1.0, or exactly -1 when undeterminable.
    pub similarity_score: f64,
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub matching_keywords: Vec<String>,
    #[serde(default)]
    pub missing_keywords: Vec<String>,
}

pub fn spec() -> Result<OperationSpec, CatalogError> {
    Ok(OperationSpec::prompted(
        NAME,
        "Scores how closely a resume matches a job description (0–1).",
        Schema::new(vec![
            Field::required("resume", FieldKind::String),
            Field::required("jobDescription", FieldKind::String),
        ]),
        Schema::new(vec![
            Field::required("similarityScore", FieldKind::Number)
                .describe("0 to 1, or -1 when it cannot be determined"),
            Field::required("suggestions", FieldKind::array_of(FieldKind::String)),
            Field::optional("matchingKeywords", FieldKind::array_of(FieldKind::String)),
            Field::optional("missingKeywords", FieldKind::array_of(FieldKind::String)),
        ]),
        format!("{SYSTEM} {SCORE_SENTINEL_INSTRUCTION}"),
        TEMPLATE,
    )?
    .with_output_check(check_output))
}

fn check_output(_input: &Value, output: Value) -> Result<Value, String> {
    let report: SimilarityReport =
        serde_json::from_value(output.clone()).map_err(|e| e.to_string())?;
    check_score("similarityScore", report.similarity_score, 0.0, 1.0)?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_score_in_range_passes() {
        let out = json!({"similarityScore": 0.72, "suggestions": ["Mention Kafka"]});
        assert_eq!(check_output(&json!({}), out.clone()).unwrap(), out);
    }

    #[test]
    fn test_sentinel_passes() {
        assert!(check_output(&json!({}), json!({"similarityScore": -1, "suggestions": []})).is_ok());
    }

    #[test]
    fn test_percentage_scale_rejected() {
        let err = check_output(&json!({}), json!({"similarityScore": 72, "suggestions": []}))
            .unwrap_err();
        assert!(err.contains("similarityScore"));
    }

    #[test]
    fn test_system_prompt_carries_sentinel_rule() {
        let spec = spec().unwrap();
        let crate::operations::OperationKind::Prompted { system, .. } = spec.kind else {
            panic!("similarity is prompted");
        };
        assert!(system.contains("exactly -1"));
    }
}
