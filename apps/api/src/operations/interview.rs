use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::operations::{CatalogError, OperationSpec};
use crate::schema::{Field, FieldKind, Schema};

pub const NAME: &str = "generate-interview-questions";
pub const NAME_MORE: &str = "generate-more-questions";

pub const CATEGORIES: &[&str] = &["behavioral", "technical", "mcq"];
pub const MCQ_OPTION_COUNT: usize = 4;

const SYSTEM: &str = "You are a senior hiring manager preparing a candidate for an \
    interview. Questions must be specific to the candidate's background and the role.";

const TEMPLATE: &str = r#"Prepare interview practice material for a {{jobTitle}} candidate.
{{#if jobDescription}}

JOB DESCRIPTION:
{{jobDescription}}
{{/if}}

RESUME:
{{resumeText}}

Produce:
- behavioral: 5 behavioral questions grounded in the candidate's experience
- technical: 5 technical questions for the role
- mcqs: 5 multiple-choice questions, each with exactly 4 options and a correctAnswer
  that is copied verbatim from one of the options
- feedback: strengths and areasForImprovement of this resume for the role"#;

const MORE_TEMPLATE: &str = r#"Write 5 more {{category}} interview questions for a {{jobTitle}} candidate.
{{#if jobDescription}}

JOB DESCRIPTION:
{{jobDescription}}
{{/if}}

RESUME:
{{resumeText}}
{{#if existingQuestions}}

The candidate has already practised these questions. Do not repeat or rephrase any of them:
{{#each existingQuestions}}
- {{this}}
{{/each}}
{{/if}}

Put the questions under the key for the category: "behavioral" for behavioral,
"technical" for technical, "mcqs" for mcq. Multiple-choice questions need exactly
4 options and a correctAnswer copied verbatim from one of the options."#;

// ────────────────────────────────────────────────────────────────────────────
// Types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewInput {
    pub resume_text: String,
    pub job_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoreQuestionsInput {
    pub resume_text: String,
    pub job_title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_description: Option<String>,
    pub category: QuestionCategory,
    #[serde(default)]
    pub existing_questions: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QuestionCategory {
    Behavioral,
    Technical,
    Mcq,
}

impl QuestionCategory {
    /// Output key the questions of this category are returned under.
    pub fn output_key(self) -> &'static str {
        match self {
            QuestionCategory::Behavioral => "behavioral",
            QuestionCategory::Technical => "technical",
            QuestionCategory::Mcq => "mcqs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleChoiceQuestion {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewFeedback {
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewQuestions {
    pub behavioral: Vec<String>,
    pub technical: Vec<String>,
    pub mcqs: Vec<MultipleChoiceQuestion>,
    pub feedback: InterviewFeedback,
}

/// Exactly one of the lists is populated, the one matching the requested category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoreQuestions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub behavioral: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technical: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcqs: Option<Vec<MultipleChoiceQuestion>>,
}

// ────────────────────────────────────────────────────────────────────────────
// Specs
// ────────────────────────────────────────────────────────────────────────────

fn mcq_kind() -> FieldKind {
    FieldKind::object(vec![
        Field::required("question", FieldKind::String),
        Field::required("options", FieldKind::array_of(FieldKind::String))
            .describe("Exactly 4 answer options"),
        Field::required("correctAnswer", FieldKind::String)
            .describe("Copied verbatim from options"),
    ])
}

fn base_input_fields() -> Vec<Field> {
    vec![
        Field::required("resumeText", FieldKind::String),
        Field::required("jobTitle", FieldKind::String),
        Field::optional("jobDescription", FieldKind::String),
    ]
}

pub fn spec() -> Result<OperationSpec, CatalogError> {
    Ok(OperationSpec::prompted(
        NAME,
        "Generates behavioral, technical and multiple-choice interview questions with resume feedback.",
        Schema::new(base_input_fields()),
        Schema::new(vec![
            Field::required("behavioral", FieldKind::array_of(FieldKind::String)),
            Field::required("technical", FieldKind::array_of(FieldKind::String)),
            Field::required("mcqs", FieldKind::array_of(mcq_kind())),
            Field::required(
                "feedback",
                FieldKind::object(vec![
                    Field::required("strengths", FieldKind::array_of(FieldKind::String)),
                    Field::required(
                        "areasForImprovement",
                        FieldKind::array_of(FieldKind::String),
                    ),
                ]),
            ),
        ]),
        SYSTEM,
        TEMPLATE,
    )?
    .with_output_check(check_questions))
}

pub fn more_spec() -> Result<OperationSpec, CatalogError> {
    let mut input = base_input_fields();
    input.push(Field::required("category", FieldKind::Enum(CATEGORIES)));
    input.push(Field::required(
        "existingQuestions",
        FieldKind::array_of(FieldKind::String),
    ));

    Ok(OperationSpec::prompted(
        NAME_MORE,
        "Generates further questions of one category, none repeating the ones already asked.",
        Schema::new(input),
        Schema::new(vec![
            Field::optional("behavioral", FieldKind::array_of(FieldKind::String)),
            Field::optional("technical", FieldKind::array_of(FieldKind::String)),
            Field::optional("mcqs", FieldKind::array_of(mcq_kind())),
        ]),
        SYSTEM,
        MORE_TEMPLATE,
    )?
    .with_output_check(check_more_questions))
}

// ────────────────────────────────────────────────────────────────────────────
// Output checks
// ────────────────────────────────────────────────────────────────────────────

fn check_mcq(index: usize, mcq: &MultipleChoiceQuestion) -> Result<(), String> {
    if mcq.options.len() != MCQ_OPTION_COUNT {
        return Err(format!(
            "mcqs[{index}] has {} options, expected {MCQ_OPTION_COUNT}",
            mcq.options.len()
        ));
    }
    if !mcq.options.contains(&mcq.correct_answer) {
        return Err(format!("mcqs[{index}].correctAnswer is not one of its options"));
    }
    Ok(())
}

fn check_questions(_input: &Value, output: Value) -> Result<Value, String> {
    let questions: InterviewQuestions =
        serde_json::from_value(output.clone()).map_err(|e| e.to_string())?;
    for (i, mcq) in questions.mcqs.iter().enumerate() {
        check_mcq(i, mcq)?;
    }
    Ok(output)
}

fn normalize(question: &str) -> String {
    question.trim().to_lowercase()
}

/// Keeps only the requested category and drops anything that repeats an
/// existing question or an earlier question in the same response. Fails if the category is missing or nothing new is left.
fn check_more_questions(input: &Value, output: Value) -> Result<Value, String> {
    let request: MoreQuestionsInput =
        serde_json::from_value(input.clone()).map_err(|e| e.to_string())?;
    let mut more: MoreQuestions = serde_json::from_value(output).map_err(|e| e.to_string())?;
    let key = request.category.output_key();

    // Seeded with the existing questions; each kept question is added so a
    // question repeated within the response is kept once.
    let mut seen: HashSet<String> = request
        .existing_questions
        .iter()
        .map(|q| normalize(q))
        .collect();
    let mut is_new = |q: &str| seen.insert(normalize(q));

    let (kept, dropped) = match request.category {
        QuestionCategory::Behavioral | QuestionCategory::Technical => {
            let list = match request.category {
                QuestionCategory::Behavioral => more.behavioral.take(),
                _ => more.technical.take(),
            }
            .ok_or_else(|| format!("response has no '{key}' questions"))?;
            let total = list.len();
            let fresh: Vec<String> = list.into_iter().filter(|q| is_new(q.as_str())).collect();
            let dropped = total - fresh.len();
            (serde_json::to_value(fresh).map_err(|e| e.to_string())?, dropped)
        }
        QuestionCategory::Mcq => {
            let list = more
                .mcqs
                .take()
                .ok_or_else(|| format!("response has no '{key}' questions"))?;
            for (i, mcq) in list.iter().enumerate() {
                check_mcq(i, mcq)?;
            }
            let total = list.len();
            let fresh: Vec<MultipleChoiceQuestion> =
                list.into_iter().filter(|m| is_new(m.question.as_str())).collect();
            let dropped = total - fresh.len();
            (serde_json::to_value(fresh).map_err(|e| e.to_string())?, dropped)
        }
    };

    if dropped > 0 {
        warn!(category = key, dropped, "Dropped repeated interview questions");
    }
    if kept.as_array().map_or(true, |a| a.is_empty()) {
        return Err(format!("every '{key}' question repeats an existing one"));
    }

    let mut data = Map::new();
    data.insert(key.to_string(), kept);
    Ok(Value::Object(data))
}
