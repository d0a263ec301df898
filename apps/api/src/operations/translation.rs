use serde::{Deserialize, Serialize};

use crate::operations::{CatalogError, OperationSpec};
use crate::schema::{Field, FieldKind, Schema};

pub const NAME: &str = "translate-resume";

const SYSTEM: &str = "You are a professional translator specialised in resumes. \
    Keep the structure, headings order, dates and proper nouns intact.";

const TEMPLATE: &str = r#"Translate the following resume into {{targetLanguage}}.

Rules:
- Preserve section order and formatting (Markdown headings, bullet lists)
- Do not translate company names, product names, or URLs
- Use job titles customary in {{targetLanguage}}-speaking job markets

RESUME:
{{resumeText}}"#;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslateInput {
    pub resume_text: String,
    pub target_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslatedResume {
    pub translated_resume: String,
}

pub fn spec() -> Result<OperationSpec, CatalogError> {
    OperationSpec::prompted(
        NAME,
        "Translates a resume into a target language, preserving its structure.",
        Schema::new(vec![
            Field::required("resumeText", FieldKind::String),
            Field::required("targetLanguage", FieldKind::String)
                .describe("Language name, e.g. \"German\""),
        ]),
        Schema::new(vec![Field::required("translatedResume", FieldKind::String)]),
        SYSTEM,
        TEMPLATE,
    )
}
