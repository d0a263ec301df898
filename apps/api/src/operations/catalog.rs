use std::collections::BTreeMap;

use crate::operations::{
    ats, career, cover_letter, interview, job_search, resume, similarity, translation,
    CatalogError, OperationError, OperationSpec,
};

/// Process-wide registry of named operations. Built once at startup and shared
/// read-only through `AppState`.
#[derive(Debug)]
pub struct Catalog {
    specs: BTreeMap<&'static str, OperationSpec>,
}

impl Catalog {
    /// Every operation the service offers. Fails if any template is inconsistent
    /// with its input schema.
    pub fn standard() -> Result<Self, CatalogError> {
        Self::from_specs(vec![
            resume::spec()?,
            ats::text_spec()?,
            ats::document_spec()?,
            cover_letter::spec()?,
            translation::spec()?,
            similarity::spec()?,
            career::spec()?,
            interview::spec()?,
            interview::more_spec()?,
            job_search::spec(),
        ])
    }

    pub fn from_specs(specs: Vec<OperationSpec>) -> Result<Self, CatalogError> {
        let mut map = BTreeMap::new();
        for spec in specs {
            let name = spec.name;
            if map.insert(name, spec).is_some() {
                return Err(CatalogError::Duplicate(name));
            }
        }
        Ok(Self { specs: map })
    }

    pub fn get(&self, name: &str) -> Option<&OperationSpec> {
        self.specs.get(name)
    }

    pub fn require(&self, name: &str) -> Result<&OperationSpec, OperationError> {
        self.get(name)
            .ok_or_else(|| OperationError::UnknownOperation(name.to_string()))
    }

    /// Operations in name order.
    pub fn iter(&self) -> impl Iterator<Item = &OperationSpec> {
        self.specs.values()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Value};

    use super::*;
    use crate::operations::OperationKind;

    const PNG_URI: &str = "data:image/png;base64,iVBORw0KGgo=";

    /// A fully populated valid input for each prompted operation.
    fn sample_input(name: &str) -> Value {
        match name {
            resume::NAME => json!({
                "userDetails": {
                    "fullName": "Jane Doe",
                    "email": "jane@example.com",
                    "phone": "+1 555 0100",
                    "location": "Berlin",
                    "linkedin": "linkedin.com/in/jane",
                    "summary": "Backend engineer",
                    "experience": [{"title": "Engineer", "company": "Acme", "startDate": "2020", "endDate": "2024", "description": "Billing"}],
                    "education": [{"degree": "BSc", "institution": "TU Berlin", "year": "2019"}],
                    "skills": ["Rust"]
                },
                "jobDescription": "Payments",
                "templatePreferences": {"style": "modern", "tone": "confident"},
                "photoDataUri": PNG_URI
            }),
            ats::NAME_TEXT => json!({"resumeText": "r", "jobDescription": "d"}),
            ats::NAME_DOCUMENT => json!({"document": PNG_URI, "jobDescription": "d"}),
            cover_letter::NAME => json!({
                "resumeText": "r", "jobDescription": "d", "jobTitle": "t",
                "companyName": "c", "hiringManager": "h"
            }),
            translation::NAME => json!({"resumeText": "r", "targetLanguage": "German"}),
            similarity::NAME => json!({"resume": "r", "jobDescription": "d"}),
            career::NAME => json!({"resumeText": "r", "careerGoals": "g", "jobDescription": "d"}),
            interview::NAME => json!({"resumeText": "r", "jobTitle": "t", "jobDescription": "d"}),
            interview::NAME_MORE => json!({
                "resumeText": "r", "jobTitle": "t", "jobDescription": "d",
                "category": "technical", "existingQuestions": ["Q1"]
            }),
            other => panic!("no sample input for {other}"),
        }
    }

    #[test]
    fn test_standard_catalog_registers_every_operation() {
        let catalog = Catalog::standard().unwrap();
        let names: Vec<_> = catalog.iter().map(|s| s.name).collect();
        assert_eq!(
            names,
            vec![
                "analyze-ats-document",
                "analyze-ats-text",
                "analyze-skill-gaps",
                "generate-cover-letter",
                "generate-interview-questions",
                "generate-more-questions",
                "generate-resume",
                "match-similarity",
                "search-jobs",
                "translate-resume",
            ]
        );
    }

    #[test]
    fn test_sample_inputs_render_without_leftover_tags() {
        let catalog = Catalog::standard().unwrap();
        for spec in catalog.iter() {
            let OperationKind::Prompted { template, .. } = &spec.kind else {
                continue;
            };
            let input = spec
                .input
                .validate(&sample_input(spec.name))
                .unwrap_or_else(|e| panic!("{}: {e}", spec.name));
            let text = template.render(&input).unwrap().text;
            assert!(!text.contains("{{"), "{} left a tag: {text}", spec.name);
            assert!(!text.contains("}}"), "{} left a tag: {text}", spec.name);
        }
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let err = Catalog::from_specs(vec![job_search::spec(), job_search::spec()]).unwrap_err();
        assert!(matches!(err, CatalogError::Duplicate("search-jobs")));
    }

    #[test]
    fn test_require_unknown_operation() {
        let catalog = Catalog::standard().unwrap();
        assert!(catalog.require("translate-resume").is_ok());
        let err = catalog.require("write-poem").unwrap_err();
        assert!(matches!(err, OperationError::UnknownOperation(name) if name == "write-poem"));
    }
}
