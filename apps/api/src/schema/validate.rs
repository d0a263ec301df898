use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use super::{DataUri, FieldKind, Schema};

/// One structural problem found while validating a value.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldIssue {
    pub path: String,
    pub problem: String,
}

/// All issues found in a single validation pass. Never empty.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{}", summarize(.issues))]
pub struct SchemaViolation {
    pub issues: Vec<FieldIssue>,
}

fn summarize(issues: &[FieldIssue]) -> String {
    issues
        .iter()
        .map(|i| format!("{}: {}", i.path, i.problem))
        .collect::<Vec<_>>()
        .join("; ")
}

impl Schema {
    /// Structural validation. Returns the value projected onto the declared
    /// fields: undeclared keys are dropped and `null` optional fields are
    /// treated as absent, so validating the result again yields it unchanged.
    pub fn validate(&self, value: &Value) -> Result<Value, SchemaViolation> {
        let mut issues = Vec::new();
        let projected = check(self.root(), value, "", &mut issues);
        if issues.is_empty() {
            Ok(projected)
        } else {
            Err(SchemaViolation { issues })
        }
    }
}

fn check(kind: &FieldKind, value: &Value, path: &str, issues: &mut Vec<FieldIssue>) -> Value {
    match (kind, value) {
        (FieldKind::String, Value::String(_))
        | (FieldKind::Number, Value::Number(_))
        | (FieldKind::Boolean, Value::Bool(_))
        | (FieldKind::NumberOrString, Value::Number(_) | Value::String(_)) => value.clone(),

        (FieldKind::Enum(allowed), Value::String(s)) => {
            if !allowed.contains(&s.as_str()) {
                issues.push(issue(
                    path,
                    format!("'{s}' is not one of [{}]", allowed.join(", ")),
                ));
            }
            value.clone()
        }

        (FieldKind::Media, Value::String(s)) => {
            if DataUri::parse(s).is_none() {
                issues.push(issue(
                    path,
                    "expected a base64 data URI of a PDF or image".to_string(),
                ));
            }
            value.clone()
        }

        (FieldKind::Array(item), Value::Array(items)) => Value::Array(
            items
                .iter()
                .enumerate()
                .map(|(i, v)| check(item, v, &format!("{}[{i}]", display_path(path)), issues))
                .collect(),
        ),

        (FieldKind::Object(fields), Value::Object(map)) => {
            let mut projected = Map::new();
            for field in fields {
                let child = join(path, field.name);
                match map.get(field.name) {
                    None | Some(Value::Null) if field.optional => {}
                    None => issues.push(issue(&child, "is required".to_string())),
                    Some(v) => {
                        projected.insert(field.name.to_string(), check(&field.kind, v, &child, issues));
                    }
                }
            }
            Value::Object(projected)
        }

        _ => {
            issues.push(issue(
                path,
                format!("expected {}, found {}", kind.label(), json_type(value)),
            ));
            Value::Null
        }
    }
}

fn issue(path: &str, problem: String) -> FieldIssue {
    FieldIssue {
        path: display_path(path).to_string(),
        problem,
    }
}

fn display_path(path: &str) -> &str {
    if path.is_empty() {
        "$"
    } else {
        path
    }
}

fn join(parent: &str, name: &str) -> String {
    if parent.is_empty() {
        name.to_string()
    } else {
        format!("{parent}.{name}")
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
