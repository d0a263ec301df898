//! Schema Registry: declarative shapes for operation inputs and LLM outputs.
//!
//! A `Schema` is pure data: a tree of named fields built once at startup. It can
//! validate a JSON value (see `validate.rs`), resolve a field by path for the
//! template consistency check, and render itself as a JSON Schema document that is
//! handed to the LLM as the expected output shape.

use base64::Engine;
use serde_json::{json, Map, Value};

mod validate;

pub use validate::{FieldIssue, SchemaViolation};

/// Mime types accepted inside a `media` field.
pub const MEDIA_MIME_TYPES: &[&str] = &[
    "application/pdf",
    "image/png",
    "image/jpeg",
    "image/gif",
    "image/webp",
];

// ────────────────────────────────────────────────────────────────────────────
// Field model
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    String,
    Number,
    Boolean,
    /// Accepts either a JSON number or a string. The value is kept as sent.
    NumberOrString,
    /// A string restricted to the listed values.
    Enum(&'static [&'static str]),
    /// A `data:<mime>;base64,<payload>` URI carrying an image or a PDF.
    Media,
    Array(Box<FieldKind>),
    Object(Vec<Field>),
}

impl FieldKind {
    pub fn array_of(item: FieldKind) -> Self {
        FieldKind::Array(Box::new(item))
    }

    pub fn object(fields: Vec<Field>) -> Self {
        FieldKind::Object(fields)
    }

    /// Short type name used in validation messages.
    pub fn label(&self) -> &'static str {
        match self {
            FieldKind::String => "string",
            FieldKind::Number => "number",
            FieldKind::Boolean => "boolean",
            FieldKind::NumberOrString => "number or string",
            FieldKind::Enum(_) => "enum string",
            FieldKind::Media => "media data URI",
            FieldKind::Array(_) => "array",
            FieldKind::Object(_) => "object",
        }
    }

    /// Walks `path` through nested objects. An empty path resolves to `self`.
    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Option<&FieldKind> {
        let Some((head, rest)) = path.split_first() else {
            return Some(self);
        };
        match self {
            FieldKind::Object(fields) => fields
                .iter()
                .find(|f| f.name == head.as_ref())
                .and_then(|f| f.kind.resolve(rest)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
    pub optional: bool,
    pub description: Option<&'static str>,
}

impl Field {
    pub fn required(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            optional: false,
            description: None,
        }
    }

    pub fn optional(name: &'static str, kind: FieldKind) -> Self {
        Self {
            optional: true,
            ..Self::required(name, kind)
        }
    }

    pub fn describe(mut self, description: &'static str) -> Self {
        self.description = Some(description);
        self
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Schema
// ────────────────────────────────────────────────────────────────────────────

/// The top-level shape of an operation input or output. Always an object.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    root: FieldKind,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self {
            root: FieldKind::Object(fields),
        }
    }

    pub fn root(&self) -> &FieldKind {
        &self.root
    }

    pub fn resolve<S: AsRef<str>>(&self, path: &[S]) -> Option<&FieldKind> {
        self.root.resolve(path)
    }

    /// Renders the schema as a JSON Schema (draft 2020-12 subset) document.
    pub fn to_json_schema(&self) -> Value {
        kind_to_json_schema(&self.root, None)
    }
}

fn kind_to_json_schema(kind: &FieldKind, description: Option<&str>) -> Value {
    let mut node = match kind {
        FieldKind::String => json!({ "type": "string" }),
        FieldKind::Number => json!({ "type": "number" }),
        FieldKind::Boolean => json!({ "type": "boolean" }),
        FieldKind::NumberOrString => json!({ "type": ["number", "string"] }),
        FieldKind::Enum(values) => json!({ "type": "string", "enum": values }),
        FieldKind::Media => json!({
            "type": "string",
            "contentMediaType": MEDIA_MIME_TYPES,
            "pattern": "^data:[^;]+;base64,",
        }),
        FieldKind::Array(item) => json!({
            "type": "array",
            "items": kind_to_json_schema(item, None),
        }),
        FieldKind::Object(fields) => {
            let mut properties = Map::new();
            let mut required = Vec::new();
            for field in fields {
                properties.insert(
                    field.name.to_string(),
                    kind_to_json_schema(&field.kind, field.description),
                );
                if !field.optional {
                    required.push(Value::String(field.name.to_string()));
                }
            }
            json!({
                "type": "object",
                "properties": properties,
                "required": required,
            })
        }
    };
    if let (Some(text), Value::Object(map)) = (description, &mut node) {
        map.insert("description".to_string(), Value::String(text.to_string()));
    }
    node
}

// ────────────────────────────────────────────────────────────────────────────
// Media data URIs
// ────────────────────────────────────────────────────────────────────────────

/// A parsed `data:` URI. `data` stays base64-encoded.
#[derive(Debug, Clone, PartialEq)]
pub struct DataUri {
    pub mime_type: String,
    pub data: String,
}

impl DataUri {
    /// Parses `data:<mime>;base64,<payload>`. Rejects unsupported mime types and
    /// payloads that are not valid base64.
    pub fn parse(uri: &str) -> Option<Self> {
        let rest = uri.strip_prefix("data:")?;
        let (mime_type, data) = rest.split_once(";base64,")?;
        let mime_type = mime_type.trim().to_ascii_lowercase();
        if !MEDIA_MIME_TYPES.contains(&mime_type.as_str()) || data.is_empty() {
            return None;
        }
        base64::engine::general_purpose::STANDARD
            .decode(data)
            .ok()?;
        Some(Self {
            mime_type,
            data: data.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_schema() -> Schema {
        Schema::new(vec![
            Field::required("name", FieldKind::String),
            Field::optional(
                "address",
                FieldKind::object(vec![Field::required("city", FieldKind::String)]),
            ),
            Field::required("tags", FieldKind::array_of(FieldKind::String)),
        ])
    }

    #[test]
    fn test_resolve_nested_field() {
        let schema = profile_schema();
        assert_eq!(schema.resolve(&["address", "city"]), Some(&FieldKind::String));
        assert!(schema.resolve(&["address", "zip"]).is_none());
        assert!(schema.resolve(&["name", "first"]).is_none());
    }

    #[test]
    fn test_resolve_empty_path_is_root() {
        let schema = profile_schema();
        let empty: [&str; 0] = [];
        assert_eq!(schema.resolve(&empty), Some(schema.root()));
    }

    #[test]
    fn test_json_schema_lists_required_fields() {
        let doc = profile_schema().to_json_schema();
        assert_eq!(doc["type"], "object");
        assert_eq!(doc["required"], json!(["name", "tags"]));
        assert_eq!(doc["properties"]["tags"]["items"]["type"], "string");
        assert_eq!(
            doc["properties"]["address"]["properties"]["city"]["type"],
            "string"
        );
    }

    #[test]
    fn test_json_schema_carries_descriptions_and_enums() {
        let schema = Schema::new(vec![
            Field::required("score", FieldKind::Number).describe("-1 when unknown"),
            Field::required("category", FieldKind::Enum(&["a", "b"])),
        ]);
        let doc = schema.to_json_schema();
        assert_eq!(doc["properties"]["score"]["description"], "-1 when unknown");
        assert_eq!(doc["properties"]["category"]["enum"], json!(["a", "b"]));
    }

    #[test]
    fn test_data_uri_parses_pdf() {
        let uri = DataUri::parse("data:application/pdf;base64,JVBERi0xLjQ=").unwrap();
        assert_eq!(uri.mime_type, "application/pdf");
        assert_eq!(uri.data, "JVBERi0xLjQ=");
    }

    #[test]
    fn test_data_uri_rejects_unsupported_mime() {
        assert!(DataUri::parse("data:text/html;base64,PGgxPg==").is_none());
    }

    #[test]
    fn test_data_uri_rejects_bad_base64() {
        assert!(DataUri::parse("data:image/png;base64,not base64!").is_none());
        assert!(DataUri::parse("data:image/png;base64,").is_none());
        assert!(DataUri::parse("image/png;base64,AAAA").is_none());
    }
}
