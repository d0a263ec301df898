//! Prompt Template Engine: renders prompt text from a validated input tree.
//!
//! Syntax (a small subset of handlebars):
//! - `{{field}}`, `{{a.b}}` : interpolation
//! - `{{#if field}}…{{else}}…{{/if}}` : truthiness of a field
//! - `{{#each list}}…{{this}} / {{this.field}}…{{/each}}` : iteration
//! - `{{media field}}` : attach a `media` field to the LLM request
//!
//! Templates are parsed and checked against the operation's input schema once,
//! at registration. Rendering is pure and synchronous.

use std::fmt;

use thiserror::Error;

use crate::schema::{DataUri, Schema};

mod check;
mod parser;
mod render;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TemplateError {
    #[error("unterminated tag starting at byte {0}")]
    UnterminatedTag(usize),

    #[error("empty tag at byte {0}")]
    EmptyTag(usize),

    #[error("unknown helper '{0}'")]
    UnknownHelper(String),

    #[error("helper '{0}' needs a field argument")]
    MissingArgument(String),

    #[error("invalid field path '{0}'")]
    InvalidPath(String),

    #[error("closing tag '/{found}' does not match open block '{expected}'")]
    UnbalancedBlock { expected: String, found: String },

    #[error("block '#{0}' is never closed")]
    UnclosedBlock(String),

    #[error("'else' outside of an if block")]
    StrayElse,

    #[error("'this' used outside of an each block")]
    ThisOutsideEach,

    #[error("template references undeclared field '{0}'")]
    UndeclaredField(String),

    #[error("'{helper}' needs field '{path}' to be {expected}, but it is declared as {found}")]
    KindMismatch {
        helper: &'static str,
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("field '{0}' is not a list")]
    NotAList(String),

    #[error("field '{0}' is not a media data URI")]
    NotMedia(String),
}

// ────────────────────────────────────────────────────────────────────────────
// AST
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FieldPath {
    /// Path starts at the innermost `each` element rather than the input root.
    pub from_this: bool,
    pub segments: Vec<String>,
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.from_this, self.segments.is_empty()) {
            (true, true) => write!(f, "this"),
            (true, false) => write!(f, "this.{}", self.segments.join(".")),
            (false, _) => write!(f, "{}", self.segments.join(".")),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Node {
    Text(String),
    Value(FieldPath),
    Media(FieldPath),
    If {
        path: FieldPath,
        then: Vec<Node>,
        otherwise: Vec<Node>,
    },
    Each {
        path: FieldPath,
        body: Vec<Node>,
    },
}

// ────────────────────────────────────────────────────────────────────────────
// Public API
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Template {
    nodes: Vec<Node>,
}

/// Output of a render: prompt text plus any media attachments, in the order
/// their `[attachment N]` references appear in the text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderedPrompt {
    pub text: String,
    pub attachments: Vec<DataUri>,
}

impl Template {
    pub fn parse(source: &str) -> Result<Self, TemplateError> {
        Ok(Self {
            nodes: parser::parse(source)?,
        })
    }

    /// Verifies every field the template touches is declared in `schema` with a
    /// kind compatible with how it is used.
    pub fn check(&self, schema: &Schema) -> Result<(), TemplateError> {
        check::check_nodes(&self.nodes, schema, &mut Vec::new())
    }

    pub fn render(&self, input: &serde_json::Value) -> Result<RenderedPrompt, TemplateError> {
        render::render(&self.nodes, input)
    }
}
