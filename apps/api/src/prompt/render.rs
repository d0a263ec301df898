use serde_json::Value;

use crate::schema::DataUri;

use super::{FieldPath, Node, RenderedPrompt, TemplateError};

pub(super) fn render(nodes: &[Node], input: &Value) -> Result<RenderedPrompt, TemplateError> {
    let mut renderer = Renderer {
        root: input,
        scopes: Vec::new(),
        out: RenderedPrompt::default(),
    };
    renderer.nodes(nodes)?;
    Ok(renderer.out)
}

struct Renderer<'a> {
    root: &'a Value,
    scopes: Vec<&'a Value>,
    out: RenderedPrompt,
}

impl<'a> Renderer<'a> {
    fn nodes(&mut self, nodes: &[Node]) -> Result<(), TemplateError> {
        for node in nodes {
            match node {
                Node::Text(text) => self.out.text.push_str(text),
                Node::Value(path) => {
                    if let Some(value) = self.lookup(path) {
                        push_value(&mut self.out.text, value);
                    }
                }
                Node::Media(path) => match self.lookup(path) {
                    None | Some(Value::Null) => {}
                    Some(Value::String(uri)) => {
                        let media = DataUri::parse(uri)
                            .ok_or_else(|| TemplateError::NotMedia(path.to_string()))?;
                        self.out.attachments.push(media);
                        let n = self.out.attachments.len();
                        self.out.text.push_str(&format!("[attachment {n}]"));
                    }
                    Some(_) => return Err(TemplateError::NotMedia(path.to_string())),
                },
                Node::If {
                    path,
                    then,
                    otherwise,
                } => {
                    if is_truthy(self.lookup(path)) {
                        self.nodes(then)?;
                    } else {
                        self.nodes(otherwise)?;
                    }
                }
                Node::Each { path, body } => match self.lookup(path) {
                    None | Some(Value::Null) => {}
                    Some(Value::Array(items)) => {
                        for item in items {
                            self.scopes.push(item);
                            let result = self.nodes(body);
                            self.scopes.pop();
                            result?;
                        }
                    }
                    Some(_) => return Err(TemplateError::NotAList(path.to_string())),
                },
            }
        }
        Ok(())
    }

    fn lookup(&self, path: &FieldPath) -> Option<&'a Value> {
        let base = if path.from_this {
            *self.scopes.last()?
        } else {
            self.root
        };
        path.segments.iter().try_fold(base, |value, segment| value.get(segment))
    }
}

/// Absent, null, `false`, `""` and `[]` are falsy. Everything else is truthy,
/// including `0`.
fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Number(_)) | Some(Value::Object(_)) => true,
    }
}

fn push_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => {}
        Value::String(s) => out.push_str(s),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Array(_) | Value::Object(_) => {
            out.push_str(&serde_json::to_string_pretty(value).unwrap_or_default())
        }
    }
}
