use crate::schema::{FieldKind, Schema};

use super::{FieldPath, Node, TemplateError};

/// Walks the template with a scope stack of `each` element kinds.
pub(super) fn check_nodes<'a>(
    nodes: &[Node],
    root: &'a Schema,
    scopes: &mut Vec<&'a FieldKind>,
) -> Result<(), TemplateError> {
    for node in nodes {
        match node {
            Node::Text(_) => {}
            Node::Value(path) => {
                resolve(path, root, scopes)?;
            }
            Node::Media(path) => {
                let kind = resolve(path, root, scopes)?;
                if *kind != FieldKind::Media {
                    return Err(mismatch("media", path, "a media field", kind));
                }
            }
            Node::If {
                path,
                then,
                otherwise,
            } => {
                resolve(path, root, scopes)?;
                check_nodes(then, root, scopes)?;
                check_nodes(otherwise, root, scopes)?;
            }
            Node::Each { path, body } => {
                let kind = resolve(path, root, scopes)?;
                let FieldKind::Array(item) = kind else {
                    return Err(mismatch("each", path, "an array", kind));
                };
                scopes.push(item.as_ref());
                let result = check_nodes(body, root, scopes);
                scopes.pop();
                result?;
            }
        }
    }
    Ok(())
}

fn resolve<'a>(
    path: &FieldPath,
    root: &'a Schema,
    scopes: &[&'a FieldKind],
) -> Result<&'a FieldKind, TemplateError> {
    let kind = if path.from_this {
        let item = *scopes.last().ok_or(TemplateError::ThisOutsideEach)?;
        item.resolve(path.segments.as_slice())
    } else {
        root.resolve(path.segments.as_slice())
    };
    kind.ok_or_else(|| TemplateError::UndeclaredField(path.to_string()))
}

fn mismatch(
    helper: &'static str,
    path: &FieldPath,
    expected: &'static str,
    found: &FieldKind,
) -> TemplateError {
    TemplateError::KindMismatch {
        helper,
        path: path.to_string(),
        expected,
        found: found.label(),
    }
}

#[cfg(test)]
mod tests {
    use crate::prompt::{Template, TemplateError};
    use crate::schema::{Field, FieldKind, Schema};

    fn schema() -> Schema {
        Schema::new(vec![
            Field::required("resumeText", FieldKind::String),
            Field::optional("jobDescription", FieldKind::String),
            Field::required(
                "experience",
                FieldKind::array_of(FieldKind::object(vec![
                    Field::required("title", FieldKind::String),
                    Field::optional("highlights", FieldKind::array_of(FieldKind::String)),
                ])),
            ),
            Field::optional("document", FieldKind::Media),
        ])
    }

    fn check(src: &str) -> Result<(), TemplateError> {
        Template::parse(src).unwrap().check(&schema())
    }

    #[test]
    fn test_declared_fields_pass() {
        let src = "{{resumeText}}{{#if jobDescription}}{{jobDescription}}{{/if}}\
                   {{#each experience}}{{this.title}}{{#each this.highlights}}{{this}}{{/each}}{{/each}}\
                   {{#if document}}{{media document}}{{/if}}";
        assert_eq!(check(src), Ok(()));
    }

    #[test]
    fn test_undeclared_field_fails() {
        assert_eq!(
            check("{{companyName}}"),
            Err(TemplateError::UndeclaredField("companyName".into()))
        );
    }

    #[test]
    fn test_undeclared_field_inside_conditional_fails() {
        assert_eq!(
            check("{{#if jobDescription}}{{jobTitle}}{{/if}}"),
            Err(TemplateError::UndeclaredField("jobTitle".into()))
        );
    }

    #[test]
    fn test_undeclared_element_field_fails() {
        assert_eq!(
            check("{{#each experience}}{{this.company}}{{/each}}"),
            Err(TemplateError::UndeclaredField("this.company".into()))
        );
    }

    #[test]
    fn test_this_outside_each_fails() {
        assert_eq!(check("{{this}}"), Err(TemplateError::ThisOutsideEach));
    }

    #[test]
    fn test_each_over_scalar_fails() {
        assert!(matches!(
            check("{{#each resumeText}}x{{/each}}"),
            Err(TemplateError::KindMismatch { helper: "each", .. })
        ));
    }

    #[test]
    fn test_media_over_string_fails() {
        assert!(matches!(
            check("{{media resumeText}}"),
            Err(TemplateError::KindMismatch { helper: "media", .. })
        ));
    }

    #[test]
    fn test_scope_is_popped_after_each() {
        assert_eq!(
            check("{{#each experience}}{{this.title}}{{/each}}{{this}}"),
            Err(TemplateError::ThisOutsideEach)
        );
    }
}
