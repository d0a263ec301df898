use super::{FieldPath, Node, TemplateError};

enum Token<'a> {
    Text(&'a str),
    Tag(&'a str),
}

/// How a nested `parse_nodes` call stopped.
#[derive(PartialEq)]
enum Stop {
    End,
    Else,
    Close,
}

pub(super) fn parse(source: &str) -> Result<Vec<Node>, TemplateError> {
    let tokens = tokenize(source)?;
    let mut iter = tokens.into_iter();
    let (nodes, _) = parse_nodes(&mut iter, None)?;
    Ok(nodes)
}

fn tokenize(source: &str) -> Result<Vec<Token<'_>>, TemplateError> {
    let mut tokens = Vec::new();
    let mut rest = source;
    let mut offset = 0;
    // A block tag alone on its line swallows the line break that follows it.
    let mut strip_newline = false;
    // Only whitespace and block tags seen since the last line break.
    let mut line_clean = true;

    while let Some(start) = rest.find("{{") {
        let before = &rest[..start];
        if !before.is_empty() {
            push_text_token(&mut tokens, before, strip_newline);
            line_clean = match before.rfind('\n') {
                Some(i) => before[i + 1..].trim().is_empty(),
                None => line_clean && before.trim().is_empty(),
            };
        }
        let after = &rest[start + 2..];
        let end = after
            .find("}}")
            .ok_or(TemplateError::UnterminatedTag(offset + start))?;
        let body = after[..end].trim();
        if body.is_empty() {
            return Err(TemplateError::EmptyTag(offset + start));
        }
        tokens.push(Token::Tag(body));

        let consumed = start + 2 + end + 2;
        offset += consumed;
        rest = &rest[consumed..];

        let is_block = body.starts_with('#') || body.starts_with('/') || body == "else";
        let rest_of_line = rest.split('\n').next().unwrap_or("");
        strip_newline = is_block && line_clean && rest_of_line.trim().is_empty();
        if !is_block {
            line_clean = false;
        }
    }
    if !rest.is_empty() {
        push_text_token(&mut tokens, rest, strip_newline);
    }
    Ok(tokens)
}

fn push_text_token<'a>(tokens: &mut Vec<Token<'a>>, text: &'a str, strip_newline: bool) {
    let text = if strip_newline {
        let trimmed = text.trim_start_matches([' ', '\t']);
        trimmed
            .strip_prefix("\r\n")
            .or_else(|| trimmed.strip_prefix('\n'))
            .unwrap_or(text)
    } else {
        text
    };
    if !text.is_empty() {
        tokens.push(Token::Text(text));
    }
}

fn parse_nodes<'a, I>(tokens: &mut I, open: Option<&str>) -> Result<(Vec<Node>, Stop), TemplateError>
where
    I: Iterator<Item = Token<'a>>,
{
    let mut nodes = Vec::new();

    while let Some(token) = tokens.next() {
        let body = match token {
            Token::Text(text) => {
                nodes.push(Node::Text(text.to_string()));
                continue;
            }
            Token::Tag(body) => body,
        };

        if let Some(block) = body.strip_prefix('#') {
            let (helper, arg) = split_helper(block);
            let path = match helper {
                "if" | "each" if arg.is_empty() => {
                    return Err(TemplateError::MissingArgument(helper.to_string()))
                }
                "if" | "each" => parse_path(arg)?,
                other => return Err(TemplateError::UnknownHelper(other.to_string())),
            };
            let (body_nodes, stop) = parse_nodes(tokens, Some(helper))?;
            if helper == "if" {
                let otherwise = if stop == Stop::Else {
                    let (otherwise, stop) = parse_nodes(tokens, Some("if"))?;
                    if stop == Stop::Else {
                        return Err(TemplateError::StrayElse);
                    }
                    otherwise
                } else {
                    Vec::new()
                };
                nodes.push(Node::If {
                    path,
                    then: body_nodes,
                    otherwise,
                });
            } else {
                if stop == Stop::Else {
                    return Err(TemplateError::StrayElse);
                }
                nodes.push(Node::Each {
                    path,
                    body: body_nodes,
                });
            }
            continue;
        }

        if body == "else" {
            return if open == Some("if") {
                Ok((nodes, Stop::Else))
            } else {
                Err(TemplateError::StrayElse)
            };
        }

        if let Some(closing) = body.strip_prefix('/') {
            let closing = closing.trim();
            return if open == Some(closing) {
                Ok((nodes, Stop::Close))
            } else {
                Err(TemplateError::UnbalancedBlock {
                    expected: open.unwrap_or("").to_string(),
                    found: closing.to_string(),
                })
            };
        }

        let (helper, arg) = split_helper(body);
        if arg.is_empty() {
            nodes.push(Node::Value(parse_path(helper)?));
        } else if helper == "media" {
            nodes.push(Node::Media(parse_path(arg)?));
        } else {
            return Err(TemplateError::UnknownHelper(helper.to_string()));
        }
    }

    match open {
        Some(block) => Err(TemplateError::UnclosedBlock(block.to_string())),
        None => Ok((nodes, Stop::End)),
    }
}

fn split_helper(body: &str) -> (&str, &str) {
    match body.split_once(char::is_whitespace) {
        Some((helper, arg)) => (helper, arg.trim()),
        None => (body, ""),
    }
}

fn parse_path(raw: &str) -> Result<FieldPath, TemplateError> {
    let mut segments: Vec<&str> = raw.split('.').collect();
    let from_this = segments.first() == Some(&"this");
    if from_this {
        segments.remove(0);
    }
    let valid = segments.iter().all(|s| {
        !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    });
    if !valid || (!from_this && segments.is_empty()) {
        return Err(TemplateError::InvalidPath(raw.to_string()));
    }
    Ok(FieldPath {
        from_this,
        segments: segments.into_iter().map(String::from).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn root(segments: &[&str]) -> FieldPath {
        FieldPath {
            from_this: false,
            segments: segments.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_parse_text_and_value() {
        let nodes = parse("Role: {{ jobTitle }}!").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text("Role: ".into()),
                Node::Value(root(&["jobTitle"])),
                Node::Text("!".into()),
            ]
        );
    }

    #[test]
    fn test_parse_if_else() {
        let nodes = parse("{{#if a}}yes{{else}}no{{/if}}").unwrap();
        assert_eq!(
            nodes,
            vec![Node::If {
                path: root(&["a"]),
                then: vec![Node::Text("yes".into())],
                otherwise: vec![Node::Text("no".into())],
            }]
        );
    }

    #[test]
    fn test_parse_nested_each_with_this() {
        let nodes = parse("{{#each jobs}}{{#each this.tags}}{{this}}{{/each}}{{/each}}").unwrap();
        let Node::Each { body, .. } = &nodes[0] else {
            panic!("expected each");
        };
        let Node::Each { path, body } = &body[0] else {
            panic!("expected nested each");
        };
        assert!(path.from_this);
        assert_eq!(path.segments, vec!["tags"]);
        assert_eq!(
            body[0],
            Node::Value(FieldPath {
                from_this: true,
                segments: vec![]
            })
        );
    }

    #[test]
    fn test_standalone_block_tags_swallow_newline() {
        let nodes = parse("A\n{{#if x}}\nB\n{{/if}}\nC").unwrap();
        assert_eq!(
            nodes,
            vec![
                Node::Text("A\n".into()),
                Node::If {
                    path: root(&["x"]),
                    then: vec![Node::Text("B\n".into())],
                    otherwise: vec![],
                },
                Node::Text("C".into()),
            ]
        );
    }

    #[test]
    fn test_inline_block_tags_keep_newline() {
        let nodes = parse("a {{#if x}}b{{/if}}\nc").unwrap();
        assert_eq!(nodes.last(), Some(&Node::Text("\nc".into())));
    }

    #[test]
    fn test_adjacent_closing_tags_on_one_line() {
        let nodes = parse("{{#each a}}\n{{#if this}}\nx\n{{/if}}{{/each}}\ny").unwrap();
        assert_eq!(nodes.last(), Some(&Node::Text("y".into())));
    }

    #[test]
    fn test_media_helper() {
        let nodes = parse("{{media document}}").unwrap();
        assert_eq!(nodes, vec![Node::Media(root(&["document"]))]);
    }

    #[test]
    fn test_unterminated_tag() {
        assert_eq!(parse("abc {{name"), Err(TemplateError::UnterminatedTag(4)));
    }

    #[test]
    fn test_empty_tag() {
        assert_eq!(parse("{{  }}"), Err(TemplateError::EmptyTag(0)));
    }

    #[test]
    fn test_unclosed_block() {
        assert_eq!(
            parse("{{#each items}}x"),
            Err(TemplateError::UnclosedBlock("each".into()))
        );
    }

    #[test]
    fn test_mismatched_close() {
        assert_eq!(
            parse("{{#if a}}x{{/each}}"),
            Err(TemplateError::UnbalancedBlock {
                expected: "if".into(),
                found: "each".into()
            })
        );
    }

    #[test]
    fn test_stray_else() {
        assert_eq!(parse("x{{else}}y"), Err(TemplateError::StrayElse));
        assert_eq!(
            parse("{{#each a}}x{{else}}y{{/each}}"),
            Err(TemplateError::StrayElse)
        );
        assert_eq!(
            parse("{{#if a}}x{{else}}y{{else}}z{{/if}}"),
            Err(TemplateError::StrayElse)
        );
    }

    #[test]
    fn test_unknown_helper() {
        assert_eq!(
            parse("{{#unless a}}x{{/unless}}"),
            Err(TemplateError::UnknownHelper("unless".into()))
        );
        assert_eq!(
            parse("{{upper name}}"),
            Err(TemplateError::UnknownHelper("upper".into()))
        );
    }

    #[test]
    fn test_missing_argument() {
        assert_eq!(
            parse("{{#if}}x{{/if}}"),
            Err(TemplateError::MissingArgument("if".into()))
        );
    }

    #[test]
    fn test_invalid_path() {
        assert_eq!(parse("{{a..b}}"), Err(TemplateError::InvalidPath("a..b".into())));
        assert_eq!(parse("{{a[0]}}"), Err(TemplateError::InvalidPath("a[0]".into())));
    }
}
