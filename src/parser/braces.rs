//! `{{{variable}}}`, `{{template}}`, and the shared "name"/argument-list
//! grammar they and `#invoke:` build on.
//!
//! Grounded in `parse_braces`/`parse_variable`/`parse_template`/
//! `parse_template_name`/`parse_template_args`/`parse_template_arg` in
//! `examples/original_source/wikiparse/parser.py`.

use super::{consume_pipe, functions, parse_text};
use crate::ast::{Arg, Node, Strip, trim_text_nodes};
use crate::source::{Cursor, Failure, PResult};

/// Dispatches a `{{`-opener to a variable, parser function, or template,
/// trying each in turn and restoring the cursor between attempts.
pub(crate) fn parse_braces(cursor: &mut Cursor) -> PResult<Node> {
    if let Ok(node) = cursor.try_parse(parse_variable) {
        return Ok(node);
    }

    if functions::is_function(cursor) {
        return functions::parse_function(cursor);
    }

    match cursor.try_parse(parse_template) {
        Ok(node) => Ok(node),
        Err(_) => cursor.err("failed to parse braces"),
    }
}

fn parse_variable(cursor: &mut Cursor) -> PResult<Node> {
    if !cursor.eat("{{{") {
        return cursor.err("expected \"{{{\" (start of variable)");
    }

    let name = parse_name(cursor, "|}")?;

    let default = if cursor.eat("|") {
        Some(parse_text(cursor, &|c| c.peek_char() == Some('}'), false, Strip::None)?)
    } else {
        None
    };

    if !cursor.eat("}}}") {
        return cursor.err("expected \"}}}\" (end of variable)");
    }

    Ok(Node::Variable { name, default })
}

fn parse_template(cursor: &mut Cursor) -> PResult<Node> {
    if !cursor.eat("{{") {
        return cursor.err("expected \"{{\" (start of template)");
    }

    let name = parse_template_name(cursor)?;
    let args = parse_template_args(cursor)?;

    if !cursor.eat("}}") {
        return cursor.err("expected \"}}\" (end of template)");
    }

    Ok(Node::Template { name, args })
}

/// A template/module name: plain text, with `{{{…}}}` variables and nested
/// `{{…}}` braces substitutable inline. `|` and `}` never appear literally;
/// any bare `{` not opening a recognized brace construct is an error.
pub(crate) fn parse_template_name(cursor: &mut Cursor) -> PResult<Vec<Node>> {
    let mut result = Vec::new();
    let mut text = String::new();

    loop {
        let Some(c) = cursor.peek_char() else {
            return Err(Failure::Eof);
        };
        if c == '|' || c == '}' {
            break;
        }
        if c == '{' {
            flush(&mut result, &mut text);
            match cursor.try_parse(parse_braces) {
                Ok(node) => result.push(node),
                Err(_) => return cursor.err("illegal reserved character '{'"),
            }
        } else {
            text.push(cursor.next_char()?);
        }
    }

    flush(&mut result, &mut text);
    Ok(trim_text_nodes(result, Strip::Both))
}

/// A variable name: like [`parse_template_name`], but a bare `{` may only
/// introduce another `{{{…}}}` variable, never an arbitrary brace
/// construct — this mirrors `parse_variable_name`'s stricter grammar.
fn parse_name(cursor: &mut Cursor, delims: &str) -> PResult<Vec<Node>> {
    let mut result = Vec::new();
    let mut text = String::new();

    loop {
        let Some(c) = cursor.peek_char() else {
            return Err(Failure::Eof);
        };
        if delims.contains(c) {
            break;
        }
        if c == '{' {
            flush(&mut result, &mut text);
            if cursor.peek_str("{{{", true, true).unwrap_or(false) {
                result.push(parse_variable(cursor)?);
            } else {
                return cursor.err("illegal reserved character '{'");
            }
        } else {
            text.push(cursor.next_char()?);
        }
    }

    flush(&mut result, &mut text);
    Ok(trim_text_nodes(result, Strip::Both))
}

fn flush(result: &mut Vec<Node>, text: &mut String) {
    if !text.is_empty() {
        result.push(Node::Text(std::mem::take(text)));
    }
}

/// Parses the `|`-delimited argument list following a template/invoke name,
/// collecting positional and named arguments into a single order-preserving
/// list (see `Arg`).
pub(crate) fn parse_template_args(cursor: &mut Cursor) -> PResult<Vec<Arg>> {
    let mut args = Vec::new();
    while consume_pipe(cursor, true)? {
        args.push(parse_template_arg(cursor)?);
    }
    Ok(args)
}

fn parse_template_arg(cursor: &mut Cursor) -> PResult<Arg> {
    let named = cursor.try_parse(|c| {
        let name = parse_name(c, "=|}")?;
        if !c.eat("=") {
            return c.err("expected '=' (key-value pair)");
        }
        let value = parse_text(c, &|c2| matches!(c2.peek_char(), Some('|') | Some('}')), false, Strip::Both)?;
        Ok(Arg::Named { name, value })
    });

    if let Ok(arg) = named {
        return Ok(arg);
    }

    let value = parse_text(cursor, &|c| matches!(c.peek_char(), Some('|') | Some('}')), false, Strip::Both)?;
    Ok(Arg::Positional(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn template_with_positional_and_named_args() {
        let mut cursor = Cursor::new("{{Foo|bar|baz=quux}}", "");
        let node = parse_template(&mut cursor).unwrap();
        assert_eq!(
            node,
            Node::Template {
                name: vec![Node::Text("Foo".into())],
                args: vec![
                    Arg::Positional(vec![Node::Text("bar".into())]),
                    Arg::Named {
                        name: vec![Node::Text("baz".into())],
                        value: vec![Node::Text("quux".into())],
                    },
                ],
            }
        );
    }

    #[test]
    fn variable_with_default() {
        let mut cursor = Cursor::new("{{{name|fallback}}}", "");
        let node = parse_variable(&mut cursor).unwrap();
        assert_eq!(
            node,
            Node::Variable {
                name: vec![Node::Text("name".into())],
                default: Some(vec![Node::Text("fallback".into())]),
            }
        );
    }

    #[test]
    fn variable_without_default() {
        let mut cursor = Cursor::new("{{{name}}}", "");
        let node = parse_variable(&mut cursor).unwrap();
        assert_eq!(node, Node::Variable { name: vec![Node::Text("name".into())], default: None });
    }
}
