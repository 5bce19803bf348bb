//! `''italic''` / `'''bold'''` / `'''''bold+italic'''''` and `[[link]]`.
//!
//! Grounded in `parse_formatting`/`parse_link` in
//! `examples/original_source/wikiparse/parser.py`. Formatting content is a
//! single raw run up to the next apostrophe, not recursively parsed — the
//! original never recurses here either.

use super::parse_text;
use crate::ast::{Node, Strip};
use crate::source::{Cursor, PResult};

/// `''…''`, `'''…'''`, or `'''''…'''''`, longest marker tried first so that
/// `'''''` isn't misread as italic followed by a stray `'''`.
pub(crate) fn parse_formatting(cursor: &mut Cursor) -> PResult<Node> {
    if cursor.eat("'''''") {
        let text = consume_until_quote(cursor)?;
        if !cursor.eat("'''''") {
            return cursor.err("expected \"'''''\" (end of bold & italic formatting)");
        }
        return Ok(Node::Bold(vec![Node::Italic(text_nodes(text))]));
    }

    if cursor.eat("'''") {
        let text = consume_until_quote(cursor)?;
        if !cursor.eat("'''") {
            return cursor.err("expected \"'''\" (end of bold formatting)");
        }
        return Ok(Node::Bold(text_nodes(text)));
    }

    if cursor.eat("''") {
        let text = consume_until_quote(cursor)?;
        if !cursor.eat("''") {
            return cursor.err("expected \"''\" (end of italic formatting)");
        }
        return Ok(Node::Italic(text_nodes(text)));
    }

    cursor.err("expected \"'\" (start of formatting)")
}

fn consume_until_quote(cursor: &mut Cursor) -> PResult<String> {
    cursor.consume_until(false, |c| c.peek_char() == Some('\''))
}

fn text_nodes(text: String) -> Vec<Node> {
    if text.is_empty() { Vec::new() } else { vec![Node::Text(text)] }
}

/// `[[url|label]]` or `[[url]]`. Without a `|`, `label` is left unset so
/// the caller/renderer falls back to `target`.
pub(crate) fn parse_link(cursor: &mut Cursor) -> PResult<Node> {
    if !cursor.eat("[[") {
        return cursor.err("expected \"[[\" (start of link)");
    }

    let target = parse_text(cursor, &|c| matches!(c.peek_char(), Some('|') | Some(']')), false, Strip::None)?;

    let label = if cursor.eat("|") {
        Some(parse_text(
            cursor,
            &|c| c.peek_str("]]", true, true).unwrap_or(false),
            false,
            Strip::None,
        )?)
    } else {
        None
    };

    if !cursor.eat("]]") {
        return cursor.err("expected \"]]\" (end of link)");
    }

    Ok(Node::Link { target, label })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::Cursor;

    fn parse_fmt(src: &str) -> Node {
        let mut cursor = Cursor::new(src, "");
        parse_formatting(&mut cursor).expect("formatting should parse")
    }

    #[test]
    fn italic_then_bold() {
        assert_eq!(parse_fmt("''italic''"), Node::Italic(vec![Node::Text("italic".into())]));
    }

    #[test]
    fn bold_italic_combo() {
        assert_eq!(
            parse_fmt("'''''both'''''"),
            Node::Bold(vec![Node::Italic(vec![Node::Text("both".into())])])
        );
    }

    #[test]
    fn link_without_label_leaves_it_unset() {
        let mut cursor = Cursor::new("[[Target]]", "");
        let node = parse_link(&mut cursor).unwrap();
        assert_eq!(
            node,
            Node::Link { target: vec![Node::Text("Target".into())], label: None }
        );
    }

    #[test]
    fn link_with_label() {
        let mut cursor = Cursor::new("[[Target|Label]]", "");
        let node = parse_link(&mut cursor).unwrap();
        assert_eq!(
            node,
            Node::Link {
                target: vec![Node::Text("Target".into())],
                label: Some(vec![Node::Text("Label".into())]),
            }
        );
    }
}
