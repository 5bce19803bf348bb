//! HTML-flavored constructs embedded in WikiText: comments, `<nowiki>`, the
//! inclusion-control tags, the `<b>`/`<i>`/`<u>`/`<br>` shortcuts, and
//! generic elements.
//!
//! Grounded in `parse_html`/`parse_generic_html`/`consume_opentag`/
//! `consume_closetag`/`consume_selfclosing_tag` in
//! `examples/original_source/wikiparse/parser.py`. The `<i>` shortcut there
//! never consumes its own closing tag — a bug fixed here so it behaves the
//! same as `<b>` and `<u>`.

use super::{consume_whitespace, parse_braces, parse_text};
use crate::ast::{HtmlAttribute, Node, Strip};
use crate::source::{Cursor, PResult};

pub(crate) fn parse_html(cursor: &mut Cursor) -> PResult<Node> {
    if cursor.eat("<!--") {
        return parse_comment(cursor);
    }

    if consume_selfclosing_tag(cursor, "nowiki") {
        return Ok(Node::NoWiki(String::new()));
    }
    if consume_opentag(cursor, "nowiki") {
        let content = cursor.consume_until(false, |c| peeks_closetag(c, "nowiki"))?;
        consume_closetag(cursor, "nowiki");
        return Ok(Node::NoWiki(content));
    }

    for tag in ["noinclude", "onlyinclude", "includeonly"] {
        if consume_opentag(cursor, tag) {
            let content = parse_text(cursor, &|c| peeks_closetag(c, tag), false, Strip::None)?;
            consume_closetag(cursor, tag);
            return Ok(match tag {
                "noinclude" => Node::NoInclude(content),
                "onlyinclude" => Node::OnlyInclude(content),
                _ => Node::IncludeOnly(content),
            });
        }
    }

    if consume_opentag(cursor, "b") {
        let content = parse_text(cursor, &|c| peeks_closetag(c, "b"), false, Strip::None)?;
        consume_closetag(cursor, "b");
        return Ok(Node::Bold(content));
    }

    if consume_opentag(cursor, "i") {
        let content = parse_text(cursor, &|c| peeks_closetag(c, "i"), false, Strip::None)?;
        consume_closetag(cursor, "i");
        return Ok(Node::Italic(content));
    }

    if consume_opentag(cursor, "u") {
        let content = parse_text(cursor, &|c| peeks_closetag(c, "u"), false, Strip::None)?;
        consume_closetag(cursor, "u");
        return Ok(Node::Underline(content));
    }

    if consume_opentag(cursor, "br") || consume_selfclosing_tag(cursor, "br") {
        return Ok(Node::LineBreak);
    }

    parse_generic_html(cursor)
}

fn parse_comment(cursor: &mut Cursor) -> PResult<Node> {
    while cursor.eat("-") {}
    consume_whitespace(cursor);

    let mut content = String::new();
    while !cursor.eat("-->") {
        content.push(cursor.next_char()?);
    }
    let content = content.trim_end_matches([' ', '-']).to_string();
    Ok(Node::Comment(content))
}

/// `<tagname attr="value" ...>children</tagname>` or the self-closing form
/// `<tagname attr="value" .../>` (`children` left `None`).
fn parse_generic_html(cursor: &mut Cursor) -> PResult<Node> {
    consume_whitespace(cursor);
    if !cursor.eat("<") {
        return cursor.err("expected \"<\" (start of HTML tag)");
    }
    consume_whitespace(cursor);
    if cursor.eat("/") {
        return cursor.err("orphaned closing tag");
    }

    let tag = parse_tagname(cursor)?;
    let mut attributes = Vec::new();

    consume_whitespace(cursor);
    while !matches!(cursor.peek_char(), Some('/') | Some('>')) {
        attributes.push(parse_attribute(cursor)?);
        consume_whitespace(cursor);
    }

    if cursor.eat("/") {
        consume_whitespace(cursor);
        if !cursor.eat(">") {
            return cursor.err("expected \">\" (end of HTML tag)");
        }
        return Ok(Node::Html { tag, attributes, children: None });
    }

    if !cursor.eat(">") {
        return cursor.err("expected \">\" (end of HTML tag)");
    }

    match cursor.try_parse(|c| {
        let contents = parse_text(c, &|c2| peeks_closetag(c2, &tag), false, Strip::None)?;
        if !consume_closetag(c, &tag) {
            return c.err("missing closing tag");
        }
        Ok(contents)
    }) {
        Ok(contents) => Ok(Node::Html { tag, attributes, children: Some(contents) }),
        Err(_) => Ok(Node::Html { tag, attributes, children: Some(Vec::new()) }),
    }
}

fn parse_tagname(cursor: &mut Cursor) -> PResult<String> {
    let mut tag = String::new();
    consume_whitespace(cursor);
    if cursor.eat(":") {
        tag.push(':');
    }

    let c = cursor.next_char()?;
    if !c.is_alphabetic() {
        return cursor.err(format!("unexpected {c:?}, expected tagname"));
    }
    tag.push(c);

    while cursor
        .peek_char()
        .is_some_and(|c| !c.is_whitespace() && c != '/' && c != '>')
    {
        let c = cursor.next_char()?;
        if !c.is_alphanumeric() && !matches!(c, '-' | '_' | ':') {
            return cursor.err(format!("unexpected {c:?}, expected tagname"));
        }
        tag.push(c);
    }
    Ok(tag)
}

fn parse_attribute(cursor: &mut Cursor) -> PResult<HtmlAttribute> {
    let name = parse_attribute_name(cursor)?;
    consume_whitespace(cursor);

    let value = if cursor.eat("=") {
        consume_whitespace(cursor);
        parse_attribute_value(cursor)?
    } else {
        Vec::new()
    };

    Ok(HtmlAttribute { name, value })
}

fn parse_attribute_name(cursor: &mut Cursor) -> PResult<String> {
    let mut name = String::new();
    consume_whitespace(cursor);
    if cursor.eat(":") {
        name.push(':');
    }

    let c = cursor.next_char()?;
    if !c.is_alphabetic() {
        return cursor.err(format!("unexpected {c:?}, expected attribute name"));
    }
    name.push(c);

    while cursor
        .peek_char()
        .is_some_and(|c| !c.is_whitespace() && !matches!(c, '=' | '/' | '>'))
    {
        let c = cursor.next_char()?;
        if !c.is_alphanumeric() && !matches!(c, '-' | '_' | ':') {
            return cursor.err(format!("unexpected {c:?}, expected attribute name"));
        }
        name.push(c);
    }
    Ok(name)
}

/// An attribute value may splice in `{{…}}` constructs, so it is modeled as
/// node content rather than a plain string.
fn parse_attribute_value(cursor: &mut Cursor) -> PResult<Vec<Node>> {
    if !cursor.eat("\"") {
        return cursor.err("expected '\"' (start of HTML attribute value)");
    }

    let mut result = Vec::new();
    let mut text = String::new();

    while cursor.peek_char() != Some('"') {
        if cursor.peek_str("{{", true, true).unwrap_or(false) {
            if !text.is_empty() {
                result.push(Node::Text(std::mem::take(&mut text)));
            }
            result.push(parse_braces(cursor)?);
        } else if cursor.eat("\\") {
            text.push(cursor.next_char()?);
        } else {
            text.push(cursor.next_char()?);
        }
    }
    if !text.is_empty() {
        result.push(Node::Text(text));
    }

    if !cursor.eat("\"") {
        return cursor.err("expected '\"' (end of HTML attribute value)");
    }
    Ok(result)
}

/// Consumes `<tag ...>`, tolerating surrounding whitespace. Leaves the
/// cursor untouched on a non-match.
fn consume_opentag(cursor: &mut Cursor, tag: &str) -> bool {
    let mut child = *cursor;
    if !child.eat("<") {
        return false;
    }
    consume_whitespace(&mut child);
    if !child.consume(tag, false, true).unwrap_or(false) {
        return false;
    }
    consume_whitespace(&mut child);
    if !child.eat(">") {
        return false;
    }
    *cursor = child;
    true
}

/// Lookahead-only form of [`consume_closetag`], for use as a `parse_text`
/// terminator predicate (which only gets `&Cursor`).
fn peeks_closetag(cursor: &Cursor, tag: &str) -> bool {
    let mut probe = *cursor;
    consume_closetag(&mut probe, tag)
}

/// Consumes `</tag>`, tolerating surrounding whitespace. Leaves the cursor
/// untouched on a non-match.
fn consume_closetag(cursor: &mut Cursor, tag: &str) -> bool {
    let mut child = *cursor;
    if !child.eat("<") {
        return false;
    }
    consume_whitespace(&mut child);
    if !child.eat("/") {
        return false;
    }
    consume_whitespace(&mut child);
    if !child.consume(tag, false, true).unwrap_or(false) {
        return false;
    }
    consume_whitespace(&mut child);
    if !child.eat(">") {
        return false;
    }
    *cursor = child;
    true
}

/// Consumes `<tag/>`, tolerating whitespace before the `/` and before `>`.
fn consume_selfclosing_tag(cursor: &mut Cursor, tag: &str) -> bool {
    let mut child = *cursor;
    if !child.eat("<") {
        return false;
    }
    consume_whitespace(&mut child);
    if !child.consume(tag, false, true).unwrap_or(false) {
        return false;
    }
    consume_whitespace(&mut child);
    if !child.eat("/") {
        return false;
    }
    consume_whitespace(&mut child);
    if !child.eat(">") {
        return false;
    }
    *cursor = child;
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comment_trims_trailing_dashes_and_space() {
        let mut cursor = Cursor::new("<!-- note -- -->", "");
        assert_eq!(parse_html(&mut cursor).unwrap(), Node::Comment("note".to_string()));
    }

    #[test]
    fn italic_shortcut_consumes_its_closing_tag() {
        let mut cursor = Cursor::new("<i>word</i> rest", "");
        let node = parse_html(&mut cursor).unwrap();
        assert_eq!(node, Node::Italic(vec![Node::Text("word".to_string())]));
        assert_eq!(cursor.rest(), " rest");
    }

    #[test]
    fn self_closing_nowiki_is_empty() {
        let mut cursor = Cursor::new("<nowiki/>", "");
        assert_eq!(parse_html(&mut cursor).unwrap(), Node::NoWiki(String::new()));
    }

    #[test]
    fn generic_tag_with_attribute_and_children() {
        let mut cursor = Cursor::new(r#"<span class="x">hi</span>"#, "");
        let node = parse_html(&mut cursor).unwrap();
        assert_eq!(
            node,
            Node::Html {
                tag: "span".to_string(),
                attributes: vec![HtmlAttribute {
                    name: "class".to_string(),
                    value: vec![Node::Text("x".to_string())],
                }],
                children: Some(vec![Node::Text("hi".to_string())]),
            }
        );
    }

    #[test]
    fn self_closing_generic_tag_has_no_children() {
        let mut cursor = Cursor::new("<hr/>", "");
        assert_eq!(
            parse_html(&mut cursor).unwrap(),
            Node::Html { tag: "hr".to_string(), attributes: Vec::new(), children: None }
        );
    }
}
