//! Unordered lists: `* item`, `** nested item`, ….
//!
//! Grounded in `parse_unordered_list`/`parse_unordered_list_item` in
//! `examples/original_source/wikiparse/parser.py`. Ordered lists (`#` at
//! line start) are deliberately left unimplemented — `spec.md` §9 flags
//! this as an open question rather than a defect, so `Node::List` carries
//! no `ordered` flag at all; every list this parser produces is unordered.

use super::{consume_blanklines, consume_count, consume_trailing_space, consume_whitespace, parse_text};
use crate::ast::{ListItem, Node, Strip};
use crate::source::{Cursor, PResult};

pub(crate) fn parse_unordered_list(cursor: &mut Cursor) -> PResult<Node> {
    let mut items = Vec::new();

    loop {
        items.push(parse_unordered_list_item(cursor)?);

        if consume_trailing_space(cursor).is_err() {
            break;
        }
        consume_blanklines(cursor);
        if !(cursor.is_line_start() && cursor.peek_char() == Some('*')) {
            break;
        }
    }

    Ok(Node::List(items))
}

fn parse_unordered_list_item(cursor: &mut Cursor) -> PResult<ListItem> {
    if !cursor.is_line_start() {
        return cursor.err("list items must be placed on a new line");
    }
    consume_whitespace(cursor);
    if cursor.peek_char() != Some('*') {
        return cursor.err("expected '*' (start of list item)");
    }

    let depth = consume_count(cursor, '*');
    consume_whitespace(cursor);
    let content = parse_text(cursor, &|c| c.is_empty() || c.peek_char() == Some('\n'), false, Strip::Both)?;
    Ok(ListItem { depth, content })
}
