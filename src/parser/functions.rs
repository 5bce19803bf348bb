//! Parser functions: `{{#if:}}`, `{{#ifeq:}}`, `{{#ifexist:}}`, `{{#switch:}}`,
//! `{{#invoke:}}`.
//!
//! Grounded in `parse_function`/`_parse_function_*`/`tplterm` in
//! `examples/original_source/wikiparse/parser.py`.

use super::braces::{parse_template_args, parse_template_name};
use super::{consume_any_whitespace, consume_pipe, consume_tpl_close, parse_text};
use crate::ast::{Node, Strip, SwitchBranch};
use crate::source::{Cursor, PResult};

/// Terminator shared by every parser-function clause body: a bare `|` or
/// the `}}` that closes the whole function call.
pub(crate) fn tplterm(cursor: &Cursor) -> bool {
    cursor.peek_str("|", true, true).unwrap_or(false) || cursor.peek_str("}}", true, true).unwrap_or(false)
}

/// Lookahead-only test for "is this a `{{#…` parser function call", without
/// consuming anything.
pub(crate) fn is_function(cursor: &Cursor) -> bool {
    let mut probe = *cursor;
    if !probe.eat("{{") {
        return false;
    }
    consume_any_whitespace(&mut probe);
    probe.eat("#")
}

pub(crate) fn parse_function(cursor: &mut Cursor) -> PResult<Node> {
    if !is_function(cursor) {
        return cursor.err("expected start of function (e.g. \"{{#\")");
    }

    cursor.eat("{{");
    consume_any_whitespace(cursor);
    cursor.eat("#");
    consume_any_whitespace(cursor);

    if cursor.peek_str("if:", true, true).unwrap_or(false) {
        parse_if(cursor)
    } else if cursor.peek_str("ifeq:", true, true).unwrap_or(false) {
        parse_ifeq(cursor)
    } else if cursor.peek_str("ifexist:", true, true).unwrap_or(false) {
        parse_ifexist(cursor)
    } else if cursor.peek_str("switch:", true, true).unwrap_or(false) {
        parse_switch(cursor)
    } else if cursor.peek_str("invoke:", true, true).unwrap_or(false) {
        parse_invoke(cursor)
    } else {
        cursor.err("unknown flow control")
    }
}

fn parse_clause_value(cursor: &mut Cursor) -> PResult<Vec<Node>> {
    parse_text(cursor, &tplterm, false, Strip::Both)
}

/// `if: cond | true | false?`.
fn parse_if(cursor: &mut Cursor) -> PResult<Node> {
    if !cursor.eat("if:") {
        return cursor.err("expected \"if:\" (start of if clause)");
    }

    let condition = parse_clause_value(cursor)?;
    consume_pipe(cursor, false)?;
    let then = parse_clause_value(cursor)?;

    let r#else = if consume_pipe(cursor, true)? { Some(parse_clause_value(cursor)?) } else { None };
    consume_pipe(cursor, true)?;
    consume_tpl_close(cursor, true)?;

    Ok(Node::If { condition, then, r#else })
}

/// `ifeq: lhs | rhs | true | false?`.
fn parse_ifeq(cursor: &mut Cursor) -> PResult<Node> {
    if !cursor.eat("ifeq:") {
        return cursor.err("expected \"ifeq:\" (start of comparison clause)");
    }

    let left = parse_clause_value(cursor)?;
    consume_pipe(cursor, false)?;
    let right = parse_clause_value(cursor)?;
    consume_pipe(cursor, false)?;
    let then = parse_clause_value(cursor)?;

    let r#else = if consume_pipe(cursor, true)? { Some(parse_clause_value(cursor)?) } else { None };
    consume_pipe(cursor, true)?;
    consume_tpl_close(cursor, true)?;

    Ok(Node::IfEq { left, right, then, r#else })
}

/// `ifexist: file | true | false?`.
fn parse_ifexist(cursor: &mut Cursor) -> PResult<Node> {
    if !cursor.eat("ifexist:") {
        return cursor.err("expected \"ifexist:\" (start of existential clause)");
    }

    let page = parse_template_name(cursor)?;
    consume_pipe(cursor, false)?;
    let then = parse_clause_value(cursor)?;

    let r#else = if consume_pipe(cursor, true)? { Some(parse_clause_value(cursor)?) } else { None };
    consume_pipe(cursor, true)?;
    consume_tpl_close(cursor, true)?;

    Ok(Node::IfExist { page, then, r#else })
}

/// `switch: value | branch ( | branch )*`.
fn parse_switch(cursor: &mut Cursor) -> PResult<Node> {
    if !cursor.eat("switch:") {
        return cursor.err("expected \"switch:\" statement");
    }

    let value = parse_clause_value(cursor)?;
    consume_pipe(cursor, false)?;

    let mut branches = Vec::new();
    let mut default = None;
    loop {
        let (cases, result, is_default) = parse_switch_branch(cursor)?;
        if is_default {
            default = Some(result);
        } else {
            branches.push(SwitchBranch { cases, result });
        }
        if !consume_pipe(cursor, true)? {
            break;
        }
    }
    consume_tpl_close(cursor, true)?;

    Ok(Node::Switch { value, branches, default })
}

/// One `ref ( , ref )* = result` or bare `result` (the `#default` branch)
/// arm of a `{{#switch:}}`.
///
/// A candidate ref is speculatively read up to `=`/`|`/`}`; if it turns out
/// to be immediately followed by the closing `}}`, it was actually the bare
/// replacement value, not a ref — the read is rolled back so the value can
/// be re-parsed for real below.
fn parse_switch_branch(cursor: &mut Cursor) -> PResult<(Vec<Vec<Node>>, Vec<Node>, bool)> {
    let mut refs: Vec<Vec<Node>> = Vec::new();

    let mut add_ref = |cursor: &mut Cursor| -> PResult<bool> {
        let mut candidate = *cursor;
        let text = parse_text(
            &mut candidate,
            &|c| matches!(c.peek_char(), Some('=') | Some('|') | Some('}')),
            false,
            Strip::Both,
        )?;

        let mut probe = candidate;
        if consume_tpl_close(&mut probe, true)? {
            // What was read is actually the bare default's value, not a
            // ref: leave `cursor` untouched so it can be re-read below.
            Ok(true)
        } else {
            *cursor = candidate;
            refs.push(text);
            Ok(false)
        }
    };

    if add_ref(cursor)? {
        let result = parse_clause_value(cursor)?;
        consume_tpl_close(cursor, false)?;
        return Ok((refs, result, true));
    }
    while consume_pipe(cursor, true)? {
        if add_ref(cursor)? {
            let result = parse_clause_value(cursor)?;
            consume_tpl_close(cursor, false)?;
            return Ok((refs, result, true));
        }
    }

    if cursor.eat("=") {
        let result = parse_clause_value(cursor)?;
        Ok((refs, result, false))
    } else {
        cursor.err("expected '=' (switch branch result)")
    }
}

/// `invoke: module | function | args…`.
fn parse_invoke(cursor: &mut Cursor) -> PResult<Node> {
    if !cursor.eat("invoke:") {
        return cursor.err("expected \"invoke:\" (start of invocation)");
    }

    let module = parse_template_name(cursor)?;
    consume_pipe(cursor, false)?;
    let function = parse_template_name(cursor)?;
    let args = parse_template_args(cursor)?;
    consume_tpl_close(cursor, true)?;

    Ok(Node::Invoke { module, function, args })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Arg;

    #[test]
    fn if_with_both_branches() {
        let mut cursor = Cursor::new("{{#if: x | t | f}}", "");
        let node = parse_function(&mut cursor).unwrap();
        assert_eq!(
            node,
            Node::If {
                condition: vec![Node::Text("x".into())],
                then: vec![Node::Text("t".into())],
                r#else: Some(vec![Node::Text("f".into())]),
            }
        );
    }

    #[test]
    fn switch_with_shared_case_and_default() {
        let mut cursor = Cursor::new("{{#switch: a | a | b = hit | fallback }}", "");
        let node = parse_function(&mut cursor).unwrap();
        let Node::Switch { value, branches, default } = node else { panic!("expected switch") };
        assert_eq!(value, vec![Node::Text("a".into())]);
        assert_eq!(branches.len(), 1);
        assert_eq!(
            branches[0].cases,
            vec![vec![Node::Text("a".into())], vec![Node::Text("b".into())]]
        );
        assert_eq!(branches[0].result, vec![Node::Text("hit".into())]);
        assert_eq!(default, Some(vec![Node::Text("fallback".into())]));
    }

    #[test]
    fn invoke_parses_module_function_and_args() {
        let mut cursor = Cursor::new("{{#invoke:Mod|fn|1|k=v}}", "");
        let node = parse_function(&mut cursor).unwrap();
        assert_eq!(
            node,
            Node::Invoke {
                module: vec![Node::Text("Mod".into())],
                function: vec![Node::Text("fn".into())],
                args: vec![
                    Arg::Positional(vec![Node::Text("1".into())]),
                    Arg::Named { name: vec![Node::Text("k".into())], value: vec![Node::Text("v".into())] },
                ],
            }
        );
    }
}
