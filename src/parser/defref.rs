//! `[1,3-5,9a]`-style sense-reference markers, a Wiktionary-specific
//! extension to standard WikiText.
//!
//! Grounded in `parse_defref`/`parse_defref_ids`/`parse_defref_id` in
//! `examples/original_source/wikiparse/parser.py`.

use super::consume_whitespace;
use crate::ast::Node;
use crate::source::{Cursor, PResult};
use std::collections::BTreeSet;

/// What a `[...]` attempt produced: an ordinary defref node, or a `[?]`
/// that the enclosing text production must drop without emitting anything
/// (see `crate::parser::parse_text`).
pub(crate) enum DefRefOutcome {
    Node(Node),
    Skip,
}

pub(crate) fn parse_defref(cursor: &mut Cursor) -> PResult<DefRefOutcome> {
    if cursor.eat("[*]") {
        return Ok(DefRefOutcome::Node(Node::DefRef(vec!["*".to_string()])));
    }
    if cursor.eat("[?]") {
        return Ok(DefRefOutcome::Skip);
    }

    if !cursor.eat("[") {
        return cursor.err("expected '[' (start of defref)");
    }

    let ids = parse_defref_ids(cursor)?;

    if !cursor.eat("]") {
        return cursor.err("expected ']' (end of defref)");
    }

    Ok(DefRefOutcome::Node(Node::DefRef(ids)))
}

/// Parses a comma-separated list of defref ids, expanding `n-m` ranges
/// eagerly and returning the combined set sorted ascending by numeric
/// prefix then letter suffix (`spec.md` §3's `defref.ids` invariant).
fn parse_defref_ids(cursor: &mut Cursor) -> PResult<Vec<String>> {
    let mut ids: BTreeSet<(u64, String)> = BTreeSet::new();

    consume_whitespace(cursor);
    collect_ids(cursor, &mut ids)?;
    consume_whitespace(cursor);

    while cursor.eat(",") {
        consume_whitespace(cursor);
        collect_ids(cursor, &mut ids)?;
        consume_whitespace(cursor);
    }

    Ok(ids.into_iter().map(|(n, suffix)| format!("{n}{suffix}")).collect())
}

fn collect_ids(cursor: &mut Cursor, ids: &mut BTreeSet<(u64, String)>) -> PResult<()> {
    for id in parse_defref_id(cursor)? {
        let digits: String = id.chars().take_while(char::is_ascii_digit).collect();
        let suffix: String = id.chars().skip(digits.len()).collect();
        ids.insert((digits.parse().unwrap_or(0), suffix));
    }
    Ok(())
}

/// A single id: an integer, an integer with a trailing lowercase letter, or
/// a `lower-upper` range (expanded eagerly into every integer it spans).
fn parse_defref_id(cursor: &mut Cursor) -> PResult<Vec<String>> {
    let lower = parse_int(cursor)?;

    if cursor.peek_char().is_some_and(|c| c.is_alphabetic()) {
        let letter = cursor.next_char()?;
        return Ok(vec![format!("{lower}{letter}")]);
    }

    let range = cursor.try_parse(|c| {
        consume_whitespace(c);
        if !c.eat("-") {
            return c.err("expected defref range");
        }
        consume_whitespace(c);
        parse_int(c)
    });

    match range {
        Ok(upper) if upper >= lower => Ok((lower..=upper).map(|n| n.to_string()).collect()),
        _ => Ok(vec![lower.to_string()]),
    }
}

fn parse_int(cursor: &mut Cursor) -> PResult<u64> {
    let mut digits = String::new();
    while cursor.peek_char().is_some_and(|c| c.is_ascii_digit()) {
        digits.push(cursor.next_char()?);
    }
    if digits.is_empty() {
        return cursor.err("expected an integer");
    }
    match digits.parse() {
        Ok(n) => Ok(n),
        Err(_) => cursor.err("defref id out of range"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_letter_and_duplicate_normalize_sorted() {
        let mut cursor = Cursor::new("[1-3, 4a, 4]", "");
        let node = parse_defref(&mut cursor).unwrap();
        let DefRefOutcome::Node(Node::DefRef(ids)) = node else { panic!("expected defref node") };
        assert_eq!(ids, vec!["1", "2", "3", "4", "4a"]);
    }

    #[test]
    fn star_is_the_all_definitions_marker() {
        let mut cursor = Cursor::new("[*]", "");
        let node = parse_defref(&mut cursor).unwrap();
        let DefRefOutcome::Node(Node::DefRef(ids)) = node else { panic!("expected defref node") };
        assert_eq!(ids, vec!["*"]);
    }

    #[test]
    fn question_mark_is_a_silent_skip() {
        let mut cursor = Cursor::new("[?]", "");
        assert!(matches!(parse_defref(&mut cursor).unwrap(), DefRefOutcome::Skip));
    }
}

/// "Defref normalization": `parse_defref` output ids list is sorted and
/// de-duplicated for any permutation of inputs with the same set
/// (`spec.md` §8).
#[cfg(test)]
mod prop {
    use super::*;
    use proptest::prelude::*;

    fn parse_ids(source: &str) -> Vec<String> {
        let mut cursor = Cursor::new(source, "");
        match parse_defref(&mut cursor).unwrap() {
            DefRefOutcome::Node(Node::DefRef(ids)) => ids,
            _ => panic!("expected defref node"),
        }
    }

    proptest! {
        #[test]
        fn output_is_order_independent_and_deduplicated(
            mut ids in prop::collection::vec(1u32..50, 1..10)
        ) {
            ids.sort_unstable();
            ids.dedup();
            let expected: Vec<String> = ids.iter().map(u32::to_string).collect();

            let source = format!("[{}]", ids.iter().map(u32::to_string).collect::<Vec<_>>().join(","));
            let forward_ids = parse_ids(&source);

            let mut reversed = ids.clone();
            reversed.reverse();
            let source_rev = format!("[{}]", reversed.iter().map(u32::to_string).collect::<Vec<_>>().join(","));
            let backward_ids = parse_ids(&source_rev);

            prop_assert_eq!(&forward_ids, &backward_ids);
            prop_assert_eq!(forward_ids, expected);
        }
    }
}
