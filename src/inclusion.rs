//! The inclusion filter: resolves `<onlyinclude>`/`<noinclude>` before a
//! tree is spliced into another template's expansion.
//!
//! Grounded in `InclusionTransformer` in
//! `examples/original_source/wikiparse/transformer/inclusion.py`. `<includeonly>`
//! is deliberately left untouched — its whole purpose is to survive this
//! pass and only ever be stripped when a page is rendered standalone,
//! which is outside this filter's job (see `spec.md` §4.4).

use crate::ast::Node;

/// Applies the inclusion filter to a node sequence.
///
/// If any `Node::OnlyInclude` exists anywhere in `nodes`, returns the
/// concatenation of the bodies of every such node, in document order,
/// discarding everything else. Otherwise returns `nodes` with every
/// `Node::NoInclude` removed at any depth, `Node::IncludeOnly` left in
/// place.
///
/// Pure and idempotent: applying it to its own output returns that output
/// unchanged (there are no `onlyinclude` nodes left to find, and
/// `strip_noinclude` over a tree with no `noinclude` nodes is a no-op).
pub fn apply(nodes: Vec<Node>) -> Vec<Node> {
    let only = find_onlyinclude(&nodes);
    if !only.is_empty() {
        return only.into_iter().flatten().collect();
    }
    strip_noinclude(nodes)
}

/// Collects the children of every `onlyinclude` node found anywhere in
/// `nodes`, searching recursively into every other node's children.
///
/// An `onlyinclude` node's own children are searched too: if they contain a
/// nested `onlyinclude`, that nested node's (recursively resolved) body wins
/// over the outer body verbatim, so the result never carries a leftover
/// `OnlyInclude` node forward — otherwise a second `apply` pass would keep
/// peeling off another layer, breaking idempotence.
fn find_onlyinclude(nodes: &[Node]) -> Vec<Vec<Node>> {
    let mut result = Vec::new();
    for node in nodes {
        if let Node::OnlyInclude(children) = node {
            let nested = find_onlyinclude(children);
            if nested.is_empty() {
                result.push(children.clone());
            } else {
                result.extend(nested);
            }
        } else {
            for child_list in node_children(node) {
                result.extend(find_onlyinclude(child_list));
            }
        }
    }
    result
}

fn strip_noinclude(nodes: Vec<Node>) -> Vec<Node> {
    nodes
        .into_iter()
        .filter(|node| !matches!(node, Node::NoInclude(_)))
        .map(strip_noinclude_children)
        .collect()
}

/// Recurses into every `Vec<Node>`-shaped field of `node`, mirroring the
/// original's untyped `ast.children = self.strip_noinclude(ast.children)`
/// walk over every AST-like node regardless of kind.
fn strip_noinclude_children(node: Node) -> Node {
    use crate::ast::{Arg, HtmlAttribute, ListItem, SwitchBranch};
    use Node::*;

    let strip_arg = |arg: Arg| match arg {
        Arg::Positional(value) => Arg::Positional(strip_noinclude(value)),
        Arg::Named { name, value } => Arg::Named { name: strip_noinclude(name), value: strip_noinclude(value) },
    };
    let strip_opt = |nodes: Option<Vec<Node>>| nodes.map(strip_noinclude);

    match node {
        Heading { level, content } => Heading { level, content: strip_noinclude(content) },
        Bold(children) => Bold(strip_noinclude(children)),
        Italic(children) => Italic(strip_noinclude(children)),
        Underline(children) => Underline(strip_noinclude(children)),
        Indent { depth, content } => Indent { depth, content: strip_noinclude(content) },
        List(items) => List(
            items
                .into_iter()
                .map(|item| ListItem { depth: item.depth, content: strip_noinclude(item.content) })
                .collect(),
        ),
        Link { target, label } => Link { target: strip_noinclude(target), label: strip_opt(label) },
        Template { name, args } => {
            Template { name: strip_noinclude(name), args: args.into_iter().map(strip_arg).collect() }
        }
        Invoke { module, function, args } => Invoke {
            module: strip_noinclude(module),
            function: strip_noinclude(function),
            args: args.into_iter().map(strip_arg).collect(),
        },
        Variable { name, default } => Variable { name: strip_noinclude(name), default: strip_opt(default) },
        If { condition, then, r#else } => {
            If { condition: strip_noinclude(condition), then: strip_noinclude(then), r#else: strip_opt(r#else) }
        }
        IfEq { left, right, then, r#else } => IfEq {
            left: strip_noinclude(left),
            right: strip_noinclude(right),
            then: strip_noinclude(then),
            r#else: strip_opt(r#else),
        },
        IfExist { page, then, r#else } => {
            IfExist { page: strip_noinclude(page), then: strip_noinclude(then), r#else: strip_opt(r#else) }
        }
        Switch { value, branches, default } => Switch {
            value: strip_noinclude(value),
            branches: branches
                .into_iter()
                .map(|branch| SwitchBranch {
                    cases: branch.cases.into_iter().map(strip_noinclude).collect(),
                    result: strip_noinclude(branch.result),
                })
                .collect(),
            default: strip_opt(default),
        },
        OnlyInclude(children) => OnlyInclude(strip_noinclude(children)),
        IncludeOnly(children) => IncludeOnly(strip_noinclude(children)),
        Html { tag, attributes, children } => Html {
            tag,
            attributes: attributes
                .into_iter()
                .map(|attribute| HtmlAttribute { name: attribute.name, value: strip_noinclude(attribute.value) })
                .collect(),
            children: strip_opt(children),
        },
        other => other,
    }
}

/// Children of any node that carries a `Vec<Node>` subtree, used by
/// [`find_onlyinclude`]'s recursive search. Mirrors the field set walked
/// by [`strip_noinclude_children`]; returned as owned node lists since some
/// are synthesized from multiple fields (e.g. a switch's cases and results).
fn node_children(node: &Node) -> Vec<&[Node]> {
    match node {
        Node::Heading { content, .. } => vec![content.as_slice()],
        Node::Bold(children) | Node::Italic(children) | Node::Underline(children) => vec![children.as_slice()],
        Node::Indent { content, .. } => vec![content.as_slice()],
        Node::List(items) => items.iter().map(|item| item.content.as_slice()).collect(),
        Node::Link { target, label } => {
            let mut lists = vec![target.as_slice()];
            lists.extend(label.as_deref());
            lists
        }
        Node::Template { name, args } => {
            let mut lists = vec![name.as_slice()];
            lists.extend(arg_children(args));
            lists
        }
        Node::Invoke { module, function, args } => {
            let mut lists = vec![module.as_slice(), function.as_slice()];
            lists.extend(arg_children(args));
            lists
        }
        Node::Variable { name, default } => {
            let mut lists = vec![name.as_slice()];
            lists.extend(default.as_deref());
            lists
        }
        Node::If { condition, then, r#else } => {
            let mut lists = vec![condition.as_slice(), then.as_slice()];
            lists.extend(r#else.as_deref());
            lists
        }
        Node::IfEq { left, right, then, r#else } => {
            let mut lists = vec![left.as_slice(), right.as_slice(), then.as_slice()];
            lists.extend(r#else.as_deref());
            lists
        }
        Node::IfExist { page, then, r#else } => {
            let mut lists = vec![page.as_slice(), then.as_slice()];
            lists.extend(r#else.as_deref());
            lists
        }
        Node::Switch { value, branches, default } => {
            let mut lists = vec![value.as_slice()];
            for branch in branches {
                lists.extend(branch.cases.iter().map(|case| case.as_slice()));
                lists.push(branch.result.as_slice());
            }
            lists.extend(default.as_deref());
            lists
        }
        Node::NoInclude(children) | Node::IncludeOnly(children) => vec![children.as_slice()],
        Node::Html { attributes, children, .. } => {
            let mut lists: Vec<&[Node]> = attributes.iter().map(|attribute| attribute.value.as_slice()).collect();
            lists.extend(children.as_deref());
            lists
        }
        _ => Vec::new(),
    }
}

fn arg_children(args: &[crate::ast::Arg]) -> Vec<&[Node]> {
    args.iter()
        .flat_map(|arg| match arg {
            crate::ast::Arg::Positional(value) => vec![value.as_slice()],
            crate::ast::Arg::Named { name, value } => vec![name.as_slice(), value.as_slice()],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn onlyinclude_wins_and_discards_everything_else() {
        let nodes = vec![
            Node::Text("before".into()),
            Node::OnlyInclude(vec![Node::Text("kept".into())]),
            Node::Text("after".into()),
        ];
        assert_eq!(apply(nodes), vec![Node::Text("kept".into())]);
    }

    #[test]
    fn multiple_onlyinclude_blocks_concatenate_in_order() {
        let nodes = vec![
            Node::OnlyInclude(vec![Node::Text("a".into())]),
            Node::Text("skip".into()),
            Node::OnlyInclude(vec![Node::Text("b".into())]),
        ];
        assert_eq!(apply(nodes), vec![Node::Text("a".into()), Node::Text("b".into())]);
    }

    #[test]
    fn nested_onlyinclude_resolves_fully_in_one_pass() {
        let nodes = vec![Node::OnlyInclude(vec![Node::OnlyInclude(vec![Node::Text("kept".into())])])];
        let once = apply(nodes);
        assert_eq!(once, vec![Node::Text("kept".into())]);
        assert_eq!(apply(once.clone()), once);
    }

    #[test]
    fn noinclude_is_stripped_when_no_onlyinclude_present() {
        let nodes = vec![
            Node::Text("keep".into()),
            Node::NoInclude(vec![Node::Text("drop".into())]),
        ];
        assert_eq!(apply(nodes), vec![Node::Text("keep".into())]);
    }

    #[test]
    fn includeonly_is_retained() {
        let nodes = vec![Node::IncludeOnly(vec![Node::Text("stays".into())])];
        assert_eq!(apply(nodes.clone()), nodes);
    }

    #[test]
    fn idempotent() {
        let nodes = vec![
            Node::Text("keep".into()),
            Node::NoInclude(vec![Node::Text("drop".into())]),
            Node::Bold(vec![Node::NoInclude(vec![Node::Text("nested drop".into())])]),
        ];
        let once = apply(nodes);
        let twice = apply(once.clone());
        assert_eq!(once, twice);
    }
}

/// "Inclusion idempotence": `apply(apply(nodes)) == apply(nodes)` for any
/// tree mixing `onlyinclude`/`noinclude`/`bold`/text nodes at arbitrary
/// depth (`spec.md` §8).
#[cfg(test)]
mod prop {
    use super::*;
    use proptest::prelude::*;

    fn node_strategy() -> impl Strategy<Value = Node> {
        let leaf = "[a-z]{0,5}".prop_map(Node::Text);
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..3).prop_map(Node::Bold),
                prop::collection::vec(inner.clone(), 0..3).prop_map(Node::NoInclude),
                prop::collection::vec(inner.clone(), 0..3).prop_map(Node::IncludeOnly),
                prop::collection::vec(inner, 0..3).prop_map(Node::OnlyInclude),
            ]
        })
    }

    proptest! {
        #[test]
        fn inclusion_filter_is_idempotent(nodes in prop::collection::vec(node_strategy(), 0..6)) {
            let once = apply(nodes);
            let twice = apply(once.clone());
            prop_assert_eq!(once, twice);
        }
    }
}
