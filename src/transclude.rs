//! The transclusion engine: expands templates, substitutes variables, and
//! evaluates parser functions against a pluggable [`TranscludeSource`].
//!
//! Grounded in `Transcluder`/`TranscluderAPI`/`make_vars` in
//! `examples/original_source/wikiparse/transformer/transcluder.py`, with the
//! `if`/`ifeq`/`ifexist`/`switch`/`invoke` dispatch arms specified directly
//! by `spec.md` §4.5 (this draft of the original only has `template` and
//! `variable`). The Python `Transformer.transform` dispatches by looking up
//! `_transclude_{name}`; per the REDESIGN FLAGS in `spec.md` §9 this is an
//! ordinary `match` over [`Node`]'s discriminant instead.

use crate::ast::{Arg, HtmlAttribute, ListItem, Node};
use crate::config::Configuration;
use crate::error::Error;
use crate::inclusion;
use crate::render::{HtmlRenderer, IdentifierRenderer, Renderer};
use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;

/// A mapping from identifier string to the node list it's bound to, scoped
/// to a single template expansion. Per `spec.md` §3.
pub type Variables = HashMap<String, Vec<Node>>;

/// The external collaborator the transcluder calls out to for anything it
/// cannot resolve on its own: fetching a template's already-parsed,
/// already-inclusion-filtered AST; checking page existence for
/// `{{#ifexist:}}`; and invoking a Lua module for `{{#invoke:}}`.
///
/// Grounded in `TranscluderAPI`/`MediaWikiTranscluderAPI` in
/// `examples/original_source/wikiparse/transformer/transcluder.py` and
/// `.../mediawiki.py`. Methods return boxed futures — rather than an
/// `async-trait`-style macro dependency — since `futures` is already part of
/// this crate's stack (used elsewhere for `join_all` over sibling
/// expansions) and async fns in traits aren't directly object-safe.
pub trait TranscludeSource: Sync {
    /// Fetches and returns the named template's AST, already parsed and
    /// passed through the inclusion filter by the adapter. Per `spec.md`
    /// §5, implementations should coalesce concurrent fetches of the same
    /// title into a single at-most-once fetch and parse.
    fn fetch_template<'a>(&'a self, name: &'a str) -> BoxFuture<'a, crate::Result<Vec<Node>>>;

    /// Whether a page with this title exists, for `{{#ifexist:}}`.
    fn page_exists<'a>(&'a self, title: &'a str) -> BoxFuture<'a, crate::Result<bool>>;

    /// Invokes a Lua module function for `{{#invoke:}}`. The default
    /// implementation has no Lua runtime to call into, and always fails
    /// with [`Error::NotImplemented`] — `spec.md` §1 scopes a Lua
    /// interpreter out of the core: this hook exists so a caller can supply
    /// one, not so this crate ships one.
    fn invoke<'a>(
        &'a self,
        module: &'a str,
        function: &'a str,
        _vars: &'a Variables,
    ) -> BoxFuture<'a, crate::Result<String>> {
        let what = format!("#invoke: {module}::{function} (no Lua collaborator configured)");
        async move { Err(Error::NotImplemented { what }) }.boxed()
    }
}

/// What a single node's transclusion produced: a node kept in its original
/// position, or a node list the caller must splice (flatten) into its
/// output sequence in place of the original node. Per `spec.md` §4.5
/// "Splice semantics".
enum Splice {
    Node(Node),
    Nodes(Vec<Node>),
}

/// Recursively expands a tree against a [`TranscludeSource`] and a starting
/// [`Variables`] map.
pub struct Transcluder<'a, S: TranscludeSource> {
    source: &'a S,
    config: &'a Configuration,
}

impl<'a, S: TranscludeSource + Sync> Transcluder<'a, S> {
    pub fn new(source: &'a S, config: &'a Configuration) -> Self {
        Self { source, config }
    }

    /// Transcludes `nodes` against `vars`, starting at recursion depth 0.
    pub fn transclude<'b>(&'b self, nodes: Vec<Node>, vars: &'b Variables) -> BoxFuture<'b, crate::Result<Vec<Node>>> {
        self.transclude_at_depth(nodes, vars, 0)
    }

    /// `depth` counts template-body nestings, not plain tree recursion —
    /// it is only incremented when a `template` node's fetched body is
    /// itself expanded (see the `Node::Template` arm of
    /// [`Transcluder::transclude_node`]), matching `spec.md` §4.5's
    /// "recursive template expansion" wording.
    fn transclude_at_depth<'b>(
        &'b self,
        nodes: Vec<Node>,
        vars: &'b Variables,
        depth: usize,
    ) -> BoxFuture<'b, crate::Result<Vec<Node>>> {
        async move {
            if depth > self.config.max_transclusion_depth {
                return Err(Error::TransclusionDepthExceeded { limit: self.config.max_transclusion_depth });
            }

            // Sibling subtrees expand concurrently; `join_all` preserves
            // input order, which is source order, satisfying the ordering
            // guarantee in `spec.md` §5.
            let futures = nodes.into_iter().map(|node| self.transclude_node(node, vars, depth));
            let results = futures::future::join_all(futures).await;

            let mut out = Vec::new();
            for result in results {
                match result? {
                    Splice::Node(node) => out.push(node),
                    Splice::Nodes(nodes) => out.extend(nodes),
                }
            }
            Ok(out)
        }
        .boxed()
    }

    fn transclude_node<'b>(&'b self, node: Node, vars: &'b Variables, depth: usize) -> BoxFuture<'b, crate::Result<Splice>> {
        async move {
            match node {
                Node::Template { name, args } => {
                    let name = self.transclude_at_depth(name, vars, depth).await?;
                    let args = self.transclude_args(args, vars, depth).await?;
                    let key = IdentifierRenderer.render(&name)?;

                    let body = self.source.fetch_template(&key).await?;
                    let new_vars = make_vars(&args)?;
                    let expanded = self.transclude_at_depth(body, &new_vars, depth + 1).await?;
                    Ok(Splice::Nodes(inclusion::apply(expanded)))
                }

                Node::Variable { name, default } => {
                    let name = self.transclude_at_depth(name, vars, depth).await?;
                    let key = IdentifierRenderer.render(&name)?;

                    if let Some(bound) = vars.get(&key) {
                        Ok(Splice::Nodes(bound.clone()))
                    } else if let Some(default) = default {
                        Ok(Splice::Nodes(self.transclude_at_depth(default, vars, depth).await?))
                    } else {
                        Ok(Splice::Nodes(Vec::new()))
                    }
                }

                Node::If { condition, then, r#else } => {
                    let condition = self.transclude_at_depth(condition, vars, depth).await?;
                    let truthy = !HtmlRenderer.render(&condition)?.trim().is_empty();
                    let branch = if truthy { then } else { r#else.unwrap_or_default() };
                    Ok(Splice::Nodes(self.transclude_at_depth(branch, vars, depth).await?))
                }

                Node::IfEq { left, right, then, r#else } => {
                    let left = self.transclude_at_depth(left, vars, depth).await?;
                    let right = self.transclude_at_depth(right, vars, depth).await?;
                    let eq = HtmlRenderer.render(&left)?.trim() == HtmlRenderer.render(&right)?.trim();
                    let branch = if eq { then } else { r#else.unwrap_or_default() };
                    Ok(Splice::Nodes(self.transclude_at_depth(branch, vars, depth).await?))
                }

                Node::IfExist { page, then, r#else } => {
                    let page = self.transclude_at_depth(page, vars, depth).await?;
                    let title = HtmlRenderer.render(&page)?;
                    let exists = self.source.page_exists(&title).await?;
                    let branch = if exists { then } else { r#else.unwrap_or_default() };
                    Ok(Splice::Nodes(self.transclude_at_depth(branch, vars, depth).await?))
                }

                Node::Switch { value, branches, default } => {
                    let value = self.transclude_at_depth(value, vars, depth).await?;
                    let key = HtmlRenderer.render(&value)?.trim().to_string();

                    // Later branches win on a shared case key, per
                    // `spec.md` §4.5; a plain `HashMap::insert` in branch
                    // order gives us that for free.
                    let mut table: HashMap<String, Vec<Node>> = HashMap::new();
                    for branch in branches {
                        let result = self.transclude_at_depth(branch.result, vars, depth).await?;
                        for case in branch.cases {
                            let case = self.transclude_at_depth(case, vars, depth).await?;
                            let case_key = HtmlRenderer.render(&case)?.trim().to_string();
                            table.insert(case_key, result.clone());
                        }
                    }

                    // An explicit `#default = x` branch parses as an ordinary
                    // ref/result pair (`parse_switch_branch` only routes the
                    // *bare* replacement form into `Node::Switch.default`), so
                    // it lands in `table` under the literal key `"#default"`
                    // rather than in the `default` field — a miss must
                    // consult that entry too before falling back further.
                    let chosen = match table.remove(&key) {
                        Some(result) => result,
                        None => match table.remove("#default") {
                            Some(result) => result,
                            None => match default {
                                Some(default) => self.transclude_at_depth(default, vars, depth).await?,
                                None => Vec::new(),
                            },
                        },
                    };
                    Ok(Splice::Nodes(chosen))
                }

                Node::Invoke { module, function, args } => {
                    let module = self.transclude_at_depth(module, vars, depth).await?;
                    let function = self.transclude_at_depth(function, vars, depth).await?;
                    let args = self.transclude_args(args, vars, depth).await?;

                    let module_key = IdentifierRenderer.render(&module)?;
                    let function_key = IdentifierRenderer.render(&function)?;
                    let call_vars = make_vars(&args)?;

                    let text = self.source.invoke(&module_key, &function_key, &call_vars).await?;
                    Ok(Splice::Node(Node::Text(text)))
                }

                other => Ok(Splice::Node(self.rewrite_children(other, vars, depth).await?)),
            }
        }
        .boxed()
    }

    /// The "default: recurse into children with the current variables"
    /// case from `spec.md` §4.5, for every node kind that isn't itself a
    /// transclusion construct.
    fn rewrite_children<'b>(&'b self, node: Node, vars: &'b Variables, depth: usize) -> BoxFuture<'b, crate::Result<Node>> {
        async move {
            Ok(match node {
                Node::Heading { level, content } => {
                    Node::Heading { level, content: self.transclude_at_depth(content, vars, depth).await? }
                }
                Node::Bold(children) => Node::Bold(self.transclude_at_depth(children, vars, depth).await?),
                Node::Italic(children) => Node::Italic(self.transclude_at_depth(children, vars, depth).await?),
                Node::Underline(children) => Node::Underline(self.transclude_at_depth(children, vars, depth).await?),
                Node::Indent { depth: d, content } => {
                    Node::Indent { depth: d, content: self.transclude_at_depth(content, vars, depth).await? }
                }
                Node::List(items) => {
                    let mut out = Vec::with_capacity(items.len());
                    for item in items {
                        let content = self.transclude_at_depth(item.content, vars, depth).await?;
                        out.push(ListItem { depth: item.depth, content });
                    }
                    Node::List(out)
                }
                Node::Link { target, label } => {
                    let target = self.transclude_at_depth(target, vars, depth).await?;
                    let label = match label {
                        Some(label) => Some(self.transclude_at_depth(label, vars, depth).await?),
                        None => None,
                    };
                    Node::Link { target, label }
                }
                Node::NoInclude(children) => Node::NoInclude(self.transclude_at_depth(children, vars, depth).await?),
                Node::OnlyInclude(children) => Node::OnlyInclude(self.transclude_at_depth(children, vars, depth).await?),
                Node::IncludeOnly(children) => {
                    Node::IncludeOnly(self.transclude_at_depth(children, vars, depth).await?)
                }
                Node::Html { tag, attributes, children } => {
                    let mut new_attributes = Vec::with_capacity(attributes.len());
                    for attribute in attributes {
                        let value = self.transclude_at_depth(attribute.value, vars, depth).await?;
                        new_attributes.push(HtmlAttribute { name: attribute.name, value });
                    }
                    let children = match children {
                        Some(children) => Some(self.transclude_at_depth(children, vars, depth).await?),
                        None => None,
                    };
                    Node::Html { tag, attributes: new_attributes, children }
                }
                leaf => leaf,
            })
        }
        .boxed()
    }

    async fn transclude_args(&self, args: Vec<Arg>, vars: &Variables, depth: usize) -> crate::Result<Vec<Arg>> {
        let mut out = Vec::with_capacity(args.len());
        for arg in args {
            out.push(match arg {
                Arg::Positional(value) => Arg::Positional(self.transclude_at_depth(value, vars, depth).await?),
                Arg::Named { name, value } => Arg::Named {
                    name: self.transclude_at_depth(name, vars, depth).await?,
                    value: self.transclude_at_depth(value, vars, depth).await?,
                },
            });
        }
        Ok(out)
    }
}

/// Builds the [`Variables`] map for a template/invoke call: positional
/// arguments get string-integer keys `"1"`, `"2"`, …; named arguments get
/// keys equal to the *HTML* rendering of their name (not the identifier
/// renderer — `spec.md` §9 mandates this because test fixtures rely on
/// rendered-integer keys like `"1"` colliding correctly with positional
/// ones). Later named entries win on a key collision.
fn make_vars(args: &[Arg]) -> crate::Result<Variables> {
    let mut vars = Variables::new();
    let mut position = 0usize;
    for arg in args {
        match arg {
            Arg::Positional(value) => {
                position += 1;
                vars.insert(position.to_string(), value.clone());
            }
            Arg::Named { name, value } => {
                let key = HtmlRenderer.render(name)?;
                vars.insert(key, value.clone());
            }
        }
    }
    Ok(vars)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::SwitchBranch;

    pub(super) struct FixedSource {
        pub(super) templates: HashMap<String, Vec<Node>>,
    }

    impl TranscludeSource for FixedSource {
        fn fetch_template<'a>(&'a self, name: &'a str) -> BoxFuture<'a, crate::Result<Vec<Node>>> {
            let result = self
                .templates
                .get(name)
                .cloned()
                .ok_or_else(|| Error::PageNotFound { title: name.to_string() });
            async move { result }.boxed()
        }

        fn page_exists<'a>(&'a self, _title: &'a str) -> BoxFuture<'a, crate::Result<bool>> {
            async move { Ok(true) }.boxed()
        }
    }

    fn run<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(future)
    }

    #[test]
    fn template_expands_to_fetched_body() {
        let mut templates = HashMap::new();
        templates.insert("foo".to_string(), vec![Node::Text("foo".to_string())]);
        let source = FixedSource { templates };
        let config = Configuration::default();
        let transcluder = Transcluder::new(&source, &config);

        let nodes = vec![Node::Template { name: vec![Node::Text("foo".into())], args: Vec::new() }];
        let result = run(transcluder.transclude(nodes, &Variables::new())).unwrap();
        assert_eq!(result, vec![Node::Text("foo".to_string())]);
    }

    #[test]
    fn ifeq_trims_before_comparing() {
        let source = FixedSource { templates: HashMap::new() };
        let config = Configuration::default();
        let transcluder = Transcluder::new(&source, &config);

        let nodes = vec![Node::IfEq {
            left: vec![Node::Text(" val".into())],
            right: vec![Node::Text("val ".into())],
            then: vec![Node::Text("t".into())],
            r#else: Some(vec![Node::Text("f".into())]),
        }];
        let result = run(transcluder.transclude(nodes, &Variables::new())).unwrap();
        assert_eq!(result, vec![Node::Text("t".to_string())]);
    }

    #[test]
    fn switch_falls_back_to_default_on_miss() {
        let source = FixedSource { templates: HashMap::new() };
        let config = Configuration::default();
        let transcluder = Transcluder::new(&source, &config);

        let branches = vec![
            SwitchBranch { cases: vec![vec![Node::Text("foo".into())]], result: vec![Node::Text("bar".into())] },
            SwitchBranch { cases: vec![vec![Node::Text("bar".into())]], result: vec![Node::Text("quux".into())] },
        ];
        let switch = |value: &str| Node::Switch {
            value: vec![Node::Text(value.to_string())],
            branches: branches.clone(),
            default: Some(vec![Node::Text("quux".into())]),
        };

        assert_eq!(
            run(transcluder.transclude(vec![switch("foo")], &Variables::new())).unwrap(),
            vec![Node::Text("bar".to_string())]
        );
        assert_eq!(
            run(transcluder.transclude(vec![switch("bar")], &Variables::new())).unwrap(),
            vec![Node::Text("quux".to_string())]
        );
        assert_eq!(
            run(transcluder.transclude(vec![switch("zzz")], &Variables::new())).unwrap(),
            vec![Node::Text("quux".to_string())]
        );
    }

    /// An explicit `#default = x` branch parses into `branches` (under the
    /// literal ref `"#default"`), not into `Node::Switch.default` — a miss
    /// must still resolve to it.
    #[test]
    fn switch_falls_back_to_explicit_default_branch_on_miss() {
        let source = FixedSource { templates: HashMap::new() };
        let config = Configuration::default();
        let transcluder = Transcluder::new(&source, &config);

        let nodes = crate::parser::parse("{{#switch: zzz | a=1 | #default=2 }}").unwrap();
        let result = run(transcluder.transclude(nodes, &Variables::new())).unwrap();
        assert_eq!(result, vec![Node::Text("2".to_string())]);
    }

    #[test]
    fn depth_limit_is_enforced() {
        let mut templates = HashMap::new();
        templates.insert(
            "loop".to_string(),
            vec![Node::Template { name: vec![Node::Text("loop".into())], args: Vec::new() }],
        );
        let source = FixedSource { templates };
        let mut config = Configuration::default();
        config.max_transclusion_depth = 3;
        let transcluder = Transcluder::new(&source, &config);

        let nodes = vec![Node::Template { name: vec![Node::Text("loop".into())], args: Vec::new() }];
        let result = run(transcluder.transclude(nodes, &Variables::new()));
        assert!(matches!(result, Err(Error::TransclusionDepthExceeded { .. })));
    }
}

/// "Transclusion fixpoint": a tree with no transclusion constructs left in
/// it (no `template`/`variable`/`if`/`ifeq`/`ifexist`/`switch`/`invoke`
/// nodes) is a fixed point of [`Transcluder::transclude`] — expanding it
/// again returns it unchanged, since every arm but the structural
/// `rewrite_children` default only fires on those constructs (`spec.md`
/// §8).
#[cfg(test)]
mod prop {
    use super::*;
    use super::tests::FixedSource;
    use proptest::prelude::*;

    fn transclusion_free_node() -> impl Strategy<Value = Node> {
        let leaf = "[a-z]{0,5}".prop_map(Node::Text);
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                inner.clone().prop_map(|n| Node::Bold(vec![n])),
                inner.clone().prop_map(|n| Node::Italic(vec![n])),
                prop::collection::vec(inner, 0..3).prop_map(|content| Node::Heading { level: 2, content }),
            ]
        })
    }

    fn run<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(future)
    }

    fn has_transclusion_construct(nodes: &[Node]) -> bool {
        nodes.iter().any(|node| match node {
            Node::Template { .. }
            | Node::Variable { .. }
            | Node::If { .. }
            | Node::IfEq { .. }
            | Node::IfExist { .. }
            | Node::Switch { .. }
            | Node::Invoke { .. } => true,
            Node::Bold(children) | Node::Italic(children) | Node::Underline(children) => {
                has_transclusion_construct(children)
            }
            Node::Heading { content, .. } => has_transclusion_construct(content),
            _ => false,
        })
    }

    fn resolvable_template_node() -> impl Strategy<Value = Node> {
        let leaf = "[a-z]{0,5}".prop_map(Node::Text);
        leaf.prop_recursive(3, 16, 4, |inner| {
            prop_oneof![
                inner.clone().prop_map(|n| Node::Bold(vec![n])),
                prop::sample::select(vec!["a", "b"])
                    .prop_map(|name| Node::Template { name: vec![Node::Text(name.to_string())], args: Vec::new() }),
            ]
        })
    }

    proptest! {
        #[test]
        fn transclusion_free_trees_are_a_fixed_point(
            nodes in prop::collection::vec(transclusion_free_node(), 0..6)
        ) {
            let source = FixedSource { templates: HashMap::new() };
            let config = Configuration::default();
            let transcluder = Transcluder::new(&source, &config);

            let once = run(transcluder.transclude(nodes.clone(), &Variables::new())).unwrap();
            let twice = run(transcluder.transclude(once.clone(), &Variables::new())).unwrap();
            prop_assert_eq!(once.clone(), nodes);
            prop_assert_eq!(twice, once);
        }

        /// "Transclusion fixpoint": after one pass, no `template` node (or any
        /// other transclusion construct) remains, so long as every
        /// referenced template resolves (`spec.md` §8).
        #[test]
        fn one_pass_removes_every_transclusion_construct_when_templates_resolve(
            nodes in prop::collection::vec(resolvable_template_node(), 0..6)
        ) {
            let mut templates = HashMap::new();
            templates.insert("a".to_string(), vec![Node::Text("A".into())]);
            templates.insert("b".to_string(), vec![Node::Text("B".into())]);
            let source = FixedSource { templates };
            let config = Configuration::default();
            let transcluder = Transcluder::new(&source, &config);

            let result = run(transcluder.transclude(nodes, &Variables::new())).unwrap();
            prop_assert!(!has_transclusion_construct(&result));
        }
    }
}
