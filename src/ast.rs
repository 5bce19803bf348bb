//! The syntax tree produced by the [`crate::parser`].
//!
//! Grounded in `examples/original_source/wikiparse/ast.py`: every node kind
//! there has a counterpart variant here. Where the Python models a node as a
//! class with a `children: list[AST]` field, this enum models it as a
//! variant carrying owned data directly — there is no base-class dispatch to
//! recover, so [`Renderer`](crate::render::Renderer) dispatches on the enum
//! discriminant instead of on a node name string.

/// A single node of a parsed WikiText document.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// A run of literal text with no further structure.
    Text(String),
    /// A single `\n`.
    NewLine,
    /// A `<br>`-style explicit line break.
    LineBreak,
    /// `== Heading ==`. `level` is validated to be in `1..=6`.
    Heading { level: u8, content: Vec<Node> },
    /// `'''bold'''`.
    Bold(Vec<Node>),
    /// `''italic''`.
    Italic(Vec<Node>),
    /// `<u>underline</u>`.
    Underline(Vec<Node>),
    /// A leading run of `:` before a line, used for discussion-style replies.
    Indent { depth: u32, content: Vec<Node> },
    /// A run of consecutive `*` list items at the same depth.
    List(Vec<ListItem>),
    /// `[[target|label]]` or `[[target]]`.
    Link { target: Vec<Node>, label: Option<Vec<Node>> },
    /// `{{name|args...}}`.
    Template { name: Vec<Node>, args: Vec<Arg> },
    /// `{{#invoke:module|function|args...}}`.
    Invoke {
        module: Vec<Node>,
        function: Vec<Node>,
        args: Vec<Arg>,
    },
    /// `{{{name|default}}}`.
    Variable {
        name: Vec<Node>,
        default: Option<Vec<Node>>,
    },
    /// `{{#if: cond | then | else }}`.
    If {
        condition: Vec<Node>,
        then: Vec<Node>,
        r#else: Option<Vec<Node>>,
    },
    /// `{{#ifeq: a | b | then | else }}`.
    IfEq {
        left: Vec<Node>,
        right: Vec<Node>,
        then: Vec<Node>,
        r#else: Option<Vec<Node>>,
    },
    /// `{{#ifexist: page | then | else }}`.
    IfExist {
        page: Vec<Node>,
        then: Vec<Node>,
        r#else: Option<Vec<Node>>,
    },
    /// `{{#switch: value | case = result | ... | #default = result }}`.
    Switch {
        value: Vec<Node>,
        branches: Vec<SwitchBranch>,
        default: Option<Vec<Node>>,
    },
    /// `<nowiki>...</nowiki>` or `<nowiki/>`.
    NoWiki(String),
    /// `<noinclude>...</noinclude>`.
    NoInclude(Vec<Node>),
    /// `<onlyinclude>...</onlyinclude>`.
    OnlyInclude(Vec<Node>),
    /// `<includeonly>...</includeonly>`.
    IncludeOnly(Vec<Node>),
    /// `<!-- ... -->`.
    Comment(String),
    /// A generic HTML element, `<tag attr="value" ...>children</tag>`, or a
    /// self-closing `<tag attr="value" .../>` when `children` is `None`.
    Html {
        tag: String,
        attributes: Vec<HtmlAttribute>,
        children: Option<Vec<Node>>,
    },
    /// `[1][3-5][9a][*][?]`, Wiktionary-style sense-reference markers.
    /// Each id is `<int>`, `<int><lowercase letter>`, or the literal `"*"`.
    /// `[*]` parses directly to `DefRef(["*"])`, and `[?]` is not
    /// represented here at all — it is a silent structural skip handled by
    /// the enclosing text production (see `crate::parser::defref`).
    DefRef(Vec<String>),
    /// `__TOC__`.
    Toc,
    /// `__NOTOC__`.
    NoToc,
}

/// One `|`-delimited argument of a template, parser function, or `#invoke`.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    /// A positional argument; its 1-based index is assigned by the caller
    /// (the argument's position among the positional arguments, not among
    /// all arguments).
    Positional(Vec<Node>),
    /// A `name=value` argument.
    Named { name: Vec<Node>, value: Vec<Node> },
}

/// One `*`-prefixed entry of a [`Node::List`].
#[derive(Clone, Debug, PartialEq)]
pub struct ListItem {
    /// Number of leading `*` characters; always `>= 1`.
    pub depth: u32,
    pub content: Vec<Node>,
}

/// One `case = result` arm of a [`Node::Switch`].
#[derive(Clone, Debug, PartialEq)]
pub struct SwitchBranch {
    pub cases: Vec<Vec<Node>>,
    pub result: Vec<Node>,
}

/// One `name="value"` attribute of a [`Node::Html`] element.
#[derive(Clone, Debug, PartialEq)]
pub struct HtmlAttribute {
    pub name: String,
    pub value: Vec<Node>,
}

impl Node {
    /// Heading constructor enforcing the `1..=6` level invariant.
    pub fn heading(level: u8, content: Vec<Node>) -> Self {
        assert!((1..=6).contains(&level), "heading level out of range: {level}");
        Node::Heading { level, content }
    }

    /// True for the meta containers whose own markup disappears at render
    /// time but whose children still render: `nowiki`, `noinclude`,
    /// `onlyinclude`, `includeonly`. Mirrors `META_NODES` in
    /// `examples/original_source/wikiparse/renderer/renderer.py`.
    pub fn is_meta(&self) -> bool {
        matches!(
            self,
            Node::NoInclude(_) | Node::OnlyInclude(_) | Node::IncludeOnly(_)
        )
    }
}

/// Which edges of a node sequence [`trim_text_nodes`] should strip leading
/// or trailing whitespace from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Strip {
    None,
    Left,
    Right,
    Both,
}

/// Strips leading/trailing whitespace from the first/last [`Node::Text`] of
/// a sequence (per `strip`), dropping it entirely if stripping empties it.
///
/// Grounded in `trim_text_nodes` in
/// `examples/original_source/wikiparse/parser.py`. Note the Python
/// function's name is slightly misleading: it does not merge adjacent text
/// runs, only trims the outer edges — callers of this parser build text in
/// a single accumulating buffer between non-text productions, so adjacent
/// `Text` nodes never arise in the first place.
pub fn trim_text_nodes(mut nodes: Vec<Node>, strip: Strip) -> Vec<Node> {
    if matches!(strip, Strip::Left | Strip::Both) {
        while let Some(Node::Text(text)) = nodes.first() {
            let trimmed = text.trim_start().to_string();
            if trimmed.is_empty() {
                nodes.remove(0);
            } else {
                nodes[0] = Node::Text(trimmed);
                break;
            }
        }
    }
    if matches!(strip, Strip::Right | Strip::Both) {
        while let Some(Node::Text(text)) = nodes.last() {
            let trimmed = text.trim_end().to_string();
            if trimmed.is_empty() {
                nodes.pop();
            } else {
                let last = nodes.len() - 1;
                nodes[last] = Node::Text(trimmed);
                break;
            }
        }
    }
    nodes
}
