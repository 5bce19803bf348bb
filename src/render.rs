//! Polymorphic node-dispatch renderers: turn a node sequence into a string.
//!
//! Grounded in `Renderer`/`IdentifierRenderer`/`HTMLRenderer` in
//! `examples/original_source/wikiparse/renderer/{renderer,identifier,html}.py`.
//! The Python base class dispatches with `getattr(self, f'render_{name}')`;
//! per the REDESIGN FLAGS in `spec.md` §9 this becomes an ordinary trait
//! with a default method that pattern-matches [`Node`]'s discriminant, so a
//! concrete renderer only has to override the node kinds it specializes.

use crate::ast::{ListItem, Node};
use crate::error::Error;

/// A visitor that renders a node (or node sequence) to a string.
///
/// `render` handles the list-joining/plain-string boilerplate the Python
/// base class's `render` performed with `isinstance` checks; implementers
/// override [`Renderer::render_node`] for the node kinds they care about
/// and fall through to [`Renderer::fallback_render`] for the rest.
pub trait Renderer {
    /// Renders a single node.
    fn render_node(&self, node: &Node) -> crate::Result<String> {
        match node {
            Node::Text(text) => Ok(text.clone()),
            _ => self.fallback_render(node),
        }
    }

    /// Renders a node sequence by concatenating each node's rendering, in
    /// order — equivalent to the Python base class's `''.join(map(self.render, ast))`.
    fn render(&self, nodes: &[Node]) -> crate::Result<String> {
        let mut out = String::new();
        for node in nodes {
            out.push_str(&self.render_node(node)?);
        }
        Ok(out)
    }

    /// Called by the default [`Renderer::render_node`] for any node kind a
    /// concrete renderer did not override. Meta containers (`nowiki`,
    /// `noinclude`, `onlyinclude`, `includeonly`) render transparently —
    /// their own markup disappears, their children still render. Anything
    /// else is [`Error::NotImplemented`], matching the Python base class's
    /// `raise NotImplementedError()`.
    fn fallback_render(&self, node: &Node) -> crate::Result<String> {
        match node {
            Node::NoWiki(text) => Ok(text.clone()),
            Node::NoInclude(children) | Node::OnlyInclude(children) | Node::IncludeOnly(children) => {
                self.render(children)
            }
            other => Err(Error::NotImplemented { what: format!("rendering {other:?}") }),
        }
    }
}

/// Renders a node subtree down to the flat string used as a lookup key for
/// template/variable names — e.g. turning `''Foo''` into `"Foo"`.
///
/// Grounded in `IdentifierRenderer` in
/// `examples/original_source/wikiparse/renderer/identifier.py`: formatting
/// collapses to its content, text is verbatim, and (per `spec.md` §4.3,
/// "ignores structure") anything else this renderer doesn't otherwise
/// recognize contributes nothing rather than erroring — an identifier
/// subtree is expected to have already had its transcludable constructs
/// (templates, variables, parser functions) expanded away before it is
/// rendered this way.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdentifierRenderer;

impl Renderer for IdentifierRenderer {
    fn render_node(&self, node: &Node) -> crate::Result<String> {
        match node {
            Node::Text(text) => Ok(text.clone()),
            Node::Bold(children) | Node::Italic(children) | Node::Underline(children) => self.render(children),
            Node::NoWiki(text) => Ok(text.clone()),
            Node::NoInclude(children) | Node::OnlyInclude(children) | Node::IncludeOnly(children) => {
                self.render(children)
            }
            Node::Link { target, label } => match label {
                Some(label) if !label.is_empty() => self.render(label),
                _ => self.render(target),
            },
            _ => Ok(String::new()),
        }
    }
}

/// Renders a node sequence to HTML.
///
/// Grounded in `HTMLRenderer` in
/// `examples/original_source/wikiparse/renderer/html.py` for formatting and
/// generic-element escaping; headings, links, line breaks and lists are
/// specified directly by `spec.md` §4.3 (this draft of the original predates
/// them). Indentation (`Node::Indent`), defrefs and the `__TOC__`/`__NOTOC__`
/// markers have no HTML rendering defined by `spec.md` either, so they fall
/// through to [`Renderer::fallback_render`]'s `NotImplemented`.
#[derive(Clone, Copy, Debug, Default)]
pub struct HtmlRenderer;

impl Renderer for HtmlRenderer {
    fn render_node(&self, node: &Node) -> crate::Result<String> {
        match node {
            Node::Text(text) => Ok(text.clone()),
            Node::NewLine => Ok("\n".to_string()),
            Node::LineBreak => Ok("<br>".to_string()),
            Node::Bold(children) => self.render_simple_tag("b", children),
            Node::Italic(children) => self.render_simple_tag("i", children),
            Node::Underline(children) => self.render_simple_tag("u", children),
            Node::Heading { level, content } => {
                let inner = self.render(content)?;
                Ok(format!("<h{level}>{inner}</h{level}>"))
            }
            Node::Link { target, label } => self.render_link(target, label.as_deref()),
            Node::List(items) => self.render_list(items),
            Node::Html { tag, attributes, children } => self.render_html(tag, attributes, children.as_deref()),
            Node::NoWiki(text) => Ok(text.clone()),
            Node::NoInclude(children) | Node::OnlyInclude(children) | Node::IncludeOnly(children) => {
                self.render(children)
            }
            other => self.fallback_render(other),
        }
    }
}

impl HtmlRenderer {
    fn render_simple_tag(&self, tag: &str, contents: &[Node]) -> crate::Result<String> {
        let inner = self.render(contents)?;
        Ok(format!("<{tag}>{inner}</{tag}>"))
    }

    fn render_link(&self, target: &[Node], label: Option<&[Node]>) -> crate::Result<String> {
        let href = self.render(target)?;
        let label = match label {
            Some(label) if !label.is_empty() => self.render(label)?,
            _ => href.clone(),
        };
        Ok(format!(r#"<a href="{}">{label}</a>"#, escape_attribute(&href)))
    }

    fn render_list(&self, items: &[ListItem]) -> crate::Result<String> {
        let mut out = String::from("<ul>");
        for item in items {
            out.push_str(&format!(r#"<li data-depth="{}">"#, item.depth));
            out.push_str(&self.render(&item.content)?);
            out.push_str("</li>");
        }
        out.push_str("</ul>");
        Ok(out)
    }

    fn render_html(
        &self,
        tag: &str,
        attributes: &[crate::ast::HtmlAttribute],
        children: Option<&[Node]>,
    ) -> crate::Result<String> {
        let mut attrs = String::new();
        for attribute in attributes {
            let value = self.render(&attribute.value)?;
            attrs.push(' ');
            attrs.push_str(&attribute.name);
            attrs.push_str("=\"");
            attrs.push_str(&escape_attribute(&value));
            attrs.push('"');
        }
        let inner = match children {
            Some(children) => self.render(children)?,
            None => String::new(),
        };
        Ok(format!("<{tag}{attrs}>{inner}</{tag}>"))
    }
}

/// Backslash-escapes `"`, `'` and `\` in an attribute value.
///
/// Grounded in `htmlescape` in
/// `examples/original_source/wikiparse/renderer/html.py` — note the
/// original does not escape `<`/`>`; this port keeps that behavior rather
/// than inventing broader HTML5-correct escaping, per `spec.md`'s
/// non-goal of full HTML5 validation.
fn escape_attribute(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '"' | '\'' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::HtmlAttribute;

    #[test]
    fn identifier_renderer_collapses_formatting() {
        let renderer = IdentifierRenderer;
        let nodes = vec![Node::Bold(vec![Node::Text("Foo".to_string())])];
        assert_eq!(renderer.render(&nodes).unwrap(), "Foo");
    }

    #[test]
    fn html_renderer_formatting_and_heading() {
        let renderer = HtmlRenderer;
        let nodes = vec![Node::Italic(vec![Node::Text("italic".into())]), Node::Bold(vec![Node::Text("bold".into())])];
        assert_eq!(renderer.render(&nodes).unwrap(), "<i>italic</i><b>bold</b>");

        let heading = Node::heading(1, vec![Node::Text("H1".into())]);
        assert_eq!(renderer.render_node(&heading).unwrap(), "<h1>H1</h1>");
    }

    #[test]
    fn html_renderer_link_falls_back_to_target_as_label() {
        let renderer = HtmlRenderer;
        let link = Node::Link { target: vec![Node::Text("Target".into())], label: None };
        assert_eq!(renderer.render_node(&link).unwrap(), r#"<a href="Target">Target</a>"#);
    }

    #[test]
    fn html_renderer_escapes_attribute_values() {
        let renderer = HtmlRenderer;
        let node = Node::Html {
            tag: "span".to_string(),
            attributes: vec![HtmlAttribute { name: "title".to_string(), value: vec![Node::Text("a\"b".into())] }],
            children: Some(vec![]),
        };
        assert_eq!(renderer.render_node(&node).unwrap(), r#"<span title="a\"b"></span>"#);
    }

    #[test]
    fn html_renderer_meta_tags_render_children_only() {
        let renderer = HtmlRenderer;
        let node = Node::NoInclude(vec![Node::Text("hidden".into())]);
        assert_eq!(renderer.render_node(&node).unwrap(), "hidden");
    }

    #[test]
    fn html_renderer_errors_on_unimplemented_kind() {
        let renderer = HtmlRenderer;
        let node = Node::Toc;
        assert!(renderer.render_node(&node).is_err());
    }
}
