//! A `MediaWiki` project client: the external boundary that fetches pages
//! and templates over HTTP, caches and parses them, and exposes them to the
//! [`crate::transclude::Transcluder`].
//!
//! Grounded in `MediaWiki`/`MediaWikiTranscluderAPI`/`WikiNamespace`/`WikiPage`
//! in `examples/original_source/wikiparse/mediawiki.py`. The HTTP transport
//! uses `reqwest` rather than the original's `requests` + `ascoroutine`
//! wrapper — the teacher itself has no outbound HTTP client to match, so this
//! is grounded directly in the Python adapter's `requests` usage; `log` calls
//! at request and cache-hit/miss points follow the teacher's logging
//! convention.

use crate::ast::Node;
use crate::config::Configuration;
use crate::error::Error;
use crate::parser::{self, Directive, ParsedPage};
use crate::render::{HtmlRenderer, Renderer};
use crate::transclude::{Transcluder, TranscludeSource, Variables};
use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};

/// Default namespace used when the API response doesn't name one this
/// client already knows about.
fn default_namespace() -> Arc<WikiNamespace> {
    Arc::new(WikiNamespace { name: String::new(), canonical: None, aliases: Vec::new(), id: 0 })
}

/// Meta data on a WikiMedia project namespace, indexed under its id, name,
/// canonical name and every alias in [`MediaWiki::namespaces`].
#[derive(Clone, Debug, PartialEq)]
pub struct WikiNamespace {
    pub name: String,
    pub canonical: Option<String>,
    pub aliases: Vec<String>,
    pub id: i64,
}

/// A fetched page: its raw WikiText content plus metadata, with its parse
/// result memoized on first access (`WikiPage.parse()`'s caching in the
/// original, which keys off `self._ast is None`).
pub struct Page {
    pub title: String,
    pub content: String,
    pub namespace: Arc<WikiNamespace>,
    parsed: OnceCell<crate::Result<ParsedPage, Arc<Error>>>,
}

impl Page {
    fn new(title: String, content: String, namespace: Arc<WikiNamespace>) -> Self {
        Self { title, content, namespace, parsed: OnceCell::new() }
    }

    /// Parses (and caches) this page's content. Subsequent calls return the
    /// same result without re-running the parser.
    pub async fn parse(&self) -> crate::Result<ParsedPage, Arc<Error>> {
        self.parsed
            .get_or_init(|| async { parser::parse_page(&self.content, &self.title).map_err(Arc::new) })
            .await
            .clone()
    }

    /// The page's title with its namespace prefix removed.
    pub fn pagename(&self) -> &str {
        self.title.strip_prefix(&self.namespace.name).and_then(|s| s.strip_prefix(':')).unwrap_or(&self.title)
    }
}

/// An interface to a WikiMedia-style wiki project, reached over its
/// `action=query` HTTP API.
///
/// Grounded in `MediaWiki` in
/// `examples/original_source/wikiparse/mediawiki.py`.
pub struct MediaWiki {
    host: String,
    language: String,
    client: reqwest::Client,
    config: Configuration,
    renderer: HtmlRenderer,
    namespaces: Mutex<HashMap<NamespaceKey, Arc<WikiNamespace>>>,
    templates: Mutex<HashMap<String, Arc<OnceCell<crate::Result<Arc<Page>, Arc<Error>>>>>>,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
enum NamespaceKey {
    Id(i64),
    Name(String),
}

impl MediaWiki {
    /// Builds a client for `host` (default `wikipedia.org`) in the given
    /// ISO 639-1 `language` (default `en`).
    pub fn new(host: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            language: language.into(),
            client: reqwest::Client::new(),
            config: Configuration::default(),
            renderer: HtmlRenderer,
            namespaces: Mutex::new(HashMap::new()),
            templates: Mutex::new(HashMap::new()),
        }
    }

    /// Convenience constructor for `en.wikipedia.org`.
    pub fn default_wiki() -> Self {
        Self::new("wikipedia.org", "en")
    }

    pub fn with_config(mut self, config: Configuration) -> Self {
        self.config = config;
        self
    }

    fn baseurl(&self) -> String {
        format!("https://{}.{}", self.language, self.host)
    }

    async fn get_json(&self, params: &[(&str, &str)]) -> crate::Result<Value> {
        log::trace!("mediawiki request: {params:?}");
        let response = self.client.get(format!("{}/w/api.php", self.baseurl())).query(params).send().await?;
        let body: Value = response.json().await?;
        if let Some(info) = body.get("error").and_then(|e| e.get("info")).and_then(Value::as_str) {
            return Err(Error::Api { info: info.to_string() });
        }
        Ok(body)
    }

    /// Queries and caches this project's namespace table, indexed by id,
    /// name, canonical name and every alias.
    pub async fn query_namespaces(&self) -> crate::Result<()> {
        let body = self
            .get_json(&[("action", "query"), ("meta", "siteinfo"), ("siprop", "namespaces|namespacealiases"), ("format", "json")])
            .await?;

        let mut table = HashMap::new();
        let namespaces = body.pointer("/query/namespaces").and_then(Value::as_object).cloned().unwrap_or_default();
        for ns in namespaces.values() {
            let id = ns.get("id").and_then(Value::as_i64).unwrap_or(0);
            let name = ns.get("*").and_then(Value::as_str).unwrap_or_default().to_string();
            let canonical = ns.get("canonical").and_then(Value::as_str).map(str::to_string);
            let inst = Arc::new(WikiNamespace { name: name.clone(), canonical: canonical.clone(), aliases: Vec::new(), id });
            table.insert(NamespaceKey::Id(id), inst.clone());
            table.insert(NamespaceKey::Name(name), inst.clone());
            if let Some(canonical) = canonical {
                table.insert(NamespaceKey::Name(canonical), inst);
            }
        }

        let aliases = body.pointer("/query/namespacealiases").and_then(Value::as_array).cloned().unwrap_or_default();
        for alias in aliases {
            let id = alias.get("id").and_then(Value::as_i64).unwrap_or(0);
            let name = alias.get("*").and_then(Value::as_str).unwrap_or_default().to_string();
            if let Some(inst) = table.get(&NamespaceKey::Id(id)).cloned() {
                table.insert(NamespaceKey::Name(name), inst);
            }
        }

        *self.namespaces.lock().await = table;
        Ok(())
    }

    /// Fetches a page's WikiText content, parses it, and returns the result,
    /// qualifying the title with `namespace` when given (e.g. `"Template"`).
    pub async fn fetch_page(&self, title: &str, namespace: Option<&str>) -> crate::Result<Arc<Page>> {
        let file = match namespace {
            Some(namespace) if !namespace.is_empty() => format!("{namespace}:{title}"),
            _ => title.to_string(),
        };
        self.get_revision(&file).await
    }

    /// Fetches (and caches) the named template, under the `Template`
    /// namespace. Concurrent fetches of the same name coalesce into a
    /// single HTTP request and a single parse, per `spec.md` §5.
    pub async fn fetch_template(&self, name: &str) -> crate::Result<Arc<Page>> {
        let cell = {
            let mut templates = self.templates.lock().await;
            templates.entry(name.to_string()).or_insert_with(|| Arc::new(OnceCell::new())).clone()
        };

        if cell.initialized() {
            log::trace!("template cache hit for {name:?}");
        } else {
            log::debug!("fetching template {name:?}");
        }

        cell.get_or_init(|| async { self.fetch_page(name, Some("Template")).await.map_err(Arc::new) })
            .await
            .clone()
    }

    /// Expands `page`'s body against the given starting variables (an
    /// empty map if `vars` is `None`), recursively resolving templates
    /// through this client.
    pub async fn transclude(&self, page: &Page, vars: Option<Variables>) -> crate::Result<Vec<Node>> {
        let body = match page.parse().await.map_err(unwrap_shared)? {
            ParsedPage::Redirect(redirect) => return Err(Error::PageNotFound { title: redirect.target }),
            ParsedPage::Body { body, .. } => body,
        };
        let vars = vars.unwrap_or_default();
        let transcluder = Transcluder::new(self, &self.config);
        transcluder.transclude(body, &vars).await
    }

    /// Renders a node sequence to HTML using this client's configured
    /// renderer.
    pub fn render(&self, nodes: &[Node]) -> crate::Result<String> {
        self.renderer.render(nodes)
    }

    /// Shortcut for `get_revisions_for(&[title])`, returning that single
    /// page.
    pub async fn get_revision(&self, title: &str) -> crate::Result<Arc<Page>> {
        let mut pages = self.get_revisions_for(std::slice::from_ref(&title.to_string())).await?;
        pages.remove(title).ok_or_else(|| Error::PageNotFound { title: title.to_string() })
    }

    /// Fetches the latest revision for each of `titles` in a single batch
    /// request, returning a map from title to fetched page.
    pub async fn get_revisions_for(&self, titles: &[String]) -> crate::Result<HashMap<String, Arc<Page>>> {
        let joined = titles.join("|");
        let body = self
            .get_json(&[
                ("action", "query"),
                ("titles", &joined),
                ("prop", "revisions"),
                ("rvprop", "content"),
                ("rvslots", "main"),
                ("format", "json"),
            ])
            .await?;

        let pages = body.pointer("/query/pages").and_then(Value::as_object).cloned().unwrap_or_default();
        let namespaces = self.namespaces.lock().await.clone();

        let mut out = HashMap::new();
        for data in pages.values() {
            let title = data.get("title").and_then(Value::as_str).unwrap_or_default().to_string();
            let page = self.page_from_revision_data(data, &namespaces)?;
            out.insert(title, Arc::new(page));
        }
        Ok(out)
    }

    fn page_from_revision_data(&self, data: &Value, namespaces: &HashMap<NamespaceKey, Arc<WikiNamespace>>) -> crate::Result<Page> {
        let title = data.get("title").and_then(Value::as_str).unwrap_or_default().to_string();
        let revision = data
            .pointer("/revisions/0/slots/main")
            .ok_or_else(|| Error::PageNotFound { title: title.clone() })?;
        let content = revision.get("*").and_then(Value::as_str).unwrap_or_default().to_string();

        let ns = match data.get("ns").and_then(Value::as_i64) {
            Some(id) => namespaces.get(&NamespaceKey::Id(id)).cloned().unwrap_or_else(default_namespace),
            None => default_namespace(),
        };

        Ok(Page::new(title, content, ns))
    }
}

fn unwrap_shared(error: Arc<Error>) -> Error {
    Arc::try_unwrap(error).unwrap_or_else(|shared| Error::Api { info: shared.to_string() })
}

impl TranscludeSource for MediaWiki {
    fn fetch_template<'a>(&'a self, name: &'a str) -> BoxFuture<'a, crate::Result<Vec<Node>>> {
        async move {
            let page = self.fetch_template(name).await?;
            match page.parse().await.map_err(unwrap_shared)? {
                ParsedPage::Redirect(redirect) => Err(Error::PageNotFound { title: redirect.target }),
                ParsedPage::Body { body, .. } => Ok(crate::inclusion::apply(body)),
            }
        }
        .boxed()
    }

    fn page_exists<'a>(&'a self, title: &'a str) -> BoxFuture<'a, crate::Result<bool>> {
        async move {
            match self.fetch_page(title, None).await {
                Ok(_) => Ok(true),
                Err(Error::PageNotFound { .. }) => Ok(false),
                Err(other) => Err(other),
            }
        }
        .boxed()
    }
}

/// Did `parse_directives` find a `__TOC__`/`__NOTOC__` directive among a
/// page's leading directives? A thin helper over [`ParsedPage`], useful to
/// callers that only care about this one flag.
pub fn wants_toc(directives: &[Directive]) -> Option<bool> {
    directives.iter().rev().find_map(|directive| match directive {
        Directive::Toc => Some(true),
        Directive::NoToc => Some(false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn init_logging() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn pagename_strips_namespace_prefix() {
        let namespace = Arc::new(WikiNamespace { name: "Template".to_string(), canonical: None, aliases: Vec::new(), id: 10 });
        let page = Page::new("Template:Foo".to_string(), String::new(), namespace);
        assert_eq!(page.pagename(), "Foo");
    }

    #[test]
    fn baseurl_follows_language_and_host() {
        let wiki = MediaWiki::new("wikipedia.org", "de");
        assert_eq!(wiki.baseurl(), "https://de.wikipedia.org");
    }

    #[test]
    fn wants_toc_prefers_last_directive() {
        assert_eq!(wants_toc(&[Directive::Toc, Directive::NoToc]), Some(false));
        assert_eq!(wants_toc(&[]), None);
    }

    #[tokio::test]
    async fn page_parse_is_memoized() {
        init_logging();
        let namespace = default_namespace();
        let page = Page::new("Foo".to_string(), "hello".to_string(), namespace);
        let first = page.parse().await.unwrap();
        let second = page.parse().await.unwrap();
        assert_eq!(format!("{first:?}"), format!("{second:?}"));
    }
}
