// In-memory page backed by a parsed HTML tree
//
// Structure lives in the scraper tree; presentation changes made by the
// engine live in an overlay keyed by node id. Host-side edit helpers return
// the mutation records a real observer would deliver.

use super::{DomError, DomSurface, MutationRecord, PageControl};
use crate::error::{Result, SiftError};
use ahash::{HashMap, HashMapExt, HashSet, HashSetExt};
use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::BTreeMap;
use std::path::Path;

/// Engine-applied presentation state for one node
#[derive(Debug, Clone, Default)]
struct Presentation {
    display: Option<String>,
    /// `None` masks an attribute the markup carried
    attributes: BTreeMap<String, Option<String>>,
}

/// A loaded document the engine can filter
#[derive(Debug)]
pub struct HtmlPage {
    html: Html,
    overlay: HashMap<NodeId, Presentation>,
    frozen: HashSet<NodeId>,
    location: String,
    document_hidden: bool,
    online: Option<bool>,
    reloads: usize,
}

impl HtmlPage {
    /// Parse a full document served at `location`
    pub fn parse(source: &str, location: impl Into<String>) -> Self {
        Self {
            html: Html::parse_document(source),
            overlay: HashMap::new(),
            frozen: HashSet::new(),
            location: location.into(),
            document_hidden: false,
            online: None,
            reloads: 0,
        }
    }

    /// Read a saved page from disk
    pub fn load(path: &Path, location: impl Into<String>) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|e| SiftError::Io {
            source: e,
            context: format!("Failed to read page: {:?}", path),
        })?;
        Ok(Self::parse(&source, location))
    }

    pub fn body(&self) -> Option<NodeId> {
        self.query("body")
    }

    /// Parse `fragment` and append its nodes as the last children of `parent`
    pub fn append_html(
        &mut self,
        parent: NodeId,
        fragment: &str,
    ) -> Option<MutationRecord<NodeId>> {
        self.html.tree.get(parent)?;

        let parsed = Html::parse_fragment(fragment);
        let mut added = Vec::new();
        for child in parsed.root_element().children() {
            if let Some(id) = graft(&mut self.html, parent, child) {
                added.push(id);
            }
        }

        Some(MutationRecord::new(parent, added))
    }

    /// Detach `node` from the tree. Its handle stays valid.
    pub fn remove_node(&mut self, node: NodeId) -> Option<MutationRecord<NodeId>> {
        let parent = self.html.tree.get(node)?.parent()?.id();
        self.html.tree.get_mut(node)?.detach();
        Some(MutationRecord::new(parent, Vec::new()))
    }

    /// Replace the document title text
    pub fn set_title(&mut self, title: &str) -> Option<MutationRecord<NodeId>> {
        let title_node = self.query("title")?;
        let old_children: Vec<NodeId> = self
            .html
            .tree
            .get(title_node)?
            .children()
            .map(|c| c.id())
            .collect();
        for child in old_children {
            if let Some(mut node) = self.html.tree.get_mut(child) {
                node.detach();
            }
        }

        let escaped = title
            .replace('&', "&amp;")
            .replace('<', "&lt;")
            .replace('>', "&gt;");
        self.append_html(title_node, &escaped)
    }

    /// Change the URL without reloading, as client-side routing does
    pub fn navigate(&mut self, url: impl Into<String>) {
        self.location = url.into();
    }

    pub fn set_document_hidden(&mut self, hidden: bool) {
        self.document_hidden = hidden;
    }

    pub fn set_online(&mut self, online: Option<bool>) {
        self.online = online;
    }

    /// Make every presentation change on `node` fail
    pub fn freeze_node(&mut self, node: NodeId) {
        self.frozen.insert(node);
    }

    pub fn reload_count(&self) -> usize {
        self.reloads
    }

    fn element(&self, node: NodeId) -> Option<ElementRef<'_>> {
        self.html.tree.get(node).and_then(ElementRef::wrap)
    }

    fn presentation_mut(&mut self, node: NodeId) -> std::result::Result<&mut Presentation, DomError> {
        if self.element(node).is_none() {
            return Err(DomError::NotAnElement(format!("{:?}", node)));
        }
        if self.frozen.contains(&node) {
            return Err(DomError::Rejected {
                node: format!("{:?}", node),
                reason: "node is frozen".to_string(),
            });
        }
        Ok(self.overlay.entry(node).or_default())
    }
}

fn parse_selector(selector: &str) -> Option<Selector> {
    match Selector::parse(selector) {
        Ok(sel) => Some(sel),
        Err(e) => {
            tracing::debug!("Invalid selector {:?}: {:?}", selector, e);
            None
        }
    }
}

/// Copy `source` and its subtree under `parent`
fn graft(html: &mut Html, parent: NodeId, source: NodeRef<'_, Node>) -> Option<NodeId> {
    let id = html.tree.get_mut(parent)?.append(source.value().clone()).id();
    for child in source.children() {
        graft(html, id, child);
    }
    Some(id)
}

impl DomSurface for HtmlPage {
    type Handle = NodeId;

    fn query(&self, selector: &str) -> Option<NodeId> {
        let sel = parse_selector(selector)?;
        // Walk from the root so detached nodes are never matched
        self.html
            .root_element()
            .select(&sel)
            .next()
            .map(|el| el.id())
    }

    fn query_within(&self, scope: NodeId, selector: &str) -> Option<NodeId> {
        let sel = parse_selector(selector)?;
        // Descendants only, like querySelector on an element
        self.element(scope)?
            .select(&sel)
            .find(|el| el.id() != scope)
            .map(|el| el.id())
    }

    fn children(&self, parent: NodeId) -> Vec<NodeId> {
        self.html
            .tree
            .get(parent)
            .map(|node| {
                node.children()
                    .filter(|c| c.value().is_element())
                    .map(|c| c.id())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn text_content(&self, node: NodeId) -> String {
        let Some(node_ref) = self.html.tree.get(node) else {
            return String::new();
        };
        match ElementRef::wrap(node_ref) {
            Some(el) => el.text().collect(),
            None => node_ref
                .value()
                .as_text()
                .map(|t| (**t).to_owned())
                .unwrap_or_default(),
        }
    }

    fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.html
            .tree
            .get(node)
            .map(|n| n.id() == ancestor || n.ancestors().any(|a| a.id() == ancestor))
            .unwrap_or(false)
    }

    fn is_in_title(&self, node: NodeId) -> bool {
        let is_title = |n: &NodeRef<'_, Node>| {
            n.value()
                .as_element()
                .map(|el| el.name() == "title")
                .unwrap_or(false)
        };
        self.html
            .tree
            .get(node)
            .map(|n| is_title(&n) || n.ancestors().any(|a| is_title(&a)))
            .unwrap_or(false)
    }

    fn display(&self, node: NodeId) -> Option<String> {
        self.overlay.get(&node).and_then(|p| p.display.clone())
    }

    fn set_display(&mut self, node: NodeId, value: Option<&str>) -> std::result::Result<(), DomError> {
        self.presentation_mut(node)?.display = value.map(str::to_string);
        Ok(())
    }

    fn attribute(&self, node: NodeId, name: &str) -> Option<String> {
        if let Some(overridden) = self.overlay.get(&node).and_then(|p| p.attributes.get(name)) {
            return overridden.clone();
        }
        self.element(node)
            .and_then(|el| el.value().attr(name))
            .map(str::to_string)
    }

    fn set_attribute(
        &mut self,
        node: NodeId,
        name: &str,
        value: &str,
    ) -> std::result::Result<(), DomError> {
        self.presentation_mut(node)?
            .attributes
            .insert(name.to_string(), Some(value.to_string()));
        Ok(())
    }

    fn remove_attribute(&mut self, node: NodeId, name: &str) -> std::result::Result<(), DomError> {
        let presentation = self.presentation_mut(node)?;
        presentation.attributes.insert(name.to_string(), None);
        Ok(())
    }

    fn location(&self) -> String {
        self.location.clone()
    }
}

impl PageControl for HtmlPage {
    fn is_document_hidden(&self) -> bool {
        self.document_hidden
    }

    fn is_online(&self) -> Option<bool> {
        self.online
    }

    fn reload(&mut self) {
        self.reloads += 1;
        tracing::info!("Reloading {}", self.location);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Find work</title></head><body>
        <div data-test="job-tile-list"><article id="a">one</article><article id="b">two</article></div>
    </body></html>"#;

    fn page() -> HtmlPage {
        HtmlPage::parse(PAGE, "https://www.upwork.com/nx/find-work/best-matches")
    }

    #[test]
    fn test_children_are_elements_only() {
        let page = page();
        let list = page.query(r#"div[data-test="job-tile-list"]"#).unwrap();
        let children = page.children(list);
        assert_eq!(children.len(), 2);
        assert_eq!(page.attribute(children[0], "id").as_deref(), Some("a"));
    }

    #[test]
    fn test_append_and_remove_report_mutations() {
        let mut page = page();
        let list = page.query(r#"div[data-test="job-tile-list"]"#).unwrap();

        let record = page
            .append_html(list, r#"<article id="c">three</article>"#)
            .unwrap();
        assert_eq!(record.target, list);
        assert_eq!(record.added.len(), 1);
        assert_eq!(page.children(list).len(), 3);

        let first = page.children(list)[0];
        let record = page.remove_node(first).unwrap();
        assert_eq!(record.target, list);
        assert_eq!(page.children(list).len(), 2);
        assert!(!page.contains(list, first));
        assert_eq!(page.text_content(first), "one");
        assert!(page.query("#a").is_none());
    }

    #[test]
    fn test_overlay_round_trip() {
        let mut page = page();
        let item = page.query("#a").unwrap();

        assert_eq!(page.display(item), None);
        page.set_display(item, Some("none")).unwrap();
        page.set_attribute(item, "data-flag", "true").unwrap();
        assert_eq!(page.display(item).as_deref(), Some("none"));
        assert_eq!(page.attribute(item, "data-flag").as_deref(), Some("true"));

        page.set_display(item, None).unwrap();
        page.remove_attribute(item, "data-flag").unwrap();
        assert_eq!(page.display(item), None);
        assert_eq!(page.attribute(item, "data-flag"), None);
        assert_eq!(page.attribute(item, "id").as_deref(), Some("a"));
    }

    #[test]
    fn test_frozen_node_rejects_changes() {
        let mut page = page();
        let item = page.query("#b").unwrap();
        page.freeze_node(item);
        assert!(matches!(
            page.set_display(item, Some("none")),
            Err(DomError::Rejected { .. })
        ));
    }

    #[test]
    fn test_title_detection() {
        let mut page = page();
        let record = page.set_title("Saved jobs").unwrap();
        assert!(page.is_in_title(record.target));
        assert!(record.added.iter().all(|n| page.is_in_title(*n)));
        let title = page.query("title").unwrap();
        assert_eq!(page.text_content(title), "Saved jobs");
        assert!(!page.is_in_title(page.body().unwrap()));
    }

    #[test]
    fn test_query_within_excludes_scope() {
        let page = page();
        let list = page.query(r#"div[data-test="job-tile-list"]"#).unwrap();
        assert!(page.query_within(list, "div").is_none());
        assert!(page.query_within(list, "article").is_some());
    }

    #[test]
    fn test_invalid_selector_is_not_found() {
        let page = page();
        assert!(page.query("div[").is_none());
    }
}
