// Applies and reverts hide decisions, remembering exactly what it hid

use super::DomSurface;
use ahash::{HashMap, HashMapExt};
use std::hash::Hash;

/// Attribute tagging an item as hidden by this engine
pub const HIDDEN_MARKER: &str = "data-jobsift-hidden";

const HIDDEN_DISPLAY: &str = "none";

/// Sole owner of the hidden set.
///
/// An item is a member iff the engine is the reason it is not visible.
/// Each member remembers the display value it had before being hidden so
/// restoring puts it back exactly.
#[derive(Debug)]
pub struct VisibilityTracker<H> {
    hidden: HashMap<H, Option<String>>,
}

impl<H: Copy + Eq + Hash + std::fmt::Debug> VisibilityTracker<H> {
    pub fn new() -> Self {
        Self {
            hidden: HashMap::new(),
        }
    }

    /// Snapshot of the container's current children, not a live view
    pub fn list_children<D>(&self, dom: &D, container: H) -> Vec<H>
    where
        D: DomSurface<Handle = H>,
    {
        dom.children(container)
    }

    /// Hide `items`, skipping ones already hidden. Returns how many were
    /// newly hidden. A failing item is logged and the rest still proceed.
    pub fn hide<D>(&mut self, dom: &mut D, items: &[H]) -> usize
    where
        D: DomSurface<Handle = H>,
    {
        let mut newly_hidden = 0;

        for &item in items {
            if self.hidden.contains_key(&item) {
                continue;
            }

            let prior_display = dom.display(item);
            if let Err(e) = dom.set_display(item, Some(HIDDEN_DISPLAY)) {
                tracing::error!("Error hiding item {:?}: {}", item, e);
                continue;
            }
            if let Err(e) = dom.set_attribute(item, HIDDEN_MARKER, "true") {
                tracing::error!("Error tagging hidden item {:?}: {}", item, e);
            }

            self.hidden.insert(item, prior_display);
            newly_hidden += 1;
            tracing::debug!("Hid item {:?}", item);
        }

        newly_hidden
    }

    /// Put every hidden item back the way it was and empty the set.
    /// Returns the number of items restored.
    pub fn restore_all<D>(&mut self, dom: &mut D) -> usize
    where
        D: DomSurface<Handle = H>,
    {
        if self.hidden.is_empty() {
            return 0;
        }

        let mut restored = 0;
        for (item, prior_display) in self.hidden.drain() {
            let shown = dom.set_display(item, prior_display.as_deref());
            let untagged = dom.remove_attribute(item, HIDDEN_MARKER);
            match shown.and(untagged) {
                Ok(()) => restored += 1,
                Err(e) => tracing::error!("Error restoring item {:?}: {}", item, e),
            }
        }

        tracing::info!("Restored {} previously hidden items", restored);
        restored
    }

    pub fn is_hidden(&self, item: &H) -> bool {
        self.hidden.contains_key(item)
    }

    pub fn len(&self) -> usize {
        self.hidden.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hidden.is_empty()
    }
}

impl<H: Copy + Eq + Hash + std::fmt::Debug> Default for VisibilityTracker<H> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::HtmlPage;
    use ego_tree::NodeId;

    fn page() -> (HtmlPage, Vec<NodeId>) {
        let page = HtmlPage::parse(
            r#"<html><body><ul id="list"><li>a</li><li>b</li><li>c</li></ul></body></html>"#,
            "https://example.test/",
        );
        let list = page.query("#list").unwrap();
        let items = page.children(list);
        (page, items)
    }

    #[test]
    fn test_hide_tags_and_tracks() {
        let (mut page, items) = page();
        let mut tracker = VisibilityTracker::new();

        assert_eq!(tracker.hide(&mut page, &items[..2]), 2);
        assert_eq!(tracker.len(), 2);
        assert_eq!(page.display(items[0]).as_deref(), Some("none"));
        assert_eq!(page.attribute(items[1], HIDDEN_MARKER).as_deref(), Some("true"));
        assert!(!tracker.is_hidden(&items[2]));
    }

    #[test]
    fn test_hide_is_idempotent() {
        let (mut page, items) = page();
        let mut tracker = VisibilityTracker::new();

        tracker.hide(&mut page, &items[..1]);
        assert_eq!(tracker.hide(&mut page, &items[..1]), 0);
        assert_eq!(tracker.len(), 1);

        // Second hide must not overwrite the remembered display
        tracker.restore_all(&mut page);
        assert_eq!(page.display(items[0]), None);
    }

    #[test]
    fn test_restore_round_trip() {
        let (mut page, items) = page();
        page.set_display(items[1], Some("flex")).unwrap();
        let before: Vec<_> = items
            .iter()
            .map(|&i| (page.display(i), page.attribute(i, HIDDEN_MARKER)))
            .collect();

        let mut tracker = VisibilityTracker::new();
        tracker.hide(&mut page, &items);
        assert_eq!(tracker.restore_all(&mut page), 3);
        assert!(tracker.is_empty());

        let after: Vec<_> = items
            .iter()
            .map(|&i| (page.display(i), page.attribute(i, HIDDEN_MARKER)))
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_restore_on_empty_set() {
        let (mut page, _) = page();
        let mut tracker: VisibilityTracker<NodeId> = VisibilityTracker::new();
        assert_eq!(tracker.restore_all(&mut page), 0);
    }

    #[test]
    fn test_failed_hide_is_not_tracked() {
        let (mut page, items) = page();
        page.freeze_node(items[1]);
        let mut tracker = VisibilityTracker::new();

        assert_eq!(tracker.hide(&mut page, &items), 2);
        assert!(tracker.is_hidden(&items[0]));
        assert!(!tracker.is_hidden(&items[1]));
        assert!(tracker.is_hidden(&items[2]));
        assert_eq!(page.display(items[1]), None);
    }

    #[test]
    fn test_children_snapshot_is_stable() {
        let (mut page, _) = page();
        let tracker: VisibilityTracker<NodeId> = VisibilityTracker::new();
        let list = page.query("#list").unwrap();

        let snapshot = tracker.list_children(&page, list);
        page.append_html(list, "<li>d</li>");
        assert_eq!(snapshot.len(), 3);
        assert_eq!(tracker.list_children(&page, list).len(), 4);
    }
}
