// Page capabilities the engine is given instead of reaching for globals

mod html;
mod tracker;

pub use html::HtmlPage;
pub use tracker::{VisibilityTracker, HIDDEN_MARKER};

use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

/// Presentation mutation failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// Handle does not refer to an element of this document
    #[error("Node {0} is not an element")]
    NotAnElement(String),

    /// The page refused the change
    #[error("Page rejected mutation of node {node}: {reason}")]
    Rejected { node: String, reason: String },
}

/// Read and presentation access to a live document.
///
/// Handles are stable identities: a handle keeps referring to the same
/// node for as long as the surface lives, even after the node is removed
/// from the tree.
pub trait DomSurface {
    type Handle: Copy + Eq + Hash + Debug;

    /// First element in the document matching `selector`
    fn query(&self, selector: &str) -> Option<Self::Handle>;

    /// First descendant of `scope` matching `selector`
    fn query_within(&self, scope: Self::Handle, selector: &str) -> Option<Self::Handle>;

    /// Element children of `parent`, in document order
    fn children(&self, parent: Self::Handle) -> Vec<Self::Handle>;

    /// Concatenated text of the node and its descendants
    fn text_content(&self, node: Self::Handle) -> String;

    /// True when `node` is `ancestor` or lies beneath it
    fn contains(&self, ancestor: Self::Handle, node: Self::Handle) -> bool;

    /// True when `node` is the document title or inside it
    fn is_in_title(&self, node: Self::Handle) -> bool;

    /// Inline display override, if any
    fn display(&self, node: Self::Handle) -> Option<String>;

    fn set_display(&mut self, node: Self::Handle, value: Option<&str>) -> Result<(), DomError>;

    fn attribute(&self, node: Self::Handle, name: &str) -> Option<String>;

    fn set_attribute(&mut self, node: Self::Handle, name: &str, value: &str)
        -> Result<(), DomError>;

    fn remove_attribute(&mut self, node: Self::Handle, name: &str) -> Result<(), DomError>;

    /// Current document URL
    fn location(&self) -> String;
}

/// Tab-level signals and actions used by the auto refresh
pub trait PageControl {
    fn is_document_hidden(&self) -> bool;

    /// Network status when the host reports one
    fn is_online(&self) -> Option<bool>;

    fn reload(&mut self);
}

/// One batch of structural change observed under `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord<H> {
    pub target: H,
    pub added: Vec<H>,
}

impl<H> MutationRecord<H> {
    pub fn new(target: H, added: Vec<H>) -> Self {
        Self { target, added }
    }
}
