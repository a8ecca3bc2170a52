// Shared types for item classification
use serde::Serialize;

/// Keep/hide verdict for one item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterDecision {
    /// Item satisfies every threshold
    Keep,
    /// Item fails a threshold and should be hidden
    Hide(HideReason),
}

impl FilterDecision {
    pub fn is_hide(&self) -> bool {
        matches!(self, FilterDecision::Hide(_))
    }
}

/// Which threshold an item failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HideReason {
    /// Client spend below the minimum
    LowSpend,
    /// Proposal count outside the configured range
    ProposalsOutOfRange,
}

/// One candidate item with the signals derived for this pass.
/// Never cached across passes.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedItem<H> {
    pub handle: H,
    pub spend_amount: f64,
    pub proposals_count: u32,
    pub decision: FilterDecision,
}

/// Outcome of one classify-and-apply pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingStats {
    pub last_duration_ms: f64,
    pub last_hidden_count: usize,
    pub last_visible_count: usize,
}
