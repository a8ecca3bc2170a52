// Item classification against the current thresholds
//
// Signals come from two text fragments inside each item: the client spend
// and the proposal count. A missing spend fragment means the child is not a
// job tile at all and is left alone.

mod types;

pub use types::{ClassifiedItem, FilterDecision, HideReason, ProcessingStats};

use crate::config::{Config, Thresholds};
use crate::dom::DomSurface;
use crate::parsers::{collapse_whitespace, parse_proposals_bound, parse_spend};

/// Classifies items against one snapshot of the configuration.
/// Rebuilt whenever the configuration is replaced.
#[derive(Debug, Clone)]
pub struct ItemClassifier {
    thresholds: Thresholds,
    spend_selector: String,
    proposals_selector: String,
}

impl ItemClassifier {
    pub fn new(config: &Config) -> Self {
        Self {
            thresholds: config.thresholds,
            spend_selector: config.selectors.client_spending.clone(),
            proposals_selector: config.selectors.proposals.clone(),
        }
    }

    /// Extract both signals from `item` and decide.
    ///
    /// Returns `None` when the item has no spend fragment; such items are
    /// not candidates and must not be touched. A missing proposals fragment
    /// counts as zero proposals.
    pub fn classify<D: DomSurface>(
        &self,
        dom: &D,
        item: D::Handle,
    ) -> Option<ClassifiedItem<D::Handle>> {
        let Some(spend_node) = dom.query_within(item, &self.spend_selector) else {
            tracing::debug!("No spending element found in item {:?}", item);
            return None;
        };

        let spend_text = collapse_whitespace(&dom.text_content(spend_node)).to_lowercase();
        let spend_amount = parse_spend(&spend_text);

        let proposals_count = dom
            .query_within(item, &self.proposals_selector)
            .map(|node| parse_proposals_bound(&collapse_whitespace(&dom.text_content(node))))
            .unwrap_or(0);

        let decision = self.decide(spend_amount, proposals_count);

        Some(ClassifiedItem {
            handle: item,
            spend_amount,
            proposals_count,
            decision,
        })
    }

    /// Threshold rule on already-parsed signals.
    ///
    /// Spend below the minimum always hides. The proposals range only
    /// applies when it differs from the fully open default; an inverted
    /// range then hides every item.
    pub fn decide(&self, spend_amount: f64, proposals_count: u32) -> FilterDecision {
        let t = &self.thresholds;

        if spend_amount < t.minimum_spent {
            tracing::debug!(
                "Hiding: spend ${} < ${}",
                spend_amount,
                t.minimum_spent
            );
            return FilterDecision::Hide(HideReason::LowSpend);
        }

        if !t.is_open_proposals_range()
            && (proposals_count < t.proposals_min || proposals_count > t.proposals_max)
        {
            tracing::debug!(
                "Hiding: {} proposals not in [{}, {}]",
                proposals_count,
                t.proposals_min,
                t.proposals_max
            );
            return FilterDecision::Hide(HideReason::ProposalsOutOfRange);
        }

        FilterDecision::Keep
    }
}
