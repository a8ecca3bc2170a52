// Optional periodic full-page reload

use super::timers::{TimerId, TimerQueue};
use crate::config::AutoRefreshConfig;
use crate::dom::PageControl;
use std::time::Duration;

/// What a refresh tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    Reloaded,
    SkippedHidden,
    SkippedOffline,
}

/// Owns the repeating reload timer
#[derive(Debug)]
pub struct RefreshScheduler<K> {
    kind: K,
    timer: Option<TimerId>,
}

impl<K: Copy> RefreshScheduler<K> {
    pub fn new(kind: K) -> Self {
        Self { kind, timer: None }
    }

    /// (Re)install the interval timer. No-op when auto refresh is disabled.
    pub fn start(
        &mut self,
        settings: &AutoRefreshConfig,
        timers: &mut TimerQueue<K>,
        now: Duration,
    ) -> bool {
        if !settings.enabled {
            tracing::info!("Auto refresh disabled in config");
            return false;
        }

        self.stop(timers);
        let interval = Duration::from_millis(settings.refresh_interval_ms.max(1));
        tracing::info!("Starting auto refresh (every {}ms)", interval.as_millis());
        self.timer = Some(timers.schedule_repeating(now, interval, self.kind));
        true
    }

    pub fn stop(&mut self, timers: &mut TimerQueue<K>) {
        if let Some(id) = self.timer.take() {
            timers.cancel(id);
            tracing::debug!("Auto refresh stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// True when `id` is this scheduler's live timer
    pub fn owns(&self, id: TimerId) -> bool {
        self.timer == Some(id)
    }

    /// Reload unless the tab is hidden or the network is known to be down.
    /// Missing signals count as "go ahead".
    pub fn tick<P: PageControl>(&self, page: &mut P) -> RefreshOutcome {
        if page.is_document_hidden() {
            tracing::debug!("Auto refresh: tab hidden, skipping reload");
            return RefreshOutcome::SkippedHidden;
        }
        if page.is_online() == Some(false) {
            tracing::debug!("Auto refresh: offline, skipping reload");
            return RefreshOutcome::SkippedOffline;
        }

        tracing::info!("Auto refresh: reloading page to fetch newer jobs");
        page.reload();
        RefreshOutcome::Reloaded
    }
}
