//! Filter orchestration
//!
//! `FilterOrchestrator` owns the configuration, the page and every timer.
//! The host feeds it structural changes, navigation signals and inbound
//! messages, and drains due timers through `run_due_timers`. All work runs
//! synchronously inside those calls, so one event loop drives everything.
//!
//! Lifecycle: `Idle` until `initialize`, then `Watching`, briefly
//! `Processing` during each pass, and back to `Idle` on `cleanup`.

mod messages;

pub use messages::{
    AutoRefreshReport, InboundMessage, MessageResponse, StatusReport, ThresholdsReport,
};

use crate::config::{Config, SettingsUpdate};
use crate::dom::{DomSurface, MutationRecord, PageControl, VisibilityTracker};
use crate::filtering::{ItemClassifier, ProcessingStats};
use crate::navigation::{NavigationMonitor, NavigationSignal};
use crate::schedule::{ChangeScheduler, Clock, RefreshScheduler, TimerQueue};
use serde::Serialize;
use std::time::{Duration, Instant};

/// Labels for every timer the orchestrator schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Debounced reprocessing after list changes
    Reprocess,
    /// Delayed URL comparison after a navigation hint
    NavigationCheck,
    /// Debounced route-change notification
    NavigationNotify,
    /// Periodic page reload
    AutoRefresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingState {
    Idle,
    Watching,
    Processing,
}

/// Which structural changes the orchestrator currently reacts to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Watch<H> {
    /// Nothing observed
    Detached,
    /// Waiting for the list container to appear anywhere in the document
    Document,
    /// Reprocess on changes under this container
    Container(H),
}

/// Coordinates classification, hiding, navigation and refresh for one page
pub struct FilterOrchestrator<D: DomSurface, C: Clock> {
    config: Config,
    dom: D,
    clock: C,
    timers: TimerQueue<TimerKind>,
    classifier: ItemClassifier,
    tracker: VisibilityTracker<D::Handle>,
    changes: ChangeScheduler<TimerKind>,
    navigation: NavigationMonitor<TimerKind>,
    refresh: RefreshScheduler<TimerKind>,
    state: ProcessingState,
    initialized: bool,
    watch: Watch<D::Handle>,
    stats: ProcessingStats,
}

impl<D, C> FilterOrchestrator<D, C>
where
    D: DomSurface + PageControl,
    C: Clock,
{
    pub fn new(config: Config, dom: D, clock: C) -> Self {
        let url = dom.location();
        let debounce = Duration::from_millis(config.performance.debounce_delay_ms);

        Self {
            classifier: ItemClassifier::new(&config),
            tracker: VisibilityTracker::new(),
            changes: ChangeScheduler::new(debounce, TimerKind::Reprocess),
            navigation: NavigationMonitor::new(
                &config.navigation,
                url,
                TimerKind::NavigationCheck,
                TimerKind::NavigationNotify,
            ),
            refresh: RefreshScheduler::new(TimerKind::AutoRefresh),
            timers: TimerQueue::new(),
            state: ProcessingState::Idle,
            initialized: false,
            watch: Watch::Detached,
            stats: ProcessingStats::default(),
            config,
            dom,
            clock,
        }
    }

    /// Startup sequence: watch navigation, start auto refresh on listing
    /// pages, then initialize filtering.
    pub fn bootstrap(&mut self) {
        let url = self.dom.location();
        let now = self.clock.now();

        self.navigation.start(url.clone());
        if self.navigation.is_listing(&url) {
            self.refresh
                .start(&self.config.auto_refresh, &mut self.timers, now);
        }

        self.initialize();
    }

    /// Locate the list and start filtering it. Safe to call repeatedly;
    /// a second call cleans up first.
    pub fn initialize(&mut self) {
        if self.initialized {
            tracing::info!("Filter already initialized, cleaning up first...");
            self.cleanup();
        }

        tracing::info!("Initializing job filter");
        self.initialized = true;
        self.state = ProcessingState::Watching;

        match self.dom.query(&self.config.selectors.job_tile_list) {
            Some(container) => self.setup_filtering(container),
            None => {
                tracing::info!("Job list not found, waiting for page to load...");
                self.watch = Watch::Document;
            }
        }
    }

    fn setup_filtering(&mut self, container: D::Handle) {
        tracing::info!("Found job list, starting filter process");
        self.watch = Watch::Container(container);
        self.reprocess();
    }

    /// Classify the current items and hide the failing ones.
    ///
    /// Dropped when a pass is already running or filtering is disabled.
    /// Returns the stats of the pass when one ran.
    pub fn reprocess(&mut self) -> Option<ProcessingStats> {
        if self.state == ProcessingState::Processing {
            tracing::debug!("Already processing job items, skipping...");
            return None;
        }
        if !self.config.filtering_enabled {
            tracing::info!("Filtering disabled, skipping processing");
            return None;
        }

        let Some(container) = self.dom.query(&self.config.selectors.job_tile_list) else {
            tracing::warn!("No job list container found for processing");
            return None;
        };

        let previous = self.state;
        self.state = ProcessingState::Processing;
        let started = Instant::now();

        let items = self.tracker.list_children(&self.dom, container);
        let classified: Vec<_> = items
            .iter()
            .filter_map(|&item| self.classifier.classify(&self.dom, item))
            .collect();
        let to_hide: Vec<D::Handle> = classified
            .iter()
            .filter(|c| c.decision.is_hide())
            .map(|c| c.handle)
            .collect();

        let candidates = classified.len();
        let hidden = to_hide.len();
        if hidden > 0 {
            tracing::info!("Hiding {} job items below thresholds", hidden);
            self.tracker.hide(&mut self.dom, &to_hide);
        }

        let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
        self.stats = ProcessingStats {
            last_duration_ms: elapsed_ms,
            last_hidden_count: hidden,
            last_visible_count: candidates - hidden,
        };
        tracing::debug!(
            "Job item processing completed in {:.2}ms (total: {}, hidden: {}, visible: {})",
            elapsed_ms,
            candidates,
            hidden,
            candidates - hidden
        );

        if elapsed_ms > self.config.performance.max_processing_time_ms as f64 {
            tracing::warn!(
                "Job item processing took {:.2}ms, exceeding threshold",
                elapsed_ms
            );
        }

        self.state = previous;
        Some(self.stats)
    }

    /// Replace thresholds and flags, then recompute every item from scratch
    pub fn apply_settings_update(&mut self, update: &SettingsUpdate) {
        tracing::info!("Received settings update: {:?}", update);

        self.config = self.config.with_update(update);
        self.classifier = ItemClassifier::new(&self.config);

        self.tracker.restore_all(&mut self.dom);
        self.reprocess();

        let now = self.clock.now();
        self.refresh.stop(&mut self.timers);
        if self.navigation.is_active() && self.navigation.is_listing(&self.dom.location()) {
            self.refresh
                .start(&self.config.auto_refresh, &mut self.timers, now);
        }

        tracing::info!("Settings updated and applied successfully");
    }

    /// Unhide everything this engine hid
    pub fn restore_all(&mut self) -> usize {
        self.tracker.restore_all(&mut self.dom)
    }

    /// Stop watching the list, drop the pending reprocess and restore every
    /// hidden item. Navigation monitoring and auto refresh keep running.
    pub fn cleanup(&mut self) {
        tracing::info!("Cleaning up job filter...");

        self.watch = Watch::Detached;
        self.changes.cancel(&mut self.timers);
        self.tracker.restore_all(&mut self.dom);
        self.state = ProcessingState::Idle;
        self.initialized = false;

        tracing::info!("Cleanup completed");
    }

    /// Full teardown. Afterwards no timer of any kind is pending.
    pub fn shutdown(&mut self) {
        self.cleanup();
        self.navigation.stop(&mut self.timers);
        self.refresh.stop(&mut self.timers);
        tracing::info!("Job filter shut down");
    }

    /// Feed one batch of structural changes observed on the page
    pub fn on_mutation(&mut self, records: &[MutationRecord<D::Handle>]) {
        if records.is_empty() {
            return;
        }
        let now = self.clock.now();

        self.observe_navigation(records, now);

        match self.watch {
            Watch::Detached => {}
            Watch::Document => {
                if let Some(container) = self.dom.query(&self.config.selectors.job_tile_list) {
                    tracing::info!("Job list found after waiting");
                    self.setup_filtering(container);
                }
            }
            Watch::Container(container) => {
                let relevant = records
                    .iter()
                    .filter(|r| self.dom.contains(container, r.target))
                    .count();
                if relevant > 0 {
                    tracing::debug!("Detected {} mutations", relevant);
                    self.changes.notify(&mut self.timers, now);
                }
            }
        }
    }

    fn observe_navigation(&mut self, records: &[MutationRecord<D::Handle>], now: Duration) {
        if !self.navigation.is_active() {
            return;
        }

        if records.iter().any(|r| self.dom.is_in_title(r.target)) {
            let url = self.dom.location();
            self.navigation
                .on_title_mutation(&url, &mut self.timers, now);
        }

        let list_selector = &self.config.selectors.job_tile_list;
        for record in records {
            let brings_list = record
                .added
                .iter()
                .any(|&node| self.dom.query_within(node, list_selector).is_some());
            if brings_list {
                self.navigation.on_list_inserted(&mut self.timers, now);
            }
        }
    }

    /// Feed a history or link-click signal
    pub fn on_navigation(&mut self, signal: &NavigationSignal) {
        let url = self.dom.location();
        let now = self.clock.now();
        self.navigation
            .on_signal(signal, &url, &mut self.timers, now);
    }

    /// Fire every timer due at the current time. Returns how many fired.
    pub fn run_due_timers(&mut self) -> usize {
        let now = self.clock.now();
        let mut fired = 0;

        while let Some(due) = self.timers.pop_due(now) {
            fired += 1;
            match due.kind {
                TimerKind::Reprocess => {
                    if self.changes.fire(due.id) {
                        self.reprocess();
                    }
                }
                TimerKind::NavigationCheck => {
                    let url = self.dom.location();
                    self.navigation
                        .on_check_timer(due.id, &url, &mut self.timers, now);
                }
                TimerKind::NavigationNotify => {
                    if self.navigation.on_notify_timer(due.id) {
                        self.handle_route_change(now);
                    }
                }
                TimerKind::AutoRefresh => {
                    if self.refresh.owns(due.id) {
                        self.refresh.tick(&mut self.dom);
                    }
                }
            }
        }

        fired
    }

    fn handle_route_change(&mut self, now: Duration) {
        let url = self.navigation.current_url().to_string();
        tracing::info!("URL change detected ({}), reinitializing...", url);

        if self.navigation.is_listing(&url) {
            tracing::info!("On job listing page, reinitializing...");
            self.initialize();
            self.refresh
                .start(&self.config.auto_refresh, &mut self.timers, now);
        } else {
            tracing::info!("Not on job listing page, skipping reinitialization");
            self.refresh.stop(&mut self.timers);
        }
    }

    /// Answer one message from the settings surface
    pub fn handle_message(&mut self, message: InboundMessage) -> MessageResponse {
        match message {
            InboundMessage::SettingsUpdated { data } => {
                self.apply_settings_update(&data);
                MessageResponse::ok()
            }
            InboundMessage::GetStatus => MessageResponse::Status(self.status()),
            InboundMessage::ShowAllHidden => {
                self.restore_all();
                MessageResponse::ok()
            }
        }
    }

    pub fn status(&self) -> StatusReport {
        StatusReport::new(
            &self.config,
            &self.stats,
            self.state == ProcessingState::Processing,
        )
    }

    /// Earliest pending timer deadline on this orchestrator's clock
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_deadline()
    }

    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    pub fn state(&self) -> ProcessingState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn is_hidden(&self, item: &D::Handle) -> bool {
        self.tracker.is_hidden(item)
    }

    pub fn hidden_count(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_refresh_running(&self) -> bool {
        self.refresh.is_running()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn dom(&self) -> &D {
        &self.dom
    }

    /// Host-side page access. Structural edits must be reported back
    /// through `on_mutation`.
    pub fn dom_mut(&mut self) -> &mut D {
        &mut self.dom
    }
}
