//! Client-side route change detection
//!
//! Single-page apps change the URL without reloading. Several independent
//! signals hint at such a change; each one funnels into the same URL
//! comparison, so one real navigation raises exactly one debounced
//! route-change event no matter how many signals saw it.

use crate::config::NavigationConfig;
use crate::schedule::{ChangeScheduler, TimerId, TimerQueue};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Navigation signals the host forwards from its event sources
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NavigationSignal {
    /// A history entry was pushed programmatically
    HistoryPush,
    /// The current history entry was replaced programmatically
    HistoryReplace,
    /// Browser back/forward
    PopState,
    /// The user clicked a link
    LinkClicked { href: String },
}

/// Tracks the last known URL and schedules the delayed checks
#[derive(Debug)]
pub struct NavigationMonitor<K> {
    current_url: String,
    listing_path: String,
    link_check_delay: Duration,
    insert_check_delay: Duration,
    check_kind: K,
    pending_checks: Vec<TimerId>,
    notifier: ChangeScheduler<K>,
    active: bool,
}

impl<K: Copy> NavigationMonitor<K> {
    pub fn new(
        settings: &NavigationConfig,
        initial_url: impl Into<String>,
        check_kind: K,
        notify_kind: K,
    ) -> Self {
        Self {
            current_url: initial_url.into(),
            listing_path: settings.listing_path.clone(),
            link_check_delay: Duration::from_millis(settings.link_check_delay_ms),
            insert_check_delay: Duration::from_millis(settings.insert_check_delay_ms),
            check_kind,
            pending_checks: Vec::new(),
            notifier: ChangeScheduler::new(
                Duration::from_millis(settings.notify_delay_ms),
                notify_kind,
            ),
            active: false,
        }
    }

    /// Begin reacting to signals, taking `url` as the known location
    pub fn start(&mut self, url: impl Into<String>) {
        self.current_url = url.into();
        self.active = true;
        tracing::debug!("Navigation monitor watching from {}", self.current_url);
    }

    /// Stop reacting and drop every pending check and notification
    pub fn stop(&mut self, timers: &mut TimerQueue<K>) {
        self.active = false;
        for id in self.pending_checks.drain(..) {
            timers.cancel(id);
        }
        self.notifier.cancel(timers);
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn current_url(&self) -> &str {
        &self.current_url
    }

    /// True when `url` is a job-listing page
    pub fn is_listing(&self, url: &str) -> bool {
        url.contains(&self.listing_path)
    }

    /// Handle a history or link signal. `url` is the location right now.
    pub fn on_signal(
        &mut self,
        signal: &NavigationSignal,
        url: &str,
        timers: &mut TimerQueue<K>,
        now: Duration,
    ) {
        if !self.active {
            return;
        }

        match signal {
            NavigationSignal::HistoryPush
            | NavigationSignal::HistoryReplace
            | NavigationSignal::PopState => {
                self.check_url_change(url, timers, now);
            }
            NavigationSignal::LinkClicked { href } => {
                if self.is_listing(href) {
                    self.schedule_check(self.link_check_delay, timers, now);
                }
            }
        }
    }

    /// The document title changed, which single-page apps do on navigation
    pub fn on_title_mutation(&mut self, url: &str, timers: &mut TimerQueue<K>, now: Duration) {
        if self.active {
            self.check_url_change(url, timers, now);
        }
    }

    /// Freshly inserted nodes contain a new list container
    pub fn on_list_inserted(&mut self, timers: &mut TimerQueue<K>, now: Duration) {
        if self.active {
            self.schedule_check(self.insert_check_delay, timers, now);
        }
    }

    /// A delayed check came due. Returns false if `id` is not one of ours.
    pub fn on_check_timer(
        &mut self,
        id: TimerId,
        url: &str,
        timers: &mut TimerQueue<K>,
        now: Duration,
    ) -> bool {
        let Some(pos) = self.pending_checks.iter().position(|p| *p == id) else {
            return false;
        };
        self.pending_checks.swap_remove(pos);
        self.check_url_change(url, timers, now);
        true
    }

    /// The debounced notification came due. True means raise the
    /// route-change event now.
    pub fn on_notify_timer(&mut self, id: TimerId) -> bool {
        self.notifier.fire(id)
    }

    fn schedule_check(&mut self, delay: Duration, timers: &mut TimerQueue<K>, now: Duration) {
        let id = timers.schedule_once(now, delay, self.check_kind);
        self.pending_checks.push(id);
    }

    /// Compare against the stored URL; a difference updates it and
    /// (re)arms the debounced notification.
    fn check_url_change(&mut self, url: &str, timers: &mut TimerQueue<K>, now: Duration) -> bool {
        if url == self.current_url {
            return false;
        }

        tracing::info!("URL changed from {} to {}", self.current_url, url);
        self.current_url = url.to_string();
        self.notifier.notify(timers, now);
        true
    }
}
