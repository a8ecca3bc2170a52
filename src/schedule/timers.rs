// Timer queue drained by the single event loop

use std::collections::BTreeMap;
use std::time::Duration;

/// Identity of one scheduled timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Entry<K> {
    kind: K,
    deadline: Duration,
    interval: Option<Duration>,
}

/// A timer that has come due
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DueTimer<K> {
    pub id: TimerId,
    pub kind: K,
    pub deadline: Duration,
}

/// One-shot and repeating timers keyed by a kind label
#[derive(Debug)]
pub struct TimerQueue<K> {
    next_id: u64,
    entries: BTreeMap<TimerId, Entry<K>>,
}

impl<K: Copy> TimerQueue<K> {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            entries: BTreeMap::new(),
        }
    }

    /// Fire once, `delay` after `now`
    pub fn schedule_once(&mut self, now: Duration, delay: Duration, kind: K) -> TimerId {
        self.insert(now + delay, None, kind)
    }

    /// Fire every `interval`, first at `now + interval`
    pub fn schedule_repeating(&mut self, now: Duration, interval: Duration, kind: K) -> TimerId {
        self.insert(now + interval, Some(interval), kind)
    }

    fn insert(&mut self, deadline: Duration, interval: Option<Duration>, kind: K) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.entries.insert(
            id,
            Entry {
                kind,
                deadline,
                interval,
            },
        );
        id
    }

    /// Remove a timer. Returns false if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        self.entries.remove(&id).is_some()
    }

    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Earliest pending deadline
    pub fn next_deadline(&self) -> Option<Duration> {
        self.entries.values().map(|e| e.deadline).min()
    }

    /// Take the earliest timer due at `now`. Ties fire in scheduling order.
    /// Repeating timers are re-armed one interval after their deadline, or
    /// one interval after `now` when ticks were missed; missed ticks are
    /// dropped, never fired back to back.
    pub fn pop_due(&mut self, now: Duration) -> Option<DueTimer<K>> {
        let (&id, entry) = self
            .entries
            .iter()
            .filter(|(_, e)| e.deadline <= now)
            .min_by_key(|(id, e)| (e.deadline, **id))?;

        let due = DueTimer {
            id,
            kind: entry.kind,
            deadline: entry.deadline,
        };
        let interval = entry.interval;

        match interval {
            Some(interval) => {
                if let Some(entry) = self.entries.get_mut(&id) {
                    entry.deadline = (entry.deadline + interval).max(now + interval);
                }
            }
            None => {
                self.entries.remove(&id);
            }
        }

        Some(due)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Copy> Default for TimerQueue<K> {
    fn default() -> Self {
        Self::new()
    }
}
