// Debounced trigger: a burst of notifications collapses into one firing

use super::timers::{TimerId, TimerQueue};
use std::time::Duration;

/// Holds at most one pending timer. Every `notify` restarts it, so the
/// timer fires once, `delay` after the last notification in a burst.
/// What the firing triggers is up to whoever dispatches `kind`.
#[derive(Debug)]
pub struct ChangeScheduler<K> {
    delay: Duration,
    kind: K,
    pending: Option<TimerId>,
}

impl<K: Copy> ChangeScheduler<K> {
    pub fn new(delay: Duration, kind: K) -> Self {
        Self {
            delay,
            kind,
            pending: None,
        }
    }

    /// Cancel any pending timer and schedule a fresh one
    pub fn notify(&mut self, timers: &mut TimerQueue<K>, now: Duration) -> TimerId {
        if let Some(id) = self.pending.take() {
            timers.cancel(id);
        }
        let id = timers.schedule_once(now, self.delay, self.kind);
        self.pending = Some(id);
        id
    }

    /// Drop the pending timer without firing. Returns whether one existed.
    pub fn cancel(&mut self, timers: &mut TimerQueue<K>) -> bool {
        match self.pending.take() {
            Some(id) => timers.cancel(id),
            None => false,
        }
    }

    /// Acknowledge a fired timer of this scheduler's kind.
    /// Returns false for a timer that is no longer the pending one.
    pub fn fire(&mut self, id: TimerId) -> bool {
        if self.pending == Some(id) {
            self.pending = None;
            true
        } else {
            false
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    fn drain(timers: &mut TimerQueue<()>, debouncer: &mut ChangeScheduler<()>, now: Duration) -> Vec<Duration> {
        let mut fired = Vec::new();
        while let Some(due) = timers.pop_due(now) {
            if debouncer.fire(due.id) {
                fired.push(due.deadline);
            }
        }
        fired
    }

    #[test]
    fn test_burst_fires_once_after_last_notify() {
        let mut timers = TimerQueue::new();
        let mut debouncer = ChangeScheduler::new(ms(300), ());

        for t in [0, 100, 200, 250, 400] {
            assert!(drain(&mut timers, &mut debouncer, ms(t)).is_empty());
            debouncer.notify(&mut timers, ms(t));
        }

        assert!(drain(&mut timers, &mut debouncer, ms(699)).is_empty());
        assert_eq!(drain(&mut timers, &mut debouncer, ms(700)), vec![ms(700)]);
        assert!(!debouncer.is_pending());
        assert!(drain(&mut timers, &mut debouncer, ms(5000)).is_empty());
    }

    #[test]
    fn test_separate_bursts_fire_separately() {
        let mut timers = TimerQueue::new();
        let mut debouncer = ChangeScheduler::new(ms(100), ());

        debouncer.notify(&mut timers, ms(0));
        assert_eq!(drain(&mut timers, &mut debouncer, ms(150)).len(), 1);
        debouncer.notify(&mut timers, ms(150));
        assert_eq!(drain(&mut timers, &mut debouncer, ms(300)).len(), 1);
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut timers = TimerQueue::new();
        let mut debouncer = ChangeScheduler::new(ms(100), ());

        assert!(!debouncer.cancel(&mut timers));
        debouncer.notify(&mut timers, ms(0));
        assert!(debouncer.cancel(&mut timers));
        assert!(drain(&mut timers, &mut debouncer, ms(1000)).is_empty());
        assert!(timers.is_empty());
    }
}
