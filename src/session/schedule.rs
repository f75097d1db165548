//! When the session should poll, reconcile early, and sweep the cache.

use std::time::{Duration, Instant};

use crate::config::EvidenceConfig;

/// Work due at a given instant.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Due {
    /// Regular poll: selection detection and reconciliation.
    pub poll: bool,
    /// Debounced reconciliation requested by an input event.
    pub event: bool,
    pub sweep: bool,
}

impl Due {
    #[must_use]
    pub fn reconcile(&self, visible: bool) -> bool {
        (self.poll && visible) || self.event
    }
}

/// Deadline bookkeeping for the session's periodic work.
///
/// Anchored lazily at the first [`PollSchedule::due`] call. Missed polls are not
/// replayed: after a long stall a single poll runs and the next is one interval
/// later.
#[derive(Debug, Clone)]
pub struct PollSchedule {
    poll_interval: Duration,
    debounce: Duration,
    sweep_interval: Duration,
    next_poll: Option<Instant>,
    next_sweep: Option<Instant>,
    event_deadline: Option<Instant>,
}

impl PollSchedule {
    #[must_use]
    pub fn new(config: &EvidenceConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            debounce: config.event_debounce(),
            sweep_interval: config.sweep_interval(),
            next_poll: None,
            next_sweep: None,
            event_deadline: None,
        }
    }

    /// Record an input event. Each event pushes the early run out by the
    /// debounce delay.
    pub fn note_event(&mut self, now: Instant) {
        self.event_deadline = Some(now + self.debounce);
    }

    /// Consume and report whatever is due at `now`.
    pub fn due(&mut self, now: Instant) -> Due {
        let next_poll = *self.next_poll.get_or_insert(now + self.poll_interval);
        let next_sweep = *self.next_sweep.get_or_insert(now + self.sweep_interval);

        let mut due = Due::default();
        if now >= next_poll {
            due.poll = true;
            self.next_poll = Some(now + self.poll_interval);
        }
        if now >= next_sweep {
            due.sweep = true;
            self.next_sweep = Some(now + self.sweep_interval);
        }
        if self.event_deadline.is_some_and(|d| now >= d) {
            due.event = true;
            self.event_deadline = None;
        }
        due
    }

    /// The earliest pending deadline, if anchored.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        [self.next_poll, self.next_sweep, self.event_deadline]
            .into_iter()
            .flatten()
            .min()
    }

    /// Forget all deadlines; the next `due` call re-anchors.
    pub fn reset(&mut self) {
        self.next_poll = None;
        self.next_sweep = None;
        self.event_deadline = None;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn test_poll_every_interval() {
        let t0 = Instant::now();
        let mut s = PollSchedule::new(&EvidenceConfig::default());
        assert_eq!(s.due(t0), Due::default());
        assert!(!s.due(t0 + ms(999)).poll);
        assert!(s.due(t0 + ms(1000)).poll);
        assert!(!s.due(t0 + ms(1500)).poll);
        assert!(s.due(t0 + ms(2000)).poll);
    }

    #[test]
    fn test_stall_does_not_replay() {
        let t0 = Instant::now();
        let mut s = PollSchedule::new(&EvidenceConfig::default());
        s.due(t0);
        assert!(s.due(t0 + ms(10_000)).poll);
        assert!(!s.due(t0 + ms(10_001)).poll);
    }

    #[test]
    fn test_event_debounce_extends() {
        let t0 = Instant::now();
        let mut s = PollSchedule::new(&EvidenceConfig::default());
        s.due(t0);
        s.note_event(t0);
        s.note_event(t0 + ms(60));
        assert!(!s.due(t0 + ms(120)).event);
        assert!(s.due(t0 + ms(160)).event);
        assert!(!s.due(t0 + ms(170)).event);
    }

    #[test]
    fn test_sweep_every_five_minutes() {
        let t0 = Instant::now();
        let mut s = PollSchedule::new(&EvidenceConfig::default());
        s.due(t0);
        assert!(!s.due(t0 + Duration::from_secs(299)).sweep);
        assert!(s.due(t0 + Duration::from_secs(300)).sweep);
    }

    #[test]
    fn test_reconcile_gate() {
        let poll = Due {
            poll: true,
            ..Due::default()
        };
        assert!(poll.reconcile(true));
        assert!(!poll.reconcile(false));
        let event = Due {
            event: true,
            ..Due::default()
        };
        assert!(event.reconcile(false));
    }

    #[test]
    fn test_next_deadline() {
        let t0 = Instant::now();
        let mut s = PollSchedule::new(&EvidenceConfig::default());
        assert!(s.next_deadline().is_none());
        s.due(t0);
        assert_eq!(s.next_deadline(), Some(t0 + ms(1000)));
        s.note_event(t0);
        assert_eq!(s.next_deadline(), Some(t0 + ms(100)));
    }
}
