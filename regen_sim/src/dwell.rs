//! Deferred continuations for the post-animation dwell.
//!
//! Hosts never sleep on the thread that processes session commands. Instead
//! they schedule a key at `now + dwell` and fold [`DwellScheduler::timeout_from`]
//! into their own wait, so one session's animation never delays another's
//! requests.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

#[derive(Debug)]
struct Scheduled<K> {
    deadline: Instant,
    seq: u64,
    key: K,
}

impl<K> PartialEq for Scheduled<K> {
    fn eq(&self, other: &Self) -> bool {
        self.deadline == other.deadline && self.seq == other.seq
    }
}

impl<K> Eq for Scheduled<K> {}

impl<K> PartialOrd for Scheduled<K> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K> Ord for Scheduled<K> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.deadline
            .cmp(&other.deadline)
            .then(self.seq.cmp(&other.seq))
    }
}

/// Min-heap of keys waiting for their deadline.
///
/// Keys sharing a deadline come back in the order they were scheduled.
#[derive(Debug)]
pub struct DwellScheduler<K> {
    queue: BinaryHeap<Reverse<Scheduled<K>>>,
    next_seq: u64,
}

impl<K> Default for DwellScheduler<K> {
    fn default() -> Self {
        Self {
            queue: BinaryHeap::new(),
            next_seq: 0,
        }
    }
}

impl<K> DwellScheduler<K> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, key: K, deadline: Instant) {
        let seq = self.next_seq;
        self.next_seq = self.next_seq.wrapping_add(1);
        self.queue.push(Reverse(Scheduled { deadline, seq, key }));
    }

    pub fn schedule_after(&mut self, key: K, now: Instant, dwell: Duration) -> Instant {
        let deadline = now + dwell;
        self.schedule(key, deadline);
        deadline
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.queue.peek().map(|Reverse(entry)| entry.deadline)
    }

    /// Time left until the earliest deadline, zero if one has already passed.
    pub fn timeout_from(&self, now: Instant) -> Option<Duration> {
        self.next_deadline()
            .map(|deadline| deadline.saturating_duration_since(now))
    }

    /// Removes and returns every key whose deadline is at or before `now`.
    pub fn pop_due(&mut self, now: Instant) -> Vec<K> {
        let mut due = Vec::new();
        while let Some(Reverse(entry)) = self.queue.peek() {
            if entry.deadline > now {
                break;
            }
            if let Some(Reverse(entry)) = self.queue.pop() {
                due.push(entry.key);
            }
        }
        due
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_only_due_keys_in_deadline_order() {
        let start = Instant::now();
        let mut scheduler = DwellScheduler::new();
        scheduler.schedule("late", start + Duration::from_millis(300));
        scheduler.schedule("early", start + Duration::from_millis(100));
        scheduler.schedule("middle", start + Duration::from_millis(200));

        assert_eq!(scheduler.next_deadline(), Some(start + Duration::from_millis(100)));
        assert!(scheduler.pop_due(start).is_empty());
        assert_eq!(
            scheduler.pop_due(start + Duration::from_millis(250)),
            vec!["early", "middle"]
        );
        assert_eq!(scheduler.len(), 1);
        assert_eq!(
            scheduler.timeout_from(start + Duration::from_millis(250)),
            Some(Duration::from_millis(50))
        );
        assert_eq!(
            scheduler.pop_due(start + Duration::from_secs(1)),
            vec!["late"]
        );
        assert!(scheduler.is_empty());
        assert_eq!(scheduler.timeout_from(start), None);
    }

    #[test]
    fn equal_deadlines_keep_scheduling_order() {
        let start = Instant::now();
        let mut scheduler = DwellScheduler::new();
        for key in 0..5u32 {
            scheduler.schedule_after(key, start, Duration::from_secs(1));
        }
        assert_eq!(
            scheduler.pop_due(start + Duration::from_secs(1)),
            vec![0, 1, 2, 3, 4]
        );
    }

    #[test]
    fn overdue_deadline_yields_zero_timeout() {
        let start = Instant::now();
        let mut scheduler = DwellScheduler::new();
        scheduler.schedule((), start);
        assert_eq!(
            scheduler.timeout_from(start + Duration::from_millis(5)),
            Some(Duration::ZERO)
        );
    }
}
