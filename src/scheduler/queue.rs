//! Time-ordered queue of pending net changes.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::circuit::NetId;
use crate::error::{NetlistError, Result};
use crate::time::Time;

/// One heap entry. Entries made stale by a reschedule stay in the heap and
/// are skipped when they surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueEntry {
    time: Time,
    seq: u64,
    net: NetId,
}

impl Ord for QueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then_with(|| self.seq.cmp(&other.seq))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Pending event of one net.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Pending {
    time: Time,
    seq: u64,
}

/// Event queue with one live event per net.
///
/// Ties at the same timestamp are broken by insertion order, so events
/// scheduled earlier are processed first.
#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<Reverse<QueueEntry>>,
    pending: Vec<Option<Pending>>,
    next_seq: u64,
    now: Time,
}

impl EventQueue {
    /// Create a queue for `nets` nets.
    pub fn new(nets: usize) -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending: vec![None; nets],
            next_seq: 0,
            now: Time::ZERO,
        }
    }

    /// Current simulation time.
    pub fn now(&self) -> Time {
        self.now
    }

    /// Drop all events and rewind the clock.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.pending.iter_mut().for_each(|p| *p = None);
        self.next_seq = 0;
        self.now = Time::ZERO;
    }

    /// Move the clock forward without processing anything.
    pub fn advance_to(&mut self, time: Time) {
        if time > self.now {
            self.now = time;
        }
    }

    /// Number of live events.
    pub fn len(&self) -> usize {
        self.pending.iter().filter(|p| p.is_some()).count()
    }

    /// Check if no live events remain.
    pub fn is_empty(&self) -> bool {
        self.pending.iter().all(|p| p.is_none())
    }

    /// Check if a net has a pending event.
    pub fn is_pending(&self, net: NetId) -> bool {
        self.pending_time(net).is_some()
    }

    /// Time of a net's pending event.
    pub fn pending_time(&self, net: NetId) -> Option<Time> {
        self.pending.get(net.0).copied().flatten().map(|p| p.time)
    }

    /// Schedule `net` at `now + delay`.
    ///
    /// An already pending event is kept unless the new time is earlier.
    pub fn push(&mut self, net: NetId, delay: Time) -> Result<()> {
        let time = self.target(net, delay)?;
        match self.pending_time(net) {
            Some(existing) if existing <= time => Ok(()),
            _ => {
                self.insert(net, time);
                Ok(())
            }
        }
    }

    /// Schedule `net` at `now + delay`, replacing any pending event.
    pub fn reschedule(&mut self, net: NetId, delay: Time) -> Result<()> {
        let time = self.target(net, delay)?;
        if self.pending_time(net) != Some(time) {
            self.insert(net, time);
        }
        Ok(())
    }

    /// Cancel a net's pending event.
    pub fn cancel(&mut self, net: NetId) {
        if let Some(p) = self.pending.get_mut(net.0) {
            *p = None;
        }
    }

    /// Time of the earliest live event.
    pub fn peek_time(&mut self) -> Option<Time> {
        self.discard_stale();
        self.heap.peek().map(|Reverse(e)| e.time)
    }

    /// Remove the earliest live event and advance the clock to it.
    pub fn pop_next(&mut self) -> Option<(Time, NetId)> {
        self.discard_stale();
        let Reverse(entry) = self.heap.pop()?;
        self.pending[entry.net.0] = None;
        self.now = entry.time;
        Some((entry.time, entry.net))
    }

    fn target(&self, net: NetId, delay: Time) -> Result<Time> {
        if delay.is_negative() {
            return Err(NetlistError::NegativeDelay { net, delay });
        }
        Ok(self.now + delay)
    }

    fn insert(&mut self, net: NetId, time: Time) {
        if net.0 >= self.pending.len() {
            self.pending.resize(net.0 + 1, None);
        }
        let seq = self.next_seq;
        self.next_seq += 1;
        self.pending[net.0] = Some(Pending { time, seq });
        self.heap.push(Reverse(QueueEntry { time, seq, net }));
    }

    fn discard_stale(&mut self) {
        while let Some(Reverse(top)) = self.heap.peek() {
            let live = self.pending[top.net.0] == Some(Pending {
                time: top.time,
                seq: top.seq,
            });
            if live {
                break;
            }
            self.heap.pop();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pop_in_time_order() {
        let mut q = EventQueue::new(3);
        q.push(NetId(0), Time::from_nsec(30)).unwrap();
        q.push(NetId(1), Time::from_nsec(10)).unwrap();
        q.push(NetId(2), Time::from_nsec(20)).unwrap();

        assert_eq!(q.pop_next(), Some((Time::from_nsec(10), NetId(1))));
        assert_eq!(q.pop_next(), Some((Time::from_nsec(20), NetId(2))));
        assert_eq!(q.now(), Time::from_nsec(20));
        assert_eq!(q.pop_next(), Some((Time::from_nsec(30), NetId(0))));
        assert_eq!(q.pop_next(), None);
    }

    #[test]
    fn test_ties_follow_insertion_order() {
        let mut q = EventQueue::new(3);
        q.push(NetId(2), Time::from_nsec(5)).unwrap();
        q.push(NetId(0), Time::from_nsec(5)).unwrap();
        q.push(NetId(1), Time::from_nsec(5)).unwrap();

        let order: Vec<_> = std::iter::from_fn(|| q.pop_next().map(|(_, n)| n)).collect();
        assert_eq!(order, vec![NetId(2), NetId(0), NetId(1)]);
    }

    #[test]
    fn test_negative_delay_rejected() {
        let mut q = EventQueue::new(1);
        let err = q.push(NetId(0), Time::from_nsec(-1)).unwrap_err();
        assert!(matches!(err, NetlistError::NegativeDelay { .. }));
        assert!(q.reschedule(NetId(0), Time::from_psec(-1)).is_err());
        assert!(q.is_empty());
    }

    #[test]
    fn test_push_keeps_earliest() {
        let mut q = EventQueue::new(1);
        q.push(NetId(0), Time::from_nsec(10)).unwrap();
        q.push(NetId(0), Time::from_nsec(20)).unwrap();
        assert_eq!(q.pending_time(NetId(0)), Some(Time::from_nsec(10)));
        q.push(NetId(0), Time::from_nsec(5)).unwrap();
        assert_eq!(q.pending_time(NetId(0)), Some(Time::from_nsec(5)));
        assert_eq!(q.len(), 1);
    }

    #[test]
    fn test_reschedule_replaces_pending() {
        let mut q = EventQueue::new(2);
        q.push(NetId(0), Time::from_nsec(10)).unwrap();
        q.push(NetId(1), Time::from_nsec(15)).unwrap();
        q.reschedule(NetId(0), Time::from_nsec(20)).unwrap();

        assert_eq!(q.pop_next(), Some((Time::from_nsec(15), NetId(1))));
        assert_eq!(q.pop_next(), Some((Time::from_nsec(20), NetId(0))));
        assert_eq!(q.pop_next(), None);
    }

    #[test]
    fn test_cancel() {
        let mut q = EventQueue::new(1);
        q.push(NetId(0), Time::from_nsec(10)).unwrap();
        q.cancel(NetId(0));
        assert_eq!(q.peek_time(), None);
        assert_eq!(q.pop_next(), None);
    }

    #[test]
    fn test_delay_is_relative_to_now() {
        let mut q = EventQueue::new(2);
        q.push(NetId(0), Time::from_nsec(10)).unwrap();
        q.pop_next();
        q.push(NetId(1), Time::from_nsec(5)).unwrap();
        assert_eq!(q.pending_time(NetId(1)), Some(Time::from_nsec(15)));
    }
}
