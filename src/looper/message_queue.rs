//! Deadline-ordered message queue with synchronous barriers.
//!
//! Messages are ordered by `(deadline, sequence)`, so messages that share a
//! deadline run in the order they were posted. A barrier holds back every
//! synchronous message queued behind it; asynchronous messages pass.

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

/// Unit of work run on the looper thread.
pub type Work = Box<dyn FnOnce()>;

/// Identifies a posted message so it can be removed before it runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct MessageToken(u64);

/// Identifies a synchronous barrier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BarrierToken(u64);

enum Entry {
    Message { work: Work, asynchronous: bool },
    Barrier,
}

pub(crate) struct MessageQueue {
    entries: BTreeMap<(Duration, u64), Entry>,
    deadlines: HashMap<u64, Duration>,
    next_seq: u64,
}

impl MessageQueue {
    pub(crate) fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
            deadlines: HashMap::new(),
            next_seq: 0,
        }
    }

    pub(crate) fn enqueue(&mut self, when: Duration, work: Work, asynchronous: bool) -> MessageToken {
        let seq = self.insert(when, Entry::Message { work, asynchronous });
        MessageToken(seq)
    }

    pub(crate) fn enqueue_barrier(&mut self, when: Duration) -> BarrierToken {
        BarrierToken(self.insert(when, Entry::Barrier))
    }

    /// Removes a pending message and hands its work back to the caller.
    ///
    /// The work is returned rather than dropped so the caller can release any
    /// borrow of the queue before its captures are destroyed.
    pub(crate) fn remove(&mut self, token: MessageToken) -> Option<Work> {
        match self.take(token.0)? {
            Entry::Message { work, .. } => Some(work),
            Entry::Barrier => None,
        }
    }

    pub(crate) fn remove_barrier(&mut self, token: BarrierToken) -> bool {
        let key = match self.deadlines.get(&token.0) {
            Some(when) => (*when, token.0),
            None => return false,
        };

        if !matches!(self.entries.get(&key), Some(Entry::Barrier)) {
            return false;
        }
        self.take(token.0).is_some()
    }

    /// Removes and returns the first message allowed to run at `now`.
    pub(crate) fn pop_due(&mut self, now: Duration) -> Option<Work> {
        let mut blocked = false;
        let key = self
            .entries
            .iter()
            .take_while(|((when, _), _)| *when <= now)
            .find_map(|(key, entry)| match entry {
                Entry::Barrier => {
                    blocked = true;
                    None
                }
                Entry::Message { asynchronous, .. } if !blocked || *asynchronous => Some(*key),
                Entry::Message { .. } => None,
            })?;

        match self.take(key.1)? {
            Entry::Message { work, .. } => Some(work),
            Entry::Barrier => None,
        }
    }

    /// Deadline of the next message that is not held back by a barrier.
    pub(crate) fn next_deadline(&self) -> Option<Duration> {
        let mut blocked = false;
        self.entries.iter().find_map(|((when, _), entry)| match entry {
            Entry::Barrier => {
                blocked = true;
                None
            }
            Entry::Message { asynchronous, .. } if !blocked || *asynchronous => Some(*when),
            Entry::Message { .. } => None,
        })
    }

    /// Number of queued messages, barriers excluded.
    pub(crate) fn len(&self) -> usize {
        self.entries
            .values()
            .filter(|entry| matches!(entry, Entry::Message { .. }))
            .count()
    }

    /// Empties the queue, returning the discarded work.
    pub(crate) fn clear(&mut self) -> Vec<Work> {
        self.deadlines.clear();
        std::mem::take(&mut self.entries)
            .into_values()
            .filter_map(|entry| match entry {
                Entry::Message { work, .. } => Some(work),
                Entry::Barrier => None,
            })
            .collect()
    }

    fn insert(&mut self, when: Duration, entry: Entry) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;

        self.entries.insert((when, seq), entry);
        self.deadlines.insert(seq, when);
        seq
    }

    fn take(&mut self, seq: u64) -> Option<Entry> {
        let when = self.deadlines.remove(&seq)?;
        self.entries.remove(&(when, seq))
    }
}
