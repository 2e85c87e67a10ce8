//! Cancellable scheduled callbacks.
//!
//! Nothing here sleeps: the queue only records what is due and when. The
//! runtime waits on its event channel until `next_deadline` and then pops
//! whatever has come due. Every timer is tagged with the session epoch and
//! round it was armed for so a firing that outlived its round can be told
//! apart from a live one.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::Instant;

/// Identity of the session and round a timer belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct TimerTag {
    pub epoch: u64,
    pub round: u64,
}

impl TimerTag {
    pub fn new(epoch: u64, round: u64) -> Self {
        Self { epoch, round }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum_macros::Display)]
pub enum TimerKind {
    /// Countdown between `Begin` and the first round.
    Ready,
    /// Round timeout that auto-fills missing inputs.
    Timeout,
    /// Deferred resolution once the stillness window has elapsed.
    Stillness,
    /// Display pause after an outcome.
    Pause,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub tag: TimerTag,
    pub kind: TimerKind,
    pub due: Instant,
}

#[derive(Debug, PartialEq, Eq)]
struct Scheduled {
    timer: Timer,
    seq: u64,
}

impl Ord for Scheduled {
    // reversed: BinaryHeap is a max-heap and the earliest deadline must pop first
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .timer
            .due
            .cmp(&self.timer.due)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for Scheduled {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<Scheduled>,
    next_seq: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arm(&mut self, tag: TimerTag, kind: TimerKind, due: Instant) {
        log::trace!("arming {} timer for {:?}", kind, tag);
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(Scheduled {
            timer: Timer { tag, kind, due },
            seq,
        });
    }

    /// Removes and returns the earliest timer whose deadline is `<= now`.
    pub fn pop_due(&mut self, now: Instant) -> Option<Timer> {
        if self.heap.peek()?.timer.due <= now {
            self.heap.pop().map(|s| s.timer)
        } else {
            None
        }
    }

    pub fn next_deadline(&self) -> Option<Instant> {
        self.heap.peek().map(|s| s.timer.due)
    }

    /// Disarms every timer armed for `tag`.
    pub fn disarm(&mut self, tag: TimerTag) {
        self.heap.retain(|s| s.timer.tag != tag);
    }

    pub fn is_armed(&self, tag: TimerTag, kind: TimerKind) -> bool {
        self.heap
            .iter()
            .any(|s| s.timer.tag == tag && s.timer.kind == kind)
    }

    pub fn clear(&mut self) {
        self.heap.clear();
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
