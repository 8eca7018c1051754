//! Future-event set for the discrete-event kernel.
//!
//! A binary min-heap keyed by `(at, seq)`:
//! - Delivery in non-decreasing time order regardless of insertion order
//! - Same-instant events delivered in insertion order (`seq` tie-break)
//! - No cancellation; an inserted event is delivered exactly once

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::entity::ModuleId;
use crate::events::message::Message;
use crate::time::SimTime;

/// An event owned by the queue until delivery.
#[derive(Clone, Debug)]
pub struct ScheduledEvent {
    pub at: SimTime,
    pub seq: u64,
    pub target: ModuleId,
    pub message: Message,
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.at == other.at && self.seq == other.seq
    }
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledEvent {
    // Reversed: BinaryHeap is a max-heap, the earliest event must be on top.
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at
            .cmp(&self.at)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

#[derive(Debug, Default)]
pub struct EventQueue {
    heap: BinaryHeap<ScheduledEvent>,
    next_seq: u64,
}

impl EventQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            heap: BinaryHeap::with_capacity(capacity),
            next_seq: 0,
        }
    }

    /// Inserts an event and returns its sequence number.
    ///
    /// Past-time checks belong to the caller, which knows the current time.
    #[inline]
    pub fn insert(&mut self, at: SimTime, target: ModuleId, message: Message) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.heap.push(ScheduledEvent {
            at,
            seq,
            target,
            message,
        });
        seq
    }

    /// Removes the earliest event.
    #[inline]
    pub fn pop(&mut self) -> Option<ScheduledEvent> {
        self.heap.pop()
    }

    #[inline]
    pub fn peek_time(&self) -> Option<SimTime> {
        self.heap.peek().map(|event| event.at)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Total number of events ever inserted.
    #[inline]
    pub fn inserted(&self) -> u64 {
        self.next_seq
    }
}
