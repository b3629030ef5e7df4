//! Pending-delivery ledger
//!
//! Holds the deliveries of a manual-ack session that have been written to
//! stdout but not yet acknowledged. Acknowledgment lines are matched against
//! the ledger by body, byte-for-byte. Bodies may repeat; the oldest pending
//! delivery with a matching body wins.
//!
//! Matching by body rather than by delivery tag lets the acknowledging side
//! be a separate, stateless process that only ever sees message text.
//!
//! # Lifecycle of an entry
//!
//! ```text
//! Delivered ──ack line matches──▶ Acknowledged
//!     │
//!     └────session stops────────▶ Abandoned (broker redelivers after disconnect)
//! ```
//!
//! The lookup strategy sits behind [`DeliveryIndex`]. [`LinearIndex`] scans in
//! arrival order and is the default; [`BodyIndex`] keys entries by body and
//! must stay observably identical to it.

use crate::core::sync::lock_or_error;
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::message::Delivery;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Storage and lookup strategy for pending deliveries
pub trait DeliveryIndex: Send {
    /// Record a newly delivered message as the youngest entry
    fn insert(&mut self, delivery: Delivery);

    /// Remove and return the oldest entry whose body equals `body`
    fn take_first(&mut self, body: &[u8]) -> Option<Delivery>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bodies of all entries, oldest first
    fn bodies(&self) -> Vec<Vec<u8>>;

    /// Remove every entry, oldest first
    fn drain_all(&mut self) -> Vec<Delivery>;
}

/// Arrival-ordered list searched front to back
#[derive(Debug, Default)]
pub struct LinearIndex {
    entries: Vec<Delivery>,
}

impl LinearIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DeliveryIndex for LinearIndex {
    fn insert(&mut self, delivery: Delivery) {
        self.entries.push(delivery);
    }

    fn take_first(&mut self, body: &[u8]) -> Option<Delivery> {
        let position = self.entries.iter().position(|d| d.body == body)?;
        Some(self.entries.remove(position))
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn bodies(&self) -> Vec<Vec<u8>> {
        self.entries.iter().map(|d| d.body.clone()).collect()
    }

    fn drain_all(&mut self) -> Vec<Delivery> {
        std::mem::take(&mut self.entries)
    }
}

/// Entries bucketed by body; each bucket keeps arrival order
///
/// A global arrival sequence number restores overall order for
/// [`DeliveryIndex::bodies`] and [`DeliveryIndex::drain_all`].
#[derive(Debug, Default)]
pub struct BodyIndex {
    by_body: HashMap<Vec<u8>, VecDeque<(u64, Delivery)>>,
    next_seq: u64,
    len: usize,
}

impl BodyIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn ordered(&self) -> Vec<(u64, &Delivery)> {
        let mut all: Vec<(u64, &Delivery)> = self
            .by_body
            .values()
            .flat_map(|bucket| bucket.iter().map(|(seq, d)| (*seq, d)))
            .collect();
        all.sort_by_key(|(seq, _)| *seq);
        all
    }
}

impl DeliveryIndex for BodyIndex {
    fn insert(&mut self, delivery: Delivery) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.len += 1;
        self.by_body
            .entry(delivery.body.clone())
            .or_default()
            .push_back((seq, delivery));
    }

    fn take_first(&mut self, body: &[u8]) -> Option<Delivery> {
        let bucket = self.by_body.get_mut(body)?;
        let (_, delivery) = bucket.pop_front()?;
        if bucket.is_empty() {
            self.by_body.remove(body);
        }
        self.len -= 1;
        Some(delivery)
    }

    fn len(&self) -> usize {
        self.len
    }

    fn bodies(&self) -> Vec<Vec<u8>> {
        self.ordered()
            .into_iter()
            .map(|(_, d)| d.body.clone())
            .collect()
    }

    fn drain_all(&mut self) -> Vec<Delivery> {
        let mut all: Vec<(u64, Delivery)> = self
            .by_body
            .drain()
            .flat_map(|(_, bucket)| bucket.into_iter())
            .collect();
        all.sort_by_key(|(seq, _)| *seq);
        self.len = 0;
        all.into_iter().map(|(_, d)| d).collect()
    }
}

/// The ledger shared by the consume loop and the acknowledgment listener
///
/// Every operation takes the lock for exactly one insert or one
/// scan-and-maybe-remove and returns before any `.await`, so the guard never
/// crosses a suspension point.
pub struct PendingLedger {
    index: Mutex<Box<dyn DeliveryIndex>>,
}

impl PendingLedger {
    /// Ledger using the linear arrival-order scan
    pub fn new() -> Self {
        Self::with_index(LinearIndex::new())
    }

    pub fn with_index(index: impl DeliveryIndex + 'static) -> Self {
        Self {
            index: Mutex::new(Box::new(index)),
        }
    }

    fn lock(&self) -> QueueResult<std::sync::MutexGuard<'_, Box<dyn DeliveryIndex>>> {
        lock_or_error(&self.index, |message| QueueError::Internal { message })
    }

    pub fn insert(&self, delivery: Delivery) -> QueueResult<()> {
        self.lock()?.insert(delivery);
        Ok(())
    }

    /// Remove the oldest pending delivery whose body equals `body`
    ///
    /// The caller acknowledges it afterwards; once removed here it can no
    /// longer be matched by another line.
    pub fn take_match(&self, body: &[u8]) -> QueueResult<Option<Delivery>> {
        Ok(self.lock()?.take_first(body))
    }

    pub fn len(&self) -> QueueResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> QueueResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    pub fn pending_bodies(&self) -> QueueResult<Vec<Vec<u8>>> {
        Ok(self.lock()?.bodies())
    }

    /// Move every remaining entry to the abandoned state
    ///
    /// Nothing is nacked: the broker requeues them when the connection closes.
    pub fn abandon_all(&self) -> QueueResult<Vec<Delivery>> {
        Ok(self.lock()?.drain_all())
    }
}

impl Default for PendingLedger {
    fn default() -> Self {
        Self::new()
    }
}
