//! In-flight download queue.
//!
//! Pure synchronous state: no async, no I/O, no tracing. The engine owns the
//! queue and performs all side effects.
//!
//! # Ordering
//!
//! Jobs are downloaded in submission order. The oldest submitted job is always
//! the next one handed to the pump, which bounds how long any staged job waits
//! before its retention window could lapse.

mod types;

use std::collections::VecDeque;

pub use types::{DownloadInFlight, RetrievalInFlight};

/// FIFO of submitted jobs not yet started by the pump.
pub struct InFlightQueue {
    pending: VecDeque<DownloadInFlight>,
    max_len: usize,
}

impl InFlightQueue {
    pub const fn new(max_len: usize) -> Self {
        Self {
            pending: VecDeque::new(),
            max_len,
        }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn has_capacity(&self) -> bool {
        self.pending.len() < self.max_len
    }

    /// Append a newly admitted job.
    ///
    /// Callers check [`has_capacity`](Self::has_capacity) first; the cap is a
    /// memory bound, not a correctness one.
    pub fn push_back(&mut self, download: DownloadInFlight) {
        debug_assert!(self.has_capacity());
        self.pending.push_back(download);
    }

    pub fn pop_front(&mut self) -> Option<DownloadInFlight> {
        self.pending.pop_front()
    }

    /// Bytes still to be downloaded across the queue.
    pub fn pending_bytes(&self) -> u64 {
        self.pending.iter().map(DownloadInFlight::remaining).sum()
    }
}
