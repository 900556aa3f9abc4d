use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::types::MessageStatus;

/// Live counters for one consumer, shared across its runs
#[derive(Debug, Default)]
pub struct ConsumerMetrics {
    fetches: AtomicU64,
    admitted: AtomicU64,
    acked: AtomicU64,
    rejected: AtomicU64,
    left_pending: AtomicU64,
    in_flight: AtomicU64,
    peak_in_flight: AtomicU64,
}

impl ConsumerMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_fetch(&self) {
        self.fetches.fetch_add(1, Ordering::Relaxed);
    }

    /// A message passed admission and its handler is about to run
    pub fn handler_started(&self) {
        self.admitted.fetch_add(1, Ordering::Relaxed);
        let now = self.in_flight.fetch_add(1, Ordering::AcqRel) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::AcqRel);
    }

    /// The handler returned and left the message in `status`
    pub fn handler_finished(&self, status: MessageStatus) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        let counter = match status {
            MessageStatus::Acked => &self.acked,
            MessageStatus::Rejected => &self.rejected,
            MessageStatus::Pending => &self.left_pending,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ConsumerStats {
        ConsumerStats {
            fetches: self.fetches.load(Ordering::Relaxed),
            admitted: self.admitted.load(Ordering::Relaxed),
            acked: self.acked.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            left_pending: self.left_pending.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Acquire),
            peak_in_flight: self.peak_in_flight.load(Ordering::Acquire),
        }
    }
}

/// Point-in-time copy of [`ConsumerMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerStats {
    pub fetches: u64,
    pub admitted: u64,
    pub acked: u64,
    pub rejected: u64,
    pub left_pending: u64,
    pub in_flight: u64,
    pub peak_in_flight: u64,
}

impl ConsumerStats {
    /// Handler invocations that have returned
    pub fn completed(&self) -> u64 {
        self.acked + self.rejected + self.left_pending
    }
}
