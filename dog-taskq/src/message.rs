use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::types::{MessageStatus, Payload};
use crate::{QueueError, QueueResult};

/// Shared handle to a delivered message
pub type MessageRef = Arc<dyn Message>;

/// One unit of work handed to a handler.
///
/// A message starts `Pending` and is resolved exactly once: `ack` consumes
/// it, `reject` hands the payload back to the backend for redelivery. The
/// two are mutually exclusive; whichever call wins the race decides the
/// outcome and every later call fails with [`QueueError::AlreadyAcked`] or
/// [`QueueError::AlreadyRejected`].
#[async_trait]
pub trait Message: Send + Sync {
    /// Diagnostic label, stable for the lifetime of this delivery
    fn name(&self) -> &str;

    /// The encoded payload
    fn payload(&self) -> &Payload;

    /// Current acknowledgment status
    fn status(&self) -> MessageStatus;

    /// Mark the message consumed
    async fn ack(&self) -> QueueResult<()>;

    /// Return the payload to the queue
    async fn reject(&self) -> QueueResult<()>;

    /// Raw payload bytes
    fn body(&self) -> &[u8] {
        self.payload().as_slice()
    }
}

impl dyn Message {
    /// Decode the payload into `T`
    pub fn unmarshal<T: DeserializeOwned>(&self) -> QueueResult<T> {
        self.payload().decode()
    }
}

/// Atomic Pending/Acked/Rejected cell shared by backend message types.
///
/// Backends flip the state before talking to their transport and call
/// [`AckState::revert`] when the transport refuses, so the message can be
/// resolved again.
#[derive(Debug)]
pub struct AckState {
    status: AtomicU8,
}

impl AckState {
    pub fn new() -> Self {
        Self {
            status: AtomicU8::new(MessageStatus::Pending.as_u8()),
        }
    }

    pub fn status(&self) -> MessageStatus {
        MessageStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    /// Pending -> Acked
    pub fn mark_acked(&self) -> QueueResult<()> {
        self.transition(MessageStatus::Acked)
    }

    /// Pending -> Rejected
    pub fn mark_rejected(&self) -> QueueResult<()> {
        self.transition(MessageStatus::Rejected)
    }

    /// Undo a transition whose backend action failed.
    ///
    /// Only resets when the cell still holds `from`.
    pub fn revert(&self, from: MessageStatus) {
        if let Err(current) = self.status.compare_exchange(
            from.as_u8(),
            MessageStatus::Pending.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            debug!(
                "Ack state revert from {:?} skipped, state is {:?}",
                from,
                MessageStatus::from_u8(current)
            );
        }
    }

    fn transition(&self, target: MessageStatus) -> QueueResult<()> {
        match self.status.compare_exchange(
            MessageStatus::Pending.as_u8(),
            target.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(()),
            Err(current) => match MessageStatus::from_u8(current) {
                MessageStatus::Acked => Err(QueueError::AlreadyAcked),
                MessageStatus::Rejected => Err(QueueError::AlreadyRejected),
                // compare_exchange only fails on a non-pending value
                MessageStatus::Pending => Err(QueueError::internal("ack state changed concurrently")),
            },
        }
    }
}

impl Default for AckState {
    fn default() -> Self {
        Self::new()
    }
}
