use async_trait::async_trait;

use crate::backend::memory::MemoryQueue;
use crate::message::{AckState, Message};
use crate::types::{MessageId, MessageStatus, Payload};
use crate::QueueResult;

/// Message delivered by a [`MemoryQueue`].
///
/// Rejecting puts the original payload back at the tail of the buffer,
/// even when the buffer is full.
pub struct MemoryMessage {
    name: String,
    queue: MemoryQueue,
    payload: Payload,
    state: AckState,
}

impl MemoryMessage {
    pub(crate) fn new(queue: MemoryQueue, payload: Payload) -> Self {
        Self {
            name: format!("{}:{}", queue.name(), MessageId::new()),
            queue,
            payload,
            state: AckState::new(),
        }
    }
}

#[async_trait]
impl Message for MemoryMessage {
    fn name(&self) -> &str {
        &self.name
    }

    fn payload(&self) -> &Payload {
        &self.payload
    }

    fn status(&self) -> MessageStatus {
        self.state.status()
    }

    async fn ack(&self) -> QueueResult<()> {
        self.state.mark_acked()
    }

    async fn reject(&self) -> QueueResult<()> {
        self.state.mark_rejected()?;
        self.queue.requeue(self.payload.clone());
        Ok(())
    }
}
