#[cfg(feature = "memory")]
pub mod memory;
pub mod polling;

pub use polling::{FetchOutcome, PollingWorker};

use async_trait::async_trait;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::consumer::{Consumer, ConsumerOptions, Delivery};
use crate::message::MessageRef;
use crate::types::Payload;
use crate::QueueResult;

/// Named publish/consume endpoint implemented by every backend
#[async_trait]
pub trait Queue: Send + Sync {
    /// Queue name, used as its key in the bus
    fn name(&self) -> &str;

    /// Best-effort count of messages waiting for delivery
    async fn size(&self) -> usize;

    /// Enqueue one message per payload; never drops silently
    async fn publish(&self, payloads: Vec<Payload>) -> QueueResult<()>;

    /// Enqueue after `delay` without blocking the caller
    async fn later(&self, delay: Duration, payloads: Vec<Payload>) -> QueueResult<()>;

    /// Bind a worker for this queue to a new consumer
    fn consumer(&self, options: ConsumerOptions) -> QueueResult<Consumer>;
}

/// Backend delivery loop driven by a consumer.
///
/// `daemon` hands messages to `delivery` one at a time until `cancel`
/// fires; parallelism is the consumer's job. Returning `Err` ends the
/// consumer run.
#[async_trait]
pub trait Worker: Send + Sync {
    fn name(&self) -> &str;

    async fn daemon(&self, cancel: CancellationToken, delivery: Delivery) -> QueueResult<()>;
}

/// Pull capability of polling backends, see [`PollingWorker`]
#[async_trait]
pub trait Fetch: Send + Sync {
    /// Claim up to `max` waiting messages; an empty vec means none are ready
    async fn fetch(&self, max: usize) -> QueueResult<Vec<MessageRef>>;
}
