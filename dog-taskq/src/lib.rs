//! # dog-taskq: Backend-Agnostic Task Queue
//!
//! **Bounded consumers, explicit acknowledgment and typed tasks over any transport**
//!
//! Producers dispatch payloads or typed tasks to a named queue through a
//! [`Bus`]. Consumers pull messages through a bounded pool of handler
//! slots, and every handler resolves its message exactly once: `ack` to
//! consume it, `reject` to hand it back for redelivery.
//!
//! ## 🎯 Features
//!
//! - **Explicit Ack/Reject**: Pending → Acked | Rejected, race-free and final
//! - **Bounded Concurrency**: At most `max_num_worker` handlers, with backpressure on intake
//! - **Clean Shutdown**: Cancellation stops intake and waits for in-flight handlers
//! - **Typed Tasks**: Serializable values that run themselves, routed by registered name
//! - **Swappable Backends**: One `Queue`/`Worker` contract for in-memory and broker transports
//!
//! ## 🚀 Quick Start
//!
//! ```rust
//! use std::sync::Arc;
//! use dog_taskq::prelude::*;
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct SendReceipt {
//!     order_id: u64,
//! }
//!
//! #[async_trait::async_trait]
//! impl Task for SendReceipt {
//!     async fn handle(&self) -> Result<(), TaskError> {
//!         println!("receipt for order {}", self.order_id);
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> QueueResult<()> {
//! let bus = Bus::new();
//! bus.register_task::<SendReceipt>();
//!
//! let queue = MemoryQueue::new("default");
//! bus.add(Arc::new(queue.clone()));
//!
//! let consumer = queue.consumer(
//!     ConsumerOptions::new()
//!         .with_max_num_worker(4)
//!         .with_handler(bus.task_handler()),
//! )?;
//! let shutdown = CancellationToken::new();
//! consumer.start(shutdown.clone())?;
//!
//! bus.dispatch_task(&SendReceipt { order_id: 42 }).await?;
//!
//! shutdown.cancel();
//! consumer.join().await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod bus;
pub mod codec;
pub mod config;
pub mod consumer;
pub mod error;
pub mod message;
pub mod observability;
pub mod task;
pub mod types;

pub use backend::{Fetch, FetchOutcome, PollingWorker, Queue, Worker};
pub use bus::{Bus, ConnectorDirectory, DispatchOptions, QueueDirectory, DEFAULT_QUEUE};
pub use codec::Codec;
pub use consumer::{
    handler_fn, process_message, Admission, Consumer, ConsumerOptions, Delivery, Handler,
};
pub use error::{QueueError, QueueResult, TaskError};
pub use message::{AckState, Message, MessageRef};
pub use observability::ConsumerStats;
pub use task::{Delayed, OnQueue, Task, TaskEnvelope, TaskHandler, TaskRegistry};
pub use types::{ConsumerId, ConsumerState, MessageId, MessageStatus, Payload};

#[cfg(feature = "memory")]
pub use backend::memory::{MemoryQueue, MemoryQueueOptions};

pub use tokio_util::sync::CancellationToken;

/// Common imports for dog-taskq users
pub mod prelude {
    pub use crate::{
        handler_fn, Bus, CancellationToken, Consumer, ConsumerOptions, Delayed,
        DispatchOptions, Handler, Message, MessageRef, MessageStatus, OnQueue, Payload, Queue,
        QueueError, QueueResult, Task, TaskError, TaskHandler,
    };

    #[cfg(feature = "memory")]
    pub use crate::{MemoryQueue, MemoryQueueOptions};
}
