//! In-process backend over a bounded buffer.
//!
//! Suited to tests, development and single-process deployments: nothing
//! survives a restart. Delays are scheduled with a timer that re-publishes
//! the payloads once it fires.

pub mod message;
pub mod queue;

pub use message::MemoryMessage;
pub use queue::{MemoryQueue, MemoryQueueOptions, DEFAULT_BUFFER_SIZE};
