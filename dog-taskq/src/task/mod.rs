//! Typed tasks.
//!
//! A task is a serializable value that knows how to run itself. Tasks are
//! registered by name in a [`TaskRegistry`], travel as a MessagePack
//! [`TaskEnvelope`], and are executed by the generic [`TaskHandler`].
//!
//! ```compile_fail
//! use dog_taskq::TaskRegistry;
//!
//! #[derive(serde::Serialize, serde::Deserialize)]
//! struct NotATask;
//!
//! // only types implementing `Task` can be registered
//! TaskRegistry::new().register::<NotATask>();
//! ```

pub mod envelope;
pub mod handler;
pub mod registry;

pub use envelope::TaskEnvelope;
pub use handler::TaskHandler;
pub use registry::TaskRegistry;

use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::TaskError;

/// A payload that carries its own behaviour
#[async_trait]
pub trait Task: Serialize + DeserializeOwned + Send + Sync + 'static {
    async fn handle(&self) -> Result<(), TaskError>;

    /// Route this task to a specific queue, see [`OnQueue`]
    fn as_on_queue(&self) -> Option<&dyn OnQueue> {
        None
    }

    /// Deliver this task after a delay, see [`Delayed`]
    fn as_delayed(&self) -> Option<&dyn Delayed> {
        None
    }
}

/// Optional capability: the queue a task is dispatched to.
///
/// Expose it through [`Task::as_on_queue`].
pub trait OnQueue {
    fn on_queue(&self) -> &str;
}

/// Optional capability: how long to wait before delivery.
///
/// Expose it through [`Task::as_delayed`].
pub trait Delayed {
    fn delay(&self) -> Duration;
}

/// Name a task type is registered under by default
pub fn task_name<T: Task>() -> &'static str {
    std::any::type_name::<T>()
}
