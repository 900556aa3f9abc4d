//! Dispatch front door.
//!
//! A [`Bus`] owns the queues an application talks to, the connectors that
//! build remote queues on first use, and the task registry. Producers only
//! need the bus and a queue name.

pub mod directory;

pub use directory::{Connector, ConnectorDirectory, QueueDirectory, DEFAULT_QUEUE};

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::backend::Queue;
use crate::consumer::{Consumer, ConsumerOptions};
use crate::task::{task_name, Task, TaskEnvelope, TaskHandler, TaskRegistry};
use crate::types::Payload;
use crate::{QueueError, QueueResult};

/// Where and when to deliver a dispatch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Destination queue, the bus default when `None`
    pub queue: Option<String>,
    /// Zero for immediate delivery
    pub delay: Duration,
}

impl DispatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_queue(mut self, queue: impl Into<String>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Registry of queues and tasks used by producers and consumers
#[derive(Default)]
pub struct Bus {
    queues: QueueDirectory,
    connectors: ConnectorDirectory,
    tasks: Arc<TaskRegistry>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queues(&self) -> &QueueDirectory {
        &self.queues
    }

    pub fn connectors(&self) -> &ConnectorDirectory {
        &self.connectors
    }

    pub fn tasks(&self) -> &Arc<TaskRegistry> {
        &self.tasks
    }

    /// Register a queue under its own name
    pub fn add(&self, queue: Arc<dyn Queue>) {
        self.queues.add(queue);
    }

    /// Register a lazily connected queue
    pub fn add_connector<F>(&self, name: impl Into<String>, connector: F)
    where
        F: Fn() -> QueueResult<Arc<dyn Queue>> + Send + Sync + 'static,
    {
        self.connectors.add(name, connector);
    }

    /// Queue used when a dispatch names none
    pub fn set_default(&self, name: impl Into<String>) {
        let name = name.into();
        self.queues.set_default(name.clone());
        self.connectors.set_default(name);
    }

    pub fn default_name(&self) -> String {
        self.queues.default_name()
    }

    /// Resolve a queue: registered queues first, then connectors
    pub fn get(&self, name: &str) -> QueueResult<Arc<dyn Queue>> {
        if self.queues.contains(name) {
            return self.queues.get(name);
        }
        self.connectors.get(name)
    }

    /// Consumer bound to the queue `name`
    pub fn consumer(&self, name: &str, options: ConsumerOptions) -> QueueResult<Consumer> {
        self.get(name)?.consumer(options)
    }

    /// Publish `payloads` to the queue selected by `options`.
    ///
    /// Fails with [`QueueError::NoPayloads`] on an empty batch and
    /// [`QueueError::QueueNotFound`] when the queue is unknown.
    pub async fn dispatch(&self, options: &DispatchOptions, payloads: Vec<Payload>) -> QueueResult<()> {
        if payloads.is_empty() {
            return Err(QueueError::NoPayloads);
        }

        let name = match &options.queue {
            Some(name) if !name.is_empty() => name.clone(),
            _ => self.default_name(),
        };
        let queue = self.get(&name)?;

        debug!(
            "Dispatching {} payloads to {} (delay {:?})",
            payloads.len(),
            name,
            options.delay
        );
        if options.delay.is_zero() {
            queue.publish(payloads).await
        } else {
            queue.later(options.delay, payloads).await
        }
    }

    /// Register `T` under its type name
    pub fn register_task<T: Task>(&self) -> String {
        self.tasks.register::<T>()
    }

    /// Register `T` under an explicit name
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn register_task_name<T: Task>(&self, name: impl Into<String>) -> String {
        self.tasks.register_name::<T>(name)
    }

    /// Dispatch a task under its type name
    pub async fn dispatch_task<T: Task>(&self, task: &T) -> QueueResult<()> {
        self.dispatch_task_name(task_name::<T>(), task).await
    }

    /// Dispatch a task under an explicit name, honouring its
    /// [`OnQueue`](crate::task::OnQueue) and [`Delayed`](crate::task::Delayed)
    /// capabilities
    pub async fn dispatch_task_name<T: Task>(&self, name: &str, task: &T) -> QueueResult<()> {
        if name.is_empty() {
            return Err(QueueError::InvalidTaskName(name.to_string()));
        }

        let mut options = DispatchOptions::new();
        if let Some(on_queue) = task.as_on_queue() {
            options.queue = Some(on_queue.on_queue().to_string());
        }
        if let Some(delayed) = task.as_delayed() {
            options.delay = delayed.delay();
        }

        let payload = TaskEnvelope::seal(name, task)?.to_payload()?;
        self.dispatch(&options, vec![payload]).await
    }

    /// Handler executing the tasks registered on this bus
    pub fn task_handler(&self) -> TaskHandler {
        TaskHandler::new(self.tasks.clone())
    }
}
