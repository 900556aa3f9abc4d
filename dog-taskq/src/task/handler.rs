use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, warn};

use crate::consumer::Handler;
use crate::message::MessageRef;
use crate::task::{TaskEnvelope, TaskRegistry};

/// Handler that runs task envelopes against a registry.
///
/// Task failures, unknown task names and undecodable envelopes are logged
/// and the message is acked anyway: a task message is never redelivered.
#[derive(Clone)]
pub struct TaskHandler {
    registry: Arc<TaskRegistry>,
}

impl TaskHandler {
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    async fn run(&self, message: &MessageRef) {
        let envelope: TaskEnvelope = match message.unmarshal() {
            Ok(envelope) => envelope,
            Err(err) => {
                error!("Message {} is not a task envelope: {}", message.name(), err);
                return;
            }
        };

        let task = match self.registry.build(&envelope.name, &envelope.data) {
            Ok(Some(task)) => task,
            Ok(None) => {
                warn!("Unknown task {}, dropping message {}", envelope.name, message.name());
                return;
            }
            Err(err) => {
                error!("Failed to decode task {}: {}", envelope.name, err);
                return;
            }
        };

        match task.run().await {
            Ok(()) => debug!("Task {} completed", envelope.name),
            Err(err) => error!("Task {} failed: {}", envelope.name, err),
        }
    }
}

#[async_trait]
impl Handler for TaskHandler {
    async fn handle(&self, message: MessageRef) {
        self.run(&message).await;

        if let Err(err) = message.ack().await {
            error!("Failed to ack task message {}: {}", message.name(), err);
        }
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryQueue;
    use crate::backend::{Fetch, Queue};
    use crate::task::Task;
    use crate::types::{MessageStatus, Payload};
    use crate::TaskError;
    use serde::{Deserialize, Serialize};
    use tracing_test::traced_test;

    #[derive(Serialize, Deserialize)]
    struct Explode;

    #[async_trait]
    impl Task for Explode {
        async fn handle(&self) -> Result<(), TaskError> {
            Err(TaskError::failed("kaboom"))
        }
    }

    async fn deliver(queue: &MemoryQueue, payload: Payload) -> MessageRef {
        queue.publish(vec![payload]).await.unwrap();
        queue.fetch(1).await.unwrap().pop().unwrap()
    }

    #[tokio::test]
    #[traced_test]
    async fn test_unknown_task_is_acked() {
        let queue = MemoryQueue::new("tasks");
        let handler = TaskHandler::new(Arc::new(TaskRegistry::new()));
        let payload = TaskEnvelope::seal("ghost", &Explode)
            .unwrap()
            .to_payload()
            .unwrap();
        let message = deliver(&queue, payload).await;

        handler.handle(message.clone()).await;

        assert_eq!(message.status(), MessageStatus::Acked);
        assert_eq!(queue.size().await, 0);
        assert!(logs_contain("Unknown task ghost"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_failed_task_is_logged_and_acked() {
        let queue = MemoryQueue::new("tasks");
        let registry = Arc::new(TaskRegistry::new());
        registry.register_name::<Explode>("explode");
        let handler = TaskHandler::new(registry);
        let payload = TaskEnvelope::seal("explode", &Explode)
            .unwrap()
            .to_payload()
            .unwrap();
        let message = deliver(&queue, payload).await;

        handler.handle(message.clone()).await;

        assert_eq!(message.status(), MessageStatus::Acked);
        assert!(logs_contain("kaboom"));
    }

    #[tokio::test]
    async fn test_garbage_is_acked() {
        let queue = MemoryQueue::new("tasks");
        let handler = TaskHandler::new(Arc::new(TaskRegistry::new()));
        let message = deliver(&queue, Payload::new(&"not an envelope").unwrap()).await;

        handler.handle(message.clone()).await;

        assert_eq!(message.status(), MessageStatus::Acked);
    }
}
