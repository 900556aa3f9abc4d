use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, warn};

use crate::consumer::{process_message, Handler};
use crate::message::MessageRef;
use crate::observability::ConsumerMetrics;
use crate::types::ConsumerId;

/// Result of handing a message to a [`Delivery`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The handler is running or queued on the consumer
    Admitted,
    /// The consumer is shutting down; the message was returned to its queue
    Cancelled,
}

impl Admission {
    pub fn is_cancelled(self) -> bool {
        matches!(self, Admission::Cancelled)
    }
}

/// One reserved handler slot.
///
/// Dropping an unused slot gives it back to the consumer.
#[derive(Debug)]
pub struct Slot {
    _permit: OwnedSemaphorePermit,
}

/// Callback a [`Worker`](crate::backend::Worker) uses to hand messages to its consumer.
///
/// Every message passes the consumer's admission gate: at most
/// `max_num_worker` handlers run at once and `send` suspends the worker
/// while the gate is full.
#[derive(Clone)]
pub struct Delivery {
    consumer_id: ConsumerId,
    handler: Option<Arc<dyn Handler>>,
    slots: Arc<Semaphore>,
    tracker: TaskTracker,
    cancel: CancellationToken,
    metrics: Arc<ConsumerMetrics>,
}

impl Delivery {
    pub(crate) fn new(
        consumer_id: ConsumerId,
        handler: Option<Arc<dyn Handler>>,
        slots: Arc<Semaphore>,
        cancel: CancellationToken,
        metrics: Arc<ConsumerMetrics>,
    ) -> Self {
        Self {
            consumer_id,
            handler,
            slots,
            tracker: TaskTracker::new(),
            cancel,
            metrics,
        }
    }

    /// Wait for a free handler slot.
    ///
    /// Returns `None` once the consumer is cancelled.
    pub async fn reserve(&self) -> Option<Slot> {
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            permit = self.slots.clone().acquire_owned() => {
                permit.ok().map(|permit| Slot { _permit: permit })
            }
        }
    }

    /// Run the handler for `message` in a previously reserved slot
    pub fn admit(&self, slot: Slot, message: MessageRef) {
        debug!("Consumer {} admitted message {}", self.consumer_id, message.name());

        let handler = self.handler.clone();
        let metrics = self.metrics.clone();
        self.tracker.spawn(async move {
            metrics.handler_started();
            let _in_flight = InFlight {
                metrics,
                message: message.clone(),
                _slot: slot,
            };
            match handler {
                Some(handler) => {
                    process_message(handler.as_ref(), message).await;
                }
                None => {
                    warn!("No handler configured, message {} left pending", message.name());
                }
            }
        });
    }

    /// Admit one message, waiting for a slot if all are busy
    pub async fn send(&self, message: MessageRef) -> Admission {
        match self.reserve().await {
            Some(slot) => {
                self.admit(slot, message);
                Admission::Admitted
            }
            None => {
                release_unadmitted(message).await;
                Admission::Cancelled
            }
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Resolves when the consumer stops admitting messages
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }

    pub(crate) fn metrics(&self) -> &ConsumerMetrics {
        &self.metrics
    }

    pub(crate) fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }
}

/// Hand a message the consumer will not process back to its queue
pub async fn release_unadmitted(message: MessageRef) {
    if let Err(err) = message.reject().await {
        warn!("Failed to release unadmitted message {}: {}", message.name(), err);
    }
}

/// Bookkeeping for one running handler; fields drop after `drop` runs,
/// so the slot is released last.
struct InFlight {
    metrics: Arc<ConsumerMetrics>,
    message: MessageRef,
    _slot: Slot,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if std::thread::panicking() {
            error!("Handler panicked while processing message {}", self.message.name());
        }
        self.metrics.handler_finished(self.message.status());
    }
}
