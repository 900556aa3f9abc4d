//! Bounded consumer engine.
//!
//! A [`Consumer`] wraps a backend [`Worker`] and runs the configured
//! [`Handler`] for every message the worker delivers, never more than
//! `max_num_worker` at a time. Intake is throttled by an admission gate
//! shared across restarts, so a polling worker stops fetching while every
//! slot is busy.

pub mod delivery;
pub mod handler;
pub mod options;

pub use delivery::{release_unadmitted, Admission, Delivery, Slot};
pub use handler::{handler_fn, Handler, HandlerFn};
pub use options::{
    ConsumerOptions, DEFAULT_FETCH_TIMEOUT, DEFAULT_POLL_INTERVAL, DEFAULT_PREFETCH_COUNT,
};

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::Worker;
use crate::message::MessageRef;
use crate::observability::{ConsumerMetrics, ConsumerStats};
use crate::types::{ConsumerId, ConsumerState, MessageStatus};
use crate::{QueueError, QueueResult};

/// Run `handler` on `message` and report how the handler left it
pub async fn process_message(handler: &dyn Handler, message: MessageRef) -> MessageStatus {
    handler.handle(message.clone()).await;

    let status = message.status();
    match status {
        MessageStatus::Acked => debug!("Message {} acked", message.name()),
        MessageStatus::Rejected => debug!("Message {} rejected", message.name()),
        MessageStatus::Pending => warn!(
            "Message {} was neither acked nor rejected by its handler",
            message.name()
        ),
    }
    status
}

/// Concurrency engine around a backend worker
pub struct Consumer {
    id: ConsumerId,
    worker: Arc<dyn Worker>,
    options: ConsumerOptions,
    state: Arc<AtomicU8>,
    slots: Arc<Semaphore>,
    metrics: Arc<ConsumerMetrics>,
    run: Mutex<Option<RunHandle>>,
}

struct RunHandle {
    cancel: CancellationToken,
    join: JoinHandle<QueueResult<()>>,
}

impl RunHandle {
    async fn settle(self) -> QueueResult<()> {
        self.join.await.map_err(|err| {
            if err.is_cancelled() {
                QueueError::WorkerShutdown
            } else {
                QueueError::internal(format!("consumer run panicked: {}", err))
            }
        })?
    }
}

impl Consumer {
    /// Bind a worker to a new consumer, filling unset options with defaults
    pub fn new(worker: Arc<dyn Worker>, options: ConsumerOptions) -> QueueResult<Self> {
        let options = options.with_defaults();
        if options.max_num_worker > Semaphore::MAX_PERMITS {
            return Err(QueueError::InvalidConfig(format!(
                "max_num_worker {} exceeds {}",
                options.max_num_worker,
                Semaphore::MAX_PERMITS
            )));
        }

        let id = options
            .id
            .clone()
            .map(ConsumerId::from)
            .unwrap_or_else(ConsumerId::random);

        Ok(Self {
            id,
            worker,
            slots: Arc::new(Semaphore::new(options.max_num_worker)),
            options,
            state: Arc::new(AtomicU8::new(ConsumerState::Stopped.as_u8())),
            metrics: Arc::new(ConsumerMetrics::new()),
            run: Mutex::new(None),
        })
    }

    /// Start delivering messages until `cancel` fires.
    ///
    /// Fails with [`QueueError::AlreadyStarted`] while a run is active.
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, cancel: CancellationToken) -> QueueResult<()> {
        let runtime = Handle::try_current()
            .map_err(|_| QueueError::internal("consumer must be started inside a Tokio runtime"))?;

        let mut run = self.run.lock();
        self.state
            .compare_exchange(
                ConsumerState::Stopped.as_u8(),
                ConsumerState::Started.as_u8(),
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| QueueError::AlreadyStarted)?;

        let cancel = cancel.child_token();
        let delivery = Delivery::new(
            self.id.clone(),
            self.options.handler.clone(),
            self.slots.clone(),
            cancel.clone(),
            self.metrics.clone(),
        );
        let task = Run {
            id: self.id.clone(),
            worker: self.worker.clone(),
            state: self.state.clone(),
            cancel: cancel.clone(),
            delivery,
        };

        // a run cancelled but never joined still drains; the new run settles after it
        let previous = run.take();
        let join = runtime.spawn(async move {
            let result = task.execute().await;
            if let Some(previous) = previous {
                if let Err(err) = previous.settle().await {
                    warn!("Previous run ended with: {}", err);
                }
            }
            result
        });
        *run = Some(RunHandle { cancel, join });

        info!(
            "Consumer {} started on {} with {} workers",
            self.id,
            self.worker.name(),
            self.options.max_num_worker
        );
        Ok(())
    }

    /// Wait for the current run to settle: the worker has returned and
    /// every admitted handler has finished, including handlers of earlier
    /// runs that were cancelled but never joined.
    ///
    /// Returns the worker's result. Joining a consumer that is not running
    /// is a no-op.
    pub async fn join(&self) -> QueueResult<()> {
        let handle = self.run.lock().take();
        match handle {
            Some(handle) => handle.settle().await,
            None => Ok(()),
        }
    }

    /// Cancel the current run and wait for it to drain. Idempotent.
    pub async fn stop(&self) -> QueueResult<()> {
        if let Some(handle) = self.run.lock().as_ref() {
            handle.cancel.cancel();
        }
        self.join().await
    }

    /// Run the handler inline, bypassing the worker and the admission gate
    pub async fn process(&self, message: MessageRef) -> MessageStatus {
        match &self.options.handler {
            Some(handler) => {
                self.metrics.handler_started();
                let status = process_message(handler.as_ref(), message).await;
                self.metrics.handler_finished(status);
                status
            }
            None => {
                warn!("No handler configured, message {} left pending", message.name());
                MessageStatus::Pending
            }
        }
    }

    pub fn id(&self) -> &ConsumerId {
        &self.id
    }

    /// Resolved options
    pub fn options(&self) -> &ConsumerOptions {
        &self.options
    }

    pub fn worker_name(&self) -> &str {
        self.worker.name()
    }

    pub fn state(&self) -> ConsumerState {
        ConsumerState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn is_started(&self) -> bool {
        self.state() == ConsumerState::Started
    }

    /// Handler slots not currently in use
    pub fn available_slots(&self) -> usize {
        self.slots.available_permits()
    }

    pub fn stats(&self) -> ConsumerStats {
        self.metrics.snapshot()
    }
}

/// One start-to-stop cycle of a consumer
struct Run {
    id: ConsumerId,
    worker: Arc<dyn Worker>,
    state: Arc<AtomicU8>,
    cancel: CancellationToken,
    delivery: Delivery,
}

impl Run {
    async fn execute(self) -> QueueResult<()> {
        let result = self
            .worker
            .daemon(self.cancel.clone(), self.delivery.clone())
            .await;

        self.cancel.cancel();
        self.state
            .store(ConsumerState::Stopped.as_u8(), Ordering::Release);

        match &result {
            Ok(()) => info!("Consumer {} stopping", self.id),
            Err(err) => error!(
                "Consumer {} worker {} failed: {}",
                self.id,
                self.worker.name(),
                err
            ),
        }

        let tracker = self.delivery.tracker();
        tracker.close();
        tracker.wait().await;
        debug!("Consumer {} drained", self.id);

        result
    }
}
