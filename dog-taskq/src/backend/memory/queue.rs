use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::backend::memory::MemoryMessage;
use crate::backend::{Fetch, PollingWorker, Queue, Worker};
use crate::consumer::{process_message, Consumer, ConsumerOptions, Delivery, Handler};
use crate::message::MessageRef;
use crate::types::Payload;
use crate::{QueueError, QueueResult};

/// Capacity of the buffer when none is configured
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Configuration of a [`MemoryQueue`]
#[derive(Clone, Default)]
pub struct MemoryQueueOptions {
    /// Buffer capacity; publishing waits while it is full. 0 = default
    pub buffer_size: usize,
    /// When set, `publish` runs this handler inline instead of buffering
    pub sync_handler: Option<Arc<dyn Handler>>,
}

impl MemoryQueueOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_sync_handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.sync_handler = Some(Arc::new(handler));
        self
    }

    pub fn with_shared_sync_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.sync_handler = Some(handler);
        self
    }
}

impl fmt::Debug for MemoryQueueOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryQueueOptions")
            .field("buffer_size", &self.buffer_size)
            .field("sync_handler", &self.sync_handler.is_some())
            .finish()
    }
}

/// In-memory queue handle; clones share the same buffer
#[derive(Clone)]
pub struct MemoryQueue {
    inner: Arc<Inner>,
}

struct Inner {
    name: String,
    capacity: usize,
    buffer: Mutex<Buffer>,
    /// One permit per free buffer position
    space: Semaphore,
    /// Signalled whenever a payload lands in the buffer
    ready: Notify,
    sync_handler: Option<Arc<dyn Handler>>,
}

#[derive(Default)]
struct Buffer {
    items: VecDeque<Payload>,
    /// Requeued payloads stored beyond capacity, holding no permit
    overflow: usize,
}

impl MemoryQueue {
    /// Create a buffered queue with default options
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_options(name, MemoryQueueOptions::default())
    }

    pub fn with_options(name: impl Into<String>, options: MemoryQueueOptions) -> Self {
        let capacity = if options.buffer_size == 0 {
            DEFAULT_BUFFER_SIZE
        } else {
            options.buffer_size
        };

        Self {
            inner: Arc::new(Inner {
                name: name.into(),
                capacity,
                buffer: Mutex::new(Buffer::default()),
                space: Semaphore::new(capacity),
                ready: Notify::new(),
                sync_handler: options.sync_handler,
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Buffer positions available to publishers
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Whether publishing runs the handler inline
    pub fn is_sync(&self) -> bool {
        self.inner.sync_handler.is_some()
    }

    /// Messages currently buffered
    pub fn len(&self) -> usize {
        self.inner.buffer.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every buffered message, returning how many were removed
    pub fn purge(&self) -> usize {
        let purged = self.take(usize::MAX).len();
        debug!("Purged {} messages from {}", purged, self.inner.name);
        purged
    }

    /// Consumer whose worker receives messages as soon as they are buffered
    /// instead of polling for them
    pub fn push_consumer(&self, options: ConsumerOptions) -> QueueResult<Consumer> {
        Consumer::new(Arc::new(self.clone()), options)
    }

    /// Put a payload back at the tail of the buffer, bypassing sync mode.
    ///
    /// Never waits for space: a full buffer temporarily grows past its
    /// capacity, so releasing claimed messages cannot stall on producers.
    pub(crate) fn requeue(&self, payload: Payload) {
        {
            let mut buffer = self.inner.buffer.lock();
            match self.inner.space.try_acquire() {
                Ok(permit) => permit.forget(),
                Err(_) => {
                    buffer.overflow += 1;
                    debug!("Queue {} full, requeued payload stored over capacity", self.inner.name);
                }
            }
            buffer.items.push_back(payload);
        }
        self.inner.ready.notify_one();
    }

    async fn push(&self, payload: Payload) -> QueueResult<()> {
        self.inner
            .space
            .acquire()
            .await
            .map_err(|_| QueueError::QueueClosed(self.inner.name.clone()))?
            .forget();
        self.inner.buffer.lock().items.push_back(payload);
        self.inner.ready.notify_one();
        Ok(())
    }

    /// Remove up to `max` payloads from the head of the buffer
    fn take(&self, max: usize) -> Vec<Payload> {
        let (taken, freed) = {
            let mut buffer = self.inner.buffer.lock();
            let count = max.min(buffer.items.len());
            let taken: Vec<Payload> = buffer.items.drain(..count).collect();
            let over = buffer.overflow.min(count);
            buffer.overflow -= over;
            (taken, count - over)
        };
        self.inner.space.add_permits(freed);
        taken
    }

    fn wrap(&self, payload: Payload) -> MessageRef {
        Arc::new(MemoryMessage::new(self.clone(), payload))
    }

    /// Wait for the next payload; `None` once `cancel` fires
    async fn next_payload(&self, cancel: &CancellationToken) -> Option<Payload> {
        loop {
            let notified = self.inner.ready.notified();
            if let Some(payload) = self.take(1).pop() {
                return Some(payload);
            }
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return None,
                _ = notified => {}
            }
        }
    }
}

impl fmt::Debug for MemoryQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryQueue")
            .field("name", &self.inner.name)
            .field("len", &self.len())
            .field("capacity", &self.inner.capacity)
            .field("sync", &self.is_sync())
            .finish()
    }
}

#[async_trait]
impl Queue for MemoryQueue {
    fn name(&self) -> &str {
        &self.inner.name
    }

    async fn size(&self) -> usize {
        self.len()
    }

    async fn publish(&self, payloads: Vec<Payload>) -> QueueResult<()> {
        if let Some(handler) = &self.inner.sync_handler {
            for payload in payloads {
                process_message(handler.as_ref(), self.wrap(payload)).await;
            }
            return Ok(());
        }

        for payload in payloads {
            self.push(payload).await?;
        }
        Ok(())
    }

    async fn later(&self, delay: Duration, payloads: Vec<Payload>) -> QueueResult<()> {
        let queue = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Err(err) = queue.publish(payloads).await {
                error!("Delayed publish to {} failed: {}", queue.inner.name, err);
            }
        });
        Ok(())
    }

    fn consumer(&self, options: ConsumerOptions) -> QueueResult<Consumer> {
        let options = options.with_defaults();
        let worker = PollingWorker::new(self.inner.name.clone(), Arc::new(self.clone()), &options);
        Consumer::new(Arc::new(worker), options)
    }
}

#[async_trait]
impl Fetch for MemoryQueue {
    async fn fetch(&self, max: usize) -> QueueResult<Vec<MessageRef>> {
        Ok(self
            .take(max)
            .into_iter()
            .map(|payload| self.wrap(payload))
            .collect())
    }
}

#[async_trait]
impl Worker for MemoryQueue {
    fn name(&self) -> &str {
        &self.inner.name
    }

    async fn daemon(&self, cancel: CancellationToken, delivery: Delivery) -> QueueResult<()> {
        while let Some(slot) = delivery.reserve().await {
            match self.next_payload(&cancel).await {
                Some(payload) => delivery.admit(slot, self.wrap(payload)),
                None => break,
            }
        }

        // pass a wakeup this worker consumed on to another push consumer
        if !self.is_empty() {
            self.inner.ready.notify_one();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consumer::handler_fn;
    use crate::message::Message;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_publish_and_size() {
        let queue = MemoryQueue::new("default");
        assert_eq!(Queue::name(&queue), "default");
        assert_eq!(queue.size().await, 0);

        queue.publish(Payload::batch(0..10).unwrap()).await.unwrap();
        assert_eq!(queue.size().await, 10);
    }

    #[tokio::test]
    async fn test_fetch_returns_what_is_available() {
        let queue = MemoryQueue::new("default");
        queue.publish(Payload::batch(0..3).unwrap()).await.unwrap();

        let messages = queue.fetch(10).await.unwrap();
        let values: Vec<i32> = messages.iter().map(|m| m.unmarshal().unwrap()).collect();
        assert_eq!(values, vec![0, 1, 2]);

        assert!(queue.fetch(10).await.unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_later_publishes_after_delay() {
        let queue = MemoryQueue::new("delayed");

        queue
            .later(Duration::from_millis(500), Payload::batch(0..2).unwrap())
            .await
            .unwrap();
        assert_eq!(queue.size().await, 0);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert_eq!(queue.size().await, 0);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(queue.size().await, 2);
    }

    #[tokio::test]
    async fn test_sync_mode_runs_handler_on_publish() {
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = seen.clone();
        let queue = MemoryQueue::with_options(
            "inline",
            MemoryQueueOptions::new().with_sync_handler(handler_fn(move |message: MessageRef| {
                let counter = counter.clone();
                async move {
                    let value: usize = message.unmarshal().unwrap();
                    counter.fetch_add(value, Ordering::SeqCst);
                    message.ack().await.unwrap();
                }
            })),
        );

        queue.publish(Payload::batch([1, 3]).unwrap()).await.unwrap();

        assert!(queue.is_sync());
        assert_eq!(seen.load(Ordering::SeqCst), 4);
        assert_eq!(queue.size().await, 0);
    }

    #[tokio::test]
    async fn test_sync_mode_reject_goes_to_buffer() {
        let queue = MemoryQueue::with_options(
            "inline",
            MemoryQueueOptions::new().with_sync_handler(handler_fn(|message: MessageRef| async move {
                message.reject().await.unwrap();
            })),
        );

        queue.publish(Payload::batch([1]).unwrap()).await.unwrap();
        assert_eq!(queue.size().await, 1);
    }

    #[tokio::test]
    async fn test_purge() {
        let queue = MemoryQueue::new("purge");
        queue.publish(Payload::batch(0..4).unwrap()).await.unwrap();

        assert_eq!(queue.purge(), 4);
        assert!(queue.is_empty());
        assert_eq!(queue.purge(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_requeue_into_full_buffer() {
        let queue = MemoryQueue::with_options("tiny", MemoryQueueOptions::new().with_buffer_size(2));
        queue.publish(Payload::batch([1, 2]).unwrap()).await.unwrap();
        let claimed = queue.fetch(1).await.unwrap().pop().unwrap();
        queue.publish(Payload::batch([3]).unwrap()).await.unwrap();

        // Act: the buffer is full again, the reject must not wait
        tokio::time::timeout(Duration::from_millis(50), claimed.reject())
            .await
            .expect("reject waited for space")
            .unwrap();
        assert_eq!(queue.size().await, 3);

        // Assert: taking the extra payload frees no publisher space
        queue.fetch(1).await.unwrap();
        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            queue.publish(Payload::batch([4]).unwrap()),
        )
        .await;
        assert!(blocked.is_err());

        queue.fetch(1).await.unwrap();
        queue.publish(Payload::batch([4]).unwrap()).await.unwrap();
        let rest: Vec<i32> = queue
            .fetch(10)
            .await
            .unwrap()
            .iter()
            .map(|m| m.unmarshal().unwrap())
            .collect();
        assert_eq!(rest, vec![1, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_and_purge_beside_idle_push_consumer() {
        let queue = MemoryQueue::new("shared");
        let consumer = queue.push_consumer(ConsumerOptions::new()).unwrap();
        consumer.start(CancellationToken::new()).unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        let fetched = tokio::time::timeout(Duration::from_millis(100), queue.fetch(1)).await;
        assert!(fetched.expect("fetch blocked by the push worker").unwrap().is_empty());
        assert_eq!(queue.purge(), 0);

        tokio::time::timeout(Duration::from_secs(1), consumer.stop())
            .await
            .expect("push consumer did not stop")
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_publish_waits_for_space() {
        let queue = MemoryQueue::with_options("tiny", MemoryQueueOptions::new().with_buffer_size(1));
        queue.publish(Payload::batch([1]).unwrap()).await.unwrap();

        let blocked = tokio::time::timeout(
            Duration::from_millis(50),
            queue.publish(Payload::batch([2]).unwrap()),
        )
        .await;
        assert!(blocked.is_err());

        queue.fetch(1).await.unwrap();
        queue.publish(Payload::batch([2]).unwrap()).await.unwrap();
        assert_eq!(queue.size().await, 1);
    }
}
