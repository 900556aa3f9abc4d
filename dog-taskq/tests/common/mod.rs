#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dog_taskq::{
    Consumer, ConsumerOptions, Fetch, MemoryQueue, MessageRef, PollingWorker, QueueResult,
};

/// Memory queue whose fetches are counted and can be slowed down
pub struct CountingQueue {
    pub queue: MemoryQueue,
    fetches: AtomicUsize,
    fetch_delay: Duration,
}

impl CountingQueue {
    pub fn new(name: &str) -> Arc<Self> {
        Self::with_fetch_delay(name, Duration::ZERO)
    }

    pub fn with_fetch_delay(name: &str, fetch_delay: Duration) -> Arc<Self> {
        Self::wrap(MemoryQueue::new(name), fetch_delay)
    }

    /// Count fetches on an already configured queue
    pub fn wrap(queue: MemoryQueue, fetch_delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            queue,
            fetches: AtomicUsize::new(0),
            fetch_delay,
        })
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    /// Polling consumer reading through this wrapper
    pub fn consumer(self: &Arc<Self>, options: ConsumerOptions) -> Consumer {
        let options = options.with_defaults();
        let worker = PollingWorker::new(self.queue.name(), self.clone(), &options);
        Consumer::new(Arc::new(worker), options).unwrap()
    }
}

#[async_trait]
impl Fetch for CountingQueue {
    async fn fetch(&self, max: usize) -> QueueResult<Vec<MessageRef>> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        if !self.fetch_delay.is_zero() {
            tokio::time::sleep(self.fetch_delay).await;
        }
        self.queue.fetch(max).await
    }
}

/// Sleep in small steps until `done` holds or `limit` elapses
pub async fn wait_until(limit: Duration, mut done: impl FnMut() -> bool) -> bool {
    let step = Duration::from_millis(5);
    let mut waited = Duration::ZERO;
    while !done() {
        if waited >= limit {
            return false;
        }
        tokio::time::sleep(step).await;
        waited += step;
    }
    true
}
