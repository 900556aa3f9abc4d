use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::backend::{Fetch, Worker};
use crate::consumer::{release_unadmitted, ConsumerOptions, Delivery};
use crate::message::MessageRef;
use crate::QueueResult;

/// Result of one bounded fetch
#[derive(Clone)]
pub enum FetchOutcome {
    Messages(Vec<MessageRef>),
    /// The backend answered with nothing ready
    Empty,
    /// The backend did not answer within the fetch timeout
    TimedOut,
}

impl FetchOutcome {
    pub fn len(&self) -> usize {
        match self {
            FetchOutcome::Messages(messages) => messages.len(),
            FetchOutcome::Empty | FetchOutcome::TimedOut => 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, FetchOutcome::TimedOut)
    }

    pub fn into_messages(self) -> Vec<MessageRef> {
        match self {
            FetchOutcome::Messages(messages) => messages,
            FetchOutcome::Empty | FetchOutcome::TimedOut => Vec::new(),
        }
    }
}

impl std::fmt::Debug for FetchOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchOutcome::Messages(messages) => write!(f, "Messages({})", messages.len()),
            FetchOutcome::Empty => write!(f, "Empty"),
            FetchOutcome::TimedOut => write!(f, "TimedOut"),
        }
    }
}

/// Worker that polls a [`Fetch`] backend on a fixed cadence.
///
/// Each tick waits for a free handler slot, then claims at most
/// `prefetch_count` messages within `fetch_timeout`. A missed tick is
/// delayed rather than replayed, so a slow fetch or a saturated consumer
/// never causes a burst of polls.
pub struct PollingWorker<F: ?Sized> {
    name: String,
    fetcher: Arc<F>,
    poll_interval: Duration,
    fetch_timeout: Duration,
    prefetch_count: usize,
}

impl<F: Fetch + ?Sized + 'static> PollingWorker<F> {
    /// Create a worker using the poll settings of `options`.
    ///
    /// Unset options take their defaults.
    pub fn new(name: impl Into<String>, fetcher: Arc<F>, options: &ConsumerOptions) -> Self {
        let options = options.clone().with_defaults();
        Self {
            name: name.into(),
            fetcher,
            poll_interval: options.poll_interval,
            fetch_timeout: options.fetch_timeout,
            prefetch_count: options.prefetch_count,
        }
    }

    /// One fetch bounded by the fetch timeout
    pub async fn poll(&self) -> QueueResult<FetchOutcome> {
        match time::timeout(self.fetch_timeout, self.fetcher.fetch(self.prefetch_count)).await {
            Err(_) => {
                debug!("Fetch on {} timed out after {:?}", self.name, self.fetch_timeout);
                Ok(FetchOutcome::TimedOut)
            }
            Ok(Ok(messages)) if messages.is_empty() => Ok(FetchOutcome::Empty),
            Ok(Ok(messages)) => Ok(FetchOutcome::Messages(messages)),
            Ok(Err(err)) => Err(err),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn prefetch_count(&self) -> usize {
        self.prefetch_count
    }
}

#[async_trait]
impl<F: Fetch + ?Sized + 'static> Worker for PollingWorker<F> {
    fn name(&self) -> &str {
        &self.name
    }

    async fn daemon(&self, cancel: CancellationToken, delivery: Delivery) -> QueueResult<()> {
        let mut ticker = time::interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("Polling {} every {:?}", self.name, self.poll_interval);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }

            // never fetch while every handler slot is busy
            let Some(slot) = delivery.reserve().await else {
                return Ok(());
            };

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                outcome = self.poll() => outcome?,
            };
            delivery.metrics().record_fetch();

            let mut slot = Some(slot);
            let mut messages = outcome.into_messages().into_iter();
            while let Some(message) = messages.next() {
                let admission = match slot.take() {
                    Some(reserved) => {
                        delivery.admit(reserved, message);
                        continue;
                    }
                    None => delivery.send(message).await,
                };

                if admission.is_cancelled() {
                    for message in messages {
                        release_unadmitted(message).await;
                    }
                    return Ok(());
                }
            }
        }
    }
}
