use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::consumer::Handler;
use crate::types::ConsumerId;

/// Messages a polling worker claims per fetch
pub const DEFAULT_PREFETCH_COUNT: usize = 10;

/// Delay between two polls
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Upper bound on a single fetch
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Consumer configuration.
///
/// Zero values mean "use the default"; [`ConsumerOptions::with_defaults`]
/// resolves them.
#[derive(Clone, Default)]
pub struct ConsumerOptions {
    /// Identifier used in logs, random when unset
    pub id: Option<String>,
    /// Maximum concurrent handler invocations, host parallelism when 0
    pub max_num_worker: usize,
    /// Messages claimed per fetch
    pub prefetch_count: usize,
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
    pub handler: Option<Arc<dyn Handler>>,
}

impl ConsumerOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_max_num_worker(mut self, max_num_worker: usize) -> Self {
        self.max_num_worker = max_num_worker;
        self
    }

    pub fn with_prefetch_count(mut self, prefetch_count: usize) -> Self {
        self.prefetch_count = prefetch_count;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_fetch_timeout(mut self, fetch_timeout: Duration) -> Self {
        self.fetch_timeout = fetch_timeout;
        self
    }

    pub fn with_handler<H: Handler + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Use a handler that is shared with other consumers
    pub fn with_shared_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Replace every unset field by its default
    pub fn with_defaults(mut self) -> Self {
        if self.id.as_deref().map_or(true, str::is_empty) {
            self.id = Some(ConsumerId::random().0);
        }
        if self.max_num_worker == 0 {
            self.max_num_worker = num_cpus::get().max(1);
        }
        if self.prefetch_count == 0 {
            self.prefetch_count = DEFAULT_PREFETCH_COUNT;
        }
        if self.poll_interval.is_zero() {
            self.poll_interval = DEFAULT_POLL_INTERVAL;
        }
        if self.fetch_timeout.is_zero() {
            self.fetch_timeout = DEFAULT_FETCH_TIMEOUT;
        }
        self
    }
}

impl fmt::Debug for ConsumerOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsumerOptions")
            .field("id", &self.id)
            .field("max_num_worker", &self.max_num_worker)
            .field("prefetch_count", &self.prefetch_count)
            .field("poll_interval", &self.poll_interval)
            .field("fetch_timeout", &self.fetch_timeout)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}
