use std::collections::HashMap;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::debug;

use crate::backend::Queue;
use crate::{QueueError, QueueResult};

/// Name a directory resolves when no default was set
pub const DEFAULT_QUEUE: &str = "default";

/// Factory producing a queue on first use
pub type Connector = Arc<dyn Fn() -> QueueResult<Arc<dyn Queue>> + Send + Sync>;

/// Named queues that already exist
pub struct QueueDirectory {
    queues: RwLock<HashMap<String, Arc<dyn Queue>>>,
    default_name: RwLock<String>,
}

impl QueueDirectory {
    pub fn new() -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            default_name: RwLock::new(DEFAULT_QUEUE.to_string()),
        }
    }

    /// Register a queue under its own name, replacing any previous one
    pub fn add(&self, queue: Arc<dyn Queue>) {
        let name = queue.name().to_string();
        debug!("Added queue {}", name);
        self.queues.write().insert(name, queue);
    }

    pub fn get(&self, name: &str) -> QueueResult<Arc<dyn Queue>> {
        self.queues
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| QueueError::QueueNotFound(name.to_string()))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.queues.read().contains_key(name)
    }

    /// The queue registered under the default name
    pub fn default_queue(&self) -> QueueResult<Arc<dyn Queue>> {
        let name = self.default_name();
        self.get(&name)
    }

    pub fn set_default(&self, name: impl Into<String>) {
        *self.default_name.write() = name.into();
    }

    pub fn default_name(&self) -> String {
        self.default_name.read().clone()
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.queues.read().keys().cloned().collect();
        names.sort();
        names
    }
}

impl Default for QueueDirectory {
    fn default() -> Self {
        Self::new()
    }
}

struct LazyQueue {
    connector: Connector,
    queue: OnceCell<Arc<dyn Queue>>,
}

/// Named queues built lazily by their connector.
///
/// A connector runs at most once successfully; a failed connection is
/// retried on the next lookup.
pub struct ConnectorDirectory {
    connectors: RwLock<HashMap<String, Arc<LazyQueue>>>,
    default_name: RwLock<String>,
}

impl ConnectorDirectory {
    pub fn new() -> Self {
        Self {
            connectors: RwLock::new(HashMap::new()),
            default_name: RwLock::new(DEFAULT_QUEUE.to_string()),
        }
    }

    /// Register a connector, replacing any previous one under `name`
    pub fn add<F>(&self, name: impl Into<String>, connector: F)
    where
        F: Fn() -> QueueResult<Arc<dyn Queue>> + Send + Sync + 'static,
    {
        let name = name.into();
        debug!("Added connector {}", name);
        self.connectors.write().insert(
            name,
            Arc::new(LazyQueue {
                connector: Arc::new(connector),
                queue: OnceCell::new(),
            }),
        );
    }

    /// Connect on first use, then return the cached queue
    pub fn get(&self, name: &str) -> QueueResult<Arc<dyn Queue>> {
        let entry = self
            .connectors
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| QueueError::QueueNotFound(name.to_string()))?;

        entry
            .queue
            .get_or_try_init(|| {
                debug!("Connecting queue {}", name);
                (entry.connector)()
            })
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.connectors.read().contains_key(name)
    }

    /// Whether the connector under `name` has produced its queue yet
    pub fn is_connected(&self, name: &str) -> bool {
        self.connectors
            .read()
            .get(name)
            .map_or(false, |entry| entry.queue.get().is_some())
    }

    pub fn default_queue(&self) -> QueueResult<Arc<dyn Queue>> {
        let name = self.default_name();
        self.get(&name)
    }

    pub fn set_default(&self, name: impl Into<String>) {
        *self.default_name.write() = name.into();
    }

    pub fn default_name(&self) -> String {
        self.default_name.read().clone()
    }
}

impl Default for ConnectorDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, feature = "memory"))]
mod tests {
    use super::*;
    use crate::backend::memory::MemoryQueue;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_queue_directory() {
        let directory = QueueDirectory::new();
        directory.add(Arc::new(MemoryQueue::new("default")));
        directory.add(Arc::new(MemoryQueue::new("mail")));

        assert_eq!(directory.get("mail").unwrap().name(), "mail");
        assert_eq!(directory.default_queue().unwrap().name(), "default");
        assert_eq!(directory.names(), vec!["default", "mail"]);

        directory.set_default("mail");
        assert_eq!(directory.default_queue().unwrap().name(), "mail");

        assert!(matches!(
            directory.get("sms"),
            Err(QueueError::QueueNotFound(name)) if name == "sms"
        ));
    }

    #[test]
    fn test_connector_runs_once() {
        let connects = Arc::new(AtomicUsize::new(0));
        let directory = ConnectorDirectory::new();
        let counter = connects.clone();
        directory.add("reports", move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(Arc::new(MemoryQueue::new("reports")) as Arc<dyn Queue>)
        });

        assert!(!directory.is_connected("reports"));
        assert_eq!(connects.load(Ordering::SeqCst), 0);

        let first = directory.get("reports").unwrap();
        let second = directory.get("reports").unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(connects.load(Ordering::SeqCst), 1);
        assert!(directory.is_connected("reports"));
    }

    #[test]
    fn test_failed_connect_is_retried() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let directory = ConnectorDirectory::new();
        let counter = attempts.clone();
        directory.add("flaky", move || {
            if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                Err(QueueError::transport("connection refused"))
            } else {
                Ok(Arc::new(MemoryQueue::new("flaky")) as Arc<dyn Queue>)
            }
        });

        assert!(matches!(directory.get("flaky"), Err(QueueError::Transport(_))));
        assert!(directory.get("flaky").is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_unknown_connector() {
        let directory = ConnectorDirectory::new();
        assert!(matches!(
            directory.default_queue(),
            Err(QueueError::QueueNotFound(name)) if name == DEFAULT_QUEUE
        ));
    }
}
