use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::codec::Codec;
use crate::task::{task_name, Task};
use crate::{QueueResult, TaskError};

/// Decoded task ready to run
#[async_trait]
pub(crate) trait RunnableTask: Send + Sync {
    async fn run(&self) -> Result<(), TaskError>;
}

#[async_trait]
impl<T: Task> RunnableTask for T {
    async fn run(&self) -> Result<(), TaskError> {
        self.handle().await
    }
}

/// Builds a fresh task instance from its serialized state
trait TaskFactory: Send + Sync {
    fn task_type(&self) -> &'static str;

    fn build(&self, data: &[u8]) -> QueueResult<Box<dyn RunnableTask>>;
}

struct ConcreteTaskFactory<T> {
    _phantom: PhantomData<fn() -> T>,
}

impl<T: Task> ConcreteTaskFactory<T> {
    fn new() -> Self {
        Self {
            _phantom: PhantomData,
        }
    }
}

impl<T: Task> TaskFactory for ConcreteTaskFactory<T> {
    fn task_type(&self) -> &'static str {
        task_name::<T>()
    }

    fn build(&self, data: &[u8]) -> QueueResult<Box<dyn RunnableTask>> {
        let task: T = Codec::MsgPack.decode(data)?;
        Ok(Box::new(task))
    }
}

/// Name -> task type table.
///
/// The first registration of a name wins; registering it again is a no-op.
#[derive(Default)]
pub struct TaskRegistry {
    factories: RwLock<HashMap<String, Arc<dyn TaskFactory>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under its type name and return that name
    pub fn register<T: Task>(&self) -> String {
        self.register_name::<T>(task_name::<T>())
    }

    /// Register `T` under an explicit name and return it
    ///
    /// # Panics
    ///
    /// Panics if `name` is empty.
    pub fn register_name<T: Task>(&self, name: impl Into<String>) -> String {
        let name = name.into();
        assert!(!name.is_empty(), "task name must not be empty");

        let mut factories = self.factories.write();
        match factories.get(&name) {
            Some(existing) => {
                debug!(
                    "Task {} already registered for {}, keeping it",
                    name,
                    existing.task_type()
                );
            }
            None => {
                factories.insert(name.clone(), Arc::new(ConcreteTaskFactory::<T>::new()));
                debug!("Registered task {} ({})", name, task_name::<T>());
            }
        }
        name
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// Type registered under `name`
    pub fn task_type(&self, name: &str) -> Option<&'static str> {
        self.factories.read().get(name).map(|f| f.task_type())
    }

    pub fn registered_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.factories.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.read().is_empty()
    }

    /// Decode `data` into the task registered under `name`.
    ///
    /// `Ok(None)` when the name is unknown.
    pub(crate) fn build(&self, name: &str, data: &[u8]) -> QueueResult<Option<Box<dyn RunnableTask>>> {
        let factory = self.factories.read().get(name).cloned();
        factory.map(|factory| factory.build(data)).transpose()
    }
}
