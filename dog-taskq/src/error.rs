use thiserror::Error;

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;

/// Errors raised by queues, consumers, messages and the bus
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Consumer is already started")]
    AlreadyStarted,

    #[error("Message has already been acked")]
    AlreadyAcked,

    #[error("Message has already been rejected")]
    AlreadyRejected,

    #[error("Queue not found: {0}")]
    QueueNotFound(String),

    #[error("No message to dispatch")]
    NoPayloads,

    #[error("Invalid task name: {0:?}")]
    InvalidTaskName(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Queue is closed: {0}")]
    QueueClosed(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Failed to unmarshal payload: {0}")]
    Unmarshal(String),

    #[error("Worker shutdown")]
    WorkerShutdown,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueueError {
    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Create an internal error
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Conflicts with the current state of a consumer or message.
    ///
    /// These are recoverable: the caller asked for a transition that
    /// already happened (or can no longer happen), or named a queue that
    /// is not registered, and nothing was changed.
    pub fn is_state_conflict(&self) -> bool {
        matches!(
            self,
            Self::AlreadyStarted
                | Self::AlreadyAcked
                | Self::AlreadyRejected
                | Self::QueueNotFound(_)
        )
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() || err.is_syntax() || err.is_eof() {
            QueueError::Unmarshal(err.to_string())
        } else {
            QueueError::SerializationError(err.to_string())
        }
    }
}

impl From<rmp_serde::encode::Error> for QueueError {
    fn from(err: rmp_serde::encode::Error) -> Self {
        QueueError::SerializationError(err.to_string())
    }
}

impl From<rmp_serde::decode::Error> for QueueError {
    fn from(err: rmp_serde::decode::Error) -> Self {
        QueueError::Unmarshal(err.to_string())
    }
}

/// Failure reported by a task's `handle`
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TaskError {
    /// The task ran and failed
    #[error("Task failed: {0}")]
    Failed(String),

    /// The task could not reach a dependency it needs
    #[error("Task dependency unavailable: {0}")]
    Unavailable(String),
}

impl TaskError {
    /// Create a failure error
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }

    /// Create an unavailable-dependency error
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Get the error message
    pub fn message(&self) -> &str {
        match self {
            Self::Failed(msg) | Self::Unavailable(msg) => msg,
        }
    }
}

impl From<QueueError> for TaskError {
    fn from(err: QueueError) -> Self {
        TaskError::Unavailable(err.to_string())
    }
}
