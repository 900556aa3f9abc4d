use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a delivered message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageStatus {
    /// Delivered, not yet resolved by the handler
    Pending,
    /// Consumed for good
    Acked,
    /// Handed back to the backend for redelivery
    Rejected,
}

impl MessageStatus {
    /// Acked and Rejected are final for this delivery
    pub fn is_terminal(self) -> bool {
        !matches!(self, MessageStatus::Pending)
    }

    pub(crate) fn as_u8(self) -> u8 {
        match self {
            MessageStatus::Pending => 0,
            MessageStatus::Acked => 1,
            MessageStatus::Rejected => 2,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => MessageStatus::Acked,
            2 => MessageStatus::Rejected,
            _ => MessageStatus::Pending,
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageStatus::Pending => "pending",
            MessageStatus::Acked => "acked",
            MessageStatus::Rejected => "rejected",
        };
        write!(f, "{}", s)
    }
}

/// Run state of a consumer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConsumerState {
    Stopped,
    Started,
}

impl ConsumerState {
    pub(crate) fn as_u8(self) -> u8 {
        match self {
            ConsumerState::Stopped => 0,
            ConsumerState::Started => 1,
        }
    }

    pub(crate) fn from_u8(value: u8) -> Self {
        if value == 1 {
            ConsumerState::Started
        } else {
            ConsumerState::Stopped
        }
    }
}

impl fmt::Display for ConsumerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConsumerState::Stopped => write!(f, "stopped"),
            ConsumerState::Started => write!(f, "started"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_byte_mapping() {
        for status in [
            MessageStatus::Pending,
            MessageStatus::Acked,
            MessageStatus::Rejected,
        ] {
            assert_eq!(MessageStatus::from_u8(status.as_u8()), status);
        }
        assert!(!MessageStatus::Pending.is_terminal());
        assert!(MessageStatus::Rejected.is_terminal());
    }
}
