//! Message bus errors.

use thiserror::Error;

use crate::message::Reply;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Target context does not exist, has no listener, or was torn down
    /// while a reply was pending.
    #[error("Could not establish connection. Receiving end does not exist: {0}")]
    TransportUnreachable(String),

    /// Every handler declined the message, or the reply channel closed
    /// before anyone answered.
    #[error("The message port closed before a response was received ({0})")]
    NoResponse(String),

    #[error("No reply to {action} within {timeout_ms}ms")]
    Timeout { action: String, timeout_ms: u64 },

    #[error("A reply was already sent for this message")]
    AlreadyReplied,
}

impl From<&BusError> for Reply {
    fn from(err: &BusError) -> Self {
        Reply::error(err.to_string())
    }
}

impl From<BusError> for Reply {
    fn from(err: BusError) -> Self {
        Reply::from(&err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_display() {
        let err = BusError::TransportUnreachable("tab-4".to_string());
        assert!(err.to_string().contains("Receiving end does not exist"));
        assert!(err.to_string().contains("tab-4"));
    }

    #[test]
    fn test_timeout_display() {
        let err = BusError::Timeout {
            action: "getPageContent".to_string(),
            timeout_ms: 5000,
        };
        assert!(err.to_string().contains("getPageContent"));
        assert!(err.to_string().contains("5000"));
    }

    #[test]
    fn test_into_reply() {
        let reply = Reply::from(BusError::NoResponse("clickStartBuilding".to_string()));
        assert!(reply.is_error());
        match reply {
            Reply::Error { error } => assert!(error.contains("clickStartBuilding")),
            _ => panic!("Expected error reply"),
        }
    }
}
