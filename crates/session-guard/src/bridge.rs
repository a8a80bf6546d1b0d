//! Host bridge: notifies an embedding native shell about session events.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;

/// Message posted to the host when the session ends.
///
/// Serializes as `{"type":"sessionExpired"}` or `{"type":"logout"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum HostMessage {
    SessionExpired,
    Logout,
}

#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Host bridge disconnected")]
    Disconnected,

    #[error("Host bridge rejected message: {0}")]
    Rejected(String),
}

/// Channel to the embedding host, when one exists.
pub trait HostBridge: Send + Sync {
    fn post_message(&self, message: &HostMessage) -> Result<(), BridgeError>;
}

/// Host bridge that forwards messages into a tokio channel.
#[derive(Clone)]
pub struct ChannelHostBridge {
    sender: mpsc::UnboundedSender<HostMessage>,
}

impl ChannelHostBridge {
    pub fn new(sender: mpsc::UnboundedSender<HostMessage>) -> Self {
        Self { sender }
    }

    /// Bridge plus the receiving end the host reads from.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<HostMessage>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl HostBridge for ChannelHostBridge {
    fn post_message(&self, message: &HostMessage) -> Result<(), BridgeError> {
        self.sender
            .send(*message)
            .map_err(|_| BridgeError::Disconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_wire_format() {
        assert_eq!(
            serde_json::to_string(&HostMessage::SessionExpired).unwrap(),
            r#"{"type":"sessionExpired"}"#
        );
        assert_eq!(
            serde_json::to_string(&HostMessage::Logout).unwrap(),
            r#"{"type":"logout"}"#
        );
    }

    #[test]
    fn test_message_parses_from_wire() {
        let message: HostMessage = serde_json::from_str(r#"{"type":"logout"}"#).unwrap();
        assert_eq!(message, HostMessage::Logout);
    }

    #[test]
    fn test_channel_bridge_delivers() {
        let (bridge, mut receiver) = ChannelHostBridge::channel();
        bridge.post_message(&HostMessage::SessionExpired).unwrap();
        assert_eq!(receiver.try_recv().unwrap(), HostMessage::SessionExpired);
    }

    #[test]
    fn test_channel_bridge_disconnected() {
        let (bridge, receiver) = ChannelHostBridge::channel();
        drop(receiver);
        assert!(matches!(
            bridge.post_message(&HostMessage::Logout),
            Err(BridgeError::Disconnected)
        ));
    }
}
