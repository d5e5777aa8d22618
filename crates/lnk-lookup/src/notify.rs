//! Node messages and change-watch handlers exchanged with a coordination provider.

use async_trait::async_trait;

use crate::error::Result;

/// Persistence of a node written by [`NotifyMessage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageMode {
    /// Durable namespace structure, survives the writer's session.
    Persistent,
    /// Bound to the writer's session; removed by the provider when the
    /// session ends.
    Ephemeral,
}

/// A node write, or the node state carried by a change notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotifyMessage {
    /// Absolute node path.
    pub path: String,
    /// Node payload.
    pub data: String,
    /// Node persistence.
    pub mode: MessageMode,
}

impl NotifyMessage {
    /// Creates a persistent node message.
    pub fn persistent(path: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
            mode: MessageMode::Persistent,
        }
    }

    /// Creates an ephemeral node message.
    pub fn ephemeral(path: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            data: data.into(),
            mode: MessageMode::Ephemeral,
        }
    }
}

/// Kind of change delivered to a watch handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyEvent {
    /// The watched node was created.
    NodeCreated,
    /// The watched node was deleted.
    NodeDeleted,
    /// The watched node's payload changed.
    NodeDataChanged,
    /// A child of the watched node was created or deleted.
    NodeChildrenChanged,
}

/// Callback invoked by a provider when a watched node changes.
///
/// Providers call handlers from their own tasks, concurrently with any other
/// registry operation and with no ordering between deliveries.
#[async_trait]
pub trait NotifyHandler: Send + Sync + std::fmt::Debug {
    /// Whether the handler wants [`NotifyEvent::NodeChildrenChanged`] deliveries
    /// in addition to node-level events.
    fn receive_child_notify(&self) -> bool {
        false
    }

    /// Whether this handler, used as a removal key, matches every handler
    /// registered at a path.
    fn matches_any(&self) -> bool {
        false
    }

    /// Handles one change notification.
    async fn handle_notify(&self, event: NotifyEvent, message: &NotifyMessage) -> Result<()>;
}

/// Handler that ignores every notification.
///
/// Passed to `unregister` to remove all handlers at a path.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifyHandler;

#[async_trait]
impl NotifyHandler for NullNotifyHandler {
    fn matches_any(&self) -> bool {
        true
    }

    async fn handle_notify(&self, _event: NotifyEvent, _message: &NotifyMessage) -> Result<()> {
        Ok(())
    }
}
