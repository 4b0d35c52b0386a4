use async_trait::async_trait;

use crate::{
    domain::{ChannelName, InboundMessage},
    Result,
};

/// Hexagonal port for the chat connection.
///
/// The IRC adapter is the only implementation today; the core only ever needs
/// to join its channel and post lines to it.
#[async_trait]
pub trait SessionPort: Send + Sync {
    async fn join(&self, channel: &ChannelName) -> Result<()>;
    async fn send(&self, channel: &ChannelName, text: &str) -> Result<()>;
    fn is_connected(&self) -> bool;
    async fn disconnect(&self, reason: &str) -> Result<()>;
}

/// Events pushed by the session adapter, one method per kind.
///
/// `on_message` calls are made one at a time, in arrival order.
#[async_trait]
pub trait SessionEvents: Send + Sync {
    async fn on_connected(&self);
    async fn on_disconnected(&self);
    async fn on_joined(&self, channel: &str);
    async fn on_parted(&self, channel: &str);
    async fn on_kicked(&self, channel: &str, by: &str, reason: &str);
    async fn on_message(&self, msg: InboundMessage);
}
