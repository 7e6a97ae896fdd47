//! Fire-and-forget mutation notifications.

use std::fmt;

use tokio::sync::broadcast;

use reststack_model::types::BroadcastEvent;

/// Default channel capacity for [`ChannelBroadcaster`].
pub const DEFAULT_CAPACITY: usize = 1024;

/// Receives one event per persisted write.
///
/// Implementations must not block; failures are swallowed.
pub trait Broadcaster: Send + Sync + fmt::Debug {
    /// Publish an event.
    fn broadcast(&self, event: BroadcastEvent);
}

/// Broadcaster that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopBroadcaster;

impl Broadcaster for NoopBroadcaster {
    fn broadcast(&self, _event: BroadcastEvent) {}
}

/// Broadcaster backed by a `tokio::sync::broadcast` channel.
///
/// Transports (e.g. a WebSocket endpoint) call [`ChannelBroadcaster::subscribe`]
/// and forward what they receive.
#[derive(Debug, Clone)]
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<BroadcastEvent>,
}

impl ChannelBroadcaster {
    /// Create a broadcaster with the given channel capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Subscribe to future events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<BroadcastEvent> {
        self.sender.subscribe()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl Broadcaster for ChannelBroadcaster {
    fn broadcast(&self, event: BroadcastEvent) {
        if let Err(e) = self.sender.send(event) {
            tracing::debug!(resource = %e.0.resource, "no broadcast subscribers");
        }
    }
}
