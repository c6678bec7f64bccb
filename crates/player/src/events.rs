use tokio::sync::broadcast;

use manifest::{StreamId, VariantId};

/// Events an application can subscribe to via [`addEventListener`](crate::Player::add_event_listener)
/// (spec §4.K). Mirrors the teacher's `ConfigUpdateEvent` broadcast pattern:
/// a `tokio::sync::broadcast` channel fanned out to every subscriber.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    Error { category: String, code: String, message: String },
    Buffering { is_buffering: bool },
    Loading,
    Unloading,
    TracksChanged,
    Adaptation { variant: VariantId },
    TextTrackVisibility { visible: bool },
    TimelineRegionAdded { start: f64, end: f64 },
    ExpirationUpdated { stream: StreamId, expiration: Option<f64> },
}

/// Broadcast hub for [`PlayerEvent`]s. Lagging subscribers drop the oldest
/// events rather than block the emitter, same tradeoff the teacher's
/// config-event bus makes.
pub struct EventBus {
    sender: broadcast::Sender<PlayerEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PlayerEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: PlayerEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(64)
    }
}
