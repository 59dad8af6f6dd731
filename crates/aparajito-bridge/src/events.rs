use aparajito_models::gateway::UiEvent;
use tokio::sync::broadcast;

/// Broadcast-based fan-out of bridge notifications to connected UIs.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<UiEvent>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn publish(&self, event: UiEvent) {
        tracing::trace!(event = event.name(), "publish");
        // Ignore error if no UI is connected
        let _ = self.sender.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
