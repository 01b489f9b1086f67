use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, unbounded};
use parking_lot::Mutex;

use crate::error::PlayerError;

/// Event emitted by the engine to its subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    /// Audio of the current station is flowing
    Started,
    /// The current playback attempt failed for good
    Error(PlayerError),
}

#[derive(Clone, Default)]
pub(crate) struct PlayerEventBus {
    subscribers: Arc<Mutex<Vec<Sender<PlayerEvent>>>>,
}

impl PlayerEventBus {
    pub(crate) fn new() -> Self {
        Self {
            subscribers: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub(crate) fn subscribe(&self) -> Receiver<PlayerEvent> {
        let (tx, rx) = unbounded::<PlayerEvent>();
        self.subscribers.lock().push(tx);
        rx
    }

    pub(crate) fn broadcast(&self, event: PlayerEvent) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Drop every sender, disconnecting the receivers
    pub(crate) fn close(&self) {
        self.subscribers.lock().clear();
    }

    #[allow(dead_code)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.lock().len()
    }
}
