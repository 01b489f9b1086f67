//! Audio backend contracts
//!
//! The engine drives two decoders it knows nothing about:
//!
//! - a **primary** backend favoring quality and performance, which reports
//!   `started`, `load-error` and `play-error`;
//! - a **fallback** backend favoring compatibility, which reports `started`
//!   and `error`.
//!
//! A backend opens one handle per stream URL. Handles report back through the
//! callback object given at open time; callbacks may be invoked from any
//! thread, including synchronously from inside a handle method. Callbacks of
//! a released handle are ignored, so backends need not guard against
//! reporting late.
//!
//! Handle methods are called with the engine lock held: they must not call
//! back into [`PlaybackEngine`](crate::PlaybackEngine) methods.

use crate::error::{PlayerError, Result};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Notification from a primary handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryEvent {
    /// Audio is actually flowing
    Started,
    /// Transport or container failed before playback began
    LoadError(String),
    /// Playback start was rejected after construction
    PlayError(String),
}

/// Notification from a fallback handle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackEvent {
    Started,
    Error(PlayerError),
}

/// Callback object handed to a primary handle
#[derive(Clone)]
pub struct PrimaryCallbacks {
    notify: Arc<dyn Fn(PrimaryEvent) + Send + Sync>,
}

impl PrimaryCallbacks {
    pub fn new(notify: impl Fn(PrimaryEvent) + Send + Sync + 'static) -> Self {
        Self {
            notify: Arc::new(notify),
        }
    }

    pub fn started(&self) {
        (self.notify)(PrimaryEvent::Started);
    }

    pub fn load_error(&self, message: impl Into<String>) {
        (self.notify)(PrimaryEvent::LoadError(message.into()));
    }

    pub fn play_error(&self, message: impl Into<String>) {
        (self.notify)(PrimaryEvent::PlayError(message.into()));
    }
}

impl fmt::Debug for PrimaryCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PrimaryCallbacks")
    }
}

/// Callback object handed to a fallback handle
#[derive(Clone)]
pub struct FallbackCallbacks {
    notify: Arc<dyn Fn(FallbackEvent) + Send + Sync>,
}

impl FallbackCallbacks {
    pub fn new(notify: impl Fn(FallbackEvent) + Send + Sync + 'static) -> Self {
        Self {
            notify: Arc::new(notify),
        }
    }

    pub fn started(&self) {
        (self.notify)(FallbackEvent::Started);
    }

    /// The stream could not be reached; `None` reports a generic network error
    pub fn connection_failed(&self, message: Option<String>) {
        (self.notify)(FallbackEvent::Error(PlayerError::connection_failed(message)));
    }

    pub fn decode_failed(&self, message: impl Into<String>) {
        (self.notify)(FallbackEvent::Error(PlayerError::StreamDecodeFailed(message.into())));
    }

    pub fn error(&self, error: PlayerError) {
        (self.notify)(FallbackEvent::Error(error));
    }
}

impl fmt::Debug for FallbackCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FallbackCallbacks")
    }
}

/// Stream opened by the primary backend
pub trait PrimaryHandle: Send {
    /// Request playback to start (or resume)
    fn play(&mut self);
    fn pause(&mut self);
    fn stop(&mut self);
    /// Free decoding resources; the handle is not used afterwards
    fn unload(&mut self);
    fn set_volume(&mut self, volume: f32);
    /// Ramp the volume linearly from `from` to `to` over `duration`
    fn fade(&mut self, from: f32, to: f32, duration: Duration);
    fn is_playing(&self) -> bool;
}

/// Stream opened by the fallback backend
pub trait FallbackHandle: Send {
    /// Request playback to start (or resume)
    ///
    /// An error means the request was rejected synchronously.
    fn play(&mut self) -> Result<()>;
    fn pause(&mut self);
    /// Detach the stream source; the handle is not used afterwards
    fn clear_source(&mut self);
    fn set_volume(&mut self, volume: f32);
    fn is_paused(&self) -> bool;
}

/// Factory of primary handles
pub trait PrimaryBackend: Send + Sync {
    /// Open `url` at `volume`, without starting playback
    fn open(&self, url: &str, volume: f32, callbacks: PrimaryCallbacks) -> Result<Box<dyn PrimaryHandle>>;
}

/// Factory of fallback handles
pub trait FallbackBackend: Send + Sync {
    /// Open `url` at `volume`, without starting playback
    fn open(&self, url: &str, volume: f32, callbacks: FallbackCallbacks) -> Result<Box<dyn FallbackHandle>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[test]
    fn test_primary_callbacks_forward_events() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callbacks = PrimaryCallbacks::new(move |event| sink.lock().push(event));

        callbacks.started();
        callbacks.clone().load_error("404");

        assert_eq!(
            *seen.lock(),
            vec![PrimaryEvent::Started, PrimaryEvent::LoadError("404".into())]
        );
    }

    #[test]
    fn test_fallback_callbacks_build_errors() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let callbacks = FallbackCallbacks::new(move |event| sink.lock().push(event));

        callbacks.connection_failed(None);
        callbacks.decode_failed("unsupported codec");

        assert_eq!(
            *seen.lock(),
            vec![
                FallbackEvent::Error(PlayerError::StreamConnectionFailed("Network error".into())),
                FallbackEvent::Error(PlayerError::StreamDecodeFailed("unsupported codec".into())),
            ]
        );
    }
}
