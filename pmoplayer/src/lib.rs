//! Radio stream playback engine for PMORadio
//!
//! Internet radio streams come in many codecs and server setups. The engine
//! first tries a primary decoder; if it reports an error, or stays silent
//! past a watchdog delay, the engine swaps to a fallback decoder with broader
//! compatibility. The caller only sees [`PlayerEvent::Started`] or
//! [`PlayerEvent::Error`].
//!
//! Decoders are supplied by the application through the [`PrimaryBackend`]
//! and [`FallbackBackend`] traits; timers come from a [`pmoutils::Scheduler`].
//!
//! # Example
//!
//! ```no_run
//! use pmoplayer::{FallbackBackend, PlaybackEngine, PlayerEvent, PlayerSettings, PrimaryBackend};
//! use pmoradiobrowser::StationRecord;
//! use pmoutils::TokioScheduler;
//! use std::sync::Arc;
//!
//! # fn demo(primary: Arc<dyn PrimaryBackend>, fallback: Arc<dyn FallbackBackend>, station: StationRecord) {
//! let engine = PlaybackEngine::new(
//!     primary,
//!     fallback,
//!     Arc::new(TokioScheduler::new()),
//!     PlayerSettings::default(),
//! );
//! let events = engine.subscribe();
//!
//! engine.play(&station);
//! match events.recv() {
//!     Ok(PlayerEvent::Started) => println!("Playing {}", station.name),
//!     Ok(PlayerEvent::Error(e)) => eprintln!("{e}"),
//!     Err(_) => {}
//! }
//! # }
//! ```

pub mod backend;
pub mod config_ext;
pub mod engine;
pub mod error;
pub mod events;

pub use backend::{
    FallbackBackend, FallbackCallbacks, FallbackEvent, FallbackHandle, PrimaryBackend,
    PrimaryCallbacks, PrimaryEvent, PrimaryHandle,
};
pub use config_ext::PlayerConfigExt;
pub use engine::{clamp_volume, PlaybackEngine, PlaybackState, PlayerSettings};
pub use error::{PlayerError, Result};
pub use events::PlayerEvent;
