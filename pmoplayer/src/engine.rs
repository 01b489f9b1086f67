//! Playback engine
//!
//! The engine owns at most one playback session. Starting a station opens a
//! primary decoder handle, arms a watchdog and asks the handle to start:
//!
//! ```text
//! Idle ──play──▶ StartingPrimary ──started──▶ PrimaryActive
//!                      │                           │
//!          load/play error or watchdog       mid-stream error
//!                      ▼                           │
//!                 FallingBack ◀────────────────────┘
//!                      │
//!            started ──┴── error
//!               ▼            ▼
//!        FallbackActive    Error
//! ```
//!
//! `stop()` from any state leads to `Stopped`; `play()` from any state tears
//! the current session down before starting the next one.
//!
//! # Ordering
//!
//! Backend callbacks and timer expiries never touch the session directly.
//! They are queued as signals tagged with the generation of the session that
//! produced them, and drained by whichever thread holds the session lock:
//! a public method before returning, or the callback itself when the lock is
//! free. Signals of a released session are dropped on sight, so a late
//! callback of a superseded station can never produce an event.

use crate::backend::{
    FallbackBackend, FallbackCallbacks, FallbackEvent, FallbackHandle, PrimaryBackend,
    PrimaryCallbacks, PrimaryEvent, PrimaryHandle,
};
use crate::error::PlayerError;
use crate::events::{PlayerEvent, PlayerEventBus};
use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use pmoradiobrowser::StationRecord;
use pmoutils::{Scheduler, TimerHandle};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Initial volume of a new engine
pub const DEFAULT_VOLUME: f32 = 0.5;

/// Time given to the primary decoder to start before switching to the fallback
pub const DEFAULT_WATCHDOG: Duration = Duration::from_secs(6);

/// Default fade-out duration
pub const DEFAULT_FADE: Duration = Duration::from_millis(2000);

/// Engine policy values
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerSettings {
    pub default_volume: f32,
    pub watchdog: Duration,
    pub fade: Duration,
}

impl Default for PlayerSettings {
    fn default() -> Self {
        Self {
            default_volume: DEFAULT_VOLUME,
            watchdog: DEFAULT_WATCHDOG,
            fade: DEFAULT_FADE,
        }
    }
}

/// Lifecycle state of the current session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaybackState {
    #[default]
    Idle,
    /// Primary handle opened, waiting for audio
    StartingPrimary,
    PrimaryActive,
    /// Fallback handle opened, waiting for audio
    FallingBack,
    FallbackActive,
    Stopped,
    Error,
}

impl PlaybackState {
    /// Whether a playback attempt is in progress or running
    pub fn is_active(self) -> bool {
        matches!(
            self,
            Self::StartingPrimary | Self::PrimaryActive | Self::FallingBack | Self::FallbackActive
        )
    }
}

/// Clamp a volume to `[0, 1]`; NaN maps to silence
pub fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

enum Signal {
    Primary(PrimaryEvent),
    Fallback(FallbackEvent),
    WatchdogElapsed,
    FadeElapsed,
}

struct Session {
    /// Bumped on every teardown; signals carry the value they were issued under
    generation: u64,
    state: PlaybackState,
    station: Option<StationRecord>,
    stream_url: String,
    primary: Option<Box<dyn PrimaryHandle>>,
    fallback: Option<Box<dyn FallbackHandle>>,
    watchdog: Option<TimerHandle>,
    fade: Option<TimerHandle>,
    volume: f32,
    closed: bool,
}

impl Session {
    fn new(volume: f32) -> Self {
        Self {
            generation: 0,
            state: PlaybackState::Idle,
            station: None,
            stream_url: String::new(),
            primary: None,
            fallback: None,
            watchdog: None,
            fade: None,
            volume,
            closed: false,
        }
    }

    fn cancel_watchdog(&mut self) {
        if let Some(timer) = self.watchdog.take() {
            timer.cancel();
        }
    }

    fn cancel_fade(&mut self) {
        if let Some(timer) = self.fade.take() {
            timer.cancel();
        }
    }

    fn release_primary(&mut self) {
        if let Some(mut handle) = self.primary.take() {
            handle.stop();
            handle.unload();
        }
    }

    fn release_fallback(&mut self) {
        if let Some(mut handle) = self.fallback.take() {
            handle.pause();
            handle.clear_source();
        }
    }

    /// Cancel both timers, release both handles and invalidate pending signals
    fn release(&mut self) {
        self.cancel_watchdog();
        self.cancel_fade();
        self.release_primary();
        self.release_fallback();
        self.generation += 1;
    }

    fn is_playing(&self) -> bool {
        self.primary.as_ref().is_some_and(|h| h.is_playing())
            || self.fallback.as_ref().is_some_and(|h| !h.is_paused())
    }
}

struct EngineCore {
    this: Weak<EngineCore>,
    session: Mutex<Session>,
    signal_tx: Sender<(u64, Signal)>,
    signal_rx: Receiver<(u64, Signal)>,
    primary: Arc<dyn PrimaryBackend>,
    fallback: Arc<dyn FallbackBackend>,
    scheduler: Arc<dyn Scheduler>,
    events: PlayerEventBus,
    settings: PlayerSettings,
}

impl EngineCore {
    // ========================================================================
    // Signal plumbing
    // ========================================================================

    /// Closure posting signals for the session of `generation`
    fn notifier(&self, generation: u64) -> impl Fn(Signal) + Send + Sync + 'static {
        let core = self.this.clone();
        move |signal| {
            if let Some(core) = core.upgrade() {
                core.post(generation, signal);
            }
        }
    }

    fn schedule(&self, generation: u64, delay: Duration, signal: Signal) -> TimerHandle {
        let notify = self.notifier(generation);
        self.scheduler.schedule(delay, Box::new(move || notify(signal)))
    }

    fn post(&self, generation: u64, signal: Signal) {
        // The receiver lives as long as `self`.
        let _ = self.signal_tx.send((generation, signal));
        self.dispatch();
    }

    /// Drain queued signals if the session lock is free
    ///
    /// When the lock is taken, its holder drains before releasing it and then
    /// calls this again, so no signal is left behind.
    fn dispatch(&self) {
        loop {
            match self.session.try_lock() {
                Some(mut session) => self.drain(&mut session),
                None => return,
            }
            if self.signal_rx.is_empty() {
                return;
            }
        }
    }

    fn drain(&self, session: &mut Session) {
        while let Ok((generation, signal)) = self.signal_rx.try_recv() {
            if generation != session.generation {
                debug!(generation, current = session.generation, "Dropping signal of a released session");
                continue;
            }
            self.handle(session, signal);
        }
    }

    fn with_session<R>(&self, f: impl FnOnce(&Self, &mut Session) -> R) -> R {
        let result = {
            let mut session = self.session.lock();
            self.drain(&mut session);
            let result = f(self, &mut session);
            self.drain(&mut session);
            result
        };
        self.dispatch();
        result
    }

    fn emit(&self, event: PlayerEvent) {
        self.events.broadcast(event);
    }

    // ========================================================================
    // Signal handlers
    // ========================================================================

    fn handle(&self, session: &mut Session, signal: Signal) {
        match signal {
            Signal::Primary(PrimaryEvent::Started) => self.on_primary_started(session),
            Signal::Primary(PrimaryEvent::LoadError(message)) => {
                self.on_primary_error(session, "load", &message)
            }
            Signal::Primary(PrimaryEvent::PlayError(message)) => {
                self.on_primary_error(session, "play", &message)
            }
            Signal::Fallback(FallbackEvent::Started) => self.on_fallback_started(session),
            Signal::Fallback(FallbackEvent::Error(error)) => self.on_fallback_error(session, error),
            Signal::WatchdogElapsed => self.on_watchdog(session),
            Signal::FadeElapsed => {
                debug!("Fade-out complete");
                self.stop_session(session);
            }
        }
    }

    fn on_primary_started(&self, session: &mut Session) {
        if session.state != PlaybackState::StartingPrimary || session.primary.is_none() {
            debug!(state = ?session.state, "Ignoring primary start notification");
            return;
        }
        session.cancel_watchdog();
        session.state = PlaybackState::PrimaryActive;
        info!(url = %session.stream_url, "Primary decoder started");
        self.emit(PlayerEvent::Started);
    }

    fn on_primary_error(&self, session: &mut Session, kind: &str, message: &str) {
        let live = matches!(
            session.state,
            PlaybackState::StartingPrimary | PlaybackState::PrimaryActive
        );
        if session.primary.is_none() || !live {
            debug!(kind, message, "Ignoring error of a released primary handle");
            return;
        }
        warn!(kind, error = message, url = %session.stream_url, "Primary decoder failed");
        self.fall_back(session);
    }

    fn on_watchdog(&self, session: &mut Session) {
        session.watchdog = None;
        if session.state != PlaybackState::StartingPrimary {
            return;
        }

        // Audio flows but the start notification has not been delivered yet
        if session.primary.as_ref().is_some_and(|h| h.is_playing()) {
            self.on_primary_started(session);
            return;
        }

        warn!(
            url = %session.stream_url,
            timeout_ms = self.settings.watchdog.as_millis() as u64,
            "Watchdog expired before the primary decoder started"
        );
        self.fall_back(session);
    }

    fn on_fallback_started(&self, session: &mut Session) {
        if session.state != PlaybackState::FallingBack {
            debug!(state = ?session.state, "Ignoring fallback start notification");
            return;
        }
        session.state = PlaybackState::FallbackActive;
        info!(url = %session.stream_url, "Fallback decoder started");
        self.emit(PlayerEvent::Started);
    }

    fn on_fallback_error(&self, session: &mut Session, error: PlayerError) {
        if !matches!(
            session.state,
            PlaybackState::FallingBack | PlaybackState::FallbackActive
        ) {
            debug!(error = %error, "Ignoring error of a released fallback handle");
            return;
        }
        self.fail(session, error);
    }

    // ========================================================================
    // Session transitions
    // ========================================================================

    fn start_session(&self, session: &mut Session, station: &StationRecord) {
        if session.closed {
            warn!(station = %station.name, "play() called on a shut down engine");
            return;
        }

        session.release();
        session.station = None;
        session.stream_url.clear();

        let url = station.stream_url().to_string();
        if url.is_empty() {
            session.state = PlaybackState::Error;
            warn!(station = %station.name, "Station has no stream URL");
            self.emit(PlayerEvent::Error(PlayerError::InvalidStation(format!(
                "'{}' has no stream URL",
                station.name
            ))));
            return;
        }

        session.station = Some(station.clone());
        session.stream_url = url;
        session.state = PlaybackState::StartingPrimary;
        info!(station = %station.name, url = %session.stream_url, "Starting playback");

        let generation = session.generation;
        let notify = self.notifier(generation);
        let callbacks = PrimaryCallbacks::new(move |event| notify(Signal::Primary(event)));

        match self.primary.open(&session.stream_url, session.volume, callbacks) {
            Ok(handle) => {
                session.primary = Some(handle);
                session.watchdog = Some(self.schedule(
                    generation,
                    self.settings.watchdog,
                    Signal::WatchdogElapsed,
                ));
                if let Some(handle) = session.primary.as_mut() {
                    handle.play();
                }
            }
            Err(e) => {
                warn!(error = %e, "Primary decoder could not open the stream");
                self.fall_back(session);
            }
        }
    }

    /// Swap to the fallback decoder; does nothing if it is already in place
    fn fall_back(&self, session: &mut Session) {
        if session.fallback.is_some() {
            return;
        }

        session.cancel_watchdog();
        session.release_primary();
        session.state = PlaybackState::FallingBack;
        info!(url = %session.stream_url, "Switching to fallback decoder");

        let notify = self.notifier(session.generation);
        let callbacks = FallbackCallbacks::new(move |event| notify(Signal::Fallback(event)));

        let handle = match self.fallback.open(&session.stream_url, session.volume, callbacks) {
            Ok(handle) => handle,
            Err(e) => {
                self.fail(session, e);
                return;
            }
        };

        let handle = session.fallback.insert(handle);
        if let Err(e) = handle.play() {
            self.fail(session, e);
        }
    }

    /// Terminal failure of the session
    fn fail(&self, session: &mut Session, error: PlayerError) {
        error!(error = %error, url = %session.stream_url, "Playback failed");
        session.cancel_watchdog();
        session.cancel_fade();
        session.release_primary();
        session.release_fallback();
        session.state = PlaybackState::Error;
        self.emit(PlayerEvent::Error(error));
    }

    fn stop_session(&self, session: &mut Session) {
        session.release();
        if session.station.take().is_some() {
            debug!(url = %session.stream_url, "Playback stopped");
        }
        session.stream_url.clear();
        if session.state != PlaybackState::Idle {
            session.state = PlaybackState::Stopped;
        }
    }
}

impl Drop for EngineCore {
    fn drop(&mut self) {
        self.session.get_mut().release();
    }
}

/// Radio playback engine
///
/// Cloning is cheap: clones drive the same session. Handles are released
/// when the last clone is dropped.
#[derive(Clone)]
pub struct PlaybackEngine {
    core: Arc<EngineCore>,
}

impl PlaybackEngine {
    /// Create an idle engine
    pub fn new(
        primary: Arc<dyn PrimaryBackend>,
        fallback: Arc<dyn FallbackBackend>,
        scheduler: Arc<dyn Scheduler>,
        settings: PlayerSettings,
    ) -> Self {
        let (signal_tx, signal_rx) = unbounded();
        let core = Arc::new_cyclic(|this| EngineCore {
            this: this.clone(),
            session: Mutex::new(Session::new(clamp_volume(settings.default_volume))),
            signal_tx,
            signal_rx,
            primary,
            fallback,
            scheduler,
            events: PlayerEventBus::new(),
            settings,
        });
        Self { core }
    }

    /// Start playing `station`, replacing the current session
    ///
    /// Never fails: the outcome is reported as a [`PlayerEvent`].
    pub fn play(&self, station: &StationRecord) {
        self.core
            .with_session(|core, session| core.start_session(session, station));
    }

    /// Pause whichever decoder is playing
    pub fn pause(&self) {
        self.core.with_session(|_, session| {
            if let Some(handle) = session.primary.as_mut() {
                if handle.is_playing() {
                    handle.pause();
                }
            }
            if let Some(handle) = session.fallback.as_mut() {
                if !handle.is_paused() {
                    handle.pause();
                }
            }
        });
    }

    /// Resume whichever decoder is paused
    pub fn resume(&self) {
        self.core.with_session(|_, session| {
            if let Some(handle) = session.primary.as_mut() {
                if !handle.is_playing() {
                    handle.play();
                }
            }
            if let Some(handle) = session.fallback.as_mut() {
                if handle.is_paused() {
                    if let Err(e) = handle.play() {
                        warn!(error = %e, "Fallback decoder refused to resume");
                    }
                }
            }
        });
    }

    /// Stop playback and release every handle; safe to call at any time
    pub fn stop(&self) {
        self.core.with_session(|core, session| core.stop_session(session));
    }

    /// Set the volume, clamped to `[0, 1]`
    ///
    /// The value applies to the live handles and to every handle opened later.
    pub fn set_volume(&self, volume: f32) {
        let volume = clamp_volume(volume);
        self.core.with_session(|_, session| {
            session.volume = volume;
            if let Some(handle) = session.primary.as_mut() {
                handle.set_volume(volume);
            }
            if let Some(handle) = session.fallback.as_mut() {
                handle.set_volume(volume);
            }
        });
    }

    pub fn volume(&self) -> f32 {
        self.core.with_session(|_, session| session.volume)
    }

    /// Fade out over `duration`, then stop
    ///
    /// Only the primary decoder can ramp its volume. With the fallback decoder
    /// the sound stays at full volume and stops once `duration` has elapsed.
    /// Without any handle this does nothing.
    pub fn fade_out(&self, duration: Duration) {
        self.core.with_session(|core, session| {
            let generation = session.generation;
            let volume = session.volume;

            if let Some(handle) = session.primary.as_mut().filter(|h| h.is_playing()) {
                handle.fade(volume, 0.0, duration);
            } else if session.fallback.is_some() {
                debug!("Fallback decoder cannot ramp, stopping at the end of the fade");
            } else {
                debug!("Nothing to fade out");
                return;
            }

            session.cancel_fade();
            session.fade = Some(core.schedule(generation, duration, Signal::FadeElapsed));
        });
    }

    /// Fade out over the configured default duration
    pub fn fade_out_default(&self) {
        self.fade_out(self.core.settings.fade);
    }

    /// Whether either decoder is producing audio
    pub fn is_playing(&self) -> bool {
        self.core.with_session(|_, session| session.is_playing())
    }

    pub fn state(&self) -> PlaybackState {
        self.core.with_session(|_, session| session.state)
    }

    /// Station of the current session
    pub fn current_station(&self) -> Option<StationRecord> {
        self.core.with_session(|_, session| session.station.clone())
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&self) -> Receiver<PlayerEvent> {
        self.core.events.subscribe()
    }

    pub fn settings(&self) -> &PlayerSettings {
        &self.core.settings
    }

    /// Stop playback for good and disconnect every subscriber
    ///
    /// Later calls to [`PlaybackEngine::play`] are ignored.
    pub fn shutdown(&self) {
        self.core.with_session(|core, session| {
            core.stop_session(session);
            session.closed = true;
            core.events.close();
        });
        info!("Playback engine shut down");
    }
}

impl fmt::Debug for PlaybackEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PlaybackEngine")
            .field("state", &self.state())
            .field("volume", &self.volume())
            .finish()
    }
}
