//! Horloges et minuteries injectables.
//!
//! Ce module fournit les abstractions de temps utilisées par les autres crates
//! du workspace :
//!
//! - [`Clock`] : lecture de l'instant courant (utilisé par les caches à TTL)
//! - [`Scheduler`] : minuteries à un coup, annulables via [`TimerHandle`]
//!
//! Deux implémentations sont fournies :
//!
//! - [`SystemClock`] / [`TokioScheduler`] pour la production
//! - [`ManualClock`] pour les tests : le temps n'avance que sur appel explicite
//!   à [`ManualClock::advance`], ce qui rend les scénarios de timeout déterministes.
//!
//! # Example
//!
//! ```
//! use pmoutils::clock::{ManualClock, Scheduler};
//! use std::sync::atomic::{AtomicBool, Ordering};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let fired = Arc::new(AtomicBool::new(false));
//! let flag = fired.clone();
//!
//! let _timer = clock.schedule(
//!     Duration::from_secs(6),
//!     Box::new(move || flag.store(true, Ordering::SeqCst)),
//! );
//!
//! clock.advance(Duration::from_secs(5));
//! assert!(!fired.load(Ordering::SeqCst));
//! clock.advance(Duration::from_secs(1));
//! assert!(fired.load(Ordering::SeqCst));
//! ```

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Task executed when a timer fires
pub type TimerTask = Box<dyn FnOnce() + Send + 'static>;

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

/// Single-shot timer factory
pub trait Scheduler: Send + Sync {
    /// Run `task` once after `delay`, unless the returned handle is cancelled first.
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle;
}

const PENDING: u8 = 0;
const FIRED: u8 = 1;
const CANCELLED: u8 = 2;

/// Shared state between a timer handle and its pending task
#[derive(Debug, Default)]
struct TimerShared {
    status: AtomicU8,
}

impl TimerShared {
    /// Transition Pending -> Fired. Only the winner runs the task.
    fn try_fire(&self) -> bool {
        self.status
            .compare_exchange(PENDING, FIRED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn try_cancel(&self) -> bool {
        self.status
            .compare_exchange(PENDING, CANCELLED, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    fn is_pending(&self) -> bool {
        self.status.load(Ordering::Acquire) == PENDING
    }
}

/// Handle on a scheduled single-shot timer
///
/// A timer leaves the pending state exactly once: either it fires, or it is
/// cancelled. Dropping the handle does not cancel the timer.
pub struct TimerHandle {
    shared: Arc<TimerShared>,
    abort: Option<tokio::task::AbortHandle>,
}

impl TimerHandle {
    fn new(shared: Arc<TimerShared>, abort: Option<tokio::task::AbortHandle>) -> Self {
        Self { shared, abort }
    }

    /// Cancel the timer.
    ///
    /// Returns `true` if the timer was still pending, `false` if it had
    /// already fired or been cancelled.
    pub fn cancel(&self) -> bool {
        let cancelled = self.shared.try_cancel();
        if cancelled {
            if let Some(abort) = &self.abort {
                abort.abort();
            }
        }
        cancelled
    }

    /// Whether the timer has neither fired nor been cancelled
    pub fn is_pending(&self) -> bool {
        self.shared.is_pending()
    }
}

impl fmt::Debug for TimerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerHandle")
            .field("pending", &self.is_pending())
            .finish()
    }
}

// ============================================================================
// Production implementations
// ============================================================================

/// Wall-clock backed by [`Instant::now`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Scheduler running timers as tokio tasks
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: tokio::runtime::Handle,
}

impl TokioScheduler {
    /// Bind to the current tokio runtime
    ///
    /// # Panics
    ///
    /// Panics when called outside of a tokio runtime. Use [`TokioScheduler::try_current`]
    /// to handle that case.
    pub fn new() -> Self {
        Self::with_handle(tokio::runtime::Handle::current())
    }

    /// Bind to the current tokio runtime, if any
    pub fn try_current() -> Option<Self> {
        tokio::runtime::Handle::try_current()
            .ok()
            .map(Self::with_handle)
    }

    /// Bind to an explicit runtime handle
    pub fn with_handle(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }
}

impl Default for TokioScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let shared = Arc::new(TimerShared::default());
        let timer = shared.clone();

        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            if timer.try_fire() {
                task();
            }
        });

        TimerHandle::new(shared, Some(join.abort_handle()))
    }
}

// ============================================================================
// Manual clock (tests)
// ============================================================================

struct ManualTimer {
    deadline: Duration,
    seq: u64,
    shared: Arc<TimerShared>,
    task: TimerTask,
}

struct ManualState {
    elapsed: Duration,
    next_seq: u64,
    timers: Vec<ManualTimer>,
}

/// Clock and scheduler whose time only moves through [`ManualClock::advance`]
///
/// Timers due during an advance fire in deadline order (ties in scheduling
/// order), on the calling thread, with the clock positioned at their deadline.
/// Tasks may schedule further timers; those fire within the same advance if
/// they fall due before its end.
pub struct ManualClock {
    origin: Instant,
    state: Mutex<ManualState>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            state: Mutex::new(ManualState {
                elapsed: Duration::ZERO,
                next_seq: 0,
                timers: Vec::new(),
            }),
        }
    }

    /// Time elapsed since the clock was created
    pub fn elapsed(&self) -> Duration {
        self.state.lock().elapsed
    }

    /// Move time forward by `by`, firing every timer that falls due
    pub fn advance(&self, by: Duration) {
        let target = self.state.lock().elapsed + by;

        loop {
            let due = {
                let mut state = self.state.lock();
                state.timers.retain(|t| t.shared.is_pending());

                let next = state
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.deadline <= target)
                    .min_by_key(|(_, t)| (t.deadline, t.seq))
                    .map(|(index, _)| index);

                match next {
                    Some(index) => {
                        let timer = state.timers.swap_remove(index);
                        if timer.deadline > state.elapsed {
                            state.elapsed = timer.deadline;
                        }
                        timer
                    }
                    None => {
                        state.elapsed = target;
                        break;
                    }
                }
            };

            // The lock is released: the task may re-enter the scheduler.
            if due.shared.try_fire() {
                (due.task)();
            }
        }
    }

    /// Number of timers still waiting to fire
    pub fn pending_timers(&self) -> usize {
        self.state
            .lock()
            .timers
            .iter()
            .filter(|t| t.shared.is_pending())
            .count()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ManualClock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualClock")
            .field("elapsed", &self.elapsed())
            .field("pending_timers", &self.pending_timers())
            .finish()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.state.lock().elapsed
    }
}

impl Scheduler for ManualClock {
    fn schedule(&self, delay: Duration, task: TimerTask) -> TimerHandle {
        let shared = Arc::new(TimerShared::default());
        let mut state = self.state.lock();
        let seq = state.next_seq;
        state.next_seq += 1;
        let deadline = state.elapsed + delay;
        state.timers.push(ManualTimer {
            deadline,
            seq,
            shared: shared.clone(),
            task,
        });
        TimerHandle::new(shared, None)
    }
}
