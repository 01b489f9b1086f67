/// Utilitaires partagés par les crates PMORadio.
///
/// # Modules
///
/// - [`clock`] : horloges et minuteries injectables ([`Clock`], [`Scheduler`]),
///   avec une implémentation tokio pour la production et une horloge manuelle
///   pour les tests déterministes.
pub mod clock;

pub use clock::{Clock, ManualClock, Scheduler, SystemClock, TimerHandle, TimerTask, TokioScheduler};
