//! Example: Watch the engine fall back from a stalled primary decoder
//!
//! The decoders are simulated: the primary one never produces audio for
//! streams ending in `.aac`, the fallback one starts after a short delay.
//!
//! Run with: cargo run -p pmoplayer --example simulated_playback
//! Or with real stations: cargo run -p pmoplayer --example simulated_playback -- TR

use pmoconfig::get_config;
use pmoplayer::{
    FallbackBackend, FallbackCallbacks, FallbackHandle, PlaybackEngine, PlayerEvent,
    PlayerSettings, PrimaryBackend, PrimaryCallbacks, PrimaryHandle,
};
use pmoradiobrowser::{RadioBrowserClient, StationRecord};
use pmoutils::TokioScheduler;
use std::env;
use std::sync::Arc;
use std::time::Duration;

struct SimulatedPrimary;

struct SimulatedPrimaryHandle {
    url: String,
    callbacks: PrimaryCallbacks,
    playing: bool,
}

impl PrimaryBackend for SimulatedPrimary {
    fn open(
        &self,
        url: &str,
        _volume: f32,
        callbacks: PrimaryCallbacks,
    ) -> pmoplayer::Result<Box<dyn PrimaryHandle>> {
        Ok(Box::new(SimulatedPrimaryHandle {
            url: url.to_string(),
            callbacks,
            playing: false,
        }))
    }
}

impl PrimaryHandle for SimulatedPrimaryHandle {
    fn play(&mut self) {
        if self.url.ends_with(".aac") {
            println!("  [primary] stalled on {}", self.url);
            return;
        }
        self.playing = true;
        let callbacks = self.callbacks.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            callbacks.started();
        });
    }

    fn pause(&mut self) {
        self.playing = false;
    }

    fn stop(&mut self) {
        self.playing = false;
    }

    fn unload(&mut self) {
        println!("  [primary] unloaded {}", self.url);
    }

    fn set_volume(&mut self, volume: f32) {
        println!("  [primary] volume {:.2}", volume);
    }

    fn fade(&mut self, from: f32, to: f32, duration: Duration) {
        println!("  [primary] fade {:.2} -> {:.2} over {:?}", from, to, duration);
    }

    fn is_playing(&self) -> bool {
        self.playing
    }
}

struct SimulatedFallback;

struct SimulatedFallbackHandle {
    url: String,
    callbacks: FallbackCallbacks,
    paused: bool,
}

impl FallbackBackend for SimulatedFallback {
    fn open(
        &self,
        url: &str,
        _volume: f32,
        callbacks: FallbackCallbacks,
    ) -> pmoplayer::Result<Box<dyn FallbackHandle>> {
        println!("  [fallback] opened {}", url);
        Ok(Box::new(SimulatedFallbackHandle {
            url: url.to_string(),
            callbacks,
            paused: true,
        }))
    }
}

impl FallbackHandle for SimulatedFallbackHandle {
    fn play(&mut self) -> pmoplayer::Result<()> {
        self.paused = false;
        let callbacks = self.callbacks.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            callbacks.started();
        });
        Ok(())
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn clear_source(&mut self) {
        println!("  [fallback] released {}", self.url);
    }

    fn set_volume(&mut self, volume: f32) {
        println!("  [fallback] volume {:.2}", volume);
    }

    fn is_paused(&self) -> bool {
        self.paused
    }
}

fn demo_station(name: &str, url: &str) -> StationRecord {
    StationRecord {
        name: name.to_string(),
        url_resolved: url.to_string(),
        bitrate: 128,
        last_check_ok: true,
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt::init();

    let config = get_config();
    let settings = PlayerSettings::from_config(&config)?;

    let stations = match env::args().nth(1) {
        Some(code) => {
            let client = RadioBrowserClient::from_config(&config)?;
            client.fetch_stations_by_country(&code, 2, 128).await?
        }
        None => vec![
            demo_station("Demo MP3", "http://demo.invalid/live.mp3"),
            demo_station("Demo AAC", "http://demo.invalid/live.aac"),
        ],
    };

    let engine = PlaybackEngine::new(
        Arc::new(SimulatedPrimary),
        Arc::new(SimulatedFallback),
        Arc::new(TokioScheduler::new()),
        settings,
    );
    let events = engine.subscribe();

    for station in &stations {
        println!("\n=== {} ===", station.name);
        engine.play(station);

        let deadline = settings.watchdog + Duration::from_secs(2);
        let events = events.clone();
        let event = tokio::task::spawn_blocking(move || events.recv_timeout(deadline)).await?;

        match event {
            Ok(PlayerEvent::Started) => println!("Started ({:?})", engine.state()),
            Ok(PlayerEvent::Error(e)) => println!("Error: {}", e),
            Err(_) => println!("No event within {:?}", deadline),
        }
    }

    engine.fade_out_default();
    tokio::time::sleep(settings.fade + Duration::from_millis(100)).await;
    println!("\nFinal state: {:?}", engine.state());

    engine.shutdown();
    Ok(())
}
