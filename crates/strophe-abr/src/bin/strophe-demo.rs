//! Drives a level controller through a short synthetic live session and logs
//! every bus event.
//!
//! `RUST_LOG=debug cargo run -p strophe-abr --bin strophe-demo`

#![forbid(unsafe_code)]

use std::time::Duration;

use strophe_abr::{LevelOptions, spawn_level_controller};
use strophe_events::{
    ErrorDetails, ErrorEvent, Event, EventBus, FragmentEvent, FragmentRef, FragmentStats,
    LevelDescriptor, LevelEvent, LoadStats, ManifestEvent, PlaylistDetails,
};
use tokio::sync::broadcast;
use url::Url;
use web_time::Instant;

const TARGET_DURATION: Duration = Duration::from_millis(500);

fn manifest() -> Result<Vec<LevelDescriptor>, url::ParseError> {
    Ok(vec![
        LevelDescriptor::new(800_000, Url::parse("https://edge-1.example.com/mid.m3u8")?)
            .with_resolution(854, 480),
        LevelDescriptor::new(300_000, Url::parse("https://edge-1.example.com/low.m3u8")?)
            .with_resolution(640, 360),
        LevelDescriptor::new(2_400_000, Url::parse("https://edge-1.example.com/hi.m3u8")?)
            .with_resolution(1280, 720),
        LevelDescriptor::new(2_400_000, Url::parse("https://edge-2.example.com/hi.m3u8")?)
            .with_resolution(1280, 720),
    ])
}

/// Answers playlist requests like a live origin would.
async fn fake_loader(bus: EventBus, mut events: broadcast::Receiver<Event>) {
    while let Ok(event) = events.recv().await {
        tracing::debug!(?event, "bus event");
        match event {
            Event::Level(LevelEvent::Loading { level, url_id, url }) => {
                tracing::info!(level, url_id, %url, "playlist requested");
                bus.publish(LevelEvent::Loaded {
                    level,
                    details: PlaylistDetails::live(TARGET_DURATION),
                });
            }
            Event::Error(ErrorEvent { fatal: true, .. }) => break,
            _ => {}
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let bus = EventBus::new(64);
    let controller = spawn_level_controller(&bus, LevelOptions::default());
    let loader = tokio::spawn(fake_loader(bus.clone(), bus.subscribe()));

    let mut parsed = bus.subscribe();
    bus.publish(ManifestEvent::Loaded {
        levels: manifest()?,
        stats: LoadStats::started(Instant::now()),
    });
    while let Ok(event) = parsed.recv().await {
        if let Event::Manifest(ManifestEvent::Parsed { levels, first_level, .. }) = event {
            tracing::info!(count = levels.len(), first_level, "levels ready");
            break;
        }
    }

    if let Some(start) = controller.start_level() {
        controller.set_level(start)?;
    }

    // A few fragments at roughly 3 Mbps.
    for sn in 0..4 {
        let request_time = Instant::now();
        tokio::time::sleep(Duration::from_millis(100)).await;
        bus.publish(FragmentEvent::LoadProgress {
            frag: FragmentRef { level: controller.level().unwrap_or_default(), sn },
            stats: FragmentStats {
                aborted: false,
                loaded: 37_500,
                request_time,
            },
        });
        tokio::task::yield_now().await;
        let next = controller.next_load_level();
        tracing::info!(
            sn,
            bandwidth_bps = controller.last_bandwidth_bps(),
            next,
            "next fragment level"
        );
        controller.set_level(next)?;
    }

    // Lose the primary CDN for the top level, then every mirror.
    let top = controller.levels().len().saturating_sub(1);
    for _ in 0..2 {
        bus.publish(ErrorEvent::level(ErrorDetails::LevelLoadError, top));
        tokio::time::sleep(TARGET_DURATION).await;
    }
    tracing::info!(next = controller.next_load_level(), "after failures");

    controller.shutdown().await;
    loader.abort();
    Ok(())
}
