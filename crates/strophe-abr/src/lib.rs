//! Rendition selection and recovery for adaptive-bitrate streaming.
//!
//! Given alternative encodings ("levels") of the same media, this crate
//! decides which level to fetch next, reacts to playlist and fragment load
//! failures, and keeps live playlists fresh. It does no I/O itself: fetches
//! happen elsewhere and report back over a [`strophe_events::EventBus`].
//!
//! ## Example
//!
//! ```rust
//! use strophe_abr::{LevelController, LevelOptions, ReloadTimer};
//! use strophe_events::{EventBus, LevelDescriptor, LoadStats};
//! use std::time::Duration;
//! use url::Url;
//! use web_time::Instant;
//!
//! struct NoReload;
//!
//! impl ReloadTimer for NoReload {
//!     fn arm(&mut self, _generation: u64, _period: Duration) -> bool {
//!         false
//!     }
//!     fn disarm(&mut self) {}
//! }
//!
//! let bus = EventBus::new(32);
//! let mut controller = LevelController::new(bus.clone(), LevelOptions::default(), NoReload);
//!
//! let levels = vec![
//!     LevelDescriptor::new(1_000_000, Url::parse("https://cdn.example.com/hi.m3u8").unwrap()),
//!     LevelDescriptor::new(200_000, Url::parse("https://cdn.example.com/lo.m3u8").unwrap()),
//! ];
//! controller.on_manifest_loaded(levels, LoadStats::started(Instant::now())).unwrap();
//!
//! assert_eq!(controller.first_level(), Some(1));
//! controller.set_level(0).unwrap();
//! assert_eq!(controller.next_load_level(), 0);
//! ```
//!
//! Inside a tokio runtime, [`spawn_level_controller`] subscribes a controller
//! to the bus and drives it, including timed live reloads.

#![forbid(unsafe_code)]

mod controller;
mod error;
mod estimator;
mod options;
mod recovery;
mod registry;
mod reload;
mod selector;
mod task;

pub use controller::LevelController;
pub use error::{LevelError, LevelResult};
pub use estimator::{BandwidthEstimator, BandwidthSample, Estimator};
pub use options::{LevelOptions, SelectorFactors};
pub use recovery::{RecoveryAction, plan_recovery};
pub use registry::{BitrateLadder, Level, LevelSet};
pub use reload::{LiveReloadScheduler, ReloadTick, ReloadTimer, TokioReloadTimer};
pub use selector::select_auto_level;
pub use task::{LevelControllerHandle, spawn_level_controller};
