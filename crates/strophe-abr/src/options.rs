#![forbid(unsafe_code)]

use std::time::Duration;

/// Bandwidth discount factors used by the automatic level selector.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SelectorFactors {
    /// Share of bandwidth considered for levels at or below the current one.
    pub down: f64,
    /// Share of bandwidth considered for levels above the current one.
    pub up: f64,
}

impl Default for SelectorFactors {
    fn default() -> Self {
        Self { down: 0.8, up: 0.7 }
    }
}

/// Level controller configuration.
#[derive(Clone, Debug)]
pub struct LevelOptions {
    /// Highest level automatic selection may pick. `None` means uncapped.
    pub auto_level_capping: Option<usize>,
    /// Selector discount factors.
    pub factors: SelectorFactors,
    /// Fetch durations below this are clamped up to it when sampling bandwidth.
    pub min_fetch_duration: Duration,
    /// Level to start playback at. `None` falls back to the manifest's first level.
    pub start_level: Option<usize>,
    /// Capacity of the live reload tick channel.
    pub tick_channel_capacity: usize,
}

impl Default for LevelOptions {
    fn default() -> Self {
        Self {
            auto_level_capping: None,
            factors: SelectorFactors::default(),
            min_fetch_duration: Duration::from_millis(1),
            start_level: None,
            tick_channel_capacity: 8,
        }
    }
}

impl LevelOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap automatic selection at `level`.
    pub fn with_auto_level_capping(mut self, level: usize) -> Self {
        self.auto_level_capping = Some(level);
        self
    }

    pub fn with_factors(mut self, factors: SelectorFactors) -> Self {
        self.factors = factors;
        self
    }

    pub fn with_min_fetch_duration(mut self, duration: Duration) -> Self {
        self.min_fetch_duration = duration;
        self
    }

    pub fn with_start_level(mut self, level: usize) -> Self {
        self.start_level = Some(level);
        self
    }

    pub fn with_tick_channel_capacity(mut self, capacity: usize) -> Self {
        self.tick_channel_capacity = capacity;
        self
    }
}
