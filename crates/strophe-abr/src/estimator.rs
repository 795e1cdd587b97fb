#![forbid(unsafe_code)]

use std::time::Duration;

use strophe_events::FragmentStats;
#[cfg(test)]
use unimock::unimock;
use web_time::Instant;

use crate::LevelOptions;

/// Trait for bandwidth estimation strategies.
///
/// Allows testing `LevelController` with mock estimators.
#[cfg_attr(test, unimock(api = EstimatorMock))]
pub trait Estimator {
    /// Record a fragment transfer that belonged to `level`, observed at `now`.
    fn push_fragment(&mut self, level: usize, stats: FragmentStats, now: Instant);

    /// Current bandwidth estimate in bits per second.
    fn bandwidth_bps(&self) -> f64;

    /// Drop the estimate to zero.
    fn reset(&mut self);
}

/// Throughput observed for one fragment fetch.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BandwidthSample {
    pub fetch_duration: Duration,
    pub loaded_bytes: u64,
    /// Level the fragment belonged to.
    pub level: Option<usize>,
}

impl BandwidthSample {
    /// `loaded_bytes * 8 / fetch_duration`, or zero for a zeroed sample.
    pub fn bandwidth_bps(&self) -> f64 {
        let secs = self.fetch_duration.as_secs_f64();
        if secs <= 0.0 {
            return 0.0;
        }
        #[expect(clippy::cast_precision_loss)] // byte counts far below 2^52
        let bits = (self.loaded_bytes * 8) as f64;
        bits / secs
    }
}

/// Last-sample-wins bandwidth estimator.
///
/// Every non-aborted fragment report replaces the previous sample. No
/// smoothing is applied.
#[derive(Clone, Debug)]
pub struct BandwidthEstimator {
    last: BandwidthSample,
    min_fetch_duration: Duration,
}

impl BandwidthEstimator {
    pub fn new(options: &LevelOptions) -> Self {
        Self {
            last: BandwidthSample::default(),
            min_fetch_duration: options.min_fetch_duration,
        }
    }

    pub fn last_sample(&self) -> BandwidthSample {
        self.last
    }

    pub fn push_fragment(&mut self, level: usize, stats: FragmentStats, now: Instant) {
        if stats.aborted {
            return;
        }

        let fetch_duration = now
            .saturating_duration_since(stats.request_time)
            .max(self.min_fetch_duration);

        self.last = BandwidthSample {
            fetch_duration,
            loaded_bytes: stats.loaded,
            level: Some(level),
        };

        tracing::trace!(
            level,
            loaded = stats.loaded,
            fetch_ms = fetch_duration.as_millis(),
            bandwidth_bps = self.last.bandwidth_bps(),
            "bandwidth sample"
        );
    }

    pub fn bandwidth_bps(&self) -> f64 {
        self.last.bandwidth_bps()
    }

    /// Zero the sample, keeping the level it was taken on.
    pub fn reset(&mut self) {
        self.last.fetch_duration = Duration::ZERO;
        self.last.loaded_bytes = 0;
    }
}

impl Estimator for BandwidthEstimator {
    fn push_fragment(&mut self, level: usize, stats: FragmentStats, now: Instant) {
        self.push_fragment(level, stats, now);
    }

    fn bandwidth_bps(&self) -> f64 {
        self.bandwidth_bps()
    }

    fn reset(&mut self) {
        self.reset();
    }
}
