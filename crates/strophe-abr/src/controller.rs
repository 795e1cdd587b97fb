#![forbid(unsafe_code)]

use strophe_events::{
    ErrorDetails, ErrorEvent, Event, EventBus, FragmentEvent, FragmentRef, FragmentStats,
    LevelDescriptor, LevelEvent, LoadStats, ManifestEvent, PlaylistDetails,
};
use web_time::Instant;

use crate::{
    BandwidthEstimator, Estimator, LevelError, LevelOptions, LevelResult, LevelSet,
    LiveReloadScheduler, RecoveryAction, ReloadTimer, plan_recovery, select_auto_level,
};

/// Owns level selection state and reacts to manifest, playlist, fragment and
/// error events.
///
/// All handlers run synchronously on `&mut self`; produced events are
/// published on the bus before the handler returns, `LevelEvent::Switch`
/// always ahead of the matching `LevelEvent::Loading`.
pub struct LevelController<T: ReloadTimer, E: Estimator = BandwidthEstimator> {
    bus: EventBus,
    options: LevelOptions,
    levels: LevelSet,
    estimator: E,
    reload: LiveReloadScheduler<T>,
    current_level: Option<usize>,
    manual_level: Option<usize>,
    auto_level_capping: Option<usize>,
    first_level: Option<usize>,
    start_level: Option<usize>,
    /// Level whose playlist load was requested and has not completed yet.
    pending_load: Option<usize>,
    /// Last fatal error this controller published, until it comes back over the bus.
    escalated: Option<ErrorEvent>,
}

impl<T: ReloadTimer, E: Estimator> LevelController<T, E> {
    pub fn with_estimator(bus: EventBus, options: LevelOptions, timer: T, estimator: E) -> Self {
        Self {
            bus,
            auto_level_capping: options.auto_level_capping,
            start_level: options.start_level,
            options,
            levels: LevelSet::default(),
            estimator,
            reload: LiveReloadScheduler::new(timer),
            current_level: None,
            manual_level: None,
            first_level: None,
            pending_load: None,
            escalated: None,
        }
    }

    pub fn levels(&self) -> &LevelSet {
        &self.levels
    }

    /// Currently committed level. `None` before the first switch or after a fatal error.
    pub fn level(&self) -> Option<usize> {
        self.current_level
    }

    pub fn manual_level(&self) -> Option<usize> {
        self.manual_level
    }

    pub fn auto_level_capping(&self) -> Option<usize> {
        self.auto_level_capping
    }

    pub fn set_auto_level_capping(&mut self, level: Option<usize>) {
        self.auto_level_capping = level;
    }

    pub fn first_level(&self) -> Option<usize> {
        self.first_level
    }

    pub fn set_first_level(&mut self, level: Option<usize>) {
        self.first_level = level;
    }

    /// Level to start playback at; falls back to the first level.
    pub fn start_level(&self) -> Option<usize> {
        self.start_level.or(self.first_level)
    }

    pub fn set_start_level(&mut self, level: Option<usize>) {
        self.start_level = level;
    }

    /// Last bandwidth sample in bits per second.
    pub fn last_bandwidth_bps(&self) -> f64 {
        self.estimator.bandwidth_bps()
    }

    pub fn is_reload_armed(&self) -> bool {
        self.reload.is_armed()
    }

    /// Commit to level `n`.
    ///
    /// No-op when `n` is already committed and its playlist is loaded or
    /// being loaded. Otherwise disarms live reload, publishes
    /// `LevelEvent::Switch` and, if the playlist is missing or live,
    /// requests it.
    pub fn set_level(&mut self, n: usize) -> LevelResult<()> {
        let Some(level) = self.levels.get(n) else {
            let count = self.levels.len();
            tracing::warn!(level = n, count, "invalid level index");
            self.bus.publish(
                ErrorEvent::level(ErrorDetails::LevelSwitchError, n)
                    .with_reason("invalid level idx"),
            );
            return Err(LevelError::InvalidLevel { level: n, count });
        };

        let loaded_or_loading = level.details().is_some() || self.pending_load == Some(n);
        if self.current_level == Some(n) && loaded_or_loading {
            return Ok(());
        }

        self.reload.disarm();
        self.current_level = Some(n);
        tracing::info!(level = n, "switching to level");
        self.bus.publish(LevelEvent::Switch { level: n });

        if level.needs_reload() {
            self.request_load(n);
        }
        Ok(())
    }

    /// Pin selection to a level, or return to automatic mode with `None`.
    ///
    /// An out-of-range level is rejected and leaves the mode unchanged.
    pub fn set_manual_level(&mut self, level: Option<usize>) -> LevelResult<()> {
        match level {
            Some(n) => {
                self.set_level(n)?;
                self.manual_level = Some(n);
            }
            None => self.manual_level = None,
        }
        Ok(())
    }

    /// Level the fragment loader should fetch next.
    pub fn next_load_level(&self) -> usize {
        self.manual_level.unwrap_or_else(|| self.next_auto_level())
    }

    /// Level picked by the bandwidth heuristic, ignoring manual mode.
    pub fn next_auto_level(&self) -> usize {
        select_auto_level(
            &self.levels,
            self.estimator.bandwidth_bps(),
            self.current_level,
            self.auto_level_capping,
            self.options.factors,
        )
    }

    /// Dispatch a bus event to the matching handler.
    ///
    /// Events this controller produces itself are ignored.
    pub fn handle(&mut self, event: &Event) {
        match event {
            Event::Manifest(ManifestEvent::Loaded { levels, stats }) => {
                // Failure is already reported on the bus.
                let _ = self.on_manifest_loaded(levels.clone(), *stats);
            }
            Event::Fragment(FragmentEvent::LoadProgress { frag, stats }) => {
                self.on_fragment_load_progress(*frag, *stats, Instant::now());
            }
            Event::Level(LevelEvent::Loaded { level, details }) => {
                self.on_level_loaded(*level, *details);
            }
            Event::Error(error) => {
                self.on_error(error);
            }
            Event::Manifest(ManifestEvent::Parsed { .. })
            | Event::Level(LevelEvent::Switch { .. } | LevelEvent::Loading { .. }) => {}
        }
    }

    /// Replace the level set and announce it.
    pub fn on_manifest_loaded(
        &mut self,
        raw: Vec<LevelDescriptor>,
        stats: LoadStats,
    ) -> LevelResult<()> {
        let (levels, first_level) = match LevelSet::build(raw) {
            Ok(built) => built,
            Err(e) => {
                tracing::error!(error = %e, "manifest rejected");
                self.bus.publish(
                    ErrorEvent::new(ErrorDetails::ManifestParsingError)
                        .with_fatal(true)
                        .with_reason(e.to_string()),
                );
                return Err(e);
            }
        };

        self.reload.disarm();
        self.current_level = None;
        self.pending_load = None;
        self.levels = levels;
        self.first_level = Some(first_level);

        let count = self.levels.len();
        if let Some(level) = self.manual_level.filter(|&l| l >= count) {
            tracing::warn!(level, count, "manual level not in new manifest, back to auto");
            self.manual_level = None;
        }
        if let Some(level) = self.start_level.filter(|&l| l >= count) {
            tracing::warn!(level, count, "start level not in new manifest, using first level");
            self.start_level = None;
        }

        tracing::info!(
            count = self.levels.len(),
            first_level,
            first_bitrate = self.levels.get(first_level).map(|l| l.bitrate()),
            "manifest loaded"
        );

        self.bus.publish(ManifestEvent::Parsed {
            levels: self.levels.infos(),
            first_level,
            stats,
        });
        Ok(())
    }

    /// Feed a fragment transfer report to the bandwidth estimator.
    pub fn on_fragment_load_progress(
        &mut self,
        frag: FragmentRef,
        stats: FragmentStats,
        now: Instant,
    ) {
        self.estimator.push_fragment(frag.level, stats, now);
    }

    /// Store playlist details and start polling live playlists.
    pub fn on_level_loaded(&mut self, level_id: usize, details: PlaylistDetails) {
        let Some(level) = self.levels.get_mut(level_id) else {
            tracing::warn!(level = level_id, "playlist loaded for unknown level");
            return;
        };
        level.set_details(details);
        if self.pending_load == Some(level_id) {
            self.pending_load = None;
        }

        if details.live && !self.reload.is_armed() {
            self.reload.arm(details.target_duration);
        }
    }

    /// Apply the recovery policy to a load failure.
    ///
    /// The policy runs whatever the `fatal` flag says; only this controller's
    /// own escalation, seen again on the bus, is skipped.
    pub fn on_error(&mut self, error: &ErrorEvent) -> RecoveryAction {
        if error.fatal && self.escalated.as_ref() == Some(error) {
            self.escalated = None;
            return RecoveryAction::Ignored;
        }
        let Some(level_id) = error.affected_level() else {
            return RecoveryAction::Ignored;
        };
        if self.pending_load == Some(level_id) {
            self.pending_load = None;
        }

        let action = plan_recovery(&mut self.levels, level_id, self.manual_level.is_none());
        match action {
            RecoveryAction::Ignored => {
                tracing::warn!(level = level_id, details = %error.details, "error for unknown level");
            }
            RecoveryAction::RedundantFailover { level, url_id } => {
                tracing::warn!(
                    level,
                    url_id,
                    details = %error.details,
                    "switching to redundant stream"
                );
            }
            RecoveryAction::EmergencyDowngrade { level } => {
                tracing::warn!(level, details = %error.details, "emergency switch-down for next fragment");
                self.estimator.reset();
            }
            RecoveryAction::Fatal { level } => {
                tracing::error!(level, details = %error.details, "cannot recover load error");
                self.current_level = None;
                self.reload.disarm();
                if !error.fatal {
                    let escalated = error.clone().with_fatal(true);
                    self.escalated = Some(escalated.clone());
                    self.bus.publish(escalated);
                }
            }
        }
        action
    }

    /// Reload the current level's playlist if `generation` is the armed timer.
    pub fn on_reload_tick(&mut self, generation: u64) {
        if !self.reload.accept_tick(generation) {
            tracing::debug!(generation, "stale live reload tick dropped");
            return;
        }
        if let Some(level) = self.current_level {
            self.request_load(level);
        }
    }

    /// Session teardown.
    pub fn destroy(&mut self) {
        self.reload.disarm();
        self.manual_level = None;
        self.pending_load = None;
    }

    fn request_load(&mut self, level_id: usize) {
        let Some(level) = self.levels.get(level_id) else {
            return;
        };
        let url = level.active_url().clone();
        let url_id = level.url_id();
        tracing::debug!(level = level_id, url_id, %url, "(re)loading playlist");
        self.pending_load = Some(level_id);
        self.bus.publish(LevelEvent::Loading {
            url,
            level: level_id,
            url_id,
        });
    }
}

impl<T: ReloadTimer> LevelController<T, BandwidthEstimator> {
    pub fn new(bus: EventBus, options: LevelOptions, timer: T) -> Self {
        let estimator = BandwidthEstimator::new(&options);
        Self::with_estimator(bus, options, timer, estimator)
    }
}
