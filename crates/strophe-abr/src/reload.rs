#![forbid(unsafe_code)]

use std::time::Duration;

use tokio::{
    sync::mpsc,
    time::{self, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;
#[cfg(test)]
use unimock::unimock;

/// Fired once per period by an armed reload timer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ReloadTick {
    /// Generation the timer was armed with.
    pub generation: u64,
}

/// Recurring timer backing live playlist reloads.
///
/// Implementations deliver [`ReloadTick`]s carrying `generation` every
/// `period` until disarmed. At most one timer is armed at a time.
#[cfg_attr(test, unimock(api = ReloadTimerMock))]
pub trait ReloadTimer {
    /// Start the timer. Returns `false` if it could not be started.
    fn arm(&mut self, generation: u64, period: Duration) -> bool;
    fn disarm(&mut self);
}

/// Timer that spawns an interval task on the current tokio runtime.
pub struct TokioReloadTimer {
    cancel: Option<CancellationToken>,
    ticks: mpsc::Sender<ReloadTick>,
}

impl TokioReloadTimer {
    pub fn new(ticks: mpsc::Sender<ReloadTick>) -> Self {
        Self {
            cancel: None,
            ticks,
        }
    }
}

impl ReloadTimer for TokioReloadTimer {
    fn arm(&mut self, generation: u64, period: Duration) -> bool {
        self.disarm();

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(generation, "no tokio runtime, live reload timer not started");
            return false;
        };

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let ticks = self.ticks.clone();
        handle.spawn(async move {
            let mut interval = time::interval_at(time::Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = interval.tick() => {
                        if ticks.send(ReloadTick { generation }).await.is_err() {
                            break;
                        }
                    }
                }
            }
        });
        self.cancel = Some(cancel);
        true
    }

    fn disarm(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

impl Drop for TokioReloadTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}

#[derive(Clone, Copy, Debug)]
struct ArmedReload {
    generation: u64,
    period: Duration,
}

/// Owns the single live reload timer and its generation counter.
///
/// Every arm bumps the generation; a tick is honoured only while its
/// generation is the armed one, so a tick racing with a disarm is dropped.
pub struct LiveReloadScheduler<T: ReloadTimer> {
    armed: Option<ArmedReload>,
    generation: u64,
    timer: T,
}

impl<T: ReloadTimer> LiveReloadScheduler<T> {
    pub fn new(timer: T) -> Self {
        Self {
            armed: None,
            generation: 0,
            timer,
        }
    }

    pub fn is_armed(&self) -> bool {
        self.armed.is_some()
    }

    /// Period of the armed timer.
    pub fn period(&self) -> Option<Duration> {
        self.armed.map(|a| a.period)
    }

    /// Arm a recurring reload. No-op when already armed.
    ///
    /// Returns `true` if a new timer was armed. A timer that fails to start
    /// leaves the scheduler disarmed.
    pub fn arm(&mut self, period: Duration) -> bool {
        if self.armed.is_some() {
            return false;
        }
        if period.is_zero() {
            tracing::warn!("live playlist has zero target duration, reload not scheduled");
            return false;
        }

        self.generation += 1;
        let generation = self.generation;
        if !self.timer.arm(generation, period) {
            return false;
        }
        self.armed = Some(ArmedReload { generation, period });
        tracing::debug!(generation, period_ms = period.as_millis(), "live reload armed");
        true
    }

    pub fn disarm(&mut self) {
        if let Some(armed) = self.armed.take() {
            self.timer.disarm();
            tracing::debug!(generation = armed.generation, "live reload disarmed");
        }
    }

    /// Whether a tick of `generation` belongs to the armed timer.
    pub fn accept_tick(&self, generation: u64) -> bool {
        self.armed.is_some_and(|a| a.generation == generation)
    }
}
