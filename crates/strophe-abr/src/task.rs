#![forbid(unsafe_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use strophe_events::{Event, EventBus};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;

use crate::{
    LevelController, LevelOptions, LevelResult, LevelSet, ReloadTick, TokioReloadTimer,
};

type SharedController = Arc<Mutex<LevelController<TokioReloadTimer>>>;

/// Subscribe a level controller to `bus` and drive it on a tokio task.
///
/// The subscription is taken before this returns, so no event published
/// afterwards is missed. Must be called from within a tokio runtime.
pub fn spawn_level_controller(bus: &EventBus, options: LevelOptions) -> LevelControllerHandle {
    let (tick_tx, tick_rx) = mpsc::channel(options.tick_channel_capacity.max(1));
    let controller = LevelController::new(bus.clone(), options, TokioReloadTimer::new(tick_tx));
    let controller: SharedController = Arc::new(Mutex::new(controller));

    let events = bus.subscribe();
    let cancel = CancellationToken::new();
    let join = tokio::spawn(run(
        Arc::clone(&controller),
        events,
        tick_rx,
        cancel.clone(),
    ));

    LevelControllerHandle {
        cancel,
        controller,
        join: Some(join),
    }
}

async fn run(
    controller: SharedController,
    mut events: broadcast::Receiver<Event>,
    mut ticks: mpsc::Receiver<ReloadTick>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(tick) = ticks.recv() => {
                controller.lock().on_reload_tick(tick.generation);
            }
            recv = events.recv() => match recv {
                Ok(event) => {
                    controller.lock().handle(&event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "level controller lagging behind event bus");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
        }
    }

    controller.lock().destroy();
    tracing::debug!("level controller stopped");
}

/// Public surface of a running level controller.
///
/// Queries and commands lock the controller, so they never interleave with
/// an event handler. Dropping the handle stops the controller task.
pub struct LevelControllerHandle {
    cancel: CancellationToken,
    controller: SharedController,
    join: Option<JoinHandle<()>>,
}

impl LevelControllerHandle {
    /// Snapshot of the current level set.
    pub fn levels(&self) -> LevelSet {
        self.controller.lock().levels().clone()
    }

    pub fn level(&self) -> Option<usize> {
        self.controller.lock().level()
    }

    pub fn set_level(&self, level: usize) -> LevelResult<()> {
        self.controller.lock().set_level(level)
    }

    pub fn manual_level(&self) -> Option<usize> {
        self.controller.lock().manual_level()
    }

    pub fn set_manual_level(&self, level: Option<usize>) -> LevelResult<()> {
        self.controller.lock().set_manual_level(level)
    }

    pub fn auto_level_capping(&self) -> Option<usize> {
        self.controller.lock().auto_level_capping()
    }

    pub fn set_auto_level_capping(&self, level: Option<usize>) {
        self.controller.lock().set_auto_level_capping(level);
    }

    pub fn first_level(&self) -> Option<usize> {
        self.controller.lock().first_level()
    }

    pub fn set_first_level(&self, level: Option<usize>) {
        self.controller.lock().set_first_level(level);
    }

    pub fn start_level(&self) -> Option<usize> {
        self.controller.lock().start_level()
    }

    pub fn set_start_level(&self, level: Option<usize>) {
        self.controller.lock().set_start_level(level);
    }

    pub fn next_load_level(&self) -> usize {
        self.controller.lock().next_load_level()
    }

    pub fn next_auto_level(&self) -> usize {
        self.controller.lock().next_auto_level()
    }

    pub fn last_bandwidth_bps(&self) -> f64 {
        self.controller.lock().last_bandwidth_bps()
    }

    pub fn is_reload_armed(&self) -> bool {
        self.controller.lock().is_reload_armed()
    }

    /// Stop the controller task and wait for it to release its subscription.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        let Some(join) = self.join.take() else {
            return;
        };
        if let Err(e) = join.await {
            tracing::warn!(error = %e, "level controller task failed");
        }
    }
}

impl Drop for LevelControllerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
