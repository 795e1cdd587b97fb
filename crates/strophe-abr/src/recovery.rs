#![forbid(unsafe_code)]

use crate::LevelSet;

/// Outcome of handling a load failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecoveryAction {
    /// Failure is not tied to a known level; nothing to do here.
    Ignored,
    /// Level switched to its next redundant URL; its details must be refetched.
    RedundantFailover { level: usize, url_id: usize },
    /// No mirror left, but automatic mode can step down from this level.
    EmergencyDowngrade { level: usize },
    /// Nothing left to try: escalate.
    Fatal { level: usize },
}

impl RecoveryAction {
    pub fn is_fatal(self) -> bool {
        matches!(self, Self::Fatal { .. })
    }
}

/// Decide how to recover from a load failure on `level_id`.
///
/// Redundant URLs are exhausted first. After that, automatic mode falls back
/// to a lower level unless `level_id` is already the floor (0). Anything else
/// is fatal.
///
/// Advances the level's URL index and clears its details on failover; every
/// other side effect is left to the caller.
pub fn plan_recovery(levels: &mut LevelSet, level_id: usize, auto_mode: bool) -> RecoveryAction {
    let Some(level) = levels.get_mut(level_id) else {
        return RecoveryAction::Ignored;
    };

    if let Some(url_id) = level.advance_url() {
        return RecoveryAction::RedundantFailover {
            level: level_id,
            url_id,
        };
    }

    if auto_mode && level_id > 0 {
        RecoveryAction::EmergencyDowngrade { level: level_id }
    } else {
        RecoveryAction::Fatal { level: level_id }
    }
}
