#![forbid(unsafe_code)]

use crate::{ErrorEvent, FragmentEvent, LevelEvent, ManifestEvent};

/// Unified event for the level controller and its collaborators.
///
/// Hierarchical: each subsystem has its own variant with a sub-enum.
#[derive(Clone, Debug)]
pub enum Event {
    /// Manifest lifecycle event.
    Manifest(ManifestEvent),
    /// Level switch or playlist event.
    Level(LevelEvent),
    /// Fragment download event.
    Fragment(FragmentEvent),
    /// Load or switch failure.
    Error(ErrorEvent),
}

impl From<ManifestEvent> for Event {
    fn from(e: ManifestEvent) -> Self {
        Self::Manifest(e)
    }
}

impl From<LevelEvent> for Event {
    fn from(e: LevelEvent) -> Self {
        Self::Level(e)
    }
}

impl From<FragmentEvent> for Event {
    fn from(e: FragmentEvent) -> Self {
        Self::Fragment(e)
    }
}

impl From<ErrorEvent> for Event {
    fn from(e: ErrorEvent) -> Self {
        Self::Error(e)
    }
}
