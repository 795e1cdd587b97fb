#![forbid(unsafe_code)]

use std::time::Duration;

use url::Url;

/// Metadata obtained by loading a level's media playlist.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlaylistDetails {
    /// Playlist is still growing and must be polled.
    pub live: bool,
    /// Expected segment length; also the live reload period.
    pub target_duration: Duration,
}

impl PlaylistDetails {
    pub fn vod(target_duration: Duration) -> Self {
        Self {
            live: false,
            target_duration,
        }
    }

    pub fn live(target_duration: Duration) -> Self {
        Self {
            live: true,
            target_duration,
        }
    }
}

/// Level (quality) events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LevelEvent {
    /// Controller committed to a new level.
    ///
    /// Always published before the matching [`LevelEvent::Loading`].
    Switch { level: usize },
    /// Playlist load requested for a level.
    Loading { url: Url, level: usize, url_id: usize },
    /// Playlist for a level loaded successfully.
    Loaded {
        level: usize,
        details: PlaylistDetails,
    },
}
