#![forbid(unsafe_code)]

use url::Url;
use web_time::Instant;

/// One raw level entry of a parsed manifest.
///
/// Several descriptors may share a bitrate; they are redundant mirrors of
/// the same encoding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelDescriptor {
    /// Declared bandwidth in bits per second.
    pub bitrate: u64,
    /// Media playlist URL for this entry.
    pub url: Url,
    pub name: Option<String>,
    /// Codec string (e.g., "avc1.64001f,mp4a.40.2").
    pub codecs: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl LevelDescriptor {
    pub fn new(bitrate: u64, url: Url) -> Self {
        Self {
            bitrate,
            url,
            name: None,
            codecs: None,
            width: None,
            height: None,
        }
    }

    pub fn with_name<S: Into<String>>(mut self, name: S) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_codecs<S: Into<String>>(mut self, codecs: S) -> Self {
        self.codecs = Some(codecs.into());
        self
    }

    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }
}

/// Read-only snapshot of a deduplicated level.
///
/// Published in [`ManifestEvent::Parsed`] once the level set is built.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LevelInfo {
    /// Position in the bitrate-sorted level set.
    pub index: usize,
    pub bitrate: u64,
    /// Redundant URLs in manifest order.
    pub urls: Vec<Url>,
    pub name: Option<String>,
    pub codecs: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
}

/// Timing of a manifest or playlist request, passed through unchanged.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoadStats {
    pub request_time: Instant,
    pub first_byte_time: Option<Instant>,
    pub load_time: Option<Instant>,
    pub loaded: u64,
}

impl LoadStats {
    pub fn started(request_time: Instant) -> Self {
        Self {
            request_time,
            first_byte_time: None,
            load_time: None,
            loaded: 0,
        }
    }
}

/// Manifest lifecycle events.
#[derive(Clone, Debug)]
pub enum ManifestEvent {
    /// Manifest fetched and parsed into raw level descriptors.
    Loaded {
        levels: Vec<LevelDescriptor>,
        stats: LoadStats,
    },
    /// Level set built: duplicates merged, sorted by bitrate.
    Parsed {
        levels: Vec<LevelInfo>,
        first_level: usize,
        stats: LoadStats,
    },
}
