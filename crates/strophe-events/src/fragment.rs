#![forbid(unsafe_code)]

use web_time::Instant;

/// Identifies a media fragment and the level it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FragmentRef {
    pub level: usize,
    /// Media sequence number.
    pub sn: u64,
}

/// Transfer statistics of a fragment request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FragmentStats {
    /// Request was cancelled before completion.
    pub aborted: bool,
    /// Bytes received so far.
    pub loaded: u64,
    pub request_time: Instant,
}

/// Fragment download events.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FragmentEvent {
    LoadProgress {
        frag: FragmentRef,
        stats: FragmentStats,
    },
}
