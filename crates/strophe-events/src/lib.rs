#![forbid(unsafe_code)]

//! Event bus and payloads shared between the level controller and the rest
//! of the streaming client.

mod bus;
mod error;
mod event;
mod fragment;
mod level;
mod manifest;

pub use bus::EventBus;
pub use error::{ErrorDetails, ErrorEvent, ErrorKind};
pub use event::Event;
pub use fragment::{FragmentEvent, FragmentRef, FragmentStats};
pub use level::{LevelEvent, PlaylistDetails};
pub use manifest::{LevelDescriptor, LevelInfo, LoadStats, ManifestEvent};
