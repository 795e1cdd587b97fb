#![forbid(unsafe_code)]

use thiserror::Error;

/// Level controller errors.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum LevelError {
    #[error("Manifest contains no levels")]
    EmptyManifest,

    #[error("Invalid level index {level} ({count} levels available)")]
    InvalidLevel { level: usize, count: usize },
}

pub type LevelResult<T> = Result<T, LevelError>;
