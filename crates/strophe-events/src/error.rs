#![forbid(unsafe_code)]

use std::fmt;

use crate::FragmentRef;

/// Broad failure category.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Network,
    Media,
    Other,
}

/// Specific failure reported on the bus.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorDetails {
    ManifestLoadError,
    ManifestLoadTimeout,
    ManifestParsingError,
    LevelLoadError,
    LevelLoadTimeout,
    LevelSwitchError,
    FragLoadError,
    FragLoadTimeout,
    FragLoopLoadingError,
    FragParsingError,
}

impl ErrorDetails {
    /// Failure tied to a fragment; the affected level is `frag.level`.
    pub fn is_fragment_scoped(self) -> bool {
        matches!(
            self,
            Self::FragLoadError | Self::FragLoadTimeout | Self::FragLoopLoadingError
        )
    }

    /// Failure tied to a level playlist; the affected level is `level`.
    pub fn is_level_scoped(self) -> bool {
        matches!(self, Self::LevelLoadError | Self::LevelLoadTimeout)
    }

    pub fn kind(self) -> ErrorKind {
        match self {
            Self::ManifestLoadError
            | Self::ManifestLoadTimeout
            | Self::LevelLoadError
            | Self::LevelLoadTimeout
            | Self::FragLoadError
            | Self::FragLoadTimeout
            | Self::FragLoopLoadingError => ErrorKind::Network,
            Self::ManifestParsingError | Self::FragParsingError => ErrorKind::Media,
            Self::LevelSwitchError => ErrorKind::Other,
        }
    }
}

impl fmt::Display for ErrorDetails {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ManifestLoadError => "manifestLoadError",
            Self::ManifestLoadTimeout => "manifestLoadTimeOut",
            Self::ManifestParsingError => "manifestParsingError",
            Self::LevelLoadError => "levelLoadError",
            Self::LevelLoadTimeout => "levelLoadTimeOut",
            Self::LevelSwitchError => "levelSwitchError",
            Self::FragLoadError => "fragLoadError",
            Self::FragLoadTimeout => "fragLoadTimeOut",
            Self::FragLoopLoadingError => "fragLoopLoadingError",
            Self::FragParsingError => "fragParsingError",
        };
        f.write_str(s)
    }
}

/// Load or switch failure.
///
/// `fatal = true` means the failure could not be absorbed and playback
/// should stop.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorEvent {
    pub kind: ErrorKind,
    pub details: ErrorDetails,
    pub level: Option<usize>,
    pub frag: Option<FragmentRef>,
    pub fatal: bool,
    pub reason: Option<String>,
}

impl ErrorEvent {
    pub fn new(details: ErrorDetails) -> Self {
        Self {
            kind: details.kind(),
            details,
            level: None,
            frag: None,
            fatal: false,
            reason: None,
        }
    }

    pub fn fragment(details: ErrorDetails, frag: FragmentRef) -> Self {
        Self {
            frag: Some(frag),
            ..Self::new(details)
        }
    }

    pub fn level(details: ErrorDetails, level: usize) -> Self {
        Self {
            level: Some(level),
            ..Self::new(details)
        }
    }

    pub fn with_fatal(mut self, fatal: bool) -> Self {
        self.fatal = fatal;
        self
    }

    pub fn with_reason<S: Into<String>>(mut self, reason: S) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Level the failure applies to, if it is fragment or level scoped.
    pub fn affected_level(&self) -> Option<usize> {
        if self.details.is_fragment_scoped() {
            self.frag.map(|f| f.level)
        } else if self.details.is_level_scoped() {
            self.level
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    const FRAG: FragmentRef = FragmentRef { level: 2, sn: 7 };

    #[rstest]
    #[case(ErrorEvent::fragment(ErrorDetails::FragLoadError, FRAG), Some(2))]
    #[case(ErrorEvent::fragment(ErrorDetails::FragLoadTimeout, FRAG), Some(2))]
    #[case(ErrorEvent::fragment(ErrorDetails::FragLoopLoadingError, FRAG), Some(2))]
    #[case(ErrorEvent::level(ErrorDetails::LevelLoadError, 1), Some(1))]
    #[case(ErrorEvent::level(ErrorDetails::LevelLoadTimeout, 0), Some(0))]
    #[case(ErrorEvent::level(ErrorDetails::LevelSwitchError, 4), None)]
    #[case(ErrorEvent::new(ErrorDetails::ManifestLoadError), None)]
    #[case(ErrorEvent::fragment(ErrorDetails::FragParsingError, FRAG), None)]
    fn affected_level_by_details(#[case] event: ErrorEvent, #[case] expected: Option<usize>) {
        assert_eq!(event.affected_level(), expected);
    }

    #[test]
    fn fragment_scoped_without_frag_has_no_level() {
        let event = ErrorEvent::new(ErrorDetails::FragLoadError).with_fatal(false);
        assert_eq!(event.affected_level(), None);
    }

    #[test]
    fn switch_error_is_other_kind() {
        let event = ErrorEvent::level(ErrorDetails::LevelSwitchError, 9).with_reason("invalid level idx");
        assert_eq!(event.kind, ErrorKind::Other);
        assert_eq!(event.reason.as_deref(), Some("invalid level idx"));
        assert!(!event.fatal);
    }
}
