#![forbid(unsafe_code)]


use std::time::Duration;

use fixture::{Session, options};
use rstest::rstest;
use strophe_abr::{LevelError, LevelOptions};
use strophe_events::{
    ErrorDetails, ErrorEvent, Event, FragmentRef, LevelEvent, PlaylistDetails,
};

fn is_fatal_error(event: &Event) -> bool {
    matches!(event, Event::Error(ErrorEvent { fatal: true, .. }))
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn fragment_error_fails_over_to_mirror(options: LevelOptions) {
    let mut session = Session::start(options);
    session.load_manifest().await;
    session.controller.set_level(2).unwrap();
    session.bus.publish(LevelEvent::Loaded {
        level: 2,
        details: PlaylistDetails::vod(Duration::from_secs(6)),
    });
    session.settle().await;

    session.bus.publish(ErrorEvent::fragment(
        ErrorDetails::FragLoadError,
        FragmentRef { level: 2, sn: 4 },
    ));
    session.settle().await;

    let levels = session.controller.levels();
    let level = levels.get(2).unwrap();
    assert_eq!(level.url_id(), 1);
    assert!(level.details().is_none());
    assert_eq!(session.controller.level(), Some(2));
    assert!(session.drain().iter().all(|e| !is_fatal_error(e)));

    // Re-evaluating the same level refetches its playlist from the mirror.
    session.controller.set_level(2).unwrap();
    let events = session.drain();
    let Some(Event::Level(LevelEvent::Loading { url, url_id: 1, .. })) = events.last() else {
        panic!("expected mirror reload, got {events:?}");
    };
    assert_eq!(url.host_str(), Some("cdn-b.example.com"));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn level_error_above_floor_downgrades_in_auto_mode(options: LevelOptions) {
    let mut session = Session::start(options);
    session.load_manifest().await;
    session.controller.set_level(1).unwrap();

    session
        .bus
        .publish(ErrorEvent::level(ErrorDetails::LevelLoadTimeout, 1));
    session.settle().await;

    assert_eq!(session.controller.level(), Some(1));
    assert!(session.controller.last_bandwidth_bps().abs() < f64::EPSILON);
    assert_eq!(session.controller.next_load_level(), 0);
    assert!(session.drain().iter().all(|e| !is_fatal_error(e)));
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn floor_level_error_escalates_as_fatal(options: LevelOptions) {
    let mut session = Session::start(options);
    session.load_manifest().await;
    session.controller.set_level(0).unwrap();
    session.bus.publish(LevelEvent::Loaded {
        level: 0,
        details: PlaylistDetails::live(Duration::from_secs(4)),
    });
    session.settle().await;
    assert!(session.controller.is_reload_armed());

    session
        .bus
        .publish(ErrorEvent::level(ErrorDetails::LevelLoadError, 0));

    let fatal = session.expect(is_fatal_error).await;
    let Event::Error(error) = fatal else {
        unreachable!();
    };
    assert_eq!(error.details, ErrorDetails::LevelLoadError);
    assert_eq!(error.level, Some(0));

    assert_eq!(session.controller.level(), None);
    assert!(!session.controller.is_reload_armed());

    // No reload fires after the escalation, and it is escalated exactly once.
    tokio::time::sleep(Duration::from_secs(30)).await;
    let later = session.drain();
    assert!(later.iter().all(|e| !is_fatal_error(e)));
    assert!(
        later
            .iter()
            .all(|e| !matches!(e, Event::Level(LevelEvent::Loading { .. })))
    );
}

#[rstest]
#[tokio::test(start_paused = true)]
async fn manual_mode_error_without_mirror_is_fatal(options: LevelOptions) {
    let mut session = Session::start(options);
    session.load_manifest().await;
    session.controller.set_manual_level(Some(1)).unwrap();
    assert_eq!(session.controller.manual_level(), Some(1));

    session.bus.publish(ErrorEvent::fragment(
        ErrorDetails::FragLoadTimeout,
        FragmentRef { level: 1, sn: 9 },
    ));

    session.expect(is_fatal_error).await;
    assert_eq!(session.controller.level(), None);
}

#[rstest]
#[case(3)]
#[case(17)]
#[tokio::test(start_paused = true)]
async fn out_of_range_manual_switch_is_rejected(options: LevelOptions, #[case] level: usize) {
    let mut session = Session::start(options);
    session.load_manifest().await;
    session.controller.set_level(1).unwrap();
    session.drain();

    assert_eq!(
        session.controller.set_manual_level(Some(level)),
        Err(LevelError::InvalidLevel { level, count: 3 })
    );

    assert_eq!(session.controller.level(), Some(1));
    let events = session.drain();
    assert!(matches!(
        events.as_slice(),
        [Event::Error(ErrorEvent {
            details: ErrorDetails::LevelSwitchError,
            fatal: false,
            ..
        })]
    ));
}
