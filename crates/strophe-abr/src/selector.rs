#![forbid(unsafe_code)]

use crate::{BitrateLadder, SelectorFactors};

/// Pick the highest level the discounted bandwidth can sustain.
///
/// Scans levels in ascending bitrate order up to `cap` (or the top level when
/// uncapped) and returns the level just below the first one whose bitrate
/// exceeds the discounted bandwidth. Levels at or below `current` are judged
/// against `factors.down` of the bandwidth, levels above it against the
/// stricter `factors.up`. With no current level every candidate counts as an
/// up-switch.
///
/// Heuristic follows Android stagefright's `LiveSession` bandwidth pick.
pub fn select_auto_level<L: BitrateLadder + ?Sized>(
    ladder: &L,
    bandwidth_bps: f64,
    current: Option<usize>,
    cap: Option<usize>,
    factors: SelectorFactors,
) -> usize {
    let count = ladder.level_count();
    if count == 0 {
        return 0;
    }
    let max_level = cap.map_or(count - 1, |c| c.min(count - 1));

    for i in 0..=max_level {
        let factor = if current.is_some_and(|c| i <= c) {
            factors.down
        } else {
            factors.up
        };
        let Some(bitrate) = ladder.level_bitrate(i) else {
            return i.saturating_sub(1);
        };
        #[expect(clippy::cast_precision_loss)] // bitrate precision loss is negligible for ABR
        let required = bitrate as f64;
        if factor * bandwidth_bps < required {
            return i.saturating_sub(1);
        }
    }

    max_level
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn ladder() -> Vec<u64> {
        vec![200_000, 500_000, 1_000_000]
    }

    fn select(bw: f64, current: Option<usize>, cap: Option<usize>) -> usize {
        select_auto_level(&ladder(), bw, current, cap, SelectorFactors::default())
    }

    #[test]
    fn scenario_mid_level_holds_at_720k() {
        // i=0,1: 0.8 * 720k = 576k sustains both; i=2: 0.7 * 720k = 504k < 1M.
        assert_eq!(select(720_000.0, Some(1), None), 1);
    }

    #[rstest]
    #[case("zero_bandwidth", 0.0, None, None, 0)]
    #[case("below_floor", 100_000.0, Some(2), None, 0)]
    #[case("first_decision_uses_up_factor", 720_000.0, None, None, 1)]
    #[case("everything_affordable", 2_000_000.0, Some(0), None, 2)]
    #[case("cap_limits_pick", 2_000_000.0, Some(0), Some(1), 1)]
    #[case("cap_zero_is_not_uncapped", 2_000_000.0, None, Some(0), 0)]
    #[case("cap_beyond_ladder_is_clamped", 2_000_000.0, None, Some(9), 2)]
    fn selection_cases(
        #[case] _name: &str,
        #[case] bw: f64,
        #[case] current: Option<usize>,
        #[case] cap: Option<usize>,
        #[case] expected: usize,
    ) {
        assert_eq!(select(bw, current, cap), expected);
    }

    #[test]
    fn hysteresis_keeps_current_level_that_would_not_be_upswitched_to() {
        // 0.8 * 650k = 520k sustains 500k, 0.7 * 650k = 455k does not.
        assert_eq!(select(650_000.0, Some(1), None), 1);
        assert_eq!(select(650_000.0, Some(0), None), 0);
    }

    #[test]
    fn empty_ladder_selects_zero() {
        let empty: Vec<u64> = Vec::new();
        assert_eq!(
            select_auto_level(&empty, 1e9, None, None, SelectorFactors::default()),
            0
        );
    }

    #[test]
    fn custom_factors_are_applied() {
        let factors = SelectorFactors { down: 1.0, up: 1.0 };
        assert_eq!(select_auto_level(&ladder(), 1_000_000.0, None, None, factors), 2);
    }

    #[rstest]
    fn monotonic_in_bandwidth(
        #[values(None, Some(0), Some(1), Some(2))] current: Option<usize>,
        #[values(None, Some(0), Some(1), Some(2))] cap: Option<usize>,
    ) {
        let mut previous = 0;
        for step in 0..=200_u32 {
            let bw = f64::from(step) * 10_000.0;
            let selected = select(bw, current, cap);
            assert!(
                selected >= previous,
                "bw={bw} current={current:?} cap={cap:?}: {selected} < {previous}"
            );
            previous = selected;
        }
    }
}
