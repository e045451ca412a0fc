//! Moving nominal cut points into nearby silence.

use crate::planner::types::SilenceInterval;
use std::time::Duration;

/// Tolerance band around a nominal cut.
///
/// A silence qualifies when its start lies strictly between `min` and `max`
/// away from the nominal point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapWindow {
    pub min: Duration,
    pub max: Duration,
}

impl SnapWindow {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    /// Negative seconds count as zero; values past `Duration::MAX` saturate.
    pub fn from_secs_f64(min: f64, max: f64) -> Self {
        let secs = |s: f64| Duration::try_from_secs_f64(s.max(0.0)).unwrap_or(Duration::MAX);
        Self::new(secs(min), secs(max))
    }

    fn admits(&self, distance: Duration) -> bool {
        self.min < distance && distance < self.max
    }
}

/// Finds the silence-aligned cut closest to `nominal`.
///
/// Returns the midpoint of the qualifying silence whose start is nearest to
/// `nominal`, or `None` when nothing falls inside the window. When two
/// silences are equally far away the earlier one wins. A silence whose
/// midpoint would land `max` or further from `nominal` is skipped, so the
/// result always stays inside `(nominal - max, nominal + max)`.
pub fn aligned_cut(
    nominal: Duration,
    silences: &[SilenceInterval],
    window: SnapWindow,
) -> Option<Duration> {
    let mut best: Option<(Duration, Duration)> = None;

    for silence in silences {
        let distance = silence.start.abs_diff(nominal);
        if !window.admits(distance) {
            continue;
        }
        let cut = silence.midpoint();
        if cut.abs_diff(nominal) >= window.max {
            continue;
        }
        if best.is_none_or(|(best_distance, _)| distance < best_distance) {
            best = Some((distance, cut));
        }
    }

    best.map(|(_, cut)| cut)
}

/// Cut point for `nominal`: aligned when possible, otherwise `nominal` itself.
pub fn snap(nominal: Duration, silences: &[SilenceInterval], window: SnapWindow) -> Duration {
    aligned_cut(nominal, silences, window).unwrap_or(nominal)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn silence(start: f64, duration: f64) -> SilenceInterval {
        SilenceInterval::new(
            Duration::from_secs_f64(start),
            Duration::from_secs_f64(start + duration),
            Duration::from_secs_f64(duration),
        )
    }

    fn window() -> SnapWindow {
        SnapWindow::from_secs_f64(0.1, 5.0)
    }

    #[test]
    fn test_window_from_secs_clamps_and_saturates() {
        let window = SnapWindow::from_secs_f64(-1.0, 1e30);
        assert_eq!(window.min, Duration::ZERO);
        assert_eq!(window.max, Duration::MAX);
    }

    #[test]
    fn test_snaps_to_middle_of_nearby_silence() {
        let silences = [silence(598.0, 1.0)];
        let cut = snap(Duration::from_secs(600), &silences, window());
        assert_eq!(cut, Duration::from_millis(598_500));
    }

    #[test]
    fn test_no_candidate_returns_nominal() {
        let silences = [silence(100.0, 1.0), silence(700.0, 2.0)];
        let nominal = Duration::from_secs(600);
        assert_eq!(aligned_cut(nominal, &silences, window()), None);
        assert_eq!(snap(nominal, &silences, window()), nominal);
    }

    #[test]
    fn test_empty_silence_list_returns_nominal() {
        let nominal = Duration::from_secs(42);
        assert_eq!(snap(nominal, &[], window()), nominal);
    }

    #[test]
    fn test_silence_too_close_is_ignored() {
        // Starts 0.05s away, inside the minimum tolerance.
        let silences = [silence(600.05, 1.0)];
        assert_eq!(aligned_cut(Duration::from_secs(600), &silences, window()), None);
    }

    #[test]
    fn test_picks_closest_candidate() {
        let silences = [silence(596.0, 1.0), silence(601.0, 0.4), silence(603.0, 0.2)];
        let cut = snap(Duration::from_secs(600), &silences, window());
        assert_eq!(cut, Duration::from_millis(601_200));
    }

    #[test]
    fn test_equidistant_candidates_prefer_earlier() {
        let silences = [silence(598.0, 1.0), silence(602.0, 1.0)];
        let cut = snap(Duration::from_secs(600), &silences, window());
        assert_eq!(cut, Duration::from_millis(598_500));
    }

    #[test]
    fn test_long_silence_whose_midpoint_leaves_window_is_skipped() {
        // Start is 4s after nominal but the midpoint would be 9s after.
        let silences = [silence(604.0, 10.0)];
        assert_eq!(aligned_cut(Duration::from_secs(600), &silences, window()), None);
    }

    #[test]
    fn test_result_always_inside_window() {
        let nominal = Duration::from_secs(1_000);
        let silences: Vec<_> = (0..200)
            .map(|i| silence(990.0 + i as f64 * 0.1, 0.05 + (i % 7) as f64 * 0.7))
            .collect();
        let window = window();

        for shift in 0..40 {
            let nominal = nominal + Duration::from_millis(shift * 250);
            let cut = snap(nominal, &silences, window);
            assert!(
                cut.abs_diff(nominal) < window.max,
                "cut {:?} too far from {:?}",
                cut,
                nominal
            );
        }
    }
}
