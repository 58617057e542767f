use std::collections::HashSet;

use chrono::{Duration, NaiveDate};
use serde::Serialize;

/// Number of days, ending today, scanned for streaks.
pub const STREAK_WINDOW_DAYS: i64 = 365;

/// Current and longest run of consecutive check-in days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct StreakSummary {
    pub current: u32,
    pub longest: u32,
    pub checked_in_today: bool,
}

/// Oldest date inside the streak window that ends on `today`.
#[must_use]
pub fn window_start(today: NaiveDate) -> NaiveDate {
    today - Duration::days(STREAK_WINDOW_DAYS - 1)
}

/// Derive streaks from check-in dates in any order.
///
/// Walks the window from today backwards. The current streak counts days from
/// today until the first gap; a missing check-in today makes it 0. The longest
/// streak is the longest run anywhere in the window. Dates outside the window
/// (including future dates) are ignored.
#[must_use]
pub fn compute_streak<I>(dates: I, today: NaiveDate) -> StreakSummary
where
    I: IntoIterator<Item = NaiveDate>,
{
    let start = window_start(today);
    let days: HashSet<NaiveDate> = dates
        .into_iter()
        .filter(|d| *d >= start && *d <= today)
        .collect();

    let mut summary = StreakSummary {
        checked_in_today: days.contains(&today),
        ..StreakSummary::default()
    };
    if days.is_empty() {
        return summary;
    }

    let mut counting_current = true;
    let mut run = 0_u32;
    for offset in 0..STREAK_WINDOW_DAYS {
        let day = today - Duration::days(offset);
        if days.contains(&day) {
            run += 1;
            summary.longest = summary.longest.max(run);
            if counting_current {
                summary.current += 1;
            }
        } else {
            run = 0;
            counting_current = false;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    fn days_ago(offsets: &[i64]) -> Vec<NaiveDate> {
        offsets.iter().map(|o| today() - Duration::days(*o)).collect()
    }

    #[test]
    fn empty_log_has_no_streak() {
        assert_eq!(compute_streak(Vec::new(), today()), StreakSummary::default());
    }

    #[test]
    fn only_today_is_a_streak_of_one() {
        let s = compute_streak(days_ago(&[0]), today());
        assert_eq!((s.current, s.longest, s.checked_in_today), (1, 1, true));
    }

    #[test]
    fn last_k_consecutive_days_give_k() {
        for k in 1..=30 {
            let offsets: Vec<i64> = (0..k).collect();
            let s = compute_streak(days_ago(&offsets), today());
            assert_eq!(s.current, u32::try_from(k).unwrap());
            assert_eq!(s.longest, u32::try_from(k).unwrap());
        }
    }

    #[test]
    fn isolated_past_check_in_counts_only_toward_longest() {
        let s = compute_streak(days_ago(&[10]), today());
        assert_eq!((s.current, s.longest, s.checked_in_today), (0, 1, false));
    }

    #[test]
    fn gap_stops_current_streak() {
        let s = compute_streak(days_ago(&[0, 1, 3]), today());
        assert_eq!((s.current, s.longest), (2, 2));
    }

    #[test]
    fn longest_run_can_be_in_the_past() {
        let s = compute_streak(days_ago(&[0, 5, 6, 7, 8, 20]), today());
        assert_eq!((s.current, s.longest), (1, 4));
    }

    #[test]
    fn order_and_duplicates_do_not_matter() {
        let s = compute_streak(days_ago(&[2, 0, 1, 1, 0]), today());
        assert_eq!((s.current, s.longest), (3, 3));
    }

    #[test]
    fn dates_outside_window_are_ignored() {
        let s = compute_streak(days_ago(&[-1, 365, 366]), today());
        assert_eq!(s, StreakSummary::default());
        let edge = compute_streak(days_ago(&[364]), today());
        assert_eq!(edge.longest, 1);
    }
}
