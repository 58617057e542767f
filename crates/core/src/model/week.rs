use serde::{Deserialize, Serialize};

use crate::model::ids::{UserId, WeekNumber};

/// Rounded completion percentage, half-up, clamped to `0..=100`.
///
/// Returns 0 when `total` is 0.
#[must_use]
pub fn completion_percentage(completed: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let completed = u64::from(completed.min(total));
    let total = u64::from(total);
    let rounded = (completed * 200 + total) / (total * 2);
    u8::try_from(rounded.min(100)).unwrap_or(100)
}

/// Stored aggregate of how much of a week a user has finished.
///
/// The percentage is derived from the counts on construction and cannot be set
/// directly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekProgress {
    user_id: UserId,
    week: WeekNumber,
    tasks_completed: u32,
    total_tasks: u32,
    completion_percentage: u8,
}

impl WeekProgress {
    #[must_use]
    pub fn new(user_id: UserId, week: WeekNumber, tasks_completed: u32, total_tasks: u32) -> Self {
        Self {
            user_id,
            week,
            tasks_completed,
            total_tasks,
            completion_percentage: completion_percentage(tasks_completed, total_tasks),
        }
    }

    /// Placeholder for a week the user has not touched yet.
    #[must_use]
    pub fn untouched(user_id: UserId, week: WeekNumber, total_tasks: u32) -> Self {
        Self::new(user_id, week, 0, total_tasks)
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn week(&self) -> WeekNumber {
        self.week
    }

    #[must_use]
    pub fn tasks_completed(&self) -> u32 {
        self.tasks_completed
    }

    #[must_use]
    pub fn total_tasks(&self) -> u32 {
        self.total_tasks
    }

    #[must_use]
    pub fn completion_percentage(&self) -> u8 {
        self.completion_percentage
    }

    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.completion_percentage == 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_matches_rounded_ratio_for_all_valid_counts() {
        for total in 1..=30_u32 {
            for completed in 0..=total {
                let expected = (f64::from(completed) / f64::from(total) * 100.0).round();
                assert_eq!(
                    f64::from(completion_percentage(completed, total)),
                    expected,
                    "{completed}/{total}"
                );
            }
        }
    }

    #[test]
    fn zero_total_is_zero_percent() {
        assert_eq!(completion_percentage(0, 0), 0);
        assert_eq!(completion_percentage(3, 0), 0);
    }

    #[test]
    fn over_reported_completion_is_clamped() {
        assert_eq!(completion_percentage(7, 5), 100);
    }

    #[test]
    fn half_rounds_up() {
        assert_eq!(completion_percentage(1, 8), 13);
        assert_eq!(completion_percentage(1, 3), 33);
        assert_eq!(completion_percentage(2, 3), 67);
    }
}
