use std::collections::HashSet;
use std::sync::Arc;

use chrono::NaiveDate;
use serde::Serialize;
use storage::repository::CheckInRepository;
use tracker_core::model::{DailyCheckIn, UserId};
use tracker_core::streak::window_start;
use tracker_core::{Clock, StreakSummary, compute_streak};

use crate::error::CheckInServiceError;

/// One cell of the streak calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub checked_in: bool,
}

/// Records daily check-ins and derives streaks.
#[derive(Clone)]
pub struct CheckInService {
    clock: Clock,
    check_ins: Arc<dyn CheckInRepository>,
}

impl CheckInService {
    #[must_use]
    pub fn new(clock: Clock, check_ins: Arc<dyn CheckInRepository>) -> Self {
        Self { clock, check_ins }
    }

    /// Record today's check-in. A second check-in on the same day replaces the first.
    ///
    /// The stored streak snapshot includes today.
    ///
    /// # Errors
    ///
    /// Returns `CheckInServiceError::Storage` if repository access fails.
    pub async fn check_in(
        &self,
        user: &UserId,
        activities: Vec<String>,
        notes: &str,
    ) -> Result<DailyCheckIn, CheckInServiceError> {
        let now = self.clock.now();
        let today = now.date_naive();

        let mut dates = self
            .check_ins
            .check_in_dates_since(user, window_start(today))
            .await?;
        dates.push(today);
        let summary = compute_streak(dates, today);

        let check_in =
            DailyCheckIn::new(user.clone(), today, activities, notes, summary.current, now);
        self.check_ins.upsert_check_in(&check_in).await?;
        tracing::info!(
            user = %user,
            date = %today,
            streak = summary.current,
            activities = check_in.activities().len(),
            "check-in recorded"
        );
        Ok(check_in)
    }

    /// Current and longest streak over the trailing year.
    ///
    /// # Errors
    ///
    /// Returns `CheckInServiceError::Storage` if repository access fails.
    pub async fn streak(&self, user: &UserId) -> Result<StreakSummary, CheckInServiceError> {
        let today = self.clock.today();
        let dates = self
            .check_ins
            .check_in_dates_since(user, window_start(today))
            .await?;
        Ok(compute_streak(dates, today))
    }

    /// Today's check-in, if one was recorded.
    ///
    /// # Errors
    ///
    /// Returns `CheckInServiceError::Storage` if repository access fails.
    pub async fn today(&self, user: &UserId) -> Result<Option<DailyCheckIn>, CheckInServiceError> {
        Ok(self.check_ins.get_check_in(user, self.clock.today()).await?)
    }

    /// Every day of a calendar month with its check-in flag.
    ///
    /// # Errors
    ///
    /// Returns `CheckInServiceError::InvalidMonth` for a month outside 1..=12
    /// and `CheckInServiceError::Storage` if repository access fails.
    pub async fn calendar(
        &self,
        user: &UserId,
        year: i32,
        month: u32,
    ) -> Result<Vec<CalendarDay>, CheckInServiceError> {
        let invalid = || CheckInServiceError::InvalidMonth { year, month };
        let first = NaiveDate::from_ymd_opt(year, month, 1).ok_or_else(invalid)?;
        let next = if month == 12 {
            NaiveDate::from_ymd_opt(year + 1, 1, 1)
        } else {
            NaiveDate::from_ymd_opt(year, month + 1, 1)
        }
        .ok_or_else(invalid)?;

        let checked: HashSet<NaiveDate> = self
            .check_ins
            .check_in_dates_since(user, first)
            .await?
            .into_iter()
            .filter(|d| *d < next)
            .collect();

        Ok(first
            .iter_days()
            .take_while(|d| *d < next)
            .map(|date| CalendarDay {
                date,
                checked_in: checked.contains(&date),
            })
            .collect())
    }
}
