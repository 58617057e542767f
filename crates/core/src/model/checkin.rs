use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::UserId;

/// Storage format for check-in dates.
pub const CHECK_IN_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CheckInError {
    #[error("invalid check-in date: {0}")]
    InvalidDate(String),
}

/// Parses a `YYYY-MM-DD` date string.
///
/// # Errors
///
/// Returns `CheckInError::InvalidDate` if the string is not a calendar date.
pub fn parse_check_in_date(raw: &str) -> Result<NaiveDate, CheckInError> {
    NaiveDate::parse_from_str(raw.trim(), CHECK_IN_DATE_FORMAT)
        .map_err(|_| CheckInError::InvalidDate(raw.to_owned()))
}

#[must_use]
pub fn format_check_in_date(date: NaiveDate) -> String {
    date.format(CHECK_IN_DATE_FORMAT).to_string()
}

/// One daily check-in. At most one exists per user and calendar date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyCheckIn {
    user_id: UserId,
    date: NaiveDate,
    activities: Vec<String>,
    notes: String,
    streak_snapshot: u32,
    recorded_at: DateTime<Utc>,
}

impl DailyCheckIn {
    /// Builds a check-in, dropping blank activity entries.
    #[must_use]
    pub fn new(
        user_id: UserId,
        date: NaiveDate,
        activities: Vec<String>,
        notes: impl Into<String>,
        streak_snapshot: u32,
        recorded_at: DateTime<Utc>,
    ) -> Self {
        let activities = activities
            .into_iter()
            .map(|a| a.trim().to_owned())
            .filter(|a| !a.is_empty())
            .collect();
        Self {
            user_id,
            date,
            activities,
            notes: notes.into().trim().to_owned(),
            streak_snapshot,
            recorded_at,
        }
    }

    #[must_use]
    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    #[must_use]
    pub fn date(&self) -> NaiveDate {
        self.date
    }

    #[must_use]
    pub fn activities(&self) -> &[String] {
        &self.activities
    }

    #[must_use]
    pub fn notes(&self) -> &str {
        &self.notes
    }

    /// Current streak at the moment this check-in was recorded.
    #[must_use]
    pub fn streak_snapshot(&self) -> u32 {
        self.streak_snapshot
    }

    #[must_use]
    pub fn recorded_at(&self) -> DateTime<Utc> {
        self.recorded_at
    }
}
