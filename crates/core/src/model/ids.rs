use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum IdError {
    #[error("{kind} cannot be empty")]
    Empty { kind: &'static str },

    #[error("week number must be >= 1")]
    InvalidWeek,
}

fn non_empty(kind: &'static str, raw: impl Into<String>) -> Result<String, IdError> {
    let raw = raw.into();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(IdError::Empty { kind });
    }
    Ok(trimmed.to_owned())
}

/// Identifier issued by the auth provider for a learner.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
    /// Creates a new `UserId`.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Empty` if the id is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        non_empty("user id", raw).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a curriculum task, unique within its week (e.g. `"1-1"`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaskId(String);

impl TaskId {
    /// Creates a new `TaskId`.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Empty` if the id is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        non_empty("task id", raw).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Identifier of a practice question in the graded track.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct QuestionId(String);

impl QuestionId {
    /// Creates a new `QuestionId`.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Empty` if the id is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        non_empty("question id", raw).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Slug of a curriculum track (e.g. `"professional"`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TrackId(String);

impl TrackId {
    /// Creates a new `TrackId`.
    ///
    /// # Errors
    ///
    /// Returns `IdError::Empty` if the slug is blank.
    pub fn new(raw: impl Into<String>) -> Result<Self, IdError> {
        non_empty("track id", raw).map(Self)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One-based week number. Numbering is disjoint across tracks.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct WeekNumber(u32);

impl WeekNumber {
    /// Creates a new `WeekNumber`.
    ///
    /// # Errors
    ///
    /// Returns `IdError::InvalidWeek` for week 0.
    pub fn new(value: u32) -> Result<Self, IdError> {
        if value == 0 {
            return Err(IdError::InvalidWeek);
        }
        Ok(Self(value))
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.0
    }
}

macro_rules! string_id_impls {
    ($($ty:ident),*) => {
        $(
            impl TryFrom<String> for $ty {
                type Error = IdError;

                fn try_from(value: String) -> Result<Self, Self::Error> {
                    Self::new(value)
                }
            }

            impl From<$ty> for String {
                fn from(value: $ty) -> Self {
                    value.0
                }
            }

            impl fmt::Debug for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    write!(f, "{}({:?})", stringify!($ty), self.0)
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }
        )*
    };
}

string_id_impls!(UserId, TaskId, QuestionId, TrackId);

impl TryFrom<u32> for WeekNumber {
    type Error = IdError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<WeekNumber> for u32 {
    fn from(value: WeekNumber) -> Self {
        value.0
    }
}

impl fmt::Debug for WeekNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WeekNumber({})", self.0)
    }
}

impl fmt::Display for WeekNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_trimmed_and_non_empty() {
        assert_eq!(TaskId::new("  1-1 ").unwrap().as_str(), "1-1");
        assert_eq!(
            UserId::new("   ").unwrap_err(),
            IdError::Empty { kind: "user id" }
        );
    }

    #[test]
    fn week_zero_is_rejected() {
        assert_eq!(WeekNumber::new(0).unwrap_err(), IdError::InvalidWeek);
        assert_eq!(WeekNumber::new(3).unwrap().value(), 3);
    }

    #[test]
    fn deserialize_validates() {
        let bad: Result<TaskId, _> = serde_json::from_str("\"\"");
        assert!(bad.is_err());
        let week: WeekNumber = serde_json::from_str("2").unwrap();
        assert_eq!(week.value(), 2);
    }
}
