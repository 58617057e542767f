use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::ids::{TaskId, TrackId, WeekNumber};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum CurriculumError {
    #[error("curriculum has no tracks")]
    NoTracks,

    #[error("track {0} is defined more than once")]
    DuplicateTrack(TrackId),

    #[error("week {0} is defined more than once")]
    DuplicateWeek(WeekNumber),

    #[error("week {week} defines task {task} more than once")]
    DuplicateTask { week: WeekNumber, task: TaskId },

    #[error("week {week} task {task} has no description")]
    EmptyTaskText { week: WeekNumber, task: TaskId },
}

/// A single checklist item in a week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub id: TaskId,
    pub text: String,
}

/// Static content for one curriculum week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeekDefinition {
    pub number: WeekNumber,
    pub title: String,
    pub phase: String,
    pub tasks: Vec<TaskDefinition>,
}

impl WeekDefinition {
    #[must_use]
    pub fn task(&self, id: &TaskId) -> Option<&TaskDefinition> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// Number of tasks defined for the week.
    #[must_use]
    pub fn total_tasks(&self) -> u32 {
        u32::try_from(self.tasks.len()).unwrap_or(u32::MAX)
    }
}

/// One of the parallel curricula, e.g. professional vs. personal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Track {
    pub id: TrackId,
    pub title: String,
    pub weeks: Vec<WeekDefinition>,
}

/// Validated curriculum content. Week numbers are unique across every track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Track>", into = "Vec<Track>")]
pub struct Curriculum {
    tracks: Vec<Track>,
}

impl Curriculum {
    /// Validates and builds a curriculum. Weeks are kept in ascending order per track.
    ///
    /// # Errors
    ///
    /// Returns `CurriculumError` for empty input, duplicate tracks/weeks/tasks,
    /// or blank task descriptions.
    pub fn new(mut tracks: Vec<Track>) -> Result<Self, CurriculumError> {
        if tracks.is_empty() {
            return Err(CurriculumError::NoTracks);
        }

        let mut track_ids = HashSet::new();
        let mut weeks = HashSet::new();
        for track in &mut tracks {
            if !track_ids.insert(track.id.clone()) {
                return Err(CurriculumError::DuplicateTrack(track.id.clone()));
            }
            track.weeks.sort_by_key(|w| w.number);
            for week in &track.weeks {
                if !weeks.insert(week.number) {
                    return Err(CurriculumError::DuplicateWeek(week.number));
                }
                let mut task_ids = HashSet::new();
                for task in &week.tasks {
                    if !task_ids.insert(&task.id) {
                        return Err(CurriculumError::DuplicateTask {
                            week: week.number,
                            task: task.id.clone(),
                        });
                    }
                    if task.text.trim().is_empty() {
                        return Err(CurriculumError::EmptyTaskText {
                            week: week.number,
                            task: task.id.clone(),
                        });
                    }
                }
            }
        }

        Ok(Self { tracks })
    }

    #[must_use]
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    #[must_use]
    pub fn track(&self, id: &TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| &t.id == id)
    }

    #[must_use]
    pub fn week(&self, number: WeekNumber) -> Option<&WeekDefinition> {
        self.tracks
            .iter()
            .flat_map(|t| t.weeks.iter())
            .find(|w| w.number == number)
    }

    /// Track that owns the given week.
    #[must_use]
    pub fn track_of(&self, number: WeekNumber) -> Option<&Track> {
        self.tracks
            .iter()
            .find(|t| t.weeks.iter().any(|w| w.number == number))
    }

    /// All weeks across tracks, in track order then week order.
    pub fn weeks(&self) -> impl Iterator<Item = &WeekDefinition> {
        self.tracks.iter().flat_map(|t| t.weeks.iter())
    }
}

impl TryFrom<Vec<Track>> for Curriculum {
    type Error = CurriculumError;

    fn try_from(value: Vec<Track>) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Curriculum> for Vec<Track> {
    fn from(value: Curriculum) -> Self {
        value.tracks
    }
}
