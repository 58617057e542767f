use std::path::Path;

use tracker_core::model::{Curriculum, Track, WeekDefinition, WeekNumber};

use crate::error::CurriculumLoadError;

/// Read-only curriculum content consumed by the progress and completion services.
pub trait CurriculumSource: Send + Sync {
    fn week(&self, number: WeekNumber) -> Option<&WeekDefinition>;

    fn track_of(&self, number: WeekNumber) -> Option<&Track>;

    fn tracks(&self) -> &[Track];
}

impl CurriculumSource for Curriculum {
    fn week(&self, number: WeekNumber) -> Option<&WeekDefinition> {
        Curriculum::week(self, number)
    }

    fn track_of(&self, number: WeekNumber) -> Option<&Track> {
        Curriculum::track_of(self, number)
    }

    fn tracks(&self) -> &[Track] {
        Curriculum::tracks(self)
    }
}

/// Parse and validate curriculum JSON (an array of tracks).
///
/// # Errors
///
/// Returns `CurriculumLoadError::Parse` for malformed JSON and
/// `CurriculumLoadError::Invalid` when validation fails.
pub fn parse_curriculum(raw: &str) -> Result<Curriculum, CurriculumLoadError> {
    let tracks: Vec<Track> = serde_json::from_str(raw)?;
    Ok(Curriculum::new(tracks)?)
}

/// Load curriculum JSON from disk.
///
/// # Errors
///
/// Returns `CurriculumLoadError::Io` if the file cannot be read, otherwise
/// see [`parse_curriculum`].
pub fn load_curriculum(path: impl AsRef<Path>) -> Result<Curriculum, CurriculumLoadError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path)?;
    let curriculum = parse_curriculum(&raw)?;
    tracing::debug!(path = %path.display(), tracks = curriculum.tracks().len(), "loaded curriculum");
    Ok(curriculum)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"[
        {"id": "pro", "title": "Professional", "weeks": [
            {"number": 2, "title": "B", "phase": "Foundations", "tasks": [
                {"id": "2-1", "text": "Second week task"}
            ]},
            {"number": 1, "title": "A", "phase": "Foundations", "tasks": [
                {"id": "1-1", "text": "Read the guide"},
                {"id": "1-2", "text": "Write notes"}
            ]}
        ]}
    ]"#;

    #[test]
    fn parses_and_sorts_weeks() {
        let curriculum = parse_curriculum(SAMPLE).unwrap();
        let numbers: Vec<u32> = curriculum.weeks().map(|w| w.number.value()).collect();
        assert_eq!(numbers, [1, 2]);

        let source: &dyn CurriculumSource = &curriculum;
        let week = source.week(WeekNumber::new(1).unwrap()).unwrap();
        assert_eq!(week.total_tasks(), 2);
        assert_eq!(source.track_of(week.number).unwrap().id.as_str(), "pro");
    }

    #[test]
    fn rejects_invalid_content() {
        let blank = SAMPLE.replace("Write notes", "  ");
        assert!(matches!(
            parse_curriculum(&blank),
            Err(CurriculumLoadError::Invalid(_))
        ));
        assert!(matches!(
            parse_curriculum("{"),
            Err(CurriculumLoadError::Parse(_))
        ));
    }
}
