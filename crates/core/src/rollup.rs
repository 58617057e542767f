use serde::Serialize;

use crate::model::{WeekDefinition, WeekProgress};

/// Derived statistics over a run of weeks. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressRollup {
    pub weeks: Vec<WeekProgress>,
    /// Unweighted mean of the week percentages.
    pub overall_completion: u8,
    /// Weeks at exactly 100%.
    pub weeks_completed: usize,
    /// Phase of the first unfinished week, or of the last week when all are done.
    pub current_phase: Option<String>,
}

/// Roll per-week progress up, in curriculum order.
#[must_use]
pub fn rollup(weeks: Vec<(&WeekDefinition, WeekProgress)>) -> ProgressRollup {
    let count = weeks.len() as u64;
    let sum: u64 = weeks
        .iter()
        .map(|(_, p)| u64::from(p.completion_percentage()))
        .sum();
    let overall_completion = if count == 0 {
        0
    } else {
        u8::try_from((sum * 2 + count) / (count * 2)).unwrap_or(100)
    };

    let weeks_completed = weeks.iter().filter(|(_, p)| p.is_complete()).count();
    let current_phase = weeks
        .iter()
        .find(|(_, p)| !p.is_complete())
        .or_else(|| weeks.last())
        .map(|(def, _)| def.phase.clone());

    ProgressRollup {
        weeks: weeks.into_iter().map(|(_, p)| p).collect(),
        overall_completion,
        weeks_completed,
        current_phase,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{TaskDefinition, TaskId, UserId, WeekNumber};

    fn def(number: u32, phase: &str) -> WeekDefinition {
        WeekDefinition {
            number: WeekNumber::new(number).unwrap(),
            title: String::new(),
            phase: phase.into(),
            tasks: vec![TaskDefinition {
                id: TaskId::new(format!("{number}-1")).unwrap(),
                text: "t".into(),
            }],
        }
    }

    fn progress(number: u32, done: u32, total: u32) -> WeekProgress {
        WeekProgress::new(
            UserId::new("u").unwrap(),
            WeekNumber::new(number).unwrap(),
            done,
            total,
        )
    }

    #[test]
    fn mean_is_unweighted_by_task_count() {
        let (w1, w2) = (def(1, "Foundations"), def(2, "Build"));
        let r = rollup(vec![(&w1, progress(1, 1, 1)), (&w2, progress(2, 1, 10))]);
        assert_eq!(r.overall_completion, 55);
        assert_eq!(r.weeks_completed, 1);
        assert_eq!(r.current_phase.as_deref(), Some("Build"));
    }

    #[test]
    fn all_complete_reports_last_phase() {
        let (w1, w2) = (def(1, "Foundations"), def(2, "Ship"));
        let r = rollup(vec![(&w1, progress(1, 2, 2)), (&w2, progress(2, 4, 4))]);
        assert_eq!(r.overall_completion, 100);
        assert_eq!(r.weeks_completed, 2);
        assert_eq!(r.current_phase.as_deref(), Some("Ship"));
    }

    #[test]
    fn empty_rollup() {
        let r = rollup(Vec::new());
        assert_eq!(r.overall_completion, 0);
        assert_eq!(r.weeks_completed, 0);
        assert_eq!(r.current_phase, None);
    }
}
