mod attempt;
mod checkin;
mod curriculum;
mod ids;
mod quiz;
mod submission;
mod task;
mod week;

pub use attempt::{AttemptError, AttemptPhase, QuizAttempt, QuizOutcome};
pub use checkin::{
    format_check_in_date, parse_check_in_date, CheckInError, DailyCheckIn, CHECK_IN_DATE_FORMAT,
};
pub use curriculum::{Curriculum, CurriculumError, TaskDefinition, Track, WeekDefinition};
pub use ids::{IdError, QuestionId, TaskId, TrackId, UserId, WeekNumber};
pub use quiz::{
    is_passing, QuizError, QuizQuestion, QuizSet, OPTIONS_PER_QUESTION, PASS_THRESHOLD,
    QUESTIONS_PER_CHECK,
};
pub use submission::{
    clamp_band_score, objective_match, Answer, GradedSubmission, PracticeQuestion, QuestionKind,
    Section, SectionProgress, SubmissionError, CORRECT_SCORE_THRESHOLD, MAX_BAND_SCORE,
};
pub use task::TaskRecord;
pub use week::{completion_percentage, WeekProgress};
