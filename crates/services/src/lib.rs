#![forbid(unsafe_code)]

pub mod app_services;
pub mod assessment_service;
pub mod attempts;
pub mod checkin_service;
pub mod completion_gate;
pub mod curriculum;
pub mod error;
pub mod grading;
pub mod llm;
pub mod progress_service;

pub use tracker_core::Clock;

pub use app_services::AppServices;
pub use assessment_service::AssessmentService;
pub use attempts::{AttemptSessions, attempt_ttl_from_env};
pub use checkin_service::{CalendarDay, CheckInService};
pub use completion_gate::{
    AttemptView, CompletionGate, CompletionStep, FinishResult, QuestionView, ToggleResult,
};
pub use curriculum::{CurriculumSource, load_curriculum, parse_curriculum};
pub use error::{
    AppServicesError, CheckInServiceError, CurriculumLoadError, GateError, GradingError,
    LlmError, ProgressError,
};
pub use grading::{FALLBACK_FEEDBACK, FALLBACK_SCORE, GradingService};
pub use llm::{LanguageModel, LlmConfig, LlmOutcome, OpenAiClient, StructuredRequest};
pub use progress_service::ProgressService;
