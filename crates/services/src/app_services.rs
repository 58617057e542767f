use std::path::Path;
use std::sync::Arc;

use chrono::Duration;
use storage::repository::Storage;
use tracker_core::model::Curriculum;

use crate::Clock;
use crate::assessment_service::AssessmentService;
use crate::attempts::AttemptSessions;
use crate::checkin_service::CheckInService;
use crate::completion_gate::CompletionGate;
use crate::curriculum::{CurriculumSource, load_curriculum};
use crate::error::AppServicesError;
use crate::grading::GradingService;
use crate::llm::LanguageModel;
use crate::progress_service::ProgressService;

/// Wires every service over one storage backend, curriculum and model.
#[derive(Clone)]
pub struct AppServices {
    curriculum: Arc<Curriculum>,
    progress: Arc<ProgressService>,
    completion: Arc<CompletionGate>,
    check_ins: Arc<CheckInService>,
    grading: Arc<GradingService>,
}

impl AppServices {
    #[must_use]
    pub fn new(
        storage: &Storage,
        clock: Clock,
        curriculum: Curriculum,
        model: Arc<dyn LanguageModel>,
        attempt_ttl: Duration,
    ) -> Self {
        let curriculum = Arc::new(curriculum);
        let source: Arc<dyn CurriculumSource> = curriculum.clone();

        let progress = Arc::new(ProgressService::new(
            source,
            Arc::clone(&storage.tasks),
            Arc::clone(&storage.weeks),
        ));
        let completion = Arc::new(CompletionGate::new(
            clock,
            Arc::clone(&storage.tasks),
            Arc::clone(&progress),
            Arc::new(AssessmentService::new(Arc::clone(&model))),
            Arc::new(AttemptSessions::new(attempt_ttl)),
        ));
        let check_ins = Arc::new(CheckInService::new(clock, Arc::clone(&storage.check_ins)));
        let grading = Arc::new(GradingService::new(
            clock,
            model,
            Arc::clone(&storage.submissions),
        ));

        Self {
            curriculum,
            progress,
            completion,
            check_ins,
            grading,
        }
    }

    /// Build services backed by `SQLite` storage and a curriculum file.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization or curriculum loading fails.
    pub async fn new_sqlite(
        db_url: &str,
        curriculum_path: impl AsRef<Path>,
        clock: Clock,
        model: Arc<dyn LanguageModel>,
        attempt_ttl: Duration,
    ) -> Result<Self, AppServicesError> {
        let curriculum = load_curriculum(curriculum_path)?;
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(&storage, clock, curriculum, model, attempt_ttl))
    }

    #[must_use]
    pub fn curriculum(&self) -> &Curriculum {
        &self.curriculum
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn completion(&self) -> Arc<CompletionGate> {
        Arc::clone(&self.completion)
    }

    #[must_use]
    pub fn check_ins(&self) -> Arc<CheckInService> {
        Arc::clone(&self.check_ins)
    }

    #[must_use]
    pub fn grading(&self) -> Arc<GradingService> {
        Arc::clone(&self.grading)
    }
}
