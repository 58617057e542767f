use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Value, json};
use tracker_core::model::{
    OPTIONS_PER_QUESTION, QUESTIONS_PER_CHECK, QuizQuestion, QuizSet, WeekNumber,
};

use crate::llm::{LanguageModel, LlmOutcome, StructuredRequest, generate_checked};

const SYSTEM_PROMPT: &str = "You write short comprehension checks for a self-paced learning \
curriculum. Given a task description, write exactly 3 multiple-choice questions that test \
whether the learner understood what the task asks and why it matters. Each question has \
exactly 4 options, one correct option identified by its zero-based index in correctAnswer, \
and a one-sentence explanation of the correct option. Respond with JSON only.";

/// Reply shape. Models sometimes return the bare array instead of the wrapper.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum QuizReply {
    Wrapped { questions: Vec<QuizQuestion> },
    Bare(Vec<QuizQuestion>),
}

impl QuizReply {
    fn into_questions(self) -> Vec<QuizQuestion> {
        match self {
            QuizReply::Wrapped { questions } | QuizReply::Bare(questions) => questions,
        }
    }
}

/// Strict schema for a three-question check.
#[must_use]
pub fn quiz_schema() -> Value {
    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["questions"],
        "properties": {
            "questions": {
                "type": "array",
                "minItems": QUESTIONS_PER_CHECK,
                "maxItems": QUESTIONS_PER_CHECK,
                "items": {
                    "type": "object",
                    "additionalProperties": false,
                    "required": ["question", "options", "correctAnswer", "explanation"],
                    "properties": {
                        "question": { "type": "string" },
                        "options": {
                            "type": "array",
                            "minItems": OPTIONS_PER_QUESTION,
                            "maxItems": OPTIONS_PER_QUESTION,
                            "items": { "type": "string" }
                        },
                        "correctAnswer": {
                            "type": "integer",
                            "minimum": 0,
                            "maximum": OPTIONS_PER_QUESTION - 1
                        },
                        "explanation": { "type": "string" }
                    }
                }
            }
        }
    })
}

/// Generates comprehension checks for task descriptions.
#[derive(Clone)]
pub struct AssessmentService {
    model: Arc<dyn LanguageModel>,
}

impl AssessmentService {
    #[must_use]
    pub fn new(model: Arc<dyn LanguageModel>) -> Self {
        Self { model }
    }

    /// Ask the model for a check on `task_text`. The week is prompt context only.
    ///
    /// A reply that parses but has the wrong number of questions or options, or an
    /// out-of-range answer index, is reported as `Malformed`.
    pub async fn generate_check(&self, task_text: &str, week: WeekNumber) -> LlmOutcome<QuizSet> {
        let request = StructuredRequest {
            schema_name: "comprehension_check",
            system_prompt: SYSTEM_PROMPT.to_owned(),
            user_prompt: format!("Week {week} task:\n{}", task_text.trim()),
            schema: quiz_schema(),
        };

        generate_checked(self.model.as_ref(), &request, |reply: QuizReply| {
            QuizSet::new(reply.into_questions())
        })
        .await
    }
}
