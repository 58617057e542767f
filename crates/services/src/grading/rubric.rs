use serde_json::{Map, Value, json};
use tracker_core::model::{MAX_BAND_SCORE, PracticeQuestion, QuestionKind};

const SUMMARIZE_PROMPT: &str = "You are an examiner for a standardized English test. \
Score a one-sentence summary of the given passage on a 0-90 band scale. \
Criteria: content (captures the main points of the passage), form (a single sentence \
of 5 to 75 words), grammar, vocabulary (appropriate word choice). \
Give each criterion a score on the same 0-90 scale, an overall score, and two or three \
sentences of actionable feedback. Respond with JSON only.";

const ESSAY_PROMPT: &str = "You are an examiner for a standardized English test. \
Score an argumentative essay written in response to the prompt on a 0-90 band scale. \
Criteria: content (addresses the prompt with relevant ideas), form (200 to 300 words), \
development (structure and coherence), grammar, linguistic_range (variety of sentence \
structures), vocabulary (range and precision), spelling. \
Give each criterion a score on the same 0-90 scale, an overall score, and two or three \
sentences of actionable feedback. Respond with JSON only.";

/// Grading instructions for one free-text question kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rubric {
    pub kind: QuestionKind,
    pub criteria: &'static [&'static str],
    pub system_prompt: &'static str,
}

impl Rubric {
    /// Rubric for a free-text kind; objective kinds have none.
    #[must_use]
    pub fn for_kind(kind: QuestionKind) -> Option<Self> {
        match kind {
            QuestionKind::Summarize => Some(Self {
                kind,
                criteria: &["content", "form", "grammar", "vocabulary"],
                system_prompt: SUMMARIZE_PROMPT,
            }),
            QuestionKind::Essay => Some(Self {
                kind,
                criteria: &[
                    "content",
                    "form",
                    "development",
                    "grammar",
                    "linguistic_range",
                    "vocabulary",
                    "spelling",
                ],
                system_prompt: ESSAY_PROMPT,
            }),
            _ => None,
        }
    }

    #[must_use]
    pub fn schema_name(&self) -> &'static str {
        match self.kind {
            QuestionKind::Essay => "essay_grade",
            _ => "summary_grade",
        }
    }

    #[must_use]
    pub fn user_prompt(&self, question: &PracticeQuestion, answer: &str) -> String {
        let mut prompt = format!("Prompt:\n{}\n", question.prompt.trim());
        if let Some(passage) = question.passage.as_deref().filter(|p| !p.trim().is_empty()) {
            prompt.push_str(&format!("\nPassage:\n{}\n", passage.trim()));
        }
        prompt.push_str(&format!("\nResponse:\n{}", answer.trim()));
        prompt
    }
}

/// Shared reply schema: overall score, feedback, and one sub-score per criterion.
#[must_use]
pub fn grading_schema(criteria: &[&str]) -> Value {
    let band = json!({ "type": "number", "minimum": 0, "maximum": MAX_BAND_SCORE });
    let properties: Map<String, Value> = criteria
        .iter()
        .map(|c| ((*c).to_owned(), band.clone()))
        .collect();

    json!({
        "type": "object",
        "additionalProperties": false,
        "required": ["score", "feedback", "details"],
        "properties": {
            "score": band,
            "feedback": { "type": "string" },
            "details": {
                "type": "object",
                "additionalProperties": false,
                "required": criteria,
                "properties": properties
            }
        }
    })
}
