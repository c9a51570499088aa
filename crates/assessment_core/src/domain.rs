//! crates/assessment_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any wire format or storage backend;
//! the adapters in the service crate translate to and from them.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Numeric identifier assigned to a quiz by the backend.
pub type QuizId = i64;
/// Numeric identifier of a question within a quiz.
pub type QuestionId = i64;
/// Server-assigned identifier of one grading attempt.
pub type AttemptId = i64;
/// Numeric identifier of a user account.
pub type UserId = i64;

/// The kind of a question, which constrains the shape of its answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuestionKind {
    MultipleChoice,
    TrueFalse,
}

/// The correct-answer marker for a question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CorrectAnswer {
    /// Index into the question's option list (multiple-choice).
    Choice(usize),
    /// Expected boolean (true/false).
    Bool(bool),
}

/// A user's recorded answer to a single question.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnswerValue {
    /// Selected option index (multiple-choice).
    Choice(usize),
    /// Selected boolean (true/false).
    Bool(bool),
}

impl AnswerValue {
    /// Whether this value is shaped correctly for a question of `kind`.
    pub fn matches_kind(&self, kind: QuestionKind) -> bool {
        matches!(
            (self, kind),
            (AnswerValue::Choice(_), QuestionKind::MultipleChoice)
                | (AnswerValue::Bool(_), QuestionKind::TrueFalse)
        )
    }

    /// Strict equality against the question's correct-answer marker.
    pub fn matches_correct(&self, correct: &CorrectAnswer) -> bool {
        match (self, correct) {
            (AnswerValue::Choice(a), CorrectAnswer::Choice(c)) => a == c,
            (AnswerValue::Bool(a), CorrectAnswer::Bool(c)) => a == c,
            _ => false,
        }
    }
}

/// Mapping from question identifier to the user's selected value.
/// Unanswered questions are absent from the map, never present as nulls.
pub type AnswerMap = HashMap<QuestionId, AnswerValue>;

/// A single question within a quiz.
#[derive(Debug, Clone)]
pub struct Question {
    pub id: QuestionId,
    pub kind: QuestionKind,
    pub prompt: String,
    /// Ordered option texts; empty for true/false questions.
    pub options: Vec<String>,
    pub correct: CorrectAnswer,
    pub scenario: Option<String>,
    pub explanation: Option<String>,
}

/// A quiz definition, immutable once loaded for a session.
#[derive(Debug, Clone)]
pub struct Quiz {
    pub id: QuizId,
    pub title: String,
    pub description: String,
    /// Session time limit; the backend omits this for some quizzes,
    /// in which case the loader substitutes 30 minutes.
    pub duration_minutes: u32,
    pub questions: Vec<Question>,
}

/// Problems detected while validating a freshly loaded quiz.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QuizError {
    #[error("quiz {0} has no questions")]
    Empty(QuizId),
    #[error("question {question} marks correct option {index} but only has {options} options")]
    CorrectOutOfRange {
        question: QuestionId,
        index: usize,
        options: usize,
    },
    #[error("question {question} has a correct marker that does not match its kind")]
    MarkerKindMismatch { question: QuestionId },
}

impl Quiz {
    /// Checks the structural invariants a loaded quiz must satisfy before a
    /// session may start: at least one question, and every correct marker
    /// consistent with its question's kind and option list.
    pub fn validate(&self) -> Result<(), QuizError> {
        if self.questions.is_empty() {
            return Err(QuizError::Empty(self.id));
        }
        for q in &self.questions {
            match (q.kind, &q.correct) {
                (QuestionKind::MultipleChoice, CorrectAnswer::Choice(i)) => {
                    if *i >= q.options.len() {
                        return Err(QuizError::CorrectOutOfRange {
                            question: q.id,
                            index: *i,
                            options: q.options.len(),
                        });
                    }
                }
                (QuestionKind::TrueFalse, CorrectAnswer::Bool(_)) => {}
                _ => return Err(QuizError::MarkerKindMismatch { question: q.id }),
            }
        }
        Ok(())
    }
}

/// One answer in the wire format the grading endpoint expects.
/// Multiple-choice selections are sent as the literal option text,
/// true/false as "true"/"false", unanswered as an empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedAnswer {
    pub question_id: QuestionId,
    pub selected_answer: String,
}

/// The optional feedback block a graded result may carry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feedback {
    pub overall: Option<String>,
    pub recommendations: Vec<String>,
    pub strengths: Vec<String>,
    pub weaknesses: Vec<String>,
}

/// Per-category score movement reported by the backend.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreImpact {
    pub category: String,
    pub old_score: f64,
    pub new_score: f64,
    pub increase: f64,
}

/// A goal whose progress the grading service advanced.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdatedGoal {
    pub title: String,
    pub category: String,
    pub progress: f64,
    pub completed: bool,
}

/// The aggregate readiness scores summarizing a user's assessed standing.
/// The submit response only reports these three; leadership is carried on
/// the profile alone.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReadinessSnapshot {
    pub overall: f64,
    pub technical: f64,
    pub soft: f64,
}

/// The canonical grading response returned by the submit endpoint.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GradedResult {
    /// 0-100 inclusive.
    pub score: f64,
    pub correct: u32,
    pub passed: Option<bool>,
    pub feedback: Option<Feedback>,
    pub score_impact: Vec<ScoreImpact>,
    pub updated_goals: Vec<UpdatedGoal>,
    pub readiness: Option<ReadinessSnapshot>,
}

/// Attempt-level summary inside a fetched result detail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttemptSummary {
    pub score: f64,
    pub passed: Option<bool>,
}

/// Quiz-level summary inside a fetched result detail.
#[derive(Debug, Clone, PartialEq)]
pub struct QuizSummary {
    pub title: String,
}

/// The shape of `GET /results/{attempt_id}`: the same optional sections as
/// the submit response, plus attempt and quiz summaries that reflect final
/// server-side grading and therefore outrank the originally returned score.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultDetail {
    pub attempt: Option<AttemptSummary>,
    pub quiz: Option<QuizSummary>,
    pub feedback: Option<Feedback>,
    pub score_impact: Vec<ScoreImpact>,
    pub updated_goals: Vec<UpdatedGoal>,
    pub readiness: Option<ReadinessSnapshot>,
}

/// The session-scoped user record, cached locally and refreshed from the
/// backend after a successful submission.
#[derive(Debug, Clone, PartialEq)]
pub struct UserProfile {
    pub id: UserId,
    pub email: String,
    pub name: Option<String>,
    pub specialization_id: Option<i64>,
    pub readiness_score: f64,
    pub technical_score: f64,
    pub soft_skills_score: f64,
    pub leadership_score: f64,
}

impl UserProfile {
    /// Merges a readiness snapshot into the profile, rounded the way the
    /// dashboard displays the scores. Leadership is untouched; the
    /// snapshot does not report it.
    pub fn apply_readiness(&mut self, snapshot: &ReadinessSnapshot) {
        self.readiness_score = snapshot.overall.round();
        self.technical_score = snapshot.technical.round();
        self.soft_skills_score = snapshot.soft.round();
    }
}

/// A locally persisted copy of a finished session, written regardless of
/// whether the backend path succeeded so the result survives a reload of
/// the results view.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalOutcome {
    pub id: Uuid,
    pub user_id: UserId,
    pub quiz_id: QuizId,
    pub score: f64,
    pub passed: bool,
    pub correct: u32,
    pub total: u32,
    pub answers: AnswerMap,
    pub elapsed_seconds: u64,
    pub completed_at: DateTime<Utc>,
}
