//! crates/assessment_core/src/session.rs
//!
//! The test-taking session state machine: the in-memory answer store, the
//! bounded question navigation, and the single-shot submission guard. The
//! countdown timer itself is asynchronous and lives in the service crate;
//! this module only knows the session's time limit and elapsed time.

use std::time::{Duration, Instant};

use crate::domain::{AnswerMap, AnswerValue, Question, QuestionId, Quiz, QuizError};

/// What caused a submission to begin. Timer expiry is flagged so the
/// results view can show a "time's up" notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitTrigger {
    Manual,
    TimerExpired,
}

/// An immutable capture of the session at the instant submission began.
/// The answer map is cloned here; the live store becomes read-only.
#[derive(Debug, Clone)]
pub struct SubmissionSnapshot {
    pub answers: AnswerMap,
    pub elapsed_seconds: u64,
    pub auto_submitted: bool,
}

/// One user's active run through a quiz.
pub struct TestSession {
    quiz: Quiz,
    answers: AnswerMap,
    current_index: usize,
    started_at: Instant,
    submitted: bool,
}

impl TestSession {
    /// Starts a session over a validated quiz and records the start instant.
    pub fn new(quiz: Quiz) -> Result<Self, QuizError> {
        quiz.validate()?;
        Ok(Self {
            quiz,
            answers: AnswerMap::new(),
            current_index: 0,
            started_at: Instant::now(),
            submitted: false,
        })
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    /// The application-level timeout for this session.
    pub fn time_limit(&self) -> Duration {
        Duration::from_secs(u64::from(self.quiz.duration_minutes) * 60)
    }

    /// Wall-clock time since the session started, rounded (not truncated)
    /// to whole seconds.
    pub fn elapsed_seconds(&self) -> u64 {
        round_to_seconds(self.started_at.elapsed())
    }

    //=====================================================================================
    // Answer Store
    //=====================================================================================

    /// Inserts or overwrites the answer for `question_id`.
    ///
    /// Returns `false` without touching the store when submission has
    /// already begun, when the question is unknown, or when the value's
    /// variant does not match the question's kind.
    pub fn record_answer(&mut self, question_id: QuestionId, value: AnswerValue) -> bool {
        if self.submitted {
            return false;
        }
        let Some(question) = self.quiz.questions.iter().find(|q| q.id == question_id) else {
            return false;
        };
        if !value.matches_kind(question.kind) {
            return false;
        }
        self.answers.insert(question_id, value);
        true
    }

    pub fn answer_for(&self, question_id: QuestionId) -> Option<AnswerValue> {
        self.answers.get(&question_id).copied()
    }

    /// Answered count versus total, for the progress indicator.
    pub fn progress(&self) -> (usize, usize) {
        (self.answers.len(), self.quiz.questions.len())
    }

    //=====================================================================================
    // Navigation Controller
    //=====================================================================================

    pub fn current_index(&self) -> usize {
        self.current_index
    }

    pub fn current_question(&self) -> &Question {
        // new() rejects empty quizzes and navigation never leaves bounds.
        &self.quiz.questions[self.current_index]
    }

    /// Advances to the next question; no-op on the last one (never wraps).
    pub fn next(&mut self) {
        if self.current_index + 1 < self.quiz.questions.len() {
            self.current_index += 1;
        }
    }

    /// Steps back to the previous question; no-op on the first.
    pub fn previous(&mut self) {
        if self.current_index > 0 {
            self.current_index -= 1;
        }
    }

    pub fn is_last(&self) -> bool {
        self.current_index + 1 == self.quiz.questions.len()
    }

    //=====================================================================================
    // Submission Guard
    //=====================================================================================

    pub fn is_submitted(&self) -> bool {
        self.submitted
    }

    /// Flips the session into its submitted state and captures a snapshot
    /// of the answers and elapsed time.
    ///
    /// Returns `Some` exactly once. A second trigger, whether the manual
    /// button or the timer expiring right behind it, gets `None` and must
    /// not start another grading request.
    pub fn begin_submission(&mut self, trigger: SubmitTrigger) -> Option<SubmissionSnapshot> {
        if self.submitted {
            return None;
        }
        self.submitted = true;
        Some(SubmissionSnapshot {
            answers: self.answers.clone(),
            elapsed_seconds: self.elapsed_seconds(),
            auto_submitted: trigger == SubmitTrigger::TimerExpired,
        })
    }
}

/// Millisecond-accurate duration to whole seconds, rounded half-up.
pub fn round_to_seconds(elapsed: Duration) -> u64 {
    (elapsed.as_millis() as f64 / 1000.0).round() as u64
}
