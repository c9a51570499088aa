//! crates/assessment_core/src/scoring.rs
//!
//! Local fallback scoring and the answer wire transformation. The backend
//! owns grading whenever it is reachable; these routines only run when the
//! grading service could not be used, or to shape the request it receives.

use chrono::Utc;
use uuid::Uuid;

use crate::domain::{
    AnswerMap, AnswerValue, GradedResult, LocalOutcome, Quiz, SubmittedAnswer, UserId,
};

/// Minimum score, 0-100, that counts as a pass. Shared by the backend and
/// the local fallback.
pub const PASS_THRESHOLD: f64 = 70.0;

/// Pass/fail for a 0-100 score, independent of which source produced it.
pub fn passed(score: f64) -> bool {
    score >= PASS_THRESHOLD
}

/// Counts questions whose recorded answer strictly equals the correct
/// marker. Unanswered questions never count as matches.
pub fn count_matches(quiz: &Quiz, answers: &AnswerMap) -> u32 {
    quiz.questions
        .iter()
        .filter(|q| {
            answers
                .get(&q.id)
                .map(|a| a.matches_correct(&q.correct))
                .unwrap_or(false)
        })
        .count() as u32
}

/// `round(100 * matches / N)` plus the raw match count.
pub fn fallback_score(quiz: &Quiz, answers: &AnswerMap) -> (f64, u32) {
    let total = quiz.questions.len();
    let matches = count_matches(quiz, answers);
    if total == 0 {
        return (0.0, 0);
    }
    let score = (100.0 * f64::from(matches) / total as f64).round();
    (score, matches)
}

/// Builds a `GradedResult`-shaped record from the local computation. It
/// carries no feedback, score-impact, goal, or readiness detail; only the
/// backend can produce those.
pub fn fallback_result(quiz: &Quiz, answers: &AnswerMap) -> GradedResult {
    let (score, correct) = fallback_score(quiz, answers);
    GradedResult {
        score,
        correct,
        passed: Some(passed(score)),
        ..GradedResult::default()
    }
}

/// Builds the locally persisted record of a finished session.
pub fn local_outcome(
    user_id: UserId,
    quiz: &Quiz,
    answers: &AnswerMap,
    score: f64,
    correct: u32,
    elapsed_seconds: u64,
) -> LocalOutcome {
    LocalOutcome {
        id: Uuid::new_v4(),
        user_id,
        quiz_id: quiz.id,
        score,
        passed: passed(score),
        correct,
        total: quiz.questions.len() as u32,
        answers: answers.clone(),
        elapsed_seconds,
        completed_at: Utc::now(),
    }
}

/// Transforms the answer map into the wire format the grading endpoint
/// expects: one entry per quiz question in quiz order. A multiple-choice
/// selection is resolved to the literal option text, a true/false answer
/// to "true"/"false", and an unanswered question to an empty string.
pub fn wire_answers(quiz: &Quiz, answers: &AnswerMap) -> Vec<SubmittedAnswer> {
    quiz.questions
        .iter()
        .map(|q| {
            let selected_answer = match answers.get(&q.id) {
                Some(AnswerValue::Choice(i)) => {
                    q.options.get(*i).cloned().unwrap_or_default()
                }
                Some(AnswerValue::Bool(b)) => b.to_string(),
                None => String::new(),
            };
            SubmittedAnswer {
                question_id: q.id,
                selected_answer,
            }
        })
        .collect()
}
