//! crates/assessment_core/src/reconcile.rs
//!
//! Three-source result reconciliation. A results view can be fed by the
//! submit response passed straight through from the pipeline, by a detail
//! record fetched later by attempt id, or by the locally computed fallback.
//! This module merges them into the one shape the presentation layer
//! renders, with an explicit precedence order instead of nested
//! conditionals at the render site.

use crate::domain::{
    AnswerMap, AttemptId, Feedback, GradedResult, LocalOutcome, Quiz, ReadinessSnapshot,
    ResultDetail, ScoreImpact, UpdatedGoal,
};
use crate::scoring;

/// Which source won the score precedence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultOrigin {
    /// The freshly fetched detail record; reflects final server-side grading.
    Detail,
    /// The submit response returned by the grading endpoint.
    Backend,
    /// The client-computed fallback.
    LocalFallback,
}

/// The up-to-three inputs available to the reconciliation.
#[derive(Debug, Clone, Default)]
pub struct ResultSources {
    pub submitted: Option<GradedResult>,
    pub detail: Option<ResultDetail>,
    pub local: Option<LocalOutcome>,
}

/// The unified record the results view renders.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub title: String,
    /// 0-100 inclusive.
    pub score: f64,
    pub passed: bool,
    pub correct: Option<u32>,
    pub total: Option<u32>,
    pub answered: Option<usize>,
    pub elapsed_seconds: u64,
    pub auto_submitted: bool,
    pub feedback: Option<Feedback>,
    pub score_impact: Vec<ScoreImpact>,
    pub updated_goals: Vec<UpdatedGoal>,
    pub readiness: Option<ReadinessSnapshot>,
    pub origin: ResultOrigin,
}

/// Whether the presentation layer should fetch the detail record at all.
/// A submit response that already carries a feedback block makes the fetch
/// a redundant round trip; without an attempt id there is nothing to fetch.
pub fn needs_detail_fetch(submitted: Option<&GradedResult>, attempt_id: Option<AttemptId>) -> bool {
    if attempt_id.is_none() {
        return false;
    }
    match submitted {
        Some(result) => result.feedback.is_none(),
        None => true,
    }
}

/// Precedence-ordered merge of the available sources.
///
/// Returns `None` only in the degenerate case where there is no quiz
/// reference and no result data at all (e.g. the view was reached by
/// direct navigation); the caller renders a distinct "no results found"
/// state for that.
pub fn reconcile(
    quiz: Option<&Quiz>,
    answers: Option<&AnswerMap>,
    sources: &ResultSources,
    elapsed_seconds: u64,
    auto_submitted: bool,
) -> Option<ResultView> {
    let ResultSources {
        submitted,
        detail,
        local,
    } = sources;

    if quiz.is_none() && submitted.is_none() && detail.is_none() && local.is_none() {
        return None;
    }

    let detail_attempt = detail.as_ref().and_then(|d| d.attempt);

    let (score, origin) = if let Some(attempt) = detail_attempt {
        (attempt.score, ResultOrigin::Detail)
    } else if let Some(result) = submitted {
        (result.score, ResultOrigin::Backend)
    } else if let Some(outcome) = local {
        (outcome.score, ResultOrigin::LocalFallback)
    } else {
        (0.0, ResultOrigin::LocalFallback)
    };

    let passed = detail_attempt
        .and_then(|a| a.passed)
        .or_else(|| submitted.as_ref().and_then(|r| r.passed))
        .or_else(|| local.as_ref().map(|o| o.passed))
        .unwrap_or_else(|| scoring::passed(score));

    let title = detail
        .as_ref()
        .and_then(|d| d.quiz.as_ref().map(|q| q.title.clone()))
        .or_else(|| quiz.map(|q| q.title.clone()))
        .unwrap_or_else(|| "Test Results".to_string());

    let correct = submitted
        .as_ref()
        .map(|r| r.correct)
        .or_else(|| local.as_ref().map(|o| o.correct));
    let total = quiz
        .map(|q| q.questions.len() as u32)
        .or_else(|| local.as_ref().map(|o| o.total));
    let answered = answers
        .map(|a| a.len())
        .or_else(|| local.as_ref().map(|o| o.answers.len()));

    let feedback = pick(detail.as_ref().and_then(|d| d.feedback.clone()), || {
        submitted.as_ref().and_then(|r| r.feedback.clone())
    });
    let score_impact = pick_list(
        detail.as_ref().map(|d| d.score_impact.clone()),
        || submitted.as_ref().map(|r| r.score_impact.clone()),
    );
    let updated_goals = pick_list(
        detail.as_ref().map(|d| d.updated_goals.clone()),
        || submitted.as_ref().map(|r| r.updated_goals.clone()),
    );
    let readiness = pick(detail.as_ref().and_then(|d| d.readiness), || {
        submitted.as_ref().and_then(|r| r.readiness)
    });

    Some(ResultView {
        title,
        score,
        passed,
        correct,
        total,
        answered,
        elapsed_seconds,
        auto_submitted,
        feedback,
        score_impact,
        updated_goals,
        readiness,
        origin,
    })
}

fn pick<T>(first: Option<T>, second: impl FnOnce() -> Option<T>) -> Option<T> {
    first.or_else(second)
}

fn pick_list<T>(first: Option<Vec<T>>, second: impl FnOnce() -> Option<Vec<T>>) -> Vec<T> {
    match first {
        Some(list) if !list.is_empty() => list,
        _ => second().unwrap_or_default(),
    }
}
