//! services/runner/src/flow/present.rs
//!
//! The result presentation adapter. Decides whether a detail fetch is
//! worth the round trip, reconciles the available sources into one view,
//! and renders the text results screen. A failed detail fetch downgrades
//! to an inline notice instead of blanking the view.

use tracing::warn;

use assessment_core::domain::{AttemptId, QuizId, UserId};
use assessment_core::reconcile::{self, ResultSources, ResultView};

use crate::flow::pipeline::SubmissionOutcome;
use crate::flow::state::AppState;
use crate::flow::timer::format_clock;

/// What the results screen has to work with: the reconciled view when any
/// source was available, plus an optional notice about a failed fetch.
#[derive(Debug)]
pub struct ResultsScreen {
    pub view: Option<ResultView>,
    pub fetch_error: Option<String>,
}

/// Builds the results screen from a fresh submission. The detail record is
/// fetched at most once, and only when the submit response left feedback
/// to fill in.
pub async fn prepare(state: &AppState, outcome: Option<&SubmissionOutcome>) -> ResultsScreen {
    let Some(outcome) = outcome else {
        return ResultsScreen {
            view: None,
            fetch_error: None,
        };
    };

    let mut fetch_error = None;
    let detail = if reconcile::needs_detail_fetch(outcome.graded.as_ref(), outcome.attempt_id) {
        match fetch_detail(state, outcome.attempt_id).await {
            Ok(detail) => detail,
            Err(message) => {
                fetch_error = Some(message);
                None
            }
        }
    } else {
        None
    };

    let sources = ResultSources {
        submitted: outcome.graded.clone(),
        detail,
        local: Some(outcome.local.clone()),
    };
    let view = reconcile::reconcile(
        Some(&outcome.quiz),
        Some(&outcome.answers),
        &sources,
        outcome.elapsed_seconds,
        outcome.auto_submitted,
    );

    ResultsScreen { view, fetch_error }
}

/// Rebuilds the results screen from the persisted outcome, for showing a
/// past result without a live session. No network calls are made.
pub async fn recover(state: &AppState, user_id: UserId, quiz_id: QuizId) -> ResultsScreen {
    let local = match state.store.load_outcome(user_id, quiz_id).await {
        Ok(local) => local,
        Err(e) => {
            warn!("Could not load the saved outcome for quiz {quiz_id}: {e}");
            None
        }
    };

    let elapsed = local.as_ref().map(|o| o.elapsed_seconds).unwrap_or(0);
    let sources = ResultSources {
        submitted: None,
        detail: None,
        local,
    };
    ResultsScreen {
        view: reconcile::reconcile(None, None, &sources, elapsed, false),
        fetch_error: None,
    }
}

async fn fetch_detail(
    state: &AppState,
    attempt_id: Option<AttemptId>,
) -> Result<Option<assessment_core::domain::ResultDetail>, String> {
    let Some(attempt_id) = attempt_id else {
        return Ok(None);
    };
    match state.quiz_service.fetch_result(attempt_id).await {
        Ok(detail) => Ok(Some(detail)),
        Err(e) => {
            warn!("Detail fetch for attempt {attempt_id} failed: {e}");
            Err("Could not load detailed feedback for this attempt.".to_string())
        }
    }
}

/// Renders the screen as plain text for the terminal.
pub fn render(screen: &ResultsScreen) -> String {
    let Some(view) = &screen.view else {
        return "No test results found.\n".to_string();
    };

    let mut out = String::new();
    out.push_str(&format!("=== {} ===\n", view.title));

    if view.auto_submitted {
        out.push_str("Time's up! Your answers were submitted automatically.\n");
    }

    out.push_str(&format!("Score: {}%\n", view.score.round()));
    if view.passed {
        out.push_str("Passed. You met the 70% threshold.\n");
    } else {
        out.push_str("Not passed. The passing threshold is 70%.\n");
    }

    if let (Some(correct), Some(total)) = (view.correct, view.total) {
        out.push_str(&format!("Correct answers: {correct}/{total}\n"));
    }
    if let (Some(answered), Some(total)) = (view.answered, view.total) {
        out.push_str(&format!("Questions answered: {answered}/{total}\n"));
    }
    out.push_str(&format!(
        "Time taken: {}\n",
        format_clock(view.elapsed_seconds)
    ));

    if let Some(notice) = &screen.fetch_error {
        out.push_str(&format!("Note: {notice}\n"));
    }

    if let Some(feedback) = &view.feedback {
        if let Some(overall) = &feedback.overall {
            out.push_str(&format!("\nFeedback:\n  {overall}\n"));
        }
        push_section(&mut out, "Strengths", &feedback.strengths);
        push_section(&mut out, "Areas to improve", &feedback.weaknesses);
        push_section(&mut out, "Recommendations", &feedback.recommendations);
    }

    if !view.score_impact.is_empty() {
        out.push_str("\nScore impact:\n");
        for impact in &view.score_impact {
            out.push_str(&format!(
                "  {}: {} -> {} (+{})\n",
                impact.category, impact.old_score, impact.new_score, impact.increase
            ));
        }
    }

    if !view.updated_goals.is_empty() {
        out.push_str("\nGoal progress:\n");
        for goal in &view.updated_goals {
            let status = if goal.completed {
                "completed".to_string()
            } else {
                format!("{}%", goal.progress.round())
            };
            out.push_str(&format!("  {} ({}): {status}\n", goal.title, goal.category));
        }
    }

    if let Some(readiness) = view.readiness {
        out.push_str(&format!(
            "\nReadiness: overall {:.0}, technical {:.0}, soft skills {:.0}\n",
            readiness.overall, readiness.technical, readiness.soft
        ));
    }

    out
}

fn push_section(out: &mut String, label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("{label}:\n"));
    for item in items {
        out.push_str(&format!("  - {item}\n"));
    }
}
