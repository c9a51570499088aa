//! services/runner/src/bin/runner.rs

use runner_lib::{
    adapters::{FileStore, HttpQuizAdapter},
    config::Config,
    error::AppError,
    flow::{self, state::AppState, timer::format_clock, SessionTimer},
};

use assessment_core::domain::{AnswerValue, QuestionKind, Quiz};
use assessment_core::session::{SubmitTrigger, TestSession};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting test runner...");

    // --- 2. Initialize Adapters & Shared State ---
    let quiz_service = Arc::new(HttpQuizAdapter::new(
        &config.api_base_url,
        config.http_timeout,
    )?);
    let store = Arc::new(FileStore::new(config.state_path.clone()));
    let state = AppState {
        quiz_service,
        store,
        config: config.clone(),
    };

    // --- 3. Parse Arguments ---
    let mut args = std::env::args().skip(1);
    let quiz_id = args
        .next()
        .and_then(|raw| raw.parse::<i64>().ok())
        .ok_or_else(|| AppError::Internal("usage: runner <quiz_id> [results]".to_string()))?;

    // `runner <quiz_id> results` replays the saved outcome without a session.
    if args.next().as_deref() == Some("results") {
        let screen = flow::recover(&state, config.user_id, quiz_id).await;
        print!("{}", flow::render(&screen));
        return Ok(());
    }

    // --- 4. Bootstrap the Cached Profile ---
    bootstrap_profile(&state).await;

    // --- 5. Load the Quiz & Start the Session ---
    let quiz: Quiz = state.quiz_service.fetch_quiz(quiz_id).await?;
    let mut session = match TestSession::new(quiz) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("This test cannot be taken: {e}");
            return Ok(());
        }
    };

    let (timer, mut expiry) = SessionTimer::start(session.time_limit());
    println!(
        "Starting \"{}\": {} questions, {} on the clock.",
        session.quiz().title,
        session.quiz().questions.len(),
        format_clock(timer.remaining_seconds())
    );
    print_question(&session, &timer);

    // --- 6. Interactive Loop, Raced Against the Timer ---
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let snapshot = loop {
        tokio::select! {
            _ = &mut expiry => {
                println!("\nTime's up! Submitting your answers...");
                // The guard makes a second trigger impossible, but the
                // expiry can only fire here anyway.
                break session.begin_submission(SubmitTrigger::TimerExpired);
            }
            line = lines.next_line() => {
                let Some(line) = line? else {
                    // stdin closed; leave without submitting.
                    timer.stop();
                    return Ok(());
                };
                match handle_command(&mut session, line.trim()) {
                    Command::Continue => print_question(&session, &timer),
                    Command::Noop => {}
                    Command::Submit => break session.begin_submission(SubmitTrigger::Manual),
                    Command::Quit => {
                        timer.stop();
                        println!("Leaving without submitting.");
                        return Ok(());
                    }
                }
            }
        }
    };
    timer.stop();

    // --- 7. Submit & Present ---
    let Some(snapshot) = snapshot else {
        // Unreachable with a single loop, kept as a safe exit.
        return Ok(());
    };
    let outcome = flow::submit(&state, session.quiz(), snapshot).await?;
    let screen = flow::prepare(&state, Some(&outcome)).await;
    print!("{}", flow::render(&screen));
    Ok(())
}

/// Loads the cached profile, fetching and caching it from the backend when
/// absent or belonging to a different user. Failures only log; the session
/// can run without a profile.
async fn bootstrap_profile(state: &AppState) {
    let user_id = state.config.user_id;
    match state.store.load_profile().await {
        Ok(Some(profile)) if profile.id == user_id => {
            info!("Using the cached profile for user {user_id}.");
            return;
        }
        Ok(_) => {}
        Err(e) => warn!("Could not read the cached profile: {e}"),
    }
    match state.quiz_service.fetch_user(user_id).await {
        Ok(profile) => {
            if let Err(e) = state.store.save_profile(&profile).await {
                warn!("Could not cache the fetched profile: {e}");
            }
        }
        Err(e) => warn!("Could not fetch the profile for user {user_id}: {e}"),
    }
}

enum Command {
    /// Redraw the current question.
    Continue,
    Noop,
    Submit,
    Quit,
}

fn handle_command(session: &mut TestSession, input: &str) -> Command {
    match input {
        "n" | "next" => {
            session.next();
            Command::Continue
        }
        "p" | "prev" => {
            session.previous();
            Command::Continue
        }
        "s" | "submit" => {
            if session.is_last() {
                Command::Submit
            } else {
                println!("Submit is only available on the last question (type 'n' to move on).");
                Command::Noop
            }
        }
        "q" | "quit" => Command::Quit,
        "" => Command::Noop,
        other => {
            let question = session.current_question();
            let (question_id, kind, option_count) =
                (question.id, question.kind, question.options.len());
            match parse_answer(kind, option_count, other) {
                Some(value) if session.record_answer(question_id, value) => {
                    // Mirror the web client: answering advances automatically
                    // unless this is the last question.
                    if !session.is_last() {
                        session.next();
                    }
                    Command::Continue
                }
                _ => {
                    println!("Not a valid answer for this question.");
                    Command::Noop
                }
            }
        }
    }
}

/// Parses user input into an answer for the question's kind: a 1-based
/// option number for multiple choice, true/false words for the rest.
fn parse_answer(kind: QuestionKind, option_count: usize, input: &str) -> Option<AnswerValue> {
    match kind {
        QuestionKind::MultipleChoice => {
            let number: usize = input.parse().ok()?;
            if number >= 1 && number <= option_count {
                Some(AnswerValue::Choice(number - 1))
            } else {
                None
            }
        }
        QuestionKind::TrueFalse => match input.to_lowercase().as_str() {
            "t" | "true" => Some(AnswerValue::Bool(true)),
            "f" | "false" => Some(AnswerValue::Bool(false)),
            _ => None,
        },
    }
}

fn print_question(session: &TestSession, timer: &SessionTimer) {
    let question = session.current_question();
    let (answered, total) = session.progress();
    println!(
        "\n[{}] Question {}/{} ({} answered)",
        format_clock(timer.remaining_seconds()),
        session.current_index() + 1,
        total,
        answered
    );
    if let Some(scenario) = &question.scenario {
        println!("Scenario: {scenario}");
    }
    println!("{}", question.prompt);
    match question.kind {
        QuestionKind::MultipleChoice => {
            for (i, option) in question.options.iter().enumerate() {
                println!("  {}. {option}", i + 1);
            }
        }
        QuestionKind::TrueFalse => println!("  (t)rue / (f)alse"),
    }
    if let Some(current) = session.answer_for(question.id) {
        let shown = match current {
            AnswerValue::Choice(i) => (i + 1).to_string(),
            AnswerValue::Bool(b) => b.to_string(),
        };
        println!("  current answer: {shown}");
    }
    if session.is_last() {
        println!("  ('s' to submit)");
    }
}
