//! services/runner/src/flow/pipeline.rs
//!
//! The submission pipeline: opens a graded attempt against the quiz
//! service, posts the transformed answers, merges any returned readiness
//! snapshot into the cached profile, and falls back to local scoring when
//! the backend cannot be reached. Network failures here are recoverable by
//! design; the only fatal case is a quiz whose identifier cannot be
//! resolved, because nothing can be graded without knowing which quiz.

use std::sync::Arc;
use tracing::{info, warn};

use assessment_core::domain::{
    AnswerMap, AttemptId, GradedResult, LocalOutcome, Quiz, UserId,
};
use assessment_core::ports::{LocalStore, QuizService};
use assessment_core::scoring;
use assessment_core::session::SubmissionSnapshot;

use crate::flow::state::AppState;

/// Fatal submission errors. Everything network-shaped is handled inside
/// the pipeline and never surfaces as an error.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("cannot determine a valid quiz id for submission (got {0})")]
    InvalidQuizIdentifier(i64),
}

/// The unified payload handed to the result presentation: the quiz
/// reference, the full answer map, the chosen result sources, and the
/// submission metadata.
#[derive(Debug)]
pub struct SubmissionOutcome {
    pub quiz: Quiz,
    pub answers: AnswerMap,
    pub elapsed_seconds: u64,
    pub auto_submitted: bool,
    /// Present when the open-attempt call succeeded, even if the grading
    /// POST later failed; the results view can still fetch detail by id.
    pub attempt_id: Option<AttemptId>,
    /// The raw backend grading response, absent when the fallback ran.
    pub graded: Option<GradedResult>,
    /// The locally persisted copy, written on both paths.
    pub local: LocalOutcome,
}

/// Runs the submission flow for a snapshot captured by the session guard.
///
/// The caller must only invoke this with a snapshot obtained from
/// `TestSession::begin_submission`, which enforces the at-most-once rule
/// across the manual and timer triggers.
pub async fn submit(
    state: &AppState,
    quiz: &Quiz,
    snapshot: SubmissionSnapshot,
) -> Result<SubmissionOutcome, PipelineError> {
    // The id always comes from the freshest loaded quiz object, never a
    // separately cached value that could have gone stale.
    let quiz_id = quiz.id;
    if quiz_id <= 0 {
        return Err(PipelineError::InvalidQuizIdentifier(quiz_id));
    }
    let user_id = state.config.user_id;

    let mut attempt_id = None;
    let graded = match state.quiz_service.start_attempt(quiz_id, user_id).await {
        Ok(id) => {
            attempt_id = Some(id);
            let wire = scoring::wire_answers(quiz, &snapshot.answers);
            match state.quiz_service.submit_answers(id, &wire).await {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!("Submitting answers for attempt {id} failed, using local scoring: {e}");
                    None
                }
            }
        }
        Err(e) => {
            warn!("Could not open a graded attempt, using local scoring: {e}");
            None
        }
    };

    if let Some(result) = &graded {
        // Best-effort refresh of the cached profile; completion is not
        // awaited before moving on to the results view.
        tokio::spawn(refresh_profile(
            state.quiz_service.clone(),
            state.store.clone(),
            user_id,
        ));

        if let Some(readiness) = result.readiness {
            if let Err(e) = state.store.update_readiness(user_id, &readiness).await {
                warn!("Could not merge the readiness snapshot into the cached profile: {e}");
            }
        }
    }

    let (score, correct) = match &graded {
        Some(result) => (result.score, result.correct),
        None => scoring::fallback_score(quiz, &snapshot.answers),
    };

    let local = scoring::local_outcome(
        user_id,
        quiz,
        &snapshot.answers,
        score,
        correct,
        snapshot.elapsed_seconds,
    );
    if let Err(e) = state.store.save_outcome(&local).await {
        // The in-memory result still reaches the results view.
        warn!("Could not persist the local result copy: {e}");
    }

    info!(
        "Quiz {quiz_id} submitted: score {score}, {} path",
        if graded.is_some() { "backend" } else { "fallback" }
    );

    Ok(SubmissionOutcome {
        quiz: quiz.clone(),
        answers: snapshot.answers,
        elapsed_seconds: snapshot.elapsed_seconds,
        auto_submitted: snapshot.auto_submitted,
        attempt_id,
        graded,
        local,
    })
}

/// The fire-and-forget profile refresh spawned after a successful grading
/// call. Failures are logged and never affect the submission.
pub(crate) async fn refresh_profile(
    service: Arc<dyn QuizService>,
    store: Arc<dyn LocalStore>,
    user_id: UserId,
) {
    match service.fetch_user(user_id).await {
        Ok(profile) => {
            if let Err(e) = store.save_profile(&profile).await {
                warn!("Could not cache the refreshed profile: {e}");
            } else {
                info!("User profile refreshed after submission.");
            }
        }
        Err(e) => warn!("Best-effort profile refresh failed: {e}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use assessment_core::domain::{
        AnswerValue, CorrectAnswer, Question, QuestionId, QuestionKind, QuizId,
        ReadinessSnapshot, ResultDetail, SubmittedAnswer, UserProfile,
    };
    use assessment_core::ports::{PortError, PortResult};
    use assessment_core::session::{SubmitTrigger, TestSession};
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tracing::Level;

    //=====================================================================================
    // Mock Ports
    //=====================================================================================

    #[derive(Default)]
    struct MockService {
        fail_start: bool,
        fail_submit: bool,
        graded: GradedResult,
        user: Option<UserProfile>,
        start_calls: AtomicU32,
        submit_calls: AtomicU32,
        fetch_result_calls: AtomicU32,
        captured_answers: Mutex<Vec<SubmittedAnswer>>,
    }

    #[async_trait]
    impl assessment_core::ports::QuizService for MockService {
        async fn fetch_quiz(&self, quiz_id: QuizId) -> PortResult<Quiz> {
            Err(PortError::NotFound(format!("quiz {quiz_id}")))
        }

        async fn start_attempt(&self, _quiz_id: QuizId, _user_id: UserId) -> PortResult<AttemptId> {
            self.start_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_start {
                return Err(PortError::Unavailable("connection refused".into()));
            }
            Ok(501)
        }

        async fn submit_answers(
            &self,
            _attempt_id: AttemptId,
            answers: &[SubmittedAnswer],
        ) -> PortResult<GradedResult> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_submit {
                return Err(PortError::Unavailable("connection reset".into()));
            }
            *self.captured_answers.lock().unwrap() = answers.to_vec();
            Ok(self.graded.clone())
        }

        async fn fetch_result(&self, _attempt_id: AttemptId) -> PortResult<ResultDetail> {
            self.fetch_result_calls.fetch_add(1, Ordering::SeqCst);
            Err(PortError::NotFound("no detail".into()))
        }

        async fn fetch_user(&self, _user_id: UserId) -> PortResult<UserProfile> {
            self.user
                .clone()
                .ok_or_else(|| PortError::Unavailable("profile service down".into()))
        }
    }

    #[derive(Default)]
    struct MemStore {
        fail_writes: bool,
        profile: Mutex<Option<UserProfile>>,
        outcomes: Mutex<Vec<LocalOutcome>>,
    }

    #[async_trait]
    impl LocalStore for MemStore {
        async fn load_profile(&self) -> PortResult<Option<UserProfile>> {
            Ok(self.profile.lock().unwrap().clone())
        }

        async fn save_profile(&self, profile: &UserProfile) -> PortResult<()> {
            if self.fail_writes {
                return Err(PortError::Unexpected("disk full".into()));
            }
            *self.profile.lock().unwrap() = Some(profile.clone());
            Ok(())
        }

        async fn update_readiness(
            &self,
            user_id: UserId,
            snapshot: &ReadinessSnapshot,
        ) -> PortResult<()> {
            if self.fail_writes {
                return Err(PortError::Unexpected("disk full".into()));
            }
            let mut guard = self.profile.lock().unwrap();
            if let Some(profile) = guard.as_mut() {
                if profile.id == user_id {
                    profile.apply_readiness(snapshot);
                }
            }
            Ok(())
        }

        async fn save_outcome(&self, outcome: &LocalOutcome) -> PortResult<()> {
            if self.fail_writes {
                return Err(PortError::Unexpected("disk full".into()));
            }
            self.outcomes.lock().unwrap().push(outcome.clone());
            Ok(())
        }

        async fn load_outcome(
            &self,
            user_id: UserId,
            quiz_id: QuizId,
        ) -> PortResult<Option<LocalOutcome>> {
            Ok(self
                .outcomes
                .lock()
                .unwrap()
                .iter()
                .rev()
                .find(|o| o.user_id == user_id && o.quiz_id == quiz_id)
                .cloned())
        }
    }

    //=====================================================================================
    // Fixtures
    //=====================================================================================

    fn quiz() -> Quiz {
        // Correct answers at indices [1, 0, 2].
        let correct = [1usize, 0, 2];
        Quiz {
            id: 42,
            title: "Career readiness check".into(),
            description: String::new(),
            duration_minutes: 30,
            questions: correct
                .iter()
                .enumerate()
                .map(|(i, c)| Question {
                    id: i as QuestionId + 1,
                    kind: QuestionKind::MultipleChoice,
                    prompt: format!("q{}", i + 1),
                    options: vec![
                        format!("q{} option a", i + 1),
                        format!("q{} option b", i + 1),
                        format!("q{} option c", i + 1),
                    ],
                    correct: CorrectAnswer::Choice(*c),
                    scenario: None,
                    explanation: None,
                })
                .collect(),
        }
    }

    fn profile(id: i64) -> UserProfile {
        UserProfile {
            id,
            email: "user@example.com".into(),
            name: None,
            specialization_id: None,
            readiness_score: 40.0,
            technical_score: 40.0,
            soft_skills_score: 40.0,
            leadership_score: 40.0,
        }
    }

    fn app_state(service: Arc<MockService>, store: Arc<MemStore>) -> AppState {
        AppState {
            quiz_service: service,
            store,
            config: Arc::new(Config {
                api_base_url: "http://unused".into(),
                user_id: 7,
                state_path: PathBuf::from("/unused"),
                log_level: Level::INFO,
                http_timeout: Duration::from_secs(1),
            }),
        }
    }

    /// Two of three correct: the local estimate would be 67.
    fn two_of_three_snapshot(quiz: &Quiz) -> SubmissionSnapshot {
        let mut session = TestSession::new(quiz.clone()).unwrap();
        session.record_answer(1, AnswerValue::Choice(1));
        session.record_answer(2, AnswerValue::Choice(0));
        session.record_answer(3, AnswerValue::Choice(1));
        session.begin_submission(SubmitTrigger::Manual).unwrap()
    }

    //=====================================================================================
    // Tests
    //=====================================================================================

    #[tokio::test]
    async fn backend_path_sends_option_text_and_keeps_backend_score() {
        let service = Arc::new(MockService {
            graded: GradedResult {
                score: 85.0,
                correct: 3,
                passed: Some(true),
                readiness: Some(ReadinessSnapshot {
                    overall: 72.4,
                    technical: 68.6,
                    soft: 70.0,
                }),
                ..GradedResult::default()
            },
            ..MockService::default()
        });
        let store = Arc::new(MemStore {
            profile: Mutex::new(Some(profile(7))),
            ..MemStore::default()
        });
        let state = app_state(service.clone(), store.clone());
        let quiz = quiz();

        let outcome = submit(&state, &quiz, two_of_three_snapshot(&quiz))
            .await
            .unwrap();

        assert_eq!(service.start_calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.submit_calls.load(Ordering::SeqCst), 1);

        // Answers go out as option text, not indices.
        let captured = service.captured_answers.lock().unwrap().clone();
        assert_eq!(captured[0].selected_answer, "q1 option b");
        assert_eq!(captured[1].selected_answer, "q2 option a");
        assert_eq!(captured[2].selected_answer, "q3 option b");

        // The backend score is authoritative over the local 67 estimate,
        // including in the persisted copy.
        assert_eq!(outcome.graded.as_ref().unwrap().score, 85.0);
        assert_eq!(outcome.local.score, 85.0);
        assert_eq!(outcome.attempt_id, Some(501));

        // The readiness snapshot was merged into the cached profile.
        let merged = store.profile.lock().unwrap().clone().unwrap();
        assert_eq!(merged.readiness_score, 72.0);
        assert_eq!(merged.technical_score, 69.0);
        assert_eq!(merged.leadership_score, 40.0);
    }

    #[tokio::test]
    async fn unreachable_service_falls_back_to_local_scoring() {
        let service = Arc::new(MockService {
            fail_start: true,
            ..MockService::default()
        });
        let store = Arc::new(MemStore::default());
        let state = app_state(service.clone(), store.clone());
        let quiz = quiz();

        let outcome = submit(&state, &quiz, two_of_three_snapshot(&quiz))
            .await
            .unwrap();

        assert!(outcome.graded.is_none());
        assert_eq!(outcome.attempt_id, None);
        assert_eq!(outcome.local.score, 67.0);
        assert!(!outcome.local.passed);
        assert_eq!(outcome.local.correct, 2);
        // No grading request was ever sent.
        assert_eq!(service.submit_calls.load(Ordering::SeqCst), 0);
        // The outcome was still persisted locally.
        assert_eq!(store.outcomes.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_grading_post_keeps_the_attempt_id() {
        let service = Arc::new(MockService {
            fail_submit: true,
            ..MockService::default()
        });
        let store = Arc::new(MemStore::default());
        let state = app_state(service.clone(), store.clone());
        let quiz = quiz();

        let outcome = submit(&state, &quiz, two_of_three_snapshot(&quiz))
            .await
            .unwrap();

        assert!(outcome.graded.is_none());
        // The attempt was opened before the POST failed; the results view
        // can still try a detail fetch with it.
        assert_eq!(outcome.attempt_id, Some(501));
        assert_eq!(outcome.local.score, 67.0);
    }

    #[tokio::test]
    async fn non_positive_quiz_id_is_fatal() {
        let service = Arc::new(MockService::default());
        let store = Arc::new(MemStore::default());
        let state = app_state(service.clone(), store);
        let mut quiz = quiz();
        quiz.id = 0;

        let snapshot = two_of_three_snapshot(&quiz);
        let result = submit(&state, &quiz, snapshot).await;
        assert!(matches!(
            result,
            Err(PipelineError::InvalidQuizIdentifier(0))
        ));
        // Fatal before any network call.
        assert_eq!(service.start_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn persistence_failures_are_silent() {
        let service = Arc::new(MockService {
            graded: GradedResult {
                score: 90.0,
                correct: 3,
                passed: Some(true),
                readiness: Some(ReadinessSnapshot {
                    overall: 70.0,
                    technical: 70.0,
                    soft: 70.0,
                }),
                ..GradedResult::default()
            },
            ..MockService::default()
        });
        let store = Arc::new(MemStore {
            fail_writes: true,
            ..MemStore::default()
        });
        let state = app_state(service, store.clone());
        let quiz = quiz();

        // Both the readiness merge and the outcome write fail; the
        // submission still completes with the in-memory result.
        let outcome = submit(&state, &quiz, two_of_three_snapshot(&quiz))
            .await
            .unwrap();
        assert_eq!(outcome.graded.unwrap().score, 90.0);
        assert!(store.outcomes.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn second_trigger_produces_no_second_grading_request() {
        let service = Arc::new(MockService::default());
        let store = Arc::new(MemStore::default());
        let state = app_state(service.clone(), store);
        let quiz = quiz();

        let mut session = TestSession::new(quiz.clone()).unwrap();
        let first = session.begin_submission(SubmitTrigger::Manual);
        let second = session.begin_submission(SubmitTrigger::TimerExpired);

        // Only the first trigger yields a snapshot to submit.
        submit(&state, &quiz, first.unwrap()).await.unwrap();
        assert!(second.is_none());
        assert_eq!(service.start_calls.load(Ordering::SeqCst), 1);
        assert_eq!(service.submit_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn profile_refresh_overwrites_the_cached_record() {
        let mut refreshed = profile(7);
        refreshed.readiness_score = 66.0;
        let service = Arc::new(MockService {
            user: Some(refreshed),
            ..MockService::default()
        });
        let store = Arc::new(MemStore {
            profile: Mutex::new(Some(profile(7))),
            ..MemStore::default()
        });

        refresh_profile(service, store.clone(), 7).await;
        let cached = store.profile.lock().unwrap().clone().unwrap();
        assert_eq!(cached.readiness_score, 66.0);
    }

    #[tokio::test]
    async fn failed_profile_refresh_is_silent() {
        let service = Arc::new(MockService::default());
        let store = Arc::new(MemStore::default());
        // fetch_user errors; nothing is written and nothing panics.
        refresh_profile(service, store.clone(), 7).await;
        assert!(store.profile.lock().unwrap().is_none());
    }
}
