//! crates/assessment_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like the quiz backend
//! or the local state directory.

use async_trait::async_trait;

use crate::domain::{
    AttemptId, GradedResult, LocalOutcome, Quiz, QuizId, ReadinessSnapshot, ResultDetail,
    SubmittedAnswer, UserId, UserProfile,
};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., HTTP, disk).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    /// The external service could not be reached or answered with a failure
    /// status. The submission pipeline treats this as recoverable.
    #[error("Service unavailable: {0}")]
    Unavailable(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// The external quiz/results REST service the session core consumes.
#[async_trait]
pub trait QuizService: Send + Sync {
    /// Fetches a quiz definition when a session begins.
    async fn fetch_quiz(&self, quiz_id: QuizId) -> PortResult<Quiz>;

    /// Opens a server-side graded attempt for this user and quiz.
    async fn start_attempt(&self, quiz_id: QuizId, user_id: UserId) -> PortResult<AttemptId>;

    /// Posts the transformed answers for grading.
    async fn submit_answers(
        &self,
        attempt_id: AttemptId,
        answers: &[SubmittedAnswer],
    ) -> PortResult<GradedResult>;

    /// Fetches the detailed result for an attempt, used as a fallback when
    /// the submit response lacked the feedback block.
    async fn fetch_result(&self, attempt_id: AttemptId) -> PortResult<ResultDetail>;

    /// Fetches the user profile for the best-effort refresh after submission.
    async fn fetch_user(&self, user_id: UserId) -> PortResult<UserProfile>;
}

/// The client-side persistent state: one cached user profile plus locally
/// saved session outcomes.
#[async_trait]
pub trait LocalStore: Send + Sync {
    /// Loads the cached user profile; a missing or unreadable record is
    /// reported as `None`, not an error.
    async fn load_profile(&self) -> PortResult<Option<UserProfile>>;

    /// Overwrites the cached user profile.
    async fn save_profile(&self, profile: &UserProfile) -> PortResult<()>;

    /// The single entry point for readiness updates. Implementations must
    /// re-read the stored profile immediately before merging and writing,
    /// so a late-arriving update cannot clobber a newer record with stale
    /// in-memory state.
    async fn update_readiness(
        &self,
        user_id: UserId,
        snapshot: &ReadinessSnapshot,
    ) -> PortResult<()>;

    /// Persists a local copy of a finished session.
    async fn save_outcome(&self, outcome: &LocalOutcome) -> PortResult<()>;

    /// Loads the most recent locally saved outcome for this user and quiz.
    async fn load_outcome(&self, user_id: UserId, quiz_id: QuizId)
        -> PortResult<Option<LocalOutcome>>;
}
