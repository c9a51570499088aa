pub mod domain;
pub mod ports;
pub mod reconcile;
pub mod scoring;
pub mod session;

pub use domain::{
    AnswerMap, AnswerValue, AttemptId, CorrectAnswer, Feedback, GradedResult, LocalOutcome,
    Question, QuestionId, QuestionKind, Quiz, QuizError, QuizId, ReadinessSnapshot, ResultDetail,
    ScoreImpact, SubmittedAnswer, UpdatedGoal, UserId, UserProfile,
};
pub use ports::{LocalStore, PortError, PortResult, QuizService};
pub use reconcile::{ResultOrigin, ResultSources, ResultView};
pub use session::{SubmissionSnapshot, SubmitTrigger, TestSession};
