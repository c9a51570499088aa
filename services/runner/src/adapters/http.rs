//! services/runner/src/adapters/http.rs
//!
//! This module contains the adapter for the external quiz/results REST
//! service. It implements the `QuizService` port from the `core` crate over
//! `reqwest`, translating the backend's JSON payloads into domain types.
//!
//! The backend is loosely typed: option lists arrive either as plain
//! strings or as `{ text, is_correct }` objects, the correct index may be
//! given directly or implied by an `is_correct` flag, and user records mix
//! snake_case and camelCase field names. All of that tolerance lives here
//! so the core never sees it.

use async_trait::async_trait;
use reqwest::{Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use assessment_core::domain::{
    AttemptId, AttemptSummary, CorrectAnswer, Feedback, GradedResult, Question, QuestionKind,
    Quiz, QuizId, QuizSummary, ReadinessSnapshot, ResultDetail, ScoreImpact, SubmittedAnswer,
    UpdatedGoal, UserId, UserProfile,
};
use assessment_core::ports::{PortError, PortResult, QuizService};

/// Time limit substituted when the backend omits a quiz duration.
const DEFAULT_DURATION_MINUTES: u32 = 30;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `QuizService` against the REST backend.
#[derive(Clone)]
pub struct HttpQuizAdapter {
    client: reqwest::Client,
    base_url: String,
}

impl HttpQuizAdapter {
    /// Creates a new adapter. The base URL is normalized by trimming any
    /// trailing slash so endpoint paths can be appended directly.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Decodes a successful response, or maps a failure status to a
    /// `PortError` carrying the backend's `detail`/`message` text when the
    /// body provides one.
    async fn decode<T: DeserializeOwned>(response: Response) -> PortResult<T> {
        let status = response.status();
        if status.is_success() {
            return response
                .json::<T>()
                .await
                .map_err(|e| PortError::Unexpected(format!("malformed response body: {e}")));
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.detail.or(b.message))
            .unwrap_or_else(|| format!("HTTP error! status: {status}"));

        if status == StatusCode::NOT_FOUND {
            Err(PortError::NotFound(message))
        } else {
            Err(PortError::Unavailable(message))
        }
    }
}

fn transport_error(e: reqwest::Error) -> PortError {
    PortError::Unavailable(e.to_string())
}

//=========================================================================================
// `QuizService` Trait Implementation
//=========================================================================================

#[async_trait]
impl QuizService for HttpQuizAdapter {
    async fn fetch_quiz(&self, quiz_id: QuizId) -> PortResult<Quiz> {
        debug!("Loading quiz {quiz_id}");
        let response = self
            .client
            .get(self.url(&format!("/quizzes/{quiz_id}")))
            .send()
            .await
            .map_err(transport_error)?;
        let dto: QuizDto = Self::decode(response).await?;
        let quiz = dto.into_domain();
        quiz.validate()
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(quiz)
    }

    async fn start_attempt(&self, quiz_id: QuizId, user_id: UserId) -> PortResult<AttemptId> {
        let response = self
            .client
            .post(self.url(&format!("/quizzes/{quiz_id}/start?user_id={user_id}")))
            .send()
            .await
            .map_err(transport_error)?;
        let dto: StartAttemptDto = Self::decode(response).await?;
        Ok(dto.attempt_id)
    }

    async fn submit_answers(
        &self,
        attempt_id: AttemptId,
        answers: &[SubmittedAnswer],
    ) -> PortResult<GradedResult> {
        let body = SubmitBody {
            answers: answers
                .iter()
                .map(|a| AnswerDto {
                    question_id: a.question_id,
                    selected_answer: a.selected_answer.clone(),
                })
                .collect(),
        };
        let response = self
            .client
            .post(self.url(&format!("/attempts/{attempt_id}/submit")))
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;
        let dto: GradedDto = Self::decode(response).await?;
        Ok(dto.into_domain())
    }

    async fn fetch_result(&self, attempt_id: AttemptId) -> PortResult<ResultDetail> {
        let response = self
            .client
            .get(self.url(&format!("/results/{attempt_id}")))
            .send()
            .await
            .map_err(transport_error)?;
        let dto: ResultDetailDto = Self::decode(response).await?;
        Ok(dto.into_domain())
    }

    async fn fetch_user(&self, user_id: UserId) -> PortResult<UserProfile> {
        let response = self
            .client
            .get(self.url(&format!("/users/{user_id}")))
            .send()
            .await
            .map_err(transport_error)?;
        let dto: UserDto = Self::decode(response).await?;
        Ok(dto.into_domain())
    }
}

//=========================================================================================
// Wire DTOs
//=========================================================================================

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: Option<String>,
    message: Option<String>,
}

#[derive(Debug, Serialize)]
struct SubmitBody {
    answers: Vec<AnswerDto>,
}

#[derive(Debug, Serialize)]
struct AnswerDto {
    question_id: i64,
    selected_answer: String,
}

#[derive(Debug, Deserialize)]
struct StartAttemptDto {
    attempt_id: i64,
}

#[derive(Debug, Deserialize)]
struct QuizDto {
    id: i64,
    title: String,
    #[serde(default)]
    description: String,
    duration: Option<u32>,
    #[serde(default)]
    questions: Vec<QuestionDto>,
}

impl QuizDto {
    fn into_domain(self) -> Quiz {
        Quiz {
            id: self.id,
            title: self.title,
            description: self.description,
            duration_minutes: self.duration.unwrap_or(DEFAULT_DURATION_MINUTES),
            questions: self
                .questions
                .into_iter()
                .enumerate()
                .map(|(idx, q)| q.into_domain(idx))
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct QuestionDto {
    id: Option<i64>,
    question: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    options: Vec<OptionDto>,
    correct_index: Option<usize>,
    correct_answer: Option<bool>,
    scenario: Option<String>,
    explanation: Option<String>,
}

/// Options arrive either as plain strings or as rich objects.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OptionDto {
    Text(String),
    Rich {
        text: String,
        #[serde(default)]
        is_correct: bool,
    },
}

impl QuestionDto {
    fn into_domain(self, position: usize) -> Question {
        let is_true_false = self.kind.as_deref() == Some("true-false");

        let mut flagged_correct = None;
        let options: Vec<String> = self
            .options
            .into_iter()
            .enumerate()
            .map(|(i, opt)| match opt {
                OptionDto::Text(text) => text,
                OptionDto::Rich { text, is_correct } => {
                    if is_correct && flagged_correct.is_none() {
                        flagged_correct = Some(i);
                    }
                    text
                }
            })
            .collect();

        let (kind, correct) = if is_true_false {
            (
                QuestionKind::TrueFalse,
                CorrectAnswer::Bool(self.correct_answer.unwrap_or(false)),
            )
        } else {
            // Prefer an explicit correct_index; otherwise the first option
            // flagged is_correct; otherwise index zero.
            let index = self.correct_index.or(flagged_correct).unwrap_or(0);
            (QuestionKind::MultipleChoice, CorrectAnswer::Choice(index))
        };

        Question {
            id: self.id.unwrap_or(position as i64 + 1),
            kind,
            prompt: self.question,
            options,
            correct,
            scenario: self.scenario,
            explanation: self.explanation,
        }
    }
}

#[derive(Debug, Deserialize)]
struct FeedbackDto {
    overall: Option<String>,
    #[serde(default)]
    recommendations: Vec<String>,
    #[serde(default)]
    strengths: Vec<String>,
    #[serde(default)]
    weaknesses: Vec<String>,
}

impl FeedbackDto {
    fn into_domain(self) -> Feedback {
        Feedback {
            overall: self.overall,
            recommendations: self.recommendations,
            strengths: self.strengths,
            weaknesses: self.weaknesses,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScoreImpactDto {
    category: String,
    #[serde(default)]
    old_score: f64,
    #[serde(default)]
    new_score: f64,
    #[serde(default)]
    increase: f64,
}

#[derive(Debug, Deserialize)]
struct UpdatedGoalDto {
    title: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    progress: f64,
    #[serde(default)]
    completed: bool,
}

#[derive(Debug, Deserialize)]
struct ReadinessDto {
    overall: f64,
    technical: f64,
    soft: f64,
}

#[derive(Debug, Deserialize)]
struct GradedDto {
    #[serde(default)]
    score: f64,
    #[serde(default)]
    correct: u32,
    passed: Option<bool>,
    feedback: Option<FeedbackDto>,
    #[serde(default)]
    score_impact: Vec<ScoreImpactDto>,
    #[serde(default)]
    updated_goals: Vec<UpdatedGoalDto>,
    readiness: Option<ReadinessDto>,
}

impl GradedDto {
    fn into_domain(self) -> GradedResult {
        GradedResult {
            score: self.score,
            correct: self.correct,
            passed: self.passed,
            feedback: self.feedback.map(FeedbackDto::into_domain),
            score_impact: self.score_impact.into_iter().map(score_impact).collect(),
            updated_goals: self.updated_goals.into_iter().map(updated_goal).collect(),
            readiness: self.readiness.map(readiness),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AttemptSummaryDto {
    #[serde(default)]
    score: f64,
    passed: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct QuizSummaryDto {
    title: String,
}

#[derive(Debug, Deserialize)]
struct ResultDetailDto {
    attempt: Option<AttemptSummaryDto>,
    quiz: Option<QuizSummaryDto>,
    feedback: Option<FeedbackDto>,
    #[serde(default)]
    score_impact: Vec<ScoreImpactDto>,
    #[serde(default)]
    updated_goals: Vec<UpdatedGoalDto>,
    readiness: Option<ReadinessDto>,
}

impl ResultDetailDto {
    fn into_domain(self) -> ResultDetail {
        ResultDetail {
            attempt: self.attempt.map(|a| AttemptSummary {
                score: a.score,
                passed: a.passed,
            }),
            quiz: self.quiz.map(|q| QuizSummary { title: q.title }),
            feedback: self.feedback.map(FeedbackDto::into_domain),
            score_impact: self.score_impact.into_iter().map(score_impact).collect(),
            updated_goals: self.updated_goals.into_iter().map(updated_goal).collect(),
            readiness: self.readiness.map(readiness),
        }
    }
}

fn score_impact(dto: ScoreImpactDto) -> ScoreImpact {
    ScoreImpact {
        category: dto.category,
        old_score: dto.old_score,
        new_score: dto.new_score,
        increase: dto.increase,
    }
}

fn updated_goal(dto: UpdatedGoalDto) -> UpdatedGoal {
    UpdatedGoal {
        title: dto.title,
        category: dto.category,
        progress: dto.progress,
        completed: dto.completed,
    }
}

fn readiness(dto: ReadinessDto) -> ReadinessSnapshot {
    ReadinessSnapshot {
        overall: dto.overall,
        technical: dto.technical,
        soft: dto.soft,
    }
}

/// The user record as the backend sends it: a mix of snake_case and
/// camelCase depending on which service produced it.
#[derive(Debug, Deserialize)]
struct UserDto {
    id: i64,
    #[serde(default)]
    email: String,
    name: Option<String>,
    full_name: Option<String>,
    #[serde(alias = "specializationId")]
    specialization_id: Option<i64>,
    preferred_specialization_id: Option<i64>,
    #[serde(alias = "readinessScore")]
    readiness_score: Option<f64>,
    #[serde(alias = "technicalScore")]
    technical_score: Option<f64>,
    #[serde(alias = "softSkillsScore")]
    soft_skills_score: Option<f64>,
    #[serde(alias = "leadershipScore")]
    leadership_score: Option<f64>,
}

impl UserDto {
    fn into_domain(self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email,
            name: self.name.or(self.full_name),
            specialization_id: self.preferred_specialization_id.or(self.specialization_id),
            readiness_score: self.readiness_score.unwrap_or(0.0),
            technical_score: self.technical_score.unwrap_or(0.0),
            soft_skills_score: self.soft_skills_score.unwrap_or(0.0),
            leadership_score: self.leadership_score.unwrap_or(0.0),
        }
    }
}
