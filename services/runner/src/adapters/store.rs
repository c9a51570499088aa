//! services/runner/src/adapters/store.rs
//!
//! This module contains the adapter for the client-side persisted state.
//! It implements the `LocalStore` port against a plain JSON state directory,
//! the runner's stand-in for the browser-local storage the web client used:
//! one cached user profile plus one saved outcome per (user, quiz) pair.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::warn;

use assessment_core::domain::{
    AnswerValue, LocalOutcome, QuizId, ReadinessSnapshot, UserId, UserProfile,
};
use assessment_core::ports::{LocalStore, PortError, PortResult};

const PROFILE_FILE: &str = "profile.json";

/// A `LocalStore` over a directory of JSON files.
#[derive(Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn profile_path(&self) -> PathBuf {
        self.dir.join(PROFILE_FILE)
    }

    fn outcome_path(&self, user_id: UserId, quiz_id: QuizId) -> PathBuf {
        self.dir.join(format!("outcome-{user_id}-{quiz_id}.json"))
    }

    async fn ensure_dir(&self) -> PortResult<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| PortError::Unexpected(format!("cannot create state dir: {e}")))
    }

    /// Reads and decodes a JSON file. A missing file is `None`; a corrupt
    /// one is logged and also treated as absent rather than failing the
    /// caller, matching how the web client shrugged off malformed storage.
    async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> PortResult<Option<T>> {
        let raw = match tokio::fs::read_to_string(path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(PortError::Unexpected(format!("cannot read {path:?}: {e}"))),
        };
        match serde_json::from_str(&raw) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!("Discarding malformed state file {path:?}: {e}");
                Ok(None)
            }
        }
    }

    async fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> PortResult<()> {
        self.ensure_dir().await?;
        let raw = serde_json::to_string_pretty(value)
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        tokio::fs::write(path, raw)
            .await
            .map_err(|e| PortError::Unexpected(format!("cannot write {path:?}: {e}")))
    }
}

#[async_trait]
impl LocalStore for FileStore {
    async fn load_profile(&self) -> PortResult<Option<UserProfile>> {
        let record: Option<ProfileRecord> = Self::read_json(&self.profile_path()).await?;
        Ok(record.map(ProfileRecord::into_domain))
    }

    async fn save_profile(&self, profile: &UserProfile) -> PortResult<()> {
        self.write_json(&self.profile_path(), &ProfileRecord::from_domain(profile))
            .await
    }

    async fn update_readiness(
        &self,
        user_id: UserId,
        snapshot: &ReadinessSnapshot,
    ) -> PortResult<()> {
        // Re-read from disk right before merging so a concurrent flow's
        // write is not clobbered by stale in-memory state.
        let Some(mut profile) = self.load_profile().await? else {
            return Ok(());
        };
        if profile.id != user_id {
            return Ok(());
        }
        profile.apply_readiness(snapshot);
        self.save_profile(&profile).await
    }

    async fn save_outcome(&self, outcome: &LocalOutcome) -> PortResult<()> {
        self.write_json(
            &self.outcome_path(outcome.user_id, outcome.quiz_id),
            &OutcomeRecord::from_domain(outcome),
        )
        .await
    }

    async fn load_outcome(
        &self,
        user_id: UserId,
        quiz_id: QuizId,
    ) -> PortResult<Option<LocalOutcome>> {
        let record: Option<OutcomeRecord> =
            Self::read_json(&self.outcome_path(user_id, quiz_id)).await?;
        Ok(record.map(OutcomeRecord::into_domain))
    }
}

//=========================================================================================
// Persisted Records
//=========================================================================================

#[derive(Debug, Serialize, Deserialize)]
struct ProfileRecord {
    id: i64,
    email: String,
    name: Option<String>,
    specialization_id: Option<i64>,
    readiness_score: f64,
    technical_score: f64,
    soft_skills_score: f64,
    leadership_score: f64,
}

impl ProfileRecord {
    fn from_domain(profile: &UserProfile) -> Self {
        Self {
            id: profile.id,
            email: profile.email.clone(),
            name: profile.name.clone(),
            specialization_id: profile.specialization_id,
            readiness_score: profile.readiness_score,
            technical_score: profile.technical_score,
            soft_skills_score: profile.soft_skills_score,
            leadership_score: profile.leadership_score,
        }
    }

    fn into_domain(self) -> UserProfile {
        UserProfile {
            id: self.id,
            email: self.email,
            name: self.name,
            specialization_id: self.specialization_id,
            readiness_score: self.readiness_score,
            technical_score: self.technical_score,
            soft_skills_score: self.soft_skills_score,
            leadership_score: self.leadership_score,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum AnswerRecord {
    Bool(bool),
    Choice(usize),
}

#[derive(Debug, Serialize, Deserialize)]
struct OutcomeRecord {
    id: uuid::Uuid,
    user_id: i64,
    quiz_id: i64,
    score: f64,
    passed: bool,
    correct: u32,
    total: u32,
    answers: HashMap<i64, AnswerRecord>,
    elapsed_seconds: u64,
    completed_at: chrono::DateTime<chrono::Utc>,
}

impl OutcomeRecord {
    fn from_domain(outcome: &LocalOutcome) -> Self {
        Self {
            id: outcome.id,
            user_id: outcome.user_id,
            quiz_id: outcome.quiz_id,
            score: outcome.score,
            passed: outcome.passed,
            correct: outcome.correct,
            total: outcome.total,
            answers: outcome
                .answers
                .iter()
                .map(|(&q, &a)| {
                    let record = match a {
                        AnswerValue::Bool(b) => AnswerRecord::Bool(b),
                        AnswerValue::Choice(i) => AnswerRecord::Choice(i),
                    };
                    (q, record)
                })
                .collect(),
            elapsed_seconds: outcome.elapsed_seconds,
            completed_at: outcome.completed_at,
        }
    }

    fn into_domain(self) -> LocalOutcome {
        LocalOutcome {
            id: self.id,
            user_id: self.user_id,
            quiz_id: self.quiz_id,
            score: self.score,
            passed: self.passed,
            correct: self.correct,
            total: self.total,
            answers: self
                .answers
                .into_iter()
                .map(|(q, a)| {
                    let value = match a {
                        AnswerRecord::Bool(b) => AnswerValue::Bool(b),
                        AnswerRecord::Choice(i) => AnswerValue::Choice(i),
                    };
                    (q, value)
                })
                .collect(),
            elapsed_seconds: self.elapsed_seconds,
            completed_at: self.completed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assessment_core::domain::AnswerMap;
    use chrono::Utc;
    use uuid::Uuid;

    fn temp_store() -> FileStore {
        let dir = std::env::temp_dir().join(format!("assessment-store-{}", Uuid::new_v4()));
        FileStore::new(dir)
    }

    fn profile(id: i64) -> UserProfile {
        UserProfile {
            id,
            email: "user@example.com".into(),
            name: Some("Test User".into()),
            specialization_id: Some(4),
            readiness_score: 55.0,
            technical_score: 50.0,
            soft_skills_score: 60.0,
            leadership_score: 45.0,
        }
    }

    #[tokio::test]
    async fn profile_round_trips() {
        let store = temp_store();
        assert!(store.load_profile().await.unwrap().is_none());

        let original = profile(7);
        store.save_profile(&original).await.unwrap();
        let loaded = store.load_profile().await.unwrap().unwrap();
        assert_eq!(loaded, original);
    }

    #[tokio::test]
    async fn update_readiness_merges_into_stored_profile() {
        let store = temp_store();
        store.save_profile(&profile(7)).await.unwrap();

        store
            .update_readiness(
                7,
                &ReadinessSnapshot {
                    overall: 71.6,
                    technical: 64.2,
                    soft: 70.0,
                },
            )
            .await
            .unwrap();

        let updated = store.load_profile().await.unwrap().unwrap();
        assert_eq!(updated.readiness_score, 72.0);
        assert_eq!(updated.technical_score, 64.0);
        assert_eq!(updated.soft_skills_score, 70.0);
        // Leadership untouched by the snapshot.
        assert_eq!(updated.leadership_score, 45.0);
    }

    #[tokio::test]
    async fn update_readiness_ignores_mismatched_user() {
        let store = temp_store();
        store.save_profile(&profile(7)).await.unwrap();

        store
            .update_readiness(
                99,
                &ReadinessSnapshot {
                    overall: 1.0,
                    technical: 1.0,
                    soft: 1.0,
                },
            )
            .await
            .unwrap();

        let unchanged = store.load_profile().await.unwrap().unwrap();
        assert_eq!(unchanged.readiness_score, 55.0);
    }

    #[tokio::test]
    async fn update_readiness_is_a_no_op_without_a_profile() {
        let store = temp_store();
        let result = store
            .update_readiness(
                7,
                &ReadinessSnapshot {
                    overall: 1.0,
                    technical: 1.0,
                    soft: 1.0,
                },
            )
            .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn outcome_round_trips_with_answer_map() {
        let store = temp_store();
        let mut answers = AnswerMap::new();
        answers.insert(1, AnswerValue::Choice(2));
        answers.insert(2, AnswerValue::Bool(true));

        let outcome = LocalOutcome {
            id: Uuid::new_v4(),
            user_id: 7,
            quiz_id: 3,
            score: 67.0,
            passed: false,
            correct: 2,
            total: 3,
            answers,
            elapsed_seconds: 95,
            completed_at: Utc::now(),
        };
        store.save_outcome(&outcome).await.unwrap();

        let loaded = store.load_outcome(7, 3).await.unwrap().unwrap();
        assert_eq!(loaded.score, 67.0);
        assert_eq!(loaded.answers.get(&1), Some(&AnswerValue::Choice(2)));
        assert_eq!(loaded.answers.get(&2), Some(&AnswerValue::Bool(true)));

        assert!(store.load_outcome(7, 99).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn malformed_profile_is_treated_as_absent() {
        let store = temp_store();
        tokio::fs::create_dir_all(&store.dir).await.unwrap();
        tokio::fs::write(store.profile_path(), "{not json")
            .await
            .unwrap();
        assert!(store.load_profile().await.unwrap().is_none());
    }
}
