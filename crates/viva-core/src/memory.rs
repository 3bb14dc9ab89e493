//! In-memory store implementations.
//!
//! Used by the CLI simulator and the test suites. The attempt store
//! implements the same expected-version write contract a database-backed
//! store would, so optimistic-concurrency behavior is exercised everywhere.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::CoreError;
use crate::model::{Attempt, AttemptStatus, InterviewConfig, UserDisplay};
use crate::traits::{AttemptStore, InterviewStore, UserStore};

/// Interview configurations held in a map.
#[derive(Default)]
pub struct InMemoryInterviewStore {
    inner: Mutex<HashMap<Uuid, InterviewConfig>>,
}

impl InMemoryInterviewStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, interview: InterviewConfig) {
        self.inner.lock().unwrap().insert(interview.id, interview);
    }
}

#[async_trait]
impl InterviewStore for InMemoryInterviewStore {
    async fn get(&self, id: Uuid) -> Result<Option<InterviewConfig>, CoreError> {
        Ok(self.inner.lock().unwrap().get(&id).cloned())
    }

    async fn increment_participant_count(&self, id: Uuid) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().unwrap();
        let interview = inner
            .get_mut(&id)
            .ok_or(CoreError::NotFound("interview"))?;
        interview.participant_count += 1;
        Ok(())
    }
}

/// Attempts held in a map, with versioned compare-and-swap updates.
#[derive(Default)]
pub struct InMemoryAttemptStore {
    inner: Mutex<HashMap<Uuid, Attempt>>,
}

impl InMemoryAttemptStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AttemptStore for InMemoryAttemptStore {
    async fn get(&self, id: Uuid) -> Result<Option<Attempt>, CoreError> {
        Ok(self.inner.lock().unwrap().get(&id).cloned())
    }

    async fn insert(&self, attempt: Attempt) -> Result<(), CoreError> {
        self.inner.lock().unwrap().insert(attempt.id, attempt);
        Ok(())
    }

    async fn update(&self, mut attempt: Attempt, expected_version: u64) -> Result<(), CoreError> {
        let mut inner = self.inner.lock().unwrap();
        let current = inner
            .get(&attempt.id)
            .ok_or(CoreError::NotFound("attempt"))?;
        if current.version != expected_version {
            return Err(CoreError::Conflict("attempt"));
        }
        attempt.version = expected_version + 1;
        inner.insert(attempt.id, attempt);
        Ok(())
    }

    async fn find_in_progress(
        &self,
        interview_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Attempt>, CoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .find(|a| {
                a.interview_id == interview_id
                    && a.user_id == user_id
                    && a.status == AttemptStatus::InProgress
            })
            .cloned())
    }

    async fn count_completed(
        &self,
        interview_id: Uuid,
        user_id: Uuid,
    ) -> Result<u64, CoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|a| {
                a.interview_id == interview_id
                    && a.user_id == user_id
                    && a.status == AttemptStatus::Completed
            })
            .count() as u64)
    }

    async fn list_completed(&self, interview_id: Uuid) -> Result<Vec<Attempt>, CoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.interview_id == interview_id && a.status == AttemptStatus::Completed)
            .cloned()
            .collect())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Attempt>, CoreError> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .values()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// User display identities held in a map.
#[derive(Default)]
pub struct InMemoryUserStore {
    inner: Mutex<HashMap<Uuid, UserDisplay>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: Uuid, display: UserDisplay) {
        self.inner.lock().unwrap().insert(id, display);
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn display(&self, id: Uuid) -> Result<Option<UserDisplay>, CoreError> {
        Ok(self.inner.lock().unwrap().get(&id).cloned())
    }
}
