//! Document store behind the vote coordinator.
//!
//! Both backends offer the same contract: keyed reads and writes, plus one
//! atomic read-modify-write transaction for votes that reads the target and
//! the voter's record, lets a [`VotePlan`] decide, and writes both back or
//! nothing. Conflicting transactions are retried here, up to
//! `max_attempts`, and surface as `TransactionConflict` once exhausted.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use crate::domain::{
    Answer, Bug, BugPage, FeedRequest, TargetRef, VoteOutcome, VotePlan, VoteRecord,
};
use brosolve_errors::AppError;

pub const DEFAULT_MAX_TRANSACTION_ATTEMPTS: u32 = 5;

#[derive(Clone)]
pub enum DocumentStore {
    Postgres(PostgresStore),
    Memory(MemoryStore),
}

impl DocumentStore {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Postgres(_) => "postgres",
            Self::Memory(_) => "memory",
        }
    }

    /// Runs the vote transaction for `voter_id` on `target`.
    pub async fn apply_vote(
        &self,
        voter_id: &str,
        target: &TargetRef,
        plan: VotePlan,
    ) -> Result<VoteOutcome, AppError> {
        match self {
            Self::Postgres(store) => store.apply_vote(voter_id, target, plan).await,
            Self::Memory(store) => store.apply_vote(voter_id, target, plan).await,
        }
    }

    pub async fn find_vote(
        &self,
        voter_id: &str,
        target_id: &str,
    ) -> Result<Option<VoteRecord>, AppError> {
        match self {
            Self::Postgres(store) => store.find_vote(voter_id, target_id).await,
            Self::Memory(store) => store.find_vote(voter_id, target_id),
        }
    }

    pub async fn insert_bug(&self, bug: &Bug) -> Result<(), AppError> {
        match self {
            Self::Postgres(store) => store.insert_bug(bug).await,
            Self::Memory(store) => store.insert_bug(bug),
        }
    }

    /// Fails with `NotFound` when the parent bug does not exist.
    pub async fn insert_answer(&self, answer: &Answer) -> Result<(), AppError> {
        match self {
            Self::Postgres(store) => store.insert_answer(answer).await,
            Self::Memory(store) => store.insert_answer(answer),
        }
    }

    pub async fn find_bug(&self, id: &str) -> Result<Option<Bug>, AppError> {
        match self {
            Self::Postgres(store) => store.find_bug(id).await,
            Self::Memory(store) => store.find_bug(id),
        }
    }

    /// Answers under `bug_id`, newest first.
    pub async fn list_answers(&self, bug_id: &str) -> Result<Vec<Answer>, AppError> {
        match self {
            Self::Postgres(store) => store.list_answers(bug_id).await,
            Self::Memory(store) => store.list_answers(bug_id),
        }
    }

    pub async fn find_answer(&self, bug_id: &str, id: &str) -> Result<Option<Answer>, AppError> {
        match self {
            Self::Postgres(store) => store.find_answer(bug_id, id).await,
            Self::Memory(store) => store.find_answer(bug_id, id),
        }
    }

    /// One page of the bug feed, newest first.
    pub async fn list_bugs(&self, request: &FeedRequest) -> Result<BugPage, AppError> {
        match self {
            Self::Postgres(store) => store.list_bugs(request).await,
            Self::Memory(store) => store.list_bugs(request),
        }
    }

    /// Rewrites the bug's text fields. The stored vote count is untouched.
    pub async fn update_bug(&self, edited: &Bug) -> Result<Bug, AppError> {
        match self {
            Self::Postgres(store) => store.update_bug(edited).await,
            Self::Memory(store) => store.update_bug(edited),
        }
    }

    pub async fn update_answer(&self, edited: &Answer) -> Result<Answer, AppError> {
        match self {
            Self::Postgres(store) => store.update_answer(edited).await,
            Self::Memory(store) => store.update_answer(edited),
        }
    }

    /// Deletes the bug with its answers and every vote record on them.
    pub async fn delete_bug(&self, id: &str) -> Result<(), AppError> {
        match self {
            Self::Postgres(store) => store.delete_bug(id).await,
            Self::Memory(store) => store.delete_bug(id),
        }
    }

    /// Deletes the answer and every vote record on it.
    pub async fn delete_answer(&self, bug_id: &str, id: &str) -> Result<(), AppError> {
        match self {
            Self::Postgres(store) => store.delete_answer(bug_id, id).await,
            Self::Memory(store) => store.delete_answer(bug_id, id),
        }
    }
}

impl From<MemoryStore> for DocumentStore {
    fn from(store: MemoryStore) -> Self {
        Self::Memory(store)
    }
}

impl From<PostgresStore> for DocumentStore {
    fn from(store: PostgresStore) -> Self {
        Self::Postgres(store)
    }
}
