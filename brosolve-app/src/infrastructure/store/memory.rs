use super::DEFAULT_MAX_TRANSACTION_ATTEMPTS;
use crate::domain::feed::feed_order;
use crate::domain::ledger::{LedgerDecision, RecordAction};
use crate::domain::{
    Answer, Bug, BugPage, FeedRequest, TargetRef, VoteOutcome, VotePlan, VoteRecord, VoteSnapshot,
};
use brosolve_errors::AppError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-process store with optimistic transactions: a vote transaction reads
/// the target's version, decides outside the lock, and commits only if the
/// target has not moved in between.
#[derive(Clone)]
pub struct MemoryStore {
    documents: Arc<Mutex<Documents>>,
    max_attempts: u32,
}

#[derive(Default)]
struct Documents {
    bugs: HashMap<String, Bug>,
    /// bug id -> answer id -> answer
    answers: HashMap<String, HashMap<String, Answer>>,
    votes: HashMap<VoteKey, VoteRecord>,
    /// Stamp of the last write to each live target. Vote records only change
    /// together with their target's count, so the target stamp covers both.
    versions: HashMap<TargetKey, u64>,
    /// Source of stamps. Never reused, so a target deleted and created again
    /// under the same id does not match a stale read.
    generation: u64,
}

type VoteKey = (String, String);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum TargetKey {
    Bug(String),
    Answer(String, String),
}

impl TargetKey {
    fn of(target: &TargetRef) -> Self {
        match target {
            TargetRef::Bug { id } => Self::Bug(id.clone()),
            TargetRef::Answer { bug_id, id } => Self::Answer(bug_id.clone(), id.clone()),
        }
    }
}

/// What a transaction saw, with the target version it must still match at
/// commit.
#[derive(Debug, Clone)]
struct ReadSet {
    target_version: u64,
    current_count: i32,
    previous: Option<VoteRecord>,
}

impl Documents {
    fn stamp(&mut self, key: TargetKey) {
        self.generation += 1;
        self.versions.insert(key, self.generation);
    }

    fn target_votes(&self, target: &TargetRef) -> Option<i32> {
        match target {
            TargetRef::Bug { id } => self.bugs.get(id).map(|b| b.votes),
            TargetRef::Answer { bug_id, id } => self
                .answers
                .get(bug_id)
                .and_then(|answers| answers.get(id))
                .map(|a| a.votes),
        }
    }

    fn set_target_votes(&mut self, target: &TargetRef, votes: i32) {
        let now = Some(chrono::Utc::now());
        match target {
            TargetRef::Bug { id } => {
                if let Some(bug) = self.bugs.get_mut(id) {
                    bug.votes = votes;
                    bug.updated_at = now;
                }
            }
            TargetRef::Answer { bug_id, id } => {
                if let Some(answer) = self.answers.get_mut(bug_id).and_then(|a| a.get_mut(id)) {
                    answer.votes = votes;
                    answer.updated_at = now;
                }
            }
        }
        self.stamp(TargetKey::of(target));
    }

    /// Drops every vote record on `target_id`. Returns how many went.
    fn drop_votes_on(&mut self, target_id: &str) -> usize {
        let before = self.votes.len();
        self.votes.retain(|(_, target), _| target != target_id);
        before - self.votes.len()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            documents: Arc::new(Mutex::new(Documents::default())),
            max_attempts: DEFAULT_MAX_TRANSACTION_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    fn documents(&self) -> Result<MutexGuard<'_, Documents>, AppError> {
        self.documents
            .lock()
            .map_err(|_| AppError::Internal("memory store lock poisoned".to_string()))
    }

    pub async fn apply_vote(
        &self,
        voter_id: &str,
        target: &TargetRef,
        plan: VotePlan,
    ) -> Result<VoteOutcome, AppError> {
        for attempt in 1..=self.max_attempts {
            let read = self.read(voter_id, target)?;
            let (decision, new_count) = plan.resolve(VoteSnapshot {
                current_count: read.current_count,
                previous: read.previous.as_ref().map(|r| r.direction),
            });

            if self.commit(voter_id, target, read, decision, new_count)? {
                return Ok(VoteOutcome {
                    new_vote_count: new_count,
                    user_vote: decision.applied,
                });
            }

            tracing::debug!(
                "Vote transaction conflict on {} (attempt {}/{})",
                target.id(),
                attempt,
                self.max_attempts
            );
            tokio::task::yield_now().await;
        }

        tracing::error!(
            "Vote transaction on {} gave up after {} attempts",
            target.id(),
            self.max_attempts
        );
        Err(AppError::TransactionConflict(self.max_attempts))
    }

    fn read(&self, voter_id: &str, target: &TargetRef) -> Result<ReadSet, AppError> {
        let docs = self.documents()?;
        let not_found = || AppError::NotFound(target.label().to_string());
        let current_count = docs.target_votes(target).ok_or_else(not_found)?;
        let target_version = docs
            .versions
            .get(&TargetKey::of(target))
            .copied()
            .ok_or_else(not_found)?;

        Ok(ReadSet {
            target_version,
            current_count,
            previous: docs
                .votes
                .get(&(voter_id.to_string(), target.id().to_string()))
                .cloned(),
        })
    }

    /// Returns `Ok(false)` without writing anything when the target changed
    /// or disappeared since `read`.
    fn commit(
        &self,
        voter_id: &str,
        target: &TargetRef,
        read: ReadSet,
        decision: LedgerDecision,
        new_count: i32,
    ) -> Result<bool, AppError> {
        let mut docs = self.documents()?;
        if docs.versions.get(&TargetKey::of(target)) != Some(&read.target_version) {
            return Ok(false);
        }

        let key = (voter_id.to_string(), target.id().to_string());
        let now = chrono::Utc::now();
        match decision.action {
            RecordAction::Keep => {}
            RecordAction::Delete => {
                docs.votes.remove(&key);
            }
            RecordAction::Write(direction) => {
                let record = match read.previous {
                    Some(record) => record.redirected(direction, now),
                    None => VoteRecord::new(voter_id, target, direction, now),
                };
                docs.votes.insert(key, record);
            }
        }
        docs.set_target_votes(target, new_count);

        Ok(true)
    }

    pub fn find_vote(&self, voter_id: &str, target_id: &str) -> Result<Option<VoteRecord>, AppError> {
        let docs = self.documents()?;
        Ok(docs
            .votes
            .get(&(voter_id.to_string(), target_id.to_string()))
            .cloned())
    }

    pub fn insert_bug(&self, bug: &Bug) -> Result<(), AppError> {
        let mut docs = self.documents()?;
        docs.bugs.insert(bug.id.clone(), bug.clone());
        docs.stamp(TargetKey::Bug(bug.id.clone()));
        Ok(())
    }

    pub fn insert_answer(&self, answer: &Answer) -> Result<(), AppError> {
        let mut docs = self.documents()?;
        if !docs.bugs.contains_key(&answer.bug_id) {
            return Err(AppError::NotFound("Bug".to_string()));
        }
        docs.answers
            .entry(answer.bug_id.clone())
            .or_default()
            .insert(answer.id.clone(), answer.clone());
        docs.stamp(TargetKey::Answer(answer.bug_id.clone(), answer.id.clone()));
        Ok(())
    }

    pub fn find_bug(&self, id: &str) -> Result<Option<Bug>, AppError> {
        Ok(self.documents()?.bugs.get(id).cloned())
    }

    pub fn list_answers(&self, bug_id: &str) -> Result<Vec<Answer>, AppError> {
        let docs = self.documents()?;
        let mut answers: Vec<Answer> = docs
            .answers
            .get(bug_id)
            .map(|a| a.values().cloned().collect())
            .unwrap_or_default();
        answers.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(answers)
    }

    pub fn find_answer(&self, bug_id: &str, id: &str) -> Result<Option<Answer>, AppError> {
        let docs = self.documents()?;
        Ok(docs
            .answers
            .get(bug_id)
            .and_then(|answers| answers.get(id))
            .cloned())
    }

    pub fn list_bugs(&self, request: &FeedRequest) -> Result<BugPage, AppError> {
        let docs = self.documents()?;
        let mut bugs: Vec<Bug> = docs
            .bugs
            .values()
            .filter(|bug| request.filter.matches(bug))
            .filter(|bug| request.cursor.as_ref().map_or(true, |c| c.precedes(bug)))
            .cloned()
            .collect();
        bugs.sort_by(feed_order);
        bugs.truncate(request.limit as usize + 1);
        Ok(BugPage::from_window(bugs, request.limit))
    }

    /// Rewrites title, description and tags. The vote count is left alone.
    pub fn update_bug(&self, edited: &Bug) -> Result<Bug, AppError> {
        let mut docs = self.documents()?;
        let bug = docs
            .bugs
            .get_mut(&edited.id)
            .ok_or_else(|| AppError::NotFound("Bug".to_string()))?;
        bug.title = edited.title.clone();
        bug.description = edited.description.clone();
        bug.tags = edited.tags.clone();
        bug.updated_at = edited.updated_at;
        Ok(bug.clone())
    }

    pub fn update_answer(&self, edited: &Answer) -> Result<Answer, AppError> {
        let mut docs = self.documents()?;
        let answer = docs
            .answers
            .get_mut(&edited.bug_id)
            .and_then(|answers| answers.get_mut(&edited.id))
            .ok_or_else(|| AppError::NotFound("Answer".to_string()))?;
        answer.content = edited.content.clone();
        answer.updated_at = edited.updated_at;
        Ok(answer.clone())
    }

    /// Removes the bug, its answers, and every vote on any of them.
    pub fn delete_bug(&self, id: &str) -> Result<(), AppError> {
        let mut docs = self.documents()?;
        if docs.bugs.remove(id).is_none() {
            return Err(AppError::NotFound("Bug".to_string()));
        }
        docs.versions.remove(&TargetKey::Bug(id.to_string()));

        let mut dropped = docs.drop_votes_on(id);
        let answers = docs.answers.remove(id).unwrap_or_default();
        for answer_id in answers.keys() {
            dropped += docs.drop_votes_on(answer_id);
            docs.versions
                .remove(&TargetKey::Answer(id.to_string(), answer_id.clone()));
        }

        tracing::debug!(
            "Deleted bug {} with {} answers and {} votes",
            id,
            answers.len(),
            dropped
        );
        Ok(())
    }

    pub fn delete_answer(&self, bug_id: &str, id: &str) -> Result<(), AppError> {
        let mut docs = self.documents()?;
        let removed = docs
            .answers
            .get_mut(bug_id)
            .and_then(|answers| answers.remove(id));
        if removed.is_none() {
            return Err(AppError::NotFound("Answer".to_string()));
        }
        docs.versions
            .remove(&TargetKey::Answer(bug_id.to_string(), id.to_string()));
        let dropped = docs.drop_votes_on(id);

        tracing::debug!("Deleted answer {} on bug {} with {} votes", id, bug_id, dropped);
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}
