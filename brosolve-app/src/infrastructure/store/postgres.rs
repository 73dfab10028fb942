use super::DEFAULT_MAX_TRANSACTION_ATTEMPTS;
use crate::domain::ledger::RecordAction;
use crate::domain::{
    Answer, Bug, BugPage, FeedRequest, TargetRef, VoteOutcome, VotePlan, VoteRecord, VoteSnapshot,
};
use crate::infrastructure::db::entities::{answer, bug, vote};
use crate::infrastructure::db::{AnswerRepository, BugRepository, VoteRepository};
use brosolve_errors::AppError;
use sea_orm::{DatabaseConnection, DatabaseTransaction, DbErr, SqlErr, TransactionTrait};

#[derive(Clone)]
pub struct PostgresStore {
    db: DatabaseConnection,
    bugs: BugRepository,
    answers: AnswerRepository,
    votes: VoteRepository,
    max_attempts: u32,
}

/// Why a single transaction attempt failed.
enum AttemptError {
    /// Lost a race with another transaction; safe to run again.
    Conflict(DbErr),
    Abort(AppError),
}

impl From<DbErr> for AttemptError {
    fn from(err: DbErr) -> Self {
        if is_conflict(&err) {
            Self::Conflict(err)
        } else {
            Self::Abort(store_error(err))
        }
    }
}

impl From<AppError> for AttemptError {
    fn from(err: AppError) -> Self {
        Self::Abort(err)
    }
}

impl PostgresStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self {
            bugs: BugRepository::new(db.clone()),
            answers: AnswerRepository::new(db.clone()),
            votes: VoteRepository::new(db.clone()),
            db,
            max_attempts: DEFAULT_MAX_TRANSACTION_ATTEMPTS,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    pub async fn apply_vote(
        &self,
        voter_id: &str,
        target: &TargetRef,
        plan: VotePlan,
    ) -> Result<VoteOutcome, AppError> {
        for attempt in 1..=self.max_attempts {
            match self.attempt_vote(voter_id, target, plan).await {
                Ok(outcome) => return Ok(outcome),
                Err(AttemptError::Conflict(e)) => {
                    tracing::debug!(
                        "Vote transaction conflict on {} (attempt {}/{}): {}",
                        target.id(),
                        attempt,
                        self.max_attempts,
                        e
                    );
                }
                Err(AttemptError::Abort(e)) => return Err(e),
            }
        }

        tracing::error!(
            "Vote transaction on {} gave up after {} attempts",
            target.id(),
            self.max_attempts
        );
        Err(AppError::TransactionConflict(self.max_attempts))
    }

    async fn attempt_vote(
        &self,
        voter_id: &str,
        target: &TargetRef,
        plan: VotePlan,
    ) -> Result<VoteOutcome, AttemptError> {
        let txn = self.db.begin().await?;
        match self.vote_in_txn(&txn, voter_id, target, plan).await {
            Ok(outcome) => {
                txn.commit().await?;
                Ok(outcome)
            }
            Err(e) => {
                rollback(txn).await;
                Err(e)
            }
        }
    }

    async fn vote_in_txn(
        &self,
        txn: &DatabaseTransaction,
        voter_id: &str,
        target: &TargetRef,
        plan: VotePlan,
    ) -> Result<VoteOutcome, AttemptError> {
        // Target row lock first: every vote on the same target queues here
        let current_count = match target {
            TargetRef::Bug { id } => self.bugs.find_for_update(txn, id).await?.map(|b| b.votes),
            TargetRef::Answer { bug_id, id } => self
                .answers
                .find_for_update(txn, bug_id, id)
                .await?
                .map(|a| a.votes),
        }
        .ok_or_else(|| AppError::NotFound(target.label().to_string()))?;

        let previous = match self.votes.find_in(txn, voter_id, target.id()).await? {
            Some(model) => Some(VoteRecord::try_from(model)?),
            None => None,
        };

        let (decision, new_count) = plan.resolve(VoteSnapshot {
            current_count,
            previous: previous.as_ref().map(|r| r.direction),
        });

        let now = chrono::Utc::now();
        match decision.action {
            RecordAction::Keep => {}
            RecordAction::Delete => self.votes.delete(txn, voter_id, target.id()).await?,
            RecordAction::Write(direction) => {
                let exists = previous.is_some();
                let record = match previous {
                    Some(record) => record.redirected(direction, now),
                    None => VoteRecord::new(voter_id, target, direction, now),
                };
                self.votes.write(txn, &record, exists).await?;
            }
        }

        match target {
            TargetRef::Bug { id } => self.bugs.set_votes(txn, id, new_count).await?,
            TargetRef::Answer { id, .. } => self.answers.set_votes(txn, id, new_count).await?,
        }

        Ok(VoteOutcome {
            new_vote_count: new_count,
            user_vote: decision.applied,
        })
    }

    pub async fn find_vote(
        &self,
        voter_id: &str,
        target_id: &str,
    ) -> Result<Option<VoteRecord>, AppError> {
        self.votes
            .find(voter_id, target_id)
            .await
            .map_err(store_error)?
            .map(VoteRecord::try_from)
            .transpose()
    }

    pub async fn insert_bug(&self, bug: &Bug) -> Result<(), AppError> {
        self.bugs.create(bug).await.map_err(store_error)?;
        Ok(())
    }

    pub async fn insert_answer(&self, answer: &Answer) -> Result<(), AppError> {
        if self
            .bugs
            .find_by_id(&answer.bug_id)
            .await
            .map_err(store_error)?
            .is_none()
        {
            return Err(AppError::NotFound("Bug".to_string()));
        }
        self.answers.create(answer).await.map_err(store_error)?;
        Ok(())
    }

    pub async fn find_bug(&self, id: &str) -> Result<Option<Bug>, AppError> {
        Ok(self
            .bugs
            .find_by_id(id)
            .await
            .map_err(store_error)?
            .map(Bug::from))
    }

    pub async fn list_answers(&self, bug_id: &str) -> Result<Vec<Answer>, AppError> {
        Ok(self
            .answers
            .list_for_bug(bug_id)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(Answer::from)
            .collect())
    }

    pub async fn find_answer(&self, bug_id: &str, id: &str) -> Result<Option<Answer>, AppError> {
        Ok(self
            .answers
            .find(bug_id, id)
            .await
            .map_err(store_error)?
            .map(Answer::from))
    }

    pub async fn list_bugs(&self, request: &FeedRequest) -> Result<BugPage, AppError> {
        let window = self
            .bugs
            .list_page(request)
            .await
            .map_err(store_error)?
            .into_iter()
            .map(Bug::from)
            .collect();
        Ok(BugPage::from_window(window, request.limit))
    }

    pub async fn update_bug(&self, edited: &Bug) -> Result<Bug, AppError> {
        match self.bugs.update_content(edited).await {
            Ok(model) => Ok(Bug::from(model)),
            Err(DbErr::RecordNotUpdated) => Err(AppError::NotFound("Bug".to_string())),
            Err(e) => Err(store_error(e)),
        }
    }

    pub async fn update_answer(&self, edited: &Answer) -> Result<Answer, AppError> {
        match self.answers.update_content(edited).await {
            Ok(model) => Ok(Answer::from(model)),
            Err(DbErr::RecordNotUpdated) => Err(AppError::NotFound("Answer".to_string())),
            Err(e) => Err(store_error(e)),
        }
    }

    /// Removes the bug, its answers, and every vote on any of them in one
    /// transaction.
    pub async fn delete_bug(&self, id: &str) -> Result<(), AppError> {
        let txn = self.db.begin().await.map_err(store_error)?;
        match self.delete_bug_in_txn(&txn, id).await {
            Ok(()) => txn.commit().await.map_err(store_error),
            Err(e) => {
                rollback(txn).await;
                Err(e)
            }
        }
    }

    async fn delete_bug_in_txn(&self, txn: &DatabaseTransaction, id: &str) -> Result<(), AppError> {
        if self.bugs.find_for_update(txn, id).await.map_err(store_error)?.is_none() {
            return Err(AppError::NotFound("Bug".to_string()));
        }
        // Answer locks first: votes still in flight on them commit before
        // their records are collected below
        let answers = self.answers.lock_for_bug(txn, id).await.map_err(store_error)?;
        let mut targets: Vec<String> = answers.into_iter().map(|a| a.id).collect();
        let answer_count = targets.len();
        targets.push(id.to_string());

        let dropped = self
            .votes
            .delete_for_targets(txn, targets)
            .await
            .map_err(store_error)?;
        self.answers.delete_for_bug(txn, id).await.map_err(store_error)?;
        self.bugs.delete(txn, id).await.map_err(store_error)?;

        tracing::debug!(
            "Deleted bug {} with {} answers and {} votes",
            id,
            answer_count,
            dropped
        );
        Ok(())
    }

    pub async fn delete_answer(&self, bug_id: &str, id: &str) -> Result<(), AppError> {
        let txn = self.db.begin().await.map_err(store_error)?;
        match self.delete_answer_in_txn(&txn, bug_id, id).await {
            Ok(()) => txn.commit().await.map_err(store_error),
            Err(e) => {
                rollback(txn).await;
                Err(e)
            }
        }
    }

    async fn delete_answer_in_txn(
        &self,
        txn: &DatabaseTransaction,
        bug_id: &str,
        id: &str,
    ) -> Result<(), AppError> {
        if self
            .answers
            .find_for_update(txn, bug_id, id)
            .await
            .map_err(store_error)?
            .is_none()
        {
            return Err(AppError::NotFound("Answer".to_string()));
        }
        let dropped = self
            .votes
            .delete_for_targets(txn, vec![id.to_string()])
            .await
            .map_err(store_error)?;
        self.answers.delete(txn, id).await.map_err(store_error)?;

        tracing::debug!("Deleted answer {} on bug {} with {} votes", id, bug_id, dropped);
        Ok(())
    }
}

/// Rollback failures are only logged so the caller keeps its own error.
async fn rollback(txn: DatabaseTransaction) {
    if let Err(e) = txn.rollback().await {
        tracing::warn!("Rollback failed: {}", e);
    }
}

fn is_conflict(err: &DbErr) -> bool {
    if matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        return true;
    }
    let msg = err.to_string();
    msg.contains("could not serialize access") || msg.contains("deadlock detected")
}

fn store_error(err: DbErr) -> AppError {
    match err {
        DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => {
            tracing::error!("Database unreachable: {}", err);
            AppError::StoreUnavailable(err.to_string())
        }
        other => {
            tracing::error!("Database error: {}", other);
            AppError::Internal(other.to_string())
        }
    }
}

impl From<bug::Model> for Bug {
    fn from(model: bug::Model) -> Self {
        Self {
            id: model.id,
            title: model.title,
            description: model.description,
            tags: serde_json::from_value(model.tags).unwrap_or_default(),
            status: model.status,
            created_by: model.created_by,
            votes: model.votes,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl From<answer::Model> for Answer {
    fn from(model: answer::Model) -> Self {
        Self {
            id: model.id,
            bug_id: model.bug_id,
            content: model.content,
            author_id: model.author_id,
            votes: model.votes,
            is_accepted: model.is_accepted,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

impl TryFrom<vote::Model> for VoteRecord {
    type Error = AppError;

    fn try_from(model: vote::Model) -> Result<Self, Self::Error> {
        let corrupt = |field: &str| {
            AppError::Internal(format!(
                "vote {}_{} has invalid {}",
                model.voter_id, model.target_id, field
            ))
        };
        let target_kind = model.target_kind.parse().map_err(|_| corrupt("target_kind"))?;
        let direction = model.direction.parse().map_err(|_| corrupt("direction"))?;

        Ok(Self {
            voter_id: model.voter_id,
            target_id: model.target_id,
            target_kind,
            direction,
            parent_id: model.parent_id,
            created_at: model.created_at,
            updated_at: model.updated_at,
        })
    }
}
