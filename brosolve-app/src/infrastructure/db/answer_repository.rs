use super::entities::{answer, Answer};
use sea_orm::{entity::*, query::*, DatabaseConnection, DatabaseTransaction, DbErr};

#[derive(Clone)]
pub struct AnswerRepository {
    db: DatabaseConnection,
}

impl AnswerRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, answer_data: &crate::domain::Answer) -> Result<answer::Model, DbErr> {
        let active = answer::ActiveModel {
            id: Set(answer_data.id.clone()),
            bug_id: Set(answer_data.bug_id.clone()),
            content: Set(answer_data.content.clone()),
            author_id: Set(answer_data.author_id.clone()),
            votes: Set(answer_data.votes),
            is_accepted: Set(answer_data.is_accepted),
            created_at: Set(answer_data.created_at),
            updated_at: Set(answer_data.updated_at),
        };
        active.insert(&self.db).await
    }

    pub async fn list_for_bug(&self, bug_id: &str) -> Result<Vec<answer::Model>, DbErr> {
        Answer::find()
            .filter(answer::Column::BugId.eq(bug_id))
            .order_by_desc(answer::Column::CreatedAt)
            .all(&self.db)
            .await
    }

    pub async fn find(&self, bug_id: &str, id: &str) -> Result<Option<answer::Model>, DbErr> {
        Answer::find()
            .filter(answer::Column::Id.eq(id))
            .filter(answer::Column::BugId.eq(bug_id))
            .one(&self.db)
            .await
    }

    /// Locks every answer of the bug, waiting out votes in flight on them.
    pub async fn lock_for_bug(
        &self,
        txn: &DatabaseTransaction,
        bug_id: &str,
    ) -> Result<Vec<answer::Model>, DbErr> {
        Answer::find()
            .filter(answer::Column::BugId.eq(bug_id))
            .lock_exclusive()
            .all(txn)
            .await
    }

    pub async fn update_content(&self, edited: &crate::domain::Answer) -> Result<answer::Model, DbErr> {
        let active = answer::ActiveModel {
            id: Set(edited.id.clone()),
            content: Set(edited.content.clone()),
            updated_at: Set(edited.updated_at),
            ..Default::default()
        };
        active.update(&self.db).await
    }

    pub async fn delete(&self, txn: &DatabaseTransaction, id: &str) -> Result<(), DbErr> {
        Answer::delete_by_id(id.to_string()).exec(txn).await?;
        Ok(())
    }

    pub async fn delete_for_bug(&self, txn: &DatabaseTransaction, bug_id: &str) -> Result<u64, DbErr> {
        let result = Answer::delete_many()
            .filter(answer::Column::BugId.eq(bug_id))
            .exec(txn)
            .await?;
        Ok(result.rows_affected)
    }

    /// Answers are only reachable through their parent bug.
    pub async fn find_for_update(
        &self,
        txn: &DatabaseTransaction,
        bug_id: &str,
        id: &str,
    ) -> Result<Option<answer::Model>, DbErr> {
        Answer::find()
            .filter(answer::Column::Id.eq(id))
            .filter(answer::Column::BugId.eq(bug_id))
            .lock_exclusive()
            .one(txn)
            .await
    }

    pub async fn set_votes(
        &self,
        txn: &DatabaseTransaction,
        id: &str,
        votes: i32,
    ) -> Result<(), DbErr> {
        let active = answer::ActiveModel {
            id: Set(id.to_string()),
            votes: Set(votes),
            updated_at: Set(Some(chrono::Utc::now())),
            ..Default::default()
        };
        active.update(txn).await?;
        Ok(())
    }
}
