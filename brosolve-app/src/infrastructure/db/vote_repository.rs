use super::entities::{vote, Vote};
use crate::domain::VoteRecord;
use sea_orm::{entity::*, query::*, ConnectionTrait, DatabaseConnection, DatabaseTransaction, DbErr};

#[derive(Clone)]
pub struct VoteRepository {
    db: DatabaseConnection,
}

impl VoteRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find(&self, voter_id: &str, target_id: &str) -> Result<Option<vote::Model>, DbErr> {
        Self::find_with(&self.db, voter_id, target_id).await
    }

    pub async fn find_in(
        &self,
        txn: &DatabaseTransaction,
        voter_id: &str,
        target_id: &str,
    ) -> Result<Option<vote::Model>, DbErr> {
        Self::find_with(txn, voter_id, target_id).await
    }

    async fn find_with<C: ConnectionTrait>(
        conn: &C,
        voter_id: &str,
        target_id: &str,
    ) -> Result<Option<vote::Model>, DbErr> {
        Vote::find_by_id((voter_id.to_string(), target_id.to_string()))
            .one(conn)
            .await
    }

    /// Inserts the record, or updates direction and timestamp in place when
    /// the voter already had one.
    pub async fn write(
        &self,
        txn: &DatabaseTransaction,
        record: &VoteRecord,
        exists: bool,
    ) -> Result<(), DbErr> {
        if exists {
            let active = vote::ActiveModel {
                voter_id: Set(record.voter_id.clone()),
                target_id: Set(record.target_id.clone()),
                direction: Set(record.direction.as_str().to_string()),
                updated_at: Set(record.updated_at),
                ..Default::default()
            };
            active.update(txn).await?;
        } else {
            let active = vote::ActiveModel {
                voter_id: Set(record.voter_id.clone()),
                target_id: Set(record.target_id.clone()),
                target_kind: Set(record.target_kind.as_str().to_string()),
                direction: Set(record.direction.as_str().to_string()),
                parent_id: Set(record.parent_id.clone()),
                created_at: Set(record.created_at),
                updated_at: Set(record.updated_at),
            };
            active.insert(txn).await?;
        }
        Ok(())
    }

    pub async fn delete(
        &self,
        txn: &DatabaseTransaction,
        voter_id: &str,
        target_id: &str,
    ) -> Result<(), DbErr> {
        Vote::delete_by_id((voter_id.to_string(), target_id.to_string()))
            .exec(txn)
            .await?;
        Ok(())
    }

    /// Drops every voter's record on the given targets.
    pub async fn delete_for_targets(
        &self,
        txn: &DatabaseTransaction,
        target_ids: Vec<String>,
    ) -> Result<u64, DbErr> {
        let result = Vote::delete_many()
            .filter(vote::Column::TargetId.is_in(target_ids))
            .exec(txn)
            .await?;
        Ok(result.rows_affected)
    }
}
