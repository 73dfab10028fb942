use super::entities::{bug, Bug};
use crate::domain::FeedRequest;
use sea_orm::sea_query::{Expr, Func, NullOrdering};
use sea_orm::{entity::*, query::*, DatabaseConnection, DatabaseTransaction, DbErr};

#[derive(Clone)]
pub struct BugRepository {
    db: DatabaseConnection,
}

impl BugRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn create(&self, bug_data: &crate::domain::Bug) -> Result<bug::Model, DbErr> {
        let active = bug::ActiveModel {
            id: Set(bug_data.id.clone()),
            title: Set(bug_data.title.clone()),
            description: Set(bug_data.description.clone()),
            tags: Set(serde_json::json!(bug_data.tags)),
            status: Set(bug_data.status.clone()),
            created_by: Set(bug_data.created_by.clone()),
            votes: Set(bug_data.votes),
            created_at: Set(bug_data.created_at),
            updated_at: Set(bug_data.updated_at),
        };
        active.insert(&self.db).await
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<bug::Model>, DbErr> {
        Bug::find_by_id(id.to_string()).one(&self.db).await
    }

    /// One feed window: up to `limit + 1` bugs after the cursor, newest first.
    pub async fn list_page(&self, request: &FeedRequest) -> Result<Vec<bug::Model>, DbErr> {
        let mut query = Bug::find();

        if let Some(search) = &request.filter.search {
            let pattern = format!("%{}%", escape_like(search));
            query = query.filter(
                Condition::any()
                    .add(Expr::expr(Func::lower(Expr::col(bug::Column::Title))).like(pattern.clone()))
                    .add(Expr::expr(Func::lower(Expr::col(bug::Column::Description))).like(pattern)),
            );
        }
        if let Some(tag) = &request.filter.tag {
            query = query.filter(Expr::cust_with_values(
                "tags @> $1",
                [serde_json::json!([tag])],
            ));
        }
        if let Some(cursor) = &request.cursor {
            let after = match cursor.created_at {
                Some(at) => Condition::any()
                    .add(bug::Column::CreatedAt.lt(at))
                    .add(
                        Condition::all()
                            .add(bug::Column::CreatedAt.eq(at))
                            .add(bug::Column::Id.lt(cursor.id.clone())),
                    )
                    .add(bug::Column::CreatedAt.is_null()),
                None => Condition::all()
                    .add(bug::Column::CreatedAt.is_null())
                    .add(bug::Column::Id.lt(cursor.id.clone())),
            };
            query = query.filter(after);
        }

        query
            .order_by_with_nulls(bug::Column::CreatedAt, Order::Desc, NullOrdering::Last)
            .order_by_desc(bug::Column::Id)
            .limit(request.limit + 1)
            .all(&self.db)
            .await
    }

    /// Writes title, description and tags only, never the vote count.
    pub async fn update_content(&self, edited: &crate::domain::Bug) -> Result<bug::Model, DbErr> {
        let active = bug::ActiveModel {
            id: Set(edited.id.clone()),
            title: Set(edited.title.clone()),
            description: Set(edited.description.clone()),
            tags: Set(serde_json::json!(edited.tags)),
            updated_at: Set(edited.updated_at),
            ..Default::default()
        };
        active.update(&self.db).await
    }

    pub async fn delete(&self, txn: &DatabaseTransaction, id: &str) -> Result<(), DbErr> {
        Bug::delete_by_id(id.to_string()).exec(txn).await?;
        Ok(())
    }

    /// Row-locks the bug for the rest of the transaction.
    pub async fn find_for_update(
        &self,
        txn: &DatabaseTransaction,
        id: &str,
    ) -> Result<Option<bug::Model>, DbErr> {
        Bug::find_by_id(id.to_string())
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
        let active = bug::ActiveModel {
            id: Set(id.to_string()),
            votes: Set(votes),
            updated_at: Set(Some(chrono::Utc::now())),
            ..Default::default()
        };
        active.update(txn).await?;
        Ok(())
    }
}

fn escape_like(raw: &str) -> String {
    raw.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
