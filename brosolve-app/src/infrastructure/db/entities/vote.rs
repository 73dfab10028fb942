use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Keyed by (voter_id, target_id). Targets are bugs or answers, so there is
/// no foreign key on target_id.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "votes")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub voter_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub target_id: String,
    pub target_kind: String,
    pub direction: String,
    pub parent_id: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
