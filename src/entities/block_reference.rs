// ABOUTME: Block reference entity recording reuse pointers between blocks
// ABOUTME: Captures the source block's version at reference-creation time for audit

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "block_references")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(column_name = "type")]
    pub ref_type: String, // "reference" (live link) or "copy" (duplication intent)
    pub source_id: Uuid,
    pub source_version: i32,
    pub created_at: i64,
    pub created_by: String,
    pub workspace: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::block::Entity",
        from = "Column::SourceId",
        to = "super::block::Column::Id"
    )]
    Source,
}

impl Related<super::block::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Source.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
