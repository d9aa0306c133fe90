// ABOUTME: Content block entity storing the tree via an explicit materialized path
// ABOUTME: Holds kind-tagged JSON properties plus workspace, environment, and audit columns

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use crate::types::{BlockMetadata, BlockProperties, ContentBlock, Environment, ParentRef};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "content_blocks")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(column_name = "type")]
    pub block_type: String,
    pub properties: Json,
    pub parent_id: Option<Uuid>,
    pub path: String, // Materialized path: slash-terminated ancestor ids ending with own id
    pub workspace: String,
    pub environment: String,
    pub tags: Option<String>, // Comma-delimited with sentinel commas, like ",docs,home,"
    pub locale: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    pub created_by: String,
    pub updated_by: String,
    pub version: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(belongs_to = "Entity", from = "Column::ParentId", to = "Column::Id")]
    Parent,
    #[sea_orm(has_many = "super::block_version::Entity")]
    Versions,
    #[sea_orm(has_many = "super::block_reference::Entity")]
    References,
}

impl Related<super::block_version::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Versions.def()
    }
}

impl Related<super::block_reference::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::References.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Converts the row to the domain model object. Children are left empty;
    /// tree retrieval fills them in.
    pub fn into_domain(self, parent: Option<ParentRef>) -> crate::error::Result<ContentBlock> {
        let content = BlockProperties::from_parts(&self.block_type, self.properties)?;
        Ok(ContentBlock {
            id: self.id,
            content,
            children: Vec::new(),
            parent,
            metadata: BlockMetadata {
                created_at: self.created_at,
                updated_at: self.updated_at,
                created_by: self.created_by,
                updated_by: self.updated_by,
                version: self.version,
                workspace: self.workspace,
                environment: Environment::parse(&self.environment)?,
                tags: self.tags.as_deref().map(decode_tags),
                locale: self.locale,
            },
        })
    }
}

/// Tags are stored with leading and trailing delimiters so a single LIKE
/// pattern `%,tag,%` matches whole tags only.
pub fn encode_tags(tags: &[String]) -> String {
    format!(",{},", tags.join(","))
}

pub fn decode_tags(encoded: &str) -> Vec<String> {
    encoded
        .trim_matches(',')
        .split(',')
        .filter(|tag| !tag.is_empty())
        .map(str::to_string)
        .collect()
}
