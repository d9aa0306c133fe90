// ABOUTME: Repository layer for content blocks, versions, and references
// ABOUTME: Wraps all multi-row writes in transactions and maps rows to the domain model

use std::collections::HashMap;

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, Database, DatabaseConnection,
    EntityTrait, Order, PaginatorTrait, QueryFilter, QueryOrder, Set, TransactionTrait,
};
use sea_orm_migration::MigratorTrait;
use uuid::Uuid;

use crate::entities::block::encode_tags;
use crate::entities::{block, block_reference, block_version};
use crate::error::{AppError, Result};
use crate::migration::Migrator;
use crate::types::*;

pub struct Storage {
    pub db: DatabaseConnection,
}

impl Storage {
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let db = Database::connect(database_url).await?;
        Migrator::up(&db, None).await?;
        Ok(Self { db })
    }

    /// Looks up a single block. `None` on miss; mutating operations raise
    /// `NotFound` instead.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<ContentBlock>> {
        let Some(model) = block::Entity::find_by_id(id).one(&self.db).await? else {
            return Ok(None);
        };
        let parent = parent_ref(&self.db, &model).await?;
        Ok(Some(model.into_domain(parent)?))
    }

    /// Creates a block at version 1 together with its initial version
    /// snapshot. Both rows are written in one transaction; a failure of
    /// either write rolls back both.
    pub async fn create_block(
        &self,
        req: &CreateBlockRequest,
        created_by: &str,
    ) -> Result<ContentBlock> {
        req.content.validate()?;

        let id = Uuid::new_v4();
        let now = chrono::Utc::now().timestamp();
        let txn = self.db.begin().await?;

        // Cross-workspace parent links are rejected here; the schema alone
        // cannot express that invariant.
        let (parent, path) = match req.parent_id {
            Some(parent_id) => {
                let parent = block::Entity::find_by_id(parent_id)
                    .one(&txn)
                    .await?
                    .ok_or_else(|| AppError::NotFound(format!("parent block {parent_id}")))?;
                if parent.workspace != req.workspace {
                    return Err(AppError::BadRequest(format!(
                        "parent block {parent_id} belongs to workspace {}",
                        parent.workspace
                    )));
                }
                let path = format!("{}{}/", parent.path, id);
                let parent_kind = BlockKind::parse(&parent.block_type)?;
                (
                    Some(ParentRef {
                        id: parent.id,
                        block_type: parent_kind,
                    }),
                    path,
                )
            }
            None => (None, format!("{id}/")),
        };

        let row = block::ActiveModel {
            id: Set(id),
            block_type: Set(req.content.kind().as_str().to_string()),
            properties: Set(req.content.props_json()?),
            parent_id: Set(req.parent_id),
            path: Set(path),
            workspace: Set(req.workspace.clone()),
            environment: Set(Environment::Draft.as_str().to_string()),
            tags: Set(req.tags.as_deref().map(encode_tags)),
            locale: Set(req.locale.clone()),
            created_at: Set(now),
            updated_at: Set(now),
            created_by: Set(created_by.to_string()),
            updated_by: Set(created_by.to_string()),
            version: Set(1),
        };
        let saved = row.insert(&txn).await?;
        let created = saved.into_domain(parent)?;

        let version_row = block_version::ActiveModel {
            id: Set(Uuid::new_v4()),
            block_id: Set(id),
            version: Set(1),
            content: Set(serde_json::to_value(&created)?),
            created_at: Set(now),
            created_by: Set(created_by.to_string()),
            comment: Set(None),
            workspace: Set(req.workspace.clone()),
        };
        version_row.insert(&txn).await?;

        txn.commit().await?;
        tracing::debug!(block = %id, workspace = %req.workspace, "block created");
        Ok(created)
    }

    /// Merges partial updates into the stored block, bumps the version by
    /// exactly one, and appends a new version snapshot — all in one
    /// transaction. When `expected_version` is set, a stale value is
    /// rejected with `Conflict` instead of silently overwriting.
    pub async fn update_block(
        &self,
        id: Uuid,
        updates: BlockUpdate,
        user_id: &str,
        comment: Option<String>,
    ) -> Result<ContentBlock> {
        let now = chrono::Utc::now().timestamp();
        let txn = self.db.begin().await?;

        let current = block::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("block {id}")))?;

        if let Some(expected) = updates.expected_version {
            if expected != current.version {
                return Err(AppError::Conflict(format!(
                    "expected version {expected}, block {id} is at version {}",
                    current.version
                )));
            }
        }

        // Type and properties are merged as a pair so the result always
        // parses under a single kind.
        let merged = if updates.block_type.is_some() || updates.properties.is_some() {
            let kind = match updates.block_type {
                Some(kind) => kind,
                None => BlockKind::parse(&current.block_type)?,
            };
            let props = updates
                .properties
                .clone()
                .unwrap_or_else(|| current.properties.clone());
            let content = BlockProperties::from_parts(kind.as_str(), props)?;
            content.validate()?;
            Some(content)
        } else {
            None
        };

        let new_version = current.version + 1;
        let mut active: block::ActiveModel = current.into();
        if let Some(content) = &merged {
            active.block_type = Set(content.kind().as_str().to_string());
            active.properties = Set(content.props_json()?);
        }
        if let Some(environment) = updates.environment {
            active.environment = Set(environment.as_str().to_string());
        }
        if let Some(tags) = &updates.tags {
            active.tags = Set(Some(encode_tags(tags)));
        }
        if let Some(locale) = &updates.locale {
            active.locale = Set(Some(locale.clone()));
        }
        active.version = Set(new_version);
        active.updated_at = Set(now);
        active.updated_by = Set(user_id.to_string());

        let saved = active.update(&txn).await?;
        let parent = parent_ref(&txn, &saved).await?;
        let updated = saved.into_domain(parent)?;

        let version_row = block_version::ActiveModel {
            id: Set(Uuid::new_v4()),
            block_id: Set(id),
            version: Set(new_version),
            content: Set(serde_json::to_value(&updated)?),
            created_at: Set(now),
            created_by: Set(user_id.to_string()),
            comment: Set(comment),
            workspace: Set(updated.metadata.workspace.clone()),
        };
        version_row.insert(&txn).await?;

        txn.commit().await?;
        tracing::debug!(block = %id, version = new_version, "block updated");
        Ok(updated)
    }

    /// Filtered, sorted, paginated listing scoped to one workspace. All
    /// filters are conjunctive.
    pub async fn find_blocks(&self, query: &BlockQuery) -> Result<BlockListResult> {
        let mut find =
            block::Entity::find().filter(block::Column::Workspace.eq(query.workspace.as_str()));

        if let Some(environment) = query.environment {
            find = find.filter(block::Column::Environment.eq(environment.as_str()));
        }
        if let Some(types) = &query.block_type {
            if !types.is_empty() {
                find = find
                    .filter(block::Column::BlockType.is_in(types.iter().map(|kind| kind.as_str())));
            }
        }
        if let Some(tags) = &query.tags {
            if !tags.is_empty() {
                let mut any_tag = Condition::any();
                for tag in tags {
                    any_tag = any_tag.add(block::Column::Tags.contains(format!(",{tag},")));
                }
                find = find.filter(any_tag);
            }
        }
        if let Some(locale) = &query.locale {
            find = find.filter(block::Column::Locale.eq(locale.as_str()));
        }
        if let Some(created_by) = &query.created_by {
            find = find.filter(block::Column::CreatedBy.eq(created_by.as_str()));
        }
        if let Some(created_after) = &query.created_after {
            find = find
                .filter(block::Column::CreatedAt.gte(parse_timestamp(created_after, "created_after")?));
        }
        if let Some(created_before) = &query.created_before {
            find = find.filter(
                block::Column::CreatedAt.lte(parse_timestamp(created_before, "created_before")?),
            );
        }
        if let Some(full_text) = &query.full_text {
            // Substring match over the serialized properties blob. There is
            // no search index; acceptable only at small scale.
            find = find.filter(block::Column::Properties.contains(full_text.as_str()));
        }

        let (sort_column, sort_order) = match query.sort {
            Some(SortSpec { field, order }) => (
                match field {
                    SortField::CreatedAt => block::Column::CreatedAt,
                    SortField::UpdatedAt => block::Column::UpdatedAt,
                    SortField::Version => block::Column::Version,
                },
                match order {
                    SortOrder::Asc => Order::Asc,
                    SortOrder::Desc => Order::Desc,
                },
            ),
            None => (block::Column::CreatedAt, Order::Desc),
        };
        find = find.order_by(sort_column, sort_order);

        let page = query.page.unwrap_or(1).max(1);
        let limit = query.limit.unwrap_or(10).max(1);
        let paginator = find.paginate(&self.db, limit);
        let total = paginator.num_items().await?;
        let rows = paginator.fetch_page(page - 1).await?;

        let mut items = Vec::with_capacity(rows.len());
        for row in rows {
            items.push(row.into_domain(None)?);
        }

        Ok(BlockListResult {
            items,
            total,
            page,
            limit,
            has_more: total > page * limit,
        })
    }

    /// Full append-only audit trail for a block, most recent version first.
    /// Unknown ids yield an empty list rather than an error.
    pub async fn get_version_history(&self, block_id: Uuid) -> Result<Vec<BlockVersion>> {
        let rows = block_version::Entity::find()
            .filter(block_version::Column::BlockId.eq(block_id))
            .order_by_desc(block_version::Column::Version)
            .all(&self.db)
            .await?;

        let mut versions = Vec::with_capacity(rows.len());
        for row in rows {
            versions.push(BlockVersion {
                block_id: row.block_id,
                version: row.version,
                content: serde_json::from_value(row.content)?,
                metadata: VersionMetadata {
                    created_at: row.created_at,
                    created_by: row.created_by,
                    comment: row.comment,
                    workspace: row.workspace,
                },
            });
        }
        Ok(versions)
    }

    /// Records a reuse pointer at the source's current version. No content
    /// is duplicated for either reference type; duplication is the caller's
    /// concern.
    pub async fn create_reference(
        &self,
        source_id: Uuid,
        ref_type: ReferenceType,
        user_id: &str,
    ) -> Result<BlockReference> {
        let source = block::Entity::find_by_id(source_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("block {source_id}")))?;

        let now = chrono::Utc::now().timestamp();
        let row = block_reference::ActiveModel {
            id: Set(Uuid::new_v4()),
            ref_type: Set(ref_type.as_str().to_string()),
            source_id: Set(source_id),
            source_version: Set(source.version),
            created_at: Set(now),
            created_by: Set(user_id.to_string()),
            workspace: Set(source.workspace.clone()),
        };
        let saved = row.insert(&self.db).await?;

        Ok(BlockReference {
            id: saved.id,
            ref_type: ReferenceType::parse(&saved.ref_type)?,
            source_id: saved.source_id,
            source_version: saved.source_version,
            metadata: ReferenceMetadata {
                created_at: saved.created_at,
                created_by: saved.created_by,
                workspace: saved.workspace,
            },
        })
    }

    /// Loads the root and every descendant with one path-prefix query, then
    /// assembles the nested tree in memory. Siblings are ordered by
    /// creation time, id as tie-breaker.
    pub async fn get_block_tree(&self, root_id: Uuid) -> Result<ContentBlock> {
        let root = block::Entity::find_by_id(root_id)
            .one(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("block {root_id}")))?;

        let descendants = block::Entity::find()
            .filter(block::Column::Path.starts_with(root.path.as_str()))
            .filter(block::Column::Id.ne(root_id))
            .all(&self.db)
            .await?;

        let mut kinds: HashMap<Uuid, BlockKind> = HashMap::with_capacity(descendants.len() + 1);
        kinds.insert(root.id, BlockKind::parse(&root.block_type)?);
        for row in &descendants {
            kinds.insert(row.id, BlockKind::parse(&row.block_type)?);
        }

        let mut children_of: HashMap<Uuid, Vec<ContentBlock>> = HashMap::new();
        for row in descendants {
            let Some(parent_id) = row.parent_id else { continue };
            let parent = kinds.get(&parent_id).map(|kind| ParentRef {
                id: parent_id,
                block_type: *kind,
            });
            let node = row.into_domain(parent)?;
            children_of.entry(parent_id).or_default().push(node);
        }

        let root_parent = parent_ref(&self.db, &root).await?;
        let mut tree = root.into_domain(root_parent)?;
        attach_children(&mut tree, &mut children_of);
        Ok(tree)
    }

    /// Deletes a block plus all of its version and reference rows in one
    /// transaction. Blocks that still have children are refused rather than
    /// orphaning the subtree.
    pub async fn delete_block(&self, id: Uuid) -> Result<()> {
        let txn = self.db.begin().await?;

        block::Entity::find_by_id(id)
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("block {id}")))?;

        let child_count = block::Entity::find()
            .filter(block::Column::ParentId.eq(id))
            .count(&txn)
            .await?;
        if child_count > 0 {
            return Err(AppError::Conflict(format!(
                "block {id} has {child_count} child blocks; delete or move them first"
            )));
        }

        block_version::Entity::delete_many()
            .filter(block_version::Column::BlockId.eq(id))
            .exec(&txn)
            .await?;
        block_reference::Entity::delete_many()
            .filter(block_reference::Column::SourceId.eq(id))
            .exec(&txn)
            .await?;
        block::Entity::delete_by_id(id).exec(&txn).await?;

        txn.commit().await?;
        tracing::debug!(block = %id, "block deleted");
        Ok(())
    }
}

async fn parent_ref<C: ConnectionTrait>(
    conn: &C,
    model: &block::Model,
) -> Result<Option<ParentRef>> {
    let Some(parent_id) = model.parent_id else {
        return Ok(None);
    };
    match block::Entity::find_by_id(parent_id).one(conn).await? {
        Some(parent) => Ok(Some(ParentRef {
            id: parent.id,
            block_type: BlockKind::parse(&parent.block_type)?,
        })),
        None => Ok(None),
    }
}

fn attach_children(node: &mut ContentBlock, children_of: &mut HashMap<Uuid, Vec<ContentBlock>>) {
    if let Some(mut children) = children_of.remove(&node.id) {
        children.sort_by_key(|child| (child.metadata.created_at, child.id));
        for child in &mut children {
            attach_children(child, children_of);
        }
        node.children = children;
    }
}

fn parse_timestamp(value: &str, field: &str) -> Result<i64> {
    chrono::DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.timestamp())
        .map_err(|err| AppError::BadRequest(format!("invalid {field} timestamp: {err}")))
}
