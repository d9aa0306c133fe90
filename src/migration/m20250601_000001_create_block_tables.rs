// ABOUTME: Initial migration to create content_blocks, block_versions, and block_references
// ABOUTME: Sets up the materialized-path tree schema with workspace-scoped indexes

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Create content_blocks table
        manager
            .create_table(
                Table::create()
                    .table(ContentBlocks::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(ContentBlocks::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(ContentBlocks::Type).string().not_null())
                    .col(ColumnDef::new(ContentBlocks::Properties).json().not_null())
                    .col(ColumnDef::new(ContentBlocks::ParentId).uuid())
                    .col(ColumnDef::new(ContentBlocks::Path).string().not_null())
                    .col(ColumnDef::new(ContentBlocks::Workspace).string().not_null())
                    .col(ColumnDef::new(ContentBlocks::Environment).string().not_null())
                    .col(ColumnDef::new(ContentBlocks::Tags).string())
                    .col(ColumnDef::new(ContentBlocks::Locale).string())
                    .col(ColumnDef::new(ContentBlocks::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(ContentBlocks::UpdatedAt).big_integer().not_null())
                    .col(ColumnDef::new(ContentBlocks::CreatedBy).string().not_null())
                    .col(ColumnDef::new(ContentBlocks::UpdatedBy).string().not_null())
                    .col(ColumnDef::new(ContentBlocks::Version).integer().not_null().default(1))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_content_blocks_parent_id")
                            .from(ContentBlocks::Table, ContentBlocks::ParentId)
                            .to(ContentBlocks::Table, ContentBlocks::Id)
                            .on_delete(ForeignKeyAction::Restrict),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blocks_workspace_environment")
                    .table(ContentBlocks::Table)
                    .col(ContentBlocks::Workspace)
                    .col(ContentBlocks::Environment)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blocks_workspace_type")
                    .table(ContentBlocks::Table)
                    .col(ContentBlocks::Workspace)
                    .col(ContentBlocks::Type)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blocks_workspace_tags")
                    .table(ContentBlocks::Table)
                    .col(ContentBlocks::Workspace)
                    .col(ContentBlocks::Tags)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blocks_path")
                    .table(ContentBlocks::Table)
                    .col(ContentBlocks::Path)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_blocks_parent_id")
                    .table(ContentBlocks::Table)
                    .col(ContentBlocks::ParentId)
                    .to_owned(),
            )
            .await?;

        // Create block_versions table
        manager
            .create_table(
                Table::create()
                    .table(BlockVersions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BlockVersions::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(BlockVersions::BlockId).uuid().not_null())
                    .col(ColumnDef::new(BlockVersions::Version).integer().not_null())
                    .col(ColumnDef::new(BlockVersions::Content).json().not_null())
                    .col(ColumnDef::new(BlockVersions::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(BlockVersions::CreatedBy).string().not_null())
                    .col(ColumnDef::new(BlockVersions::Comment).string())
                    .col(ColumnDef::new(BlockVersions::Workspace).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_block_versions_block_id")
                            .from(BlockVersions::Table, BlockVersions::BlockId)
                            .to(ContentBlocks::Table, ContentBlocks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .index(
                        Index::create()
                            .name("idx_block_version_unique")
                            .table(BlockVersions::Table)
                            .col(BlockVersions::BlockId)
                            .col(BlockVersions::Version)
                            .unique(),
                    )
                    .to_owned(),
            )
            .await?;

        // Create block_references table
        manager
            .create_table(
                Table::create()
                    .table(BlockReferences::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(BlockReferences::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(BlockReferences::Type).string().not_null())
                    .col(ColumnDef::new(BlockReferences::SourceId).uuid().not_null())
                    .col(ColumnDef::new(BlockReferences::SourceVersion).integer().not_null())
                    .col(ColumnDef::new(BlockReferences::CreatedAt).big_integer().not_null())
                    .col(ColumnDef::new(BlockReferences::CreatedBy).string().not_null())
                    .col(ColumnDef::new(BlockReferences::Workspace).string().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_block_references_source_id")
                            .from(BlockReferences::Table, BlockReferences::SourceId)
                            .to(ContentBlocks::Table, ContentBlocks::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_block_references_source_id")
                    .table(BlockReferences::Table)
                    .col(BlockReferences::SourceId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(BlockReferences::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(BlockVersions::Table).to_owned())
            .await?;

        manager
            .drop_table(Table::drop().table(ContentBlocks::Table).to_owned())
            .await?;

        Ok(())
    }
}

#[derive(DeriveIden)]
enum ContentBlocks {
    Table,
    Id,
    Type,
    Properties,
    ParentId,
    Path,
    Workspace,
    Environment,
    Tags,
    Locale,
    CreatedAt,
    UpdatedAt,
    CreatedBy,
    UpdatedBy,
    Version,
}

#[derive(DeriveIden)]
enum BlockVersions {
    Table,
    Id,
    BlockId,
    Version,
    Content,
    CreatedAt,
    CreatedBy,
    Comment,
    Workspace,
}

#[derive(DeriveIden)]
enum BlockReferences {
    Table,
    Id,
    Type,
    SourceId,
    SourceVersion,
    CreatedAt,
    CreatedBy,
    Workspace,
}
