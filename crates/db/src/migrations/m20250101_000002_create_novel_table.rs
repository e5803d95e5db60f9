//! Create novel table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Novel::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Novel::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Novel::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Novel::Description).text())
                    .col(ColumnDef::new(Novel::Content).text())
                    .col(ColumnDef::new(Novel::Category).string_len(8).not_null())
                    .col(ColumnDef::new(Novel::AuthorId).string_len(32).not_null())
                    .col(
                        ColumnDef::new(Novel::IsPublished)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Novel::ViewCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Novel::LikeCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Novel::DislikeCount).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Novel::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Novel::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_novel_author")
                            .from(Novel::Table, Novel::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Index: author_id (my page)
        manager
            .create_index(
                Index::create()
                    .name("idx_novel_author_id")
                    .table(Novel::Table)
                    .col(Novel::AuthorId)
                    .to_owned(),
            )
            .await?;

        // Index: (is_published, created_at) for the public listing
        manager
            .create_index(
                Index::create()
                    .name("idx_novel_published_created_at")
                    .table(Novel::Table)
                    .col(Novel::IsPublished)
                    .col(Novel::CreatedAt)
                    .to_owned(),
            )
            .await?;

        // Index: view_count (popular sort)
        manager
            .create_index(
                Index::create()
                    .name("idx_novel_view_count")
                    .table(Novel::Table)
                    .col(Novel::ViewCount)
                    .to_owned(),
            )
            .await?;

        // Index: like_count (likes sort)
        manager
            .create_index(
                Index::create()
                    .name("idx_novel_like_count")
                    .table(Novel::Table)
                    .col(Novel::LikeCount)
                    .to_owned(),
            )
            .await?;

        // Denormalized vote counters never go negative
        manager
            .get_connection()
            .execute_unprepared(
                r"
                ALTER TABLE novel
                ADD CONSTRAINT chk_novel_vote_counts
                CHECK (like_count >= 0 AND dislike_count >= 0);
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Novel::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Novel {
    Table,
    Id,
    Title,
    Description,
    Content,
    Category,
    AuthorId,
    IsPublished,
    ViewCount,
    LikeCount,
    DislikeCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
