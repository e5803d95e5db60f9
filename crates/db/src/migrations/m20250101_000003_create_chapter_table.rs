//! Create chapter table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Chapter::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Chapter::Id)
                            .string_len(32)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Chapter::NovelId).string_len(32).not_null())
                    .col(ColumnDef::new(Chapter::AuthorId).string_len(32).not_null())
                    .col(ColumnDef::new(Chapter::ChapterNum).integer().not_null())
                    .col(ColumnDef::new(Chapter::Title).string_len(256).not_null())
                    .col(ColumnDef::new(Chapter::Content).text().not_null())
                    .col(
                        ColumnDef::new(Chapter::IsPublished)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new(Chapter::ViewCount).integer().not_null().default(0))
                    .col(ColumnDef::new(Chapter::LikeCount).integer().not_null().default(0))
                    .col(
                        ColumnDef::new(Chapter::DislikeCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(Chapter::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Chapter::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chapter_novel")
                            .from(Chapter::Table, Chapter::NovelId)
                            .to(Novel::Table, Novel::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_chapter_author")
                            .from(Chapter::Table, Chapter::AuthorId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (novel_id, chapter_num)
        manager
            .create_index(
                Index::create()
                    .name("idx_chapter_novel_num")
                    .table(Chapter::Table)
                    .col(Chapter::NovelId)
                    .col(Chapter::ChapterNum)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Denormalized vote counters never go negative
        manager
            .get_connection()
            .execute_unprepared(
                r"
                ALTER TABLE chapter
                ADD CONSTRAINT chk_chapter_vote_counts
                CHECK (like_count >= 0 AND dislike_count >= 0);
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Chapter::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Chapter {
    Table,
    Id,
    NovelId,
    AuthorId,
    ChapterNum,
    Title,
    Content,
    IsPublished,
    ViewCount,
    LikeCount,
    DislikeCount,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum Novel {
    Table,
    Id,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}
