//! Create vote table migration.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Vote::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Vote::Id).string_len(32).not_null().primary_key())
                    .col(ColumnDef::new(Vote::UserId).string_len(32).not_null())
                    .col(ColumnDef::new(Vote::NovelId).string_len(32))
                    .col(ColumnDef::new(Vote::ChapterId).string_len(32))
                    .col(ColumnDef::new(Vote::IsLike).boolean().not_null())
                    .col(
                        ColumnDef::new(Vote::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(Vote::UpdatedAt).timestamp_with_time_zone())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_user")
                            .from(Vote::Table, Vote::UserId)
                            .to(User::Table, User::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_novel")
                            .from(Vote::Table, Vote::NovelId)
                            .to(Novel::Table, Novel::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_vote_chapter")
                            .from(Vote::Table, Vote::ChapterId)
                            .to(Chapter::Table, Chapter::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, novel_id) - one vote per user per novel
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_user_novel")
                    .table(Vote::Table)
                    .col(Vote::UserId)
                    .col(Vote::NovelId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Unique index: (user_id, chapter_id) - one vote per user per chapter
        manager
            .create_index(
                Index::create()
                    .name("idx_vote_user_chapter")
                    .table(Vote::Table)
                    .col(Vote::UserId)
                    .col(Vote::ChapterId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        // Exactly one target per vote
        manager
            .get_connection()
            .execute_unprepared(
                r"
                ALTER TABLE vote
                ADD CONSTRAINT chk_vote_single_target
                CHECK ((novel_id IS NULL) <> (chapter_id IS NULL));
                ",
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Vote::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum Vote {
    Table,
    Id,
    UserId,
    NovelId,
    ChapterId,
    IsLike,
    CreatedAt,
    UpdatedAt,
}

#[derive(Iden)]
enum User {
    Table,
    Id,
}

#[derive(Iden)]
enum Novel {
    Table,
    Id,
}

#[derive(Iden)]
enum Chapter {
    Table,
    Id,
}
