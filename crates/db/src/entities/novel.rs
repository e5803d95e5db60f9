//! Novel entity.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Novel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(8))")]
#[serde(rename_all = "UPPERCASE")]
pub enum NovelCategory {
    /// Single-body short story
    #[sea_orm(string_value = "SHORT")]
    Short,
    /// Serialized novel published chapter by chapter
    #[sea_orm(string_value = "LONG")]
    Long,
}

impl NovelCategory {
    /// Parse a category name as sent by clients (`SHORT` / `LONG`).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "SHORT" => Some(Self::Short),
            "LONG" => Some(Self::Long),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[sea_orm(table_name = "novel")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: String,

    pub title: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub description: Option<String>,

    /// Body text (short novels only)
    #[sea_orm(column_type = "Text", nullable)]
    pub content: Option<String>,

    pub category: NovelCategory,

    #[sea_orm(indexed)]
    pub author_id: String,

    #[sea_orm(default_value = true)]
    pub is_published: bool,

    #[sea_orm(default_value = 0)]
    pub view_count: i32,

    /// Like count (denormalized from the vote ledger)
    #[sea_orm(default_value = 0)]
    pub like_count: i32,

    /// Dislike count (denormalized from the vote ledger)
    #[sea_orm(default_value = 0)]
    pub dislike_count: i32,

    pub created_at: DateTimeWithTimeZone,

    #[sea_orm(nullable)]
    pub updated_at: Option<DateTimeWithTimeZone>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::user::Entity",
        from = "Column::AuthorId",
        to = "super::user::Column::Id",
        on_delete = "Cascade"
    )]
    Author,

    #[sea_orm(has_many = "super::chapter::Entity")]
    Chapters,

    #[sea_orm(has_many = "super::comment::Entity")]
    Comments,

    #[sea_orm(has_many = "super::vote::Entity")]
    Votes,
}

impl Related<super::user::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Author.def()
    }
}

impl Related<super::chapter::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Chapters.def()
    }
}

impl Related<super::comment::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Comments.def()
    }
}

impl Related<super::vote::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Votes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
