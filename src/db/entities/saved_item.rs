use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Raw row of the `list` table. One row per (user, canonical item).
///
/// Date columns never hold NULL; an unset date is stored as the zero
/// sentinel (see [`crate::db::transform::ZERO_DATE`]).
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "list")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_id: i64,
    pub resolved_id: Option<i64>,
    pub given_url: String,
    pub title: Option<String>,
    pub status: i16,
    pub favorite: i16,
    pub time_added: ChronoDateTimeUtc,
    pub time_updated: ChronoDateTimeUtc,
    // Archived-at.
    pub time_read: ChronoDateTimeUtc,
    pub time_favorited: ChronoDateTimeUtc,
    pub api_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::item_tag::Entity")]
    ItemTag,
}

impl Related<super::item_tag::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::ItemTag.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
