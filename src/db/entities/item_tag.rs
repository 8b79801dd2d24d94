use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Association between a saved item and a tag name, scoped to one user.
/// A tag exists only as long as at least one of these rows names it.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "item_tags")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub user_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub item_id: i64,
    #[sea_orm(primary_key, auto_increment = false)]
    pub tag: String,
    pub time_added: ChronoDateTimeUtc,
    pub time_updated: ChronoDateTimeUtc,
    pub api_id: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::saved_item::Entity",
        from = "(Column::UserId, Column::ItemId)",
        to = "(super::saved_item::Column::UserId, super::saved_item::Column::ItemId)",
        on_delete = "Cascade",
        on_update = "Cascade"
    )]
    SavedItem,
}

impl Related<super::saved_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SavedItem.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
