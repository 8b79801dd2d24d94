//! SeaORM entities for the saved-item tables.

pub mod item_tag;
pub mod saved_item;

pub mod prelude {
    pub use super::saved_item::ActiveModel as SavedItemActiveModel;
    pub use super::saved_item::Column as SavedItemColumn;
    pub use super::saved_item::Entity as SavedItemEntity;
    pub use super::saved_item::Model as SavedItemRow;

    pub use super::item_tag::ActiveModel as ItemTagActiveModel;
    pub use super::item_tag::Column as ItemTagColumn;
    pub use super::item_tag::Entity as ItemTagEntity;
    pub use super::item_tag::Model as ItemTagRow;
}
