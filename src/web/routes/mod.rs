pub mod saved_item_routes;
pub mod tag_routes;
