use sea_orm::{ConnectionTrait, DbErr, EntityTrait, Schema};
use tracing::info;

use crate::db::entities::{item_tag, saved_item};

/// Creates the saved-item tables if they do not exist yet.
pub async fn create_tables<C: ConnectionTrait>(conn: &C) -> Result<(), DbErr> {
    create_table(conn, saved_item::Entity).await?;
    create_table(conn, item_tag::Entity).await?;
    info!("Saved-item schema is in place.");
    Ok(())
}

async fn create_table<C, E>(conn: &C, entity: E) -> Result<(), DbErr>
where
    C: ConnectionTrait,
    E: EntityTrait,
{
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);
    let mut stmt = schema.create_table_from_entity(entity);
    stmt.if_not_exists();
    conn.execute(backend.build(&stmt)).await?;
    Ok(())
}
