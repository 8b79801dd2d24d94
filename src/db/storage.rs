use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::time::Duration;
use tracing::info;

use crate::db::error::ItemServiceError;

/// Connection handle a service is built with. Mutations require
/// `ReadWrite`; reads that follow a write in the same request reuse that
/// same handle so they observe the write.
#[derive(Clone, Debug)]
pub enum StorageContext {
    ReadOnly(DatabaseConnection),
    ReadWrite(DatabaseConnection),
}

impl StorageContext {
    pub fn conn(&self) -> &DatabaseConnection {
        match self {
            StorageContext::ReadOnly(conn) | StorageContext::ReadWrite(conn) => conn,
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(self, StorageContext::ReadWrite(_))
    }

    /// Returns the connection only if it may be written to.
    pub fn writer(&self) -> Result<&DatabaseConnection, ItemServiceError> {
        match self {
            StorageContext::ReadWrite(conn) => Ok(conn),
            StorageContext::ReadOnly(_) => Err(ItemServiceError::ReadOnlyStorage),
        }
    }
}

/// Primary and replica connection pools shared across requests.
#[derive(Clone, Debug)]
pub struct Storage {
    primary: DatabaseConnection,
    replica: DatabaseConnection,
}

impl Storage {
    pub fn new(primary: DatabaseConnection, replica: DatabaseConnection) -> Self {
        Self { primary, replica }
    }

    /// Uses one connection for both roles.
    pub fn single(conn: DatabaseConnection) -> Self {
        Self {
            primary: conn.clone(),
            replica: conn,
        }
    }

    pub async fn connect(
        primary_url: &str,
        replica_url: Option<&str>,
        max_connections: u32,
    ) -> Result<Self, DbErr> {
        let primary = Database::connect(connect_options(primary_url, max_connections)).await?;
        let replica = match replica_url {
            Some(url) if url != primary_url => {
                info!("Connecting to read replica.");
                Database::connect(connect_options(url, max_connections)).await?
            }
            _ => primary.clone(),
        };
        Ok(Self { primary, replica })
    }

    /// Context for plain reads. May lag behind recent writes.
    pub fn read_context(&self) -> StorageContext {
        StorageContext::ReadOnly(self.replica.clone())
    }

    /// Context for mutations and their read-backs.
    pub fn write_context(&self) -> StorageContext {
        StorageContext::ReadWrite(self.primary.clone())
    }
}

fn connect_options(url: &str, max_connections: u32) -> ConnectOptions {
    let mut opt = ConnectOptions::new(url.to_owned());
    opt.max_connections(max_connections)
        .connect_timeout(Duration::from_secs(10))
        .sqlx_logging(false);
    opt
}
