pub mod entities;
pub mod error;
pub mod models;
pub mod schema;
pub mod services;
pub mod status;
pub mod storage;
pub mod transform;
