pub mod context;
pub mod db;
pub mod events;
pub mod resolver;
pub mod server;
pub mod web;

#[cfg(test)]
pub(crate) mod test_support;
