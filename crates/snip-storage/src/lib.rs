//! Durable store implementations for the snip URL shortener.

pub mod memory;
pub mod mysql;

pub use memory::InMemoryStore;
pub use mysql::MySqlStore;
pub use snip_core::{StoreError, UrlStore};
