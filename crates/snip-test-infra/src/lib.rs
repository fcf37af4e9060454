//! Disposable containers for integration tests.
//!
//! Every fixture requires a running Docker daemon.

pub mod error;
pub mod mysql;
pub mod redis;

pub use error::{Result, TestInfraError};
pub use mysql::{MySqlConfig, MySqlServer};
pub use redis::RedisServer;
