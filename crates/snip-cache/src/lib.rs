//! Cache implementations for the snip URL shortener.

pub mod moka;
pub mod redis;

pub use self::moka::MokaUrlCache;
pub use self::redis::RedisUrlCache;
pub use snip_core::{CacheError, UrlCache};
