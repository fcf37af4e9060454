//! Cache-aside URL shortener.
//!
//! [`ShortenerService`] turns URLs into hash-derived short codes and retries
//! collisions with a salt. [`CachedRepository`] serves reads from a
//! [`UrlCache`](snip_core::UrlCache) and falls back to a durable
//! [`UrlStore`](snip_core::UrlStore), repopulating the cache through a
//! bounded [`PopulationPool`]. Core types are re-exported from `snip_core`.

pub mod config;
pub mod error;
pub mod population;
pub mod repository;
pub mod service;

pub use config::ShortenerConfig;
pub use error::ShortenerError;
pub use population::{Epoch, PopulationPool, PopulationStats};
pub use repository::{CachedRepository, ShortenedRepository};
pub use service::{Shortener, ShortenerService};
pub use snip_core::{ShortCode, ShortenedUrl};
