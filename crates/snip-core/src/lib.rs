//! Core types and traits for the snip URL shortener.
//!
//! This crate defines the [`ShortenedUrl`] entity, the hash-based code
//! generator, and the two storage ports ([`UrlCache`] and [`UrlStore`])
//! that the cache and storage crates implement.

pub mod cache;
pub mod codegen;
pub mod error;
pub mod shortcode;
pub mod shortened;
pub mod store;

pub use cache::UrlCache;
pub use codegen::{encode_base62, generate_code};
pub use error::{CacheError, CoreError, StoreError};
pub use shortcode::ShortCode;
pub use shortened::ShortenedUrl;
pub use store::UrlStore;
