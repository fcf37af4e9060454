use clap::{Parser, Subcommand, ValueEnum};
use snip_cache::redis::DEFAULT_KEY_PREFIX;
use snip_shortener::config::{DEFAULT_CACHE_TTL, DEFAULT_QUEUE_CAPACITY, DEFAULT_WORKERS};
use std::fmt::{Display, Formatter};

pub const PUBLIC_HOST_ENV: &str = "SNIP_PUBLIC_HOST";
pub const CACHE_BACKEND_ENV: &str = "SNIP_CACHE_BACKEND";
pub const REDIS_URL_ENV: &str = "SNIP_REDIS_URL";
pub const REDIS_KEY_PREFIX_ENV: &str = "SNIP_REDIS_KEY_PREFIX";
pub const STORE_BACKEND_ENV: &str = "SNIP_STORE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "SNIP_MYSQL_DSN";
pub const CACHE_TTL_SECS_ENV: &str = "SNIP_CACHE_TTL_SECS";
pub const WORKERS_ENV: &str = "SNIP_WORKERS";
pub const QUEUE_CAPACITY_ENV: &str = "SNIP_QUEUE_CAPACITY";

pub const DEFAULT_PUBLIC_HOST: &str = "http://localhost:8080";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    #[value(name = "moka")]
    Moka,
    #[value(name = "redis")]
    Redis,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::Moka => write!(f, "moka"),
            CacheBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StoreBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreBackendArg::InMemory => write!(f, "in-memory"),
            StoreBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

/// The in-memory backends live for a single invocation; use `mysql` and
/// `redis` to keep records between runs.
#[derive(Debug, Parser)]
#[command(name = "snip", about = "Cache-aside URL shortener")]
pub struct CLI {
    #[arg(long, env = PUBLIC_HOST_ENV, default_value = DEFAULT_PUBLIC_HOST)]
    pub public_host: String,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::Moka
    )]
    pub cache: CacheBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("cache", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = REDIS_KEY_PREFIX_ENV, default_value = DEFAULT_KEY_PREFIX)]
    pub redis_key_prefix: String,

    #[arg(
        long,
        env = STORE_BACKEND_ENV,
        value_enum,
        default_value_t = StoreBackendArg::InMemory
    )]
    pub store: StoreBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("store", "mysql"))]
    pub mysql_dsn: Option<String>,

    /// Expiry of populated cache entries; 0 disables expiry.
    #[arg(long, env = CACHE_TTL_SECS_ENV, default_value_t = DEFAULT_CACHE_TTL.as_secs())]
    pub cache_ttl_secs: u64,

    #[arg(long, env = WORKERS_ENV, default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    #[arg(long, env = QUEUE_CAPACITY_ENV, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Create a short code for a URL
    Shorten { url: String },
    /// Resolve a short code
    Get { code: String },
    /// List every shortened URL
    List,
    /// Point a short code at a new URL
    Update { code: String, url: String },
    /// Delete a short code
    Delete { code: String },
    /// Drop every cached record
    FlushCache,
}
