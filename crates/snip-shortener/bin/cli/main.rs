mod cli;

use crate::cli::{CacheBackendArg, Command, StoreBackendArg, CLI};
use anyhow::Context;
use clap::Parser;
use snip_cache::{MokaUrlCache, RedisUrlCache};
use snip_core::{UrlCache, UrlStore};
use snip_shortener::{
    CachedRepository, ShortCode, ShortenedUrl, Shortener, ShortenerConfig, ShortenerService,
};
use snip_storage::{InMemoryStore, MySqlStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "info";

/// Builds the log filter from `RUST_LOG`-style directives, falling back to
/// `info` when they are absent or unparsable.
fn log_filter(directives: Option<&str>) -> EnvFilter {
    directives
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_FILTER))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let directives = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    tracing_subscriber::fmt()
        .with_env_filter(log_filter(directives.as_deref()))
        .with_writer(std::io::stderr)
        .init();

    let cli = CLI::parse();

    info!(
        cache_backend = %cli.cache,
        store_backend = %cli.store,
        public_host = %cli.public_host,
        "starting snip"
    );

    match cli.store {
        StoreBackendArg::InMemory => with_cache(cli, InMemoryStore::new()).await,
        StoreBackendArg::Mysql => {
            let dsn = cli
                .mysql_dsn
                .as_deref()
                .context("mysql dsn is required when store backend is mysql")?;
            let store = MySqlStore::connect(dsn).await?;
            store.ensure_schema().await?;
            with_cache(cli, store).await
        }
    }
}

async fn with_cache<S: UrlStore>(cli: CLI, store: S) -> anyhow::Result<()> {
    match cli.cache {
        CacheBackendArg::Moka => run(cli, store, MokaUrlCache::new()).await,
        CacheBackendArg::Redis => {
            let redis_url = cli
                .redis_url
                .as_deref()
                .context("redis url is required when cache backend is redis")?;
            let cache = RedisUrlCache::connect(redis_url, cli.redis_key_prefix.clone()).await?;
            run(cli, store, cache).await
        }
    }
}

async fn run<S: UrlStore, C: UrlCache>(cli: CLI, store: S, cache: C) -> anyhow::Result<()> {
    let config = ShortenerConfig::builder()
        .public_host(cli.public_host)
        .cache_ttl(Duration::from_secs(cli.cache_ttl_secs))
        .workers(cli.workers)
        .queue_capacity(cli.queue_capacity)
        .build();

    let repository = Arc::new(CachedRepository::new(store, cache, &config));
    let service = ShortenerService::from_shared(Arc::clone(&repository), &config);

    let outcome = execute(&service, &repository, cli.command).await;

    // Let queued population tasks finish before the runtime goes away.
    repository.shutdown().await;
    outcome
}

async fn execute<S: UrlStore, C: UrlCache>(
    service: &ShortenerService<CachedRepository<S, C>>,
    repository: &CachedRepository<S, C>,
    command: Command,
) -> anyhow::Result<()> {
    match command {
        Command::Shorten { url } => print_url(&service.shorten_url(&url).await?),
        Command::Get { code } => {
            let code = ShortCode::new(code)?;
            print_url(&service.get_by_short_code(&code).await?);
        }
        Command::List => {
            for url in service.list_shortened_urls().await? {
                print_url(&url);
            }
        }
        Command::Update { code, url } => {
            let code = ShortCode::new(code)?;
            print_url(&service.update_shortened_url(&code, &url).await?);
        }
        Command::Delete { code } => {
            let code = ShortCode::new(code)?;
            service.delete_shortened_url(&code).await?;
            println!("deleted {code}");
        }
        Command::FlushCache => {
            repository.flush_cache().await?;
            println!("cache flushed");
        }
    }
    Ok(())
}

fn print_url(url: &ShortenedUrl) {
    let shortened = url.shortened_url.as_deref().unwrap_or_default();
    println!("{}\t{}\t{}", url.short_code, shortened, url.original_url);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn log_filter_defaults_to_info() {
        assert_eq!(log_filter(None).max_level_hint(), Some(LevelFilter::INFO));
        assert_eq!(
            log_filter(Some("snip=loud")).max_level_hint(),
            Some(LevelFilter::INFO)
        );
    }

    #[test]
    fn log_filter_honors_directives() {
        assert_eq!(
            log_filter(Some("debug")).max_level_hint(),
            Some(LevelFilter::DEBUG)
        );
    }
}
