use std::time::Duration;
use typed_builder::TypedBuilder;

pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_WORKERS: usize = 5;
pub const DEFAULT_QUEUE_CAPACITY: usize = 100;
pub const DEFAULT_POPULATION_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_MAX_ATTEMPTS: u32 = 10;

/// Settings for the repository and service, fixed at construction time.
///
/// ```
/// use snip_shortener::ShortenerConfig;
/// use std::time::Duration;
///
/// let config = ShortenerConfig::builder()
///     .public_host("http://localhost:8080")
///     .cache_ttl(Duration::from_secs(300))
///     .build();
/// assert_eq!(config.workers, 5);
/// ```
#[derive(Debug, Clone, TypedBuilder)]
pub struct ShortenerConfig {
    /// Scheme and authority prepended to codes, e.g. `http://localhost:8080`.
    #[builder(setter(into))]
    pub public_host: String,
    /// Expiry of entries written by the population workers.
    #[builder(default = DEFAULT_CACHE_TTL)]
    pub cache_ttl: Duration,
    /// Number of cache population workers.
    #[builder(default = DEFAULT_WORKERS)]
    pub workers: usize,
    /// Capacity of the population queue; tasks beyond it are shed.
    #[builder(default = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,
    /// Upper bound on a single population task, independent of any request.
    #[builder(default = DEFAULT_POPULATION_TIMEOUT)]
    pub population_timeout: Duration,
    /// Code generation attempts before giving up on collisions.
    #[builder(default = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,
}

/// The part of [`ShortenerConfig`] the population pool needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulationSettings {
    pub workers: usize,
    pub queue_capacity: usize,
    pub cache_ttl: Duration,
    pub timeout: Duration,
}

impl From<&ShortenerConfig> for PopulationSettings {
    fn from(config: &ShortenerConfig) -> Self {
        Self {
            workers: config.workers,
            queue_capacity: config.queue_capacity,
            cache_ttl: config.cache_ttl,
            timeout: config.population_timeout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_defaults() {
        let config = ShortenerConfig::builder().public_host("http://sn.ip").build();

        assert_eq!(config.public_host, "http://sn.ip");
        assert_eq!(config.cache_ttl, DEFAULT_CACHE_TTL);
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.population_timeout, DEFAULT_POPULATION_TIMEOUT);
        assert_eq!(config.max_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn population_settings_from_config() {
        let config = ShortenerConfig::builder()
            .public_host("http://sn.ip")
            .workers(2)
            .queue_capacity(8)
            .cache_ttl(Duration::from_secs(30))
            .build();

        let settings = PopulationSettings::from(&config);
        assert_eq!(
            settings,
            PopulationSettings {
                workers: 2,
                queue_capacity: 8,
                cache_ttl: Duration::from_secs(30),
                timeout: DEFAULT_POPULATION_TIMEOUT,
            }
        );
    }
}
