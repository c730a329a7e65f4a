use serde::{Deserialize, Serialize};

/// Construction-time configuration for the DNS client.
///
/// Values are normalized by the client itself: a capacity below
/// [`MIN_CACHE_CAPACITY`] is raised to it, a zero `max_cache_ttl` falls back
/// to [`DEFAULT_MAX_CACHE_TTL`], and a min above max drags max up with it.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DnsClientConfig {
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default)]
    pub disable_cache: bool,

    /// Entries never age out by time; only eviction and purge remove them.
    #[serde(default)]
    pub disable_expire: bool,

    /// Key the cache by (question, transport tag) instead of question alone.
    #[serde(default)]
    pub independent_cache: bool,

    /// Rotate A/AAAA answers across successive reads of the same entry.
    #[serde(default)]
    pub round_robin_cache: bool,

    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: u32,

    #[serde(default)]
    pub min_cache_ttl: u32,

    #[serde(default)]
    pub max_cache_ttl: u32,
}

impl Default for DnsClientConfig {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            disable_cache: false,
            disable_expire: false,
            independent_cache: false,
            round_robin_cache: false,
            cache_capacity: default_cache_capacity(),
            min_cache_ttl: 0,
            max_cache_ttl: 0,
        }
    }
}

pub const MIN_CACHE_CAPACITY: u32 = 1024;
pub const DEFAULT_MAX_CACHE_TTL: u32 = 86_400;

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_cache_capacity() -> u32 {
    MIN_CACHE_CAPACITY
}
