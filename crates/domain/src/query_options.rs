use crate::AddressStrategy;
use ipnetwork::IpNetwork;

/// Per-call query configuration. Built by the caller for a single lookup or
/// exchange and dropped afterwards; nothing in here is persisted.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub strategy: AddressStrategy,
    /// Bypass the response cache for this call only.
    pub disable_cache: bool,
    /// Replace the computed TTL outright, ignoring the configured clamp range.
    pub rewrite_ttl: Option<u32>,
    /// EDNS0 client-subnet hint forwarded to the upstream. Its presence makes
    /// the request cache-ineligible.
    pub client_subnet: Option<IpNetwork>,
}
