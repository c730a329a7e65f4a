//! Veil DNS Infrastructure Layer
//!
//! The resolution core: response cache engine, exchange orchestration and
//! strategy-aware lookup, built on the application-layer capability ports.
pub mod dns;

pub use dns::{DnsClient, MessageCache, TransportCacheKey};
