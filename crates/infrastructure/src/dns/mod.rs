pub mod cache;
pub mod client;
pub mod message;

pub use cache::{CacheMetrics, MessageCache, TransportCacheKey};
pub use client::DnsClient;
pub use message::{
    apply_client_subnet, fixed_response, fixed_response_cname, fixed_response_mx,
    fixed_response_txt, message_to_addresses,
};
