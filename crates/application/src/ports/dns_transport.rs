use crate::context::QueryContext;
use async_trait::async_trait;
use hickory_proto::op::Message;
use std::net::IpAddr;
use veil_dns_domain::DnsError;

/// Validation hook applied to the addresses extracted from an upstream
/// response; returning `false` marks the response rejected.
pub type ResponseChecker = dyn Fn(&[IpAddr]) -> bool + Send + Sync;

/// One upstream exchange medium (UDP, TCP, DoT, DoH, DHCP-discovered, ...).
///
/// `tag` is the stable identity used for independent caching, rejected
/// response bookkeeping, and loopback detection; two transports must never
/// share one.
#[async_trait]
pub trait DnsTransport: Send + Sync {
    /// Perform one query/response exchange. Implementations that need to
    /// resolve their own server name must pass `cx` down to nested lookups so
    /// loopbacks stay detectable.
    async fn exchange(&self, cx: &QueryContext, message: &Message) -> Result<Message, DnsError>;

    fn tag(&self) -> &str;
}
