use async_trait::async_trait;
use hickory_proto::rr::{Name, RecordType};
use veil_dns_domain::DnsError;

/// Rejected DNS response cache: remembers that a transport previously
/// returned an answer failing validation for a (name, type) pair, so the
/// exchange path can skip it without contacting the transport again.
///
/// Persistence is owned by the implementation; the client only reads facts
/// and dispatches saves on a detached task, logging failures.
#[async_trait]
pub trait RdrcStore: Send + Sync {
    async fn load_rejected(&self, transport_tag: &str, name: &Name, record_type: RecordType)
        -> bool;

    async fn save_rejected(
        &self,
        transport_tag: &str,
        name: &Name,
        record_type: RecordType,
    ) -> Result<(), DnsError>;
}
