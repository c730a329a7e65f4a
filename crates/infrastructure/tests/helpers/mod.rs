#![allow(dead_code)]

use async_trait::async_trait;
use hickory_proto::op::{Message, MessageType, OpCode, Query};
use hickory_proto::rr::{Name, RecordType};
use std::collections::HashSet;
use std::net::IpAddr;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Mutex;
use std::time::Duration;
use veil_dns_application::{DnsTransport, QueryContext, RdrcStore};
use veil_dns_domain::DnsError;
use veil_dns_infrastructure::dns::fixed_response;

pub fn name(domain: &str) -> Name {
    Name::from_str(domain).unwrap()
}

pub fn question(domain: &str, record_type: RecordType) -> Query {
    Query::query(name(domain), record_type)
}

pub fn query_message(id: u16, domain: &str, record_type: RecordType) -> Message {
    let mut message = Message::new(id, MessageType::Query, OpCode::Query);
    message.set_recursion_desired(true);
    message.add_query(question(domain, record_type));
    message
}

/// Success response answering the request with the given addresses. The
/// response id is deliberately scrambled so tests can observe the client
/// restoring the caller's id.
pub fn canned_response(request: &Message, addresses: &[IpAddr], ttl: u32) -> Message {
    fixed_response(
        request.id().wrapping_add(1),
        &request.queries()[0],
        addresses,
        ttl,
    )
}

type Handler = Box<dyn Fn(&Message) -> Result<Message, DnsError> + Send + Sync>;

/// Scripted transport: counts exchanges and answers via the supplied handler.
pub struct MockTransport {
    tag: String,
    handler: Handler,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockTransport {
    pub fn new(
        tag: &str,
        handler: impl Fn(&Message) -> Result<Message, DnsError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            tag: tag.to_string(),
            handler: Box::new(handler),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    /// Delay every exchange; combined with a paused tokio clock this makes
    /// deadline behavior deterministic.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(AtomicOrdering::SeqCst)
    }
}

#[async_trait]
impl DnsTransport for MockTransport {
    async fn exchange(&self, _cx: &QueryContext, message: &Message) -> Result<Message, DnsError> {
        self.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        (self.handler)(message)
    }

    fn tag(&self) -> &str {
        &self.tag
    }
}

/// In-memory rejected-response store.
#[derive(Default)]
pub struct MockRdrc {
    rejected: Mutex<HashSet<(String, String, RecordType)>>,
}

impl MockRdrc {
    pub fn mark_rejected(&self, transport_tag: &str, name: &Name, record_type: RecordType) {
        self.rejected.lock().unwrap().insert((
            transport_tag.to_string(),
            name.to_string(),
            record_type,
        ));
    }

    pub fn contains(&self, transport_tag: &str, name: &Name, record_type: RecordType) -> bool {
        self.rejected.lock().unwrap().contains(&(
            transport_tag.to_string(),
            name.to_string(),
            record_type,
        ))
    }
}

#[async_trait]
impl RdrcStore for MockRdrc {
    async fn load_rejected(
        &self,
        transport_tag: &str,
        name: &Name,
        record_type: RecordType,
    ) -> bool {
        self.contains(transport_tag, name, record_type)
    }

    async fn save_rejected(
        &self,
        transport_tag: &str,
        name: &Name,
        record_type: RecordType,
    ) -> Result<(), DnsError> {
        self.mark_rejected(transport_tag, name, record_type);
        Ok(())
    }
}
