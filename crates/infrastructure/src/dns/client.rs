//! Policy-governed DNS client: cache-aware exchange orchestration plus
//! strategy-driven address lookup on top of the capability ports.

use crate::dns::cache::{CacheMetrics, MessageCache, TransportCacheKey};
use crate::dns::message::{
    apply_client_subnet, map_record_ttls, message_to_addresses, min_positive_ttl,
};
use hickory_proto::op::{Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::svcb::SvcParamKey;
use hickory_proto::rr::rdata::{HTTPS, SVCB};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};
use veil_dns_application::{DnsTransport, QueryContext, RdrcStore, ResponseChecker};
use veil_dns_domain::{
    AddressStrategy, DnsClientConfig, DnsError, QueryOptions, DEFAULT_MAX_CACHE_TTL,
};

/// Resolution core shared by every component that needs addresses for a
/// domain. Holds the response cache(s) and the policy knobs; transports and
/// the rejected-response store are injected through their ports.
///
/// Exactly one of the two cache maps exists, selected at construction:
/// shared-cache mode keys by question, independent-cache mode keys by
/// (question, transport tag).
pub struct DnsClient {
    timeout: Duration,
    disable_cache: bool,
    independent_cache: bool,
    min_cache_ttl: u32,
    max_cache_ttl: u32,
    rdrc: Option<Arc<dyn RdrcStore>>,
    cache: Option<MessageCache<Query>>,
    transport_cache: Option<MessageCache<TransportCacheKey>>,
}

impl DnsClient {
    pub fn new(config: DnsClientConfig) -> Self {
        let mut max_cache_ttl = config.max_cache_ttl;
        if max_cache_ttl == 0 {
            max_cache_ttl = DEFAULT_MAX_CACHE_TTL;
        }
        if config.min_cache_ttl > max_cache_ttl {
            max_cache_ttl = config.min_cache_ttl;
        }

        let timeout_ms = if config.timeout_ms == 0 {
            DnsClientConfig::default().timeout_ms
        } else {
            config.timeout_ms
        };

        let expire = !config.disable_expire;
        let (cache, transport_cache) = if config.disable_cache {
            (None, None)
        } else if config.independent_cache {
            (
                None,
                Some(MessageCache::new(
                    config.cache_capacity,
                    expire,
                    config.round_robin_cache,
                )),
            )
        } else {
            (
                Some(MessageCache::new(
                    config.cache_capacity,
                    expire,
                    config.round_robin_cache,
                )),
                None,
            )
        };

        Self {
            timeout: Duration::from_millis(timeout_ms),
            disable_cache: config.disable_cache,
            independent_cache: config.independent_cache,
            min_cache_ttl: config.min_cache_ttl,
            max_cache_ttl,
            rdrc: None,
            cache,
            transport_cache,
        }
    }

    pub fn with_rdrc(mut self, store: Arc<dyn RdrcStore>) -> Self {
        self.rdrc = Some(store);
        self
    }

    /// One validated, cache-aware query/response exchange through `transport`.
    ///
    /// Malformed (question-less) requests and strategy-excluded families are
    /// absorbed into synthetic responses so callers keep a single happy path;
    /// loopbacks, timeouts, transport failures and rejections surface as
    /// errors. A live rejection still carries the raw response inside the
    /// error for callers willing to use an untrusted answer.
    pub async fn exchange(
        &self,
        cx: &QueryContext,
        transport: &dyn DnsTransport,
        message: &Message,
        options: &QueryOptions,
        checker: Option<&ResponseChecker>,
    ) -> Result<Message, DnsError> {
        if message.queries().is_empty() {
            warn!("bad question size: 0");
            let mut response = Message::new(message.id(), MessageType::Response, OpCode::Query);
            response.set_response_code(ResponseCode::FormErr);
            return Ok(response);
        }
        let question = message.queries()[0].clone();

        let request_storage;
        let request: &Message = if let Some(subnet) = options.client_subnet {
            let mut cloned = message.clone();
            apply_client_subnet(&mut cloned, subnet);
            request_storage = cloned;
            &request_storage
        } else {
            message
        };

        let strategy_excluded = (question.query_type() == RecordType::A
            && options.strategy == AddressStrategy::Ipv6Only)
            || (question.query_type() == RecordType::AAAA
                && options.strategy == AddressStrategy::Ipv4Only);
        if strategy_excluded {
            debug!(
                name = %question.name(),
                record_type = %question.query_type(),
                "strategy rejected query family"
            );
            let mut response = Message::new(message.id(), MessageType::Response, OpCode::Query);
            response.set_response_code(ResponseCode::NoError);
            response.add_query(question);
            return Ok(response);
        }

        let is_simple = message.queries().len() == 1
            && message.name_servers().is_empty()
            && message.additionals().is_empty()
            && message.extensions().is_none()
            && options.client_subnet.is_none();
        let bypass_cache = !is_simple || self.disable_cache || options.disable_cache;

        if !bypass_cache {
            if let Some((mut response, remaining)) =
                self.load_response(&question, Some(transport.tag()))
            {
                debug!(
                    name = %question.name(),
                    record_type = %question.query_type(),
                    remaining,
                    "Cache HIT"
                );
                let mut header = *response.header();
                header.set_id(message.id());
                response.set_header(header);
                return Ok(response);
            }
        }

        if cx.is_active(transport.tag()) {
            return Err(DnsError::Loopback {
                transport: transport.tag().to_string(),
            });
        }
        let cx = cx.with_transport(transport.tag());

        if checker.is_some() {
            if let Some(rdrc) = &self.rdrc {
                if rdrc
                    .load_rejected(transport.tag(), question.name(), question.query_type())
                    .await
                {
                    return Err(DnsError::ResponseRejectedCached);
                }
            }
        }

        let message_id = message.id();
        let mut response =
            match tokio::time::timeout(self.timeout, transport.exchange(&cx, request)).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(DnsError::ExchangeTimeout {
                        transport: transport.tag().to_string(),
                    })
                }
            };

        if let Some(checker) = checker {
            let accepted = match message_to_addresses(&response) {
                Ok(addresses) => checker(&addresses),
                Err(_) => false,
            };
            if !accepted {
                self.persist_rejection(transport.tag(), &question);
                debug!(name = %question.name(), "Response rejected by checker");
                return Err(DnsError::ResponseRejected {
                    response: Box::new(response),
                });
            }
        }

        if question.query_type() == RecordType::HTTPS && options.strategy.is_single_family() {
            let stripped_key = if options.strategy == AddressStrategy::Ipv4Only {
                SvcParamKey::Ipv6Hint
            } else {
                SvcParamKey::Ipv4Hint
            };
            strip_https_hints(&mut response, stripped_key);
        }

        let ttl = match options.rewrite_ttl {
            Some(rewrite) => rewrite,
            None => min_positive_ttl(&response).clamp(self.min_cache_ttl, self.max_cache_ttl),
        };
        map_record_ttls(&mut response, |_| ttl);

        let mut header = *response.header();
        header.set_id(message_id);
        response.set_header(header);
        response.set_authoritative(true);

        if !bypass_cache {
            self.store_response(transport.tag(), question, response.clone(), ttl);
        }
        debug!(ttl, "Exchanged response");
        Ok(response)
    }

    /// Resolve `domain` to addresses under the configured strategy.
    ///
    /// Single-family strategies degrade to one exchange; dual-family
    /// strategies query A and AAAA concurrently and succeed as soon as either
    /// side yields addresses, suppressing the other side's error.
    pub async fn lookup(
        &self,
        cx: &QueryContext,
        transport: &dyn DnsTransport,
        domain: &str,
        options: &QueryOptions,
        checker: Option<&ResponseChecker>,
    ) -> Result<Vec<IpAddr>, DnsError> {
        let name = domain_to_fqdn(domain)?;
        match options.strategy {
            AddressStrategy::Ipv4Only => {
                self.lookup_to_exchange(cx, transport, &name, RecordType::A, options, checker)
                    .await
            }
            AddressStrategy::Ipv6Only => {
                self.lookup_to_exchange(cx, transport, &name, RecordType::AAAA, options, checker)
                    .await
            }
            _ => {
                let (response4, response6) = tokio::join!(
                    self.lookup_to_exchange(cx, transport, &name, RecordType::A, options, checker),
                    self.lookup_to_exchange(
                        cx,
                        transport,
                        &name,
                        RecordType::AAAA,
                        options,
                        checker
                    ),
                );
                merge_family_results(response4, response6, options.strategy)
            }
        }
    }

    /// Cache-only counterpart of [`lookup`](Self::lookup): never contacts a
    /// transport. Unavailable when the cache is off or keyed per transport
    /// (the transport is unknown without a real exchange).
    pub fn lookup_cache(&self, domain: &str, strategy: AddressStrategy) -> Option<Vec<IpAddr>> {
        if self.disable_cache || self.independent_cache {
            return None;
        }
        let name = domain_to_fqdn(domain).ok()?;
        match strategy {
            AddressStrategy::Ipv4Only => self.cached_addresses(&name, RecordType::A),
            AddressStrategy::Ipv6Only => self.cached_addresses(&name, RecordType::AAAA),
            _ => {
                let mut addresses4 = self
                    .cached_addresses(&name, RecordType::A)
                    .unwrap_or_default();
                let mut addresses6 = self
                    .cached_addresses(&name, RecordType::AAAA)
                    .unwrap_or_default();
                if addresses4.is_empty() && addresses6.is_empty() {
                    return None;
                }
                if strategy.prefers_ipv6() {
                    addresses6.append(&mut addresses4);
                    Some(addresses6)
                } else {
                    addresses4.append(&mut addresses6);
                    Some(addresses4)
                }
            }
        }
    }

    /// Cache-only counterpart of [`exchange`](Self::exchange) for callers
    /// holding a full message. Same disable conditions as
    /// [`lookup_cache`](Self::lookup_cache).
    pub fn exchange_cache(&self, message: &Message) -> Option<Message> {
        if self.disable_cache || self.independent_cache || message.queries().len() != 1 {
            return None;
        }
        let question = &message.queries()[0];
        let (mut response, remaining) = self.load_response(question, None)?;
        debug!(
            name = %question.name(),
            record_type = %question.query_type(),
            remaining,
            "Cache HIT"
        );
        let mut header = *response.header();
        header.set_id(message.id());
        response.set_header(header);
        Some(response)
    }

    pub fn clear_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.purge();
        }
        if let Some(cache) = &self.transport_cache {
            cache.purge();
        }
    }

    pub fn cache_metrics(&self) -> Option<Arc<CacheMetrics>> {
        if let Some(cache) = &self.cache {
            return Some(cache.metrics());
        }
        self.transport_cache.as_ref().map(|cache| cache.metrics())
    }

    async fn lookup_to_exchange(
        &self,
        cx: &QueryContext,
        transport: &dyn DnsTransport,
        name: &Name,
        record_type: RecordType,
        options: &QueryOptions,
        checker: Option<&ResponseChecker>,
    ) -> Result<Vec<IpAddr>, DnsError> {
        let question = Query::query(name.clone(), record_type);
        let bypass_cache = self.disable_cache || options.disable_cache;
        if !bypass_cache {
            if let Some(result) = self.question_cache(&question, Some(transport.tag())) {
                return result;
            }
        }
        let mut message = Message::new(fastrand::u16(..), MessageType::Query, OpCode::Query);
        message.set_recursion_desired(true);
        message.add_query(question);
        let response = self
            .exchange(cx, transport, &message, options, checker)
            .await?;
        message_to_addresses(&response)
    }

    /// Addresses derived from a cached response for `question`, or `None` on
    /// a cache miss. A hit with a non-success status yields the status error.
    fn question_cache(
        &self,
        question: &Query,
        transport_tag: Option<&str>,
    ) -> Option<Result<Vec<IpAddr>, DnsError>> {
        self.load_response(question, transport_tag)
            .map(|(response, _)| message_to_addresses(&response))
    }

    fn cached_addresses(&self, name: &Name, record_type: RecordType) -> Option<Vec<IpAddr>> {
        let question = Query::query(name.clone(), record_type);
        self.question_cache(&question, None)
            .map(|result| result.unwrap_or_default())
    }

    fn load_response(
        &self,
        question: &Query,
        transport_tag: Option<&str>,
    ) -> Option<(Message, u32)> {
        let now = Instant::now();
        if let Some(cache) = &self.cache {
            return cache.get(question, now);
        }
        if let (Some(cache), Some(tag)) = (&self.transport_cache, transport_tag) {
            return cache.get(&TransportCacheKey::new(question.clone(), tag), now);
        }
        None
    }

    fn store_response(&self, transport_tag: &str, question: Query, response: Message, ttl: u32) {
        let now = Instant::now();
        if let Some(cache) = &self.cache {
            cache.put(question, response, ttl, now);
        } else if let Some(cache) = &self.transport_cache {
            cache.put(
                TransportCacheKey::new(question, transport_tag),
                response,
                ttl,
                now,
            );
        }
    }

    /// Record the rejection fact without blocking the exchange; persistence
    /// failures are only logged.
    fn persist_rejection(&self, transport_tag: &str, question: &Query) {
        let Some(rdrc) = &self.rdrc else { return };
        let rdrc = Arc::clone(rdrc);
        let transport_tag = transport_tag.to_string();
        let name = question.name().clone();
        let record_type = question.query_type();
        tokio::spawn(async move {
            if let Err(error) = rdrc.save_rejected(&transport_tag, &name, record_type).await {
                warn!(%error, transport = %transport_tag, "Failed to persist rejected response");
            }
        });
    }
}

fn domain_to_fqdn(domain: &str) -> Result<Name, DnsError> {
    let mut name = Name::from_utf8(domain)
        .map_err(|error| DnsError::InvalidDomainName(format!("{domain}: {error}")))?;
    name.set_fqdn(true);
    Ok(name)
}

fn merge_family_results(
    response4: Result<Vec<IpAddr>, DnsError>,
    response6: Result<Vec<IpAddr>, DnsError>,
    strategy: AddressStrategy,
) -> Result<Vec<IpAddr>, DnsError> {
    let (mut addresses4, error4) = split_addresses(response4);
    let (mut addresses6, error6) = split_addresses(response6);

    if addresses4.is_empty() && addresses6.is_empty() {
        return match error4.or(error6) {
            Some(error) => Err(error),
            None => Ok(Vec::new()),
        };
    }
    // At least one family answered; the other side's error is suppressed.
    if strategy.prefers_ipv6() {
        addresses6.append(&mut addresses4);
        Ok(addresses6)
    } else {
        addresses4.append(&mut addresses6);
        Ok(addresses4)
    }
}

fn split_addresses(result: Result<Vec<IpAddr>, DnsError>) -> (Vec<IpAddr>, Option<DnsError>) {
    match result {
        Ok(addresses) => (addresses, None),
        Err(error) => (Vec::new(), Some(error)),
    }
}

/// Drop the given ip-hint parameter from every HTTPS answer, leaving other
/// records and parameters untouched.
fn strip_https_hints(response: &mut Message, stripped_key: SvcParamKey) {
    let answers = response
        .take_answers()
        .into_iter()
        .map(|record| {
            let rebuilt = if let RData::HTTPS(https) = record.data() {
                let params = https
                    .svc_params()
                    .iter()
                    .filter(|param| param.0 != stripped_key)
                    .cloned()
                    .collect();
                let svcb = SVCB::new(https.svc_priority(), https.target_name().clone(), params);
                let mut replacement = Record::from_rdata(
                    record.name().clone(),
                    record.ttl(),
                    RData::HTTPS(HTTPS(svcb)),
                );
                replacement.set_dns_class(record.dns_class());
                Some(replacement)
            } else {
                None
            };
            rebuilt.unwrap_or(record)
        })
        .collect();
    response.insert_answers(answers);
}
