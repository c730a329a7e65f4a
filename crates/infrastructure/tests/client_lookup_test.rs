mod helpers;

use helpers::{canned_response, MockTransport};
use hickory_proto::op::Message;
use hickory_proto::rr::RecordType;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::sync::{Arc, Mutex};
use veil_dns_application::QueryContext;
use veil_dns_domain::{AddressStrategy, DnsClientConfig, DnsError, QueryOptions};
use veil_dns_infrastructure::dns::DnsClient;

const V4: IpAddr = IpAddr::V4(Ipv4Addr::new(1, 1, 1, 1));
const V6: IpAddr = IpAddr::V6(Ipv6Addr::LOCALHOST);

/// Transport answering A with `V4`, AAAA with `V6`, recording the requested
/// record types.
fn dual_stack_upstream(seen: Arc<Mutex<Vec<RecordType>>>) -> MockTransport {
    MockTransport::new("dns-dual", move |request: &Message| {
        let record_type = request.queries()[0].query_type();
        seen.lock().unwrap().push(record_type);
        let addresses: &[IpAddr] = match record_type {
            RecordType::A => &[V4],
            RecordType::AAAA => &[V6],
            _ => &[],
        };
        Ok(canned_response(request, addresses, 300))
    })
}

fn options(strategy: AddressStrategy) -> QueryOptions {
    QueryOptions {
        strategy,
        ..QueryOptions::default()
    }
}

#[tokio::test]
async fn dual_family_lookup_merges_ipv4_first_by_default() {
    let client = DnsClient::new(DnsClientConfig::default());
    let transport = dual_stack_upstream(Arc::default());

    let addresses = client
        .lookup(
            &QueryContext::new(),
            &transport,
            "merge.example",
            &options(AddressStrategy::Auto),
            None,
        )
        .await
        .unwrap();

    assert_eq!(addresses, vec![V4, V6]);
    assert_eq!(transport.calls(), 2, "one exchange per family");
}

#[tokio::test]
async fn prefer_ipv6_puts_ipv6_results_first() {
    let client = DnsClient::new(DnsClientConfig::default());
    let transport = dual_stack_upstream(Arc::default());

    let addresses = client
        .lookup(
            &QueryContext::new(),
            &transport,
            "merge.example",
            &options(AddressStrategy::PreferIpv6),
            None,
        )
        .await
        .unwrap();

    assert_eq!(addresses, vec![V6, V4]);
}

#[tokio::test]
async fn single_family_strategies_query_one_record_type() {
    let client = DnsClient::new(DnsClientConfig::default());
    let seen = Arc::new(Mutex::new(Vec::new()));
    let transport = dual_stack_upstream(seen.clone());

    let addresses = client
        .lookup(
            &QueryContext::new(),
            &transport,
            "single.example",
            &options(AddressStrategy::Ipv4Only),
            None,
        )
        .await
        .unwrap();

    assert_eq!(addresses, vec![V4]);
    assert_eq!(*seen.lock().unwrap(), vec![RecordType::A]);
}

#[tokio::test]
async fn one_answering_family_suppresses_the_other_sides_error() {
    let client = DnsClient::new(DnsClientConfig::default());
    let transport = MockTransport::new("dns-halting", |request: &Message| {
        match request.queries()[0].query_type() {
            RecordType::AAAA => Ok(canned_response(request, &[V6], 300)),
            _ => Err(DnsError::Transport("ipv4 upstream down".to_string())),
        }
    });

    let addresses = client
        .lookup(
            &QueryContext::new(),
            &transport,
            "flaky.example",
            &options(AddressStrategy::Auto),
            None,
        )
        .await
        .expect("one family answering is a success");

    assert_eq!(addresses, vec![V6]);
}

#[tokio::test]
async fn both_families_failing_surfaces_the_error() {
    let client = DnsClient::new(DnsClientConfig::default());
    let transport = MockTransport::new("dns-down", |_request: &Message| {
        Err(DnsError::Transport("unreachable".to_string()))
    });

    let error = client
        .lookup(
            &QueryContext::new(),
            &transport,
            "down.example",
            &options(AddressStrategy::Auto),
            None,
        )
        .await
        .unwrap_err();

    assert!(matches!(error, DnsError::Transport(_)));
}

#[tokio::test]
async fn empty_answers_on_both_sides_are_an_empty_success() {
    let client = DnsClient::new(DnsClientConfig::default());
    let transport = MockTransport::new("dns-empty", |request: &Message| {
        Ok(canned_response(request, &[], 300))
    });

    let addresses = client
        .lookup(
            &QueryContext::new(),
            &transport,
            "empty.example",
            &options(AddressStrategy::Auto),
            None,
        )
        .await
        .unwrap();

    assert!(addresses.is_empty());
}

#[tokio::test]
async fn lookup_cache_serves_previous_lookups_without_a_transport() {
    let client = DnsClient::new(DnsClientConfig::default());
    let transport = dual_stack_upstream(Arc::default());

    assert_eq!(
        client.lookup_cache("cached.example", AddressStrategy::Auto),
        None,
        "cold cache misses"
    );

    client
        .lookup(
            &QueryContext::new(),
            &transport,
            "cached.example",
            &options(AddressStrategy::Auto),
            None,
        )
        .await
        .unwrap();
    let calls_after_lookup = transport.calls();

    let cached = client
        .lookup_cache("cached.example", AddressStrategy::Auto)
        .expect("warm cache hits");
    assert_eq!(cached, vec![V4, V6]);

    let cached = client
        .lookup_cache("cached.example", AddressStrategy::PreferIpv6)
        .unwrap();
    assert_eq!(cached, vec![V6, V4], "merge order follows the strategy");

    assert_eq!(transport.calls(), calls_after_lookup, "cache-only path");
}

#[tokio::test]
async fn lookup_cache_is_disabled_in_independent_cache_mode() {
    let config = DnsClientConfig {
        independent_cache: true,
        ..DnsClientConfig::default()
    };
    let client = DnsClient::new(config);
    let transport = dual_stack_upstream(Arc::default());

    client
        .lookup(
            &QueryContext::new(),
            &transport,
            "independent.example",
            &options(AddressStrategy::Auto),
            None,
        )
        .await
        .unwrap();

    assert_eq!(
        client.lookup_cache("independent.example", AddressStrategy::Auto),
        None,
        "the transport is unknown without a real exchange"
    );
}

#[tokio::test]
async fn exchange_cache_answers_full_message_callers() {
    let client = DnsClient::new(DnsClientConfig::default());
    let transport = dual_stack_upstream(Arc::default());
    let request = helpers::query_message(21, "full.example.", RecordType::A);

    assert!(client.exchange_cache(&request).is_none(), "cold cache");

    client
        .exchange(
            &QueryContext::new(),
            &transport,
            &request,
            &QueryOptions::default(),
            None,
        )
        .await
        .unwrap();

    let follow_up = helpers::query_message(22, "full.example.", RecordType::A);
    let response = client
        .exchange_cache(&follow_up)
        .expect("warm cache answers without a transport");
    assert_eq!(response.id(), 22);
    assert_eq!(transport.calls(), 1);
}

#[tokio::test]
async fn clear_cache_forgets_everything() {
    let client = DnsClient::new(DnsClientConfig::default());
    let transport = dual_stack_upstream(Arc::default());

    client
        .lookup(
            &QueryContext::new(),
            &transport,
            "forget.example",
            &options(AddressStrategy::Auto),
            None,
        )
        .await
        .unwrap();
    assert!(client
        .lookup_cache("forget.example", AddressStrategy::Auto)
        .is_some());

    client.clear_cache();
    assert_eq!(client.lookup_cache("forget.example", AddressStrategy::Auto), None);
}
