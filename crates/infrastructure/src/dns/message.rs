//! Message construction and inspection helpers built on `hickory-proto`.
//!
//! Synthetic response builders are used by collaborators (fake-IP, static
//! overrides) that must hand callers a finished answer without a real
//! exchange; address extraction is the shared read path for lookups and
//! response checking.

use hickory_proto::op::{Edns, Message, MessageType, OpCode, Query, ResponseCode};
use hickory_proto::rr::rdata::opt::{ClientSubnet, EdnsOption};
use hickory_proto::rr::rdata::svcb::SvcParamValue;
use hickory_proto::rr::rdata::{A, AAAA, CNAME, MX, TXT};
use hickory_proto::rr::{Name, RData, Record, RecordType};
use ipnetwork::IpNetwork;
use std::net::IpAddr;
use veil_dns_domain::DnsError;

fn response_skeleton(id: u16, question: &Query) -> Message {
    let mut response = Message::new(id, MessageType::Response, OpCode::Query);
    response.set_response_code(ResponseCode::NoError);
    response.add_query(question.clone());
    response
}

/// Success response answering `question` with the given addresses. Addresses
/// of the wrong family for the question type are skipped.
pub fn fixed_response(id: u16, question: &Query, addresses: &[IpAddr], ttl: u32) -> Message {
    let mut response = response_skeleton(id, question);
    for address in addresses {
        let rdata = match address {
            IpAddr::V4(v4) if question.query_type() == RecordType::A => RData::A(A(*v4)),
            IpAddr::V6(v6) if question.query_type() == RecordType::AAAA => RData::AAAA(AAAA(*v6)),
            _ => continue,
        };
        response.add_answer(Record::from_rdata(question.name().clone(), ttl, rdata));
    }
    response
}

pub fn fixed_response_cname(id: u16, question: &Query, target: Name, ttl: u32) -> Message {
    let mut response = response_skeleton(id, question);
    response.add_answer(Record::from_rdata(
        question.name().clone(),
        ttl,
        RData::CNAME(CNAME(target)),
    ));
    response
}

pub fn fixed_response_txt(id: u16, question: &Query, records: Vec<String>, ttl: u32) -> Message {
    let mut response = response_skeleton(id, question);
    response.add_answer(Record::from_rdata(
        question.name().clone(),
        ttl,
        RData::TXT(TXT::new(records)),
    ));
    response
}

pub fn fixed_response_mx(id: u16, question: &Query, records: &[(u16, Name)], ttl: u32) -> Message {
    let mut response = response_skeleton(id, question);
    for (preference, exchange) in records {
        response.add_answer(Record::from_rdata(
            question.name().clone(),
            ttl,
            RData::MX(MX::new(*preference, exchange.clone())),
        ));
    }
    response
}

/// Resolved addresses carried by a response: A/AAAA answers plus the ip-hint
/// parameters embedded in HTTPS service-binding records.
///
/// A non-success status other than name-not-found is an error; NXDomain
/// yields an empty list.
pub fn message_to_addresses(response: &Message) -> Result<Vec<IpAddr>, DnsError> {
    let rcode = response.response_code();
    if rcode != ResponseCode::NoError && rcode != ResponseCode::NXDomain {
        return Err(DnsError::ResponseStatus {
            code: u16::from(rcode),
        });
    }
    let mut addresses = Vec::with_capacity(response.answers().len());
    for record in response.answers() {
        match record.data() {
            RData::A(a) => addresses.push(IpAddr::V4(a.0)),
            RData::AAAA(aaaa) => addresses.push(IpAddr::V6(aaaa.0)),
            RData::HTTPS(https) => {
                for (_, value) in https.svc_params() {
                    match value {
                        SvcParamValue::Ipv4Hint(hint) => {
                            addresses.extend(hint.0.iter().map(|a| IpAddr::V4(a.0)));
                        }
                        SvcParamValue::Ipv6Hint(hint) => {
                            addresses.extend(hint.0.iter().map(|aaaa| IpAddr::V6(aaaa.0)));
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }
    Ok(addresses)
}

/// Attach an EDNS0 client-subnet option hinting the querying client's network
/// to the upstream. Requests carrying the hint are cache-ineligible.
pub fn apply_client_subnet(message: &mut Message, subnet: IpNetwork) {
    let edns = message.extensions_mut().get_or_insert_with(Edns::new);
    edns.options_mut().insert(EdnsOption::Subnet(ClientSubnet::new(
        subnet.ip(),
        subnet.prefix(),
        0,
    )));
}

/// Minimum positive TTL across the answer, authority and additional sections;
/// 0 when every record's TTL is 0 (or there are no records).
pub(crate) fn min_positive_ttl(message: &Message) -> u32 {
    let mut ttl = 0u32;
    for record in message
        .answers()
        .iter()
        .chain(message.name_servers())
        .chain(message.additionals())
    {
        if ttl == 0 || (record.ttl() > 0 && record.ttl() < ttl) {
            ttl = record.ttl();
        }
    }
    ttl
}

/// Rewrite the TTL of every record in all three record sections.
pub(crate) fn map_record_ttls(message: &mut Message, f: impl Fn(u32) -> u32) {
    let mut answers = message.take_answers();
    for record in &mut answers {
        record.set_ttl(f(record.ttl()));
    }
    message.insert_answers(answers);

    let mut name_servers = message.take_name_servers();
    for record in &mut name_servers {
        record.set_ttl(f(record.ttl()));
    }
    message.insert_name_servers(name_servers);

    let mut additionals = message.take_additionals();
    for record in &mut additionals {
        record.set_ttl(f(record.ttl()));
    }
    message.insert_additionals(additionals);
}
