use hickory_proto::op::Message;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum DnsError {
    #[error("Invalid domain name: {0}")]
    InvalidDomainName(String),

    #[error("DNS query loopback in transport[{transport}]")]
    Loopback { transport: String },

    /// Live rejection by the caller-supplied response checker. Carries the raw
    /// upstream response: the caller may still decide to use an untrusted
    /// answer.
    #[error("Response rejected")]
    ResponseRejected { response: Box<Message> },

    #[error("Response rejected (cached)")]
    ResponseRejectedCached,

    #[error("Exchange timeout in transport[{transport}]")]
    ExchangeTimeout { transport: String },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("{}", response_status_name(*code))]
    ResponseStatus { code: u16 },
}

impl DnsError {
    /// True for both the live and the cached rejection variant.
    pub fn is_rejected(&self) -> bool {
        matches!(
            self,
            DnsError::ResponseRejected { .. } | DnsError::ResponseRejectedCached
        )
    }
}

fn response_status_name(code: u16) -> String {
    match code {
        0 => "success".to_string(),
        1 => "format error".to_string(),
        2 => "server failure".to_string(),
        3 => "name error".to_string(),
        4 => "not implemented".to_string(),
        5 => "refused".to_string(),
        _ => format!("response status {code}"),
    }
}
