mod dns_transport;
mod rdrc_store;

pub use dns_transport::{DnsTransport, ResponseChecker};
pub use rdrc_store::RdrcStore;
