//! Veil DNS Application Layer
//!
//! Capability contracts consumed by the resolution core, plus the
//! call-scoped context that ties nested exchanges together.
pub mod context;
pub mod ports;

pub use context::QueryContext;
pub use ports::{DnsTransport, RdrcStore, ResponseChecker};
