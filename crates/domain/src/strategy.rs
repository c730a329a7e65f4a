use serde::{Deserialize, Serialize};

/// Address-family preference applied to lookups and exchanges.
///
/// `Auto` and the two `Prefer*` variants query both families; the `*Only`
/// variants restrict the query (and filter HTTPS service-binding hints) to a
/// single family.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressStrategy {
    #[default]
    Auto,
    PreferIpv4,
    PreferIpv6,
    Ipv4Only,
    Ipv6Only,
}

impl AddressStrategy {
    pub fn is_single_family(&self) -> bool {
        matches!(self, Self::Ipv4Only | Self::Ipv6Only)
    }

    pub fn prefers_ipv6(&self) -> bool {
        matches!(self, Self::PreferIpv6)
    }
}
