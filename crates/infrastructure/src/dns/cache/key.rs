use compact_str::CompactString;
use hickory_proto::op::Query;

/// Cache key for independent-cache mode: the question plus the tag of the
/// transport that answered it. Shared-cache mode keys by the bare [`Query`];
/// a client uses exactly one of the two keyings.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct TransportCacheKey {
    pub question: Query,
    pub transport_tag: CompactString,
}

impl TransportCacheKey {
    #[inline]
    pub fn new(question: Query, transport_tag: &str) -> Self {
        Self {
            question,
            transport_tag: CompactString::from(transport_tag),
        }
    }
}
