use compact_str::CompactString;
use smallvec::SmallVec;

/// Call-scoped context threaded through every exchange in one logical query.
///
/// Tracks the tags of the transports currently active in the call chain so a
/// transport that needs DNS itself (DoH bootstrap, DHCP discovery) can never
/// end up resolving through itself. Each nested exchange derives a child
/// context with its own tag appended; sibling call chains stay independent.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    active_transports: SmallVec<[CompactString; 2]>,
}

impl QueryContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether `tag` already participates in this call chain.
    pub fn is_active(&self, tag: &str) -> bool {
        self.active_transports
            .iter()
            .any(|active| active.as_str() == tag)
    }

    /// Child context for a nested exchange through `tag`.
    pub fn with_transport(&self, tag: &str) -> Self {
        let mut child = self.clone();
        child.active_transports.push(CompactString::from(tag));
        child
    }
}
