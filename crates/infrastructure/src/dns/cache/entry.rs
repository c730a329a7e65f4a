use hickory_proto::op::Message;
use hickory_proto::rr::{RData, Record};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, Instant};

/// One cached response plus its rotation state.
///
/// The stored message is canonical and never mutated after insertion; every
/// read derives a fresh copy. The rotation cursors are the only mutable
/// fields and advance atomically, so concurrent readers of the same entry
/// each apply exactly one increment.
#[derive(Debug)]
pub(super) struct CachedEntry {
    message: Message,
    expires_at: Instant,
    ipv4_cursor: AtomicU32,
    ipv6_cursor: AtomicU32,
    last_access: AtomicU64,
}

impl CachedEntry {
    pub(super) fn new(message: Message, stored_at: Instant, ttl: u32, access_stamp: u64) -> Self {
        Self {
            message,
            expires_at: stored_at + Duration::from_secs(u64::from(ttl)),
            ipv4_cursor: AtomicU32::new(0),
            ipv6_cursor: AtomicU32::new(0),
            last_access: AtomicU64::new(access_stamp),
        }
    }

    #[inline]
    pub(super) fn expires_at(&self) -> Instant {
        self.expires_at
    }

    #[inline]
    pub(super) fn touch(&self, access_stamp: u64) {
        self.last_access.store(access_stamp, AtomicOrdering::Relaxed);
    }

    #[inline]
    pub(super) fn last_access(&self) -> u64 {
        self.last_access.load(AtomicOrdering::Relaxed)
    }

    /// Copy of the stored message, with the A and AAAA answer runs rotated to
    /// this read's cursor offsets when `round_robin` is set. All other record
    /// types keep their position and order.
    pub(super) fn rotated_copy(&self, round_robin: bool) -> Message {
        let mut message = self.message.clone();
        if !round_robin {
            return message;
        }

        let answers = message.take_answers();
        let ipv4: Vec<Record> = answers
            .iter()
            .filter(|record| matches!(record.data(), RData::A(_)))
            .cloned()
            .collect();
        let ipv6: Vec<Record> = answers
            .iter()
            .filter(|record| matches!(record.data(), RData::AAAA(_)))
            .cloned()
            .collect();

        let mut ipv4 = rotate_family(ipv4, &self.ipv4_cursor).into_iter();
        let mut ipv6 = rotate_family(ipv6, &self.ipv6_cursor).into_iter();
        let answers = answers
            .into_iter()
            .map(|record| {
                if matches!(record.data(), RData::A(_)) {
                    ipv4.next().unwrap_or(record)
                } else if matches!(record.data(), RData::AAAA(_)) {
                    ipv6.next().unwrap_or(record)
                } else {
                    record
                }
            })
            .collect();
        message.insert_answers(answers);
        message
    }
}

/// The pre-increment cursor value selects the offset, so the first read of an
/// entry serves the stored order. Single-element (and empty) families skip
/// the cursor entirely.
fn rotate_family(mut records: Vec<Record>, cursor: &AtomicU32) -> Vec<Record> {
    if records.len() <= 1 {
        return records;
    }
    let offset = cursor.fetch_add(1, AtomicOrdering::Relaxed) as usize % records.len();
    records.rotate_left(offset);
    records
}
