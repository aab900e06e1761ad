use hickory_proto::op::{Message, ResponseCode};
use std::sync::atomic::{AtomicU64, Ordering};

/// A cached DNS response (§3 CachedResponse). Stores the full parsed
/// message (not raw bytes) so that emission can rewrite the transaction
/// ID and clamp per-record TTLs without a decode round-trip.
pub struct CachedResponse {
    message: Message,
    pub inserted_at_secs: u64,
    pub expires_at_secs: u64,
    pub is_negative: bool,
    pub last_access_secs: AtomicU64,
    pub hits: AtomicU64,
}

impl Clone for CachedResponse {
    fn clone(&self) -> Self {
        Self {
            message: self.message.clone(),
            inserted_at_secs: self.inserted_at_secs,
            expires_at_secs: self.expires_at_secs,
            is_negative: self.is_negative,
            last_access_secs: AtomicU64::new(self.last_access_secs.load(Ordering::Relaxed)),
            hits: AtomicU64::new(self.hits.load(Ordering::Relaxed)),
        }
    }
}

impl CachedResponse {
    pub fn new(message: Message, now_secs: u64, ttl_secs: u32) -> Self {
        let is_negative = message.response_code() == ResponseCode::NXDomain;
        Self {
            message,
            inserted_at_secs: now_secs,
            expires_at_secs: now_secs + ttl_secs as u64,
            is_negative,
            last_access_secs: AtomicU64::new(now_secs),
            hits: AtomicU64::new(0),
        }
    }

    pub fn is_expired(&self, now_secs: u64) -> bool {
        now_secs >= self.expires_at_secs
    }

    pub fn size_hint_bytes(&self) -> usize {
        self.message.answers().len() * 32 + 64
    }

    /// Emits a fresh copy with the requesting query's transaction ID and
    /// every answer TTL clamped to `min(original, remaining-to-expiry)`,
    /// per §4.3's correctness requirements. Never negative: a response
    /// already past expiry should have been treated as a miss by the
    /// caller, but we floor at zero defensively.
    pub fn emit(&self, query_id: u16, now_secs: u64) -> Message {
        self.last_access_secs.store(now_secs, Ordering::Relaxed);
        self.hits.fetch_add(1, Ordering::Relaxed);

        let remaining = self.expires_at_secs.saturating_sub(now_secs).min(u32::MAX as u64) as u32;
        let mut msg = self.message.clone();
        msg.set_id(query_id);
        for record in msg.answers_mut() {
            let clamped = record.ttl().min(remaining);
            record.set_ttl(clamped);
        }
        msg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::op::Query;
    use hickory_proto::rr::{Name, RData, Record, RecordType};
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    fn sample_message(ttl: u32) -> Message {
        let mut msg = Message::new();
        msg.add_query(Query::query(Name::from_str("example.com.").unwrap(), RecordType::A));
        let mut record = Record::from_rdata(
            Name::from_str("example.com.").unwrap(),
            ttl,
            RData::A(Ipv4Addr::new(93, 184, 216, 34).into()),
        );
        record.set_ttl(ttl);
        msg.add_answer(record);
        msg
    }

    #[test]
    fn emit_rewrites_transaction_id() {
        let cached = CachedResponse::new(sample_message(300), 1_000, 300);
        let emitted = cached.emit(0xBEEF, 1_000);
        assert_eq!(emitted.id(), 0xBEEF);
    }

    #[test]
    fn emit_clamps_ttl_to_remaining() {
        let cached = CachedResponse::new(sample_message(300), 1_000, 300);
        let emitted = cached.emit(1, 1_030);
        let ttl = emitted.answers()[0].ttl();
        assert!((269..=270).contains(&ttl));
    }

    #[test]
    fn negative_response_is_flagged() {
        let mut msg = sample_message(300);
        msg.set_response_code(ResponseCode::NXDomain);
        let cached = CachedResponse::new(msg, 0, 300);
        assert!(cached.is_negative);
    }
}
