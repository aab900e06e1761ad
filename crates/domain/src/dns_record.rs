use crate::dns_query::RecordType;
use std::net::IpAddr;

/// Type-specific payload of a locally authoritative record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordPayload {
    Address(IpAddr),
    Cname(String),
    Mx { preference: u16, exchange: String },
    Txt(String),
    Ns(String),
    Soa {
        mname: String,
        rname: String,
        serial: u32,
        refresh: u32,
        retry: u32,
        expire: u32,
        minimum: u32,
    },
    Ptr(String),
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    Caa {
        flags: u8,
        tag: String,
        value: String,
    },
}

/// An authoritative local record: (owner-name, type, TTL, payload, wildcard
/// flag). `owner` is stored normalized (lowercase, no trailing dot).
///
/// Invariants enforced by the store that holds these, not by this type
/// alone: a CNAME may not coexist with any other record type at the same
/// owner name, and `*.x` wildcards match exactly one label under `x`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalRecord {
    pub owner: String,
    pub record_type: RecordType,
    pub ttl: u32,
    pub payload: RecordPayload,
    pub wildcard: bool,
}

impl LocalRecord {
    pub fn new(owner: impl Into<String>, ttl: u32, payload: RecordPayload) -> Self {
        let owner_raw = owner.into();
        let wildcard = owner_raw.starts_with("*.");
        let owner = normalize_owner(&owner_raw);
        let record_type = match &payload {
            RecordPayload::Address(IpAddr::V4(_)) => RecordType::A,
            RecordPayload::Address(IpAddr::V6(_)) => RecordType::Aaaa,
            RecordPayload::Cname(_) => RecordType::Cname,
            RecordPayload::Mx { .. } => RecordType::Mx,
            RecordPayload::Txt(_) => RecordType::Txt,
            RecordPayload::Ns(_) => RecordType::Ns,
            RecordPayload::Soa { .. } => RecordType::Soa,
            RecordPayload::Ptr(_) => RecordType::Ptr,
            RecordPayload::Srv { .. } => RecordType::Srv,
            RecordPayload::Caa { .. } => RecordType::Caa,
        };
        Self {
            owner,
            record_type,
            ttl,
            payload,
            wildcard,
        }
    }

    /// The base name a wildcard record matches under, e.g. `*.lan` → `lan`.
    pub fn wildcard_base(&self) -> Option<&str> {
        if self.wildcard {
            self.owner.strip_prefix("*.")
        } else {
            None
        }
    }
}

fn normalize_owner(owner: &str) -> String {
    owner.strip_suffix('.').unwrap_or(owner).to_ascii_lowercase()
}

/// Maximum CNAME chain-following depth (§3, §8 invariant 6). Exceeding this
/// or detecting a cycle yields SERVFAIL, never an infinite loop.
pub const MAX_CNAME_CHAIN_DEPTH: usize = 10;
