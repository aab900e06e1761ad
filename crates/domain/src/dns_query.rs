use std::sync::Arc;

/// The supported DNS query types (§6.1). DNSSEC, legacy and otherwise
/// advanced record types are out of scope: this server passes DNSSEC
/// records through opaquely but never validates or synthesizes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    A,
    Aaaa,
    Cname,
    Mx,
    Txt,
    Ns,
    Soa,
    Ptr,
    Srv,
    Caa,
    /// Anything else is forwarded opaquely; the cache and policy engine
    /// still key on it but never construct it.
    Other(u16),
}

impl RecordType {
    /// Upper-case mnemonic, as required by the policy engine's `QueryType`
    /// context binding (§4.5).
    pub fn as_mnemonic(&self) -> &'static str {
        match self {
            RecordType::A => "A",
            RecordType::Aaaa => "AAAA",
            RecordType::Cname => "CNAME",
            RecordType::Mx => "MX",
            RecordType::Txt => "TXT",
            RecordType::Ns => "NS",
            RecordType::Soa => "SOA",
            RecordType::Ptr => "PTR",
            RecordType::Srv => "SRV",
            RecordType::Caa => "CAA",
            RecordType::Other(_) => "OTHER",
        }
    }

    pub fn from_mnemonic(s: &str) -> Option<Self> {
        Some(match s.to_ascii_uppercase().as_str() {
            "A" => RecordType::A,
            "AAAA" => RecordType::Aaaa,
            "CNAME" => RecordType::Cname,
            "MX" => RecordType::Mx,
            "TXT" => RecordType::Txt,
            "NS" => RecordType::Ns,
            "SOA" => RecordType::Soa,
            "PTR" => RecordType::Ptr,
            "SRV" => RecordType::Srv,
            "CAA" => RecordType::Caa,
            _ => return None,
        })
    }
}

/// A normalized DNS question: (name, type, class). Class is effectively
/// always IN and is not tracked separately.
///
/// `domain` is lowercased with the trailing dot stripped, so that two
/// queries differing only by case or trailing-dot presence produce an
/// identical fingerprint. The owning `Arc<str>` is cheap to clone across
/// the cache, policy context and query-event paths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsQuery {
    pub domain: Arc<str>,
    pub record_type: RecordType,
}

impl DnsQuery {
    pub fn new(domain: impl Into<Arc<str>>, record_type: RecordType) -> Self {
        Self {
            domain: normalize_domain(domain.into()),
            record_type,
        }
    }
}

/// Lowercases and strips a single trailing dot. Re-adding the trailing dot
/// on emission is the caller's responsibility (wire encoding expects FQDNs).
pub fn normalize_domain(domain: Arc<str>) -> Arc<str> {
    if domain.chars().all(|c| c.is_ascii_lowercase() || !c.is_ascii_alphabetic()) && !domain.ends_with('.')
    {
        return domain;
    }
    let trimmed = domain.strip_suffix('.').unwrap_or(&domain);
    Arc::from(trimmed.to_ascii_lowercase())
}
