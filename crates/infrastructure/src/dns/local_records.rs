use hickory_proto::rr::rdata::{MX, SOA, SRV, TXT};
use hickory_proto::rr::{Name, RData, Record};
use rustc_hash::FxHashMap;
use sentry_dns_domain::{DomainError, LocalRecord, RecordPayload, RecordType, MAX_CNAME_CHAIN_DEPTH};
use std::str::FromStr;

/// Outcome of resolving a query against the authoritative local store.
pub enum LocalLookup {
    /// No local record covers this owner/type; fall through to cache/forwarder.
    Miss,
    /// One or more records answer the query directly (after following any
    /// CNAME chain, which is included as leading records).
    Found(Vec<Record>),
    /// The CNAME chain exceeded `MAX_CNAME_CHAIN_DEPTH` or cycled.
    ChainTooDeep,
}

/// Authoritative local-record store (§4.1 stage 4, §8 invariant 6):
/// exact and single-label-wildcard owners, with CNAME chain resolution
/// bounded to `MAX_CNAME_CHAIN_DEPTH` and cycle-safe.
pub struct LocalRecordsStore {
    exact: FxHashMap<(String, RecordType), Vec<LocalRecord>>,
    wildcard: FxHashMap<(String, RecordType), Vec<LocalRecord>>,
}

impl LocalRecordsStore {
    /// Builds the store, rejecting any owner name that pairs a CNAME with
    /// another record type (§3: a CNAME may not coexist with anything else
    /// at the same owner name).
    pub fn new(records: Vec<LocalRecord>) -> Result<Self, DomainError> {
        let mut owners: FxHashMap<String, RecordType> = FxHashMap::default();
        for record in &records {
            match owners.entry(record.owner.clone()) {
                std::collections::hash_map::Entry::Vacant(e) => {
                    e.insert(record.record_type);
                }
                std::collections::hash_map::Entry::Occupied(e) => {
                    let existing = *e.get();
                    if existing != record.record_type
                        && (existing == RecordType::Cname || record.record_type == RecordType::Cname)
                    {
                        return Err(DomainError::ConfigError(format!(
                            "local record '{}' pairs CNAME with {:?}, which may not coexist at the same owner name",
                            record.owner, if existing == RecordType::Cname { record.record_type } else { existing }
                        )));
                    }
                }
            }
        }

        let mut exact: FxHashMap<(String, RecordType), Vec<LocalRecord>> = FxHashMap::default();
        let mut wildcard: FxHashMap<(String, RecordType), Vec<LocalRecord>> = FxHashMap::default();

        for record in records {
            if record.wildcard {
                if let Some(base) = record.wildcard_base() {
                    wildcard
                        .entry((base.to_string(), record.record_type))
                        .or_default()
                        .push(record);
                }
            } else {
                exact
                    .entry((record.owner.clone(), record.record_type))
                    .or_default()
                    .push(record);
            }
        }

        Ok(Self { exact, wildcard })
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.wildcard.is_empty()
    }

    /// `*.X` matches exactly one label under `X`: `printer.lan` matches
    /// `*.lan`, `a.b.lan` does not.
    fn lookup_owner(&self, owner: &str, record_type: RecordType) -> Option<&[LocalRecord]> {
        if let Some(records) = self.exact.get(&(owner.to_string(), record_type)) {
            return Some(records);
        }
        if let Some((_, base)) = owner.split_once('.') {
            if let Some(records) = self.wildcard.get(&(base.to_string(), record_type)) {
                return Some(records);
            }
        }
        None
    }

    fn lookup_cname(&self, owner: &str) -> Option<&LocalRecord> {
        self.lookup_owner(owner, RecordType::Cname)
            .and_then(|records| records.first())
    }

    pub fn resolve(&self, domain: &str, record_type: RecordType) -> LocalLookup {
        if self.is_empty() {
            return LocalLookup::Miss;
        }

        let mut chain = Vec::new();
        let mut current = domain.to_string();
        let mut visited = std::collections::HashSet::new();

        for _ in 0..=MAX_CNAME_CHAIN_DEPTH {
            if !visited.insert(current.clone()) {
                return LocalLookup::ChainTooDeep;
            }

            if let Some(records) = self.lookup_owner(&current, record_type) {
                for local in records {
                    if let Some(record) = to_hickory_record(local) {
                        chain.push(record);
                    }
                }
                return if chain.is_empty() {
                    LocalLookup::Miss
                } else {
                    LocalLookup::Found(chain)
                };
            }

            match self.lookup_cname(&current) {
                Some(cname) => {
                    if let RecordPayload::Cname(target) = &cname.payload {
                        if let Some(record) = to_hickory_record(cname) {
                            chain.push(record);
                        }
                        current = target.trim_end_matches('.').to_ascii_lowercase();
                    } else {
                        break;
                    }
                }
                None => break,
            }
        }

        if chain.is_empty() {
            LocalLookup::Miss
        } else {
            LocalLookup::ChainTooDeep
        }
    }
}

fn to_hickory_record(local: &LocalRecord) -> Option<Record> {
    let name = Name::from_str(&format!("{}.", local.owner)).ok()?;
    let rdata = match &local.payload {
        RecordPayload::Address(ip) => match ip {
            std::net::IpAddr::V4(v4) => RData::A(hickory_proto::rr::rdata::A(*v4)),
            std::net::IpAddr::V6(v6) => RData::AAAA(hickory_proto::rr::rdata::AAAA(*v6)),
        },
        RecordPayload::Cname(target) => {
            RData::CNAME(hickory_proto::rr::rdata::CNAME(Name::from_str(target).ok()?))
        }
        RecordPayload::Mx {
            preference,
            exchange,
        } => RData::MX(MX::new(*preference, Name::from_str(exchange).ok()?)),
        RecordPayload::Txt(text) => RData::TXT(TXT::new(vec![text.clone()])),
        RecordPayload::Ns(ns) => RData::NS(hickory_proto::rr::rdata::NS(Name::from_str(ns).ok()?)),
        RecordPayload::Soa {
            mname,
            rname,
            serial,
            refresh,
            retry,
            expire,
            minimum,
        } => RData::SOA(SOA::new(
            Name::from_str(mname).ok()?,
            Name::from_str(rname).ok()?,
            *serial,
            *refresh as i32,
            *retry as i32,
            *expire as i32,
            *minimum,
        )),
        RecordPayload::Ptr(target) => {
            RData::PTR(hickory_proto::rr::rdata::PTR(Name::from_str(target).ok()?))
        }
        RecordPayload::Srv {
            priority,
            weight,
            port,
            target,
        } => RData::SRV(SRV::new(*priority, *weight, *port, Name::from_str(target).ok()?)),
        // CAA records are stored and served over the API but not yet
        // synthesized into wire responses; policy consumers of the CAA
        // payload read it straight from the local store instead.
        RecordPayload::Caa { .. } => return None,
    };

    let mut record = Record::from_rdata(name, local.ttl, rdata);
    record.set_dns_class(hickory_proto::rr::DNSClass::IN);
    Some(record)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_a_record_resolves() {
        let store = LocalRecordsStore::new(vec![LocalRecord::new(
            "router.lan",
            60,
            RecordPayload::Address("192.168.1.1".parse().unwrap()),
        )])
        .unwrap();
        match store.resolve("router.lan", RecordType::A) {
            LocalLookup::Found(records) => assert_eq!(records.len(), 1),
            _ => panic!("expected a match"),
        }
    }

    #[test]
    fn wildcard_matches_single_label() {
        let store = LocalRecordsStore::new(vec![LocalRecord::new(
            "*.lan",
            60,
            RecordPayload::Address("192.168.1.1".parse().unwrap()),
        )])
        .unwrap();
        match store.resolve("printer.lan", RecordType::A) {
            LocalLookup::Found(records) => assert_eq!(records.len(), 1),
            _ => panic!("expected a wildcard match"),
        }
    }

    #[test]
    fn wildcard_does_not_match_two_labels_deep() {
        let store = LocalRecordsStore::new(vec![LocalRecord::new(
            "*.lan",
            60,
            RecordPayload::Address("192.168.1.1".parse().unwrap()),
        )])
        .unwrap();
        assert!(matches!(
            store.resolve("a.b.lan", RecordType::A),
            LocalLookup::Miss
        ));
    }

    #[test]
    fn cname_cycle_is_detected() {
        let store = LocalRecordsStore::new(vec![
            LocalRecord::new("a.lan", 60, RecordPayload::Cname("b.lan".into())),
            LocalRecord::new("b.lan", 60, RecordPayload::Cname("a.lan".into())),
        ])
        .unwrap();
        assert!(matches!(
            store.resolve("a.lan", RecordType::A),
            LocalLookup::ChainTooDeep
        ));
    }

    #[test]
    fn cname_may_not_coexist_with_another_type_at_same_owner() {
        let err = LocalRecordsStore::new(vec![
            LocalRecord::new("host.lan", 60, RecordPayload::Cname("other.lan".into())),
            LocalRecord::new(
                "host.lan",
                60,
                RecordPayload::Address("192.168.1.1".parse().unwrap()),
            ),
        ])
        .unwrap_err();
        assert!(matches!(err, sentry_dns_domain::DomainError::ConfigError(_)));
    }
}
