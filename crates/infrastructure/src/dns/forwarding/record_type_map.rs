use hickory_proto::rr::RecordType as HickoryRecordType;
use sentry_dns_domain::RecordType;

/// Maps between the domain's deliberately small `RecordType` set and
/// `hickory-proto`'s full wire enum.
pub struct RecordTypeMapper;

impl RecordTypeMapper {
    pub fn to_hickory(record_type: &RecordType) -> HickoryRecordType {
        match record_type {
            RecordType::A => HickoryRecordType::A,
            RecordType::Aaaa => HickoryRecordType::AAAA,
            RecordType::Cname => HickoryRecordType::CNAME,
            RecordType::Mx => HickoryRecordType::MX,
            RecordType::Txt => HickoryRecordType::TXT,
            RecordType::Ns => HickoryRecordType::NS,
            RecordType::Soa => HickoryRecordType::SOA,
            RecordType::Ptr => HickoryRecordType::PTR,
            RecordType::Srv => HickoryRecordType::SRV,
            RecordType::Caa => HickoryRecordType::CAA,
            RecordType::Other(code) => HickoryRecordType::Unknown(*code),
        }
    }

    pub fn from_hickory(record_type: HickoryRecordType) -> RecordType {
        match record_type {
            HickoryRecordType::A => RecordType::A,
            HickoryRecordType::AAAA => RecordType::Aaaa,
            HickoryRecordType::CNAME => RecordType::Cname,
            HickoryRecordType::MX => RecordType::Mx,
            HickoryRecordType::TXT => RecordType::Txt,
            HickoryRecordType::NS => RecordType::Ns,
            HickoryRecordType::SOA => RecordType::Soa,
            HickoryRecordType::PTR => RecordType::Ptr,
            HickoryRecordType::SRV => RecordType::Srv,
            HickoryRecordType::CAA => RecordType::Caa,
            other => RecordType::Other(u16::from(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_known_types() {
        for rt in [
            RecordType::A,
            RecordType::Aaaa,
            RecordType::Cname,
            RecordType::Mx,
            RecordType::Txt,
            RecordType::Ns,
            RecordType::Soa,
            RecordType::Ptr,
            RecordType::Srv,
            RecordType::Caa,
        ] {
            let hickory = RecordTypeMapper::to_hickory(&rt);
            assert_eq!(RecordTypeMapper::from_hickory(hickory), rt);
        }
    }

    #[test]
    fn unknown_code_round_trips() {
        let mapped = RecordTypeMapper::from_hickory(HickoryRecordType::Unknown(65280));
        assert_eq!(mapped, RecordType::Other(65280));
    }
}
