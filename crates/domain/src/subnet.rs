use crate::errors::DomainError;
use ipnetwork::IpNetwork;
use std::net::IpAddr;

/// A small ordered list of CIDR networks supporting longest-prefix-match
/// membership tests. Used by the conditional-forwarding evaluator's
/// client-CIDR matcher and the policy engine's `IPInCIDR` helper.
#[derive(Debug, Clone, Default)]
pub struct SubnetMatcher {
    networks: Vec<IpNetwork>,
}

impl SubnetMatcher {
    pub fn parse(cidrs: &[String]) -> Result<Self, DomainError> {
        let networks = cidrs
            .iter()
            .map(|s| {
                s.parse::<IpNetwork>()
                    .map_err(|_| DomainError::InvalidCidr(s.clone()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { networks })
    }

    pub fn is_empty(&self) -> bool {
        self.networks.is_empty()
    }

    pub fn contains(&self, ip: IpAddr) -> bool {
        self.networks.iter().any(|net| net.contains(ip))
    }
}

/// Single-CIDR membership test, used directly by the policy engine's
/// `IPInCIDR(ip, cidr)` helper where the CIDR is a per-call string literal
/// rather than a pre-parsed matcher.
pub fn ip_in_cidr(ip: &str, cidr: &str) -> bool {
    let Ok(ip) = ip.parse::<IpAddr>() else {
        return false;
    };
    let Ok(network) = cidr.parse::<IpNetwork>() else {
        return false;
    };
    network.contains(ip)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matches_ipv4_cidr() {
        let m = SubnetMatcher::parse(&["10.0.0.0/8".to_string()]).unwrap();
        assert!(m.contains("10.1.2.3".parse().unwrap()));
        assert!(!m.contains("11.1.2.3".parse().unwrap()));
    }

    #[test]
    fn helper_function_matches() {
        assert!(ip_in_cidr("192.168.1.5", "192.168.1.0/24"));
        assert!(!ip_in_cidr("192.168.2.5", "192.168.1.0/24"));
        assert!(!ip_in_cidr("garbage", "192.168.1.0/24"));
    }
}
