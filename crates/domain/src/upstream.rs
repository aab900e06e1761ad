use crate::errors::DomainError;
use std::net::SocketAddr;

pub const DEFAULT_DNS_PORT: u16 = 53;

/// A normalized `host:port` upstream resolver address (§3 Upstream).
/// Default port 53 is applied when omitted; otherwise opaque.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Upstream(pub SocketAddr);

impl Upstream {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let raw = raw.trim();
        if let Ok(addr) = raw.parse::<SocketAddr>() {
            return Ok(Self(addr));
        }
        // No explicit port: try `host` as a bare IP with the default port.
        let with_port = format!("{raw}:{DEFAULT_DNS_PORT}");
        with_port
            .parse::<SocketAddr>()
            .map(Self)
            .map_err(|_| DomainError::ConfigError(format!("invalid upstream address: {raw}")))
    }

    pub fn parse_list(raw: &[String]) -> Result<Vec<Self>, DomainError> {
        raw.iter().map(|s| Self::parse(s)).collect()
    }
}

impl std::fmt::Display for Upstream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn applies_default_port() {
        let u = Upstream::parse("1.1.1.1").unwrap();
        assert_eq!(u.0.port(), 53);
    }

    #[test]
    fn keeps_explicit_port() {
        let u = Upstream::parse("9.9.9.9:5353").unwrap();
        assert_eq!(u.0.port(), 5353);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Upstream::parse("not-an-address").is_err());
    }
}
