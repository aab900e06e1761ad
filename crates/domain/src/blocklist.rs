use std::collections::HashSet;

/// One parsed line from a blocklist/allowlist source (§4.2 Parsers).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedEntry {
    /// Plain domain, either from hosts format, plain format, or the literal
    /// domain half of an adblock `||domain^` rule.
    Exact(String),
    /// Wildcard suffix: matches `domain` itself is NOT implied, only
    /// subdomains. Stored without the leading `*.`/`.`.
    WildcardSuffix(String),
    /// Compiled-regex pattern source, not yet compiled.
    Pattern(String),
}

/// Parse a single hosts-format line: `^(0\.0\.0\.0|127\.0\.0\.1|::|::1)\s+<domain>\s*(#.*)?$`.
pub fn parse_hosts_line(line: &str) -> Option<ParsedEntry> {
    let line = strip_comment(line).trim();
    if line.is_empty() {
        return None;
    }
    let mut parts = line.split_whitespace();
    let addr = parts.next()?;
    let domain = parts.next()?;
    if !matches!(addr, "0.0.0.0" | "127.0.0.1" | "::" | "::1") {
        return None;
    }
    if is_self_referential(domain) || !is_valid_domain(domain) {
        return None;
    }
    Some(ParsedEntry::Exact(domain.to_ascii_lowercase()))
}

/// Parse a single adblock-format line: `||<domain>^`. Installs both the
/// exact domain and a wildcard-suffix covering all subdomains (§8 law).
pub fn parse_adblock_line(line: &str) -> Option<Vec<ParsedEntry>> {
    let line = line.trim();
    let inner = line.strip_prefix("||")?.strip_suffix('^')?;
    if inner.is_empty() || !is_valid_domain(inner) {
        return None;
    }
    let domain = inner.to_ascii_lowercase();
    Some(vec![
        ParsedEntry::Exact(domain.clone()),
        ParsedEntry::WildcardSuffix(domain),
    ])
}

/// Parse a single plain-format line: one domain per line, `#` comments
/// stripped, blank lines ignored.
pub fn parse_plain_line(line: &str) -> Option<ParsedEntry> {
    let line = strip_comment(line).trim();
    if line.is_empty() || !is_valid_domain(line) {
        return None;
    }
    Some(ParsedEntry::Exact(line.to_ascii_lowercase()))
}

/// Parse an entire list's text trying, per line: adblock, then hosts, then
/// plain. Returns the parsed entries and the count of lines skipped as
/// invalid (for the warn-log + counter required by §4.2).
pub fn parse_list_text(text: &str) -> (Vec<ParsedEntry>, usize) {
    let mut entries = Vec::new();
    let mut skipped = 0usize;

    for raw in text.lines() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        if line.starts_with("||") {
            match parse_adblock_line(line) {
                Some(parsed) => entries.extend(parsed),
                None => skipped += 1,
            }
            continue;
        }
        if line.split_whitespace().count() >= 2 {
            match parse_hosts_line(line) {
                Some(parsed) => entries.push(parsed),
                None => skipped += 1,
            }
            continue;
        }
        match parse_plain_line(line) {
            Some(parsed) => entries.push(parsed),
            None => skipped += 1,
        }
    }

    (entries, skipped)
}

fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => &line[..idx],
        None => line,
    }
}

fn is_self_referential(domain: &str) -> bool {
    matches!(
        domain,
        "localhost" | "0.0.0.0" | "broadcasthost" | "ip6-localhost" | "ip6-loopback"
    )
}

/// Minimal FQDN validity check: non-empty, contains a dot, only valid
/// label characters, no empty labels.
pub fn is_valid_domain(domain: &str) -> bool {
    if domain.is_empty() || domain.len() > 253 || !domain.contains('.') {
        return false;
    }
    domain.split('.').all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && label
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-')
    })
}

/// Immutable, atomically-installable set of blocked domains (§3
/// BlocklistSnapshot). Duplicate domains across sources are deduplicated
/// before installation.
#[derive(Debug, Clone, Default)]
pub struct BlocklistSnapshot {
    pub exact: HashSet<String>,
    pub wildcard_suffix: HashSet<String>,
    pub wildcard_prefix: HashSet<String>,
    pub patterns: Vec<String>,
    pub allow_exact: HashSet<String>,
    pub allow_wildcard_suffix: HashSet<String>,
}

impl BlocklistSnapshot {
    pub fn from_entries(entries: impl IntoIterator<Item = ParsedEntry>) -> Self {
        let mut snapshot = Self::default();
        for entry in entries {
            match entry {
                ParsedEntry::Exact(domain) => {
                    snapshot.exact.insert(domain);
                }
                ParsedEntry::WildcardSuffix(domain) => {
                    snapshot.wildcard_suffix.insert(domain);
                }
                ParsedEntry::Pattern(pattern) => {
                    snapshot.patterns.push(pattern);
                }
            }
        }
        snapshot
    }

    pub fn total_len(&self) -> usize {
        self.exact.len() + self.wildcard_suffix.len() + self.wildcard_prefix.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total_len() == 0 && self.patterns.is_empty()
    }
}
