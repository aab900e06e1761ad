use serde::{Deserialize, Serialize};

fn default_enabled() -> bool {
    true
}

fn default_reject_empty_update() -> bool {
    true
}

/// §6.2 blocking sub-config. Blocklist *sources* (URLs) are fetched by the
/// out-of-core collaborator and handed to the core as raw text; this
/// config only carries what the core itself needs: whether blocking is on
/// by default, manually-entered domains, and whitelist overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BlockingConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub custom_blocked: Vec<String>,
    #[serde(default)]
    pub whitelist: Vec<String>,
    /// §4.2 failure semantics: reject an update collapsing a non-empty
    /// snapshot to zero entries, unless disabled.
    #[serde(default = "default_reject_empty_update")]
    pub reject_empty_update: bool,
    /// Local file paths the download collaborator writes raw list bytes
    /// to; `reload` re-reads and re-parses each of these.
    #[serde(default)]
    pub sources: Vec<String>,
}
