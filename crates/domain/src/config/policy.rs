use serde::{Deserialize, Serialize};

fn default_priority() -> i32 {
    0
}

fn default_enabled() -> bool {
    true
}

/// Raw, not-yet-compiled policy rule as read from configuration (§3
/// PolicyRule). Converted to `domain::policy::PolicyRule` (compiled
/// expression, parsed action) at install time; compilation failure of any
/// rule refuses the whole set (§4.5).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRuleConfig {
    pub name: String,
    #[serde(default = "default_priority")]
    pub priority: i32,
    pub expression: String,
    pub action: String,
    #[serde(default)]
    pub action_data: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PolicyConfig {
    #[serde(default)]
    pub rules: Vec<PolicyRuleConfig>,
}
