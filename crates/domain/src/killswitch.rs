use std::time::{Duration, Instant};

/// Process-wide decisional-stage toggle state (§3 KillSwitch).
///
/// A temporary disable with a future expiry supersedes the configured
/// permanent state; once the expiry passes, the configured state is
/// restored. `Instant` is used rather than wall-clock time so that system
/// clock adjustments cannot move the expiry.
#[derive(Debug, Clone, Copy)]
pub struct KillSwitchState {
    configured_enabled: bool,
    override_disabled_until: Option<Instant>,
}

impl KillSwitchState {
    pub fn new(configured_enabled: bool) -> Self {
        Self {
            configured_enabled,
            override_disabled_until: None,
        }
    }

    /// Effective enabled state as of `now`. Never returns `true` strictly
    /// before the override's expiry (§8 invariant 10).
    pub fn is_enabled(&self, now: Instant) -> bool {
        match self.override_disabled_until {
            Some(expiry) if now < expiry => false,
            _ => self.configured_enabled,
        }
    }

    /// Disable temporarily for `duration`, starting at `now`.
    pub fn disable_for(&mut self, now: Instant, duration: Duration) {
        self.override_disabled_until = Some(now + duration);
    }

    /// Permanently set the configured state, clearing any temporary override.
    pub fn set_configured(&mut self, enabled: bool) {
        self.configured_enabled = enabled;
        self.override_disabled_until = None;
    }
}

/// Combined kill-switch for the two decisional stages the pipeline gates
/// on: blocklist and policy. Read once per query (§4.1 stage 2) to ensure
/// pipeline-wide consistency for that query.
#[derive(Debug, Clone, Copy)]
pub struct KillSwitch {
    pub blocklist: KillSwitchState,
    pub policy: KillSwitchState,
}

impl KillSwitch {
    pub fn new(blocklist_enabled: bool, policy_enabled: bool) -> Self {
        Self {
            blocklist: KillSwitchState::new(blocklist_enabled),
            policy: KillSwitchState::new(policy_enabled),
        }
    }

    pub fn snapshot(&self, now: Instant) -> KillSwitchSnapshot {
        KillSwitchSnapshot {
            blocklist_enabled: self.blocklist.is_enabled(now),
            policy_enabled: self.policy.is_enabled(now),
        }
    }
}

/// The per-query immutable read taken at stage 2 of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KillSwitchSnapshot {
    pub blocklist_enabled: bool,
    pub policy_enabled: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_disable_restores_after_expiry() {
        let mut state = KillSwitchState::new(true);
        let t0 = Instant::now();
        state.disable_for(t0, Duration::from_secs(10));

        assert!(!state.is_enabled(t0));
        assert!(!state.is_enabled(t0 + Duration::from_secs(9)));
        assert!(state.is_enabled(t0 + Duration::from_secs(10)));
        assert!(state.is_enabled(t0 + Duration::from_secs(11)));
    }

    #[test]
    fn set_configured_clears_override() {
        let mut state = KillSwitchState::new(true);
        let t0 = Instant::now();
        state.disable_for(t0, Duration::from_secs(100));
        state.set_configured(false);
        assert!(!state.is_enabled(t0));
    }
}
