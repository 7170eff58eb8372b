// keygate — Authentication session configuration
//
// One context per operation unless the caller shares it explicitly. A shared
// context remembers its successful unlocks, each with the requirement it
// satisfied. A later request inside the reuse window passes without a new
// prompt only when an earlier unlock covers its own requirement.

use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::access::AuthRequirement;

/// Upper bound for the reuse window.
pub const MAX_REUSE_WINDOW: Duration = Duration::from_secs(300);

pub struct AuthContext {
    reuse_window: Duration,
    prompt: Option<String>,
    interaction_allowed: bool,
    unlocks: Mutex<Vec<(AuthRequirement, Instant)>>,
}

impl AuthContext {
    /// No reuse window, no prompt text, interaction allowed.
    pub fn new() -> Self {
        Self {
            reuse_window: Duration::ZERO,
            prompt: None,
            interaction_allowed: true,
            unlocks: Mutex::new(Vec::new()),
        }
    }

    /// Set the reuse window. Values above [`MAX_REUSE_WINDOW`] are clamped.
    pub fn with_reuse_window(mut self, window: Duration) -> Self {
        if window > MAX_REUSE_WINDOW {
            tracing::warn!(
                requested_secs = window.as_secs(),
                max_secs = MAX_REUSE_WINDOW.as_secs(),
                "Reuse window clamped"
            );
        }
        self.reuse_window = window.min(MAX_REUSE_WINDOW);
        self
    }

    /// Text shown to the user when the broker challenges them.
    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Fail instead of prompting when a challenge would be needed.
    pub fn non_interactive(mut self) -> Self {
        self.interaction_allowed = false;
        self
    }

    pub fn reuse_window(&self) -> Duration {
        self.reuse_window
    }

    pub fn prompt(&self) -> Option<&str> {
        self.prompt.as_deref()
    }

    pub fn allows_interaction(&self) -> bool {
        self.interaction_allowed
    }

    /// True when an unlock through this context that covers `requirement` is
    /// still fresh at `now`.
    pub fn is_reusable_at(&self, now: Instant, requirement: AuthRequirement) -> bool {
        if self.reuse_window.is_zero() {
            return false;
        }
        let guard = self.unlocks.lock().unwrap_or_else(|e| e.into_inner());
        guard.iter().any(|(satisfied, at)| {
            satisfied.covers(requirement) && now.saturating_duration_since(*at) <= self.reuse_window
        })
    }

    /// Remember that `requirement` was satisfied at `at`.
    pub fn record_unlock(&self, requirement: AuthRequirement, at: Instant) {
        let mut guard = self.unlocks.lock().unwrap_or_else(|e| e.into_inner());
        guard.retain(|(satisfied, _)| *satisfied != requirement);
        guard.push((requirement, at));
    }
}

impl Default for AuthContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AuthContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthContext")
            .field("reuse_window", &self.reuse_window)
            .field("prompt", &self.prompt)
            .field("interaction_allowed", &self.interaction_allowed)
            .finish_non_exhaustive()
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const PRESENCE: AuthRequirement = AuthRequirement::UserPresence;

    #[test]
    fn test_reuse_window_is_clamped() {
        let ctx = AuthContext::new().with_reuse_window(Duration::from_secs(3600));
        assert_eq!(ctx.reuse_window(), MAX_REUSE_WINDOW);
    }

    #[test]
    fn test_fresh_context_is_not_reusable() {
        let ctx = AuthContext::new().with_reuse_window(Duration::from_secs(10));
        assert!(!ctx.is_reusable_at(Instant::now(), PRESENCE));
    }

    #[test]
    fn test_unlock_is_reusable_inside_window_only() {
        let ctx = AuthContext::new().with_reuse_window(Duration::from_secs(10));
        let t0 = Instant::now();
        ctx.record_unlock(PRESENCE, t0);

        assert!(ctx.is_reusable_at(t0 + Duration::from_secs(5), PRESENCE));
        assert!(ctx.is_reusable_at(t0 + Duration::from_secs(10), PRESENCE));
        assert!(!ctx.is_reusable_at(t0 + Duration::from_secs(11), PRESENCE));
    }

    #[test]
    fn test_zero_window_never_reuses() {
        let ctx = AuthContext::new();
        let t0 = Instant::now();
        ctx.record_unlock(PRESENCE, t0);
        assert!(!ctx.is_reusable_at(t0, PRESENCE));
    }

    #[test]
    fn test_unlock_only_covers_what_it_satisfied() {
        let ctx = AuthContext::new().with_reuse_window(Duration::from_secs(10));
        let t0 = Instant::now();
        ctx.record_unlock(PRESENCE, t0);

        assert!(!ctx.is_reusable_at(t0, AuthRequirement::BiometryAny));
        assert!(!ctx.is_reusable_at(t0, AuthRequirement::DevicePasscode));

        ctx.record_unlock(AuthRequirement::BiometryAny, t0);
        assert!(ctx.is_reusable_at(t0, AuthRequirement::BiometryAny));
        assert!(ctx.is_reusable_at(t0, PRESENCE));
    }

    #[test]
    fn test_builder_fields() {
        let ctx = AuthContext::new().with_prompt("Unlock").non_interactive();
        assert_eq!(ctx.prompt(), Some("Unlock"));
        assert!(!ctx.allows_interaction());
    }
}
