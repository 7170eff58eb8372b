// keygate — Broker Module
//
// The authentication broker presents a presence challenge and reports
// pass/fail. `authorize()` wraps a broker with requirement evaluation and the
// recent-unlock grace window carried by the session context.

mod console;
mod context;
mod error;

use std::time::Instant;

use crate::access::AuthRequirement;

pub use console::ConsoleBroker;
pub use context::{AuthContext, MAX_REUSE_WINDOW};
pub use error::AuthError;

/// Runs the user-facing challenge for a requirement.
pub trait AuthBroker {
    /// Block until the user passes, fails, or dismisses the challenge.
    fn evaluate(&self, requirement: AuthRequirement, context: &AuthContext)
        -> Result<(), AuthError>;
}

impl<B: AuthBroker + ?Sized> AuthBroker for &B {
    fn evaluate(
        &self,
        requirement: AuthRequirement,
        context: &AuthContext,
    ) -> Result<(), AuthError> {
        (**self).evaluate(requirement, context)
    }
}

/// How a request got past the authentication step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Authorization {
    NotRequired,
    /// A previous unlock on the same context was still inside its window.
    Reused,
    Challenged,
}

/// Decide whether `requirement` is satisfied, prompting through `broker` if needed.
pub fn authorize<B: AuthBroker + ?Sized>(
    broker: &B,
    requirement: AuthRequirement,
    context: &AuthContext,
    now: Instant,
) -> Result<Authorization, AuthError> {
    if !requirement.requires_authentication() {
        return Ok(Authorization::NotRequired);
    }

    if context.is_reusable_at(now, requirement) {
        tracing::debug!(%requirement, "Reusing recent unlock");
        return Ok(Authorization::Reused);
    }

    if !context.allows_interaction() {
        return Err(AuthError::NotInteractive);
    }

    broker.evaluate(requirement, context)?;
    context.record_unlock(requirement, Instant::now());
    tracing::debug!(%requirement, "Presence challenge passed");
    Ok(Authorization::Challenged)
}

// ─── Scripted Broker for Testing ─────────────────────────────────────────────

/// A deterministic broker replaying queued outcomes. Once the queue is empty
/// every challenge succeeds.
#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub struct ScriptedBroker {
        outcomes: Mutex<VecDeque<Result<(), AuthError>>>,
        prompts: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedBroker {
        pub fn approving() -> Self {
            Self::with_outcomes(Vec::new())
        }

        pub fn with_outcomes(outcomes: Vec<Result<(), AuthError>>) -> Self {
            Self {
                outcomes: Mutex::new(outcomes.into()),
                prompts: Mutex::new(Vec::new()),
            }
        }

        /// Number of challenges presented so far.
        pub fn prompt_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        /// Prompt texts seen, in order.
        pub fn prompts(&self) -> Vec<Option<String>> {
            self.prompts.lock().unwrap().clone()
        }
    }

    impl AuthBroker for ScriptedBroker {
        fn evaluate(
            &self,
            _requirement: AuthRequirement,
            context: &AuthContext,
        ) -> Result<(), AuthError> {
            self.prompts
                .lock()
                .unwrap()
                .push(context.prompt().map(str::to_string));
            self.outcomes.lock().unwrap().pop_front().unwrap_or(Ok(()))
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
