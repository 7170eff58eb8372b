// keygate — Console Broker
//
// Presents the challenge on a terminal: prints the prompt, reads one line
// and asks the enclave whether it matches the enrolled passcode. An empty
// line dismisses the challenge.

use std::io::{BufRead, Stderr, StdinLock, Write};
use std::sync::Mutex;

use crate::access::AuthRequirement;
use crate::enclave::{EnclaveError, PresenceVerifier};

use super::{AuthBroker, AuthContext, AuthError};

const DEFAULT_PROMPT: &str = "Authenticate to continue";

pub struct ConsoleBroker<V, R, W> {
    verifier: V,
    io: Mutex<(R, W)>,
}

impl<V: PresenceVerifier> ConsoleBroker<V, StdinLock<'static>, Stderr> {
    /// Prompt on stderr, read from stdin.
    pub fn stdio(verifier: V) -> Self {
        Self::new(verifier, std::io::stdin().lock(), std::io::stderr())
    }
}

impl<V, R, W> ConsoleBroker<V, R, W>
where
    V: PresenceVerifier,
    R: BufRead,
    W: Write,
{
    pub fn new(verifier: V, input: R, output: W) -> Self {
        Self {
            verifier,
            io: Mutex::new((input, output)),
        }
    }

    /// Consume the broker, returning its output sink.
    pub fn into_output(self) -> W {
        let (_, output) = self.io.into_inner().unwrap_or_else(|e| e.into_inner());
        output
    }
}

impl<V, R, W> AuthBroker for ConsoleBroker<V, R, W>
where
    V: PresenceVerifier,
    R: BufRead,
    W: Write,
{
    fn evaluate(
        &self,
        requirement: AuthRequirement,
        context: &AuthContext,
    ) -> Result<(), AuthError> {
        if !requirement.accepts_passcode() {
            return Err(AuthError::NotAvailable(format!(
                "{} cannot be satisfied from a terminal",
                requirement
            )));
        }

        let mut guard = self.io.lock().unwrap_or_else(|e| e.into_inner());
        let (input, output) = &mut *guard;

        let prompt = context.prompt().unwrap_or(DEFAULT_PROMPT);
        write!(output, "{}\nPasscode (empty to cancel): ", prompt)
            .and_then(|_| output.flush())
            .map_err(|e| AuthError::NotAvailable(format!("terminal write failed: {}", e)))?;

        let mut line = String::new();
        let read = input
            .read_line(&mut line)
            .map_err(|e| AuthError::NotAvailable(format!("terminal read failed: {}", e)))?;

        let attempt = line.trim_end_matches(['\r', '\n']);
        if read == 0 || attempt.is_empty() {
            tracing::info!("Presence challenge dismissed");
            return Err(AuthError::UserCancel);
        }

        match self.verifier.verify_passcode(attempt) {
            Ok(true) => Ok(()),
            Ok(false) => {
                tracing::warn!("Presence challenge failed: passcode mismatch");
                Err(AuthError::Failed)
            }
            Err(EnclaveError::Passcode(msg)) => Err(AuthError::NotAvailable(msg)),
            Err(e) => Err(AuthError::NotAvailable(e.to_string())),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enclave::mock::MockKeyProvider;
    use std::io::Cursor;

    fn broker(input: &str) -> ConsoleBroker<MockKeyProvider, Cursor<Vec<u8>>, Vec<u8>> {
        let verifier = MockKeyProvider::new();
        verifier.enroll_passcode("2468").unwrap();
        ConsoleBroker::new(verifier, Cursor::new(input.as_bytes().to_vec()), Vec::new())
    }

    #[test]
    fn test_correct_passcode_passes() {
        let b = broker("2468\n");
        let ctx = AuthContext::new().with_prompt("Access your password on the keychain");
        assert!(b.evaluate(AuthRequirement::UserPresence, &ctx).is_ok());

        let shown = String::from_utf8(b.into_output()).unwrap();
        assert!(shown.contains("Access your password on the keychain"));
        assert!(!shown.contains("2468"), "Passcode must never be echoed");
    }

    #[test]
    fn test_wrong_passcode_fails() {
        let b = broker("0000\n");
        let err = b
            .evaluate(AuthRequirement::UserPresence, &AuthContext::new())
            .unwrap_err();
        assert_eq!(err, AuthError::Failed);
    }

    #[test]
    fn test_empty_line_cancels() {
        let b = broker("\n");
        let err = b
            .evaluate(AuthRequirement::DevicePasscode, &AuthContext::new())
            .unwrap_err();
        assert_eq!(err, AuthError::UserCancel);
    }

    #[test]
    fn test_eof_cancels() {
        let b = broker("");
        let err = b
            .evaluate(AuthRequirement::UserPresence, &AuthContext::new())
            .unwrap_err();
        assert_eq!(err, AuthError::UserCancel);
    }

    #[test]
    fn test_biometry_only_is_unavailable() {
        let b = broker("2468\n");
        let err = b
            .evaluate(AuthRequirement::BiometryAny, &AuthContext::new())
            .unwrap_err();
        assert!(matches!(err, AuthError::NotAvailable(_)));
    }

    #[test]
    fn test_no_enrolled_passcode_is_unavailable() {
        let b = ConsoleBroker::new(
            MockKeyProvider::new(),
            Cursor::new(b"1234\n".to_vec()),
            Vec::new(),
        );
        let err = b
            .evaluate(AuthRequirement::UserPresence, &AuthContext::new())
            .unwrap_err();
        assert!(matches!(err, AuthError::NotAvailable(_)));
    }
}
