// keygate — Presence Verification
//
// The device passcode is enrolled once and kept as an Argon2id PHC string in
// the platform keyring. Verification happens here; the stored hash is never
// handed to callers, only the yes/no outcome.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::RngCore;
use zeroize::Zeroizing;

use super::{EnclaveError, KeyringProvider};

const PASSCODE_SALT_LEN: usize = 16;

/// Compares a presence response against enrolled reference material.
pub trait PresenceVerifier {
    fn has_passcode(&self) -> Result<bool, EnclaveError>;

    /// Enrol (or replace) the device passcode.
    fn enroll_passcode(&self, passcode: &str) -> Result<(), EnclaveError>;

    /// Remove the device passcode. Passcode-gated records become unreachable.
    fn clear_passcode(&self) -> Result<(), EnclaveError>;

    /// Check an attempt. Errors only when nothing is enrolled or the keyring fails.
    fn verify_passcode(&self, attempt: &str) -> Result<bool, EnclaveError>;
}

pub(crate) fn hash_passcode(passcode: &str) -> Result<String, EnclaveError> {
    if passcode.is_empty() {
        return Err(EnclaveError::Passcode("passcode must not be empty".to_string()));
    }

    let mut salt_bytes = [0u8; PASSCODE_SALT_LEN];
    rand::rng().fill_bytes(&mut salt_bytes);
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| EnclaveError::Passcode(format!("invalid salt: {}", e)))?;

    let hash = Argon2::default()
        .hash_password(passcode.as_bytes(), &salt)
        .map_err(|e| EnclaveError::Derivation(format!("passcode hash failed: {}", e)))?;

    Ok(hash.to_string())
}

pub(crate) fn verify_against(phc: &str, attempt: &str) -> Result<bool, EnclaveError> {
    let parsed = PasswordHash::new(phc)
        .map_err(|e| EnclaveError::Passcode(format!("stored passcode hash is corrupt: {}", e)))?;
    Ok(Argon2::default()
        .verify_password(attempt.as_bytes(), &parsed)
        .is_ok())
}

impl PresenceVerifier for KeyringProvider {
    fn has_passcode(&self) -> Result<bool, EnclaveError> {
        match self.passcode_entry()?.get_password() {
            Ok(_) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(EnclaveError::Keyring(format!(
                "failed to check passcode: {}",
                e
            ))),
        }
    }

    fn enroll_passcode(&self, passcode: &str) -> Result<(), EnclaveError> {
        let phc = hash_passcode(passcode)?;
        self.passcode_entry()?
            .set_password(&phc)
            .map_err(|e| EnclaveError::Keyring(format!("failed to store passcode: {}", e)))?;
        tracing::info!("Device passcode enrolled");
        Ok(())
    }

    fn clear_passcode(&self) -> Result<(), EnclaveError> {
        match self.passcode_entry()?.delete_credential() {
            Ok(()) => {
                tracing::warn!("Device passcode removed — passcode-gated items are now unreachable");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(EnclaveError::Keyring(format!(
                "failed to remove passcode: {}",
                e
            ))),
        }
    }

    fn verify_passcode(&self, attempt: &str) -> Result<bool, EnclaveError> {
        let phc = match self.passcode_entry()?.get_password() {
            Ok(phc) => Zeroizing::new(phc),
            Err(keyring::Error::NoEntry) => {
                return Err(EnclaveError::Passcode("no passcode enrolled".to_string()))
            }
            Err(e) => {
                return Err(EnclaveError::Keyring(format!(
                    "failed to read passcode: {}",
                    e
                )))
            }
        };
        verify_against(&phc, attempt)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
