// keygate — Master Key Provider
//
// Manages the lifecycle of the master secret behind every sealed credential.
// The master secret lives in the platform's native keyring and never shows
// up in logs, debug output, or process memory longer than necessary.
//
// Flow:
//   1. `get_or_create_master_secret()` — retrieves from keyring, or generates + stores a new one
//   2. `derive_sealing_key()` — Argon2id turns the master secret into the 32-byte AEAD key
//   3. The derived key is handed to `SealingKeystore` and zeroized on drop

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::EnclaveError;

// ─── Constants ───────────────────────────────────────────────────────────────

/// Default service name identifying keygate entries in the platform keyring.
pub const DEFAULT_KEYRING_SERVICE: &str = "keygate-credential-gate";

/// Username for the keyring entry holding the master secret.
const MASTER_SECRET_USER: &str = "master-secret";

/// Username for the keyring entry holding the enrolled passcode hash.
const PASSCODE_USER: &str = "device-passcode";

/// Length of the randomly generated master secret in bytes (256-bit entropy).
pub(crate) const MASTER_SECRET_LEN: usize = 32;

/// Length of the derived sealing key in bytes.
pub(crate) const DERIVED_KEY_LEN: usize = 32;

// Argon2id parameters: m=65536 (64 MiB), t=3, p=4
const ARGON2_M_COST: u32 = 65536;
const ARGON2_T_COST: u32 = 3;
const ARGON2_P_COST: u32 = 4;

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over master key management, enabling platform-specific backends
/// and mock implementations for testing.
pub trait MasterKeyProvider {
    /// Retrieve the master secret from the platform keyring.
    /// On first run, generates a new random master secret and stores it.
    fn get_or_create_master_secret(&self) -> Result<Zeroizing<Vec<u8>>, EnclaveError>;

    /// Derive the item sealing key from the master secret using Argon2id.
    fn derive_sealing_key(&self, master_secret: &[u8])
        -> Result<Zeroizing<Vec<u8>>, EnclaveError>;

    /// Check if a master secret already exists in the keyring.
    fn has_master_secret(&self) -> Result<bool, EnclaveError>;

    /// Delete the master secret from the platform keyring.
    /// WARNING: every sealed credential becomes unreadable.
    fn delete_master_secret(&self) -> Result<(), EnclaveError>;
}

/// Derive a sealing key with the crate's Argon2id parameters.
pub(crate) fn derive_with_salt(
    master_secret: &[u8],
    salt: &[u8],
) -> Result<Zeroizing<Vec<u8>>, EnclaveError> {
    let params = Params::new(ARGON2_M_COST, ARGON2_T_COST, ARGON2_P_COST, Some(DERIVED_KEY_LEN))
        .map_err(|e| EnclaveError::Derivation(format!("invalid Argon2 params: {}", e)))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut derived_key = Zeroizing::new(vec![0u8; DERIVED_KEY_LEN]);
    argon2
        .hash_password_into(master_secret, salt, &mut derived_key)
        .map_err(|e| EnclaveError::Derivation(format!("Argon2id hash failed: {}", e)))?;

    Ok(derived_key)
}

/// Salt = SHA-256(service || "::" || user)
pub(crate) fn build_salt(service: &str, user: &str) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(service.as_bytes());
    hasher.update(b"::");
    hasher.update(user.as_bytes());
    hasher.finalize().to_vec()
}

/// Generate a cryptographically secure random master secret.
pub(crate) fn generate_master_secret() -> Result<Zeroizing<Vec<u8>>, EnclaveError> {
    let mut secret = Zeroizing::new(vec![0u8; MASTER_SECRET_LEN]);
    rand::rng().fill_bytes(&mut secret);

    if secret.len() != MASTER_SECRET_LEN {
        return Err(EnclaveError::InsufficientEntropy(
            secret.len(),
            MASTER_SECRET_LEN,
        ));
    }

    Ok(secret)
}

// ─── Platform Implementation ─────────────────────────────────────────────────

/// Production implementation using the `keyring` crate.
/// Dispatches to:
///   - Linux: kernel keyutils
///   - macOS: Security.framework Keychain
///   - Windows: Windows Credential Manager
pub struct KeyringProvider {
    service: String,
}

impl KeyringProvider {
    pub fn new() -> Self {
        Self::with_service(DEFAULT_KEYRING_SERVICE)
    }

    /// Creates a provider under a custom service name (isolates installations).
    pub fn with_service(service: &str) -> Self {
        Self {
            service: service.to_string(),
        }
    }

    fn entry(&self, user: &str) -> Result<keyring::Entry, EnclaveError> {
        keyring::Entry::new(&self.service, user)
            .map_err(|e| EnclaveError::Keyring(format!("failed to create keyring entry: {}", e)))
    }

    pub(crate) fn master_entry(&self) -> Result<keyring::Entry, EnclaveError> {
        self.entry(MASTER_SECRET_USER)
    }

    pub(crate) fn passcode_entry(&self) -> Result<keyring::Entry, EnclaveError> {
        self.entry(PASSCODE_USER)
    }
}

impl Default for KeyringProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl MasterKeyProvider for KeyringProvider {
    fn get_or_create_master_secret(&self) -> Result<Zeroizing<Vec<u8>>, EnclaveError> {
        let entry = self.master_entry()?;

        match entry.get_secret() {
            Ok(secret) => {
                tracing::debug!("Retrieved existing master secret from keyring");
                Ok(Zeroizing::new(secret))
            }
            Err(keyring::Error::NoEntry) => {
                tracing::info!("No master secret found — generating new one");
                let secret = generate_master_secret()?;
                entry.set_secret(&secret).map_err(|e| {
                    EnclaveError::Keyring(format!("failed to store master secret: {}", e))
                })?;
                tracing::info!("Master secret stored in platform keyring");
                Ok(secret)
            }
            Err(e) => Err(EnclaveError::Keyring(format!(
                "failed to retrieve master secret: {}",
                e
            ))),
        }
    }

    fn derive_sealing_key(
        &self,
        master_secret: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, EnclaveError> {
        derive_with_salt(master_secret, &build_salt(&self.service, MASTER_SECRET_USER))
    }

    fn has_master_secret(&self) -> Result<bool, EnclaveError> {
        let entry = self.master_entry()?;
        match entry.get_secret() {
            Ok(_) => Ok(true),
            Err(keyring::Error::NoEntry) => Ok(false),
            Err(e) => Err(EnclaveError::Keyring(format!(
                "failed to check master secret: {}",
                e
            ))),
        }
    }

    fn delete_master_secret(&self) -> Result<(), EnclaveError> {
        let entry = self.master_entry()?;
        match entry.delete_credential() {
            Ok(()) => {
                tracing::warn!("Master secret deleted from keyring — sealed items are now unreadable");
                Ok(())
            }
            Err(keyring::Error::NoEntry) => {
                tracing::debug!("No master secret to delete");
                Ok(())
            }
            Err(e) => Err(EnclaveError::Keyring(format!(
                "failed to delete master secret: {}",
                e
            ))),
        }
    }
}

// ─── In-Memory Mock for Testing ──────────────────────────────────────────────


// ─── Tests ───────────────────────────────────────────────────────────────────
