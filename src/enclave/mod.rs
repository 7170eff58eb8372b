// keygate — Enclave Module
//
// The secure module: master key storage in the OS keyring (Keychain/DPAPI/
// keyutils), Argon2id key derivation, AEAD sealing of record data, and
// passcode verification. Key material and enrolled reference data never
// leave this module.

mod error;
mod presence;
mod provider;
mod sealing;

pub use error::EnclaveError;
pub use presence::PresenceVerifier;
pub use provider::{KeyringProvider, MasterKeyProvider, DEFAULT_KEYRING_SERVICE};
pub use sealing::{DeviceKeystore, SealingKeystore};

#[cfg(test)]
pub use provider::mock;
