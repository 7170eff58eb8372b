// keygate — Device Keystore
//
// Seals credential bytes with XChaCha20-Poly1305 under the key derived from
// the master secret. The key stays inside this type; callers only ever see
// ciphertext going in and plaintext coming out.
//
// Sealed layout: [nonce (24 bytes)][ciphertext + tag (16 bytes)]

use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use rand::RngCore;
use zeroize::Zeroizing;

use super::provider::DERIVED_KEY_LEN;
use super::{EnclaveError, MasterKeyProvider};

const NONCE_SIZE: usize = 24;
const TAG_SIZE: usize = 16;

/// Device-bound authenticated encryption for record data.
///
/// `associated_data` binds a ciphertext to the record it belongs to, so a
/// sealed secret copied onto another record fails to open.
pub trait DeviceKeystore {
    fn seal(&self, associated_data: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, EnclaveError>;

    fn open(
        &self,
        associated_data: &[u8],
        sealed: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, EnclaveError>;
}

/// AEAD keystore holding the derived sealing key (zeroized on drop).
pub struct SealingKeystore {
    key: Zeroizing<[u8; DERIVED_KEY_LEN]>,
}

impl SealingKeystore {
    pub fn from_key(key: &[u8]) -> Result<Self, EnclaveError> {
        if key.len() != DERIVED_KEY_LEN {
            return Err(EnclaveError::Seal(format!(
                "sealing key has invalid length: {} (expected {})",
                key.len(),
                DERIVED_KEY_LEN
            )));
        }
        let mut buf = Zeroizing::new([0u8; DERIVED_KEY_LEN]);
        buf.copy_from_slice(key);
        Ok(Self { key: buf })
    }

    /// Load (or create) the master secret and derive the sealing key from it.
    pub fn unlock<P: MasterKeyProvider>(provider: &P) -> Result<Self, EnclaveError> {
        let master = provider.get_or_create_master_secret()?;
        let key = provider.derive_sealing_key(&master)?;
        Self::from_key(&key)
    }

    fn cipher(&self) -> Result<XChaCha20Poly1305, EnclaveError> {
        XChaCha20Poly1305::new_from_slice(&self.key[..])
            .map_err(|e| EnclaveError::Seal(format!("invalid key: {}", e)))
    }
}

impl std::fmt::Debug for SealingKeystore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SealingKeystore")
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl DeviceKeystore for SealingKeystore {
    fn seal(&self, associated_data: &[u8], plaintext: &[u8]) -> Result<Vec<u8>, EnclaveError> {
        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::rng().fill_bytes(&mut nonce_bytes);
        let nonce = XNonce::from_slice(&nonce_bytes);

        let ciphertext = self
            .cipher()?
            .encrypt(
                nonce,
                Payload {
                    msg: plaintext,
                    aad: associated_data,
                },
            )
            .map_err(|e| EnclaveError::Seal(format!("encryption failed: {}", e)))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(sealed)
    }

    fn open(
        &self,
        associated_data: &[u8],
        sealed: &[u8],
    ) -> Result<Zeroizing<Vec<u8>>, EnclaveError> {
        if sealed.len() < NONCE_SIZE + TAG_SIZE {
            return Err(EnclaveError::Integrity);
        }

        let (nonce, ciphertext) = sealed.split_at(NONCE_SIZE);
        let plaintext = self
            .cipher()?
            .decrypt(
                XNonce::from_slice(nonce),
                Payload {
                    msg: ciphertext,
                    aad: associated_data,
                },
            )
            .map_err(|_| EnclaveError::Integrity)?;

        Ok(Zeroizing::new(plaintext))
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn keystore() -> SealingKeystore {
        SealingKeystore::from_key(&[7u8; DERIVED_KEY_LEN]).unwrap()
    }

    #[test]
    fn test_open_returns_sealed_plaintext() {
        let ks = keystore();
        let sealed = ks.seal(b"record-a", b"1234").unwrap();
        assert_eq!(sealed.len(), NONCE_SIZE + 4 + TAG_SIZE);
        assert_eq!(ks.open(b"record-a", &sealed).unwrap().as_slice(), b"1234");
    }

    #[test]
    fn test_wrong_associated_data_fails() {
        let ks = keystore();
        let sealed = ks.seal(b"record-a", b"1234").unwrap();
        assert!(matches!(ks.open(b"record-b", &sealed), Err(EnclaveError::Integrity)));
    }

    #[test]
    fn test_tampered_ciphertext_fails() {
        let ks = keystore();
        let mut sealed = ks.seal(b"aad", b"secret").unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        assert!(matches!(ks.open(b"aad", &sealed), Err(EnclaveError::Integrity)));
    }

    #[test]
    fn test_truncated_input_fails() {
        assert!(matches!(keystore().open(b"aad", &[0u8; 10]), Err(EnclaveError::Integrity)));
    }

    #[test]
    fn test_nonces_are_fresh() {
        let ks = keystore();
        let a = ks.seal(b"aad", b"same").unwrap();
        let b = ks.seal(b"aad", b"same").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_length_rejected() {
        assert!(SealingKeystore::from_key(&[0u8; 16]).is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let out = format!("{:?}", keystore());
        assert!(out.contains("[REDACTED]"));
    }
}
