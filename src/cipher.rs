//! Cipher Adapter
//!
//! Symmetric encryption keyed by a passphrase. The key is the SHA-256 digest
//! of the passphrase; the cipher is XChaCha20-Poly1305, so every ciphertext
//! carries an authentication tag and tampering surfaces as a decryption error.
//!
//! ## Nonces
//! - `NonceMode::Random` (default): a fresh 24-byte nonce per message, sent
//!   in front of the ciphertext
//! - `NonceMode::KeyDerived`: one nonce derived from the key and reused for
//!   every message. Nonce reuse under one key leaks plaintext relationships
//!   between messages; only use it when talking to a peer that expects it.
//!
//! The adapter holds no per-message state, so one instance can be shared by
//! concurrent senders and receivers.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{Key, XChaCha20Poly1305, XNonce};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{Result, TxrxError};

/// XChaCha20 nonce length
pub const NONCE_SIZE: usize = 24;

/// Poly1305 tag length
pub const TAG_SIZE: usize = 16;

/// Nonce selection strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NonceMode {
    #[default]
    Random,
    KeyDerived,
}

/// Passphrase-keyed AEAD cipher
#[derive(Clone)]
pub struct Cipher {
    aead: XChaCha20Poly1305,
    mode: NonceMode,
    /// Fixed nonce for `NonceMode::KeyDerived`
    derived_nonce: [u8; NONCE_SIZE],
}

impl Cipher {
    /// Derive key and nonce material from a passphrase
    pub fn new(passphrase: &str, mode: NonceMode) -> Self {
        let key = Sha256::digest(passphrase.as_bytes());

        let mut derived_nonce = [0u8; NONCE_SIZE];
        derived_nonce.copy_from_slice(&key[..NONCE_SIZE]);

        Self {
            aead: XChaCha20Poly1305::new(Key::from_slice(key.as_slice())),
            mode,
            derived_nonce,
        }
    }

    pub fn mode(&self) -> NonceMode {
        self.mode
    }

    /// Encrypt a buffer
    ///
    /// Output: `nonce (24) || ciphertext || tag (16)` in random mode,
    /// `ciphertext || tag (16)` in key-derived mode.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        match self.mode {
            NonceMode::Random => {
                let mut nonce = [0u8; NONCE_SIZE];
                OsRng.fill_bytes(&mut nonce);

                let ciphertext = self
                    .aead
                    .encrypt(XNonce::from_slice(&nonce), plaintext)
                    .map_err(|e| TxrxError::Encryption(e.to_string()))?;

                let mut output = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
                output.extend_from_slice(&nonce);
                output.extend_from_slice(&ciphertext);
                Ok(output)
            }
            NonceMode::KeyDerived => self
                .aead
                .encrypt(XNonce::from_slice(&self.derived_nonce), plaintext)
                .map_err(|e| TxrxError::Encryption(e.to_string())),
        }
    }

    /// Decrypt a buffer produced by `encrypt` under the same passphrase and mode
    pub fn decrypt(&self, data: &[u8]) -> Result<Vec<u8>> {
        let (nonce, ciphertext) = match self.mode {
            NonceMode::Random => {
                if data.len() < NONCE_SIZE + TAG_SIZE {
                    return Err(TxrxError::Decryption(format!(
                        "ciphertext too short: {} bytes",
                        data.len()
                    )));
                }
                data.split_at(NONCE_SIZE)
            }
            NonceMode::KeyDerived => (&self.derived_nonce[..], data),
        };

        self.aead
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| TxrxError::Decryption("authentication failed".to_string()))
    }
}

impl std::fmt::Debug for Cipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cipher").field("mode", &self.mode).finish_non_exhaustive()
    }
}
