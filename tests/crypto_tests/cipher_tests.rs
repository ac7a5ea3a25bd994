//! Cipher Tests
//!
//! Tests for passphrase-keyed encryption in both nonce modes.

use txrx::cipher::{Cipher, NonceMode, NONCE_SIZE, TAG_SIZE};
use txrx::TxrxError;

#[test]
fn test_roundtrip_random_nonce() {
    let cipher = Cipher::new("secret", NonceMode::Random);
    let ciphertext = cipher.encrypt(b"attack at dawn").unwrap();

    assert_eq!(ciphertext.len(), NONCE_SIZE + 14 + TAG_SIZE);
    assert_eq!(cipher.decrypt(&ciphertext).unwrap(), b"attack at dawn");
}

#[test]
fn test_roundtrip_key_derived_nonce() {
    let cipher = Cipher::new("secret", NonceMode::KeyDerived);
    let ciphertext = cipher.encrypt(b"attack at dawn").unwrap();

    assert_eq!(ciphertext.len(), 14 + TAG_SIZE);
    assert_eq!(cipher.decrypt(&ciphertext).unwrap(), b"attack at dawn");
}

#[test]
fn test_random_nonce_varies_per_message() {
    let cipher = Cipher::new("secret", NonceMode::Random);
    let first = cipher.encrypt(b"same plaintext").unwrap();
    let second = cipher.encrypt(b"same plaintext").unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_key_derived_nonce_is_deterministic() {
    let a = Cipher::new("secret", NonceMode::KeyDerived);
    let b = Cipher::new("secret", NonceMode::KeyDerived);
    assert_eq!(a.encrypt(b"same").unwrap(), b.encrypt(b"same").unwrap());
}

#[test]
fn test_independent_instances_interoperate() {
    let sender = Cipher::new("shared", NonceMode::Random);
    let receiver = Cipher::new("shared", NonceMode::Random);
    let ciphertext = sender.encrypt(b"hello").unwrap();
    assert_eq!(receiver.decrypt(&ciphertext).unwrap(), b"hello");
}

#[test]
fn test_wrong_passphrase_fails() {
    let sender = Cipher::new("right", NonceMode::Random);
    let receiver = Cipher::new("wrong", NonceMode::Random);
    let ciphertext = sender.encrypt(b"hello").unwrap();

    let err = receiver.decrypt(&ciphertext).unwrap_err();
    assert!(matches!(err, TxrxError::Decryption(_)));
    assert!(err.is_protocol());
}

#[test]
fn test_tampered_ciphertext_fails() {
    let cipher = Cipher::new("secret", NonceMode::Random);
    let mut ciphertext = cipher.encrypt(b"hello world").unwrap();
    let last = ciphertext.len() - 1;
    ciphertext[last] ^= 0x01;

    assert!(matches!(cipher.decrypt(&ciphertext), Err(TxrxError::Decryption(_))));
}

#[test]
fn test_short_input_fails() {
    let cipher = Cipher::new("secret", NonceMode::Random);
    assert!(matches!(cipher.decrypt(&[0u8; 10]), Err(TxrxError::Decryption(_))));

    let cipher = Cipher::new("secret", NonceMode::KeyDerived);
    assert!(matches!(cipher.decrypt(&[0u8; 4]), Err(TxrxError::Decryption(_))));
}

#[test]
fn test_empty_plaintext() {
    let cipher = Cipher::new("secret", NonceMode::Random);
    let ciphertext = cipher.encrypt(b"").unwrap();
    assert!(cipher.decrypt(&ciphertext).unwrap().is_empty());
}

#[test]
fn test_debug_hides_key() {
    let cipher = Cipher::new("hunter2", NonceMode::Random);
    let debug = format!("{:?}", cipher);
    assert!(debug.contains("Random"));
    assert!(!debug.contains("hunter2"));
}
