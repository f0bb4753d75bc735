//! Per-file encryption with caller-chosen secrets.
//!
//! Files uploaded through a link that carries an encryption secret are stored encrypted under a
//! key derived from that secret, not from a server-wide key. Layout of encrypted data:
//! nonce (12 bytes) || AES-256-GCM ciphertext || tag (16 bytes).

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use sha2::{Digest, Sha256, Sha384};
use subtle::ConstantTimeEq;

const NONCE_LEN: usize = 12;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    EncryptFailed(String),

    /// Wrong secret, truncated data, or data that was never encrypted.
    #[error("Decryption failed")]
    DecryptFailed,
}

fn cipher_for(secret: &str) -> Aes256Gcm {
    let digest = Sha256::digest(secret.as_bytes());
    Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&digest))
}

/// Encrypt file bytes under `secret`.
pub fn encrypt(data: &[u8], secret: &str) -> Result<Vec<u8>, CryptoError> {
    let cipher = cipher_for(secret);
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
    let ciphertext = cipher
        .encrypt(&nonce, data)
        .map_err(|e| CryptoError::EncryptFailed(e.to_string()))?;

    let mut combined = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    combined.extend_from_slice(&nonce);
    combined.extend_from_slice(&ciphertext);
    Ok(combined)
}

/// Decrypt bytes produced by [`encrypt`]. The input is only borrowed, so a failed attempt
/// leaves the caller's buffer exactly as it was.
pub fn decrypt(data: &[u8], secret: &str) -> Result<Vec<u8>, CryptoError> {
    if data.len() < NONCE_LEN {
        return Err(CryptoError::DecryptFailed);
    }

    let (nonce, ciphertext) = data.split_at(NONCE_LEN);
    cipher_for(secret)
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::DecryptFailed)
}

/// One-way digest of `input`: SHA-384, URL-safe base64 with padding (64 characters).
pub fn hash(input: &str) -> String {
    let digest = Sha384::digest(input.as_bytes());
    general_purpose::URL_SAFE.encode(digest)
}

/// Compare `input` against a digest produced by [`hash`] in constant time.
pub fn verify_hash(input: &str, expected: &str) -> bool {
    let actual = hash(input);
    if actual.len() != expected.len() {
        return false;
    }
    actual.as_bytes().ct_eq(expected.as_bytes()).into()
}
