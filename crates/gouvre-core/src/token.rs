//! Opaque access tokens.
//!
//! A token seals `(filename, expires_at, secret, resolutions)` under the server key with
//! AES-256-GCM, so holders can neither read nor alter any field.
//!
//! Plaintext: u32 len || filename || i64 expiry_ts || u32 len || secret || u32 count || count * u32
//! (all big-endian). Token = base64url(nonce (12 bytes) || ciphertext || tag (16 bytes)).

use crate::AppError;
use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng},
    Aes256Gcm, Key, Nonce,
};
use base64::{engine::general_purpose, Engine as _};
use chrono::{DateTime, Utc};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TokenError {
    /// Malformed, truncated, or forged. Deliberately carries no detail.
    #[error("invalid token")]
    Invalid,

    #[error("token expired")]
    Expired,

    #[error("token sealing failed: {0}")]
    Crypto(String),
}

/// Decoded contents of a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenClaims {
    pub filename: String,
    /// Whole seconds; sub-second precision is dropped when the token is created.
    pub expires_at: DateTime<Utc>,
    /// Empty when the file is not encrypted.
    pub secret: String,
    /// Empty when no thumbnail set is attached.
    pub resolutions: Vec<u32>,
}

impl TokenClaims {
    pub fn has_secret(&self) -> bool {
        !self.secret.is_empty()
    }

    /// Expiry check the caller runs right after [`TokenCodec::parse_token`].
    pub fn ensure_not_expired(&self, now: DateTime<Utc>) -> Result<(), TokenError> {
        if now > self.expires_at {
            return Err(TokenError::Expired);
        }
        Ok(())
    }

    pub fn seconds_until_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expires_at - now).num_seconds().max(0)
    }
}

#[derive(Clone)]
pub struct TokenCodec {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec").finish_non_exhaustive()
    }
}

impl TokenCodec {
    /// Build a codec from a raw 32-byte key.
    pub fn from_key_bytes(key_bytes: &[u8]) -> Result<Self, AppError> {
        if key_bytes.len() != KEY_LEN {
            return Err(AppError::Internal(
                "Token key must be 32 bytes (256 bits)".to_string(),
            ));
        }
        let key = Key::<Aes256Gcm>::from_slice(key_bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Build a codec from a base64-encoded 32-byte key (the `TOKEN_KEY` format).
    pub fn from_base64_key(encoded: &str) -> Result<Self, AppError> {
        let key_bytes = general_purpose::STANDARD
            .decode(encoded.trim())
            .map_err(|e| AppError::Internal(format!("Failed to decode token key: {}", e)))?;

        Self::from_key_bytes(&key_bytes)
    }

    pub fn create_token(
        &self,
        filename: &str,
        expires_at: DateTime<Utc>,
        secret: &str,
        resolutions: &[u32],
    ) -> Result<String, TokenError> {
        let mut plaintext = Vec::with_capacity(
            4 + filename.len() + 8 + 4 + secret.len() + 4 + resolutions.len() * 4,
        );
        put_bytes(&mut plaintext, filename.as_bytes());
        plaintext.extend_from_slice(&expires_at.timestamp().to_be_bytes());
        put_bytes(&mut plaintext, secret.as_bytes());
        plaintext.extend_from_slice(&(resolutions.len() as u32).to_be_bytes());
        for resolution in resolutions {
            plaintext.extend_from_slice(&resolution.to_be_bytes());
        }

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|e| TokenError::Crypto(e.to_string()))?;

        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(general_purpose::URL_SAFE_NO_PAD.encode(&combined))
    }

    /// Decode and authenticate a token. Expiry is not checked here.
    pub fn parse_token(&self, token: &str) -> Result<TokenClaims, TokenError> {
        let combined = general_purpose::URL_SAFE_NO_PAD
            .decode(token)
            .map_err(|_| TokenError::Invalid)?;

        if combined.len() < NONCE_LEN + TAG_LEN {
            return Err(TokenError::Invalid);
        }

        let (nonce, ciphertext) = combined.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| TokenError::Invalid)?;

        decode_claims(&plaintext).ok_or(TokenError::Invalid)
    }
}

fn put_bytes(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

struct FieldReader<'a> {
    buf: &'a [u8],
}

impl<'a> FieldReader<'a> {
    fn take(&mut self, n: usize) -> Option<&'a [u8]> {
        if self.buf.len() < n {
            return None;
        }
        let (head, tail) = self.buf.split_at(n);
        self.buf = tail;
        Some(head)
    }

    fn u32(&mut self) -> Option<u32> {
        Some(u32::from_be_bytes(self.take(4)?.try_into().ok()?))
    }

    fn i64(&mut self) -> Option<i64> {
        Some(i64::from_be_bytes(self.take(8)?.try_into().ok()?))
    }

    fn string(&mut self) -> Option<String> {
        let len = self.u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).ok()
    }
}

fn decode_claims(plaintext: &[u8]) -> Option<TokenClaims> {
    let mut reader = FieldReader { buf: plaintext };

    let filename = reader.string()?;
    let expires_at = DateTime::from_timestamp(reader.i64()?, 0)?;
    let secret = reader.string()?;

    let count = reader.u32()? as usize;
    // Each resolution needs 4 bytes; reject counts the remaining input can't hold.
    if count > reader.buf.len() / 4 {
        return None;
    }
    let mut resolutions = Vec::with_capacity(count);
    for _ in 0..count {
        resolutions.push(reader.u32()?);
    }

    if !reader.buf.is_empty() {
        return None;
    }

    Some(TokenClaims {
        filename,
        expires_at,
        secret,
        resolutions,
    })
}
