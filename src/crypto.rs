//! AES-256-GCM authenticated encryption and Argon2id key derivation.
//!
//! Key: 32 bytes. Nonce: 12 bytes, freshly random per call. Tag: 16 bytes.
//!
//! # Envelope layout
//! `nonce(12) ‖ tag(16) ‖ ciphertext(n)`. This is NOT the layout
//! `aes-gcm`/most AEAD crates hand back natively (nonce ‖ ciphertext+tag) —
//! the tag is split off and moved ahead of the ciphertext so a reader can
//! validate the tag before touching a payload of unbounded length. Every
//! caller in this crate (chunk table, chunk bodies, monolithic blobs) uses
//! this one envelope shape.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng as AeadOsRng};
use aes_gcm::{Aes256Gcm, Nonce};
use argon2::{Algorithm, Argon2, Params, Version};
use thiserror::Error;

pub const KEY_LEN: usize = 32;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;
pub const ENVELOPE_OVERHEAD: usize = NONCE_LEN + TAG_LEN;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("encryption failed")]
    EncryptionFailed,
    #[error("authentication failed")]
    AuthFailed,
    #[error("key derivation failed: {0}")]
    KeyDerivation(String),
    #[error("encrypted envelope too short (minimum {ENVELOPE_OVERHEAD} bytes)")]
    TooShort,
    #[error("key missing for encrypted entry")]
    KeyMissing,
    #[error("key must be {KEY_LEN} bytes, got {0}")]
    KeyWrongLength(usize),
}

/// Derive a 256-bit key from a password and a salt using Argon2id.
///
/// Additive convenience on top of the raw `(key, nonce)` contract: callers
/// who want password-based archives instead of managing raw key bytes can
/// use `salt = archive-scoped bytes` (e.g. the first 16 bytes of the
/// header) so the same password yields different keys per archive.
pub fn derive_key(password: &str, salt: &[u8]) -> Result<[u8; KEY_LEN], CryptoError> {
    let params = Params::new(64 * 1024, 3, 1, Some(KEY_LEN))
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut key = [0u8; KEY_LEN];
    argon2
        .hash_password_into(password.as_bytes(), salt, &mut key)
        .map_err(|e| CryptoError::KeyDerivation(e.to_string()))?;
    Ok(key)
}

/// Encrypt `plaintext` under `key` with a freshly generated random nonce.
///
/// Returns `nonce(12) ‖ tag(16) ‖ ciphertext(n)`.
pub fn encrypt(key: &[u8; KEY_LEN], plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::EncryptionFailed)?;
    let nonce = Aes256Gcm::generate_nonce(&mut AeadOsRng);
    let mut sealed = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|_| CryptoError::EncryptionFailed)?;
    // aes-gcm appends the tag after the ciphertext; split it off and move it
    // ahead of the ciphertext to match the envelope's on-disk order.
    let tag_start = sealed.len() - TAG_LEN;
    let tag = sealed.split_off(tag_start);
    let ciphertext = sealed;

    let mut out = Vec::with_capacity(ENVELOPE_OVERHEAD + ciphertext.len());
    out.extend_from_slice(nonce.as_slice());
    out.extend_from_slice(&tag);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

/// Decrypt an envelope produced by [`encrypt`]. A tag mismatch never exposes
/// partial plaintext: the ciphertext is not returned unless verification
/// succeeds in full.
pub fn decrypt(key: &[u8; KEY_LEN], envelope: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if envelope.len() < ENVELOPE_OVERHEAD {
        return Err(CryptoError::TooShort);
    }
    let nonce_bytes = &envelope[..NONCE_LEN];
    let tag_bytes = &envelope[NONCE_LEN..ENVELOPE_OVERHEAD];
    let ciphertext = &envelope[ENVELOPE_OVERHEAD..];

    // Rebuild the aes-gcm-native ordering (ciphertext ‖ tag) for the call.
    let mut native = Vec::with_capacity(ciphertext.len() + TAG_LEN);
    native.extend_from_slice(ciphertext);
    native.extend_from_slice(tag_bytes);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CryptoError::AuthFailed)?;
    let nonce = Nonce::from_slice(nonce_bytes);
    cipher
        .decrypt(nonce, native.as_slice())
        .map_err(|_| CryptoError::AuthFailed)
}
