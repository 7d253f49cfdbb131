// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! AES-256-GCM
//!
//! Firmware containers carry the 16-byte tag after the ciphertext and use
//! a fixed nonce, so only detached in-place decryption is offered.

use aes_gcm::{
    aead::{AeadInPlace, KeyInit},
    Aes256Gcm, Nonce, Tag,
};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// GCM nonce size
pub const GCM_NONCE_SIZE: usize = 12;

/// GCM tag size
pub const GCM_TAG_SIZE: usize = 16;

/// AES-256-GCM key (32 bytes)
///
/// This type wraps a 256-bit key and ensures it is securely zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Aes256Key([u8; 32]);

impl Aes256Key {
    /// Create a new key from bytes
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Create from slice
    ///
    /// Returns `None` if slice length is not exactly 32 bytes.
    #[must_use]
    pub fn from_slice(slice: &[u8]) -> Option<Self> {
        let bytes: [u8; 32] = slice.try_into().ok()?;
        Some(Self(bytes))
    }
}

impl AsRef<[u8]> for Aes256Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Decrypt `buffer` in place and check the detached `tag`
///
/// # Errors
///
/// Returns [`CryptoError::AuthenticationFailed`] if the tag does not match;
/// `buffer` contents are unspecified in that case.
pub fn aes256_gcm_decrypt(
    key: &Aes256Key,
    nonce: &[u8; GCM_NONCE_SIZE],
    buffer: &mut [u8],
    tag: &[u8; GCM_TAG_SIZE],
) -> CryptoResult<()> {
    let cipher = Aes256Gcm::new_from_slice(key.as_ref()).map_err(|_| CryptoError::InvalidKey)?;
    cipher
        .decrypt_in_place_detached(Nonce::from_slice(nonce), b"", buffer, Tag::from_slice(tag))
        .map_err(|_| CryptoError::AuthenticationFailed)
}
