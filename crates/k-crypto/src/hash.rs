// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Hash function implementations
//!
//! SHA-256 (international suite, unauthenticated images) and SM3 (national
//! suite). Both produce 32-byte digests, the size burnt into the fuses.

use crate::traits::Hash;
use sha2::Digest;

/// 32-byte digest
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Digest32([u8; 32]);

impl Digest32 {
    /// Create from bytes
    #[must_use]
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    #[must_use]
    pub const fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl AsRef<[u8]> for Digest32 {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for Digest32 {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

/// SHA-256 hasher
pub struct Sha256 {
    inner: sha2::Sha256,
}

impl Hash for Sha256 {
    const OUTPUT_SIZE: usize = 32;
    const BLOCK_SIZE: usize = 64;

    type Output = Digest32;

    fn new() -> Self {
        Self {
            inner: sha2::Sha256::new(),
        }
    }

    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.inner, data);
    }

    fn finalize(self) -> Self::Output {
        Digest32(self.inner.finalize().into())
    }
}

impl Default for Sha256 {
    fn default() -> Self {
        <Self as Hash>::new()
    }
}

/// SM3 hasher
pub struct Sm3 {
    inner: sm3::Sm3,
}

impl Hash for Sm3 {
    const OUTPUT_SIZE: usize = 32;
    const BLOCK_SIZE: usize = 64;

    type Output = Digest32;

    fn new() -> Self {
        Self {
            inner: sm3::Sm3::new(),
        }
    }

    fn update(&mut self, data: &[u8]) {
        Digest::update(&mut self.inner, data);
    }

    fn finalize(self) -> Self::Output {
        Digest32(self.inner.finalize().into())
    }
}

impl Default for Sm3 {
    fn default() -> Self {
        <Self as Hash>::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_incremental_matches_oneshot() {
        let data = b"K230 firmware payload";
        let mut hasher = <Sm3 as Hash>::new();
        hasher.update(&data[..4]);
        hasher.update(&data[4..]);
        assert_eq!(hasher.finalize(), Sm3::hash(data));
    }

    #[test]
    fn test_algorithms_differ() {
        assert_ne!(Sha256::hash(b"abc"), Sm3::hash(b"abc"));
    }
}
