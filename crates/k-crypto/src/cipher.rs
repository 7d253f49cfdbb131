// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SM4-CBC
//!
//! National-suite containers are encrypted with SM4 in CBC mode without
//! padding; the payload length is always a whole number of blocks.

use cbc::cipher::{generic_array::GenericArray, BlockDecryptMut, KeyIvInit};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, CryptoResult};

/// SM4 block size
pub const SM4_BLOCK_SIZE: usize = 16;

type Sm4CbcDec = cbc::Decryptor<sm4::Sm4>;

/// SM4 key (16 bytes)
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Sm4Key([u8; 16]);

impl Sm4Key {
    /// Create a new key from bytes
    #[must_use]
    pub const fn new(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Sm4Key {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Decrypt `buffer` in place
///
/// # Errors
///
/// Returns [`CryptoError::InvalidCiphertext`] if `buffer` is not a whole
/// number of blocks.
pub fn sm4_cbc_decrypt(key: &Sm4Key, iv: &[u8; SM4_BLOCK_SIZE], buffer: &mut [u8]) -> CryptoResult<()> {
    if buffer.len() % SM4_BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidCiphertext);
    }
    let mut decryptor = Sm4CbcDec::new(
        GenericArray::from_slice(key.as_ref()),
        GenericArray::from_slice(iv),
    );
    for block in buffer.chunks_exact_mut(SM4_BLOCK_SIZE) {
        decryptor.decrypt_block_mut(GenericArray::from_mut_slice(block));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_partial_block() {
        let key = Sm4Key::new([0u8; 16]);
        let mut data = [0u8; 17];
        assert_eq!(
            sm4_cbc_decrypt(&key, &[0u8; 16], &mut data),
            Err(CryptoError::InvalidCiphertext)
        );
    }

    #[test]
    fn test_known_answer_first_block() {
        // GB/T 32907 example: key = plaintext = 0123456789abcdeffedcba9876543210
        let raw = [
            0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54,
            0x32, 0x10,
        ];
        let key = Sm4Key::new(raw);
        let mut block = [
            0x68, 0x1e, 0xdf, 0x34, 0xd2, 0x06, 0x96, 0x5e, 0x86, 0xb3, 0xe9, 0x4f, 0x53, 0x6e,
            0x42, 0x46,
        ];
        // A zero IV reduces CBC to ECB for the first block
        sm4_cbc_decrypt(&key, &[0u8; 16], &mut block).unwrap();
        assert_eq!(block, raw);
    }
}
