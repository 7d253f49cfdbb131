// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Security engine
//!
//! The SoC decrypts firmware with keys held in OTP that software never
//! reads. The verifier therefore asks an engine to decrypt with the key in
//! a named slot. [`SoftEngine`] is the software rendition used by boards
//! without the hardware engine and by the host tests.

use crate::aead::{aes256_gcm_decrypt, Aes256Key, GCM_NONCE_SIZE, GCM_TAG_SIZE};
use crate::cipher::{sm4_cbc_decrypt, Sm4Key, SM4_BLOCK_SIZE};
use crate::error::{CryptoError, CryptoResult};

/// Key used by GCM-only proof-of-concept images
pub const POC_GCM_KEY: [u8; 32] = [
    0x24, 0x50, 0x1a, 0xd3, 0x84, 0xe4, 0x73, 0x96, 0x3d, 0x47, 0x6e, 0xdc, 0xfe, 0x08, 0x20,
    0x52, 0x37, 0xac, 0xfd, 0x49, 0xb5, 0xb8, 0xf3, 0x38, 0x57, 0xf8, 0x11, 0x4e, 0x86, 0x3f,
    0xec, 0x7f,
];

/// Key slots of the security engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum KeySlot {
    /// Device AES-256 key (international suite)
    DeviceAes,
    /// Device SM4 key (national suite)
    DeviceSm4,
    /// Well-known proof-of-concept AES-256 key
    ProofOfConcept,
}

/// Decryption with engine-held keys
pub trait SecurityEngine {
    /// AES-256-GCM decrypt `buffer` in place with the key in `slot`
    fn aes_gcm_decrypt(
        &mut self,
        slot: KeySlot,
        nonce: &[u8; GCM_NONCE_SIZE],
        buffer: &mut [u8],
        tag: &[u8; GCM_TAG_SIZE],
    ) -> CryptoResult<()>;

    /// SM4-CBC decrypt `buffer` in place with the key in `slot`
    fn sm4_cbc_decrypt(
        &mut self,
        slot: KeySlot,
        iv: &[u8; SM4_BLOCK_SIZE],
        buffer: &mut [u8],
    ) -> CryptoResult<()>;
}

/// Software security engine
///
/// Keys are zeroized when the engine is dropped.
#[derive(Default)]
pub struct SoftEngine {
    device_aes: Option<Aes256Key>,
    device_sm4: Option<Sm4Key>,
    poc: Option<Aes256Key>,
}

impl SoftEngine {
    /// Engine with no keys provisioned
    #[must_use]
    pub const fn new() -> Self {
        Self {
            device_aes: None,
            device_sm4: None,
            poc: None,
        }
    }

    /// Provision the device AES key
    #[must_use]
    pub fn with_device_aes(mut self, key: [u8; 32]) -> Self {
        self.device_aes = Some(Aes256Key::new(key));
        self
    }

    /// Provision the device SM4 key
    #[must_use]
    pub fn with_device_sm4(mut self, key: [u8; 16]) -> Self {
        self.device_sm4 = Some(Sm4Key::new(key));
        self
    }

    /// Provision the proof-of-concept key
    #[must_use]
    pub fn with_poc_key(mut self) -> Self {
        self.poc = Some(Aes256Key::new(POC_GCM_KEY));
        self
    }

    fn aes_key(&self, slot: KeySlot) -> CryptoResult<&Aes256Key> {
        match slot {
            KeySlot::DeviceAes => self.device_aes.as_ref(),
            KeySlot::ProofOfConcept => self.poc.as_ref(),
            KeySlot::DeviceSm4 => return Err(CryptoError::InvalidKey),
        }
        .ok_or(CryptoError::KeyUnavailable)
    }
}

impl SecurityEngine for SoftEngine {
    fn aes_gcm_decrypt(
        &mut self,
        slot: KeySlot,
        nonce: &[u8; GCM_NONCE_SIZE],
        buffer: &mut [u8],
        tag: &[u8; GCM_TAG_SIZE],
    ) -> CryptoResult<()> {
        aes256_gcm_decrypt(self.aes_key(slot)?, nonce, buffer, tag)
    }

    fn sm4_cbc_decrypt(
        &mut self,
        slot: KeySlot,
        iv: &[u8; SM4_BLOCK_SIZE],
        buffer: &mut [u8],
    ) -> CryptoResult<()> {
        if slot != KeySlot::DeviceSm4 {
            return Err(CryptoError::InvalidKey);
        }
        let key = self.device_sm4.as_ref().ok_or(CryptoError::KeyUnavailable)?;
        sm4_cbc_decrypt(key, iv, buffer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_keys() {
        let mut engine = SoftEngine::new();
        let mut buffer = [0u8; 16];
        assert_eq!(
            engine.aes_gcm_decrypt(KeySlot::DeviceAes, &[0; 12], &mut buffer, &[0; 16]),
            Err(CryptoError::KeyUnavailable)
        );
        assert_eq!(
            engine.sm4_cbc_decrypt(KeySlot::DeviceSm4, &[0; 16], &mut buffer),
            Err(CryptoError::KeyUnavailable)
        );
    }

    #[test]
    fn test_slot_kind_mismatch() {
        let mut engine = SoftEngine::new().with_device_sm4([1; 16]).with_poc_key();
        let mut buffer = [0u8; 16];
        assert_eq!(
            engine.aes_gcm_decrypt(KeySlot::DeviceSm4, &[0; 12], &mut buffer, &[0; 16]),
            Err(CryptoError::InvalidKey)
        );
        assert_eq!(
            engine.sm4_cbc_decrypt(KeySlot::ProofOfConcept, &[0; 16], &mut buffer),
            Err(CryptoError::InvalidKey)
        );
    }
}
