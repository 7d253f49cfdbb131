// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Firmware container header
//!
//! Every image on a boot medium starts with a fixed 528-byte
//! little-endian header:
//!
//! ```text
//! Offset  Size   Field
//! 0x000   4      Magic ("K230")
//! 0x004   4      Payload length
//! 0x008   4      Crypto type
//! 0x00C   516    Verification union, selected by crypto type
//! 0x210   ...    Payload
//! ```
//!
//! The union members are:
//!
//! ```text
//! RSA:   n[256] | e (u32 LE) | signature[256]
//! SM2:   id_len (u32 LE) | id[384] | x[32] | y[32] | r[32] | s[32]
//! none:  SHA-256 digest[32] | reserved[484]
//! ```

use k_common::constants::{FIRMWARE_HEADER_SIZE, FIRMWARE_MAGIC, VERIFY_UNION_SIZE};

use crate::verify::VerifyError;

// ============================================================================
// Union layout
// ============================================================================

const UNION_OFFSET: usize = 12;

const RSA_MODULUS_SIZE: usize = 256;
const RSA_EXPONENT_OFFSET: usize = RSA_MODULUS_SIZE;
const RSA_SIGNATURE_OFFSET: usize = RSA_EXPONENT_OFFSET + 4;
/// Bytes of RSA key material covered by the fused digest (n and e)
pub const RSA_KEY_MATERIAL_SIZE: usize = RSA_SIGNATURE_OFFSET;

/// Largest SM2 distinguishing identifier
pub const SM2_ID_MAX: usize = 384;
const SM2_ID_OFFSET: usize = 4;
const SM2_X_OFFSET: usize = SM2_ID_OFFSET + SM2_ID_MAX;
const SM2_Y_OFFSET: usize = SM2_X_OFFSET + 32;
const SM2_R_OFFSET: usize = SM2_Y_OFFSET + 32;
const SM2_S_OFFSET: usize = SM2_R_OFFSET + 32;
/// Bytes of SM2 key material covered by the fused digest (id and point)
pub const SM2_KEY_MATERIAL_SIZE: usize = SM2_R_OFFSET;

/// Protection scheme of a container
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u32)]
pub enum CryptoType {
    /// SHA-256 digest only
    None = 0,
    /// AES-256-GCM with the proof-of-concept key, unsigned
    GcmOnly = 1,
    /// SM2 / SM3 / SM4-CBC
    National = 2,
    /// RSA-2048 / SHA-256 / AES-256-GCM
    International = 3,
}

impl CryptoType {
    /// Decode a header tag
    #[must_use]
    pub const fn from_u32(tag: u32) -> Option<Self> {
        match tag {
            0 => Some(Self::None),
            1 => Some(Self::GcmOnly),
            2 => Some(Self::National),
            3 => Some(Self::International),
            _ => None,
        }
    }

    /// Short name for logs
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::GcmOnly => "gcm",
            Self::National => "sm2",
            Self::International => "rsa",
        }
    }
}

/// Parsed container header
#[derive(Clone, PartialEq, Eq)]
pub struct FirmwareHeader {
    /// Magic, always [`FIRMWARE_MAGIC`] once parsed
    pub magic: u32,
    /// Payload length in bytes
    pub length: u32,
    /// Raw crypto-type tag
    pub crypto_type: u32,
    /// Verification union
    pub verify: [u8; VERIFY_UNION_SIZE],
}

impl core::fmt::Debug for FirmwareHeader {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FirmwareHeader")
            .field("magic", &format_args!("{:#010x}", self.magic))
            .field("length", &self.length)
            .field("crypto_type", &self.crypto_type)
            .finish_non_exhaustive()
    }
}

impl FirmwareHeader {
    /// Encoded size
    pub const SIZE: usize = FIRMWARE_HEADER_SIZE;

    /// Parse a header, checking the magic before anything else
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::Truncated`] if fewer than [`Self::SIZE`]
    /// bytes are given and [`VerifyError::BadMagic`] on a magic mismatch.
    pub fn parse(bytes: &[u8]) -> Result<Self, VerifyError> {
        if bytes.len() < 4 {
            return Err(VerifyError::Truncated);
        }
        let magic = le32(bytes, 0);
        if magic != FIRMWARE_MAGIC {
            return Err(VerifyError::BadMagic);
        }
        if bytes.len() < Self::SIZE {
            return Err(VerifyError::Truncated);
        }

        let mut verify = [0u8; VERIFY_UNION_SIZE];
        verify.copy_from_slice(&bytes[UNION_OFFSET..Self::SIZE]);
        Ok(Self {
            magic,
            length: le32(bytes, 4),
            crypto_type: le32(bytes, 8),
            verify,
        })
    }

    /// Encode the header
    #[must_use]
    pub fn to_bytes(&self) -> [u8; FIRMWARE_HEADER_SIZE] {
        let mut out = [0u8; FIRMWARE_HEADER_SIZE];
        out[0..4].copy_from_slice(&self.magic.to_le_bytes());
        out[4..8].copy_from_slice(&self.length.to_le_bytes());
        out[8..12].copy_from_slice(&self.crypto_type.to_le_bytes());
        out[UNION_OFFSET..].copy_from_slice(&self.verify);
        out
    }

    /// Decoded crypto type
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::UnsupportedCrypto`] for unknown tags.
    pub const fn crypto(&self) -> Result<CryptoType, VerifyError> {
        match CryptoType::from_u32(self.crypto_type) {
            Some(kind) => Ok(kind),
            None => Err(VerifyError::UnsupportedCrypto),
        }
    }

    /// Payload length as a host size
    #[must_use]
    pub const fn payload_len(&self) -> usize {
        self.length as usize
    }

    /// Header plus payload
    #[must_use]
    pub const fn total_len(&self) -> usize {
        Self::SIZE + self.payload_len()
    }

    /// SHA-256 digest of an unprotected payload
    #[must_use]
    pub fn digest(&self) -> [u8; 32] {
        array(&self.verify, 0)
    }

    /// RSA view of the union
    #[must_use]
    pub fn rsa(&self) -> RsaVerification<'_> {
        RsaVerification {
            key_material: &self.verify[..RSA_KEY_MATERIAL_SIZE],
            modulus: array(&self.verify, 0),
            exponent: le32(&self.verify, RSA_EXPONENT_OFFSET),
            signature: array(&self.verify, RSA_SIGNATURE_OFFSET),
        }
    }

    /// SM2 view of the union
    ///
    /// # Errors
    ///
    /// Returns [`VerifyError::SignatureInvalid`] if the identifier length
    /// does not fit its field.
    pub fn sm2(&self) -> Result<Sm2Verification<'_>, VerifyError> {
        let id_len = le32(&self.verify, 0) as usize;
        if id_len > SM2_ID_MAX {
            return Err(VerifyError::SignatureInvalid);
        }
        Ok(Sm2Verification {
            key_material: &self.verify[..SM2_KEY_MATERIAL_SIZE],
            id: &self.verify[SM2_ID_OFFSET..SM2_ID_OFFSET + id_len],
            x: array(&self.verify, SM2_X_OFFSET),
            y: array(&self.verify, SM2_Y_OFFSET),
            r: array(&self.verify, SM2_R_OFFSET),
            s: array(&self.verify, SM2_S_OFFSET),
        })
    }
}

/// RSA member of the verification union
#[derive(Debug, Clone, Copy)]
pub struct RsaVerification<'a> {
    /// `n || e` as stored, the input of the fused digest
    pub key_material: &'a [u8],
    /// Modulus, big-endian
    pub modulus: [u8; 256],
    /// Public exponent
    pub exponent: u32,
    /// PKCS#1 v1.5 signature
    pub signature: [u8; 256],
}

/// SM2 member of the verification union
#[derive(Debug, Clone, Copy)]
pub struct Sm2Verification<'a> {
    /// `id_len || id || x || y` as stored, the input of the fused digest
    pub key_material: &'a [u8],
    /// Distinguishing identifier
    pub id: &'a [u8],
    /// Public key X
    pub x: [u8; 32],
    /// Public key Y
    pub y: [u8; 32],
    /// Signature r
    pub r: [u8; 32],
    /// Signature s
    pub s: [u8; 32],
}

fn le32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_le_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn array<const N: usize>(bytes: &[u8], offset: usize) -> [u8; N] {
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes[offset..offset + N]);
    out
}
