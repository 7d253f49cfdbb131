// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Firmware container authentication
//!
//! # Verification Process
//!
//! 1. Check the header magic
//! 2. Select the scheme from the crypto type; unknown types are rejected
//!    before any scratch memory is touched
//! 3. Check the embedded public key against the digest fused into OTP
//! 4. Verify the signature
//! 5. Decrypt the payload into the scratch region
//!
//! Unprotected images are only accepted while the fuse policy allows it,
//! and then only if their SHA-256 digest matches. The source container is
//! never written; plaintext only ever lands in the scratch region.

use core::fmt;

use k_common::Error;
use k_crypto::aead::{GCM_NONCE_SIZE, GCM_TAG_SIZE};
use k_crypto::cipher::SM4_BLOCK_SIZE;
use k_crypto::hash::{Sha256, Sm3};
use k_crypto::signature::{rsa_pkcs1v15_sha256_verify, sm2_verify, Sm2PublicKey};
use k_crypto::{constant_time_eq, is_zero, CryptoError, Hash, KeySlot, SecurityEngine};
use k_hal::{FuseInterface, HalError, MemoryInterface, PukKind};

use crate::header::{CryptoType, FirmwareHeader};

/// Fixed AES-256-GCM nonce of signed images
pub const GCM_IV: [u8; GCM_NONCE_SIZE] = [
    0x9f, 0xf1, 0x85, 0x63, 0xb9, 0x78, 0xec, 0x28, 0x1b, 0x3f, 0x27, 0x94,
];

/// Fixed SM4-CBC initialization vector
pub const SM4_IV: [u8; SM4_BLOCK_SIZE] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
    0x0f,
];

// ============================================================================
// Verification Error Types
// ============================================================================

/// Verification error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum VerifyError {
    /// Header magic mismatch
    BadMagic,
    /// Unknown crypto type
    UnsupportedCrypto,
    /// Header or payload shorter than its fields require
    Truncated,
    /// No trusted key provisioned, or unauthenticated boot forbidden
    KeyMissing,
    /// Payload digest mismatch
    HashMismatch,
    /// Key digest or signature verification failed
    SignatureInvalid,
    /// Decryption or tag check failed
    DecryptFailed,
    /// Fuse read failed
    FuseReadFailed,
    /// Plaintext does not fit the scratch region
    ScratchTooSmall,
    /// Container not backed by memory
    OutOfBounds,
}

impl VerifyError {
    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::BadMagic => "bad container magic",
            Self::UnsupportedCrypto => "unsupported crypto type",
            Self::Truncated => "truncated container",
            Self::KeyMissing => "no trusted key",
            Self::HashMismatch => "digest mismatch",
            Self::SignatureInvalid => "signature invalid",
            Self::DecryptFailed => "decryption failed",
            Self::FuseReadFailed => "fuse read failed",
            Self::ScratchTooSmall => "scratch region too small",
            Self::OutOfBounds => "container out of memory bounds",
        }
    }
}

impl fmt::Display for VerifyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl From<VerifyError> for Error {
    fn from(e: VerifyError) -> Self {
        match e {
            VerifyError::BadMagic => Error::BadMagic,
            VerifyError::UnsupportedCrypto => Error::UnsupportedCrypto,
            VerifyError::Truncated => Error::TruncatedImage,
            VerifyError::KeyMissing => Error::KeyMissing,
            VerifyError::HashMismatch => Error::HashMismatch,
            VerifyError::SignatureInvalid => Error::SignatureInvalid,
            VerifyError::DecryptFailed => Error::DecryptFailed,
            VerifyError::FuseReadFailed => Error::FuseReadFailed,
            VerifyError::ScratchTooSmall => Error::BufferTooSmall,
            VerifyError::OutOfBounds => Error::MemoryAccessViolation,
        }
    }
}

impl From<HalError> for VerifyError {
    fn from(e: HalError) -> Self {
        match e {
            HalError::FuseReadFailed => Self::FuseReadFailed,
            _ => Self::OutOfBounds,
        }
    }
}

fn decrypt_error(e: CryptoError) -> VerifyError {
    match e {
        CryptoError::KeyUnavailable => VerifyError::KeyMissing,
        _ => VerifyError::DecryptFailed,
    }
}

// ============================================================================
// Authentication
// ============================================================================

/// Where plaintext may be written
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scratch {
    /// Start address
    pub addr: u64,
    /// Bytes available
    pub capacity: usize,
}

/// Authenticated payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Plaintext {
    /// Scheme the container was protected with
    pub crypto: CryptoType,
    /// Start of the plaintext
    pub addr: u64,
    /// Plaintext length
    pub len: usize,
}

/// Authenticate the container at `header_addr`
///
/// Returns where the trusted plaintext lives: the payload itself for an
/// unprotected image, `scratch.addr` otherwise. Every failure is terminal.
///
/// # Errors
///
/// See [`VerifyError`]. An unknown crypto type fails with
/// [`VerifyError::UnsupportedCrypto`] without writing scratch memory.
pub fn authenticate<M, F, E>(
    memory: &mut M,
    fuses: &mut F,
    engine: &mut E,
    header_addr: u64,
    scratch: Scratch,
) -> Result<Plaintext, VerifyError>
where
    M: MemoryInterface + ?Sized,
    F: FuseInterface + ?Sized,
    E: SecurityEngine + ?Sized,
{
    let header = FirmwareHeader::parse(memory.region(header_addr, FirmwareHeader::SIZE)?)?;
    let crypto = header.crypto()?;
    let payload_addr = header_addr + FirmwareHeader::SIZE as u64;
    let len = header.payload_len();

    match crypto {
        CryptoType::None => {
            if fuses
                .unauthenticated_boot_forbidden()
                .map_err(|_| VerifyError::FuseReadFailed)?
            {
                return Err(VerifyError::KeyMissing);
            }
            let digest = Sha256::hash(memory.region(payload_addr, len)?);
            if !constant_time_eq(digest.as_ref(), &header.digest()) {
                return Err(VerifyError::HashMismatch);
            }
            Ok(Plaintext {
                crypto,
                addr: payload_addr,
                len,
            })
        }
        CryptoType::GcmOnly => {
            let len = gcm_decrypt(
                memory,
                engine,
                KeySlot::ProofOfConcept,
                payload_addr,
                len,
                scratch,
            )?;
            Ok(Plaintext {
                crypto,
                addr: scratch.addr,
                len,
            })
        }
        CryptoType::International => {
            let rsa = header.rsa();
            check_puk(fuses, PukKind::Rsa, Sha256::hash(rsa.key_material).as_ref())?;

            let tag = read_tag(memory, payload_addr, len)?;
            rsa_pkcs1v15_sha256_verify(&rsa.modulus, rsa.exponent, &tag, &rsa.signature)
                .map_err(|_| VerifyError::SignatureInvalid)?;

            let len = gcm_decrypt(memory, engine, KeySlot::DeviceAes, payload_addr, len, scratch)?;
            Ok(Plaintext {
                crypto,
                addr: scratch.addr,
                len,
            })
        }
        CryptoType::National => {
            let sm2 = header.sm2()?;
            check_puk(fuses, PukKind::Sm2, Sm3::hash(sm2.key_material).as_ref())?;

            let key = Sm2PublicKey { x: sm2.x, y: sm2.y };
            sm2_verify(&key, sm2.id, memory.region(payload_addr, len)?, &sm2.r, &sm2.s)
                .map_err(|_| VerifyError::SignatureInvalid)?;

            if len > scratch.capacity {
                return Err(VerifyError::ScratchTooSmall);
            }
            let (src, dst) = memory.split_regions((payload_addr, len), (scratch.addr, len))?;
            dst.copy_from_slice(src);
            if let Err(e) = engine.sm4_cbc_decrypt(KeySlot::DeviceSm4, &SM4_IV, dst) {
                dst.fill(0);
                return Err(decrypt_error(e));
            }
            Ok(Plaintext {
                crypto,
                addr: scratch.addr,
                len,
            })
        }
    }
}

/// Compare `digest` with the fused digest of `kind`
fn check_puk<F>(fuses: &mut F, kind: PukKind, digest: &[u8]) -> Result<(), VerifyError>
where
    F: FuseInterface + ?Sized,
{
    let fused = fuses
        .read_puk_digest(kind)
        .map_err(|_| VerifyError::FuseReadFailed)?;
    if is_zero(&fused) {
        return Err(VerifyError::KeyMissing);
    }
    if !constant_time_eq(&fused, digest) {
        return Err(VerifyError::SignatureInvalid);
    }
    Ok(())
}

/// GCM tag carried in the last 16 payload bytes
fn read_tag<M>(memory: &M, payload_addr: u64, len: usize) -> Result<[u8; GCM_TAG_SIZE], VerifyError>
where
    M: MemoryInterface + ?Sized,
{
    if len < GCM_TAG_SIZE {
        return Err(VerifyError::Truncated);
    }
    let mut tag = [0u8; GCM_TAG_SIZE];
    memory.read(payload_addr + (len - GCM_TAG_SIZE) as u64, &mut tag)?;
    Ok(tag)
}

/// Decrypt `ciphertext || tag` into scratch, returning the plaintext length
fn gcm_decrypt<M, E>(
    memory: &mut M,
    engine: &mut E,
    slot: KeySlot,
    payload_addr: u64,
    len: usize,
    scratch: Scratch,
) -> Result<usize, VerifyError>
where
    M: MemoryInterface + ?Sized,
    E: SecurityEngine + ?Sized,
{
    let tag = read_tag(memory, payload_addr, len)?;
    let body = len - GCM_TAG_SIZE;
    if body > scratch.capacity {
        return Err(VerifyError::ScratchTooSmall);
    }

    let (src, dst) = memory.split_regions((payload_addr, body), (scratch.addr, body))?;
    dst.copy_from_slice(src);
    if let Err(e) = engine.aes_gcm_decrypt(slot, &GCM_IV, dst, &tag) {
        dst.fill(0);
        return Err(decrypt_error(e));
    }
    Ok(body)
}
