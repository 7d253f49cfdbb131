// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Signature verification
//!
//! Public keys travel inside the container header; the verifier checks
//! their digest against the fuses before trusting them here.

use rsa::{BigUint, Pkcs1v15Sign, RsaPublicKey};
use sm2::dsa::{signature::Verifier, Signature as Sm2Signature, VerifyingKey as Sm2VerifyingKey};

use crate::error::{CryptoError, CryptoResult};
use crate::hash::Sha256;
use crate::traits::Hash;

/// RSA-2048 modulus size
pub const RSA2048_MODULUS_SIZE: usize = 256;

/// SM2 coordinate / scalar size
pub const SM2_FIELD_SIZE: usize = 32;

/// Verify an RSA PKCS#1 v1.5 signature over SHA-256(`message`)
///
/// `modulus` is big-endian.
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if the key does not parse and
/// [`CryptoError::InvalidSignature`] if the signature does not verify.
pub fn rsa_pkcs1v15_sha256_verify(
    modulus: &[u8],
    exponent: u32,
    message: &[u8],
    signature: &[u8],
) -> CryptoResult<()> {
    if signature.len() != modulus.len() {
        return Err(CryptoError::InvalidSignature);
    }
    let key = RsaPublicKey::new(BigUint::from_bytes_be(modulus), BigUint::from(exponent))
        .map_err(|_| CryptoError::InvalidKey)?;
    let hashed = Sha256::hash(message);
    key.verify(Pkcs1v15Sign::new::<sha2::Sha256>(), hashed.as_ref(), signature)
        .map_err(|_| CryptoError::InvalidSignature)
}

/// SM2 public key as affine coordinates
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Sm2PublicKey {
    /// X coordinate, big-endian
    pub x: [u8; SM2_FIELD_SIZE],
    /// Y coordinate, big-endian
    pub y: [u8; SM2_FIELD_SIZE],
}

impl Sm2PublicKey {
    fn sec1_uncompressed(&self) -> [u8; 1 + 2 * SM2_FIELD_SIZE] {
        let mut out = [0u8; 1 + 2 * SM2_FIELD_SIZE];
        out[0] = 0x04;
        out[1..=SM2_FIELD_SIZE].copy_from_slice(&self.x);
        out[1 + SM2_FIELD_SIZE..].copy_from_slice(&self.y);
        out
    }
}

/// Verify an SM2 signature `(r, s)` over `message` with distinguishing id `id`
///
/// # Errors
///
/// Returns [`CryptoError::InvalidKey`] if the point is not on the curve or
/// the id is not text, and [`CryptoError::InvalidSignature`] otherwise.
pub fn sm2_verify(
    key: &Sm2PublicKey,
    id: &[u8],
    message: &[u8],
    r: &[u8; SM2_FIELD_SIZE],
    s: &[u8; SM2_FIELD_SIZE],
) -> CryptoResult<()> {
    let distid = core::str::from_utf8(id).map_err(|_| CryptoError::InvalidKey)?;
    let verifying_key = Sm2VerifyingKey::from_sec1_bytes(distid, &key.sec1_uncompressed())
        .map_err(|_| CryptoError::InvalidKey)?;

    let mut rs = [0u8; 2 * SM2_FIELD_SIZE];
    rs[..SM2_FIELD_SIZE].copy_from_slice(r);
    rs[SM2_FIELD_SIZE..].copy_from_slice(s);
    let signature =
        Sm2Signature::try_from(rs.as_slice()).map_err(|_| CryptoError::InvalidSignature)?;

    verifying_key
        .verify(message, &signature)
        .map_err(|_| CryptoError::InvalidSignature)
}
