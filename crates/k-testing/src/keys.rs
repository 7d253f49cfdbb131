// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Fixed test keys
//!
//! Nothing here is secret. The private keys exist so tests can sign
//! containers the verifier accepts, and the digests are what a
//! provisioned board would carry in its fuses.

use rsa::pkcs8::DecodePrivateKey;
use rsa::traits::PublicKeyParts;
use rsa::RsaPrivateKey;
use sha2::{Digest, Sha256};
use sm2::elliptic_curve::sec1::ToEncodedPoint;
use sm3::Sm3;

/// RSA-2048 signing key (PKCS#8 PEM)
const RSA_PRIVATE_KEY_PEM: &str = include_str!("keys/rsa2048_test.pem");

/// SM2 signing key scalar (GB/T 32918 sample key)
const SM2_SECRET_HEX: &str = "3945208f7b2144b13f36e38ac6d39f95889393692860b51a42fb81ef4df7c5b8";

/// Distinguishing identifier used for SM2 signatures
pub const SM2_ID: &str = "1234567812345678";

/// Device AES-256 key the security engine holds for international images
pub const DEVICE_AES_KEY: [u8; 32] = [
    0x60, 0x3d, 0xeb, 0x10, 0x15, 0xca, 0x71, 0xbe, 0x2b, 0x73, 0xae, 0xf0, 0x85, 0x7d, 0x77,
    0x81, 0x1f, 0x35, 0x2c, 0x07, 0x3b, 0x61, 0x08, 0xd7, 0x2d, 0x98, 0x10, 0xa3, 0x09, 0x14,
    0xdf, 0xf4,
];

/// Device SM4 key the security engine holds for national images
pub const DEVICE_SM4_KEY: [u8; 16] = [
    0x01, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd, 0xef, 0xfe, 0xdc, 0xba, 0x98, 0x76, 0x54, 0x32,
    0x10,
];

/// Proof-of-concept AES-256 key of GCM-only images
pub const POC_GCM_KEY: [u8; 32] = [
    0x24, 0x50, 0x1a, 0xd3, 0x84, 0xe4, 0x73, 0x96, 0x3d, 0x47, 0x6e, 0xdc, 0xfe, 0x08, 0x20,
    0x52, 0x37, 0xac, 0xfd, 0x49, 0xb5, 0xb8, 0xf3, 0x38, 0x57, 0xf8, 0x11, 0x4e, 0x86, 0x3f,
    0xec, 0x7f,
];

/// Fixed GCM nonce of every AES container
pub const GCM_IV: [u8; 12] = [
    0x9f, 0xf1, 0x85, 0x63, 0xb9, 0x78, 0xec, 0x28, 0x1b, 0x3f, 0x27, 0x94,
];

/// Fixed CBC IV of every SM4 container
pub const SM4_IV: [u8; 16] = [
    0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09, 0x0a, 0x0b, 0x0c, 0x0d, 0x0e,
    0x0f,
];

/// RSA signing key
///
/// # Panics
///
/// Panics if the embedded PEM is corrupt.
#[must_use]
pub fn rsa_private_key() -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_pem(RSA_PRIVATE_KEY_PEM).expect("embedded RSA key")
}

/// Big-endian modulus, left padded to 256 bytes
#[must_use]
pub fn rsa_modulus() -> [u8; 256] {
    let raw = rsa_private_key().n().to_bytes_be();
    let mut out = [0u8; 256];
    out[256 - raw.len()..].copy_from_slice(&raw);
    out
}

/// Public exponent
///
/// # Panics
///
/// Panics if the embedded key has an exponent wider than 32 bits.
#[must_use]
pub fn rsa_exponent() -> u32 {
    let raw = rsa_private_key().e().to_bytes_be();
    let mut word = [0u8; 4];
    assert!(raw.len() <= 4, "exponent wider than 32 bits");
    word[4 - raw.len()..].copy_from_slice(&raw);
    u32::from_be_bytes(word)
}

/// SHA-256 over modulus and little-endian exponent
#[must_use]
pub fn rsa_puk_digest() -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(rsa_modulus());
    hasher.update(rsa_exponent().to_le_bytes());
    hasher.finalize().into()
}

/// SM2 signing key scalar
///
/// # Panics
///
/// Panics if the embedded scalar is invalid.
#[must_use]
pub fn sm2_secret_key() -> sm2::SecretKey {
    let raw = hex::decode(SM2_SECRET_HEX).expect("embedded SM2 key hex");
    sm2::SecretKey::from_slice(&raw).expect("embedded SM2 key")
}

/// Affine public key coordinates `(x, y)`
#[must_use]
pub fn sm2_public_key() -> ([u8; 32], [u8; 32]) {
    let point = sm2_secret_key().public_key().to_encoded_point(false);
    let bytes = point.as_bytes();
    let mut x = [0u8; 32];
    let mut y = [0u8; 32];
    x.copy_from_slice(&bytes[1..33]);
    y.copy_from_slice(&bytes[33..65]);
    (x, y)
}

/// SM3 over id length, zero-padded id, x and y: the 452 leading bytes of
/// the SM2 verification block
#[must_use]
pub fn sm2_puk_digest() -> [u8; 32] {
    sm3_digest(&sm2_key_material(SM2_ID.as_bytes()))
}

/// The hashed prefix of an SM2 verification block for `id`
///
/// # Panics
///
/// Panics if `id` is longer than the 384-byte field.
#[must_use]
pub fn sm2_key_material(id: &[u8]) -> Vec<u8> {
    assert!(id.len() <= 384, "SM2 id too long");
    let (x, y) = sm2_public_key();
    let mut out = Vec::with_capacity(452);
    #[allow(clippy::cast_possible_truncation)]
    out.extend_from_slice(&(id.len() as u32).to_le_bytes());
    let mut field = [0u8; 384];
    field[..id.len()].copy_from_slice(id);
    out.extend_from_slice(&field);
    out.extend_from_slice(&x);
    out.extend_from_slice(&y);
    out
}

/// SHA-256 helper
#[must_use]
pub fn sha256_digest(data: &[u8]) -> [u8; 32] {
    Sha256::digest(data).into()
}

/// SM3 helper
#[must_use]
pub fn sm3_digest(data: &[u8]) -> [u8; 32] {
    Sm3::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsa_key_shape() {
        assert_eq!(rsa_exponent(), 65537);
        assert_ne!(rsa_modulus()[0], 0);
    }

    #[test]
    fn test_sm2_material_layout() {
        let material = sm2_key_material(SM2_ID.as_bytes());
        assert_eq!(material.len(), 452);
        assert_eq!(&material[0..4], &16u32.to_le_bytes());
        assert_eq!(&material[4..20], SM2_ID.as_bytes());
    }
}
