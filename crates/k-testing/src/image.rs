// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Firmware image builder
//!
//! Produces the bytes a signing tool would write to a medium: a legacy
//! uImage (optionally gzip compressed or wrapped as a multi-file image)
//! behind a 4-byte prefix, sealed into a 528-byte container header with
//! one of the four protection schemes.

use std::io::Write;

use aes_gcm::aead::AeadInPlace;
use aes_gcm::{Aes256Gcm, KeyInit, Nonce};
use cbc::cipher::{generic_array::GenericArray, BlockEncryptMut, KeyIvInit};
use flate2::write::GzEncoder;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use rsa::Pkcs1v15Sign;
use sm2::dsa::signature::Signer;

use crate::keys;

/// Container magic ("K230")
pub const FIRMWARE_MAGIC: u32 = 0x3033_324B;

/// Container header size
pub const FIRMWARE_HEADER_SIZE: usize = 528;

/// uImage magic
pub const UIMAGE_MAGIC: u32 = 0x2705_1956;

/// uImage type: single kernel
pub const UIMAGE_TYPE_KERNEL: u8 = 2;

/// uImage type: multi-file
pub const UIMAGE_TYPE_MULTI: u8 = 4;

/// Gzip-compress `data`
///
/// # Panics
///
/// Panics if the in-memory encoder fails.
#[must_use]
pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data).expect("in-memory gzip");
    encoder.finish().expect("in-memory gzip")
}

/// Deterministic pseudo-random bytes, which gzip cannot shrink
#[must_use]
pub fn random_bytes(len: usize, seed: u64) -> Vec<u8> {
    let mut out = vec![0u8; len];
    StdRng::seed_from_u64(seed).fill_bytes(&mut out);
    out
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc = flate2::Crc::new();
    crc.update(data);
    crc.sum()
}

/// uImage payload compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// Stored as is
    None,
    /// Gzip
    Gzip,
    /// Raw uImage compression code, for unsupported-format tests
    Raw(u8),
}

impl Compression {
    fn code(self) -> u8 {
        match self {
            Self::None => 0,
            Self::Gzip => 1,
            Self::Raw(code) => code,
        }
    }
}

/// Legacy image
#[derive(Debug, Clone)]
pub struct UImage {
    name: String,
    load: u32,
    entry: u32,
    compression: Compression,
    multi: bool,
    data: Vec<u8>,
}

impl UImage {
    /// Uncompressed single image
    #[must_use]
    pub fn new(name: &str, load: u32, data: &[u8]) -> Self {
        Self {
            name: name.to_owned(),
            load,
            entry: load,
            compression: Compression::None,
            multi: false,
            data: data.to_vec(),
        }
    }

    /// Compress the payload
    #[must_use]
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    /// Wrap the payload as sub-image 0 of a multi-file image
    #[must_use]
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    /// Stored payload after compression
    #[must_use]
    pub fn stored_payload(&self) -> Vec<u8> {
        match self.compression {
            Compression::Gzip => gzip(&self.data),
            Compression::None | Compression::Raw(_) => self.data.clone(),
        }
    }

    /// Header and data
    ///
    /// # Panics
    ///
    /// Panics if the name does not fit the 32-byte field.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_bytes(&self) -> Vec<u8> {
        let stored = self.stored_payload();
        let body = if self.multi {
            let mut body = Vec::new();
            body.extend_from_slice(&(stored.len() as u32).to_be_bytes());
            body.extend_from_slice(&0u32.to_be_bytes());
            body.extend_from_slice(&stored);
            while body.len() % 4 != 0 {
                body.push(0);
            }
            body
        } else {
            stored
        };

        assert!(self.name.len() < 32, "uImage name too long");
        let mut header = [0u8; 64];
        header[0..4].copy_from_slice(&UIMAGE_MAGIC.to_be_bytes());
        header[12..16].copy_from_slice(&(body.len() as u32).to_be_bytes());
        header[16..20].copy_from_slice(&self.load.to_be_bytes());
        header[20..24].copy_from_slice(&self.entry.to_be_bytes());
        header[24..28].copy_from_slice(&crc32(&body).to_be_bytes());
        header[28] = 5; // Linux
        header[29] = 26; // RISC-V
        header[30] = if self.multi { UIMAGE_TYPE_MULTI } else { UIMAGE_TYPE_KERNEL };
        header[31] = self.compression.code();
        header[32..32 + self.name.len()].copy_from_slice(self.name.as_bytes());
        let header_crc = crc32(&header);
        header[4..8].copy_from_slice(&header_crc.to_be_bytes());

        let mut out = header.to_vec();
        out.extend_from_slice(&body);
        out
    }
}

/// Container protection scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protection {
    /// SHA-256 digest only
    None,
    /// AES-256-GCM with the proof-of-concept key
    GcmOnly,
    /// SM2 signature, SM4-CBC encryption
    Sm2,
    /// RSA-2048 signature, AES-256-GCM encryption
    Rsa,
}

impl Protection {
    /// Crypto-type tag written to the header
    #[must_use]
    pub fn tag(self) -> u32 {
        match self {
            Self::None => 0,
            Self::GcmOnly => 1,
            Self::Sm2 => 2,
            Self::Rsa => 3,
        }
    }
}

/// Builds sealed firmware containers
#[derive(Debug, Clone)]
pub struct ImageBuilder {
    plaintext: Vec<u8>,
    sm2_id: Vec<u8>,
}

impl ImageBuilder {
    /// Container around `image` with a zero prefix word
    #[must_use]
    pub fn new(image: &UImage) -> Self {
        let mut plaintext = vec![0u8; 4];
        plaintext.extend_from_slice(&image.to_bytes());
        Self::from_plaintext(plaintext)
    }

    /// Container around arbitrary plaintext
    #[must_use]
    pub fn from_plaintext(plaintext: Vec<u8>) -> Self {
        Self {
            plaintext,
            sm2_id: keys::SM2_ID.as_bytes().to_vec(),
        }
    }

    /// Override the SM2 distinguishing identifier
    #[must_use]
    pub fn sm2_id(mut self, id: &[u8]) -> Self {
        self.sm2_id = id.to_vec();
        self
    }

    /// Plaintext the container decrypts to
    #[must_use]
    pub fn plaintext(&self) -> &[u8] {
        &self.plaintext
    }

    /// Header followed by payload
    ///
    /// # Panics
    ///
    /// Panics if a signing or encryption step fails, which only happens
    /// on corrupt embedded keys.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn seal(&self, protection: Protection) -> Vec<u8> {
        let mut verify = [0u8; 516];
        let payload = match protection {
            Protection::None => {
                verify[..32].copy_from_slice(&keys::sha256_digest(&self.plaintext));
                self.plaintext.clone()
            }
            Protection::GcmOnly => Self::gcm_seal(&keys::POC_GCM_KEY, &self.plaintext),
            Protection::Rsa => {
                let payload = Self::gcm_seal(&keys::DEVICE_AES_KEY, &self.plaintext);
                let tag = &payload[payload.len() - 16..];
                let signature = keys::rsa_private_key()
                    .sign(Pkcs1v15Sign::new::<sha2::Sha256>(), &keys::sha256_digest(tag))
                    .expect("RSA signing");
                verify[0..256].copy_from_slice(&keys::rsa_modulus());
                verify[256..260].copy_from_slice(&keys::rsa_exponent().to_le_bytes());
                verify[260..516].copy_from_slice(&signature);
                payload
            }
            Protection::Sm2 => {
                let mut payload = self.plaintext.clone();
                while payload.len() % 16 != 0 {
                    payload.push(0);
                }
                let mut encryptor =
                    cbc::Encryptor::<sm4::Sm4>::new_from_slices(&keys::DEVICE_SM4_KEY, &keys::SM4_IV)
                        .expect("SM4 key length");
                for block in payload.chunks_exact_mut(16) {
                    encryptor.encrypt_block_mut(GenericArray::from_mut_slice(block));
                }

                let id = std::str::from_utf8(&self.sm2_id).expect("SM2 id must be UTF-8 to sign");
                let signing_key =
                    sm2::dsa::SigningKey::new(id, &keys::sm2_secret_key()).expect("SM2 signing key");
                let signature: sm2::dsa::Signature = signing_key.sign(&payload);
                let rs = signature.to_bytes();
                let rs: &[u8] = rs.as_ref();

                verify[0..452].copy_from_slice(&keys::sm2_key_material(&self.sm2_id));
                verify[452..516].copy_from_slice(rs);
                payload
            }
        };

        let mut out = Vec::with_capacity(FIRMWARE_HEADER_SIZE + payload.len());
        out.extend_from_slice(&FIRMWARE_MAGIC.to_le_bytes());
        out.extend_from_slice(&(payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&protection.tag().to_le_bytes());
        out.extend_from_slice(&verify);
        out.extend_from_slice(&payload);
        out
    }

    /// Ciphertext followed by the 16-byte tag
    fn gcm_seal(key: &[u8; 32], plaintext: &[u8]) -> Vec<u8> {
        let cipher = Aes256Gcm::new_from_slice(key).expect("AES-256 key length");
        let mut buffer = plaintext.to_vec();
        let tag = cipher
            .encrypt_in_place_detached(Nonce::from_slice(&keys::GCM_IV), b"", &mut buffer)
            .expect("GCM encryption");
        buffer.extend_from_slice(&tag);
        buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uimage_header_layout() {
        let image = UImage::new("rtt", 0x0020_0000, &[0xAB; 10]).to_bytes();
        assert_eq!(&image[0..4], &UIMAGE_MAGIC.to_be_bytes());
        assert_eq!(&image[12..16], &10u32.to_be_bytes());
        assert_eq!(&image[32..36], b"rtt\0");
        assert_eq!(image.len(), 74);
    }

    #[test]
    fn test_multi_table() {
        let image = UImage::new("rtt", 0, &[1, 2, 3]).multi().to_bytes();
        assert_eq!(image[30], UIMAGE_TYPE_MULTI);
        assert_eq!(&image[64..68], &3u32.to_be_bytes());
        assert_eq!(&image[68..72], &[0; 4]);
        assert_eq!(&image[72..75], &[1, 2, 3]);
    }

    #[test]
    fn test_seal_none_layout() {
        let sealed = ImageBuilder::from_plaintext(vec![1, 2, 3, 4]).seal(Protection::None);
        assert_eq!(sealed.len(), FIRMWARE_HEADER_SIZE + 4);
        assert_eq!(&sealed[0..4], b"K230");
        assert_eq!(&sealed[12..44], &keys::sha256_digest(&[1, 2, 3, 4]));
    }
}
