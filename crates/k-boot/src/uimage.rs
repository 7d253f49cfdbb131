// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Legacy uImage header
//!
//! The decrypted plaintext carries a 64-byte big-endian uImage header four
//! bytes in. Only the magic is checked; the header and data CRCs are left
//! to the authenticated container.

use k_common::constants::{UIMAGE_HEADER_SIZE, UIMAGE_MAGIC};
use k_common::{Error, Result};

/// uImage type of a multi-file image
pub const IMAGE_TYPE_MULTI: u8 = 4;

/// Payload compression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ImageCompression {
    /// Stored
    None,
    /// Gzip, inflated by the hardware engine
    Gzip,
}

/// Parsed uImage header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UImageHeader {
    /// Header CRC
    pub header_crc: u32,
    /// Creation timestamp
    pub time: u32,
    /// Data size following the header
    pub data_size: u32,
    /// Load address
    pub load: u32,
    /// Entry point
    pub entry: u32,
    /// Data CRC
    pub data_crc: u32,
    /// Operating system code
    pub os: u8,
    /// Architecture code
    pub arch: u8,
    /// Image type code
    pub image_type: u8,
    /// Compression code
    pub compression: u8,
    /// NUL-padded image name
    pub name: [u8; 32],
}

fn be32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

impl UImageHeader {
    /// Encoded size
    pub const SIZE: usize = UIMAGE_HEADER_SIZE;

    /// Parse a header
    ///
    /// # Errors
    ///
    /// Returns [`Error::TruncatedImage`] if fewer than 64 bytes are given
    /// and [`Error::UnsupportedFormat`] on a magic mismatch.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::TruncatedImage);
        }
        if be32(bytes, 0) != UIMAGE_MAGIC {
            return Err(Error::UnsupportedFormat);
        }
        let mut name = [0u8; 32];
        name.copy_from_slice(&bytes[32..64]);
        Ok(Self {
            header_crc: be32(bytes, 4),
            time: be32(bytes, 8),
            data_size: be32(bytes, 12),
            load: be32(bytes, 16),
            entry: be32(bytes, 20),
            data_crc: be32(bytes, 24),
            os: bytes[28],
            arch: bytes[29],
            image_type: bytes[30],
            compression: bytes[31],
            name,
        })
    }

    /// Image name up to the first NUL; empty if not UTF-8
    #[must_use]
    pub fn name(&self) -> &str {
        let end = self.name.iter().position(|&b| b == 0).unwrap_or(self.name.len());
        core::str::from_utf8(&self.name[..end]).unwrap_or("")
    }

    /// Decoded compression
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedFormat`] for anything but none and gzip.
    pub const fn compression(&self) -> Result<ImageCompression> {
        match self.compression {
            0 => Ok(ImageCompression::None),
            1 => Ok(ImageCompression::Gzip),
            _ => Err(Error::UnsupportedFormat),
        }
    }

    /// Whether this is a multi-file image
    #[must_use]
    pub const fn is_multi(&self) -> bool {
        self.image_type == IMAGE_TYPE_MULTI
    }

    /// Locate the payload to load within `data`, the bytes after the header
    ///
    /// For a multi-file image this is sub-image 0, which follows the
    /// zero-terminated size table. Returns `(offset, len)` relative to
    /// `data`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TruncatedImage`] if the data or the size table runs
    /// past `data`.
    pub fn payload(&self, data: &[u8]) -> Result<(usize, usize)> {
        let size = self.data_size as usize;
        if size > data.len() {
            return Err(Error::TruncatedImage);
        }
        if !self.is_multi() {
            return Ok((0, size));
        }

        let table = &data[..size];
        let mut entries = 0;
        loop {
            let offset = entries * 4;
            if offset + 4 > table.len() {
                return Err(Error::TruncatedImage);
            }
            if be32(table, offset) == 0 {
                break;
            }
            entries += 1;
        }
        if entries == 0 {
            return Err(Error::TruncatedImage);
        }

        let start = (entries + 1) * 4;
        let len = be32(table, 0) as usize;
        if start + len > size {
            return Err(Error::TruncatedImage);
        }
        Ok((start, len))
    }
}
