// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! OTP fuse reads

use crate::error::{HalError, HalResult};
use crate::traits::{FuseInterface, PukKind};

/// Where the boot fuses sit inside the OTP read window
///
/// The offsets depend on the fuse map of the product line, so boards pass
/// them in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OtpLayout {
    /// Base address of the memory-mapped OTP read window
    pub base: u64,
    /// Size of the read window
    pub size: u64,
    /// Offset of the RSA public key digest (32 bytes)
    pub rsa_puk_digest: u64,
    /// Offset of the SM2 public key digest (32 bytes)
    pub sm2_puk_digest: u64,
    /// Offset of the product misc word; bit 0 forbids unauthenticated boot
    pub product_misc: u64,
}

/// Fuse reader over the OTP read window
pub struct OtpReader {
    layout: OtpLayout,
}

impl OtpReader {
    /// Create a reader for `layout`
    #[must_use]
    pub const fn new(layout: OtpLayout) -> Self {
        Self { layout }
    }

    fn read_word(&self, offset: u64) -> HalResult<u32> {
        if offset % 4 != 0 || offset.checked_add(4).map_or(true, |end| end > self.layout.size) {
            return Err(HalError::FuseReadFailed);
        }
        let addr = self.layout.base + offset;
        // SAFETY: The address is word aligned and inside the OTP read window
        // described by the board layout.
        Ok(unsafe { core::ptr::read_volatile(addr as usize as *const u32) })
    }
}

impl FuseInterface for OtpReader {
    fn read_puk_digest(&mut self, kind: PukKind) -> HalResult<[u8; 32]> {
        let offset = match kind {
            PukKind::Rsa => self.layout.rsa_puk_digest,
            PukKind::Sm2 => self.layout.sm2_puk_digest,
        };
        let mut digest = [0u8; 32];
        for (i, chunk) in digest.chunks_exact_mut(4).enumerate() {
            chunk.copy_from_slice(&self.read_word(offset + 4 * i as u64)?.to_le_bytes());
        }
        Ok(digest)
    }

    fn unauthenticated_boot_forbidden(&mut self) -> HalResult<bool> {
        Ok(self.read_word(self.layout.product_misc)? & 1 != 0)
    }
}
