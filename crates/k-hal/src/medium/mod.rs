// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Storage media
//!
//! A [`StorageMedium`] is a probed, exclusively owned handle on one boot or
//! burn target. Three variants exist, one per storage technology:
//!
//! - [`MmcMedium`]: eMMC and SD cards, block addressed
//! - [`NorMedium`]: SPI NOR flash, erase-then-program in 4 KiB chunks
//! - [`NandMedium`]: SPI NAND flash, page programmed with bad-block skipping
//!
//! The variants sit on top of raw device traits which the platform
//! implements for its controllers and hands out through a
//! [`MediumProvider`].

use alloc::boxed::Box;

use k_common::{MediumKind, Millis};

use crate::error::{HalError, HalResult};

mod mmc;
mod nand;
mod nor;

pub use mmc::MmcMedium;
pub use nand::NandMedium;
pub use nor::NorMedium;

/// Size of the medium info record on the wire
pub const MEDIUM_INFO_SIZE: usize = 32;

/// MMC controller the on-board eMMC hangs off
pub const EMMC_BUS: u8 = 0;

/// MMC controller the SD card slot hangs off
pub const SD_BUS: u8 = 1;

// =============================================================================
// Medium Info
// =============================================================================

/// Geometry and policy of a probed medium
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MediumInfo {
    /// Total bytes addressable
    pub capacity: u64,
    /// Read/program unit in bytes (block or page)
    pub block_size: u64,
    /// Erase unit in bytes
    pub erase_size: u64,
    /// Host-side timeout for one operation
    pub timeout: Millis,
    /// Medium refuses writes
    pub write_protect: bool,
    /// Storage technology
    pub kind: MediumKind,
    /// Record was filled from a live device
    pub valid: bool,
}

impl MediumInfo {
    /// Record reported before any device was queried
    pub const INVALID: Self = Self {
        capacity: 0,
        block_size: 0,
        erase_size: 0,
        timeout: Millis::new(0),
        write_protect: false,
        kind: MediumKind::None,
        valid: false,
    };

    /// Encode as the 32-byte little-endian wire record
    #[must_use]
    pub fn to_bytes(&self) -> [u8; MEDIUM_INFO_SIZE] {
        let mut out = [0u8; MEDIUM_INFO_SIZE];
        out[0..8].copy_from_slice(&self.capacity.to_le_bytes());
        out[8..16].copy_from_slice(&self.block_size.to_le_bytes());
        out[16..24].copy_from_slice(&self.erase_size.to_le_bytes());

        let packed = u64::from(self.timeout.as_millis())
            | (u64::from(self.write_protect) << 32)
            | (u64::from(self.kind as u8 & 0x7F) << 40)
            | (u64::from(self.valid) << 47);
        out[24..32].copy_from_slice(&packed.to_le_bytes());
        out
    }

    /// Decode a wire record
    ///
    /// # Errors
    ///
    /// Returns [`HalError::InvalidParameter`] if `bytes` is not exactly
    /// 32 bytes long or carries an unknown medium kind.
    pub fn from_bytes(bytes: &[u8]) -> HalResult<Self> {
        let bytes: &[u8; MEDIUM_INFO_SIZE] =
            bytes.try_into().map_err(|_| HalError::InvalidParameter)?;
        let word = |i: usize| {
            let mut raw = [0u8; 8];
            raw.copy_from_slice(&bytes[i * 8..i * 8 + 8]);
            u64::from_le_bytes(raw)
        };
        let packed = word(3);
        #[allow(clippy::cast_possible_truncation)]
        let kind = MediumKind::from_u8(((packed >> 40) & 0x7F) as u8)
            .ok_or(HalError::InvalidParameter)?;

        #[allow(clippy::cast_possible_truncation)]
        let timeout = Millis::new(packed as u32);

        Ok(Self {
            capacity: word(0),
            block_size: word(1),
            erase_size: word(2),
            timeout,
            write_protect: (packed >> 32) & 0xFF != 0,
            kind,
            valid: (packed >> 47) & 1 != 0,
        })
    }

    /// Whether `[offset, offset + len)` lies inside the medium
    #[must_use]
    pub fn contains(&self, offset: u64, len: u64) -> bool {
        offset
            .checked_add(len)
            .is_some_and(|end| end <= self.capacity)
    }
}

impl Default for MediumInfo {
    fn default() -> Self {
        Self::INVALID
    }
}

// =============================================================================
// Medium Trait
// =============================================================================

/// A probed storage medium
pub trait StorageMedium {
    /// Storage technology of this medium
    fn kind(&self) -> MediumKind;

    /// Query geometry and policy
    fn info(&mut self) -> HalResult<MediumInfo>;

    /// Read `buffer.len()` bytes starting at `offset`
    fn read(&mut self, offset: u64, buffer: &mut [u8]) -> HalResult<()>;

    /// Write `data` starting at `offset`
    ///
    /// Flash variants erase the covered range first.
    fn write(&mut self, offset: u64, data: &[u8]) -> HalResult<()>;

    /// Erase `len` bytes starting at `offset`
    fn erase(&mut self, offset: u64, len: u64) -> HalResult<()>;
}

// =============================================================================
// Device Traits
// =============================================================================

/// Block device behind an MMC/SD controller
///
/// Transfer functions return the number of blocks actually moved.
pub trait BlockDevice {
    /// Bytes per block
    fn block_size(&self) -> u32;

    /// Number of addressable blocks
    fn block_count(&self) -> u64;

    /// Blocks per erase group
    fn erase_group_blocks(&self) -> u32;

    /// Write-protect switch state
    fn is_write_protected(&self) -> bool;

    /// Read whole blocks into `buffer`
    fn read_blocks(&mut self, start: u64, buffer: &mut [u8]) -> HalResult<u64>;

    /// Write whole blocks from `data`
    fn write_blocks(&mut self, start: u64, data: &[u8]) -> HalResult<u64>;

    /// Erase `count` blocks
    fn erase_blocks(&mut self, start: u64, count: u64) -> HalResult<u64>;
}

/// SPI NOR flash device
pub trait NorFlashDevice {
    /// Total bytes
    fn size(&self) -> u64;

    /// Sector (erase unit) size
    fn erase_size(&self) -> u32;

    /// Program page size
    fn page_size(&self) -> u32;

    /// Read bytes
    fn read(&mut self, offset: u64, buffer: &mut [u8]) -> HalResult<()>;

    /// Program bytes into erased flash
    fn write(&mut self, offset: u64, data: &[u8]) -> HalResult<()>;

    /// Erase whole sectors
    fn erase(&mut self, offset: u64, len: u64) -> HalResult<()>;
}

/// SPI NAND flash device
pub trait NandFlashDevice {
    /// Total bytes
    fn size(&self) -> u64;

    /// Erase block size
    fn erase_size(&self) -> u32;

    /// Page (program unit) size
    fn write_size(&self) -> u32;

    /// Whether the erase block containing `offset` is marked bad
    fn is_bad_block(&mut self, offset: u64) -> bool;

    /// Read one page
    fn read_page(&mut self, offset: u64, buffer: &mut [u8]) -> HalResult<()>;

    /// Program one page
    fn write_page(&mut self, offset: u64, data: &[u8]) -> HalResult<()>;

    /// Erase one block; a bad block fails with [`HalError::BadBlock`]
    fn erase_block(&mut self, offset: u64) -> HalResult<()>;

    /// Lift write protection on a range
    ///
    /// Devices without block protection return [`HalError::NotSupported`].
    fn unlock(&mut self, offset: u64, len: u64) -> HalResult<()>;

    /// Restore write protection on a range
    fn lock(&mut self, offset: u64, len: u64) -> HalResult<()>;
}

/// Source of live storage devices
pub trait MediumProvider {
    /// Block device on MMC controller `bus`
    fn block_device(&mut self, bus: u8) -> Option<Box<dyn BlockDevice>>;

    /// NOR flash number `index`
    fn nor_flash(&mut self, index: u8) -> Option<Box<dyn NorFlashDevice>>;

    /// NAND flash number `index`
    fn nand_flash(&mut self, index: u8) -> Option<Box<dyn NandFlashDevice>>;
}

// =============================================================================
// Probe
// =============================================================================

/// Bind a medium of `kind`
///
/// eMMC and SD cards sit on fixed controllers, so `index` only selects
/// among NOR or NAND chips.
///
/// # Errors
///
/// Returns [`HalError::MediumNotFound`] if the provider has no such device
/// or `kind` names no storage technology.
pub fn probe(
    provider: &mut dyn MediumProvider,
    kind: MediumKind,
    index: u8,
) -> HalResult<Box<dyn StorageMedium>> {
    match kind {
        MediumKind::Emmc | MediumKind::SdCard => {
            let bus = if kind == MediumKind::Emmc { EMMC_BUS } else { SD_BUS };
            let device = provider.block_device(bus).ok_or(HalError::MediumNotFound)?;
            Ok(Box::new(MmcMedium::new(kind, device)))
        }
        MediumKind::SpiNor => {
            let device = provider.nor_flash(index).ok_or(HalError::MediumNotFound)?;
            Ok(Box::new(NorMedium::new(device)))
        }
        MediumKind::SpiNand => {
            let device = provider.nand_flash(index).ok_or(HalError::MediumNotFound)?;
            Ok(Box::new(NandMedium::new(device)))
        }
        MediumKind::None | MediumKind::Otp => Err(HalError::MediumNotFound),
    }
}

/// Whether every byte of `data` is erased flash
pub(crate) fn is_blank(data: &[u8]) -> bool {
    data.iter().all(|&b| b == 0xFF)
}
