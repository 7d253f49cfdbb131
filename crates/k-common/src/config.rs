// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Loader and burn engine configuration
//!
//! Configuration is fixed at build time per board. Every structure has a
//! `DEFAULT` matching the reference board and a `validate` that rejects
//! layouts the pipeline cannot work with.

use crate::constants::{
    BURN_DEFAULT_MAX_PACKET, BURN_EP_BUFFER_SIZE, DEFAULT_DECOMPRESS_TIMEOUT_TICKS,
    DEFAULT_MEMORY_BASE, DEFAULT_MEMORY_SIZE, FIRMWARE_HEADER_SIZE, MAX_DECOMPRESSED_SIZE,
};
use crate::errors::{Error, Result};
use crate::log::LogLevel;
use crate::types::{BootTarget, MediumKind};

/// DRAM window the loader stages images in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    /// DRAM base address
    pub base: u64,
    /// DRAM size in bytes
    pub size: u64,
}

impl MemoryLayout {
    /// Default layout: 128 MiB at address 0
    pub const DEFAULT: Self = Self {
        base: DEFAULT_MEMORY_BASE,
        size: DEFAULT_MEMORY_SIZE,
    };

    /// Where the raw (encrypted) container is read to: the top third of DRAM
    #[must_use]
    pub const fn encrypted_load_addr(&self) -> u64 {
        self.base + self.size - self.size / 3
    }

    /// Where decrypted plaintext is written: the middle third of DRAM
    #[must_use]
    pub const fn decrypt_scratch_addr(&self) -> u64 {
        self.base + self.size - (self.size / 3) * 2
    }

    /// Bytes available at the encrypted load address
    #[must_use]
    pub const fn load_capacity(&self) -> u64 {
        self.base + self.size - self.encrypted_load_addr()
    }

    /// Bytes available at the scratch address before the load region
    #[must_use]
    pub const fn scratch_capacity(&self) -> u64 {
        self.encrypted_load_addr() - self.decrypt_scratch_addr()
    }

    /// Validate the layout
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBootConfig`] if DRAM is too small to hold a
    /// header in each region or the window wraps the address space.
    pub const fn validate(&self) -> Result<()> {
        if self.size < 3 * FIRMWARE_HEADER_SIZE as u64 {
            return Err(Error::InvalidBootConfig);
        }
        if self.base.checked_add(self.size).is_none() {
            return Err(Error::InvalidBootConfig);
        }
        Ok(())
    }
}

impl Default for MemoryLayout {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Number of concrete boot targets
const TARGET_COUNT: usize = BootTarget::ALL.len();

const fn target_index(target: BootTarget) -> Option<usize> {
    match target {
        BootTarget::Linux => Some(0),
        BootTarget::Rtt => Some(1),
        BootTarget::QuickBootConfig => Some(2),
        BootTarget::FaceDatabase => Some(3),
        BootTarget::SensorConfig => Some(4),
        BootTarget::AiMode => Some(5),
        BootTarget::Speckle => Some(6),
        BootTarget::RtApp => Some(7),
        BootTarget::Uboot => Some(8),
        BootTarget::Auto => None,
    }
}

/// Byte offsets of boot targets, one table per medium technology
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionTable {
    mmc: [Option<u64>; TARGET_COUNT],
    nor: [Option<u64>; TARGET_COUNT],
    nand: [Option<u64>; TARGET_COUNT],
}

impl PartitionTable {
    /// Empty table: every lookup fails
    pub const EMPTY: Self = Self {
        mmc: [None; TARGET_COUNT],
        nor: [None; TARGET_COUNT],
        nand: [None; TARGET_COUNT],
    };

    /// Reference board layout
    pub const DEFAULT: Self = {
        let mut table = Self::EMPTY;
        // Linux, Rtt, .., Uboot
        table.mmc[0] = Some(0x01E0_0000);
        table.mmc[1] = Some(0x00A0_0000);
        table.mmc[8] = Some(0x0020_0000);
        table.nor[0] = Some(0x0070_0000);
        table.nor[1] = Some(0x0020_0000);
        table.nor[8] = Some(0x0008_0000);
        table.nand[0] = Some(0x00A0_0000);
        table.nand[1] = Some(0x0020_0000);
        table.nand[8] = Some(0x0008_0000);
        table
    };

    const fn row(&self, kind: MediumKind) -> Option<&[Option<u64>; TARGET_COUNT]> {
        match kind {
            MediumKind::Emmc | MediumKind::SdCard => Some(&self.mmc),
            MediumKind::SpiNor => Some(&self.nor),
            MediumKind::SpiNand => Some(&self.nand),
            MediumKind::None | MediumKind::Otp => None,
        }
    }

    /// Look up the byte offset of `target` on a medium of `kind`
    #[must_use]
    pub const fn offset(&self, kind: MediumKind, target: BootTarget) -> Option<u64> {
        match (self.row(kind), target_index(target)) {
            (Some(row), Some(index)) => row[index],
            _ => None,
        }
    }

    /// Set or clear the offset of `target` on media of `kind`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for `Auto` or a medium kind that
    /// cannot hold boot images.
    pub fn set(&mut self, kind: MediumKind, target: BootTarget, offset: Option<u64>) -> Result<()> {
        let index = target_index(target).ok_or(Error::InvalidParameter)?;
        let row = match kind {
            MediumKind::Emmc | MediumKind::SdCard => &mut self.mmc,
            MediumKind::SpiNor => &mut self.nor,
            MediumKind::SpiNand => &mut self.nand,
            MediumKind::None | MediumKind::Otp => return Err(Error::InvalidParameter),
        };
        row[index] = offset;
        Ok(())
    }
}

impl Default for PartitionTable {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Boot loader configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootConfig {
    /// DRAM staging layout
    pub memory: MemoryLayout,
    /// Target offsets per medium
    pub partitions: PartitionTable,
    /// Decompressor deadline in timer ticks
    pub decompress_timeout_ticks: u64,
    /// Largest decompressed image accepted
    pub max_decompressed_size: usize,
    /// Target tried first by `auto_boot`
    pub auto_primary: BootTarget,
    /// Target tried once if the primary attempt fails
    pub auto_fallback: BootTarget,
    /// Minimum level recorded in the boot log
    pub min_log_level: LogLevel,
}

impl BootConfig {
    /// Reference board configuration
    pub const DEFAULT: Self = Self {
        memory: MemoryLayout::DEFAULT,
        partitions: PartitionTable::DEFAULT,
        decompress_timeout_ticks: DEFAULT_DECOMPRESS_TIMEOUT_TICKS,
        max_decompressed_size: MAX_DECOMPRESSED_SIZE,
        auto_primary: BootTarget::Rtt,
        auto_fallback: BootTarget::Uboot,
        min_log_level: LogLevel::Info,
    };

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBootConfig`] on an unusable memory layout, a
    /// zero timeout, or an `Auto` target configured as its own primary or
    /// fallback.
    pub fn validate(&self) -> Result<()> {
        self.memory.validate()?;
        if self.decompress_timeout_ticks == 0 || self.max_decompressed_size == 0 {
            return Err(Error::InvalidBootConfig);
        }
        if self.auto_primary == BootTarget::Auto || self.auto_fallback == BootTarget::Auto {
            return Err(Error::InvalidBootConfig);
        }
        Ok(())
    }
}

impl Default for BootConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// USB burn engine configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BurnConfig {
    /// Size of one half of the streaming double buffer
    pub ep_buffer_size: usize,
    /// Bulk OUT max packet size of the current connection
    pub max_packet_size: usize,
    /// Minimum level recorded in the burn log
    pub min_log_level: LogLevel,
}

impl BurnConfig {
    /// High-speed defaults
    pub const DEFAULT: Self = Self {
        ep_buffer_size: BURN_EP_BUFFER_SIZE,
        max_packet_size: BURN_DEFAULT_MAX_PACKET,
        min_log_level: LogLevel::Info,
    };

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if the buffer is not a whole
    /// number of max-size packets.
    pub const fn validate(&self) -> Result<()> {
        if self.max_packet_size == 0
            || self.ep_buffer_size == 0
            || self.ep_buffer_size % self.max_packet_size != 0
        {
            return Err(Error::InvalidParameter);
        }
        Ok(())
    }
}

impl Default for BurnConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_addresses() {
        let layout = MemoryLayout::DEFAULT;
        // 128 MiB: load at 128 - 42.67 MiB, scratch one more third below
        assert_eq!(layout.encrypted_load_addr(), 0x0555_5556);
        assert_eq!(layout.decrypt_scratch_addr(), 0x02AA_AAAC);
        assert!(layout.decrypt_scratch_addr() < layout.encrypted_load_addr());
    }

    #[test]
    fn test_partition_lookup() {
        let table = PartitionTable::DEFAULT;
        assert_eq!(table.offset(MediumKind::SdCard, BootTarget::Rtt), Some(0x00A0_0000));
        assert_eq!(table.offset(MediumKind::Emmc, BootTarget::Uboot), Some(0x0020_0000));
        assert_eq!(table.offset(MediumKind::SpiNand, BootTarget::Linux), Some(0x00A0_0000));
        assert_eq!(table.offset(MediumKind::SpiNor, BootTarget::FaceDatabase), None);
        assert_eq!(table.offset(MediumKind::Otp, BootTarget::Rtt), None);
        assert_eq!(table.offset(MediumKind::Emmc, BootTarget::Auto), None);
    }

    #[test]
    fn test_partition_override() {
        let mut table = PartitionTable::DEFAULT;
        table.set(MediumKind::SpiNor, BootTarget::AiMode, Some(0x0100_0000)).unwrap();
        assert_eq!(table.offset(MediumKind::SpiNor, BootTarget::AiMode), Some(0x0100_0000));
        assert_eq!(
            table.set(MediumKind::Otp, BootTarget::AiMode, Some(0)),
            Err(Error::InvalidParameter)
        );
    }

    #[test]
    fn test_config_validation() {
        assert!(BootConfig::DEFAULT.validate().is_ok());
        let mut config = BootConfig::DEFAULT;
        config.auto_fallback = BootTarget::Auto;
        assert_eq!(config.validate(), Err(Error::InvalidBootConfig));
        assert!(BurnConfig::DEFAULT.validate().is_ok());
        let burn = BurnConfig { max_packet_size: 500, ..BurnConfig::DEFAULT };
        assert_eq!(burn.validate(), Err(Error::InvalidParameter));
    }
}
