// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Shared enumerations
//!
//! Medium kinds as seen by the USB burn host, boot media as reported by the
//! boot ROM, and the logical boot targets of the loader.

use core::fmt;

use crate::errors::Error;

/// Storage technology of a medium, with its USB burn wire value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MediumKind {
    /// No medium
    None = 0x00,
    /// On-board eMMC (MMC controller 0)
    Emmc = 0x01,
    /// SD card (MMC controller 1)
    SdCard = 0x02,
    /// SPI NAND flash
    SpiNand = 0x03,
    /// SPI NOR flash
    SpiNor = 0x04,
    /// One-time programmable fuses
    Otp = 0x05,
}

impl MediumKind {
    /// Decode a wire value
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0x00 => Some(Self::None),
            0x01 => Some(Self::Emmc),
            0x02 => Some(Self::SdCard),
            0x03 => Some(Self::SpiNand),
            0x04 => Some(Self::SpiNor),
            0x05 => Some(Self::Otp),
            _ => None,
        }
    }

    /// Block-addressed MMC/SD medium
    #[must_use]
    pub const fn is_block_device(&self) -> bool {
        matches!(self, Self::Emmc | Self::SdCard)
    }

    /// Short name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Emmc => "emmc",
            Self::SdCard => "sd",
            Self::SpiNand => "spinand",
            Self::SpiNor => "spinor",
            Self::Otp => "otp",
        }
    }
}

impl fmt::Display for MediumKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Medium the loader reads boot images from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootMedium {
    /// SPI NOR flash
    NorFlash,
    /// SPI NAND flash
    NandFlash,
    /// SDIO controller 0 (eMMC)
    Sdio0,
    /// SDIO controller 1 (SD card)
    Sdio1,
    /// Image already resident at the encrypted load address
    Memory,
    /// Whatever medium the SoC booted from
    Auto,
}

impl BootMedium {
    /// Decode the boot ROM's medium code (0 NOR, 1 NAND, 2 SDIO0, 3 SDIO1)
    #[must_use]
    pub const fn from_rom_code(code: u32) -> Option<Self> {
        match code {
            0 => Some(Self::NorFlash),
            1 => Some(Self::NandFlash),
            2 => Some(Self::Sdio0),
            3 => Some(Self::Sdio1),
            _ => None,
        }
    }

    /// Storage technology backing this boot medium
    #[must_use]
    pub const fn medium_kind(&self) -> MediumKind {
        match self {
            Self::NorFlash => MediumKind::SpiNor,
            Self::NandFlash => MediumKind::SpiNand,
            Self::Sdio0 => MediumKind::Emmc,
            Self::Sdio1 => MediumKind::SdCard,
            Self::Memory | Self::Auto => MediumKind::None,
        }
    }

    /// Parse a console selector (`mem|sdio0|sdio1|spinor|spinand|auto`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for unknown words.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "mem" => Ok(Self::Memory),
            "sdio0" => Ok(Self::Sdio0),
            "sdio1" => Ok(Self::Sdio1),
            "spinor" => Ok(Self::NorFlash),
            "spinand" => Ok(Self::NandFlash),
            "auto" => Ok(Self::Auto),
            _ => Err(Error::InvalidParameter),
        }
    }

    /// Console name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::NorFlash => "spinor",
            Self::NandFlash => "spinand",
            Self::Sdio0 => "sdio0",
            Self::Sdio1 => "sdio1",
            Self::Memory => "mem",
            Self::Auto => "auto",
        }
    }
}

impl fmt::Display for BootMedium {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Logical payload the loader is asked to boot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BootTarget {
    /// Linux system image
    Linux,
    /// RT-Smart system image (big core)
    Rtt,
    /// Quick-boot configuration blob
    QuickBootConfig,
    /// Face database blob
    FaceDatabase,
    /// Sensor configuration blob
    SensorConfig,
    /// AI model blob
    AiMode,
    /// Speckle pattern blob
    Speckle,
    /// RT application blob
    RtApp,
    /// Second-stage U-Boot
    Uboot,
    /// Primary target with a single fallback
    Auto,
}

impl BootTarget {
    /// Every concrete (non-`Auto`) target
    pub const ALL: [Self; 9] = [
        Self::Linux,
        Self::Rtt,
        Self::QuickBootConfig,
        Self::FaceDatabase,
        Self::SensorConfig,
        Self::AiMode,
        Self::Speckle,
        Self::RtApp,
        Self::Uboot,
    ];

    /// Parse a console selector
    /// (`rtt|linux|qbc|fdb|sensor|ai|speckle|rtapp|uboot|auto_boot`)
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] for unknown words.
    pub fn from_name(name: &str) -> Result<Self, Error> {
        match name {
            "linux" => Ok(Self::Linux),
            "rtt" => Ok(Self::Rtt),
            "qbc" => Ok(Self::QuickBootConfig),
            "fdb" => Ok(Self::FaceDatabase),
            "sensor" => Ok(Self::SensorConfig),
            "ai" => Ok(Self::AiMode),
            "speckle" => Ok(Self::Speckle),
            "rtapp" => Ok(Self::RtApp),
            "uboot" => Ok(Self::Uboot),
            "auto_boot" => Ok(Self::Auto),
            _ => Err(Error::InvalidParameter),
        }
    }

    /// Console name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Rtt => "rtt",
            Self::QuickBootConfig => "qbc",
            Self::FaceDatabase => "fdb",
            Self::SensorConfig => "sensor",
            Self::AiMode => "ai",
            Self::Speckle => "speckle",
            Self::RtApp => "rtapp",
            Self::Uboot => "uboot",
            Self::Auto => "auto_boot",
        }
    }
}

impl fmt::Display for BootTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
