// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Boot orchestration
//!
//! A boot attempt runs through fixed stages:
//!
//! ```text
//! SelectTarget -> LocateOnMedium -> ValidateHeader -> Authenticate
//!              -> Decompress -> Transfer
//! ```
//!
//! The container is read into the top third of DRAM, authenticated into
//! the middle third, and the uImage it carries is copied or inflated to
//! its own load address. U-Boot continues on this core and never returns;
//! RT-Smart is handed to the big core and the loader returns.
//!
//! Every failure is tagged with the stage it happened in and recorded in
//! the loader's log.

use core::fmt;

use heapless::String;
use k_common::constants::{BOOT_BLOCK_SIZE, FIRMWARE_HEADER_SIZE, UIMAGE_PLAINTEXT_OFFSET};
use k_common::{
    log_debug, log_error, log_info, log_warn, BootConfig, BootMedium, BootTarget, Error,
    LogBuffer, Result,
};
use k_crypto::SecurityEngine;
use k_hal::{probe, CoreControl, FuseInterface, MediumProvider, RegisterInterface, Soc};

use crate::decompress::inflate;
use crate::header::FirmwareHeader;
use crate::uimage::{ImageCompression, UImageHeader};
use crate::verify::{authenticate, Plaintext, Scratch};

// =============================================================================
// Platform registers
// =============================================================================

/// Big-core reset vector
pub const BIG_CORE_RESET_VECTOR: u64 = 0x9110_2104;
/// Big-core reset control
pub const BIG_CORE_RESET_CTL: u64 = 0x9110_100C;
/// Boot strap status; the low two bits carry the boot ROM's medium code
pub const BOOT_STRAP: u64 = 0x9110_2040;

const BIG_CORE_RESET_ENABLE: u32 = 0x1000_1000;
const BIG_CORE_RESET_ASSERT: u32 = 0x0001_0001;
const BIG_CORE_RESET_RELEASE: u32 = 0x0001_0000;
const BOOT_STRAP_MEDIUM_MASK: u32 = 0x3;

const LOG_MODULE: &str = "boot";

/// Image name continued on this core
pub const IMAGE_UBOOT: &str = "uboot";
/// Image name released to the big core
pub const IMAGE_RTT: &str = "rtt";

// =============================================================================
// Stages and failures
// =============================================================================

/// Boot pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum BootStage {
    /// Medium and partition resolution
    SelectTarget = 0,
    /// Reading the container from the medium
    LocateOnMedium = 1,
    /// Header checks
    ValidateHeader = 2,
    /// Signature check and decryption
    Authenticate = 3,
    /// uImage copy or inflate
    Decompress = 4,
    /// Hand-off
    Transfer = 5,
}

impl BootStage {
    /// Stage name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SelectTarget => "select",
            Self::LocateOnMedium => "locate",
            Self::ValidateHeader => "header",
            Self::Authenticate => "verify",
            Self::Decompress => "decompress",
            Self::Transfer => "transfer",
        }
    }
}

/// A failed boot attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BootFailure {
    /// Stage the attempt stopped in
    pub stage: BootStage,
    /// Cause
    pub error: Error,
}

impl BootFailure {
    /// Non-zero status for the command layer
    #[must_use]
    pub fn status_code(&self) -> i32 {
        i32::from(self.error.code())
    }
}

impl fmt::Display for BootFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.stage.name(), self.error)
    }
}

fn fail<E: Into<Error>>(stage: BootStage) -> impl FnOnce(E) -> BootFailure {
    move |e| BootFailure {
        stage,
        error: e.into(),
    }
}

/// Console request: where to boot from and what
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootCommand {
    /// Medium selector
    pub medium: BootMedium,
    /// Target selector
    pub target: BootTarget,
}

impl BootCommand {
    /// Parse console words, e.g. `("sdio1", "rtt")`
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidParameter`] if either word is unknown.
    pub fn parse(medium: &str, target: &str) -> Result<Self> {
        Ok(Self {
            medium: BootMedium::from_name(medium)?,
            target: BootTarget::from_name(target)?,
        })
    }
}

/// An image released to the big core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootOutcome {
    /// Target that booted
    pub target: BootTarget,
    /// uImage name
    pub image: String<32>,
    /// Address the big core starts at
    pub entry: u64,
}

/// Start the big core at `entry`
pub fn release_big_core<R: RegisterInterface + ?Sized>(regs: &mut R, entry: u32) {
    regs.write32(BIG_CORE_RESET_VECTOR, entry);
    regs.write32(BIG_CORE_RESET_CTL, BIG_CORE_RESET_ENABLE);
    regs.write32(BIG_CORE_RESET_CTL, BIG_CORE_RESET_ASSERT);
    regs.write32(BIG_CORE_RESET_CTL, BIG_CORE_RESET_RELEASE);
}

fn round_up(len: usize, block: usize) -> usize {
    len.div_ceil(block) * block
}

// =============================================================================
// Loader
// =============================================================================

/// Boot loader context
pub struct BootLoader<S, F, E, P> {
    config: BootConfig,
    soc: S,
    fuses: F,
    engine: E,
    provider: P,
    log: LogBuffer,
}

impl<S, F, E, P> BootLoader<S, F, E, P>
where
    S: Soc + CoreControl,
    F: FuseInterface,
    E: SecurityEngine,
    P: MediumProvider,
{
    /// Create a loader
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidBootConfig`] if `config` does not validate.
    pub fn new(config: BootConfig, soc: S, fuses: F, engine: E, provider: P) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            soc,
            fuses,
            engine,
            provider,
            log: LogBuffer::with_min_level(config.min_log_level),
        })
    }

    /// Active configuration
    #[must_use]
    pub const fn config(&self) -> &BootConfig {
        &self.config
    }

    /// Boot log
    #[must_use]
    pub const fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// Platform
    #[must_use]
    pub const fn soc(&self) -> &S {
        &self.soc
    }

    /// Platform, mutably
    pub fn soc_mut(&mut self) -> &mut S {
        &mut self.soc
    }

    /// Medium provider
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Run a console command and return its status: 0 on success
    pub fn run(&mut self, command: BootCommand) -> i32 {
        match self.boot(command) {
            Ok(_) => 0,
            Err(failure) => failure.status_code(),
        }
    }

    /// Boot `command.target` from `command.medium`
    ///
    /// `Auto` tries the configured primary target, then the fallback once.
    /// Booting U-Boot does not return.
    ///
    /// # Errors
    ///
    /// Returns the failure of the (last) attempt.
    pub fn boot(&mut self, command: BootCommand) -> core::result::Result<BootOutcome, BootFailure> {
        if command.target != BootTarget::Auto {
            return self.boot_target(command.medium, command.target);
        }

        let primary = self.config.auto_primary;
        let fallback = self.config.auto_fallback;
        match self.boot_target(command.medium, primary) {
            Ok(outcome) => Ok(outcome),
            Err(failure) => {
                let ts = self.soc.get_millis();
                log_warn!(
                    self.log,
                    ts,
                    LOG_MODULE,
                    "{} failed ({}), falling back to {}",
                    primary,
                    failure,
                    fallback
                );
                self.boot_target(command.medium, fallback)
            }
        }
    }

    fn boot_target(
        &mut self,
        medium: BootMedium,
        target: BootTarget,
    ) -> core::result::Result<BootOutcome, BootFailure> {
        let result = self.attempt(medium, target);
        if let Err(failure) = &result {
            let ts = self.soc.get_millis();
            log_error!(self.log, ts, LOG_MODULE, "boot {} from {}: {}", target, medium, failure);
        }
        result
    }

    fn attempt(
        &mut self,
        medium: BootMedium,
        target: BootTarget,
    ) -> core::result::Result<BootOutcome, BootFailure> {
        let medium = self.resolve_medium(medium)?;
        let ts = self.soc.get_millis();
        log_info!(self.log, ts, LOG_MODULE, "boot {} from {}", target, medium);

        if medium != BootMedium::Memory {
            self.locate(medium, target)?;
        }
        let header = self.validate_header()?;
        let plaintext = self.authenticate()?;
        let ts = self.soc.get_millis();
        log_info!(
            self.log,
            ts,
            "verify",
            "{} container, {} byte payload",
            plaintext.crypto.name(),
            header.length
        );

        let image = self.unpack(plaintext)?;
        self.transfer(target, &image)
    }

    fn resolve_medium(&mut self, medium: BootMedium) -> core::result::Result<BootMedium, BootFailure> {
        if medium != BootMedium::Auto {
            return Ok(medium);
        }
        let code = self.soc.read32(BOOT_STRAP) & BOOT_STRAP_MEDIUM_MASK;
        let resolved = BootMedium::from_rom_code(code)
            .ok_or(Error::InvalidBootConfig)
            .map_err(fail(BootStage::SelectTarget))?;
        let ts = self.soc.get_millis();
        log_debug!(self.log, ts, LOG_MODULE, "strap selects {}", resolved);
        Ok(resolved)
    }

    /// Read the container of `target` into the encrypted load region
    fn locate(&mut self, medium: BootMedium, target: BootTarget) -> core::result::Result<(), BootFailure> {
        let kind = medium.medium_kind();
        let offset = self
            .config
            .partitions
            .offset(kind, target)
            .ok_or(Error::NoSuchPartition)
            .map_err(fail(BootStage::SelectTarget))?;

        let stage = BootStage::LocateOnMedium;
        let mut device = probe(&mut self.provider, kind, 0).map_err(fail(stage))?;
        let info = device.info().map_err(fail(stage))?;
        let block = usize::try_from(info.block_size)
            .ok()
            .filter(|&b| b > 0)
            .unwrap_or(BOOT_BLOCK_SIZE);

        let load = self.config.memory.encrypted_load_addr();
        let capacity = usize::try_from(self.config.memory.load_capacity()).unwrap_or(usize::MAX);
        let header_bytes = round_up(FIRMWARE_HEADER_SIZE, block);
        if header_bytes > capacity {
            return Err(fail(stage)(Error::BufferTooSmall));
        }

        let region = self.soc.region_mut(load, header_bytes).map_err(fail(stage))?;
        device.read(offset, region).map_err(fail(stage))?;
        let header = FirmwareHeader::parse(self.soc.region(load, FIRMWARE_HEADER_SIZE).map_err(fail(stage))?)
            .map_err(fail(stage))?;

        let total = round_up(header.total_len(), block);
        if total > capacity {
            return Err(fail(stage)(Error::TruncatedImage));
        }
        if total > header_bytes {
            let region = self
                .soc
                .region_mut(load + header_bytes as u64, total - header_bytes)
                .map_err(fail(stage))?;
            device
                .read(offset + header_bytes as u64, region)
                .map_err(fail(stage))?;
        }

        let ts = self.soc.get_millis();
        log_debug!(
            self.log,
            ts,
            "medium",
            "read {} bytes at {:#x} from {}",
            total,
            offset,
            kind
        );
        Ok(())
    }

    fn validate_header(&mut self) -> core::result::Result<FirmwareHeader, BootFailure> {
        let stage = BootStage::ValidateHeader;
        let load = self.config.memory.encrypted_load_addr();
        let header = FirmwareHeader::parse(self.soc.region(load, FIRMWARE_HEADER_SIZE).map_err(fail(stage))?)
            .map_err(fail(stage))?;
        header.crypto().map_err(fail(stage))?;
        if header.total_len() as u64 > self.config.memory.load_capacity() {
            return Err(fail(stage)(Error::TruncatedImage));
        }
        Ok(header)
    }

    fn authenticate(&mut self) -> core::result::Result<Plaintext, BootFailure> {
        let memory = &self.config.memory;
        let scratch = Scratch {
            addr: memory.decrypt_scratch_addr(),
            capacity: usize::try_from(memory.scratch_capacity()).unwrap_or(usize::MAX),
        };
        authenticate(
            &mut self.soc,
            &mut self.fuses,
            &mut self.engine,
            memory.encrypted_load_addr(),
            scratch,
        )
        .map_err(fail(BootStage::Authenticate))
    }

    /// Copy or inflate the uImage payload to its load address
    fn unpack(&mut self, plaintext: Plaintext) -> core::result::Result<UImageHeader, BootFailure> {
        let stage = BootStage::Decompress;
        let image_addr = plaintext.addr + UIMAGE_PLAINTEXT_OFFSET as u64;
        let available = plaintext
            .len
            .checked_sub(UIMAGE_PLAINTEXT_OFFSET + UImageHeader::SIZE)
            .ok_or(Error::TruncatedImage)
            .map_err(fail(stage))?;

        let header = UImageHeader::parse(self.soc.region(image_addr, UImageHeader::SIZE).map_err(fail(stage))?)
            .map_err(fail(stage))?;
        let compression = header.compression().map_err(fail(stage))?;
        let data_addr = image_addr + UImageHeader::SIZE as u64;
        let (offset, len) = header
            .payload(self.soc.region(data_addr, available).map_err(fail(stage))?)
            .map_err(fail(stage))?;
        let src = data_addr + offset as u64;
        let load = u64::from(header.load);

        let written = match compression {
            ImageCompression::None => {
                self.soc.copy_within(src, load, len).map_err(fail(stage))?;
                len
            }
            ImageCompression::Gzip => {
                let dram_end = self.config.memory.base + self.config.memory.size;
                let room = usize::try_from(dram_end.saturating_sub(load)).unwrap_or(usize::MAX);
                let capacity = self.config.max_decompressed_size.min(room);
                inflate(
                    &mut self.soc,
                    src,
                    len,
                    load,
                    capacity,
                    self.config.decompress_timeout_ticks,
                )
                .map_err(fail(stage))?
            }
        };
        self.soc.flush_dcache_range(load, written);

        let ts = self.soc.get_millis();
        log_info!(
            self.log,
            ts,
            "gunzip",
            "{} {} bytes to {:#x}",
            header.name(),
            written,
            load
        );
        Ok(header)
    }

    fn transfer(
        &mut self,
        target: BootTarget,
        header: &UImageHeader,
    ) -> core::result::Result<BootOutcome, BootFailure> {
        let stage = BootStage::Transfer;
        let ts = self.soc.get_millis();
        match header.name() {
            IMAGE_RTT => {
                let mut image = String::new();
                image.push_str(IMAGE_RTT).map_err(|()| fail(stage)(Error::InternalError))?;
                release_big_core(&mut self.soc, header.load);
                log_info!(self.log, ts, LOG_MODULE, "big core released at {:#x}", header.load);
                Ok(BootOutcome {
                    target,
                    image,
                    entry: u64::from(header.load),
                })
            }
            IMAGE_UBOOT => {
                log_info!(self.log, ts, LOG_MODULE, "jump to {:#x}", header.load);
                self.soc.disable_caches();
                self.soc.core_sync();
                self.soc.jump(u64::from(header.load), 0, 0)
            }
            _ => Err(fail(stage)(Error::UnsupportedImage)),
        }
    }
}
