// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SPI NOR flash medium

use alloc::boxed::Box;

use k_common::{MediumKind, Millis};

use super::{is_blank, MediumInfo, NorFlashDevice, StorageMedium};
use crate::error::{HalError, HalResult};

/// Operation timeout reported to the burn host
const NOR_TIMEOUT: Millis = Millis::new(5000);

/// Program granularity of a write
const NOR_PROGRAM_CHUNK: usize = 4096;

/// SPI NOR flash medium
pub struct NorMedium {
    device: Box<dyn NorFlashDevice>,
}

impl NorMedium {
    /// Wrap a NOR flash device
    #[must_use]
    pub fn new(device: Box<dyn NorFlashDevice>) -> Self {
        Self { device }
    }

    fn check_erase_aligned(&self, offset: u64, len: u64) -> HalResult<()> {
        let erase_size = u64::from(self.device.erase_size());
        if erase_size == 0 {
            return Err(HalError::HardwareFault);
        }
        if offset % erase_size != 0 || len % erase_size != 0 {
            return Err(HalError::Unaligned);
        }
        self.check_range(offset, len)
    }

    fn check_range(&self, offset: u64, len: u64) -> HalResult<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.device.size() => Ok(()),
            _ => Err(HalError::OutOfRange),
        }
    }
}

impl StorageMedium for NorMedium {
    fn kind(&self) -> MediumKind {
        MediumKind::SpiNor
    }

    fn info(&mut self) -> HalResult<MediumInfo> {
        Ok(MediumInfo {
            capacity: self.device.size(),
            block_size: u64::from(self.device.page_size()),
            erase_size: u64::from(self.device.erase_size()),
            timeout: NOR_TIMEOUT,
            write_protect: false,
            kind: MediumKind::SpiNor,
            valid: true,
        })
    }

    fn read(&mut self, offset: u64, buffer: &mut [u8]) -> HalResult<()> {
        self.check_range(offset, buffer.len() as u64)?;
        self.device.read(offset, buffer)
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> HalResult<()> {
        let len = data.len() as u64;
        self.check_erase_aligned(offset, len)?;
        self.device.erase(offset, len)?;

        let mut address = offset;
        for chunk in data.chunks(NOR_PROGRAM_CHUNK) {
            // Erased flash already reads back as 0xFF
            if !is_blank(chunk) {
                self.device.write(address, chunk)?;
            }
            address += chunk.len() as u64;
        }
        Ok(())
    }

    fn erase(&mut self, offset: u64, len: u64) -> HalResult<()> {
        self.check_erase_aligned(offset, len)?;
        self.device.erase(offset, len)
    }
}
