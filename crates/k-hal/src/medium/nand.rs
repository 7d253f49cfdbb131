// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! SPI NAND flash medium
//!
//! Bad blocks are skipped, not remapped: data that would land in a bad
//! block moves to the next good erase block, so an image written at a
//! given offset reads back from the same offset as long as both sides
//! skip the same blocks.

use alloc::boxed::Box;
use alloc::vec;

use k_common::{MediumKind, Millis};

use super::{is_blank, MediumInfo, NandFlashDevice, StorageMedium};
use crate::error::{HalError, HalResult};

/// Operation timeout reported to the burn host
const NAND_TIMEOUT: Millis = Millis::new(5000);

/// SPI NAND flash medium
pub struct NandMedium {
    device: Box<dyn NandFlashDevice>,
}

impl NandMedium {
    /// Wrap a NAND flash device
    #[must_use]
    pub fn new(device: Box<dyn NandFlashDevice>) -> Self {
        Self { device }
    }

    fn geometry(&self) -> HalResult<(u64, u64)> {
        let erase_size = u64::from(self.device.erase_size());
        let page_size = u64::from(self.device.write_size());
        if erase_size == 0 || page_size == 0 || erase_size % page_size != 0 {
            return Err(HalError::HardwareFault);
        }
        Ok((erase_size, page_size))
    }

    fn check_range(&self, offset: u64, len: u64) -> HalResult<()> {
        match offset.checked_add(len) {
            Some(end) if end <= self.device.size() => Ok(()),
            _ => Err(HalError::OutOfRange),
        }
    }

    /// Advance `offset` past bad blocks when it sits on a block boundary
    fn skip_bad(&mut self, mut offset: u64, erase_size: u64) -> HalResult<u64> {
        while offset % erase_size == 0 && self.device.is_bad_block(offset) {
            offset += erase_size;
            if offset >= self.device.size() {
                return Err(HalError::BadBlocksExhausted);
            }
        }
        Ok(offset)
    }

    /// Erase and program `data` one erase block at a time
    fn program(&mut self, offset: u64, data: &[u8]) -> HalResult<()> {
        let (erase_size, page_size) = self.geometry()?;
        let size = self.device.size();

        let mut address = offset;
        #[allow(clippy::cast_possible_truncation)]
        for block in data.chunks(erase_size as usize) {
            address = self.skip_bad(address, erase_size)?;
            if address + erase_size > size {
                return Err(HalError::BadBlocksExhausted);
            }
            self.device.erase_block(address)?;

            let mut page_address = address;
            #[allow(clippy::cast_possible_truncation)]
            for page in block.chunks(page_size as usize) {
                if !is_blank(page) {
                    self.device.write_page(page_address, page)?;
                }
                page_address += page_size;
            }
            address += erase_size;
        }
        Ok(())
    }
}

impl StorageMedium for NandMedium {
    fn kind(&self) -> MediumKind {
        MediumKind::SpiNand
    }

    fn info(&mut self) -> HalResult<MediumInfo> {
        Ok(MediumInfo {
            capacity: self.device.size(),
            block_size: u64::from(self.device.write_size()),
            erase_size: u64::from(self.device.erase_size()),
            timeout: NAND_TIMEOUT,
            write_protect: false,
            kind: MediumKind::SpiNand,
            valid: true,
        })
    }

    fn read(&mut self, offset: u64, buffer: &mut [u8]) -> HalResult<()> {
        let (erase_size, page_size) = self.geometry()?;
        if offset % page_size != 0 {
            return Err(HalError::Unaligned);
        }
        self.check_range(offset, buffer.len() as u64)?;
        let size = self.device.size();

        #[allow(clippy::cast_possible_truncation)]
        let page_len = page_size as usize;
        let mut staging = vec![0u8; page_len];
        let mut address = offset;
        for chunk in buffer.chunks_mut(page_len) {
            address = self.skip_bad(address, erase_size)?;
            if address + page_size > size {
                return Err(HalError::BadBlocksExhausted);
            }
            if chunk.len() == page_len {
                self.device.read_page(address, chunk)?;
            } else {
                self.device.read_page(address, &mut staging)?;
                let len = chunk.len();
                chunk.copy_from_slice(&staging[..len]);
            }
            address += page_size;
        }
        Ok(())
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> HalResult<()> {
        let len = data.len() as u64;
        let (erase_size, _) = self.geometry()?;
        if offset % erase_size != 0 || len % erase_size != 0 {
            return Err(HalError::Unaligned);
        }
        self.check_range(offset, len)?;

        // Skipped bad blocks push the data past `offset + len`
        let span = self.device.size() - offset;
        match self.device.unlock(offset, span) {
            Ok(()) | Err(HalError::NotSupported) => {}
            Err(e) => return Err(e),
        }
        let result = self.program(offset, data);
        // Relock even when erase or programming failed
        let relock = self.device.lock(offset, span);
        result?;
        match relock {
            Ok(()) | Err(HalError::NotSupported) => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn erase(&mut self, offset: u64, len: u64) -> HalResult<()> {
        let (erase_size, _) = self.geometry()?;
        if offset % erase_size != 0 || len % erase_size != 0 {
            return Err(HalError::Unaligned);
        }
        self.check_range(offset, len)?;

        let mut address = offset;
        while address < offset + len {
            match self.device.erase_block(address) {
                Ok(()) | Err(HalError::BadBlock) => {}
                Err(e) => return Err(e),
            }
            address += erase_size;
        }
        Ok(())
    }
}
