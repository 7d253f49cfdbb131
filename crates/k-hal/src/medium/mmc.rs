// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! eMMC / SD card medium

use alloc::boxed::Box;
use alloc::vec;

use k_common::{MediumKind, Millis};

use super::{BlockDevice, MediumInfo, StorageMedium};
use crate::error::{HalError, HalResult};

/// Operation timeout reported to the burn host
const MMC_TIMEOUT: Millis = Millis::new(1000);

/// Block-addressed medium on an MMC controller
pub struct MmcMedium {
    kind: MediumKind,
    device: Box<dyn BlockDevice>,
}

impl MmcMedium {
    /// Wrap a block device reported as `kind`
    #[must_use]
    pub fn new(kind: MediumKind, device: Box<dyn BlockDevice>) -> Self {
        Self { kind, device }
    }

    fn block_size(&self) -> u64 {
        u64::from(self.device.block_size())
    }

    /// Translate a byte range into `(first block, block count)`
    ///
    /// `offset` must sit on a block boundary; `len` is rounded up.
    fn block_range(&self, offset: u64, len: u64) -> HalResult<(u64, u64)> {
        let block_size = self.block_size();
        if block_size == 0 {
            return Err(HalError::HardwareFault);
        }
        if offset % block_size != 0 {
            return Err(HalError::Unaligned);
        }
        let start = offset / block_size;
        let count = len.div_ceil(block_size);
        match start.checked_add(count) {
            Some(end) if end <= self.device.block_count() => Ok((start, count)),
            _ => Err(HalError::OutOfRange),
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn whole_len(&self, len: usize) -> usize {
        let block_size = self.block_size() as usize;
        len.div_ceil(block_size) * block_size
    }
}

impl StorageMedium for MmcMedium {
    fn kind(&self) -> MediumKind {
        self.kind
    }

    fn info(&mut self) -> HalResult<MediumInfo> {
        let block_size = self.block_size();
        Ok(MediumInfo {
            capacity: self.device.block_count() * block_size,
            block_size,
            erase_size: u64::from(self.device.erase_group_blocks()) * block_size,
            timeout: MMC_TIMEOUT,
            write_protect: self.device.is_write_protected(),
            kind: self.kind,
            valid: true,
        })
    }

    fn read(&mut self, offset: u64, buffer: &mut [u8]) -> HalResult<()> {
        let (start, count) = self.block_range(offset, buffer.len() as u64)?;
        let whole = self.whole_len(buffer.len());

        let moved = if whole == buffer.len() {
            self.device.read_blocks(start, buffer)?
        } else {
            let mut staging = vec![0u8; whole];
            let moved = self.device.read_blocks(start, &mut staging)?;
            let len = buffer.len();
            buffer.copy_from_slice(&staging[..len]);
            moved
        };

        if moved != count {
            return Err(HalError::ReadFailed);
        }
        Ok(())
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> HalResult<()> {
        if self.device.is_write_protected() {
            return Err(HalError::WriteProtected);
        }
        let (start, count) = self.block_range(offset, data.len() as u64)?;
        let whole = self.whole_len(data.len());

        let moved = if whole == data.len() {
            self.device.write_blocks(start, data)?
        } else {
            // Partial tail block goes out zero padded
            let mut staging = vec![0u8; whole];
            staging[..data.len()].copy_from_slice(data);
            self.device.write_blocks(start, &staging)?
        };

        if moved != count {
            return Err(HalError::WriteFailed);
        }
        Ok(())
    }

    fn erase(&mut self, offset: u64, len: u64) -> HalResult<()> {
        if self.device.is_write_protected() {
            return Err(HalError::WriteProtected);
        }
        let (start, count) = self.block_range(offset, len)?;
        if self.device.erase_blocks(start, count)? != count {
            return Err(HalError::EraseFailed);
        }
        Ok(())
    }
}
