// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! DMA descriptor pool
//!
//! Descriptor chains live for a single hardware operation and are freed
//! together, so a bump pool that rewinds once every allocation has been
//! returned is enough.

use k_common::constants::CACHE_LINE_SIZE;

use crate::error::{HalError, HalResult};
use crate::traits::DmaAllocator;

/// Bump allocator over a fixed window below 4 GiB
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DmaPool {
    base: u32,
    size: u32,
    next: u32,
    outstanding: usize,
}

impl DmaPool {
    /// Create a pool over `[base, base + size)`
    #[must_use]
    pub const fn new(base: u32, size: u32) -> Self {
        Self {
            base,
            size,
            next: 0,
            outstanding: 0,
        }
    }

    /// Pool start address
    #[must_use]
    pub const fn base(&self) -> u32 {
        self.base
    }

    /// Pool size in bytes
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Number of allocations not yet freed
    #[must_use]
    pub const fn outstanding(&self) -> usize {
        self.outstanding
    }

    /// Bytes handed out since the pool last rewound
    #[must_use]
    pub const fn used(&self) -> u32 {
        self.next
    }
}

impl DmaAllocator for DmaPool {
    fn dma_alloc(&mut self, len: usize) -> HalResult<u32> {
        let len = u32::try_from(len).map_err(|_| HalError::OutOfMemory)?;
        #[allow(clippy::cast_possible_truncation)]
        let align = CACHE_LINE_SIZE as u32;
        let start = self.next.div_ceil(align) * align;
        let end = start.checked_add(len).ok_or(HalError::OutOfMemory)?;
        if len == 0 || end > self.size {
            return Err(HalError::OutOfMemory);
        }
        self.next = end;
        self.outstanding += 1;
        Ok(self.base + start)
    }

    fn dma_free(&mut self, addr: u32, _len: usize) {
        if addr < self.base || addr >= self.base + self.size || self.outstanding == 0 {
            return;
        }
        self.outstanding -= 1;
        if self.outstanding == 0 {
            self.next = 0;
        }
    }
}
