// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL trait definitions
//!
//! This module defines the platform-agnostic interfaces the boot pipeline
//! runs against. The K230 backend implements them over MMIO and RISC-V
//! instructions; the simulation backend in `k-testing` implements them over
//! host memory.

use crate::error::{HalError, HalResult};
use k_common::Ticks;

// =============================================================================
// Registers
// =============================================================================

/// 32-bit memory-mapped register access
pub trait RegisterInterface {
    /// Read a 32-bit register
    fn read32(&mut self, addr: u64) -> u32;

    /// Write a 32-bit register
    fn write32(&mut self, addr: u64, value: u32);

    /// Read-modify-write: set `bits`
    fn set_bits32(&mut self, addr: u64, bits: u32) {
        let value = self.read32(addr);
        self.write32(addr, value | bits);
    }

    /// Spin until any bit of `mask` reads as set
    ///
    /// # Notes
    /// There is no deadline. Only use this for handshakes the hardware
    /// always completes.
    fn wait_set32(&mut self, addr: u64, mask: u32) {
        while self.read32(addr) & mask == 0 {
            core::hint::spin_loop();
        }
    }

    /// Spin until every bit of `mask` reads as clear
    fn wait_clear32(&mut self, addr: u64, mask: u32) {
        while self.read32(addr) & mask != 0 {
            core::hint::spin_loop();
        }
    }
}

// =============================================================================
// Memory
// =============================================================================

/// Physical memory window access
///
/// Addresses are physical. An access that is not fully backed by memory
/// fails with [`HalError::MemoryAccessViolation`].
pub trait MemoryInterface {
    /// Borrow `len` bytes at `addr`
    fn region(&self, addr: u64, len: usize) -> HalResult<&[u8]>;

    /// Mutably borrow `len` bytes at `addr`
    fn region_mut(&mut self, addr: u64, len: usize) -> HalResult<&mut [u8]>;

    /// Borrow a source and a destination region at once
    ///
    /// The two regions must not overlap.
    fn split_regions(
        &mut self,
        src: (u64, usize),
        dst: (u64, usize),
    ) -> HalResult<(&[u8], &mut [u8])>;

    /// Copy memory out into `buffer`
    fn read(&self, addr: u64, buffer: &mut [u8]) -> HalResult<()> {
        buffer.copy_from_slice(self.region(addr, buffer.len())?);
        Ok(())
    }

    /// Copy `data` into memory
    fn write(&mut self, addr: u64, data: &[u8]) -> HalResult<()> {
        self.region_mut(addr, data.len())?.copy_from_slice(data);
        Ok(())
    }

    /// Move `len` bytes from `src` to `dst`; the ranges may overlap
    fn copy_within(&mut self, src: u64, dst: u64, len: usize) -> HalResult<()>;
}

/// Check that `(a, a_len)` and `(b, b_len)` do not overlap
///
/// # Errors
///
/// Returns [`HalError::MemoryAccessViolation`] on overlap or on an address
/// range that wraps.
pub fn check_disjoint(a: u64, a_len: usize, b: u64, b_len: usize) -> HalResult<()> {
    if a_len == 0 || b_len == 0 {
        return Ok(());
    }
    let a_end = a
        .checked_add(a_len as u64)
        .ok_or(HalError::MemoryAccessViolation)?;
    let b_end = b
        .checked_add(b_len as u64)
        .ok_or(HalError::MemoryAccessViolation)?;
    if a < b_end && b < a_end {
        return Err(HalError::MemoryAccessViolation);
    }
    Ok(())
}

// =============================================================================
// Cache
// =============================================================================

/// Data cache maintenance
pub trait CacheInterface {
    /// Write back dirty lines covering the range
    fn flush_dcache_range(&mut self, addr: u64, len: usize);

    /// Discard lines covering the range
    fn invalidate_dcache_range(&mut self, addr: u64, len: usize);

    /// Flush everything and turn instruction and data caches off
    fn disable_caches(&mut self);
}

// =============================================================================
// Timer
// =============================================================================

/// Monotonic tick source
pub trait TimerInterface {
    /// Timer resolution in Hz
    const FREQUENCY_HZ: u32;

    /// Get current tick count
    fn get_ticks(&self) -> u64;

    /// Current time as [`Ticks`]
    fn now(&self) -> Ticks {
        Ticks::new(self.get_ticks())
    }

    /// Get elapsed milliseconds since boot
    fn get_millis(&self) -> u64 {
        (self.get_ticks() * 1_000) / u64::from(Self::FREQUENCY_HZ)
    }
}

// =============================================================================
// DMA memory
// =============================================================================

/// Allocator for memory the DMA engines can address
///
/// The decompressor's descriptors carry 32-bit addresses, so every
/// allocation must lie below 4 GiB.
pub trait DmaAllocator {
    /// Allocate `len` bytes aligned to a cache line
    fn dma_alloc(&mut self, len: usize) -> HalResult<u32>;

    /// Release an allocation made by [`DmaAllocator::dma_alloc`]
    fn dma_free(&mut self, addr: u32, len: usize);
}

// =============================================================================
// Fuses
// =============================================================================

/// Public key families with a digest burnt into fuses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PukKind {
    /// RSA-2048 key (international suite)
    Rsa,
    /// SM2 key (Chinese national suite)
    Sm2,
}

/// One-time programmable fuse reads
pub trait FuseInterface {
    /// Read the 32-byte digest of the trusted public key of `kind`
    ///
    /// An all-zero digest means no key was provisioned.
    fn read_puk_digest(&mut self, kind: PukKind) -> HalResult<[u8; 32]>;

    /// Whether the fuses forbid booting unauthenticated images
    fn unauthenticated_boot_forbidden(&mut self) -> HalResult<bool>;
}

// =============================================================================
// Cores
// =============================================================================

/// Control of the executing hart
pub trait CoreControl {
    /// Synchronize instruction fetch with prior data writes
    fn core_sync(&mut self);

    /// Transfer control to `entry` with `a0 = hart` and `a1 = dtb`
    fn jump(&mut self, entry: u64, hart: u64, dtb: u64) -> !;
}

// =============================================================================
// USB
// =============================================================================

/// Device-to-host bulk endpoint of the burn interface
pub trait BulkInEndpoint {
    /// Queue one transfer, replacing any transfer still pending
    fn send(&mut self, data: &[u8]) -> HalResult<()>;
}

/// Everything the loader needs from the SoC
pub trait Soc:
    RegisterInterface + MemoryInterface + CacheInterface + TimerInterface + DmaAllocator
{
}

impl<T> Soc for T where
    T: RegisterInterface + MemoryInterface + CacheInterface + TimerInterface + DmaAllocator
{
}
