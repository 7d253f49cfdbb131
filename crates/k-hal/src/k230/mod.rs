// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! K230 Hardware Abstraction Layer
//!
//! Backend for the little core (T-Head C908, RV64) of the Kendryte K230.
//! Registers and memory are accessed directly through their physical
//! addresses; the loader runs in M-mode with an identity mapping.
//!
//! # Cache maintenance
//!
//! The C908 exposes its cache operations as vendor instructions which the
//! assembler does not know, so they are emitted as raw words.

mod cache;
mod otp;

pub use otp::{OtpLayout, OtpReader};

use crate::dma::DmaPool;
use crate::error::{HalError, HalResult};
use crate::traits::{
    check_disjoint, CacheInterface, CoreControl, DmaAllocator, MemoryInterface,
    RegisterInterface, TimerInterface,
};

/// Timebase of the `time` CSR
pub const K230_TIMER_FREQUENCY_HZ: u32 = 27_000_000;

/// K230 HAL instance
pub struct K230Soc {
    dram_base: u64,
    dram_size: usize,
    dma: DmaPool,
}

impl K230Soc {
    /// Create a HAL over the DRAM window `[dram_base, dram_base + dram_size)`
    ///
    /// `dma` must lie inside the DRAM window and outside every region the
    /// loader stages images in.
    ///
    /// # Safety
    ///
    /// The caller guarantees that the window is real memory not used by
    /// anything else for the lifetime of the returned value.
    #[must_use]
    pub const unsafe fn new(dram_base: u64, dram_size: usize, dma: DmaPool) -> Self {
        Self {
            dram_base,
            dram_size,
            dma,
        }
    }

    fn check_window(&self, addr: u64, len: usize) -> HalResult<usize> {
        let offset = addr
            .checked_sub(self.dram_base)
            .ok_or(HalError::MemoryAccessViolation)?;
        let offset = usize::try_from(offset).map_err(|_| HalError::MemoryAccessViolation)?;
        match offset.checked_add(len) {
            Some(end) if end <= self.dram_size => Ok(offset),
            _ => Err(HalError::MemoryAccessViolation),
        }
    }
}

impl RegisterInterface for K230Soc {
    fn read32(&mut self, addr: u64) -> u32 {
        // SAFETY: Register addresses come from the fixed K230 memory map and
        // are 4-byte aligned. Volatile access is required for MMIO.
        unsafe { core::ptr::read_volatile(addr as usize as *const u32) }
    }

    fn write32(&mut self, addr: u64, value: u32) {
        // SAFETY: See `read32`.
        unsafe { core::ptr::write_volatile(addr as usize as *mut u32, value) }
    }
}

impl MemoryInterface for K230Soc {
    fn region(&self, addr: u64, len: usize) -> HalResult<&[u8]> {
        self.check_window(addr, len)?;
        // SAFETY: The range lies inside the DRAM window handed to `new`,
        // which the caller guaranteed to be exclusively ours.
        Ok(unsafe { core::slice::from_raw_parts(addr as usize as *const u8, len) })
    }

    fn region_mut(&mut self, addr: u64, len: usize) -> HalResult<&mut [u8]> {
        self.check_window(addr, len)?;
        // SAFETY: As in `region`; `&mut self` prevents aliasing borrows.
        Ok(unsafe { core::slice::from_raw_parts_mut(addr as usize as *mut u8, len) })
    }

    fn split_regions(
        &mut self,
        src: (u64, usize),
        dst: (u64, usize),
    ) -> HalResult<(&[u8], &mut [u8])> {
        self.check_window(src.0, src.1)?;
        self.check_window(dst.0, dst.1)?;
        check_disjoint(src.0, src.1, dst.0, dst.1)?;
        // SAFETY: Both ranges lie in the DRAM window and do not overlap.
        unsafe {
            Ok((
                core::slice::from_raw_parts(src.0 as usize as *const u8, src.1),
                core::slice::from_raw_parts_mut(dst.0 as usize as *mut u8, dst.1),
            ))
        }
    }

    fn copy_within(&mut self, src: u64, dst: u64, len: usize) -> HalResult<()> {
        self.check_window(src, len)?;
        self.check_window(dst, len)?;
        // SAFETY: Both ranges lie in the DRAM window; `copy` handles overlap.
        unsafe {
            core::ptr::copy(src as usize as *const u8, dst as usize as *mut u8, len);
        }
        Ok(())
    }
}

impl CacheInterface for K230Soc {
    fn flush_dcache_range(&mut self, addr: u64, len: usize) {
        cache::clean_range(addr, len);
    }

    fn invalidate_dcache_range(&mut self, addr: u64, len: usize) {
        cache::invalidate_range(addr, len);
    }

    fn disable_caches(&mut self) {
        cache::disable_all();
    }
}

impl TimerInterface for K230Soc {
    const FREQUENCY_HZ: u32 = K230_TIMER_FREQUENCY_HZ;

    fn get_ticks(&self) -> u64 {
        let ticks: u64;
        // SAFETY: Reading the time CSR is side-effect free.
        unsafe {
            core::arch::asm!("csrr {}, time", out(reg) ticks, options(nomem, nostack));
        }
        ticks
    }
}

impl DmaAllocator for K230Soc {
    fn dma_alloc(&mut self, len: usize) -> HalResult<u32> {
        self.dma.dma_alloc(len)
    }

    fn dma_free(&mut self, addr: u32, len: usize) {
        self.dma.dma_free(addr, len);
    }
}

impl CoreControl for K230Soc {
    fn core_sync(&mut self) {
        // SAFETY: sync.i orders instruction fetch after prior stores.
        unsafe {
            core::arch::asm!(".long 0x0170000b", options(nostack));
        }
    }

    fn jump(&mut self, entry: u64, hart: u64, dtb: u64) -> ! {
        // SAFETY: `entry` is the load address of an image that was just
        // verified, copied and flushed; caches are off and the pipeline is
        // synced. Control never comes back.
        unsafe {
            core::arch::asm!(
                "jr {entry}",
                entry = in(reg) entry,
                in("a0") hart,
                in("a1") dtb,
                options(noreturn)
            );
        }
    }
}

/// CSR (Control and Status Register) utilities
pub mod csr {
    /// Clear bits in a CSR
    #[macro_export]
    macro_rules! clear_csr {
        ($csr:literal, $value:expr) => {{
            let val: usize = $value;
            // SAFETY: Clearing bits via CSRC is valid when executing in a privilege
            // mode that has access to the specified CSR. The caller is responsible
            // for the bit mask.
            unsafe {
                core::arch::asm!(concat!("csrc ", $csr, ", {}"), in(reg) val, options(nomem, nostack));
            }
        }};
    }
}
