// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! C908 data cache maintenance

use k_common::constants::CACHE_LINE_SIZE;

/// Machine hardware control register: cache enables
const MHCR_IE: usize = 1 << 0;
const MHCR_DE: usize = 1 << 1;

fn line_range(addr: u64, len: usize) -> impl Iterator<Item = u64> {
    let line = CACHE_LINE_SIZE as u64;
    let start = addr & !(line - 1);
    let end = addr.saturating_add(len as u64);
    (start..end).step_by(CACHE_LINE_SIZE)
}

/// Write back every line covering the range
pub(super) fn clean_range(addr: u64, len: usize) {
    for line in line_range(addr, len) {
        // SAFETY: dcache.cva a0 writes back one line by virtual address; it
        // never faults on mapped memory.
        unsafe {
            core::arch::asm!(".long 0x0275000b", in("a0") line, options(nostack));
        }
    }
    sync();
}

/// Discard every line covering the range
pub(super) fn invalidate_range(addr: u64, len: usize) {
    for line in line_range(addr, len) {
        // SAFETY: dcache.iva a0 drops one line; the range was just written by
        // a DMA master, so no dirty CPU data is lost.
        unsafe {
            core::arch::asm!(".long 0x0265000b", in("a0") line, options(nostack));
        }
    }
    sync();
}

/// Clean and invalidate all lines, then switch both caches off
pub(super) fn disable_all() {
    // SAFETY: dcache.ciall then icache.iall leave memory coherent before the
    // enables are cleared in mhcr.
    unsafe {
        core::arch::asm!(".long 0x0030000b", options(nostack));
        core::arch::asm!(".long 0x0100000b", options(nostack));
    }
    sync();
    crate::clear_csr!("0x7c1", MHCR_IE | MHCR_DE);
}

fn sync() {
    // SAFETY: sync.s waits for outstanding cache operations on all harts.
    unsafe {
        core::arch::asm!(".long 0x0190000b", options(nostack));
    }
}
