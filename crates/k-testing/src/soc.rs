// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Simulated K230 SoC
//!
//! DRAM and a small descriptor SRAM are host vectors. Registers are a
//! sparse map with a write log. The gzip decompressor and its two SDMA
//! channels are modelled at the level the loader sees them: writing `3`
//! to the start register walks both descriptor chains, inflates with
//! `flate2` and raises the completion interrupts.

use std::cell::Cell;
use std::collections::HashMap;
use std::io::Read;

use flate2::read::GzDecoder;
use k_hal::{
    CacheInterface, CoreControl, DmaAllocator, DmaPool, HalError, HalResult, MemoryInterface,
    RegisterInterface, TimerInterface,
};

/// Register addresses the model reacts to
pub mod regs {
    /// GSDMA channel enable
    pub const GSDMA_CH_EN: u64 = 0x8080_0000;
    /// GSDMA interrupt status (write 1 to clear)
    pub const GSDMA_INT_STAT: u64 = 0x8080_0008;
    /// First SDMA channel register block
    pub const SDMA_CH_BASE: u64 = 0x8080_0050;
    /// Distance between channel register blocks
    pub const SDMA_CH_STRIDE: u64 = 0x30;
    /// Channel register: linked list head
    pub const SDMA_CH_LLT_SADDR: u64 = 0x10;
    /// Decompressor start
    pub const UGZIP_DECOMP_START: u64 = 0x8080_8000;
    /// Compressed input size, bit 31 arms the engine
    pub const UGZIP_SRC_SIZE: u64 = 0x8080_8004;
    /// Output capacity in, produced length out
    pub const UGZIP_OUT_SIZE: u64 = 0x8080_8008;
    /// Decompressor status
    pub const UGZIP_INTSTAT: u64 = 0x8080_800C;
    /// First recovery reset register, done bit 29
    pub const RESET_UGZIP: u64 = 0x9110_1054;
    /// Second recovery reset register, done bit 31
    pub const RESET_GSDMA: u64 = 0x9110_105C;
    /// Boot medium strap register
    pub const BOOT_STRAP: u64 = 0x9110_2040;
}

/// Decompressor CRC-valid status bit
const INTSTAT_CRC_OK: u32 = 1 << 10;

/// Size of one descriptor node
const NODE_SIZE: usize = 24;

/// How the decompressor model behaves when started
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GzipMode {
    /// Inflate and report the real CRC result
    #[default]
    Normal,
    /// Never raise a completion interrupt
    Hang,
    /// Inflate but report a CRC failure
    CrcError,
}

/// Recorded cache maintenance operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOp {
    /// Dirty lines written back
    Flush {
        /// Start address
        addr: u64,
        /// Length in bytes
        len: usize,
    },
    /// Lines discarded
    Invalidate {
        /// Start address
        addr: u64,
        /// Length in bytes
        len: usize,
    },
    /// Caches flushed and disabled
    DisableAll,
}

/// Panic payload raised by [`CoreControl::jump`]
///
/// Tests catch the unwind and inspect where control would have gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Jump {
    /// Entry address
    pub entry: u64,
    /// Value passed in `a0`
    pub hart: u64,
    /// Value passed in `a1`
    pub dtb: u64,
}

#[derive(Debug, Clone, Copy)]
enum Window {
    Dram,
    Sram,
}

/// Simulated SoC
pub struct SimSoc {
    dram_base: u64,
    dram: Vec<u8>,
    sram_base: u64,
    sram: Vec<u8>,
    pool: DmaPool,
    registers: HashMap<u64, u32>,
    writes: Vec<(u64, u32)>,
    cache_ops: Vec<CacheOp>,
    ticks: Cell<u64>,
    tick_step: u64,
    gzip_mode: GzipMode,
    decompress_runs: usize,
    core_syncs: usize,
}

impl SimSoc {
    /// Base of the descriptor SRAM window
    pub const SRAM_BASE: u64 = 0x7000_0000;

    /// Size of the descriptor SRAM window
    pub const SRAM_SIZE: usize = 64 * 1024;

    /// SoC with `dram_size` bytes of DRAM at address 0
    #[must_use]
    pub fn new(dram_size: usize) -> Self {
        Self::with_dram(0, dram_size)
    }

    /// SoC with DRAM at `[base, base + size)`
    #[must_use]
    pub fn with_dram(base: u64, size: usize) -> Self {
        #[allow(clippy::cast_possible_truncation)]
        let pool = DmaPool::new(Self::SRAM_BASE as u32, Self::SRAM_SIZE as u32);
        Self {
            dram_base: base,
            dram: vec![0u8; size],
            sram_base: Self::SRAM_BASE,
            sram: vec![0u8; Self::SRAM_SIZE],
            pool,
            registers: HashMap::new(),
            writes: Vec::new(),
            cache_ops: Vec::new(),
            ticks: Cell::new(0),
            tick_step: 1_000,
            gzip_mode: GzipMode::Normal,
            decompress_runs: 0,
            core_syncs: 0,
        }
    }

    /// Select the decompressor behavior
    pub fn set_gzip_mode(&mut self, mode: GzipMode) {
        self.gzip_mode = mode;
    }

    /// Ticks the timer advances on every read
    pub fn set_tick_step(&mut self, step: u64) {
        self.tick_step = step;
    }

    /// Preset a register without logging a write
    pub fn poke(&mut self, addr: u64, value: u32) {
        self.registers.insert(addr, value);
    }

    /// Current register value
    #[must_use]
    pub fn peek(&self, addr: u64) -> u32 {
        self.registers.get(&addr).copied().unwrap_or(0)
    }

    /// Every register write in order
    #[must_use]
    pub fn writes(&self) -> &[(u64, u32)] {
        &self.writes
    }

    /// Writes to a single register in order
    #[must_use]
    pub fn writes_to(&self, addr: u64) -> Vec<u32> {
        self.writes
            .iter()
            .filter(|(a, _)| *a == addr)
            .map(|(_, v)| *v)
            .collect()
    }

    /// Recorded cache operations
    #[must_use]
    pub fn cache_ops(&self) -> &[CacheOp] {
        &self.cache_ops
    }

    /// Number of times the decompressor was started
    #[must_use]
    pub fn decompress_runs(&self) -> usize {
        self.decompress_runs
    }

    /// Number of core-sync barriers issued
    #[must_use]
    pub fn core_syncs(&self) -> usize {
        self.core_syncs
    }

    /// Descriptor allocations not yet freed
    #[must_use]
    pub fn dma_outstanding(&self) -> usize {
        self.pool.outstanding()
    }

    /// Copy of `len` bytes at `addr`
    ///
    /// # Panics
    ///
    /// Panics if the range is not backed by memory.
    #[must_use]
    pub fn memory(&self, addr: u64, len: usize) -> Vec<u8> {
        self.region(addr, len)
            .expect("range not backed by simulated memory")
            .to_vec()
    }

    /// Place `data` at `addr`
    ///
    /// # Panics
    ///
    /// Panics if the range is not backed by memory.
    pub fn load(&mut self, addr: u64, data: &[u8]) {
        self.region_mut(addr, data.len())
            .expect("range not backed by simulated memory")
            .copy_from_slice(data);
    }

    fn locate(&self, addr: u64, len: usize) -> HalResult<(Window, usize)> {
        let end = addr
            .checked_add(len as u64)
            .ok_or(HalError::MemoryAccessViolation)?;
        if addr >= self.dram_base && end <= self.dram_base + self.dram.len() as u64 {
            #[allow(clippy::cast_possible_truncation)]
            return Ok((Window::Dram, (addr - self.dram_base) as usize));
        }
        if addr >= self.sram_base && end <= self.sram_base + self.sram.len() as u64 {
            #[allow(clippy::cast_possible_truncation)]
            return Ok((Window::Sram, (addr - self.sram_base) as usize));
        }
        Err(HalError::MemoryAccessViolation)
    }

    fn channel_reg(channel: u64, offset: u64) -> u64 {
        regs::SDMA_CH_BASE + channel * regs::SDMA_CH_STRIDE + offset
    }

    /// Walk a descriptor chain, returning `(address, line_size)` per node
    fn chain(&self, head: u32) -> Option<Vec<(u32, u32, u32)>> {
        let mut nodes = Vec::new();
        let mut next = u64::from(head);
        while next != 0 {
            let raw = self.region(next, NODE_SIZE).ok()?;
            let word = |i: usize| u32::from_le_bytes([raw[i * 4], raw[i * 4 + 1], raw[i * 4 + 2], raw[i * 4 + 3]]);
            // (source, line size, destination)
            nodes.push((word(1), word(2), word(4)));
            next = u64::from(word(5));
            if nodes.len() > 4096 {
                return None;
            }
        }
        Some(nodes)
    }

    fn run_decompressor(&mut self) {
        self.decompress_runs += 1;
        if self.gzip_mode == GzipMode::Hang {
            return;
        }

        let src_len = (self.peek(regs::UGZIP_SRC_SIZE) & 0x7FFF_FFFF) as usize;
        let capacity = self.peek(regs::UGZIP_OUT_SIZE) as usize;
        let read_head = self.peek(Self::channel_reg(0, regs::SDMA_CH_LLT_SADDR));
        let write_head = self.peek(Self::channel_reg(1, regs::SDMA_CH_LLT_SADDR));

        let mut produced = 0usize;
        let mut crc_ok = false;
        if let (Some(read_chain), Some(write_chain)) = (self.chain(read_head), self.chain(write_head)) {
            let mut input = Vec::with_capacity(src_len);
            for (src, line, _) in &read_chain {
                let take = (*line as usize).min(src_len - input.len());
                if let Ok(bytes) = self.region(u64::from(*src), take) {
                    input.extend_from_slice(bytes);
                }
            }

            let mut output = Vec::new();
            let decoded = input.len() == src_len
                && GzDecoder::new(input.as_slice()).read_to_end(&mut output).is_ok();

            let limit = output.len().min(capacity);
            for (_, line, dst) in &write_chain {
                if produced == limit {
                    break;
                }
                let take = (*line as usize).min(limit - produced);
                if let Ok(out) = self.region_mut(u64::from(*dst), take) {
                    out.copy_from_slice(&output[produced..produced + take]);
                    produced += take;
                }
            }
            crc_ok = decoded && produced == output.len() && self.gzip_mode == GzipMode::Normal;
        }

        #[allow(clippy::cast_possible_truncation)]
        self.registers.insert(regs::UGZIP_OUT_SIZE, produced as u32);
        self.registers
            .insert(regs::UGZIP_INTSTAT, if crc_ok { INTSTAT_CRC_OK } else { 0 });
        let status = self.peek(regs::GSDMA_INT_STAT);
        self.registers.insert(regs::GSDMA_INT_STAT, status | 0x3);
    }
}

impl RegisterInterface for SimSoc {
    fn read32(&mut self, addr: u64) -> u32 {
        self.peek(addr)
    }

    fn write32(&mut self, addr: u64, value: u32) {
        self.writes.push((addr, value));
        match addr {
            regs::GSDMA_INT_STAT => {
                let status = self.peek(addr);
                self.registers.insert(addr, status & !value);
            }
            regs::RESET_UGZIP | regs::RESET_GSDMA => {
                let done = if addr == regs::RESET_UGZIP { 1 << 29 } else { 1 << 31 };
                if value & done != 0 {
                    let current = self.peek(addr);
                    self.registers.insert(addr, current & !done);
                } else {
                    // Reset completes instantly
                    self.registers.insert(addr, value | done);
                }
            }
            regs::UGZIP_DECOMP_START => {
                self.registers.insert(addr, value);
                if value == 3 {
                    self.run_decompressor();
                }
            }
            _ => {
                self.registers.insert(addr, value);
            }
        }
    }
}

impl MemoryInterface for SimSoc {
    fn region(&self, addr: u64, len: usize) -> HalResult<&[u8]> {
        let (window, offset) = self.locate(addr, len)?;
        Ok(match window {
            Window::Dram => &self.dram[offset..offset + len],
            Window::Sram => &self.sram[offset..offset + len],
        })
    }

    fn region_mut(&mut self, addr: u64, len: usize) -> HalResult<&mut [u8]> {
        let (window, offset) = self.locate(addr, len)?;
        Ok(match window {
            Window::Dram => &mut self.dram[offset..offset + len],
            Window::Sram => &mut self.sram[offset..offset + len],
        })
    }

    fn split_regions(
        &mut self,
        src: (u64, usize),
        dst: (u64, usize),
    ) -> HalResult<(&[u8], &mut [u8])> {
        k_hal::check_disjoint(src.0, src.1, dst.0, dst.1)?;
        if src.1 == 0 {
            return Ok((&[], self.region_mut(dst.0, dst.1)?));
        }
        let (src_window, src_off) = self.locate(src.0, src.1)?;
        let (dst_window, dst_off) = self.locate(dst.0, dst.1)?;
        match (src_window, dst_window) {
            (Window::Dram, Window::Sram) => Ok((
                &self.dram[src_off..src_off + src.1],
                &mut self.sram[dst_off..dst_off + dst.1],
            )),
            (Window::Sram, Window::Dram) => Ok((
                &self.sram[src_off..src_off + src.1],
                &mut self.dram[dst_off..dst_off + dst.1],
            )),
            (Window::Dram, Window::Dram) | (Window::Sram, Window::Sram) => {
                let memory = match src_window {
                    Window::Dram => &mut self.dram,
                    Window::Sram => &mut self.sram,
                };
                if src_off < dst_off {
                    let (low, high) = memory.split_at_mut(dst_off);
                    Ok((&low[src_off..src_off + src.1], &mut high[..dst.1]))
                } else {
                    let (low, high) = memory.split_at_mut(src_off);
                    Ok((&high[..src.1], &mut low[dst_off..dst_off + dst.1]))
                }
            }
        }
    }

    fn copy_within(&mut self, src: u64, dst: u64, len: usize) -> HalResult<()> {
        let (src_window, src_off) = self.locate(src, len)?;
        let (dst_window, dst_off) = self.locate(dst, len)?;
        match (src_window, dst_window) {
            (Window::Dram, Window::Dram) => self.dram.copy_within(src_off..src_off + len, dst_off),
            (Window::Sram, Window::Sram) => self.sram.copy_within(src_off..src_off + len, dst_off),
            (Window::Dram, Window::Sram) => {
                self.sram[dst_off..dst_off + len].copy_from_slice(&self.dram[src_off..src_off + len]);
            }
            (Window::Sram, Window::Dram) => {
                self.dram[dst_off..dst_off + len].copy_from_slice(&self.sram[src_off..src_off + len]);
            }
        }
        Ok(())
    }
}

impl CacheInterface for SimSoc {
    fn flush_dcache_range(&mut self, addr: u64, len: usize) {
        self.cache_ops.push(CacheOp::Flush { addr, len });
    }

    fn invalidate_dcache_range(&mut self, addr: u64, len: usize) {
        self.cache_ops.push(CacheOp::Invalidate { addr, len });
    }

    fn disable_caches(&mut self) {
        self.cache_ops.push(CacheOp::DisableAll);
    }
}

impl TimerInterface for SimSoc {
    const FREQUENCY_HZ: u32 = 27_000_000;

    fn get_ticks(&self) -> u64 {
        let now = self.ticks.get() + self.tick_step;
        self.ticks.set(now);
        now
    }
}

/// Free-running tick source for code that only needs a clock
#[derive(Debug, Default)]
pub struct SimClock {
    ticks: Cell<u64>,
}

impl SimClock {
    /// Clock at tick zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimerInterface for SimClock {
    const FREQUENCY_HZ: u32 = 27_000_000;

    fn get_ticks(&self) -> u64 {
        let now = self.ticks.get() + 1_000;
        self.ticks.set(now);
        now
    }
}

impl DmaAllocator for SimSoc {
    fn dma_alloc(&mut self, len: usize) -> HalResult<u32> {
        self.pool.dma_alloc(len)
    }

    fn dma_free(&mut self, addr: u32, len: usize) {
        self.pool.dma_free(addr, len);
    }
}

impl CoreControl for SimSoc {
    fn core_sync(&mut self) {
        self.core_syncs += 1;
    }

    fn jump(&mut self, entry: u64, hart: u64, dtb: u64) -> ! {
        std::panic::panic_any(Jump { entry, hart, dtb })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_windows() {
        let mut soc = SimSoc::new(4096);
        soc.load(0x100, &[1, 2, 3]);
        assert_eq!(soc.memory(0x100, 3), vec![1, 2, 3]);
        assert!(soc.region(4090, 16).is_err());
        assert!(soc.region(SimSoc::SRAM_BASE, 16).is_ok());
    }

    #[test]
    fn test_split_same_window() {
        let mut soc = SimSoc::new(4096);
        soc.load(0, &[7; 16]);
        let (src, dst) = soc.split_regions((0, 16), (32, 16)).unwrap();
        dst.copy_from_slice(src);
        assert_eq!(soc.memory(32, 16), vec![7; 16]);
        assert!(soc.split_regions((0, 16), (8, 16)).is_err());
    }

    #[test]
    fn test_int_stat_write_one_to_clear() {
        let mut soc = SimSoc::new(16);
        soc.poke(regs::GSDMA_INT_STAT, 0x3);
        soc.write32(regs::GSDMA_INT_STAT, 0x111);
        assert_eq!(soc.peek(regs::GSDMA_INT_STAT), 0x2);
    }

    #[test]
    fn test_reset_completes() {
        let mut soc = SimSoc::new(16);
        soc.write32(regs::RESET_UGZIP, 0x2);
        assert_ne!(soc.peek(regs::RESET_UGZIP) & (1 << 29), 0);
        soc.write32(regs::RESET_UGZIP, 1 << 29);
        assert_eq!(soc.peek(regs::RESET_UGZIP) & (1 << 29), 0);
    }

    #[test]
    fn test_timer_advances() {
        let soc = SimSoc::new(16);
        let a = soc.get_ticks();
        let b = soc.get_ticks();
        assert!(b > a);
    }
}
