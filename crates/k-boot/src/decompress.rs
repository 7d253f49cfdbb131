// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Hardware gzip decompression
//!
//! The K230 inflates gzip streams with a dedicated engine (UGZIP) fed by
//! two channels of the general-purpose scatter-gather DMA (GSDMA):
//!
//! - channel 0 reads the compressed stream from DRAM into the engine's
//!   read-side SRAM cache, ping-ponging two 128 KiB slots;
//! - channel 1 drains the write-side SRAM cache, four rotating 128 KiB
//!   slots, into the destination DRAM.
//!
//! Each channel walks a linked list of 24-byte descriptors, one per
//! 128 KiB chunk. The lists are built for a single call and freed before
//! it returns, whatever the outcome.

use core::fmt;

use k_common::constants::DECOMPRESS_CHUNK_SIZE;
use k_common::{Deadline, Error};
use k_hal::{HalError, Soc};

// ============================================================================
// Register map
// ============================================================================

const GSDMA_BASE: u64 = 0x8080_0000;
const GSDMA_CH_EN: u64 = GSDMA_BASE;
const GSDMA_INT_STAT: u64 = GSDMA_BASE + 0x08;

const SDMA_CH_BASE: u64 = GSDMA_BASE + 0x50;
const SDMA_CH_STRIDE: u64 = 0x30;
const SDMA_CH_CTL: u64 = 0x00;
const SDMA_CH_STATUS: u64 = 0x04;
const SDMA_CH_CFG: u64 = 0x08;
const SDMA_CH_LLT_SADDR: u64 = 0x10;

const UGZIP_BASE: u64 = 0x8080_8000;
const UGZIP_DECOMP_START: u64 = UGZIP_BASE;
const UGZIP_SRC_SIZE: u64 = UGZIP_BASE + 0x04;
const UGZIP_DMA_OUT_SIZE: u64 = UGZIP_BASE + 0x08;
const UGZIP_DECOMP_INTSTAT: u64 = UGZIP_BASE + 0x0C;

const UGZIP_CLOCK_GATE: u64 = 0x9130_2310;
const UGZIP_CLOCK_GATE_ON: u32 = 0x51F;

const RESET_UGZIP: u64 = 0x9110_1054;
const RESET_UGZIP_DONE: u32 = 1 << 29;
const RESET_GSDMA: u64 = 0x9110_105C;
const RESET_GSDMA_DONE: u32 = 1 << 31;

/// SRAM slots the read channel fills
const READ_CACHE_BASE: u32 = 0x8028_0000;
const READ_CACHE_SLOTS: usize = 2;
/// SRAM slots the write channel drains
const WRITE_CACHE_BASE: u32 = 0x8020_0000;
const WRITE_CACHE_SLOTS: usize = 4;

const CH_CTL_START: u32 = 1;
const CH_CTL_STOP: u32 = 2;
const CH_STATUS_BUSY: u32 = 1;
const CH_CFG_READ_MODE: u32 = 1 << 10;
/// Per-channel interrupt bits, shifted by channel number
const CH_INT_MASK: u32 = 0x111;
const READ_CHANNEL: u32 = 0;
const WRITE_CHANNEL: u32 = 1;
/// Transfer-done bit of the write channel
const WRITE_DONE: u32 = 1 << WRITE_CHANNEL;

const SRC_SIZE_ARM: u32 = 1 << 31;
const DECOMP_START_GZIP: u32 = 3;
const INTSTAT_CRC_OK: u32 = 1 << 10;

/// Size of one descriptor node
pub const DESCRIPTOR_SIZE: usize = 24;

// ============================================================================
// Errors
// ============================================================================

/// Decompression error types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum InflateError {
    /// The engine did not finish before the deadline
    Timeout,
    /// The engine finished without a valid CRC
    IntegrityError,
    /// Descriptor memory could not be allocated
    OutOfMemory,
    /// An address the DMA cannot reach, or a range not backed by memory
    BadAddress,
    /// Zero or oversized source / destination length
    InvalidLength,
}

impl InflateError {
    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::Timeout => "decompression timed out",
            Self::IntegrityError => "decompressed data failed CRC",
            Self::OutOfMemory => "no descriptor memory",
            Self::BadAddress => "address not reachable by DMA",
            Self::InvalidLength => "invalid length",
        }
    }
}

impl fmt::Display for InflateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl From<InflateError> for Error {
    fn from(e: InflateError) -> Self {
        match e {
            InflateError::Timeout => Error::DecompressTimeout,
            InflateError::IntegrityError => Error::IntegrityError,
            InflateError::OutOfMemory => Error::OutOfMemory,
            InflateError::BadAddress => Error::MemoryAccessViolation,
            InflateError::InvalidLength => Error::InvalidParameter,
        }
    }
}

impl From<HalError> for InflateError {
    fn from(e: HalError) -> Self {
        match e {
            HalError::OutOfMemory => Self::OutOfMemory,
            _ => Self::BadAddress,
        }
    }
}

// ============================================================================
// Descriptors
// ============================================================================

/// Direction of a descriptor chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    /// DRAM to the read-side cache
    Read,
    /// Write-side cache to DRAM
    Write,
}

/// One scatter-gather node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Descriptor {
    /// Dimension, pause and node-interrupt bits; all clear
    control: u32,
    src: u32,
    line_size: u32,
    /// Line count and line space of 2D transfers; unused
    geometry: u32,
    dst: u32,
    next: u32,
}

impl Descriptor {
    fn to_bytes(self) -> [u8; DESCRIPTOR_SIZE] {
        let mut out = [0u8; DESCRIPTOR_SIZE];
        let words = [
            self.control,
            self.src,
            self.line_size,
            self.geometry,
            self.dst,
            self.next,
        ];
        for (chunk, word) in out.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        out
    }
}

/// A descriptor list in DMA memory
#[derive(Debug, Clone, Copy)]
struct Chain {
    head: u32,
    bytes: usize,
}

impl Chain {
    fn free<S: Soc>(self, soc: &mut S) {
        soc.dma_free(self.head, self.bytes);
    }
}

/// Number of 128 KiB nodes covering `len` bytes
#[must_use]
pub const fn chunk_count(len: usize) -> usize {
    (len - 1) / DECOMPRESS_CHUNK_SIZE + 1
}

fn dma_addr(addr: u64) -> Result<u32, InflateError> {
    u32::try_from(addr).map_err(|_| InflateError::BadAddress)
}

fn cache_slot(base: u32, index: usize, slots: usize) -> u32 {
    // Slot offsets stay below 512 KiB
    #[allow(clippy::cast_possible_truncation)]
    let offset = ((index % slots) * DECOMPRESS_CHUNK_SIZE) as u32;
    base + offset
}

fn build_chain<S: Soc>(soc: &mut S, direction: Direction, base: u64, len: usize) -> Result<Chain, InflateError> {
    let nodes = chunk_count(len);
    let bytes = nodes * DESCRIPTOR_SIZE;
    let head = soc.dma_alloc(bytes)?;
    let chain = Chain { head, bytes };

    if let Err(e) = write_chain(soc, direction, base, chain, nodes) {
        chain.free(soc);
        return Err(e);
    }
    soc.flush_dcache_range(u64::from(head), bytes);
    Ok(chain)
}

fn write_chain<S: Soc>(
    soc: &mut S,
    direction: Direction,
    base: u64,
    chain: Chain,
    nodes: usize,
) -> Result<(), InflateError> {
    #[allow(clippy::cast_possible_truncation)]
    let line_size = DECOMPRESS_CHUNK_SIZE as u32;

    for index in 0..nodes {
        let dram = dma_addr(base + (index * DECOMPRESS_CHUNK_SIZE) as u64)?;
        let (src, dst) = match direction {
            Direction::Read => (dram, cache_slot(READ_CACHE_BASE, index, READ_CACHE_SLOTS)),
            Direction::Write => (cache_slot(WRITE_CACHE_BASE, index, WRITE_CACHE_SLOTS), dram),
        };
        let node_addr = dma_addr(u64::from(chain.head) + (index * DESCRIPTOR_SIZE) as u64)?;
        let next = if index + 1 < nodes {
            node_addr + DESCRIPTOR_SIZE as u32
        } else {
            0
        };
        let node = Descriptor {
            control: 0,
            src,
            line_size,
            geometry: 0,
            dst,
            next,
        };
        soc.write(u64::from(node_addr), &node.to_bytes())?;
    }
    Ok(())
}

// ============================================================================
// Engine control
// ============================================================================

fn channel_reg(channel: u32, offset: u64) -> u64 {
    SDMA_CH_BASE + u64::from(channel) * SDMA_CH_STRIDE + offset
}

/// Stop, enable and start `channel` on the chain at `head`
fn configure_channel<S: Soc>(soc: &mut S, channel: u32, head: u32, read_mode: bool) {
    soc.write32(channel_reg(channel, SDMA_CH_CTL), CH_CTL_STOP);
    soc.wait_clear32(channel_reg(channel, SDMA_CH_STATUS), CH_STATUS_BUSY);
    soc.set_bits32(GSDMA_CH_EN, 1 << channel);
    soc.write32(GSDMA_INT_STAT, CH_INT_MASK << channel);
    if read_mode {
        soc.write32(channel_reg(channel, SDMA_CH_CFG), CH_CFG_READ_MODE);
    }
    soc.write32(channel_reg(channel, SDMA_CH_LLT_SADDR), head);
    soc.write32(channel_reg(channel, SDMA_CH_CTL), CH_CTL_START);
}

/// Poll both channels until the write channel completes
fn wait_done<S: Soc>(soc: &mut S, timeout_ticks: u64) -> Result<(), InflateError> {
    let deadline = Deadline::after(soc.now(), timeout_ticks);
    loop {
        let status = soc.read32(GSDMA_INT_STAT);
        if status & (CH_INT_MASK << READ_CHANNEL) != 0 {
            soc.write32(GSDMA_INT_STAT, CH_INT_MASK << READ_CHANNEL);
        }
        if status & (CH_INT_MASK << WRITE_CHANNEL) != 0 {
            soc.write32(GSDMA_INT_STAT, CH_INT_MASK << WRITE_CHANNEL);
            if status & WRITE_DONE != 0 {
                return if soc.read32(UGZIP_DECOMP_INTSTAT) & INTSTAT_CRC_OK != 0 {
                    Ok(())
                } else {
                    Err(InflateError::IntegrityError)
                };
            }
        }
        if deadline.expired(soc.now()) {
            soc.write32(GSDMA_INT_STAT, CH_INT_MASK << READ_CHANNEL);
            soc.write32(GSDMA_INT_STAT, CH_INT_MASK << WRITE_CHANNEL);
            return Err(InflateError::Timeout);
        }
        core::hint::spin_loop();
    }
}

/// Pulse the engine and DMA resets
///
/// # Notes
/// The done bits are polled without a deadline; the reset controller
/// always completes.
fn reset_engines<S: Soc>(soc: &mut S) {
    soc.write32(RESET_UGZIP, 2);
    soc.wait_set32(RESET_UGZIP, RESET_UGZIP_DONE);
    soc.write32(RESET_UGZIP, RESET_UGZIP_DONE);

    soc.write32(RESET_GSDMA, 1);
    soc.wait_set32(RESET_GSDMA, RESET_GSDMA_DONE);
    soc.write32(RESET_GSDMA, RESET_GSDMA_DONE);
}

/// Inflate the gzip stream at `src` into `dst`
///
/// Returns the number of bytes produced, as reported by the engine.
///
/// # Errors
///
/// - [`InflateError::InvalidLength`]: empty source or destination, or a
///   length the size registers cannot carry
/// - [`InflateError::BadAddress`]: a range above 4 GiB
/// - [`InflateError::OutOfMemory`]: no descriptor memory
/// - [`InflateError::Timeout`]: no completion within `timeout_ticks`
/// - [`InflateError::IntegrityError`]: the engine reported a bad CRC
pub fn inflate<S: Soc>(
    soc: &mut S,
    src: u64,
    src_len: usize,
    dst: u64,
    dst_capacity: usize,
    timeout_ticks: u64,
) -> Result<usize, InflateError> {
    if src_len == 0 || dst_capacity == 0 {
        return Err(InflateError::InvalidLength);
    }
    let src_size = u32::try_from(src_len)
        .ok()
        .filter(|len| len & SRC_SIZE_ARM == 0)
        .ok_or(InflateError::InvalidLength)?;
    let out_size = u32::try_from(dst_capacity).map_err(|_| InflateError::InvalidLength)?;
    dma_addr(src + src_len as u64 - 1)?;
    dma_addr(dst + dst_capacity as u64 - 1)?;

    soc.flush_dcache_range(src, src_len);
    soc.write32(UGZIP_SRC_SIZE, SRC_SIZE_ARM);

    let read = build_chain(soc, Direction::Read, src, src_len)?;
    let write = match build_chain(soc, Direction::Write, dst, dst_capacity) {
        Ok(chain) => chain,
        Err(e) => {
            read.free(soc);
            return Err(e);
        }
    };

    configure_channel(soc, READ_CHANNEL, read.head, true);
    configure_channel(soc, WRITE_CHANNEL, write.head, false);

    soc.write32(UGZIP_CLOCK_GATE, UGZIP_CLOCK_GATE_ON);
    soc.write32(UGZIP_SRC_SIZE, src_size | SRC_SIZE_ARM);
    soc.write32(UGZIP_DMA_OUT_SIZE, out_size);
    soc.write32(UGZIP_DECOMP_START, DECOMP_START_GZIP);

    let result = wait_done(soc, timeout_ticks).map(|()| soc.read32(UGZIP_DMA_OUT_SIZE) as usize);

    read.free(soc);
    write.free(soc);
    soc.invalidate_dcache_range(dst, dst_capacity);

    if result.is_err() {
        reset_engines(soc);
    }

    soc.write32(UGZIP_SRC_SIZE, 0);
    soc.write32(channel_reg(READ_CHANNEL, SDMA_CH_CFG), 0);
    result
}
