// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Pipeline-wide constants
//!
//! Container layout, image header layout, hardware chunk sizes and the USB
//! burn framing. Register addresses live with the drivers that use them.

// =============================================================================
// Firmware Container
// =============================================================================

/// Container magic: ASCII "K230" read as a little-endian word
pub const FIRMWARE_MAGIC: u32 = 0x3033_324B;

/// Size of the fixed container header (512 + 16 bytes)
pub const FIRMWARE_HEADER_SIZE: usize = 528;

/// Size of the verification union inside the header
pub const VERIFY_UNION_SIZE: usize = 516;

/// Sector size used to lay images out on block media
pub const BOOT_BLOCK_SIZE: usize = 512;

// =============================================================================
// Legacy Image Header
// =============================================================================

/// Legacy image header magic
pub const UIMAGE_MAGIC: u32 = 0x2705_1956;

/// Legacy image header size
pub const UIMAGE_HEADER_SIZE: usize = 64;

/// Offset of the legacy image header inside the plaintext
pub const UIMAGE_PLAINTEXT_OFFSET: usize = 4;

// =============================================================================
// Hardware Decompressor
// =============================================================================

/// Bytes moved by one scatter-gather node
pub const DECOMPRESS_CHUNK_SIZE: usize = 128 * 1024;

/// Default decompressor deadline in timer ticks
pub const DEFAULT_DECOMPRESS_TIMEOUT_TICKS: u64 = 80_000_000;

/// Largest output the loader lets the decompressor produce
pub const MAX_DECOMPRESSED_SIZE: usize = 0x0600_0000;

// =============================================================================
// Memory Layout
// =============================================================================

/// Default DRAM base address
pub const DEFAULT_MEMORY_BASE: u64 = 0x0000_0000;

/// Default DRAM size assumed by the loader (smallest K230 part)
pub const DEFAULT_MEMORY_SIZE: u64 = 128 * 1024 * 1024;

/// Data cache line size
pub const CACHE_LINE_SIZE: usize = 64;

// =============================================================================
// USB Burn Protocol
// =============================================================================

/// Fixed size of a burn command/response packet
pub const BURN_PACKET_SIZE: usize = 64;

/// Bytes in the packet header (command, result, payload length)
pub const BURN_PACKET_HEADER_SIZE: usize = 5;

/// Maximum payload carried by one packet
pub const BURN_PACKET_MAX_PAYLOAD: usize = BURN_PACKET_SIZE - BURN_PACKET_HEADER_SIZE;

/// Size of one half of the streaming double buffer
pub const BURN_EP_BUFFER_SIZE: usize = 128 * 1024;

/// Default bulk endpoint max packet size (high speed)
pub const BURN_DEFAULT_MAX_PACKET: usize = 512;

/// Vendor interface class
pub const BURN_INTERFACE_CLASS: u8 = 0xFF;

/// Vendor interface subclass
pub const BURN_INTERFACE_SUBCLASS: u8 = 0x02;

/// Vendor interface protocol
pub const BURN_INTERFACE_PROTOCOL: u8 = 0x00;
