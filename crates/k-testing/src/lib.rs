// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Host-side simulation for the K230 boot pipeline
//!
//! - [`soc::SimSoc`]: register file, DRAM, descriptor SRAM, cache log, tick
//!   timer and a behavioral model of the gzip decompressor and its DMA
//!   channels
//! - [`media`]: sparse MMC, NOR and NAND devices with fault injection
//! - [`fuse::SimFuses`]: fuse store
//! - [`image`]: builder for signed and encrypted firmware containers
//! - [`keys`]: fixed test keys and their fuse digests
//! - [`usb::SimBulkIn`]: bulk-IN capture for the burn protocol
//!
//! Device handles share their state, so a test can keep one clone while the
//! code under test owns another.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod fuse;
pub mod image;
pub mod keys;
pub mod media;
pub mod soc;
pub mod usb;

pub use fuse::SimFuses;
pub use image::{gzip, random_bytes, Compression, ImageBuilder, Protection, UImage};
pub use media::{Faults, MediumOp, SimBlockDevice, SimNandFlash, SimNorFlash, SimProvider};
pub use soc::{CacheOp, GzipMode, Jump, SimClock, SimSoc};
pub use usb::SimBulkIn;
