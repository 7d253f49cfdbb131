// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! K230 Boot Common Library
//!
//! This crate provides the types shared by every stage of the K230 boot
//! pipeline and by the USB burn engine: the unified error type, the boot
//! log ring buffer, board configuration, tick time keeping and the medium
//! and target enumerations.
//!
//! # Features
//!
//! - `std`: Enable standard library support (disabled by default for firmware)
//! - `defmt`: Enable defmt formatting of errors and enumerations
//!
//! No heap allocations are performed; buffers are fixed-size or heapless.

#![no_std]
#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

#[cfg(feature = "std")]
extern crate std;

pub mod config;
pub mod constants;
pub mod errors;
pub mod log;
pub mod time;
pub mod types;

// Re-export commonly used items
pub use config::{BootConfig, BurnConfig, MemoryLayout, PartitionTable};
pub use errors::{Error, ErrorCategory, Result};
pub use log::{LogBuffer, LogLevel};
pub use time::{Deadline, Millis, Ticks};
pub use types::{BootMedium, BootTarget, MediumKind};
