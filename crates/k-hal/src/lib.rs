// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Hardware Abstraction Layer for the K230 boot pipeline
//!
//! This crate provides the hardware interfaces the loader and the burn
//! engine run against:
//!
//! - **K230**: RISC-V little core, memory-mapped peripherals (`k230` feature)
//! - **Simulation**: host-side models implementing the same traits
//!
//! # Architecture
//!
//! The HAL is structured in layers:
//!
//! 1. **Traits**: Platform-agnostic interfaces (`traits` module)
//! 2. **Media**: Storage medium variants over raw device traits (`medium`)
//! 3. **Drivers**: Platform-specific implementations (`k230`)

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

extern crate alloc;

pub mod dma;
pub mod error;
pub mod medium;
pub mod traits;

#[cfg(all(feature = "k230", target_arch = "riscv64"))]
pub mod k230;

// Re-export main traits
pub use dma::DmaPool;
pub use error::{HalError, HalResult};
pub use medium::{probe, MediumInfo, MediumProvider, StorageMedium};
pub use traits::*;

/// Platform identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Kendryte K230 (T-Head C908 little core)
    K230,
    /// Host simulation
    Simulation,
}

impl Platform {
    /// Get the current platform
    #[must_use]
    pub const fn current() -> Self {
        cfg_if::cfg_if! {
            if #[cfg(all(feature = "k230", target_arch = "riscv64"))] {
                Self::K230
            } else {
                Self::Simulation
            }
        }
    }

    /// Whether the platform has a second (big) core the loader can release
    #[must_use]
    pub const fn has_big_core(&self) -> bool {
        matches!(self, Self::K230)
    }

    /// Get the DRAM base address for this platform
    #[must_use]
    pub const fn dram_base(&self) -> u64 {
        match self {
            Self::K230 | Self::Simulation => 0x0000_0000,
        }
    }
}
