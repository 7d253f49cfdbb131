// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! HAL error types

use core::fmt;

/// HAL error type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum HalError {
    /// Hardware initialization failed
    InitFailed,
    /// No device of the requested kind is present
    MediumNotFound,
    /// Device read failed
    ReadFailed,
    /// Device write/program failed
    WriteFailed,
    /// Device erase failed
    EraseFailed,
    /// Erase or program hit a bad block (EIO)
    BadBlock,
    /// Bad-block skipping ran off the end of the device
    BadBlocksExhausted,
    /// Offset or length violates the device alignment
    Unaligned,
    /// Access past the end of the device
    OutOfRange,
    /// Device is write protected
    WriteProtected,
    /// DMA-able memory could not be allocated
    OutOfMemory,
    /// DMA transfer error
    DmaError,
    /// Fuse (OTP) read failed
    FuseReadFailed,
    /// Address range is not backed by memory
    MemoryAccessViolation,
    /// Invalid parameter
    InvalidParameter,
    /// Operation timeout
    Timeout,
    /// Operation not supported
    NotSupported,
    /// Hardware fault detected
    HardwareFault,
}

impl HalError {
    /// Get error code
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::InitFailed => 0x0802,
            Self::MediumNotFound => 0x0810,
            Self::ReadFailed => 0x0811,
            Self::WriteFailed => 0x0812,
            Self::EraseFailed => 0x0813,
            Self::BadBlock => 0x0814,
            Self::BadBlocksExhausted => 0x0815,
            Self::Unaligned => 0x0816,
            Self::OutOfRange => 0x0817,
            Self::WriteProtected => 0x0818,
            Self::OutOfMemory => 0x0880,
            Self::DmaError => 0x0881,
            Self::FuseReadFailed => 0x0890,
            Self::MemoryAccessViolation => 0x08A0,
            Self::InvalidParameter => 0x08F0,
            Self::Timeout => 0x08F1,
            Self::NotSupported => 0x08FF,
            Self::HardwareFault => 0x08D0,
        }
    }

    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InitFailed => "initialization failed",
            Self::MediumNotFound => "medium not found",
            Self::ReadFailed => "read failed",
            Self::WriteFailed => "write failed",
            Self::EraseFailed => "erase failed",
            Self::BadBlock => "bad block",
            Self::BadBlocksExhausted => "bad blocks exhausted region",
            Self::Unaligned => "unaligned offset or length",
            Self::OutOfRange => "access out of range",
            Self::WriteProtected => "write protected",
            Self::OutOfMemory => "out of DMA memory",
            Self::DmaError => "DMA error",
            Self::FuseReadFailed => "fuse read failed",
            Self::MemoryAccessViolation => "invalid memory access",
            Self::InvalidParameter => "invalid parameter",
            Self::Timeout => "timeout",
            Self::NotSupported => "not supported",
            Self::HardwareFault => "hardware fault detected",
        }
    }
}

impl fmt::Display for HalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

impl From<HalError> for k_common::Error {
    fn from(e: HalError) -> Self {
        match e {
            HalError::InitFailed | HalError::HardwareFault => Self::HardwareInitFailed,
            HalError::MediumNotFound => Self::MediumNotFound,
            HalError::ReadFailed => Self::MediumReadFailed,
            HalError::WriteFailed => Self::MediumWriteFailed,
            HalError::EraseFailed | HalError::BadBlock => Self::MediumEraseFailed,
            HalError::BadBlocksExhausted => Self::BadBlocksExhausted,
            HalError::Unaligned => Self::Unaligned,
            HalError::OutOfRange => Self::OutOfRange,
            HalError::WriteProtected => Self::WriteProtected,
            HalError::OutOfMemory => Self::OutOfMemory,
            HalError::DmaError => Self::DmaError,
            HalError::FuseReadFailed => Self::FuseReadFailed,
            HalError::MemoryAccessViolation => Self::MemoryAccessViolation,
            HalError::InvalidParameter => Self::InvalidParameter,
            HalError::Timeout => Self::DecompressTimeout,
            HalError::NotSupported => Self::NotSupported,
        }
    }
}

/// HAL Result type
pub type HalResult<T> = Result<T, HalError>;
