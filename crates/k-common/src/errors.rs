// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Error types for the K230 boot pipeline
//!
//! This module defines the unified error type shared by the boot path and
//! the USB burn engine. All errors are `Copy`, carry a stable numeric code
//! and never allocate, so they can cross crate boundaries through `?`
//! and be reported on a serial console without a heap.

use core::fmt;

/// Result type alias for boot pipeline operations
pub type Result<T> = core::result::Result<T, Error>;

/// Broad classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ErrorCategory {
    /// Container or image format problems
    Format,
    /// Key, digest, signature or decryption failures
    Crypto,
    /// Storage medium failures
    Io,
    /// Hardware deadline expired
    Timeout,
    /// USB burn protocol misuse
    Protocol,
    /// Boot target resolution and hand-off
    Boot,
    /// Hardware abstraction failures
    Hal,
    /// Everything else
    General,
}

/// Unified error type for the boot pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[non_exhaustive]
pub enum Error {
    // =========================================================================
    // Format Errors (0x01xx)
    // =========================================================================
    /// Firmware container magic does not match
    BadMagic,
    /// Crypto-type tag is not one of the known variants
    UnsupportedCrypto,
    /// Image compression or header format is not supported
    UnsupportedFormat,
    /// Image name does not map to a hand-off method
    UnsupportedImage,
    /// Image is shorter than its header claims
    TruncatedImage,

    // =========================================================================
    // Crypto Errors (0x02xx)
    // =========================================================================
    /// No key or public-key digest has been provisioned
    KeyMissing,
    /// Computed digest does not match the expected digest
    HashMismatch,
    /// Signature or public-key binding check failed
    SignatureInvalid,
    /// Authenticated decryption failed
    DecryptFailed,

    // =========================================================================
    // IO Errors (0x03xx)
    // =========================================================================
    /// Medium read failed
    MediumReadFailed,
    /// Medium write failed
    MediumWriteFailed,
    /// Medium erase failed
    MediumEraseFailed,
    /// Offset or length violates the medium alignment rules
    Unaligned,
    /// Access past the medium capacity
    OutOfRange,
    /// No medium of the requested kind is present
    MediumNotFound,
    /// Medium is write protected
    WriteProtected,
    /// Bad-block skipping ran off the end of the device
    BadBlocksExhausted,

    // =========================================================================
    // Timeout Errors (0x04xx)
    // =========================================================================
    /// Hardware decompressor did not complete before the deadline
    DecompressTimeout,

    // =========================================================================
    // Protocol Errors (0x05xx)
    // =========================================================================
    /// Packet is too short or carries a wrong payload size
    MalformedPacket,
    /// Command code is not recognised
    UnknownCommand,
    /// Command needs a bound medium but none is bound
    NoMediumBound,
    /// Medium info has not been queried yet
    MediumInfoInvalid,
    /// Operation is not valid in the current state
    InvalidState,

    // =========================================================================
    // Boot Errors (0x06xx)
    // =========================================================================
    /// Target has no partition on the selected medium
    NoSuchPartition,
    /// Decompressed output failed its integrity check
    IntegrityError,
    /// Boot configuration is inconsistent
    InvalidBootConfig,

    // =========================================================================
    // HAL Errors (0x08xx)
    // =========================================================================
    /// Hardware initialization failed
    HardwareInitFailed,
    /// DMA descriptor allocation or transfer failed
    DmaError,
    /// Fuse (OTP) read failed
    FuseReadFailed,
    /// Address range is not backed by memory
    MemoryAccessViolation,

    // =========================================================================
    // General Errors (0xFFxx)
    // =========================================================================
    /// Buffer is too small for operation
    BufferTooSmall,
    /// Invalid parameter provided
    InvalidParameter,
    /// Allocation failed
    OutOfMemory,
    /// Feature not supported on this platform
    NotSupported,
    /// Internal error (should not occur)
    InternalError,
}

impl Error {
    /// Get the error code for this error
    ///
    /// Error codes are organized by category:
    /// - 0x01xx: Format errors
    /// - 0x02xx: Cryptographic errors
    /// - 0x03xx: Medium IO errors
    /// - 0x04xx: Timeout errors
    /// - 0x05xx: Protocol errors
    /// - 0x06xx: Boot errors
    /// - 0x08xx: HAL errors
    /// - 0xFFxx: General errors
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::BadMagic => 0x0101,
            Self::UnsupportedCrypto => 0x0102,
            Self::UnsupportedFormat => 0x0103,
            Self::UnsupportedImage => 0x0104,
            Self::TruncatedImage => 0x0105,

            Self::KeyMissing => 0x0201,
            Self::HashMismatch => 0x0202,
            Self::SignatureInvalid => 0x0203,
            Self::DecryptFailed => 0x0204,

            Self::MediumReadFailed => 0x0301,
            Self::MediumWriteFailed => 0x0302,
            Self::MediumEraseFailed => 0x0303,
            Self::Unaligned => 0x0304,
            Self::OutOfRange => 0x0305,
            Self::MediumNotFound => 0x0306,
            Self::WriteProtected => 0x0307,
            Self::BadBlocksExhausted => 0x0308,

            Self::DecompressTimeout => 0x0401,

            Self::MalformedPacket => 0x0501,
            Self::UnknownCommand => 0x0502,
            Self::NoMediumBound => 0x0503,
            Self::MediumInfoInvalid => 0x0504,
            Self::InvalidState => 0x0505,

            Self::NoSuchPartition => 0x0601,
            Self::IntegrityError => 0x0602,
            Self::InvalidBootConfig => 0x0603,

            Self::HardwareInitFailed => 0x0801,
            Self::DmaError => 0x0802,
            Self::FuseReadFailed => 0x0803,
            Self::MemoryAccessViolation => 0x0804,

            Self::BufferTooSmall => 0xFF01,
            Self::InvalidParameter => 0xFF02,
            Self::OutOfMemory => 0xFF03,
            Self::NotSupported => 0xFF04,
            Self::InternalError => 0xFFFF,
        }
    }

    /// Get the category of this error
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self.code() >> 8 {
            0x01 => ErrorCategory::Format,
            0x02 => ErrorCategory::Crypto,
            0x03 => ErrorCategory::Io,
            0x04 => ErrorCategory::Timeout,
            0x05 => ErrorCategory::Protocol,
            0x06 => ErrorCategory::Boot,
            0x08 => ErrorCategory::Hal,
            _ => ErrorCategory::General,
        }
    }

    /// Check if this is a security-critical error
    ///
    /// Security errors end the current boot attempt with no fallback to a
    /// partially verified image.
    #[must_use]
    pub const fn is_security_error(&self) -> bool {
        matches!(
            self,
            Self::BadMagic
                | Self::UnsupportedCrypto
                | Self::KeyMissing
                | Self::HashMismatch
                | Self::SignatureInvalid
                | Self::DecryptFailed
                | Self::IntegrityError
        )
    }

    /// Get a short description of the error
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::BadMagic => "bad image magic",
            Self::UnsupportedCrypto => "unsupported crypto type",
            Self::UnsupportedFormat => "unsupported image format",
            Self::UnsupportedImage => "unsupported image type",
            Self::TruncatedImage => "image truncated",
            Self::KeyMissing => "key not provisioned",
            Self::HashMismatch => "digest mismatch",
            Self::SignatureInvalid => "signature verification failed",
            Self::DecryptFailed => "decryption failed",
            Self::MediumReadFailed => "medium read failed",
            Self::MediumWriteFailed => "medium write failed",
            Self::MediumEraseFailed => "medium erase failed",
            Self::Unaligned => "unaligned access",
            Self::OutOfRange => "access out of range",
            Self::MediumNotFound => "medium not found",
            Self::WriteProtected => "medium write protected",
            Self::BadBlocksExhausted => "bad blocks exhausted region",
            Self::DecompressTimeout => "decompression timeout",
            Self::MalformedPacket => "malformed packet",
            Self::UnknownCommand => "unknown command",
            Self::NoMediumBound => "no medium bound",
            Self::MediumInfoInvalid => "medium info invalid",
            Self::InvalidState => "invalid state for operation",
            Self::NoSuchPartition => "no such partition",
            Self::IntegrityError => "integrity check failed",
            Self::InvalidBootConfig => "invalid boot configuration",
            Self::HardwareInitFailed => "hardware initialization failed",
            Self::DmaError => "DMA error",
            Self::FuseReadFailed => "fuse read failed",
            Self::MemoryAccessViolation => "invalid memory access",
            Self::BufferTooSmall => "buffer too small",
            Self::InvalidParameter => "invalid parameter",
            Self::OutOfMemory => "out of memory",
            Self::NotSupported => "not supported",
            Self::InternalError => "internal error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

#[cfg(feature = "std")]
impl std::error::Error for Error {}
