// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Cryptographic error types

use core::fmt;

/// Error type for cryptographic operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CryptoError {
    /// Invalid key format or size
    InvalidKey,
    /// The engine holds no key in the requested slot
    KeyUnavailable,
    /// Signature verification failed
    InvalidSignature,
    /// Ciphertext length does not fit the cipher
    InvalidCiphertext,
    /// AEAD authentication failed
    AuthenticationFailed,
    /// Buffer is too small for the operation
    BufferTooSmall,
    /// Internal error (should not occur)
    InternalError,
}

impl CryptoError {
    /// Get error code for logging/debugging
    #[must_use]
    pub const fn code(&self) -> u16 {
        match self {
            Self::InvalidKey => 0x0211,
            Self::KeyUnavailable => 0x0212,
            Self::InvalidSignature => 0x0213,
            Self::InvalidCiphertext => 0x0214,
            Self::AuthenticationFailed => 0x0215,
            Self::BufferTooSmall => 0x0216,
            Self::InternalError => 0x02FF,
        }
    }

    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::InvalidKey => "invalid key",
            Self::KeyUnavailable => "key not provisioned",
            Self::InvalidSignature => "invalid signature",
            Self::InvalidCiphertext => "invalid ciphertext",
            Self::AuthenticationFailed => "authentication failed",
            Self::BufferTooSmall => "buffer too small",
            Self::InternalError => "internal error",
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[0x{:04X}] {}", self.code(), self.description())
    }
}

impl From<CryptoError> for k_common::Error {
    fn from(e: CryptoError) -> Self {
        match e {
            CryptoError::KeyUnavailable => Self::KeyMissing,
            // A key that does not parse cannot have signed anything
            CryptoError::InvalidKey | CryptoError::InvalidSignature => Self::SignatureInvalid,
            CryptoError::InvalidCiphertext | CryptoError::AuthenticationFailed => {
                Self::DecryptFailed
            }
            CryptoError::BufferTooSmall => Self::BufferTooSmall,
            CryptoError::InternalError => Self::InternalError,
        }
    }
}

/// Result type for cryptographic operations
pub type CryptoResult<T> = Result<T, CryptoError>;
