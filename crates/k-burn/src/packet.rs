// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Burn packet codec
//!
//! Commands and responses travel as fixed 64-byte packets:
//!
//! ```text
//! offset  size  field
//! 0       2     command (LE), responses set bit 15
//! 2       2     result (LE), responses only
//! 4       1     payload length
//! 5       59    payload
//! ```

use core::fmt;

use k_common::constants::{BURN_PACKET_HEADER_SIZE, BURN_PACKET_MAX_PAYLOAD, BURN_PACKET_SIZE};
use k_common::Error;
use k_hal::HalError;

/// Bit set in the command field of every response
pub const RESPONSE_FLAG: u16 = 0x8000;

// ============================================================================
// Codes
// ============================================================================

/// Command codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum BurnCommand {
    /// Reserved
    None = 0x00,
    /// Bind a medium
    DeviceProbe = 0x10,
    /// Query the bound medium
    DeviceGetInfo = 0x11,
    /// Stream data onto the medium
    WriteLba = 0x20,
    /// Erase a range
    EraseLba = 0x21,
    /// Reserved
    Max = 0x22,
}

impl BurnCommand {
    /// Decode a command field
    #[must_use]
    pub const fn from_u16(code: u16) -> Option<Self> {
        match code {
            0x00 => Some(Self::None),
            0x10 => Some(Self::DeviceProbe),
            0x11 => Some(Self::DeviceGetInfo),
            0x20 => Some(Self::WriteLba),
            0x21 => Some(Self::EraseLba),
            0x22 => Some(Self::Max),
            _ => None,
        }
    }

    /// Wire code
    #[must_use]
    pub const fn code(self) -> u16 {
        self as u16
    }

    /// Whether the command has a handler
    #[must_use]
    pub const fn is_supported(self) -> bool {
        !matches!(self, Self::None | Self::Max)
    }
}

/// Result codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u16)]
pub enum BurnResult {
    /// No result
    None = 0x00,
    /// Success
    Ok = 0x01,
    /// Failure with a binary payload
    Error = 0x02,
    /// Failure with an ASCII message payload
    ErrorMsg = 0xFF,
}

impl BurnResult {
    /// Decode a result field
    #[must_use]
    pub const fn from_u16(code: u16) -> Option<Self> {
        match code {
            0x00 => Some(Self::None),
            0x01 => Some(Self::Ok),
            0x02 => Some(Self::Error),
            0xFF => Some(Self::ErrorMsg),
            _ => None,
        }
    }
}

// ============================================================================
// Burn Error Types
// ============================================================================

/// Burn protocol error types
///
/// Every variant is reported to the host as an error-message packet; see
/// [`BurnError::message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BurnError {
    /// Packet shorter than its header or payload length
    MalformedPacket,
    /// Payload longer than a packet can carry
    PayloadTooLarge,
    /// Unknown command code
    UnknownCommand,
    /// Reserved command code
    NotSupported,
    /// OUT transfer filled the whole request
    BufferOverflow,
    /// Command payload has the wrong length
    BadPayloadSize,
    /// No medium of the requested kind
    ProbeFailed,
    /// Command needs a bound medium
    NoMedium,
    /// Medium info not queried or query failed
    MediumInfoInvalid,
    /// Zero-length write
    EmptyWrite,
    /// Write range runs past the medium
    CapacityExceeded,
    /// Medium write failed
    WriteFailed,
    /// OUT transfer completed with an error status
    TransferFailed,
}

impl BurnError {
    /// Get error description
    #[must_use]
    pub const fn description(&self) -> &'static str {
        match self {
            Self::MalformedPacket => "malformed packet",
            Self::PayloadTooLarge => "payload too large",
            Self::UnknownCommand => "unknown command",
            Self::NotSupported => "command not supported",
            Self::BufferOverflow => "buffer overflow",
            Self::BadPayloadSize => "wrong payload size",
            Self::ProbeFailed => "probe failed",
            Self::NoMedium => "no medium bound",
            Self::MediumInfoInvalid => "medium info invalid",
            Self::EmptyWrite => "empty write",
            Self::CapacityExceeded => "write exceeds capacity",
            Self::WriteFailed => "write failed",
            Self::TransferFailed => "transfer failed",
        }
    }

    /// Message text sent to the host
    #[must_use]
    pub const fn message(&self) -> &'static str {
        match self {
            Self::MalformedPacket | Self::PayloadTooLarge => "FAILmalformed packet",
            Self::UnknownCommand => "FAILunknown command",
            Self::NotSupported => "NOT SUPPORT FUNC",
            Self::BufferOverflow => "FAILbuffer overflow",
            Self::BadPayloadSize => "ERROR DATA SIZE",
            Self::ProbeFailed => "PROBE FAILED",
            Self::NoMedium => "RUNTIME ERROR",
            Self::MediumInfoInvalid => "MEDIUM INFO INVALID",
            Self::EmptyWrite => "DATA SIZE INVALID",
            Self::CapacityExceeded => "DATA SIZE EXCEED",
            Self::WriteFailed => "WRITE ERROR",
            Self::TransferFailed => "ERROR STATUS",
        }
    }

    /// Whether the reply carries no command, because the error arose
    /// before a handler was chosen
    #[must_use]
    pub const fn is_generic(&self) -> bool {
        matches!(
            self,
            Self::MalformedPacket
                | Self::PayloadTooLarge
                | Self::UnknownCommand
                | Self::NotSupported
                | Self::BufferOverflow
        )
    }
}

impl fmt::Display for BurnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

impl From<BurnError> for Error {
    fn from(e: BurnError) -> Self {
        match e {
            BurnError::MalformedPacket | BurnError::BadPayloadSize => Error::MalformedPacket,
            BurnError::PayloadTooLarge | BurnError::BufferOverflow => Error::BufferTooSmall,
            BurnError::UnknownCommand => Error::UnknownCommand,
            BurnError::NotSupported => Error::NotSupported,
            BurnError::ProbeFailed => Error::MediumNotFound,
            BurnError::NoMedium => Error::NoMediumBound,
            BurnError::MediumInfoInvalid => Error::MediumInfoInvalid,
            BurnError::EmptyWrite => Error::InvalidParameter,
            BurnError::CapacityExceeded => Error::OutOfRange,
            BurnError::WriteFailed => Error::MediumWriteFailed,
            BurnError::TransferFailed => Error::InvalidState,
        }
    }
}

impl From<HalError> for BurnError {
    fn from(e: HalError) -> Self {
        match e {
            HalError::MediumNotFound | HalError::InitFailed => Self::ProbeFailed,
            _ => Self::WriteFailed,
        }
    }
}

// ============================================================================
// Packet
// ============================================================================

/// One command or response packet
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct BurnPacket {
    /// Command field
    pub cmd: u16,
    /// Result field
    pub result: u16,
    len: u8,
    data: [u8; BURN_PACKET_MAX_PAYLOAD],
}

impl BurnPacket {
    /// Encoded size
    pub const SIZE: usize = BURN_PACKET_SIZE;

    /// Build a packet
    ///
    /// # Errors
    ///
    /// Returns [`BurnError::PayloadTooLarge`] above 59 payload bytes.
    pub fn new(cmd: u16, result: u16, payload: &[u8]) -> Result<Self, BurnError> {
        if payload.len() > BURN_PACKET_MAX_PAYLOAD {
            return Err(BurnError::PayloadTooLarge);
        }
        let mut data = [0u8; BURN_PACKET_MAX_PAYLOAD];
        data[..payload.len()].copy_from_slice(payload);
        #[allow(clippy::cast_possible_truncation)]
        let len = payload.len() as u8;
        Ok(Self {
            cmd,
            result,
            len,
            data,
        })
    }

    /// Response to `command`
    ///
    /// # Errors
    ///
    /// Returns [`BurnError::PayloadTooLarge`] above 59 payload bytes.
    pub fn response(command: BurnCommand, result: BurnResult, payload: &[u8]) -> Result<Self, BurnError> {
        Self::new(RESPONSE_FLAG | command.code(), result as u16, payload)
    }

    /// Error-message response for `error`
    ///
    /// Generic errors carry command `0x8000`, the rest name `command`.
    #[must_use]
    pub fn error(command: BurnCommand, error: BurnError) -> Self {
        let cmd = if error.is_generic() {
            RESPONSE_FLAG
        } else {
            RESPONSE_FLAG | command.code()
        };
        let text = error.message().as_bytes();
        let mut data = [0u8; BURN_PACKET_MAX_PAYLOAD];
        let len = text.len().min(BURN_PACKET_MAX_PAYLOAD);
        data[..len].copy_from_slice(&text[..len]);
        #[allow(clippy::cast_possible_truncation)]
        let len = len as u8;
        Self {
            cmd,
            result: BurnResult::ErrorMsg as u16,
            len,
            data,
        }
    }

    /// Payload bytes
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.data[..usize::from(self.len)]
    }

    /// Decoded command, if known
    #[must_use]
    pub const fn command(&self) -> Option<BurnCommand> {
        BurnCommand::from_u16(self.cmd)
    }

    /// Encode to the wire layout
    #[must_use]
    pub fn encode(&self) -> [u8; BURN_PACKET_SIZE] {
        let mut out = [0u8; BURN_PACKET_SIZE];
        out[0..2].copy_from_slice(&self.cmd.to_le_bytes());
        out[2..4].copy_from_slice(&self.result.to_le_bytes());
        out[4] = self.len;
        out[BURN_PACKET_HEADER_SIZE..].copy_from_slice(&self.data);
        out
    }

    /// Decode from the wire
    ///
    /// Bytes past the declared payload are ignored, as are bytes past 64.
    ///
    /// # Errors
    ///
    /// Returns [`BurnError::MalformedPacket`] if `bytes` is shorter than
    /// the header plus the declared payload, or the declared payload is
    /// longer than 59 bytes.
    pub fn decode(bytes: &[u8]) -> Result<Self, BurnError> {
        if bytes.len() < BURN_PACKET_HEADER_SIZE {
            return Err(BurnError::MalformedPacket);
        }
        let len = usize::from(bytes[4]);
        if len > BURN_PACKET_MAX_PAYLOAD || bytes.len() < BURN_PACKET_HEADER_SIZE + len {
            return Err(BurnError::MalformedPacket);
        }
        Self::new(
            u16::from_le_bytes([bytes[0], bytes[1]]),
            u16::from_le_bytes([bytes[2], bytes[3]]),
            &bytes[BURN_PACKET_HEADER_SIZE..BURN_PACKET_HEADER_SIZE + len],
        )
    }
}

impl fmt::Debug for BurnPacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BurnPacket")
            .field("cmd", &format_args!("{:#06x}", self.cmd))
            .field("result", &format_args!("{:#06x}", self.result))
            .field("payload", &self.payload())
            .finish()
    }
}

/// Split a 16-byte `(offset, size)` payload
///
/// # Errors
///
/// Returns [`BurnError::BadPayloadSize`] unless `payload` is 16 bytes.
pub fn range_payload(payload: &[u8]) -> Result<(u64, u64), BurnError> {
    let payload: &[u8; 16] = payload.try_into().map_err(|_| BurnError::BadPayloadSize)?;
    let mut offset = [0u8; 8];
    let mut size = [0u8; 8];
    offset.copy_from_slice(&payload[..8]);
    size.copy_from_slice(&payload[8..]);
    Ok((u64::from_le_bytes(offset), u64::from_le_bytes(size)))
}

/// Encode an `(offset, size)` pair
#[must_use]
pub fn encode_range(offset: u64, size: u64) -> [u8; 16] {
    let mut out = [0u8; 16];
    out[..8].copy_from_slice(&offset.to_le_bytes());
    out[8..].copy_from_slice(&size.to_le_bytes());
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_layout() {
        let packet = BurnPacket::new(0x0010, 0, &[0x04, 0x00]).unwrap();
        let bytes = packet.encode();
        assert_eq!(&bytes[..7], &[0x10, 0x00, 0x00, 0x00, 0x02, 0x04, 0x00]);
        assert!(bytes[7..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let mut bytes = [0xEEu8; 64];
        bytes[..7].copy_from_slice(&[0x11, 0x00, 0x00, 0x00, 0x02, 0xAB, 0xCD]);
        let packet = BurnPacket::decode(&bytes).unwrap();
        assert_eq!(packet.command(), Some(BurnCommand::DeviceGetInfo));
        assert_eq!(packet.payload(), &[0xAB, 0xCD]);
    }

    #[test]
    fn test_decode_rejects_short_and_oversized() {
        assert_eq!(BurnPacket::decode(&[0x10, 0x00]), Err(BurnError::MalformedPacket));
        assert_eq!(
            BurnPacket::decode(&[0x10, 0x00, 0x00, 0x00, 4, 1, 2]),
            Err(BurnError::MalformedPacket)
        );
        let mut bytes = [0u8; 64];
        bytes[4] = 60;
        assert_eq!(BurnPacket::decode(&bytes), Err(BurnError::MalformedPacket));
    }

    #[test]
    fn test_payload_limit() {
        assert!(BurnPacket::new(0, 0, &[0u8; 59]).is_ok());
        assert_eq!(
            BurnPacket::new(0, 0, &[0u8; 60]),
            Err(BurnError::PayloadTooLarge)
        );
    }

    #[test]
    fn test_error_packets() {
        let generic = BurnPacket::error(BurnCommand::WriteLba, BurnError::UnknownCommand);
        assert_eq!(generic.cmd, 0x8000);
        assert_eq!(generic.result, 0xFF);
        assert_eq!(generic.payload(), b"FAILunknown command");

        let specific = BurnPacket::error(BurnCommand::WriteLba, BurnError::CapacityExceeded);
        assert_eq!(specific.cmd, 0x8020);
        assert_eq!(specific.payload(), b"DATA SIZE EXCEED");
    }

    #[test]
    fn test_command_codes() {
        assert_eq!(BurnCommand::from_u16(0x21), Some(BurnCommand::EraseLba));
        assert_eq!(BurnCommand::from_u16(0x12), None);
        assert!(!BurnCommand::None.is_supported());
        assert!(!BurnCommand::Max.is_supported());
        assert!(BurnCommand::WriteLba.is_supported());
        assert_eq!(BurnResult::from_u16(0xFF), Some(BurnResult::ErrorMsg));
    }

    #[test]
    fn test_range_payload() {
        let raw = encode_range(0x10_0000, 0x1000);
        assert_eq!(range_payload(&raw), Ok((0x10_0000, 0x1000)));
        assert_eq!(range_payload(&raw[..8]), Err(BurnError::BadPayloadSize));
    }

    #[test]
    fn test_error_mapping() {
        assert_eq!(Error::from(BurnError::NoMedium), Error::NoMediumBound);
        assert_eq!(Error::from(BurnError::UnknownCommand), Error::UnknownCommand);
        assert_eq!(BurnError::from(HalError::MediumNotFound), BurnError::ProbeFailed);
    }
}
