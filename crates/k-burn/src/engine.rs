// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Burn engine
//!
//! The engine owns the bound medium and a 2 x 128 KiB download buffer. The
//! USB glue feeds every finished bulk-OUT transfer to
//! [`BurnEngine::on_out_complete`] and arms the next OUT request with the
//! length it returns. In command mode each transfer is one packet; after
//! a successful `WriteLba` transfers are raw data until the announced size
//! has been written.
//!
//! ```text
//! Idle --probe--> MediumProbed --get info--> InfoReady
//!                                            |    ^
//!                                  write lba |    | done / error
//!                                            v    |
//!                                            Writing
//! ```

use alloc::boxed::Box;
use alloc::vec;
use alloc::vec::Vec;

use k_common::constants::{
    BURN_INTERFACE_CLASS, BURN_INTERFACE_PROTOCOL, BURN_INTERFACE_SUBCLASS,
};
use k_common::{log_debug, log_error, log_info, log_warn};
use k_common::{BurnConfig, LogBuffer, MediumKind, Result};
use k_hal::{probe, BulkInEndpoint, MediumInfo, MediumProvider, StorageMedium, TimerInterface};

use crate::packet::{encode_range, range_payload, BurnCommand, BurnError, BurnPacket, BurnResult};

const LOG_MODULE: &str = "burn";

/// Answer to the vendor identification request
pub const VENDOR_MARK: &str = "Uboot Stage for K230";

const REQUEST_TYPE_MASK: u8 = 0x60;
const REQUEST_TYPE_VENDOR: u8 = 0x40;

/// Interface class triple of the burn function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InterfaceClass {
    /// `bInterfaceClass`
    pub class: u8,
    /// `bInterfaceSubClass`
    pub subclass: u8,
    /// `bInterfaceProtocol`
    pub protocol: u8,
}

/// Vendor-specific class the host tool matches on
pub const BURN_INTERFACE: InterfaceClass = InterfaceClass {
    class: BURN_INTERFACE_CLASS,
    subclass: BURN_INTERFACE_SUBCLASS,
    protocol: BURN_INTERFACE_PROTOCOL,
};

// =============================================================================
// Types
// =============================================================================

/// Engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BurnState {
    /// No medium bound
    Idle,
    /// Medium bound, geometry not queried
    MediumProbed,
    /// Geometry known, writes accepted
    InfoReady,
    /// Receiving raw data
    Writing,
    /// Erase in progress
    Erasing,
}

impl BurnState {
    /// Short name
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::MediumProbed => "probed",
            Self::InfoReady => "ready",
            Self::Writing => "writing",
            Self::Erasing => "erasing",
        }
    }
}

/// Completion status of an OUT transfer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    /// Data arrived
    Complete,
    /// The controller reported an error
    Failed,
}

/// Standard control request header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlRequest {
    /// `bmRequestType`
    pub request_type: u8,
    /// `bRequest`
    pub request: u8,
    /// `wValue`
    pub value: u16,
    /// `wIndex`
    pub index: u16,
    /// `wLength`
    pub length: u16,
}

#[derive(Debug, Clone, Copy)]
struct Download {
    offset: u64,
    size: u64,
    received: u64,
}

// =============================================================================
// Engine
// =============================================================================

/// USB burn protocol engine
pub struct BurnEngine<P, B, T> {
    config: BurnConfig,
    provider: P,
    endpoint: B,
    timer: T,
    medium: Option<Box<dyn StorageMedium>>,
    info: MediumInfo,
    state: BurnState,
    download: Option<Download>,
    buffer: Vec<u8>,
    half: usize,
    request_len: usize,
    log: LogBuffer,
}

impl<P, B, T> BurnEngine<P, B, T>
where
    P: MediumProvider,
    B: BulkInEndpoint,
    T: TimerInterface,
{
    /// Create an engine in command mode with no medium bound
    ///
    /// # Errors
    ///
    /// Returns [`k_common::Error::InvalidParameter`] if `config` does not
    /// validate.
    pub fn new(config: BurnConfig, provider: P, endpoint: B, timer: T) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            provider,
            endpoint,
            timer,
            medium: None,
            info: MediumInfo::INVALID,
            state: BurnState::Idle,
            download: None,
            buffer: vec![0u8; 2 * config.ep_buffer_size],
            half: 0,
            request_len: config.ep_buffer_size,
            log: LogBuffer::with_min_level(config.min_log_level),
        })
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> BurnState {
        self.state
    }

    /// Last medium info reported
    #[must_use]
    pub const fn info(&self) -> &MediumInfo {
        &self.info
    }

    /// Length of the armed OUT request
    #[must_use]
    pub const fn request_len(&self) -> usize {
        self.request_len
    }

    /// Whether a medium is bound
    #[must_use]
    pub const fn is_bound(&self) -> bool {
        self.medium.is_some()
    }

    /// Protocol log
    #[must_use]
    pub const fn log(&self) -> &LogBuffer {
        &self.log
    }

    /// IN endpoint
    #[must_use]
    pub const fn endpoint(&self) -> &B {
        &self.endpoint
    }

    /// Medium provider
    #[must_use]
    pub const fn provider(&self) -> &P {
        &self.provider
    }

    /// Drop the medium and any download, as on a bus reset
    pub fn disconnect(&mut self) {
        self.release_medium();
        self.request_len = self.config.ep_buffer_size;
        let ts = self.timer.get_millis();
        log_info!(self.log, ts, LOG_MODULE, "disconnected");
    }

    /// Handle a finished bulk-OUT transfer and return the length to arm
    /// the next OUT request with
    pub fn on_out_complete(&mut self, status: TransferStatus, data: &[u8]) -> usize {
        let next = if self.download.is_some() {
            self.on_data(status, data)
        } else {
            self.on_command(status, data)
        };
        self.request_len = next;
        next
    }

    /// Answer a vendor control request, returning the reply length
    ///
    /// Only the identification request (index 0, value 0) has data; every
    /// other request gets an empty reply.
    pub fn vendor_setup(&mut self, request: &ControlRequest, out: &mut [u8]) -> usize {
        let ts = self.timer.get_millis();
        log_debug!(
            self.log,
            ts,
            LOG_MODULE,
            "setup type {:#x} index {:#x} value {:#x} length {}",
            request.request_type,
            request.index,
            request.value,
            request.length
        );
        if request.request_type & REQUEST_TYPE_MASK != REQUEST_TYPE_VENDOR
            || request.index != 0
            || request.value != 0
        {
            return 0;
        }
        let mark = VENDOR_MARK.as_bytes();
        let len = mark
            .len()
            .min(usize::from(request.length))
            .min(out.len());
        out[..len].copy_from_slice(&mark[..len]);
        len
    }

    // -------------------------------------------------------------------------
    // Command mode
    // -------------------------------------------------------------------------

    fn on_command(&mut self, status: TransferStatus, data: &[u8]) -> usize {
        let ep = self.config.ep_buffer_size;
        if status == TransferStatus::Failed || data.is_empty() {
            let ts = self.timer.get_millis();
            log_debug!(self.log, ts, LOG_MODULE, "ignored command transfer ({:?})", status);
            return ep;
        }

        let packet = match BurnPacket::decode(data) {
            Ok(packet) => packet,
            Err(e) => {
                self.reply_error(BurnCommand::None, e);
                return ep;
            }
        };
        let Some(command) = packet.command() else {
            let ts = self.timer.get_millis();
            log_warn!(self.log, ts, LOG_MODULE, "unknown command {:#06x}", packet.cmd);
            self.reply_error(BurnCommand::None, BurnError::UnknownCommand);
            return ep;
        };
        if data.len() >= self.request_len {
            self.reply_error(command, BurnError::BufferOverflow);
            return ep;
        }

        let result = match command {
            BurnCommand::DeviceProbe => self.probe_device(packet.payload()),
            BurnCommand::DeviceGetInfo => self.get_info(),
            BurnCommand::WriteLba => self.write_lba(packet.payload()),
            BurnCommand::EraseLba => self.erase_lba(packet.payload()),
            BurnCommand::None | BurnCommand::Max => Err(BurnError::NotSupported),
        };
        if let Err(e) = result {
            self.reply_error(command, e);
        }

        match self.download {
            Some(download) => self.expected_len(&download),
            None => ep,
        }
    }

    fn probe_device(&mut self, payload: &[u8]) -> core::result::Result<(), BurnError> {
        let &[kind, index] = payload else {
            return Err(BurnError::BadPayloadSize);
        };
        self.release_medium();

        let ts = self.timer.get_millis();
        let kind = MediumKind::from_u8(kind).ok_or(BurnError::ProbeFailed)?;
        let medium = match probe(&mut self.provider, kind, index) {
            Ok(medium) => medium,
            Err(e) => {
                log_error!(self.log, ts, LOG_MODULE, "probe {} {}: {}", kind, index, e);
                return Err(BurnError::ProbeFailed);
            }
        };
        self.medium = Some(medium);
        self.set_state(BurnState::MediumProbed);
        log_info!(self.log, ts, LOG_MODULE, "bound {} {}", kind, index);

        let ep = self.config.ep_buffer_size as u64;
        self.reply(&BurnPacket::response(
            BurnCommand::DeviceProbe,
            BurnResult::Ok,
            &ep.to_le_bytes(),
        )?);
        Ok(())
    }

    fn get_info(&mut self) -> core::result::Result<(), BurnError> {
        let medium = self.medium.as_mut().ok_or(BurnError::NoMedium)?;
        let result = match medium.info() {
            Ok(info) => {
                self.info = info;
                self.set_state(BurnState::InfoReady);
                BurnResult::Ok
            }
            Err(e) => {
                self.info = MediumInfo::INVALID;
                let ts = self.timer.get_millis();
                log_error!(self.log, ts, LOG_MODULE, "medium info: {}", e);
                BurnResult::Error
            }
        };
        self.reply(&BurnPacket::response(
            BurnCommand::DeviceGetInfo,
            result,
            &self.info.to_bytes(),
        )?);
        Ok(())
    }

    fn write_lba(&mut self, payload: &[u8]) -> core::result::Result<(), BurnError> {
        let (offset, size) = range_payload(payload)?;
        if self.medium.is_none() {
            return Err(BurnError::NoMedium);
        }
        if !self.info.valid {
            return Err(BurnError::MediumInfoInvalid);
        }
        if size == 0 {
            return Err(BurnError::EmptyWrite);
        }
        if !self.info.contains(offset, size) {
            return Err(BurnError::CapacityExceeded);
        }

        self.download = Some(Download {
            offset,
            size,
            received: 0,
        });
        self.half = 0;
        self.set_state(BurnState::Writing);
        let ts = self.timer.get_millis();
        log_info!(self.log, ts, LOG_MODULE, "write {:#x} bytes at {:#x}", size, offset);

        self.reply(&BurnPacket::response(
            BurnCommand::WriteLba,
            BurnResult::Ok,
            b"START DL",
        )?);
        Ok(())
    }

    fn erase_lba(&mut self, payload: &[u8]) -> core::result::Result<(), BurnError> {
        let (offset, size) = range_payload(payload)?;
        if self.medium.is_none() {
            return Err(BurnError::NoMedium);
        }

        let mut result = BurnResult::Ok;
        if size != 0 {
            self.set_state(BurnState::Erasing);
            let erased = match self.medium.as_mut() {
                Some(medium) => medium.erase(offset, size),
                None => return Err(BurnError::NoMedium),
            };
            let ts = self.timer.get_millis();
            match erased {
                Ok(()) => {
                    log_info!(self.log, ts, LOG_MODULE, "erased {:#x} bytes at {:#x}", size, offset);
                }
                Err(e) => {
                    log_error!(self.log, ts, LOG_MODULE, "erase at {:#x}: {}", offset, e);
                    result = BurnResult::Error;
                }
            }
            self.set_state(self.settled_state());
        }

        self.reply(&BurnPacket::response(
            BurnCommand::EraseLba,
            result,
            &encode_range(offset, size),
        )?);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Streaming mode
    // -------------------------------------------------------------------------

    fn on_data(&mut self, status: TransferStatus, data: &[u8]) -> usize {
        match self.stream(status, data) {
            Ok(Some(download)) => self.expected_len(&download),
            Ok(None) => {
                self.finish_download();
                let ts = self.timer.get_millis();
                log_info!(self.log, ts, LOG_MODULE, "write done");
                if let Ok(packet) =
                    BurnPacket::response(BurnCommand::WriteLba, BurnResult::Ok, b"WRITE DONE")
                {
                    self.reply(&packet);
                }
                self.config.ep_buffer_size
            }
            Err(e) => {
                self.finish_download();
                let ts = self.timer.get_millis();
                log_error!(self.log, ts, LOG_MODULE, "download aborted: {}", e);
                self.reply_error(BurnCommand::WriteLba, e);
                self.config.ep_buffer_size
            }
        }
    }

    /// Write one transfer; returns the download if more data is due
    fn stream(
        &mut self,
        status: TransferStatus,
        data: &[u8],
    ) -> core::result::Result<Option<Download>, BurnError> {
        let mut download = self.download.ok_or(BurnError::NoMedium)?;
        if status == TransferStatus::Failed {
            return Err(BurnError::TransferFailed);
        }

        let ep = self.config.ep_buffer_size;
        let remaining = usize::try_from(download.size - download.received).unwrap_or(usize::MAX);
        let take = remaining.min(data.len()).min(ep);
        if take > 0 {
            let start = self.half * ep;
            let chunk = &mut self.buffer[start..start + take];
            chunk.copy_from_slice(&data[..take]);
            let medium = self.medium.as_mut().ok_or(BurnError::NoMedium)?;
            medium
                .write(download.offset, chunk)
                .map_err(|_| BurnError::WriteFailed)?;

            download.offset += take as u64;
            download.received += take as u64;
            self.half ^= 1;
        }

        if download.received >= download.size {
            return Ok(None);
        }
        self.download = Some(download);
        Ok(Some(download))
    }

    /// Next OUT length: the rest of the download, capped at one buffer half
    /// and rounded up to whole packets
    fn expected_len(&self, download: &Download) -> usize {
        let ep = self.config.ep_buffer_size;
        let remaining = download.size - download.received;
        if remaining == 0 {
            return 0;
        }
        match usize::try_from(remaining) {
            Ok(remaining) if remaining <= ep => {
                remaining.div_ceil(self.config.max_packet_size) * self.config.max_packet_size
            }
            _ => ep,
        }
    }

    fn finish_download(&mut self) {
        self.download = None;
        self.half = 0;
        self.set_state(self.settled_state());
    }

    // -------------------------------------------------------------------------
    // Helpers
    // -------------------------------------------------------------------------

    fn release_medium(&mut self) {
        if self.medium.take().is_some() {
            let ts = self.timer.get_millis();
            log_info!(self.log, ts, LOG_MODULE, "medium released");
        }
        self.info = MediumInfo::INVALID;
        self.download = None;
        self.half = 0;
        self.set_state(BurnState::Idle);
    }

    /// State outside a transfer
    fn settled_state(&self) -> BurnState {
        match (&self.medium, self.info.valid) {
            (None, _) => BurnState::Idle,
            (Some(_), false) => BurnState::MediumProbed,
            (Some(_), true) => BurnState::InfoReady,
        }
    }

    fn set_state(&mut self, state: BurnState) {
        if self.state != state {
            let ts = self.timer.get_millis();
            log_debug!(
                self.log,
                ts,
                LOG_MODULE,
                "{} -> {}",
                self.state.name(),
                state.name()
            );
            self.state = state;
        }
    }

    fn reply(&mut self, packet: &BurnPacket) {
        if let Err(e) = self.endpoint.send(&packet.encode()) {
            let ts = self.timer.get_millis();
            log_error!(self.log, ts, LOG_MODULE, "reply {:#06x}: {}", packet.cmd, e);
        }
    }

    fn reply_error(&mut self, command: BurnCommand, error: BurnError) {
        let ts = self.timer.get_millis();
        log_warn!(self.log, ts, LOG_MODULE, "{:?}: {}", command, error);
        self.reply(&BurnPacket::error(command, error));
    }
}
