// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! K230 USB Burn Protocol
//!
//! Production flashing over a vendor-specific bulk interface:
//!
//! - **Packet**: the 64-byte command/response codec
//! - **Engine**: medium binding, geometry queries, streamed writes and
//!   erases
//!
//! Descriptor negotiation and endpoint allocation belong to the USB stack;
//! this crate only sees completed OUT transfers and queues IN transfers
//! through [`k_hal::BulkInEndpoint`].

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

extern crate alloc;

pub mod engine;
pub mod packet;

pub use engine::{
    BurnEngine, BurnState, ControlRequest, InterfaceClass, TransferStatus, BURN_INTERFACE,
    VENDOR_MARK,
};
pub use packet::{BurnCommand, BurnError, BurnPacket, BurnResult, RESPONSE_FLAG};
