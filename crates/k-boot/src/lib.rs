// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! K230 Secure Boot Pipeline
//!
//! This crate turns a signed firmware container on a boot medium into a
//! running image:
//!
//! - **Header**: the 528-byte firmware container header
//! - **Verify**: key-digest, signature and decryption checks
//! - **Decompress**: the hardware gzip engine and its DMA descriptor chains
//! - **uImage**: the legacy image header inside the plaintext
//! - **Load**: the stage machine from medium to hand-off

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

extern crate alloc;

pub mod decompress;
pub mod header;
pub mod load;
pub mod uimage;
pub mod verify;

pub use decompress::{inflate, InflateError};
pub use header::{CryptoType, FirmwareHeader};
pub use load::{release_big_core, BootCommand, BootFailure, BootLoader, BootOutcome, BootStage};
pub use uimage::{ImageCompression, UImageHeader};
pub use verify::{authenticate, Plaintext, Scratch, VerifyError};
