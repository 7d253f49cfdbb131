// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! K230 Boot Cryptography
//!
//! This crate provides the primitives the firmware container verifier
//! needs, built on the RustCrypto crates:
//!
//! ## Hash Functions
//! - SHA-256
//! - SM3
//!
//! ## Signatures (verification only)
//! - RSA-2048 PKCS#1 v1.5 with SHA-256
//! - SM2 with a distinguishing identifier
//!
//! ## Ciphers
//! - AES-256-GCM (detached tag)
//! - SM4-CBC (no padding)
//!
//! Device keys never leave the [`engine::SecurityEngine`]; the verifier
//! only names the slot a key lives in.

#![no_std]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

extern crate alloc;

pub mod aead;
pub mod cipher;
pub mod engine;
pub mod error;
pub mod hash;
pub mod signature;
pub mod traits;

pub use engine::{KeySlot, SecurityEngine, SoftEngine};
pub use error::{CryptoError, CryptoResult};
pub use traits::{constant_time_eq, is_zero, Hash};
