// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Simulated OTP fuses

use k_hal::{FuseInterface, HalError, HalResult, PukKind};

use crate::keys;

/// Fuse store
#[derive(Debug, Clone, Default)]
pub struct SimFuses {
    /// RSA public key digest
    pub rsa_puk_digest: [u8; 32],
    /// SM2 public key digest
    pub sm2_puk_digest: [u8; 32],
    /// Product misc bit 0
    pub forbid_unauthenticated: bool,
    /// Make every read fail
    pub fail_reads: bool,
    reads: usize,
}

impl SimFuses {
    /// Blank fuses: no keys, unauthenticated boot allowed
    #[must_use]
    pub fn blank() -> Self {
        Self::default()
    }

    /// Fuses provisioned with the digests of the test keys
    #[must_use]
    pub fn provisioned() -> Self {
        Self {
            rsa_puk_digest: keys::rsa_puk_digest(),
            sm2_puk_digest: keys::sm2_puk_digest(),
            forbid_unauthenticated: true,
            ..Self::default()
        }
    }

    /// Number of fuse reads served
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads
    }
}

impl FuseInterface for SimFuses {
    fn read_puk_digest(&mut self, kind: PukKind) -> HalResult<[u8; 32]> {
        self.reads += 1;
        if self.fail_reads {
            return Err(HalError::FuseReadFailed);
        }
        Ok(match kind {
            PukKind::Rsa => self.rsa_puk_digest,
            PukKind::Sm2 => self.sm2_puk_digest,
        })
    }

    fn unauthenticated_boot_forbidden(&mut self) -> HalResult<bool> {
        self.reads += 1;
        if self.fail_reads {
            return Err(HalError::FuseReadFailed);
        }
        Ok(self.forbid_unauthenticated)
    }
}
