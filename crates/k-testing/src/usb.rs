// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Simulated bulk-IN endpoint

use std::cell::RefCell;
use std::rc::Rc;

use k_hal::{BulkInEndpoint, HalError, HalResult};

#[derive(Debug, Default)]
struct BulkState {
    sent: Vec<Vec<u8>>,
    failing: bool,
}

/// Records every transfer queued on it
#[derive(Debug, Clone, Default)]
pub struct SimBulkIn {
    state: Rc<RefCell<BulkState>>,
}

impl SimBulkIn {
    /// Empty endpoint
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every queue attempt fail
    pub fn set_failing(&self, on: bool) {
        self.state.borrow_mut().failing = on;
    }

    /// Transfers queued so far, oldest first
    #[must_use]
    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.state.borrow().sent.clone()
    }

    /// Most recent transfer
    #[must_use]
    pub fn last(&self) -> Option<Vec<u8>> {
        self.state.borrow().sent.last().cloned()
    }

    /// Forget recorded transfers
    pub fn clear(&self) {
        self.state.borrow_mut().sent.clear();
    }
}

impl BulkInEndpoint for SimBulkIn {
    fn send(&mut self, data: &[u8]) -> HalResult<()> {
        let mut state = self.state.borrow_mut();
        if state.failing {
            return Err(HalError::HardwareFault);
        }
        state.sent.push(data.to_vec());
        Ok(())
    }
}
