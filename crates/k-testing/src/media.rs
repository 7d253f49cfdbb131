// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Simulated storage devices
//!
//! Contents are kept in a sparse store so large capacities cost nothing
//! until written. Every device logs the operations it served and can be
//! told to fail. Handles are cheap clones over shared state: hand one to
//! the code under test and keep another for assertions.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use k_hal::medium::{BlockDevice, MediumProvider, NandFlashDevice, NorFlashDevice};
use k_hal::{HalError, HalResult};

/// Granularity of the sparse store
const CHUNK: u64 = 4096;

/// Operation served by a simulated device, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediumOp {
    /// Read
    Read {
        /// Byte offset
        offset: u64,
        /// Byte count
        len: u64,
    },
    /// Program
    Write {
        /// Byte offset
        offset: u64,
        /// Byte count
        len: u64,
    },
    /// Erase
    Erase {
        /// Byte offset
        offset: u64,
        /// Byte count
        len: u64,
    },
    /// Write protection lifted
    Unlock,
    /// Write protection restored
    Lock,
}

impl MediumOp {
    /// Whether the operation changes medium contents
    #[must_use]
    pub fn is_mutation(&self) -> bool {
        matches!(self, Self::Write { .. } | Self::Erase { .. })
    }
}

// =============================================================================
// Sparse Store
// =============================================================================

#[derive(Debug, Clone)]
struct SparseStore {
    size: u64,
    fill: u8,
    chunks: HashMap<u64, Vec<u8>>,
}

impl SparseStore {
    fn new(size: u64, fill: u8) -> Self {
        Self {
            size,
            fill,
            chunks: HashMap::new(),
        }
    }

    fn read(&self, offset: u64, buffer: &mut [u8]) {
        for (i, byte) in buffer.iter_mut().enumerate() {
            let addr = offset + i as u64;
            *byte = self
                .chunks
                .get(&(addr / CHUNK))
                .map_or(self.fill, |chunk| chunk[(addr % CHUNK) as usize]);
        }
    }

    fn update(&mut self, offset: u64, len: u64, mut f: impl FnMut(u64, &mut u8)) {
        let fill = self.fill;
        for addr in offset..offset + len {
            let chunk = self
                .chunks
                .entry(addr / CHUNK)
                .or_insert_with(|| vec![fill; CHUNK as usize]);
            f(addr - offset, &mut chunk[(addr % CHUNK) as usize]);
        }
    }

    fn write(&mut self, offset: u64, data: &[u8]) {
        self.update(offset, data.len() as u64, |i, byte| *byte = data[i as usize]);
    }

    /// Flash programming can only clear bits
    fn program(&mut self, offset: u64, data: &[u8]) {
        self.update(offset, data.len() as u64, |i, byte| *byte &= data[i as usize]);
    }

    fn erase(&mut self, offset: u64, len: u64) {
        let fill = self.fill;
        self.update(offset, len, |_, byte| *byte = fill);
    }

    fn contents(&self, offset: u64, len: usize) -> Vec<u8> {
        let mut out = vec![0u8; len];
        self.read(offset, &mut out);
        out
    }
}

fn check_range(offset: u64, len: u64, size: u64) -> HalResult<()> {
    match offset.checked_add(len) {
        Some(end) if end <= size => Ok(()),
        _ => Err(HalError::OutOfRange),
    }
}

/// Failure switches shared by every simulated device
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// Reads fail
    pub read: bool,
    /// Writes fail
    pub write: bool,
    /// Erases fail
    pub erase: bool,
    /// Block transfers move one block fewer than asked
    pub short_transfer: bool,
}

// =============================================================================
// Block Device
// =============================================================================

#[derive(Debug)]
struct BlockState {
    block_size: u32,
    block_count: u64,
    erase_group_blocks: u32,
    write_protected: bool,
    faults: Faults,
    store: SparseStore,
    ops: Vec<MediumOp>,
}

/// Simulated eMMC or SD card
#[derive(Debug, Clone)]
pub struct SimBlockDevice {
    state: Rc<RefCell<BlockState>>,
}

impl SimBlockDevice {
    /// Card of `block_count` blocks of `block_size` bytes
    #[must_use]
    pub fn new(block_size: u32, block_count: u64) -> Self {
        Self {
            state: Rc::new(RefCell::new(BlockState {
                block_size,
                block_count,
                erase_group_blocks: 1024,
                write_protected: false,
                faults: Faults::default(),
                store: SparseStore::new(u64::from(block_size) * block_count, 0),
                ops: Vec::new(),
            })),
        }
    }

    /// Flip the write-protect switch
    pub fn set_write_protected(&self, on: bool) {
        self.state.borrow_mut().write_protected = on;
    }

    /// Set failure switches
    pub fn set_faults(&self, faults: Faults) {
        self.state.borrow_mut().faults = faults;
    }

    /// Place raw bytes without logging
    pub fn preload(&self, offset: u64, data: &[u8]) {
        self.state.borrow_mut().store.write(offset, data);
    }

    /// Raw contents
    #[must_use]
    pub fn contents(&self, offset: u64, len: usize) -> Vec<u8> {
        self.state.borrow().store.contents(offset, len)
    }

    /// Operations served so far
    #[must_use]
    pub fn ops(&self) -> Vec<MediumOp> {
        self.state.borrow().ops.clone()
    }

    fn transfer_count(state: &BlockState, start: u64, bytes: usize) -> HalResult<u64> {
        let block = u64::from(state.block_size);
        let count = bytes as u64 / block;
        if bytes as u64 % block != 0 {
            return Err(HalError::InvalidParameter);
        }
        check_range(start, count, state.block_count)?;
        Ok(count)
    }
}

impl BlockDevice for SimBlockDevice {
    fn block_size(&self) -> u32 {
        self.state.borrow().block_size
    }

    fn block_count(&self) -> u64 {
        self.state.borrow().block_count
    }

    fn erase_group_blocks(&self) -> u32 {
        self.state.borrow().erase_group_blocks
    }

    fn is_write_protected(&self) -> bool {
        self.state.borrow().write_protected
    }

    fn read_blocks(&mut self, start: u64, buffer: &mut [u8]) -> HalResult<u64> {
        let mut state = self.state.borrow_mut();
        let count = Self::transfer_count(&state, start, buffer.len())?;
        let block = u64::from(state.block_size);
        state.ops.push(MediumOp::Read { offset: start * block, len: count * block });
        if state.faults.read {
            return Err(HalError::ReadFailed);
        }
        state.store.read(start * block, buffer);
        Ok(if state.faults.short_transfer { count.saturating_sub(1) } else { count })
    }

    fn write_blocks(&mut self, start: u64, data: &[u8]) -> HalResult<u64> {
        let mut state = self.state.borrow_mut();
        let count = Self::transfer_count(&state, start, data.len())?;
        let block = u64::from(state.block_size);
        state.ops.push(MediumOp::Write { offset: start * block, len: count * block });
        if state.faults.write {
            return Err(HalError::WriteFailed);
        }
        state.store.write(start * block, data);
        Ok(if state.faults.short_transfer { count.saturating_sub(1) } else { count })
    }

    fn erase_blocks(&mut self, start: u64, count: u64) -> HalResult<u64> {
        let mut state = self.state.borrow_mut();
        check_range(start, count, state.block_count)?;
        let block = u64::from(state.block_size);
        state.ops.push(MediumOp::Erase { offset: start * block, len: count * block });
        if state.faults.erase {
            return Err(HalError::EraseFailed);
        }
        state.store.erase(start * block, count * block);
        Ok(count)
    }
}

// =============================================================================
// NOR Flash
// =============================================================================

#[derive(Debug)]
struct NorState {
    erase_size: u32,
    page_size: u32,
    faults: Faults,
    store: SparseStore,
    ops: Vec<MediumOp>,
}

/// Simulated SPI NOR flash
#[derive(Debug, Clone)]
pub struct SimNorFlash {
    state: Rc<RefCell<NorState>>,
}

impl SimNorFlash {
    /// Flash of `size` bytes with 4 KiB sectors and 256-byte pages
    #[must_use]
    pub fn new(size: u64) -> Self {
        Self::with_geometry(size, 4096, 256)
    }

    /// Flash with explicit geometry
    #[must_use]
    pub fn with_geometry(size: u64, erase_size: u32, page_size: u32) -> Self {
        Self {
            state: Rc::new(RefCell::new(NorState {
                erase_size,
                page_size,
                faults: Faults::default(),
                store: SparseStore::new(size, 0xFF),
                ops: Vec::new(),
            })),
        }
    }

    /// Set failure switches
    pub fn set_faults(&self, faults: Faults) {
        self.state.borrow_mut().faults = faults;
    }

    /// Place raw bytes without logging
    pub fn preload(&self, offset: u64, data: &[u8]) {
        self.state.borrow_mut().store.write(offset, data);
    }

    /// Raw contents
    #[must_use]
    pub fn contents(&self, offset: u64, len: usize) -> Vec<u8> {
        self.state.borrow().store.contents(offset, len)
    }

    /// Operations served so far
    #[must_use]
    pub fn ops(&self) -> Vec<MediumOp> {
        self.state.borrow().ops.clone()
    }
}

impl NorFlashDevice for SimNorFlash {
    fn size(&self) -> u64 {
        self.state.borrow().store.size
    }

    fn erase_size(&self) -> u32 {
        self.state.borrow().erase_size
    }

    fn page_size(&self) -> u32 {
        self.state.borrow().page_size
    }

    fn read(&mut self, offset: u64, buffer: &mut [u8]) -> HalResult<()> {
        let mut state = self.state.borrow_mut();
        check_range(offset, buffer.len() as u64, state.store.size)?;
        state.ops.push(MediumOp::Read { offset, len: buffer.len() as u64 });
        if state.faults.read {
            return Err(HalError::ReadFailed);
        }
        state.store.read(offset, buffer);
        Ok(())
    }

    fn write(&mut self, offset: u64, data: &[u8]) -> HalResult<()> {
        let mut state = self.state.borrow_mut();
        check_range(offset, data.len() as u64, state.store.size)?;
        state.ops.push(MediumOp::Write { offset, len: data.len() as u64 });
        if state.faults.write {
            return Err(HalError::WriteFailed);
        }
        state.store.program(offset, data);
        Ok(())
    }

    fn erase(&mut self, offset: u64, len: u64) -> HalResult<()> {
        let mut state = self.state.borrow_mut();
        let sector = u64::from(state.erase_size);
        if offset % sector != 0 || len % sector != 0 {
            return Err(HalError::Unaligned);
        }
        check_range(offset, len, state.store.size)?;
        state.ops.push(MediumOp::Erase { offset, len });
        if state.faults.erase {
            return Err(HalError::EraseFailed);
        }
        state.store.erase(offset, len);
        Ok(())
    }
}

// =============================================================================
// NAND Flash
// =============================================================================

#[derive(Debug)]
struct NandState {
    erase_size: u32,
    page_size: u32,
    bad_blocks: BTreeSet<u64>,
    supports_lock: bool,
    locked: bool,
    faults: Faults,
    store: SparseStore,
    ops: Vec<MediumOp>,
}

/// Simulated SPI NAND flash
#[derive(Debug, Clone)]
pub struct SimNandFlash {
    state: Rc<RefCell<NandState>>,
}

impl SimNandFlash {
    /// Flash of `size` bytes with 128 KiB blocks and 2 KiB pages
    #[must_use]
    pub fn new(size: u64) -> Self {
        Self::with_geometry(size, 128 * 1024, 2048)
    }

    /// Flash with explicit geometry
    #[must_use]
    pub fn with_geometry(size: u64, erase_size: u32, page_size: u32) -> Self {
        Self {
            state: Rc::new(RefCell::new(NandState {
                erase_size,
                page_size,
                bad_blocks: BTreeSet::new(),
                supports_lock: true,
                locked: true,
                faults: Faults::default(),
                store: SparseStore::new(size, 0xFF),
                ops: Vec::new(),
            })),
        }
    }

    /// Mark erase block number `block` bad
    pub fn mark_bad(&self, block: u64) {
        self.state.borrow_mut().bad_blocks.insert(block);
    }

    /// Devices without block protection reject lock and unlock
    pub fn set_supports_lock(&self, on: bool) {
        self.state.borrow_mut().supports_lock = on;
    }

    /// Whether block protection is currently engaged
    #[must_use]
    pub fn is_locked(&self) -> bool {
        self.state.borrow().locked
    }

    /// Set failure switches
    pub fn set_faults(&self, faults: Faults) {
        self.state.borrow_mut().faults = faults;
    }

    /// Place raw bytes without logging
    pub fn preload(&self, offset: u64, data: &[u8]) {
        self.state.borrow_mut().store.write(offset, data);
    }

    /// Raw contents
    #[must_use]
    pub fn contents(&self, offset: u64, len: usize) -> Vec<u8> {
        self.state.borrow().store.contents(offset, len)
    }

    /// Operations served so far
    #[must_use]
    pub fn ops(&self) -> Vec<MediumOp> {
        self.state.borrow().ops.clone()
    }

    fn check_page(state: &NandState, offset: u64, len: usize) -> HalResult<()> {
        if offset % u64::from(state.page_size) != 0 || len > state.page_size as usize {
            return Err(HalError::Unaligned);
        }
        check_range(offset, len as u64, state.store.size)?;
        if state.bad_blocks.contains(&(offset / u64::from(state.erase_size))) {
            return Err(HalError::BadBlock);
        }
        Ok(())
    }
}

impl NandFlashDevice for SimNandFlash {
    fn size(&self) -> u64 {
        self.state.borrow().store.size
    }

    fn erase_size(&self) -> u32 {
        self.state.borrow().erase_size
    }

    fn write_size(&self) -> u32 {
        self.state.borrow().page_size
    }

    fn is_bad_block(&mut self, offset: u64) -> bool {
        let state = self.state.borrow();
        state.bad_blocks.contains(&(offset / u64::from(state.erase_size)))
    }

    fn read_page(&mut self, offset: u64, buffer: &mut [u8]) -> HalResult<()> {
        let mut state = self.state.borrow_mut();
        Self::check_page(&state, offset, buffer.len())?;
        state.ops.push(MediumOp::Read { offset, len: buffer.len() as u64 });
        if state.faults.read {
            return Err(HalError::ReadFailed);
        }
        state.store.read(offset, buffer);
        Ok(())
    }

    fn write_page(&mut self, offset: u64, data: &[u8]) -> HalResult<()> {
        let mut state = self.state.borrow_mut();
        Self::check_page(&state, offset, data.len())?;
        if state.locked && state.supports_lock {
            return Err(HalError::WriteProtected);
        }
        state.ops.push(MediumOp::Write { offset, len: data.len() as u64 });
        if state.faults.write {
            return Err(HalError::WriteFailed);
        }
        state.store.program(offset, data);
        Ok(())
    }

    fn erase_block(&mut self, offset: u64) -> HalResult<()> {
        let mut state = self.state.borrow_mut();
        let block = u64::from(state.erase_size);
        if offset % block != 0 {
            return Err(HalError::Unaligned);
        }
        check_range(offset, block, state.store.size)?;
        if state.bad_blocks.contains(&(offset / block)) {
            return Err(HalError::BadBlock);
        }
        if state.locked && state.supports_lock {
            return Err(HalError::WriteProtected);
        }
        state.ops.push(MediumOp::Erase { offset, len: block });
        if state.faults.erase {
            return Err(HalError::EraseFailed);
        }
        state.store.erase(offset, block);
        Ok(())
    }

    fn unlock(&mut self, _offset: u64, _len: u64) -> HalResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.supports_lock {
            return Err(HalError::NotSupported);
        }
        state.ops.push(MediumOp::Unlock);
        state.locked = false;
        Ok(())
    }

    fn lock(&mut self, _offset: u64, _len: u64) -> HalResult<()> {
        let mut state = self.state.borrow_mut();
        if !state.supports_lock {
            return Err(HalError::NotSupported);
        }
        state.ops.push(MediumOp::Lock);
        state.locked = true;
        Ok(())
    }
}

// =============================================================================
// Provider
// =============================================================================

/// Board with a configurable set of storage devices
#[derive(Debug, Clone, Default)]
pub struct SimProvider {
    mmc: [Option<SimBlockDevice>; 2],
    nor: Vec<SimNorFlash>,
    nand: Vec<SimNandFlash>,
    probes: usize,
}

impl SimProvider {
    /// Board with no storage at all
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach an eMMC on MMC controller 0
    #[must_use]
    pub fn with_emmc(mut self, device: SimBlockDevice) -> Self {
        self.mmc[0] = Some(device);
        self
    }

    /// Attach an SD card on MMC controller 1
    #[must_use]
    pub fn with_sd(mut self, device: SimBlockDevice) -> Self {
        self.mmc[1] = Some(device);
        self
    }

    /// Attach the next NOR flash
    #[must_use]
    pub fn with_nor(mut self, device: SimNorFlash) -> Self {
        self.nor.push(device);
        self
    }

    /// Attach the next NAND flash
    #[must_use]
    pub fn with_nand(mut self, device: SimNandFlash) -> Self {
        self.nand.push(device);
        self
    }

    /// Device requests served, including failed ones
    #[must_use]
    pub fn probes(&self) -> usize {
        self.probes
    }
}

impl MediumProvider for SimProvider {
    fn block_device(&mut self, bus: u8) -> Option<Box<dyn BlockDevice>> {
        self.probes += 1;
        let device = self.mmc.get(usize::from(bus))?.clone()?;
        Some(Box::new(device))
    }

    fn nor_flash(&mut self, index: u8) -> Option<Box<dyn NorFlashDevice>> {
        self.probes += 1;
        let device = self.nor.get(usize::from(index))?.clone();
        Some(Box::new(device))
    }

    fn nand_flash(&mut self, index: u8) -> Option<Box<dyn NandFlashDevice>> {
        self.probes += 1;
        let device = self.nand.get(usize::from(index))?.clone();
        Some(Box::new(device))
    }
}
