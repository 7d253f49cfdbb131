// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for k-hal
//!
//! Storage drivers run against the simulated devices from `k-testing`.

use k_common::MediumKind;
use k_hal::{probe, HalError, Platform};
use k_testing::{
    random_bytes, MediumOp, SimBlockDevice, SimNandFlash, SimNorFlash, SimProvider,
};

mod platform_tests {
    use super::*;

    #[test]
    fn test_host_platform() {
        assert_eq!(Platform::current(), Platform::Simulation);
        assert!(!Platform::Simulation.has_big_core());
        assert!(Platform::K230.has_big_core());
    }
}

// =============================================================================
// Probe
// =============================================================================

mod probe_tests {
    use super::*;

    #[test]
    fn test_probe_by_kind() {
        let mut provider = SimProvider::new()
            .with_emmc(SimBlockDevice::new(512, 1024))
            .with_sd(SimBlockDevice::new(512, 2048))
            .with_nor(SimNorFlash::new(1 << 20))
            .with_nand(SimNandFlash::new(4 << 20));

        for kind in [
            MediumKind::Emmc,
            MediumKind::SdCard,
            MediumKind::SpiNor,
            MediumKind::SpiNand,
        ] {
            let medium = probe(&mut provider, kind, 0).unwrap();
            assert_eq!(medium.kind(), kind);
        }
        assert_eq!(provider.probes(), 4);
    }

    #[test]
    fn test_probe_missing_device() {
        let mut provider = SimProvider::new().with_emmc(SimBlockDevice::new(512, 1024));
        assert_eq!(
            probe(&mut provider, MediumKind::SdCard, 0).err(),
            Some(HalError::MediumNotFound)
        );
        assert_eq!(
            probe(&mut provider, MediumKind::SpiNor, 1).err(),
            Some(HalError::MediumNotFound)
        );
    }

    #[test]
    fn test_otp_is_not_a_medium() {
        let mut provider = SimProvider::new();
        assert_eq!(
            probe(&mut provider, MediumKind::Otp, 0).err(),
            Some(HalError::MediumNotFound)
        );
        assert_eq!(provider.probes(), 0);
    }
}

// =============================================================================
// MMC
// =============================================================================

mod mmc_tests {
    use super::*;

    #[test]
    fn test_info() {
        let card = SimBlockDevice::new(512, 0x8_0000);
        let mut provider = SimProvider::new().with_emmc(card);
        let info = probe(&mut provider, MediumKind::Emmc, 0).unwrap().info().unwrap();

        assert_eq!(info.capacity, 0x1000_0000);
        assert_eq!(info.block_size, 512);
        assert_eq!(info.erase_size, 512 * 1024);
        assert_eq!(info.kind, MediumKind::Emmc);
        assert!(info.valid);
        assert!(!info.write_protect);
    }

    #[test]
    fn test_partial_tail_is_padded() {
        let card = SimBlockDevice::new(512, 1024);
        card.preload(0, &[0xEE; 1024]);
        let mut provider = SimProvider::new().with_sd(card.clone());
        let mut medium = probe(&mut provider, MediumKind::SdCard, 0).unwrap();

        medium.write(0, &[0x11; 700]).unwrap();
        let raw = card.contents(0, 1024);
        assert!(raw[..700].iter().all(|&b| b == 0x11));
        assert!(raw[700..].iter().all(|&b| b == 0));
        assert_eq!(card.ops(), vec![MediumOp::Write { offset: 0, len: 1024 }]);
    }

    #[test]
    fn test_read_back() {
        let card = SimBlockDevice::new(512, 1024);
        let data = random_bytes(3000, 4);
        card.preload(4096, &data);
        let mut provider = SimProvider::new().with_sd(card);
        let mut medium = probe(&mut provider, MediumKind::SdCard, 0).unwrap();

        let mut buffer = vec![0u8; 3000];
        medium.read(4096, &mut buffer).unwrap();
        assert_eq!(buffer, data);
    }

    #[test]
    fn test_unaligned_and_out_of_range() {
        let mut provider = SimProvider::new().with_sd(SimBlockDevice::new(512, 8));
        let mut medium = probe(&mut provider, MediumKind::SdCard, 0).unwrap();

        assert_eq!(medium.write(100, &[0; 512]), Err(HalError::Unaligned));
        assert_eq!(medium.write(3584, &[0; 1024]), Err(HalError::OutOfRange));
        assert_eq!(medium.erase(0, 8 * 512 + 1), Err(HalError::OutOfRange));
    }

    #[test]
    fn test_write_protect() {
        let card = SimBlockDevice::new(512, 64);
        card.set_write_protected(true);
        let mut provider = SimProvider::new().with_sd(card.clone());
        let mut medium = probe(&mut provider, MediumKind::SdCard, 0).unwrap();

        assert!(medium.info().unwrap().write_protect);
        assert_eq!(medium.write(0, &[1; 512]), Err(HalError::WriteProtected));
        assert_eq!(medium.erase(0, 512), Err(HalError::WriteProtected));
        assert!(card.ops().is_empty());
    }
}

// =============================================================================
// NOR
// =============================================================================

mod nor_tests {
    use super::*;

    #[test]
    fn test_write_erases_first() {
        let flash = SimNorFlash::new(1 << 20);
        flash.preload(0x2000, &[0x00; 0x1000]);
        let mut provider = SimProvider::new().with_nor(flash.clone());
        let mut medium = probe(&mut provider, MediumKind::SpiNor, 0).unwrap();
        let data = random_bytes(0x2000, 5);

        medium.write(0x2000, &data).unwrap();
        assert_eq!(flash.contents(0x2000, 0x2000), data);
        assert_eq!(flash.ops()[0], MediumOp::Erase { offset: 0x2000, len: 0x2000 });
    }

    #[test]
    fn test_blank_chunks_are_not_programmed() {
        let flash = SimNorFlash::new(1 << 20);
        let mut provider = SimProvider::new().with_nor(flash.clone());
        let mut medium = probe(&mut provider, MediumKind::SpiNor, 0).unwrap();
        let mut data = vec![0xFF; 0x2000];
        data[0x1000] = 0;

        medium.write(0, &data).unwrap();
        let writes: Vec<_> = flash.ops().into_iter().filter(MediumOp::is_mutation).collect();
        assert_eq!(
            writes,
            vec![
                MediumOp::Erase { offset: 0, len: 0x2000 },
                MediumOp::Write { offset: 0x1000, len: 0x1000 },
            ]
        );
    }

    #[test]
    fn test_alignment() {
        let mut provider = SimProvider::new().with_nor(SimNorFlash::new(1 << 20));
        let mut medium = probe(&mut provider, MediumKind::SpiNor, 0).unwrap();

        assert_eq!(medium.write(0x800, &[0; 0x1000]), Err(HalError::Unaligned));
        assert_eq!(medium.erase(0, 0x800), Err(HalError::Unaligned));
        // reads have no alignment requirement
        let mut buffer = [0u8; 3];
        assert!(medium.read(0x801, &mut buffer).is_ok());
        assert_eq!(buffer, [0xFF; 3]);
    }
}

// =============================================================================
// NAND
// =============================================================================

mod nand_tests {
    use super::*;

    const BLOCK: usize = 128 * 1024;

    fn medium(flash: &SimNandFlash) -> Box<dyn k_hal::StorageMedium> {
        let mut provider = SimProvider::new().with_nand(flash.clone());
        probe(&mut provider, MediumKind::SpiNand, 0).unwrap()
    }

    #[test]
    fn test_write_unlocks_and_relocks() {
        let flash = SimNandFlash::new(4 << 20);
        let mut medium = medium(&flash);
        let data = random_bytes(BLOCK, 6);

        medium.write(0, &data).unwrap();
        assert_eq!(flash.contents(0, BLOCK), data);
        assert!(flash.is_locked());
        let ops = flash.ops();
        assert_eq!(ops.first(), Some(&MediumOp::Unlock));
        assert_eq!(ops.last(), Some(&MediumOp::Lock));
    }

    #[test]
    fn test_bad_block_is_skipped_on_write_and_read() {
        let flash = SimNandFlash::new(4 << 20);
        flash.mark_bad(1);
        let mut medium = medium(&flash);
        let data = random_bytes(2 * BLOCK, 7);

        medium.write(0, &data).unwrap();
        assert_eq!(flash.contents(0, BLOCK), data[..BLOCK]);
        assert_eq!(flash.contents(2 * BLOCK as u64, BLOCK), data[BLOCK..]);

        let mut buffer = vec![0u8; 2 * BLOCK];
        medium.read(0, &mut buffer).unwrap();
        assert_eq!(buffer, data);
    }

    #[test]
    fn test_bad_blocks_exhausted() {
        let flash = SimNandFlash::new(2 * BLOCK as u64);
        flash.mark_bad(1);
        let mut medium = medium(&flash);

        assert_eq!(
            medium.write(0, &random_bytes(2 * BLOCK, 8)),
            Err(HalError::BadBlocksExhausted)
        );
        assert!(flash.is_locked());
    }

    #[test]
    fn test_without_block_protection() {
        let flash = SimNandFlash::new(4 << 20);
        flash.set_supports_lock(false);
        let mut medium = medium(&flash);

        medium.write(BLOCK as u64, &vec![0x42; BLOCK]).unwrap();
        assert_eq!(flash.contents(BLOCK as u64, 16), vec![0x42; 16]);
    }

    #[test]
    fn test_alignment() {
        let flash = SimNandFlash::new(4 << 20);
        let mut medium = medium(&flash);

        assert_eq!(medium.write(2048, &vec![0; BLOCK]), Err(HalError::Unaligned));
        let mut buffer = [0u8; 16];
        assert_eq!(medium.read(100, &mut buffer), Err(HalError::Unaligned));
    }
}
