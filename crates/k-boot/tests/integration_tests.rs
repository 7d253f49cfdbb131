// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for k-boot

use std::panic::{catch_unwind, AssertUnwindSafe};

use k_boot::decompress::chunk_count;
use k_boot::load::{BIG_CORE_RESET_CTL, BIG_CORE_RESET_VECTOR};
use k_boot::{
    authenticate, inflate, BootCommand, BootLoader, BootStage, CryptoType, InflateError, Scratch,
    VerifyError,
};
use k_common::constants::DECOMPRESS_CHUNK_SIZE as CHUNK_SIZE;
use k_common::{BootConfig, BootMedium, BootTarget, Error, MemoryLayout};
use k_crypto::SoftEngine;
use k_testing::soc::regs;
use k_testing::{
    gzip, keys, random_bytes, CacheOp, Compression, GzipMode, ImageBuilder, Jump, Protection,
    SimBlockDevice, SimFuses, SimNandFlash, SimNorFlash, SimProvider, SimSoc, UImage,
};

const DRAM_SIZE: usize = 16 << 20;
const IMAGE_LOAD: u32 = 0x0010_0000;

fn config() -> BootConfig {
    BootConfig {
        memory: MemoryLayout {
            base: 0,
            size: DRAM_SIZE as u64,
        },
        max_decompressed_size: 4 << 20,
        ..BootConfig::DEFAULT
    }
}

fn engine() -> SoftEngine {
    SoftEngine::new()
        .with_device_aes(keys::DEVICE_AES_KEY)
        .with_device_sm4(keys::DEVICE_SM4_KEY)
        .with_poc_key()
}

fn open_fuses() -> SimFuses {
    let mut fuses = SimFuses::provisioned();
    fuses.forbid_unauthenticated = false;
    fuses
}

fn rtt_image(payload: &[u8]) -> UImage {
    UImage::new("rtt", IMAGE_LOAD, payload)
        .compression(Compression::Gzip)
        .multi()
}

fn loader_with(
    soc: SimSoc,
    fuses: SimFuses,
    provider: SimProvider,
) -> BootLoader<SimSoc, SimFuses, SoftEngine, SimProvider> {
    BootLoader::new(config(), soc, fuses, engine(), provider).unwrap()
}

/// Loader with `sealed` already staged in DRAM
fn memory_loader(sealed: &[u8], fuses: SimFuses) -> BootLoader<SimSoc, SimFuses, SoftEngine, SimProvider> {
    let mut soc = SimSoc::new(DRAM_SIZE);
    soc.load(config().memory.encrypted_load_addr(), sealed);
    loader_with(soc, fuses, SimProvider::new())
}

fn command(medium: BootMedium, target: BootTarget) -> BootCommand {
    BootCommand { medium, target }
}

// =============================================================================
// Authentication
// =============================================================================

mod verify_tests {
    use super::*;

    const HEADER_ADDR: u64 = 0x0080_0000;
    const SCRATCH_ADDR: u64 = 0x0040_0000;
    const SCRATCH_CAPACITY: usize = 0x0040_0000;

    fn scratch() -> Scratch {
        Scratch {
            addr: SCRATCH_ADDR,
            capacity: SCRATCH_CAPACITY,
        }
    }

    fn builder() -> ImageBuilder {
        ImageBuilder::from_plaintext(random_bytes(3000, 7))
    }

    fn run(
        sealed: &[u8],
        fuses: &mut SimFuses,
        engine: &mut SoftEngine,
    ) -> (SimSoc, Result<k_boot::Plaintext, VerifyError>) {
        let mut soc = SimSoc::new(DRAM_SIZE);
        soc.load(HEADER_ADDR, sealed);
        let result = authenticate(&mut soc, fuses, engine, HEADER_ADDR, scratch());
        (soc, result)
    }

    #[test]
    fn test_unprotected_image_accepted_when_allowed() {
        let builder = builder();
        let sealed = builder.seal(Protection::None);
        let (soc, result) = run(&sealed, &mut open_fuses(), &mut engine());

        let plaintext = result.unwrap();
        assert_eq!(plaintext.crypto, CryptoType::None);
        assert_eq!(plaintext.addr, HEADER_ADDR + 528);
        assert_eq!(soc.memory(plaintext.addr, plaintext.len), builder.plaintext());
        assert_eq!(soc.memory(SCRATCH_ADDR, 16), vec![0u8; 16]);
    }

    #[test]
    fn test_unprotected_digest_mismatch() {
        let mut sealed = builder().seal(Protection::None);
        sealed[528 + 100] ^= 0x01;
        let (_, result) = run(&sealed, &mut open_fuses(), &mut engine());
        assert_eq!(result, Err(VerifyError::HashMismatch));
    }

    #[test]
    fn test_unprotected_image_rejected_by_fuse_policy() {
        let sealed = builder().seal(Protection::None);
        let (_, result) = run(&sealed, &mut SimFuses::provisioned(), &mut engine());
        assert_eq!(result, Err(VerifyError::KeyMissing));
    }

    #[test]
    fn test_gcm_only_decrypts_to_scratch() {
        let builder = builder();
        let sealed = builder.seal(Protection::GcmOnly);
        let (soc, result) = run(&sealed, &mut SimFuses::blank(), &mut engine());

        let plaintext = result.unwrap();
        assert_eq!(plaintext.crypto, CryptoType::GcmOnly);
        assert_eq!(plaintext.addr, SCRATCH_ADDR);
        assert_eq!(soc.memory(SCRATCH_ADDR, plaintext.len), builder.plaintext());
    }

    #[test]
    fn test_gcm_only_without_poc_key() {
        let sealed = builder().seal(Protection::GcmOnly);
        let mut engine = SoftEngine::new().with_device_aes(keys::DEVICE_AES_KEY);
        let (_, result) = run(&sealed, &mut SimFuses::blank(), &mut engine);
        assert_eq!(result, Err(VerifyError::KeyMissing));
    }

    #[test]
    fn test_rsa_container() {
        let builder = builder();
        let sealed = builder.seal(Protection::Rsa);
        let (soc, result) = run(&sealed, &mut SimFuses::provisioned(), &mut engine());

        let plaintext = result.unwrap();
        assert_eq!(plaintext.crypto, CryptoType::International);
        assert_eq!(soc.memory(SCRATCH_ADDR, plaintext.len), builder.plaintext());
        // the staged container is left as read
        assert_eq!(soc.memory(HEADER_ADDR, sealed.len()), sealed);
    }

    #[test]
    fn test_rsa_blank_fuses() {
        let sealed = builder().seal(Protection::Rsa);
        let (_, result) = run(&sealed, &mut SimFuses::blank(), &mut engine());
        assert_eq!(result, Err(VerifyError::KeyMissing));
    }

    #[test]
    fn test_rsa_wrong_fused_digest() {
        let sealed = builder().seal(Protection::Rsa);
        let mut fuses = SimFuses::provisioned();
        fuses.rsa_puk_digest[0] ^= 0x80;
        let (_, result) = run(&sealed, &mut fuses, &mut engine());
        assert_eq!(result, Err(VerifyError::SignatureInvalid));
    }

    #[test]
    fn test_rsa_tampered_signature() {
        let mut sealed = builder().seal(Protection::Rsa);
        sealed[12 + 300] ^= 0x01;
        let (_, result) = run(&sealed, &mut SimFuses::provisioned(), &mut engine());
        assert_eq!(result, Err(VerifyError::SignatureInvalid));
    }

    #[test]
    fn test_rsa_tampered_tag() {
        let mut sealed = builder().seal(Protection::Rsa);
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        let (_, result) = run(&sealed, &mut SimFuses::provisioned(), &mut engine());
        assert_eq!(result, Err(VerifyError::SignatureInvalid));
    }

    #[test]
    fn test_rsa_tampered_ciphertext_clears_scratch() {
        let mut sealed = builder().seal(Protection::Rsa);
        sealed[528 + 5] ^= 0x01;
        let (soc, result) = run(&sealed, &mut SimFuses::provisioned(), &mut engine());
        assert_eq!(result, Err(VerifyError::DecryptFailed));
        assert!(soc.memory(SCRATCH_ADDR, 3000).iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sm2_container() {
        let builder = builder();
        let sealed = builder.seal(Protection::Sm2);
        let (soc, result) = run(&sealed, &mut SimFuses::provisioned(), &mut engine());

        let plaintext = result.unwrap();
        assert_eq!(plaintext.crypto, CryptoType::National);
        assert_eq!(plaintext.len % 16, 0);
        assert_eq!(
            &soc.memory(SCRATCH_ADDR, plaintext.len)[..builder.plaintext().len()],
            builder.plaintext()
        );
    }

    #[test]
    fn test_sm2_tampered_ciphertext() {
        let mut sealed = builder().seal(Protection::Sm2);
        sealed[528 + 40] ^= 0x01;
        let (_, result) = run(&sealed, &mut SimFuses::provisioned(), &mut engine());
        assert_eq!(result, Err(VerifyError::SignatureInvalid));
    }

    #[test]
    fn test_sm2_other_identity_does_not_match_fuses() {
        let sealed = builder().sm2_id(b"ALICE123@YAHOO.COM").seal(Protection::Sm2);
        let (_, result) = run(&sealed, &mut SimFuses::provisioned(), &mut engine());
        assert_eq!(result, Err(VerifyError::SignatureInvalid));
    }

    #[test]
    fn test_sm2_other_identity_with_matching_fuses() {
        let id = b"ALICE123@YAHOO.COM";
        let sealed = builder().sm2_id(id).seal(Protection::Sm2);
        let mut fuses = SimFuses::provisioned();
        fuses.sm2_puk_digest = keys::sm3_digest(&keys::sm2_key_material(id));
        let (_, result) = run(&sealed, &mut fuses, &mut engine());
        assert!(result.is_ok());
    }

    #[test]
    fn test_unknown_crypto_type_leaves_scratch_untouched() {
        let mut sealed = builder().seal(Protection::Rsa);
        sealed[8] = 9;
        let mut soc = SimSoc::new(DRAM_SIZE);
        soc.load(HEADER_ADDR, &sealed);
        soc.load(SCRATCH_ADDR, &[0xA5; 64]);

        let result = authenticate(
            &mut soc,
            &mut SimFuses::provisioned(),
            &mut engine(),
            HEADER_ADDR,
            scratch(),
        );
        assert_eq!(result, Err(VerifyError::UnsupportedCrypto));
        assert_eq!(soc.memory(SCRATCH_ADDR, 64), vec![0xA5; 64]);
    }

    #[test]
    fn test_bad_magic() {
        let mut sealed = builder().seal(Protection::Rsa);
        sealed[0] ^= 0xFF;
        let (_, result) = run(&sealed, &mut SimFuses::provisioned(), &mut engine());
        assert_eq!(result, Err(VerifyError::BadMagic));
    }

    #[test]
    fn test_scratch_too_small() {
        let sealed = builder().seal(Protection::Rsa);
        let mut soc = SimSoc::new(DRAM_SIZE);
        soc.load(HEADER_ADDR, &sealed);
        let small = Scratch {
            addr: SCRATCH_ADDR,
            capacity: 1024,
        };
        let result = authenticate(
            &mut soc,
            &mut SimFuses::provisioned(),
            &mut engine(),
            HEADER_ADDR,
            small,
        );
        assert_eq!(result, Err(VerifyError::ScratchTooSmall));
    }

    #[test]
    fn test_fuse_read_failure() {
        let sealed = builder().seal(Protection::Rsa);
        let mut fuses = SimFuses::provisioned();
        fuses.fail_reads = true;
        let (_, result) = run(&sealed, &mut fuses, &mut engine());
        assert_eq!(result, Err(VerifyError::FuseReadFailed));
    }
}

// =============================================================================
// Hardware decompression
// =============================================================================

mod decompress_tests {
    use super::*;

    const SRC: u64 = 0x0010_0000;
    const DST: u64 = 0x0040_0000;
    const CAPACITY: usize = 2 << 20;
    const TIMEOUT: u64 = 100_000;

    fn staged(data: &[u8]) -> (SimSoc, usize) {
        let compressed = gzip(data);
        let mut soc = SimSoc::new(DRAM_SIZE);
        soc.load(SRC, &compressed);
        (soc, compressed.len())
    }

    fn check_round_trip(len: usize, seed: u64) {
        let data = random_bytes(len, seed);
        let (mut soc, src_len) = staged(&data);

        let written = inflate(&mut soc, SRC, src_len, DST, CAPACITY, TIMEOUT).unwrap();
        assert_eq!(written, len);
        assert_eq!(soc.memory(DST, len), data);
        assert_eq!(soc.dma_outstanding(), 0);
        assert_eq!(soc.decompress_runs(), 1);
        assert!(soc.writes_to(regs::RESET_UGZIP).is_empty());
    }

    #[test]
    fn test_chunk_count() {
        assert_eq!(chunk_count(1), 1);
        assert_eq!(chunk_count(CHUNK_SIZE), 1);
        assert_eq!(chunk_count(CHUNK_SIZE + 1), 2);
    }

    #[test]
    fn test_single_chunk() {
        check_round_trip(60 * 1024, 1);
    }

    #[test]
    fn test_two_chunks() {
        check_round_trip(200 * 1024, 2);
    }

    #[test]
    fn test_many_chunks() {
        check_round_trip(600 * 1024 + 17, 3);
    }

    #[test]
    fn test_register_sequence() {
        let data = random_bytes(1000, 4);
        let (mut soc, src_len) = staged(&data);
        inflate(&mut soc, SRC, src_len, DST, CAPACITY, TIMEOUT).unwrap();

        let ch0_cfg = regs::SDMA_CH_BASE + 0x08;
        assert_eq!(soc.writes_to(regs::UGZIP_DECOMP_START), vec![3]);
        let sizes = soc.writes_to(regs::UGZIP_SRC_SIZE);
        #[allow(clippy::cast_possible_truncation)]
        let expected = src_len as u32 | 1 << 31;
        assert!(sizes.contains(&expected));
        assert_eq!(sizes.last(), Some(&0));
        assert_eq!(soc.writes_to(ch0_cfg).last(), Some(&0));
        assert!(soc
            .cache_ops()
            .iter()
            .any(|op| matches!(op, CacheOp::Flush { addr, .. } if *addr == SRC)));
        assert!(soc
            .cache_ops()
            .iter()
            .any(|op| matches!(op, CacheOp::Invalidate { addr, .. } if *addr == DST)));
    }

    #[test]
    fn test_timeout_resets_engines() {
        let data = random_bytes(1000, 5);
        let (mut soc, src_len) = staged(&data);
        soc.set_gzip_mode(GzipMode::Hang);

        let result = inflate(&mut soc, SRC, src_len, DST, CAPACITY, TIMEOUT);
        assert_eq!(result, Err(InflateError::Timeout));
        assert_eq!(Error::from(InflateError::Timeout), Error::DecompressTimeout);
        assert_eq!(soc.dma_outstanding(), 0);
        assert!(!soc.writes_to(regs::RESET_UGZIP).is_empty());
        assert!(!soc.writes_to(regs::RESET_GSDMA).is_empty());
        assert_eq!(soc.writes_to(regs::UGZIP_SRC_SIZE).last(), Some(&0));
    }

    #[test]
    fn test_crc_error_resets_engines() {
        let data = random_bytes(1000, 6);
        let (mut soc, src_len) = staged(&data);
        soc.set_gzip_mode(GzipMode::CrcError);

        let result = inflate(&mut soc, SRC, src_len, DST, CAPACITY, TIMEOUT);
        assert_eq!(result, Err(InflateError::IntegrityError));
        assert_eq!(soc.dma_outstanding(), 0);
        assert!(!soc.writes_to(regs::RESET_UGZIP).is_empty());
    }

    #[test]
    fn test_output_larger_than_capacity() {
        let data = random_bytes(300 * 1024, 8);
        let (mut soc, src_len) = staged(&data);
        let result = inflate(&mut soc, SRC, src_len, DST, 128 * 1024, TIMEOUT);
        assert_eq!(result, Err(InflateError::IntegrityError));
        assert_eq!(soc.dma_outstanding(), 0);
    }

    #[test]
    fn test_zero_length_rejected() {
        let mut soc = SimSoc::new(DRAM_SIZE);
        assert_eq!(
            inflate(&mut soc, SRC, 0, DST, CAPACITY, TIMEOUT),
            Err(InflateError::InvalidLength)
        );
        assert_eq!(soc.decompress_runs(), 0);
    }
}

// =============================================================================
// Boot flow
// =============================================================================

mod boot_tests {
    use super::*;

    #[test]
    fn test_rtt_from_memory_releases_big_core() {
        let payload = random_bytes(150 * 1024, 10);
        let sealed = ImageBuilder::new(&rtt_image(&payload)).seal(Protection::Rsa);
        let mut loader = memory_loader(&sealed, SimFuses::provisioned());

        let outcome = loader
            .boot(command(BootMedium::Memory, BootTarget::Rtt))
            .unwrap();
        assert_eq!(outcome.target, BootTarget::Rtt);
        assert_eq!(outcome.image.as_str(), "rtt");
        assert_eq!(outcome.entry, u64::from(IMAGE_LOAD));

        let soc = loader.soc();
        assert_eq!(soc.memory(u64::from(IMAGE_LOAD), payload.len()), payload);
        assert_eq!(soc.writes_to(BIG_CORE_RESET_VECTOR), vec![IMAGE_LOAD]);
        assert_eq!(
            soc.writes_to(BIG_CORE_RESET_CTL),
            vec![0x1000_1000, 0x0001_0001, 0x0001_0000]
        );
        assert_eq!(soc.dma_outstanding(), 0);
        assert!(loader.log().contains("verify", "rsa"));
        assert!(loader.log().contains("gunzip", "rtt"));
    }

    #[test]
    fn test_every_protection_boots() {
        let payload = random_bytes(20 * 1024, 11);
        for protection in [Protection::None, Protection::GcmOnly, Protection::Sm2, Protection::Rsa] {
            let sealed = ImageBuilder::new(&rtt_image(&payload)).seal(protection);
            let mut loader = memory_loader(&sealed, open_fuses());
            assert_eq!(loader.run(command(BootMedium::Memory, BootTarget::Rtt)), 0);
            assert_eq!(
                loader.soc().memory(u64::from(IMAGE_LOAD), payload.len()),
                payload
            );
        }
    }

    #[test]
    fn test_stored_image_is_copied() {
        let payload = random_bytes(5000, 12);
        let image = UImage::new("rtt", IMAGE_LOAD, &payload);
        let sealed = ImageBuilder::new(&image).seal(Protection::GcmOnly);
        let mut loader = memory_loader(&sealed, SimFuses::provisioned());

        loader
            .boot(command(BootMedium::Memory, BootTarget::Rtt))
            .unwrap();
        assert_eq!(loader.soc().decompress_runs(), 0);
        assert_eq!(
            loader.soc().memory(u64::from(IMAGE_LOAD), payload.len()),
            payload
        );
    }

    #[test]
    fn test_uboot_jumps_with_caches_off() {
        let payload = random_bytes(4096, 13);
        let image = UImage::new("uboot", IMAGE_LOAD, &payload).compression(Compression::Gzip);
        let sealed = ImageBuilder::new(&image).seal(Protection::Sm2);
        let mut loader = memory_loader(&sealed, SimFuses::provisioned());

        let result = catch_unwind(AssertUnwindSafe(|| {
            loader.boot(command(BootMedium::Memory, BootTarget::Uboot))
        }));
        let payload_box = result.err().unwrap();
        let jump = payload_box.downcast_ref::<Jump>().unwrap();
        assert_eq!(
            *jump,
            Jump {
                entry: u64::from(IMAGE_LOAD),
                hart: 0,
                dtb: 0
            }
        );
        assert!(loader.soc().cache_ops().contains(&CacheOp::DisableAll));
        assert_eq!(loader.soc().core_syncs(), 1);
        assert_eq!(
            loader.soc().memory(u64::from(IMAGE_LOAD), payload.len()),
            payload
        );
    }

    #[test]
    fn test_unknown_image_name() {
        let image = UImage::new("linux", IMAGE_LOAD, &[1, 2, 3, 4]);
        let sealed = ImageBuilder::new(&image).seal(Protection::GcmOnly);
        let mut loader = memory_loader(&sealed, SimFuses::provisioned());

        let failure = loader
            .boot(command(BootMedium::Memory, BootTarget::Rtt))
            .unwrap_err();
        assert_eq!(failure.stage, BootStage::Transfer);
        assert_eq!(failure.error, Error::UnsupportedImage);
    }

    #[test]
    fn test_unsupported_compression() {
        let image = UImage::new("rtt", IMAGE_LOAD, &[1, 2, 3, 4]).compression(Compression::Raw(2));
        let sealed = ImageBuilder::new(&image).seal(Protection::GcmOnly);
        let mut loader = memory_loader(&sealed, SimFuses::provisioned());

        let failure = loader
            .boot(command(BootMedium::Memory, BootTarget::Rtt))
            .unwrap_err();
        assert_eq!(failure.stage, BootStage::Decompress);
        assert_eq!(failure.error, Error::UnsupportedFormat);
    }

    #[test]
    fn test_tampered_container_fails_in_verify() {
        let mut sealed = ImageBuilder::new(&rtt_image(&[7u8; 1000])).seal(Protection::Rsa);
        sealed[12 + 300] ^= 0x01;
        let mut loader = memory_loader(&sealed, SimFuses::provisioned());

        let failure = loader
            .boot(command(BootMedium::Memory, BootTarget::Rtt))
            .unwrap_err();
        assert_eq!(failure.stage, BootStage::Authenticate);
        assert_eq!(failure.error, Error::SignatureInvalid);
        assert_eq!(loader.soc().decompress_runs(), 0);
        assert!(loader.soc().writes_to(BIG_CORE_RESET_VECTOR).is_empty());
        assert_ne!(
            loader.run(command(BootMedium::Memory, BootTarget::Rtt)),
            0
        );
    }

    #[test]
    fn test_unknown_crypto_type_fails_header_validation() {
        let mut sealed = ImageBuilder::new(&rtt_image(&[7u8; 1000])).seal(Protection::Rsa);
        sealed[8] = 7;
        let mut loader = memory_loader(&sealed, SimFuses::provisioned());

        let failure = loader
            .boot(command(BootMedium::Memory, BootTarget::Rtt))
            .unwrap_err();
        assert_eq!(failure.stage, BootStage::ValidateHeader);
        assert_eq!(failure.error, Error::UnsupportedCrypto);
    }

    #[test]
    fn test_decompress_timeout_is_reported() {
        let sealed = ImageBuilder::new(&rtt_image(&[7u8; 1000])).seal(Protection::GcmOnly);
        let mut loader = memory_loader(&sealed, SimFuses::provisioned());
        loader.soc_mut().set_gzip_mode(GzipMode::Hang);

        let failure = loader
            .boot(command(BootMedium::Memory, BootTarget::Rtt))
            .unwrap_err();
        assert_eq!(failure.stage, BootStage::Decompress);
        assert_eq!(failure.error, Error::DecompressTimeout);
        assert_eq!(loader.soc().dma_outstanding(), 0);
    }
}

// =============================================================================
// Media
// =============================================================================

mod medium_tests {
    use super::*;

    fn sealed_rtt(payload: &[u8]) -> Vec<u8> {
        ImageBuilder::new(&rtt_image(payload)).seal(Protection::Rsa)
    }

    #[test]
    fn test_boot_from_sd_card() {
        let payload = random_bytes(70 * 1024, 20);
        let card = SimBlockDevice::new(512, 65_536);
        card.preload(0x00A0_0000, &sealed_rtt(&payload));
        let provider = SimProvider::new().with_sd(card);
        let mut loader = loader_with(SimSoc::new(DRAM_SIZE), SimFuses::provisioned(), provider);

        loader
            .boot(command(BootMedium::Sdio1, BootTarget::Rtt))
            .unwrap();
        assert_eq!(
            loader.soc().memory(u64::from(IMAGE_LOAD), payload.len()),
            payload
        );
        assert_eq!(loader.provider().probes(), 1);
    }

    #[test]
    fn test_boot_from_nor() {
        let payload = random_bytes(30 * 1024, 21);
        let flash = SimNorFlash::new(16 << 20);
        flash.preload(0x0020_0000, &sealed_rtt(&payload));
        let provider = SimProvider::new().with_nor(flash);
        let mut loader = loader_with(SimSoc::new(DRAM_SIZE), SimFuses::provisioned(), provider);

        loader
            .boot(command(BootMedium::NorFlash, BootTarget::Rtt))
            .unwrap();
        assert_eq!(
            loader.soc().memory(u64::from(IMAGE_LOAD), payload.len()),
            payload
        );
    }

    #[test]
    fn test_boot_from_nand() {
        let payload = random_bytes(30 * 1024, 22);
        let flash = SimNandFlash::new(32 << 20);
        flash.preload(0x0020_0000, &sealed_rtt(&payload));
        let provider = SimProvider::new().with_nand(flash);
        let mut loader = loader_with(SimSoc::new(DRAM_SIZE), SimFuses::provisioned(), provider);

        loader
            .boot(command(BootMedium::NandFlash, BootTarget::Rtt))
            .unwrap();
        assert_eq!(
            loader.soc().memory(u64::from(IMAGE_LOAD), payload.len()),
            payload
        );
    }

    #[test]
    fn test_auto_medium_from_strap() {
        let payload = random_bytes(10 * 1024, 23);
        let card = SimBlockDevice::new(512, 65_536);
        card.preload(0x00A0_0000, &sealed_rtt(&payload));
        let provider = SimProvider::new().with_sd(card);
        let mut soc = SimSoc::new(DRAM_SIZE);
        soc.poke(regs::BOOT_STRAP, 3);
        let mut loader = loader_with(soc, SimFuses::provisioned(), provider);

        loader
            .boot(command(BootMedium::Auto, BootTarget::Rtt))
            .unwrap();
        assert_eq!(
            loader.soc().memory(u64::from(IMAGE_LOAD), payload.len()),
            payload
        );
    }

    #[test]
    fn test_auto_target_falls_back_to_uboot() {
        let payload = random_bytes(8 * 1024, 24);
        let image = UImage::new("uboot", IMAGE_LOAD, &payload).compression(Compression::Gzip);
        let card = SimBlockDevice::new(512, 65_536);
        // no rtt container at its offset, so the primary attempt fails
        card.preload(0x0020_0000, &ImageBuilder::new(&image).seal(Protection::Rsa));
        let provider = SimProvider::new().with_emmc(card);
        let mut loader = loader_with(SimSoc::new(DRAM_SIZE), SimFuses::provisioned(), provider);

        let result = catch_unwind(AssertUnwindSafe(|| {
            loader.boot(command(BootMedium::Sdio0, BootTarget::Auto))
        }));
        let jump = *result.err().unwrap().downcast_ref::<Jump>().unwrap();
        assert_eq!(jump.entry, u64::from(IMAGE_LOAD));
        assert!(loader.log().contains("boot", "falling back"));
        assert_eq!(loader.provider().probes(), 2);
    }

    #[test]
    fn test_missing_partition() {
        let card = SimBlockDevice::new(512, 65_536);
        let provider = SimProvider::new().with_sd(card);
        let mut config = config();
        config
            .partitions
            .set(k_common::MediumKind::SdCard, BootTarget::Rtt, None)
            .unwrap();
        let mut loader = BootLoader::new(
            config,
            SimSoc::new(DRAM_SIZE),
            SimFuses::provisioned(),
            engine(),
            provider,
        )
        .unwrap();

        let failure = loader
            .boot(command(BootMedium::Sdio1, BootTarget::Rtt))
            .unwrap_err();
        assert_eq!(failure.stage, BootStage::SelectTarget);
        assert_eq!(failure.error, Error::NoSuchPartition);
        assert_eq!(loader.provider().probes(), 0);
    }

    #[test]
    fn test_blank_medium_is_bad_magic() {
        let card = SimBlockDevice::new(512, 65_536);
        let provider = SimProvider::new().with_sd(card);
        let mut loader = loader_with(SimSoc::new(DRAM_SIZE), SimFuses::provisioned(), provider);

        let failure = loader
            .boot(command(BootMedium::Sdio1, BootTarget::Rtt))
            .unwrap_err();
        assert_eq!(failure.stage, BootStage::LocateOnMedium);
        assert_eq!(failure.error, Error::BadMagic);
    }

    #[test]
    fn test_absent_medium() {
        let mut loader = loader_with(
            SimSoc::new(DRAM_SIZE),
            SimFuses::provisioned(),
            SimProvider::new(),
        );
        let failure = loader
            .boot(command(BootMedium::NorFlash, BootTarget::Rtt))
            .unwrap_err();
        assert_eq!(failure.stage, BootStage::LocateOnMedium);
    }
}
