// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Tests for k-common
//!
//! Error taxonomy, boot log buffer and board configuration.

#![cfg(test)]

mod error_tests {
    use k_common::{Error, ErrorCategory};
    use std::collections::HashSet;

    const ALL: &[Error] = &[
        Error::BadMagic,
        Error::UnsupportedCrypto,
        Error::UnsupportedFormat,
        Error::UnsupportedImage,
        Error::TruncatedImage,
        Error::KeyMissing,
        Error::HashMismatch,
        Error::SignatureInvalid,
        Error::DecryptFailed,
        Error::MediumReadFailed,
        Error::MediumWriteFailed,
        Error::MediumEraseFailed,
        Error::Unaligned,
        Error::OutOfRange,
        Error::MediumNotFound,
        Error::WriteProtected,
        Error::BadBlocksExhausted,
        Error::DecompressTimeout,
        Error::MalformedPacket,
        Error::UnknownCommand,
        Error::NoMediumBound,
        Error::MediumInfoInvalid,
        Error::InvalidState,
        Error::NoSuchPartition,
        Error::IntegrityError,
        Error::InvalidBootConfig,
        Error::HardwareInitFailed,
        Error::DmaError,
        Error::FuseReadFailed,
        Error::MemoryAccessViolation,
        Error::BufferTooSmall,
        Error::InvalidParameter,
        Error::OutOfMemory,
        Error::NotSupported,
        Error::InternalError,
    ];

    #[test]
    fn test_error_codes_unique() {
        let codes: HashSet<u16> = ALL.iter().map(Error::code).collect();
        assert_eq!(codes.len(), ALL.len());
    }

    #[test]
    fn test_error_display_format() {
        assert_eq!(Error::BadMagic.to_string(), "[0x0101] bad image magic");
        assert_eq!(
            Error::DecompressTimeout.to_string(),
            "[0x0401] decompression timeout"
        );
    }

    #[test]
    fn test_taxonomy_groups() {
        let io: Vec<_> = ALL
            .iter()
            .filter(|e| e.category() == ErrorCategory::Io)
            .collect();
        assert_eq!(io.len(), 8);
        assert!(ALL
            .iter()
            .filter(|e| e.is_security_error())
            .all(|e| matches!(e.category(), ErrorCategory::Format | ErrorCategory::Crypto | ErrorCategory::Boot)));
    }
}

mod log_tests {
    use k_common::log::{LogBuffer, LogLevel, LOG_BUFFER_SIZE, MAX_LOG_MESSAGE_LEN};
    use k_common::{log_debug, log_error, log_info, log_warn};

    #[test]
    fn test_level_filtering() {
        let mut log = LogBuffer::new();
        log_debug!(log, 1, "boot", "descriptor at {:#x}", 0x1000);
        assert!(log.is_empty());

        log_info!(log, 2, "boot", "target {}", "rtt");
        log_warn!(log, 3, "medium", "skipping bad block");
        assert_eq!(log.len(), 2);

        log.set_min_level(LogLevel::Debug);
        log_debug!(log, 4, "gunzip", "chain of {} nodes", 3);
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn test_ring_eviction_keeps_newest() {
        let mut log = LogBuffer::new();
        for i in 0..(LOG_BUFFER_SIZE as u64 + 5) {
            log_error!(log, i, "burn", "entry {}", i);
        }
        assert_eq!(log.len(), LOG_BUFFER_SIZE);
        assert_eq!(log.dropped(), 5);
        let first = log.iter().next().unwrap();
        assert_eq!(first.timestamp, 5);
        assert_eq!(log.last().unwrap().timestamp, LOG_BUFFER_SIZE as u64 + 4);
    }

    #[test]
    fn test_message_truncated() {
        let mut log = LogBuffer::new();
        let long = "x".repeat(MAX_LOG_MESSAGE_LEN * 2);
        log_info!(log, 0, "boot", "{}", long);
        assert!(log.last().unwrap().message.len() <= MAX_LOG_MESSAGE_LEN);
    }

    #[test]
    fn test_contains_and_display() {
        let mut log = LogBuffer::new();
        log_error!(log, 42, "verify", "pubkey digest mismatch");
        assert!(log.contains("verify", "digest"));
        assert!(!log.contains("boot", "digest"));
        assert_eq!(
            log.last().unwrap().to_string(),
            "[0000000042] E [verify] pubkey digest mismatch"
        );
        log.clear();
        assert!(log.is_empty());
    }
}

mod config_tests {
    use k_common::{BootConfig, BootTarget, MediumKind, MemoryLayout};

    #[test]
    fn test_small_layout_regions_disjoint() {
        let layout = MemoryLayout { base: 0x1000_0000, size: 48 * 1024 * 1024 };
        assert!(layout.validate().is_ok());
        let scratch = layout.decrypt_scratch_addr();
        let load = layout.encrypted_load_addr();
        assert!(scratch >= layout.base);
        assert_eq!(scratch + layout.scratch_capacity(), load);
        assert_eq!(load + layout.load_capacity(), layout.base + layout.size);
    }

    #[test]
    fn test_tiny_layout_rejected() {
        let layout = MemoryLayout { base: 0, size: 1024 };
        assert!(layout.validate().is_err());
    }

    #[test]
    fn test_default_auto_targets_are_mapped() {
        let config = BootConfig::default();
        for kind in [MediumKind::Emmc, MediumKind::SdCard, MediumKind::SpiNor, MediumKind::SpiNand] {
            assert!(config.partitions.offset(kind, config.auto_primary).is_some());
            assert!(config.partitions.offset(kind, config.auto_fallback).is_some());
        }
        assert_ne!(config.auto_primary, BootTarget::Auto);
    }
}
