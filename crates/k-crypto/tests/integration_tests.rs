// SPDX-License-Identifier: Apache-2.0
// Copyright 2024-2026 Qbitel Inc.

//! Integration tests for k-crypto

use k_crypto::hash::{Sha256, Sm3};
use k_crypto::signature::{rsa_pkcs1v15_sha256_verify, sm2_verify, Sm2PublicKey};
use k_crypto::{CryptoError, Hash, KeySlot, SecurityEngine, SoftEngine};
use k_testing::keys;
use rsa::Pkcs1v15Sign;
use sm2::dsa::signature::Signer;

fn unhex<const N: usize>(text: &str) -> [u8; N] {
    let mut out = [0u8; N];
    hex::decode_to_slice(text, &mut out).unwrap();
    out
}

// =============================================================================
// Hash Tests
// =============================================================================

mod hash_tests {
    use super::*;

    #[test]
    fn test_sha256_known_answer() {
        let digest = Sha256::hash(b"abc");
        assert_eq!(
            digest.to_bytes(),
            unhex::<32>("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad")
        );
    }

    #[test]
    fn test_sm3_known_answer() {
        let digest = Sm3::hash(b"abc");
        assert_eq!(
            digest.to_bytes(),
            unhex::<32>("66c7f0f462eeedd9d1f2d46bdc10e4e24167c4875cf2f7a2297da02b8f4ba8e0")
        );
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let data = k_testing::random_bytes(10_000, 9);
        let mut hasher = <Sm3 as Hash>::new();
        for chunk in data.chunks(333) {
            hasher.update(chunk);
        }
        assert_eq!(hasher.finalize(), Sm3::hash(&data));
    }
}

// =============================================================================
// Engine Tests
// =============================================================================

mod engine_tests {
    use super::*;

    #[test]
    fn test_aes_gcm_known_answer() {
        // AES-256, zero key, zero 96-bit IV, one zero block
        let mut engine = SoftEngine::new().with_device_aes([0u8; 32]);
        let mut buffer = unhex::<16>("cea7403d4d606b6e074ec5d3baf39d18");
        let tag = unhex::<16>("d0d1c8a799996bf0265b98b5d48ab919");

        engine
            .aes_gcm_decrypt(KeySlot::DeviceAes, &[0u8; 12], &mut buffer, &tag)
            .unwrap();
        assert_eq!(buffer, [0u8; 16]);
    }

    #[test]
    fn test_aes_gcm_rejects_modified_tag() {
        let mut engine = SoftEngine::new().with_device_aes([0u8; 32]);
        let mut buffer = unhex::<16>("cea7403d4d606b6e074ec5d3baf39d18");
        let mut tag = unhex::<16>("d0d1c8a799996bf0265b98b5d48ab919");
        tag[15] ^= 1;

        assert_eq!(
            engine.aes_gcm_decrypt(KeySlot::DeviceAes, &[0u8; 12], &mut buffer, &tag),
            Err(CryptoError::AuthenticationFailed)
        );
    }

    #[test]
    fn test_sm4_cbc_chained_blocks() {
        let key: [u8; 16] = unhex("0123456789abcdeffedcba9876543210");
        let mut engine = SoftEngine::new().with_device_sm4(key);
        // second block is the first block's ciphertext re-encrypted after chaining
        let mut buffer = [0u8; 32];
        buffer[..16].copy_from_slice(&unhex::<16>("681edf34d206965e86b3e94f536e4246"));
        buffer[16..].copy_from_slice(&unhex::<16>("681edf34d206965e86b3e94f536e4246"));

        engine
            .sm4_cbc_decrypt(KeySlot::DeviceSm4, &[0u8; 16], &mut buffer)
            .unwrap();
        assert_eq!(buffer[..16], key);
        // identical ciphertext blocks decrypt to plaintext XOR previous block
        let mut expected = key;
        for (byte, prev) in expected.iter_mut().zip(unhex::<16>("681edf34d206965e86b3e94f536e4246")) {
            *byte ^= prev;
        }
        assert_eq!(buffer[16..], expected);
    }

    #[test]
    fn test_slot_mismatch() {
        let mut engine = SoftEngine::new().with_device_sm4([1u8; 16]).with_poc_key();
        let mut buffer = [0u8; 16];
        assert_eq!(
            engine.sm4_cbc_decrypt(KeySlot::ProofOfConcept, &[0u8; 16], &mut buffer),
            Err(CryptoError::InvalidKey)
        );
        assert_eq!(
            engine.aes_gcm_decrypt(KeySlot::DeviceAes, &[0u8; 12], &mut buffer, &[0u8; 16]),
            Err(CryptoError::KeyUnavailable)
        );
    }
}

// =============================================================================
// Signature Tests
// =============================================================================

mod signature_tests {
    use super::*;

    fn rsa_sign(message: &[u8]) -> Vec<u8> {
        keys::rsa_private_key()
            .sign(Pkcs1v15Sign::new::<sha2::Sha256>(), &keys::sha256_digest(message))
            .unwrap()
    }

    fn sm2_key() -> Sm2PublicKey {
        let (x, y) = keys::sm2_public_key();
        Sm2PublicKey { x, y }
    }

    fn sm2_sign(id: &str, message: &[u8]) -> ([u8; 32], [u8; 32]) {
        let signing_key = sm2::dsa::SigningKey::new(id, &keys::sm2_secret_key()).unwrap();
        let signature: sm2::dsa::Signature = signing_key.sign(message);
        let rs = signature.to_bytes();
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&rs[..32]);
        s.copy_from_slice(&rs[32..]);
        (r, s)
    }

    #[test]
    fn test_rsa_verify() {
        let signature = rsa_sign(b"firmware tag");
        assert!(rsa_pkcs1v15_sha256_verify(
            &keys::rsa_modulus(),
            keys::rsa_exponent(),
            b"firmware tag",
            &signature
        )
        .is_ok());
    }

    #[test]
    fn test_rsa_rejects_other_message() {
        let signature = rsa_sign(b"firmware tag");
        assert_eq!(
            rsa_pkcs1v15_sha256_verify(
                &keys::rsa_modulus(),
                keys::rsa_exponent(),
                b"firmware tah",
                &signature
            ),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn test_sm2_verify() {
        let (r, s) = sm2_sign(keys::SM2_ID, b"payload");
        assert!(sm2_verify(&sm2_key(), keys::SM2_ID.as_bytes(), b"payload", &r, &s).is_ok());
    }

    #[test]
    fn test_sm2_id_is_bound_into_signature() {
        let (r, s) = sm2_sign(keys::SM2_ID, b"payload");
        assert_eq!(
            sm2_verify(&sm2_key(), b"another signer", b"payload", &r, &s),
            Err(CryptoError::InvalidSignature)
        );
    }

    #[test]
    fn test_sm2_rejects_flipped_s() {
        let (r, mut s) = sm2_sign(keys::SM2_ID, b"payload");
        s[31] ^= 0x01;
        assert_eq!(
            sm2_verify(&sm2_key(), keys::SM2_ID.as_bytes(), b"payload", &r, &s),
            Err(CryptoError::InvalidSignature)
        );
    }
}
