// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Per-block authenticated encryption.
//!
//! Normal blocks are encrypted with a fresh random nonce. The ciphertext replaces the payload
//! in place, and the tag moves into the header so that the encoded block keeps its size.
//! The block id and type are bound to the ciphertext as associated data.
//! Dummy blocks are never touched.

use crate::{
    block::{Block, IV_SIZE, MAC_TAG_SIZE},
    BlockSize, OramError,
};
use aes_gcm::{
    aead::{Aead, KeyInit, Payload},
    Aes256Gcm, Nonce,
};
use rand::{seq::SliceRandom, CryptoRng, RngCore};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Length of a [`SecretKey`] in bytes.
pub const KEY_SIZE: usize = 32;

/// The cryptographic services the storage primitives consume.
///
/// Every method reports failure through `OramError`, and every caller in this crate
/// propagates it unchanged.
pub trait CryptoEngine {
    /// Fills `buffer` with cryptographically secure random bytes.
    fn random_bytes(&mut self, buffer: &mut [u8]) -> Result<(), OramError>;

    /// Encrypts `plaintext` under `iv`, authenticating `aad`. Returns the ciphertext followed by the tag.
    fn encrypt(&self, plaintext: &[u8], iv: &[u8; IV_SIZE], aad: &[u8]) -> Result<Vec<u8>, OramError>;

    /// Verifies and decrypts a ciphertext followed by its tag.
    fn decrypt(
        &self,
        ciphertext_with_tag: &[u8],
        iv: &[u8; IV_SIZE],
        aad: &[u8],
    ) -> Result<Vec<u8>, OramError>;

    /// Applies a uniformly random permutation to `items`.
    fn random_shuffle<T>(&mut self, items: &mut [T]) -> Result<(), OramError>;
}

/// A 256-bit AES key, wiped from memory on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SecretKey([u8; KEY_SIZE]);

impl SecretKey {
    /// Wraps raw key bytes.
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self(bytes)
    }

    /// Draws a fresh key from `rng`.
    pub fn generate<R: RngCore + CryptoRng>(rng: &mut R) -> Result<Self, OramError> {
        let mut bytes = [0u8; KEY_SIZE];
        rng.try_fill_bytes(&mut bytes)
            .map_err(|_| OramError::RandomnessError)?;
        Ok(Self(bytes))
    }

    /// Parses a key from hex text such as the contents of a key file.
    /// Whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfigurationError` unless the text holds exactly 64 hex digits.
    pub fn from_hex(text: &str) -> Result<Self, OramError> {
        let digits: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        let mut decoded =
            hex::decode(&digits).map_err(|_| OramError::InvalidConfigurationError)?;

        if decoded.len() != KEY_SIZE {
            decoded.zeroize();
            return Err(OramError::InvalidConfigurationError);
        }
        let mut bytes = [0u8; KEY_SIZE];
        bytes.copy_from_slice(&decoded);
        decoded.zeroize();
        Ok(Self(bytes))
    }

    fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }
}

impl std::fmt::Debug for SecretKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SecretKey(..)")
    }
}

/// A [`CryptoEngine`] backed by AES-256-GCM and a caller-provided CSPRNG.
pub struct Aes256GcmEngine<R> {
    cipher: Aes256Gcm,
    rng: R,
}

impl<R: RngCore + CryptoRng> Aes256GcmEngine<R> {
    /// Creates an engine encrypting under `key` and drawing randomness from `rng`.
    pub fn new(key: &SecretKey, rng: R) -> Self {
        Self {
            cipher: Aes256Gcm::new(key.as_bytes().into()),
            rng,
        }
    }
}

impl<R> std::fmt::Debug for Aes256GcmEngine<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Aes256GcmEngine").finish_non_exhaustive()
    }
}

impl<R: RngCore + CryptoRng> CryptoEngine for Aes256GcmEngine<R> {
    fn random_bytes(&mut self, buffer: &mut [u8]) -> Result<(), OramError> {
        self.rng
            .try_fill_bytes(buffer)
            .map_err(|_| OramError::RandomnessError)
    }

    fn encrypt(&self, plaintext: &[u8], iv: &[u8; IV_SIZE], aad: &[u8]) -> Result<Vec<u8>, OramError> {
        self.cipher
            .encrypt(
                Nonce::from_slice(iv),
                Payload {
                    msg: plaintext,
                    aad,
                },
            )
            .map_err(|_| OramError::EncryptionError)
    }

    fn decrypt(
        &self,
        ciphertext_with_tag: &[u8],
        iv: &[u8; IV_SIZE],
        aad: &[u8],
    ) -> Result<Vec<u8>, OramError> {
        self.cipher
            .decrypt(
                Nonce::from_slice(iv),
                Payload {
                    msg: ciphertext_with_tag,
                    aad,
                },
            )
            .map_err(|_| OramError::AuthenticationError)
    }

    fn random_shuffle<T>(&mut self, items: &mut [T]) -> Result<(), OramError> {
        items.shuffle(&mut self.rng);
        Ok(())
    }
}

/// Encrypts a Normal block in place. Dummy blocks are left untouched.
///
/// A fresh nonce is drawn into `header.iv`, `data` is replaced by the ciphertext of the same length,
/// and the tag is written to `header.mac_tag`.
///
/// # Errors
///
/// Propagates `RandomnessError` or `EncryptionError` from the engine. The block must not be
/// stored after an error.
pub fn encrypt_block<const B: BlockSize, E: CryptoEngine>(
    block: &mut Block<B>,
    engine: &mut E,
) -> Result<(), OramError> {
    if !block.is_normal() {
        return Ok(());
    }

    engine.random_bytes(&mut block.header.iv)?;

    let aad = block.header.associated_data();
    let encrypted = engine.encrypt(&block.data, &block.header.iv, &aad)?;
    if encrypted.len() != B + MAC_TAG_SIZE {
        return Err(OramError::EncryptionError);
    }

    let (ciphertext, tag) = encrypted.split_at(B);
    block.header.mac_tag.copy_from_slice(tag);
    block.data.copy_from_slice(ciphertext);
    Ok(())
}

/// Verifies and decrypts a Normal block in place. Dummy blocks are left untouched.
///
/// # Errors
///
/// Returns `AuthenticationError` if the payload, tag, nonce, block id or type were altered
/// since encryption. `data` is unchanged in that case.
pub fn decrypt_block<const B: BlockSize, E: CryptoEngine>(
    block: &mut Block<B>,
    engine: &E,
) -> Result<(), OramError> {
    if !block.is_normal() {
        return Ok(());
    }

    let mut encrypted = Vec::with_capacity(B + MAC_TAG_SIZE);
    encrypted.extend_from_slice(&block.data);
    encrypted.extend_from_slice(&block.header.mac_tag);

    let aad = block.header.associated_data();
    let decrypted = engine.decrypt(&encrypted, &block.header.iv, &aad)?;
    if decrypted.len() != B {
        return Err(OramError::AuthenticationError);
    }

    block.data.copy_from_slice(&decrypted);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{block::BlockType, test_utils::*};
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn encrypt_then_decrypt_restores_payload<const B: BlockSize>() {
        init_logger();
        let mut engine = test_engine(0);
        let mut rng = StdRng::seed_from_u64(B as u64);

        let original: Block<B> = rng.gen();
        let mut block = original;

        encrypt_block(&mut block, &mut engine).unwrap();
        assert_ne!(block.header.iv, [0u8; IV_SIZE]);
        assert_ne!(block.header.mac_tag, [0u8; MAC_TAG_SIZE]);
        assert_eq!(block.header.block_id, original.header.block_id);
        if B >= 16 {
            assert_ne!(block.data, original.data);
        }

        decrypt_block(&mut block, &engine).unwrap();
        assert_eq!(block.data, original.data);
    }

    macro_rules! create_crypto_round_trip_test {
        ($block_size: expr) => {
            paste::paste! {
                #[test]
                fn [<encrypt_then_decrypt_restores_payload_ $block_size>]() {
                    encrypt_then_decrypt_restores_payload::<$block_size>();
                }
            }
        };
    }

    create_crypto_round_trip_test!(1);
    create_crypto_round_trip_test!(16);
    create_crypto_round_trip_test!(64);
    create_crypto_round_trip_test!(4096);

    #[test]
    fn dummy_blocks_are_untouched() {
        let mut engine = test_engine(1);
        let mut rng = StdRng::seed_from_u64(1);
        let mut block: Block<64> = rng.gen();
        block.header.block_type = BlockType::Dummy;
        let original = block;

        encrypt_block(&mut block, &mut engine).unwrap();
        assert_eq!(block, original);
        decrypt_block(&mut block, &engine).unwrap();
        assert_eq!(block, original);
    }

    #[test]
    fn fresh_iv_per_encryption() {
        let mut engine = test_engine(2);
        let plaintext = Block::<32>::new(7, BlockType::Normal, [5u8; 32]);

        let mut first = plaintext;
        let mut second = plaintext;
        encrypt_block(&mut first, &mut engine).unwrap();
        encrypt_block(&mut second, &mut engine).unwrap();

        assert_ne!(first.header.iv, second.header.iv);
        assert_ne!(first.data, second.data);
    }

    #[test]
    fn flipping_any_ciphertext_bit_fails_authentication() {
        let mut engine = test_engine(3);
        let mut block = Block::<8>::new(3, BlockType::Normal, [0x42; 8]);
        encrypt_block(&mut block, &mut engine).unwrap();

        for byte in 0..8 {
            for bit in 0..8 {
                let mut tampered = block;
                tampered.data[byte] ^= 1 << bit;
                assert!(matches!(
                    decrypt_block(&mut tampered, &engine),
                    Err(OramError::AuthenticationError)
                ));
                assert_eq!(tampered.data[byte], block.data[byte] ^ (1 << bit));
            }
        }
    }

    #[test]
    fn flipping_any_tag_bit_fails_authentication() {
        let mut engine = test_engine(4);
        let mut block = Block::<8>::new(3, BlockType::Normal, [0x42; 8]);
        encrypt_block(&mut block, &mut engine).unwrap();

        for byte in 0..MAC_TAG_SIZE {
            for bit in 0..8 {
                let mut tampered = block;
                tampered.header.mac_tag[byte] ^= 1 << bit;
                assert!(matches!(
                    decrypt_block(&mut tampered, &engine),
                    Err(OramError::AuthenticationError)
                ));
            }
        }
    }

    #[test]
    fn rewritten_block_id_fails_authentication() {
        let mut engine = test_engine(5);
        let mut block = Block::<8>::new(3, BlockType::Normal, [0x42; 8]);
        encrypt_block(&mut block, &mut engine).unwrap();

        block.header.block_id = 4;
        assert!(matches!(
            decrypt_block(&mut block, &engine),
            Err(OramError::AuthenticationError)
        ));
    }

    #[test]
    fn wrong_key_fails_authentication() {
        let mut engine = test_engine(6);
        let other = test_engine(7);
        let mut block = Block::<8>::new(3, BlockType::Normal, [0x42; 8]);
        encrypt_block(&mut block, &mut engine).unwrap();

        assert!(decrypt_block(&mut block, &other).is_err());
    }

    #[test]
    fn randomness_failure_is_propagated() {
        let mut engine = FailingEngine;
        let mut block = Block::<8>::new(3, BlockType::Normal, [0x42; 8]);
        assert!(matches!(
            encrypt_block(&mut block, &mut engine),
            Err(OramError::RandomnessError)
        ));
    }

    #[test]
    fn key_from_hex() {
        let text = "00112233445566778899aabbccddeeff\n00112233445566778899AABBCCDDEEFF\n";
        let key = SecretKey::from_hex(text).unwrap();
        assert_eq!(key.as_bytes()[..4], [0x00, 0x11, 0x22, 0x33]);
        assert_eq!(key.as_bytes()[31], 0xff);

        assert!(SecretKey::from_hex("0011").is_err());
        assert!(SecretKey::from_hex(&"zz".repeat(KEY_SIZE)).is_err());
        assert!(matches!(
            SecretKey::from_hex(&"+f".repeat(KEY_SIZE)),
            Err(OramError::InvalidConfigurationError)
        ));
        assert!(SecretKey::from_hex(&"ab".repeat(KEY_SIZE + 1)).is_err());
    }
}
