// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Common test utilities for the storage primitives.

use crate::block::IV_SIZE;
use crate::crypto::{Aes256GcmEngine, CryptoEngine, SecretKey, KEY_SIZE};
use crate::OramError;
use rand::{rngs::StdRng, SeedableRng};
use simplelog::{Config, WriteLogger};
use std::sync::Once;

static INIT: Once = Once::new();

// For use in manual testing and inspection.
pub(crate) fn init_logger() {
    INIT.call_once(|| {
        WriteLogger::init(log::LevelFilter::Info, Config::default(), std::io::stdout()).unwrap()
    })
}

/// A deterministic engine whose key and randomness both derive from `seed`.
pub(crate) fn test_engine(seed: u64) -> Aes256GcmEngine<StdRng> {
    let key = SecretKey::from_bytes([seed as u8; KEY_SIZE]);
    Aes256GcmEngine::new(&key, StdRng::seed_from_u64(seed))
}

/// An engine whose every operation fails.
pub(crate) struct FailingEngine;

impl CryptoEngine for FailingEngine {
    fn random_bytes(&mut self, _: &mut [u8]) -> Result<(), OramError> {
        Err(OramError::RandomnessError)
    }

    fn encrypt(&self, _: &[u8], _: &[u8; IV_SIZE], _: &[u8]) -> Result<Vec<u8>, OramError> {
        Err(OramError::EncryptionError)
    }

    fn decrypt(&self, _: &[u8], _: &[u8; IV_SIZE], _: &[u8]) -> Result<Vec<u8>, OramError> {
        Err(OramError::AuthenticationError)
    }

    fn random_shuffle<T>(&mut self, _: &mut [T]) -> Result<(), OramError> {
        Err(OramError::ShuffleError)
    }
}
