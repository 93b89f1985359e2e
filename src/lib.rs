// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Server-visible storage primitives for Oblivious RAM.
//!
//! This crate provides the pieces an ORAM access protocol calls into when it talks to
//! untrusted storage:
//!
//! - a fixed-layout block codec ([`Block`]),
//! - LZ4 compression of persisted buckets ([`compression`]),
//! - per-block AES-GCM authenticated encryption ([`crypto`]),
//! - stash padding and random bucket sampling ([`stash`], [`bucket`]),
//! - two storage backends behind one [`ServerStorage`] trait: a tree-tagged store for
//!   partition-style ORAM and a three-region store for square-root ORAM.
//!
//! The access protocol itself (position map, eviction schedule, transport) lives elsewhere.
//!
//! ## Errors
//!
//! Every primitive returns `Result<_, OramError>`. An `OramError` always means that a
//! security or format invariant no longer holds, so it must never be ignored or retried past.
//! Code that owns the process boundary should terminate with [`FailStop::or_abort`].

#![warn(clippy::cargo, clippy::doc_markdown, missing_docs, rustdoc::all)]

use std::num::TryFromIntError;
use thiserror::Error;

pub mod block;
pub mod bucket;
pub mod compression;
pub mod crypto;
pub mod stash;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod test_utils;

pub use crate::block::{Block, BlockHeader, BlockType, DefaultBlock};
pub use crate::bucket::{sample_random_bucket, Bucket};
pub use crate::compression::CompressedBucket;
pub use crate::crypto::{decrypt_block, encrypt_block, Aes256GcmEngine, CryptoEngine, SecretKey};
pub use crate::stash::{pad_stash, Stash};
pub use crate::storage::{
    sqrt_storage::{Region, SqrtAddress, SqrtStorage},
    tree_storage::{TreeStorage, TreeTag},
    ServerStorage, StorageKind, StorageMetadata,
};

/// The numeric type used to specify the size of a block payload in bytes.
pub type BlockSize = usize;

/// The numeric type of a block identifier as it appears on the wire.
pub type BlockId = u32;

/// The numeric type used to specify the number of blocks in a bucket.
pub type BucketSize = usize;

/// The payload size of a [`DefaultBlock`].
pub const DEFAULT_DATA_SIZE: BlockSize = 4096;

/// The default number of blocks held by one bucket.
pub const DEFAULT_BLOCKS_PER_BUCKET: BucketSize = 4;

/// Errors raised by the storage primitives.
///
/// None of these are recoverable at this layer. A caller that receives one must stop
/// processing the current round.
#[derive(Error, Debug)]
pub enum OramError {
    /// A buffer did not have the exact length required by the block wire format.
    #[error("Invalid block size: expected {expected} bytes, got {actual}")]
    InvalidSize {
        /// The required length.
        expected: usize,
        /// The length that was supplied.
        actual: usize,
    },
    /// A bucket did not hold the number of blocks the backend stores per address.
    #[error("Invalid bucket length: expected {expected} blocks, got {actual}")]
    InvalidBucketLength {
        /// The backend's bucket size.
        expected: usize,
        /// The number of blocks supplied.
        actual: usize,
    },
    /// The random byte source failed.
    #[error("Failed to generate random bytes")]
    RandomnessError,
    /// The authenticated encryption engine failed to encrypt.
    #[error("Failed to encrypt data")]
    EncryptionError,
    /// A ciphertext, tag or bound header failed authentication.
    #[error("Failed to decrypt data: authentication failed")]
    AuthenticationError,
    /// A random permutation could not be produced.
    #[error("Random shuffle failed")]
    ShuffleError,
    /// The compression engine produced no output.
    #[error("Failed to compress data")]
    CompressionError,
    /// The decompression engine failed or produced no output within `bound` bytes.
    #[error("Failed to decompress data within {bound} bytes")]
    DecompressionError {
        /// The output bound that was supplied to the engine.
        bound: usize,
    },
    /// An address was outside the range served by a storage backend.
    #[error("Address out of bounds")]
    AddressOutOfBoundsError,
    /// An in-range address has never been written.
    #[error("No bucket stored at the requested address")]
    BucketNotFoundError,
    /// A storage backend or key was constructed with unusable parameters.
    #[error("Invalid configuration")]
    InvalidConfigurationError,
    /// An integer did not fit into the target type.
    #[error("Arithmetic error encountered")]
    IntegerConversionError(#[from] TryFromIntError),
}

/// Terminates the process on error instead of continuing in an unknown state.
pub trait FailStop<T> {
    /// Returns the success value, or logs `reason` together with the error and aborts.
    fn or_abort(self, reason: &str) -> T;
}

impl<T> FailStop<T> for Result<T, OramError> {
    fn or_abort(self, reason: &str) -> T {
        match self {
            Ok(value) => value,
            Err(error) => {
                log::error!("{}: {}", error, reason);
                std::process::abort()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_abort_passes_success_through() {
        let result: Result<u32, OramError> = Ok(7);
        assert_eq!(result.or_abort("unreachable"), 7);
    }

    #[test]
    fn errors_describe_themselves() {
        let error = OramError::InvalidSize {
            expected: 97,
            actual: 3,
        };
        assert_eq!(error.to_string(), "Invalid block size: expected 97 bytes, got 3");
        let error: OramError = u8::try_from(300u32).unwrap_err().into();
        assert!(matches!(error, OramError::IntegerConversionError(_)));
    }
}
