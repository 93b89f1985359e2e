// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Untrusted server storage for compressed, encrypted buckets.

use crate::{
    block::Block,
    bucket::{pack_bucket, unpack_bucket, Bucket},
    compression::CompressedBucket,
    crypto::{decrypt_block, encrypt_block, CryptoEngine},
    BlockSize, BucketSize, OramError,
};
use std::fmt::Debug;

pub mod sqrt_storage;
pub mod tree_storage;

/// The addressing scheme of a backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageKind {
    /// Buckets addressed by `(level, node)`.
    Tree,
    /// Buckets addressed by an offset into one of three regions.
    Flat,
}

/// Parameters describing one storage instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageMetadata {
    /// Identifier of the instance, e.g. the partition number.
    pub id: u32,
    /// Number of addressable buckets.
    pub capacity: usize,
    /// Number of blocks held at each address.
    pub bucket_size: BucketSize,
    /// Identifier of the ORAM instance this storage belongs to.
    pub instance_hash: String,
    /// Addressing scheme.
    pub kind: StorageKind,
}

/// A key-value store of persisted buckets, as seen by the server.
///
/// Backends check every address with [`ServerStorage::in_range`] and reject addresses outside it.
/// The provided methods convert between buckets and their persisted form on the way in and out.
pub trait ServerStorage {
    /// The address of one bucket.
    type Address: Copy + Debug;

    /// Returns the parameters of this instance.
    fn metadata(&self) -> &StorageMetadata;

    /// Returns `true` iff `address` is served by this instance.
    fn in_range(&self, address: Self::Address) -> bool;

    /// Persists `bucket` at `address`, replacing what was there.
    ///
    /// # Errors
    ///
    /// Returns `AddressOutOfBoundsError` if `address` is not in range.
    fn store(&mut self, address: Self::Address, bucket: CompressedBucket) -> Result<(), OramError>;

    /// Returns the bucket persisted at `address`.
    ///
    /// # Errors
    ///
    /// Returns `AddressOutOfBoundsError` if `address` is not in range, and `BucketNotFoundError`
    /// if nothing was ever stored there.
    fn fetch(&self, address: Self::Address) -> Result<&CompressedBucket, OramError>;

    /// Compresses `bucket` and stores it at `address`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidBucketLength` unless `bucket` holds exactly `bucket_size` blocks.
    fn write_bucket<const B: BlockSize>(
        &mut self,
        address: Self::Address,
        bucket: &[Block<B>],
    ) -> Result<(), OramError> {
        let expected = self.metadata().bucket_size;
        if bucket.len() != expected {
            return Err(OramError::InvalidBucketLength {
                expected,
                actual: bucket.len(),
            });
        }
        self.store(address, pack_bucket(bucket)?)
    }

    /// Fetches and decompresses the bucket at `address`.
    fn read_bucket<const B: BlockSize>(
        &self,
        address: Self::Address,
    ) -> Result<Bucket<B>, OramError> {
        unpack_bucket(self.fetch(address)?)
    }

    /// Reads the bucket at `address`, decrypts it, hands the plaintext to `callback`,
    /// then re-encrypts and writes it back. Returns the callback's result.
    ///
    /// The whole sequence runs under one exclusive borrow, so no other access to this
    /// storage can interleave with it.
    ///
    /// # Errors
    ///
    /// Any error leaves the stored bucket unchanged.
    fn access_bucket<const B: BlockSize, E: CryptoEngine, T, F: FnOnce(&mut Bucket<B>) -> T>(
        &mut self,
        address: Self::Address,
        engine: &mut E,
        callback: F,
    ) -> Result<T, OramError> {
        let mut bucket = self.read_bucket::<B>(address)?;
        for block in bucket.iter_mut() {
            decrypt_block(block, &*engine)?;
        }

        let result = callback(&mut bucket);

        for block in bucket.iter_mut() {
            encrypt_block(block, engine)?;
        }
        self.write_bucket(address, &bucket)?;

        Ok(result)
    }
}
