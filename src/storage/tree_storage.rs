// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Bucket storage addressed by tree position, for partition-style ORAM.

use super::{ServerStorage, StorageKind, StorageMetadata};
use crate::{
    block::BlockType, bucket::unpack_bucket, compression::CompressedBucket, BlockId, BlockSize,
    BucketSize, OramError,
};
use std::collections::BTreeMap;

/// The largest supported tree height. Level `h` holds `2^h` nodes.
pub const MAX_TREE_HEIGHT: u32 = 31;

/// The position of a bucket in the tree: level `level` (the root is level 0), node `node`
/// counted from the left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TreeTag {
    /// Depth of the node.
    pub level: u32,
    /// Index of the node within its level.
    pub node: u32,
}

impl TreeTag {
    /// Instantiates a tag.
    pub fn new(level: u32, node: u32) -> Self {
        Self { level, node }
    }
}

/// Block ids and types of every bucket, as reported by [`TreeStorage::dump`].
pub type TreeDump = Vec<(TreeTag, Vec<(BlockId, BlockType)>)>;

/// A tree of buckets of height `height`, stored sparsely.
#[derive(Debug)]
pub struct TreeStorage {
    metadata: StorageMetadata,
    height: u32,
    buckets: BTreeMap<TreeTag, CompressedBucket>,
}

impl TreeStorage {
    /// Returns an empty tree with levels `0..=height`, each address holding `bucket_size` blocks.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfigurationError` if `height` exceeds [`MAX_TREE_HEIGHT`]
    /// or `bucket_size` is 0.
    pub fn new_with_parameters(
        id: u32,
        height: u32,
        bucket_size: BucketSize,
        instance_hash: &str,
    ) -> Result<Self, OramError> {
        log::info!(
            "TreeStorage::new(id = {}, height = {}, bucket_size = {})",
            id,
            height,
            bucket_size
        );

        if height > MAX_TREE_HEIGHT || bucket_size == 0 {
            return Err(OramError::InvalidConfigurationError);
        }

        let capacity = usize::try_from((2u64 << height) - 1)?;

        Ok(Self {
            metadata: StorageMetadata {
                id,
                capacity,
                bucket_size,
                instance_hash: instance_hash.to_string(),
                kind: StorageKind::Tree,
            },
            height,
            buckets: BTreeMap::new(),
        })
    }

    /// The height of the tree.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// The number of addresses written so far.
    pub fn occupied(&self) -> usize {
        self.buckets.len()
    }

    /// Decompresses every stored bucket and reports the id and type of each of its blocks,
    /// in tag order. Logs the same at debug level. Stored state is not modified.
    ///
    /// Encrypted Normal blocks keep their id and type in the clear, so no key is needed.
    pub fn dump<const B: BlockSize>(&self) -> Result<TreeDump, OramError> {
        log::debug!("The size of the ORAM tree is {}", self.buckets.len());

        let mut result = Vec::with_capacity(self.buckets.len());
        for (tag, compressed) in &self.buckets {
            log::debug!("Tag {}, {}: ", tag.level, tag.node);

            let entries: Vec<(BlockId, BlockType)> = unpack_bucket::<B>(compressed)?
                .iter()
                .map(|block| (block.header.block_id, block.header.block_type))
                .collect();
            for (block_id, block_type) in &entries {
                log::debug!("id: {}, type: {:?}", block_id, block_type);
            }

            result.push((*tag, entries));
        }
        Ok(result)
    }
}

impl ServerStorage for TreeStorage {
    type Address = TreeTag;

    fn metadata(&self) -> &StorageMetadata {
        &self.metadata
    }

    fn in_range(&self, address: TreeTag) -> bool {
        address.level <= self.height && u64::from(address.node) < (1u64 << address.level)
    }

    fn store(&mut self, address: TreeTag, bucket: CompressedBucket) -> Result<(), OramError> {
        if !self.in_range(address) {
            return Err(OramError::AddressOutOfBoundsError);
        }

        log::debug!("Physical write -- {:?}", address);
        self.buckets.insert(address, bucket);
        Ok(())
    }

    fn fetch(&self, address: TreeTag) -> Result<&CompressedBucket, OramError> {
        if !self.in_range(address) {
            return Err(OramError::AddressOutOfBoundsError);
        }

        log::debug!("Physical read -- {:?}", address);
        self.buckets
            .get(&address)
            .ok_or(OramError::BucketNotFoundError)
    }
}
