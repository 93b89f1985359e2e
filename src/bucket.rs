// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Buckets: sampling fresh shuffled buckets, and converting buckets to and from their persisted form.

use crate::{
    block::{Block, BlockType},
    compression::CompressedBucket,
    crypto::CryptoEngine,
    BlockId, BlockSize, OramError,
};
use subtle::ConstantTimeLess;

/// An ordered group of blocks stored under one physical address.
pub type Bucket<const B: BlockSize> = Vec<Block<B>>;

/// Builds a bucket of `tree_size` blocks with ids `initial_offset..initial_offset + tree_size`,
/// the first `total_virtual_size / 2` of which are Normal and the rest Dummy, then shuffles it.
///
/// The first payload byte of each block holds the low byte of its id; the remaining payload bytes
/// are random. The returned blocks are plaintext.
///
/// # Errors
///
/// Propagates `RandomnessError` and `ShuffleError` from the engine, and returns
/// `IntegerConversionError` if an id does not fit in a [`BlockId`].
pub fn sample_random_bucket<const B: BlockSize, E: CryptoEngine>(
    total_virtual_size: usize,
    tree_size: usize,
    initial_offset: usize,
    engine: &mut E,
) -> Result<Bucket<B>, OramError> {
    let real_count = u64::try_from(total_virtual_size / 2)?;

    log::debug!(
        "Sampling bucket of {} blocks starting at id {} ({} real)",
        tree_size,
        initial_offset,
        real_count.min(u64::try_from(tree_size)?)
    );

    let mut bucket = Bucket::<B>::with_capacity(tree_size);
    for i in 0..tree_size {
        let block_id = BlockId::try_from(i + initial_offset)?;
        let is_normal = u64::try_from(i)?.ct_lt(&real_count);

        let mut block = Block::<B>::new(block_id, BlockType::ct_select_normal(is_normal), [0u8; B]);
        if let Some((first, rest)) = block.data.split_first_mut() {
            *first = block_id.to_le_bytes()[0];
            engine.random_bytes(rest)?;
        }

        bucket.push(block);
    }

    engine.random_shuffle(&mut bucket)?;

    Ok(bucket)
}

/// Encodes every block of `bucket` separately.
pub fn serialize_bucket<const B: BlockSize>(bucket: &[Block<B>]) -> Vec<Vec<u8>> {
    bucket.iter().map(Block::<B>::encode).collect()
}

/// Decodes a bucket from separately encoded blocks.
///
/// # Errors
///
/// Returns `InvalidSize` if any entry has the wrong length.
pub fn deserialize_bucket<const B: BlockSize, T: AsRef<[u8]>>(
    encoded: &[T],
) -> Result<Bucket<B>, OramError> {
    encoded
        .iter()
        .map(|bytes| Block::<B>::decode(bytes.as_ref()))
        .collect()
}

/// Converts a bucket to its persisted form: the concatenated block encodings, compressed.
pub fn pack_bucket<const B: BlockSize>(bucket: &[Block<B>]) -> Result<CompressedBucket, OramError> {
    let mut concatenated = Vec::with_capacity(bucket.len() * Block::<B>::SIZE);
    for block in bucket {
        block.encode_into(&mut concatenated);
    }
    CompressedBucket::compress(&concatenated)
}

/// Recovers a bucket from its persisted form.
///
/// # Errors
///
/// Returns `DecompressionError` if the bytes do not decompress, and `InvalidSize` if the result
/// is not a whole number of blocks.
pub fn unpack_bucket<const B: BlockSize>(
    compressed: &CompressedBucket,
) -> Result<Bucket<B>, OramError> {
    let concatenated = compressed.decompress()?;
    if concatenated.len() % Block::<B>::SIZE != 0 {
        return Err(OramError::InvalidSize {
            expected: (concatenated.len() / Block::<B>::SIZE + 1) * Block::<B>::SIZE,
            actual: concatenated.len(),
        });
    }

    concatenated
        .chunks_exact(Block::<B>::SIZE)
        .map(Block::<B>::decode)
        .collect()
}
