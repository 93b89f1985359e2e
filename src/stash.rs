// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Padding of the client-held stash.

use crate::{
    block::{Block, BlockType},
    crypto::CryptoEngine,
    BlockSize, BucketSize, OramError,
};

/// Blocks staged by the client for future placement.
pub type Stash<const B: BlockSize> = Vec<Block<B>>;

/// Appends Dummy blocks to `stash` until it holds `bucket_size` blocks.
///
/// Every header and payload byte of a padding block except its type is drawn from the engine,
/// so padding never leaves an all-zero pattern. Existing entries keep their order.
/// A stash that already holds `bucket_size` or more blocks is left unchanged.
///
/// # Errors
///
/// Propagates `RandomnessError`. The stash may then hold some, but not all, padding blocks
/// and must be discarded.
pub fn pad_stash<const B: BlockSize, E: CryptoEngine>(
    stash: &mut Stash<B>,
    bucket_size: BucketSize,
    engine: &mut E,
) -> Result<(), OramError> {
    let stash_size = stash.len();
    if stash_size >= bucket_size {
        return Ok(());
    }

    log::debug!("Padding stash from {} to {} blocks", stash_size, bucket_size);

    stash.reserve(bucket_size - stash_size);
    for _ in stash_size..bucket_size {
        let mut encoded = vec![0u8; Block::<B>::SIZE];
        engine.random_bytes(&mut encoded)?;

        let mut dummy = Block::<B>::decode(&encoded)?;
        dummy.header.block_type = BlockType::Dummy;
        stash.push(dummy);
    }

    Ok(())
}

/// Logs the id, type and first payload byte of every block in `stash`.
pub fn log_stash<const B: BlockSize>(stash: &[Block<B>]) {
    log::debug!("Stash:");

    for block in stash {
        log::debug!(
            "Block {}: type : {:?}, data: {:?}",
            block.header.block_id,
            block.header.block_type,
            block.data.first()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    fn random_stash<const B: BlockSize>(len: usize, seed: u64) -> Stash<B> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..len).map(|_| rng.gen()).collect()
    }

    fn padding_preserves_prefix<const B: BlockSize>(original_len: usize, bucket_size: BucketSize) {
        init_logger();
        let mut engine = test_engine(original_len as u64);
        let original = random_stash::<B>(original_len, bucket_size as u64);

        let mut stash = original.clone();
        pad_stash(&mut stash, bucket_size, &mut engine).unwrap();
        log_stash(&stash);

        assert_eq!(stash.len(), bucket_size.max(original_len));
        assert_eq!(&stash[..original_len], &original[..]);
        for dummy in &stash[original_len..] {
            assert_eq!(dummy.header.block_type, BlockType::Dummy);
            assert_ne!(dummy.data, [0u8; B]);
        }
    }

    macro_rules! create_pad_stash_test {
        ($block_size: expr, $original_len: expr, $bucket_size: expr) => {
            paste::paste! {
                #[test]
                fn [<padding_preserves_prefix_ $block_size _ $original_len _ $bucket_size>]() {
                    padding_preserves_prefix::<$block_size>($original_len, $bucket_size);
                }
            }
        };
    }

    create_pad_stash_test!(16, 0, 4);
    create_pad_stash_test!(16, 3, 4);
    create_pad_stash_test!(64, 4, 4);
    create_pad_stash_test!(64, 9, 4);
    create_pad_stash_test!(64, 1, 32);

    #[test]
    fn full_stash_is_unchanged() {
        let mut engine = test_engine(0);
        let original = random_stash::<8>(6, 0);
        let mut stash = original.clone();

        pad_stash(&mut stash, 6, &mut engine).unwrap();
        assert_eq!(stash, original);
        pad_stash(&mut stash, 2, &mut engine).unwrap();
        assert_eq!(stash, original);
    }

    #[test]
    fn padding_blocks_differ_from_each_other() {
        let mut engine = test_engine(1);
        let mut stash = Stash::<32>::new();
        pad_stash(&mut stash, 8, &mut engine).unwrap();

        for i in 0..stash.len() {
            for j in (i + 1)..stash.len() {
                assert_ne!(stash[i].data, stash[j].data);
            }
        }
    }

    #[test]
    fn randomness_failure_is_propagated() {
        let mut stash = Stash::<8>::new();
        assert!(matches!(
            pad_stash(&mut stash, 4, &mut FailingEngine),
            Err(OramError::RandomnessError)
        ));
    }
}
