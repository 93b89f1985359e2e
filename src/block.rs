// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! The ORAM block and its fixed-size wire format.
//!
//! A block is encoded as
//!
//! | offset | size | field |
//! |---|---|---|
//! | 0 | 4 | `block_id`, little-endian |
//! | 4 | 1 | type tag (`0` = Normal, `1` = Dummy) |
//! | 5 | 12 | `iv` |
//! | 17 | 16 | `mac_tag` |
//! | 33 | `B` | `data` |

use crate::{BlockId, BlockSize, OramError, DEFAULT_DATA_SIZE};
use rand::{
    distributions::{Distribution, Standard},
    Rng,
};
use subtle::{Choice, ConditionallySelectable};

/// Length of the AES-GCM nonce stored in each header.
pub const IV_SIZE: usize = 12;
/// Length of the authentication tag stored in each header.
pub const MAC_TAG_SIZE: usize = 16;

const BLOCK_ID_SIZE: usize = std::mem::size_of::<BlockId>();
const TYPE_TAG_SIZE: usize = 1;

const TYPE_OFFSET: usize = BLOCK_ID_SIZE;
const IV_OFFSET: usize = TYPE_OFFSET + TYPE_TAG_SIZE;
const MAC_TAG_OFFSET: usize = IV_OFFSET + IV_SIZE;

/// Encoded length of a [`BlockHeader`].
pub const HEADER_SIZE: usize = MAC_TAG_OFFSET + MAC_TAG_SIZE;

/// A block carrying [`DEFAULT_DATA_SIZE`] payload bytes.
pub type DefaultBlock = Block<DEFAULT_DATA_SIZE>;

/// Whether a block holds client data or is a decoy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum BlockType {
    /// A block holding client data. Its payload is encrypted before storage.
    Normal,
    /// A decoy with random payload. Never processed by the crypto layer.
    #[default]
    Dummy,
    /// A tag value that is neither of the above. Kept verbatim so that decoding never loses bytes.
    Unknown(u8),
}

impl BlockType {
    const NORMAL_TAG: u8 = 0;
    const DUMMY_TAG: u8 = 1;

    /// The on-wire tag byte.
    pub fn tag(&self) -> u8 {
        match self {
            BlockType::Normal => Self::NORMAL_TAG,
            BlockType::Dummy => Self::DUMMY_TAG,
            BlockType::Unknown(tag) => *tag,
        }
    }

    /// Interprets an on-wire tag byte.
    pub fn from_tag(tag: u8) -> Self {
        match tag {
            Self::NORMAL_TAG => BlockType::Normal,
            Self::DUMMY_TAG => BlockType::Dummy,
            other => BlockType::Unknown(other),
        }
    }

    /// Selects `Normal` when `is_normal` is set and `Dummy` otherwise, without branching on it.
    pub(crate) fn ct_select_normal(is_normal: Choice) -> Self {
        Self::from_tag(u8::conditional_select(
            &Self::DUMMY_TAG,
            &Self::NORMAL_TAG,
            is_normal,
        ))
    }
}

/// Routing and authentication metadata stored in front of every payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct BlockHeader {
    /// Logical identifier, or a placeholder for dummies.
    pub block_id: BlockId,
    /// Real or decoy.
    pub block_type: BlockType,
    /// Nonce used for the most recent encryption.
    pub iv: [u8; IV_SIZE],
    /// Authentication tag produced by the most recent encryption.
    pub mac_tag: [u8; MAC_TAG_SIZE],
}

impl BlockHeader {
    /// Bytes bound to the ciphertext as associated data.
    pub(crate) fn associated_data(&self) -> [u8; BLOCK_ID_SIZE + TYPE_TAG_SIZE] {
        let mut aad = [0u8; BLOCK_ID_SIZE + TYPE_TAG_SIZE];
        aad[..BLOCK_ID_SIZE].copy_from_slice(&self.block_id.to_le_bytes());
        aad[TYPE_OFFSET] = self.block_type.tag();
        aad
    }
}

/// An ORAM block: a header followed by `B` bytes of payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Block<const B: BlockSize> {
    /// Metadata.
    pub header: BlockHeader,
    /// Plaintext or ciphertext payload, depending on where the block is in its lifecycle.
    pub data: [u8; B],
}

impl<const B: BlockSize> Default for Block<B> {
    fn default() -> Self {
        Self {
            header: BlockHeader::default(),
            data: [0u8; B],
        }
    }
}

impl<const B: BlockSize> Block<B> {
    /// The exact encoded length of a block.
    pub const SIZE: usize = HEADER_SIZE + B;

    /// Instantiates a block with a zeroed `iv` and `mac_tag`.
    pub fn new(block_id: BlockId, block_type: BlockType, data: [u8; B]) -> Self {
        Self {
            header: BlockHeader {
                block_id,
                block_type,
                ..BlockHeader::default()
            },
            data,
        }
    }

    /// Returns `true` iff the block is a Normal block.
    pub fn is_normal(&self) -> bool {
        self.header.block_type == BlockType::Normal
    }

    /// Encodes the block into exactly [`Self::SIZE`] bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::with_capacity(Self::SIZE);
        self.encode_into(&mut result);
        result
    }

    /// Appends the encoding of the block to `out`.
    pub fn encode_into(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.header.block_id.to_le_bytes());
        out.push(self.header.block_type.tag());
        out.extend_from_slice(&self.header.iv);
        out.extend_from_slice(&self.header.mac_tag);
        out.extend_from_slice(&self.data);
    }

    /// Decodes a block from exactly [`Self::SIZE`] bytes.
    ///
    /// No header or payload validation happens here; authenticity is checked by
    /// [`crate::decrypt_block`].
    ///
    /// # Errors
    ///
    /// Returns `InvalidSize` if `bytes.len() != Self::SIZE`.
    pub fn decode(bytes: &[u8]) -> Result<Self, OramError> {
        if bytes.len() != Self::SIZE {
            return Err(OramError::InvalidSize {
                expected: Self::SIZE,
                actual: bytes.len(),
            });
        }

        let (header_bytes, data_bytes) = bytes.split_at(HEADER_SIZE);

        let mut block_id = [0u8; BLOCK_ID_SIZE];
        block_id.copy_from_slice(&header_bytes[..TYPE_OFFSET]);
        let mut iv = [0u8; IV_SIZE];
        iv.copy_from_slice(&header_bytes[IV_OFFSET..MAC_TAG_OFFSET]);
        let mut mac_tag = [0u8; MAC_TAG_SIZE];
        mac_tag.copy_from_slice(&header_bytes[MAC_TAG_OFFSET..]);
        let mut data = [0u8; B];
        data.copy_from_slice(data_bytes);

        Ok(Self {
            header: BlockHeader {
                block_id: BlockId::from_le_bytes(block_id),
                block_type: BlockType::from_tag(header_bytes[TYPE_OFFSET]),
                iv,
                mac_tag,
            },
            data,
        })
    }
}

impl<const B: BlockSize> Distribution<Block<B>> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Block<B> {
        let mut result = Block::<B>::new(rng.gen(), BlockType::Normal, [0u8; B]);
        rng.fill(&mut result.data[..]);
        result
    }
}
