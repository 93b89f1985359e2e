// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! LZ4 block compression for persisted buckets.

use crate::OramError;
use lz4_flex::block::{compress_into, decompress_into, get_maximum_output_size};

/// Output bound multiplier applied to bytes that arrive without their uncompressed length.
pub const DEFAULT_DECOMPRESSION_FACTOR: usize = 2;

/// Compresses `data`.
///
/// # Errors
///
/// Returns `CompressionError` if the engine fails or produces no output.
pub fn compress(data: &[u8]) -> Result<Vec<u8>, OramError> {
    let mut out = vec![0u8; get_maximum_output_size(data.len())];
    let compressed_size = compress_into(data, &mut out).map_err(|_| OramError::CompressionError)?;

    if compressed_size == 0 {
        return Err(OramError::CompressionError);
    }

    out.truncate(compressed_size);
    Ok(out)
}

/// Decompresses `data`, which must expand to at most `bound` bytes.
///
/// # Errors
///
/// Returns `DecompressionError` if the engine fails, the output does not fit in `bound`,
/// or nothing is produced.
pub fn decompress(data: &[u8], bound: usize) -> Result<Vec<u8>, OramError> {
    let mut out = vec![0u8; bound];
    let decompressed_size =
        decompress_into(data, &mut out).map_err(|_| OramError::DecompressionError { bound })?;

    if decompressed_size == 0 {
        return Err(OramError::DecompressionError { bound });
    }

    out.truncate(decompressed_size);
    Ok(out)
}

/// Decompresses `data` assuming it expands to at most
/// [`DEFAULT_DECOMPRESSION_FACTOR`] times its compressed length.
///
/// Highly compressible inputs exceed this bound. Prefer [`CompressedBucket`], which
/// records the true length.
pub fn decompress_with_default_bound(data: &[u8]) -> Result<Vec<u8>, OramError> {
    decompress(data, data.len() * DEFAULT_DECOMPRESSION_FACTOR)
}

/// The persisted form of a bucket: its compressed bytes and the length they expand to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CompressedBucket {
    /// LZ4 block of the concatenated encoded blocks.
    pub bytes: Vec<u8>,
    /// Length of the concatenated encoded blocks.
    pub uncompressed_len: usize,
}

impl CompressedBucket {
    /// Compresses `data`, remembering its length.
    pub fn compress(data: &[u8]) -> Result<Self, OramError> {
        Ok(Self {
            bytes: compress(data)?,
            uncompressed_len: data.len(),
        })
    }

    /// Wraps bytes received without a length, using the default bound convention.
    pub fn from_wire(bytes: Vec<u8>) -> Self {
        let uncompressed_len = bytes.len() * DEFAULT_DECOMPRESSION_FACTOR;
        Self {
            bytes,
            uncompressed_len,
        }
    }

    /// Recovers the uncompressed bytes.
    pub fn decompress(&self) -> Result<Vec<u8>, OramError> {
        decompress(&self.bytes, self.uncompressed_len)
    }
}
