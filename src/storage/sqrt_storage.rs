// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Flat bucket storage for square-root ORAM.
//!
//! Storage is split into three disjoint regions: main memory holding `capacity` slots,
//! and a dummy pool and a shelter holding `squared_m` slots each.

use super::{ServerStorage, StorageKind, StorageMetadata};
use crate::{compression::CompressedBucket, BucketSize, OramError};

/// One of the three regions of a [`SqrtStorage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Region {
    /// The permuted real blocks.
    MainMemory,
    /// Dummies read in place of blocks already found in the shelter.
    Dummy,
    /// Blocks accessed during the current epoch.
    Shelter,
}

/// An offset within one region.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SqrtAddress {
    /// The region addressed.
    pub region: Region,
    /// The slot within `region`.
    pub offset: u32,
}

impl SqrtAddress {
    /// Instantiates an address.
    pub fn new(region: Region, offset: u32) -> Self {
        Self { region, offset }
    }

    /// An address in the main memory region.
    pub fn main_memory(offset: u32) -> Self {
        Self::new(Region::MainMemory, offset)
    }

    /// An address in the dummy pool.
    pub fn dummy(offset: u32) -> Self {
        Self::new(Region::Dummy, offset)
    }

    /// An address in the shelter.
    pub fn shelter(offset: u32) -> Self {
        Self::new(Region::Shelter, offset)
    }
}

/// Three fixed-size regions of bucket slots.
#[derive(Debug)]
pub struct SqrtStorage {
    metadata: StorageMetadata,
    squared_m: usize,
    main_memory: Vec<Option<CompressedBucket>>,
    dummy: Vec<Option<CompressedBucket>>,
    shelter: Vec<Option<CompressedBucket>>,
}

impl SqrtStorage {
    /// Returns empty storage with `capacity` main memory slots and `squared_m` slots in each of
    /// the dummy pool and the shelter. Every slot holds `bucket_size` blocks.
    ///
    /// # Errors
    ///
    /// Returns an `InvalidConfigurationError` if `capacity`, `squared_m` or `bucket_size` is 0,
    /// or if a region does not fit in the `u32` offset space.
    pub fn new_with_parameters(
        id: u32,
        capacity: usize,
        bucket_size: BucketSize,
        squared_m: usize,
        instance_hash: &str,
    ) -> Result<Self, OramError> {
        log::info!(
            "SqrtStorage::new(id = {}, capacity = {}, squared_m = {})",
            id,
            capacity,
            squared_m
        );

        if capacity == 0 || squared_m == 0 || bucket_size == 0 {
            return Err(OramError::InvalidConfigurationError);
        }
        if u32::try_from(capacity).is_err() || u32::try_from(squared_m).is_err() {
            return Err(OramError::InvalidConfigurationError);
        }

        Ok(Self {
            metadata: StorageMetadata {
                id,
                capacity,
                bucket_size,
                instance_hash: instance_hash.to_string(),
                kind: StorageKind::Flat,
            },
            squared_m,
            main_memory: vec![None; capacity],
            dummy: vec![None; squared_m],
            shelter: vec![None; squared_m],
        })
    }

    /// The square-root parameter sizing the dummy pool and the shelter.
    pub fn squared_m(&self) -> usize {
        self.squared_m
    }

    /// The number of slots in `region`.
    pub fn region_len(&self, region: Region) -> usize {
        self.region(region).len()
    }

    /// The total number of slots across all regions.
    pub fn total_len(&self) -> usize {
        self.main_memory.len() + self.dummy.len() + self.shelter.len()
    }

    /// Forgets every bucket in the shelter, as at the end of an epoch.
    pub fn clear_shelter(&mut self) {
        log::debug!("Clearing shelter of {} slots", self.shelter.len());
        self.shelter.iter_mut().for_each(|slot| *slot = None);
    }

    fn region(&self, region: Region) -> &[Option<CompressedBucket>] {
        match region {
            Region::MainMemory => &self.main_memory,
            Region::Dummy => &self.dummy,
            Region::Shelter => &self.shelter,
        }
    }

    fn region_mut(&mut self, region: Region) -> &mut [Option<CompressedBucket>] {
        match region {
            Region::MainMemory => &mut self.main_memory,
            Region::Dummy => &mut self.dummy,
            Region::Shelter => &mut self.shelter,
        }
    }

    fn slot_index(&self, address: SqrtAddress) -> Result<usize, OramError> {
        if !self.in_range(address) {
            return Err(OramError::AddressOutOfBoundsError);
        }
        Ok(usize::try_from(address.offset)?)
    }
}

impl ServerStorage for SqrtStorage {
    type Address = SqrtAddress;

    fn metadata(&self) -> &StorageMetadata {
        &self.metadata
    }

    fn in_range(&self, address: SqrtAddress) -> bool {
        match usize::try_from(address.offset) {
            Ok(offset) => offset < self.region_len(address.region),
            Err(_) => false,
        }
    }

    fn store(&mut self, address: SqrtAddress, bucket: CompressedBucket) -> Result<(), OramError> {
        let index = self.slot_index(address)?;

        log::debug!("Physical write -- {:?}", address);
        self.region_mut(address.region)[index] = Some(bucket);
        Ok(())
    }

    fn fetch(&self, address: SqrtAddress) -> Result<&CompressedBucket, OramError> {
        let index = self.slot_index(address)?;

        log::debug!("Physical read -- {:?}", address);
        self.region(address.region)[index]
            .as_ref()
            .ok_or(OramError::BucketNotFoundError)
    }
}
