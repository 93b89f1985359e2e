// Copyright (c) Meta Platforms, Inc. and affiliates.
//
// This source code is dual-licensed under either the MIT license found in the
// LICENSE-MIT file in the root directory of this source tree or the Apache
// License, Version 2.0 found in the LICENSE-APACHE file in the root directory
// of this source tree. You may select, at your option, one of the above-listed licenses.

//! Utilities.
//!
//! File loading here is permissive: a missing or unreadable file is logged and yields an empty result.

use std::fs;
use std::path::Path;

/// Reads a whole key or certificate file. Returns an empty string if the file cannot be read.
pub fn read_key_file<P: AsRef<Path>>(path: P) -> String {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(error) => {
            log::error!("Failed to read key file {}: {}", path.display(), error);
            String::new()
        }
    }
}

/// Reads a line-oriented data file, one entry per line without line terminators.
/// Returns an empty vector if the file cannot be read.
pub fn read_data_file<P: AsRef<Path>>(path: P) -> Vec<String> {
    let path = path.as_ref();
    match fs::read_to_string(path) {
        Ok(contents) => contents.lines().map(String::from).collect(),
        Err(error) => {
            log::error!("Failed to read data file {}: {}", path.display(), error);
            Vec::new()
        }
    }
}
