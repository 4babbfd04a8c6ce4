// Licensed to the Apache Software Foundation (ASF) under one
// or more contributor license agreements.  See the NOTICE file
// distributed with this work for additional information
// regarding copyright ownership.  The ASF licenses this file
// to you under the Apache License, Version 2.0 (the
// "License"); you may not use this file except in compliance
// with the License.  You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing,
// software distributed under the License is distributed on an
// "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
// KIND, either express or implied.  See the License for the
// specific language governing permissions and limitations
// under the License.

mod murmurhash;

use std::hash::Hash;

pub(crate) use self::murmurhash::MurmurHash3X64128;

/// The seed 9001 used to hash objects added to a filter is a prime number that was chosen very
/// early on in experimental testing.
///
/// Two filters can only be combined when they hash with the same seed; otherwise the same object
/// would land on different buckets with different fingerprints in each of them.
pub(crate) const DEFAULT_UPDATE_SEED: u64 = 9001;

/// The two independent 32-bit halves taken from the first word of an object's 128-bit digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HashHalves {
    /// Low half; drives the primary bucket index.
    pub index_hash: i32,
    /// High half; drives the fingerprint.
    pub fingerprint_hash: u32,
}

/// Hashes `item` with MurmurHash3 x64-128 and splits the digest for the cuckoo pipeline.
pub(crate) fn hash_halves<T: Hash + ?Sized>(item: &T, seed: u64) -> HashHalves {
    let mut hasher = MurmurHash3X64128::with_seed(seed);
    item.hash(&mut hasher);
    let (h1, _) = hasher.finish128();
    HashHalves {
        index_hash: h1 as u32 as i32,
        fingerprint_hash: (h1 >> 32) as u32,
    }
}

/// Deterministic 32-bit integer hash: low half of MurmurHash3 x64-128 (seed 0) over the
/// little-endian bytes of `value`.
pub(crate) fn hash_i32(value: i32) -> i32 {
    use std::hash::Hasher;

    let mut hasher = MurmurHash3X64128::with_seed(0);
    hasher.write(&value.to_le_bytes());
    let (h1, _) = hasher.finish128();
    h1 as u32 as i32
}
