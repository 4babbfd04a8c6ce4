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

use super::index::IndexingStrategy;
use super::index::ParityOffsetIndexing;
use super::index::XorIndexing;
use crate::error::Error;

/// The built-in cuckoo strategies a [`super::CuckooFilter`] can be created with.
///
/// The ordinal of each variant is part of the serialized format, so variants may only ever be
/// appended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum CuckooStrategy {
    /// Parity-offset alternate index over an even number of buckets (ordinal 0).
    ///
    /// Tables only need to be rounded to an even bucket count, so they stay close to the
    /// optimal size.
    #[default]
    ParityOffset,
    /// XOR alternate index over a power-of-two number of buckets (ordinal 1).
    ///
    /// This is the indexing of the original cuckoo filter paper; rounding the bucket count up
    /// to a power of two can nearly double the table.
    Xor,
}

impl CuckooStrategy {
    /// All strategies, in ordinal order.
    pub const VALUES: [CuckooStrategy; 2] = [CuckooStrategy::ParityOffset, CuckooStrategy::Xor];

    /// Returns the ordinal written to serialized filters.
    pub const fn ordinal(self) -> i32 {
        match self {
            CuckooStrategy::ParityOffset => 0,
            CuckooStrategy::Xor => 1,
        }
    }

    /// Looks a strategy up by its serialized ordinal.
    pub fn from_ordinal(ordinal: i32) -> Result<Self, Error> {
        Self::VALUES
            .into_iter()
            .find(|strategy| strategy.ordinal() == ordinal)
            .ok_or_else(|| Error::unknown_strategy(ordinal))
    }

    fn indexing(self) -> &'static dyn IndexingStrategy {
        match self {
            CuckooStrategy::ParityOffset => &ParityOffsetIndexing,
            CuckooStrategy::Xor => &XorIndexing,
        }
    }
}

impl IndexingStrategy for CuckooStrategy {
    fn index(&self, hash: i32, m: u64) -> u64 {
        self.indexing().index(hash, m)
    }

    fn alt_index(&self, index: u64, fingerprint: u64, m: u64) -> u64 {
        self.indexing().alt_index(index, fingerprint, m)
    }

    fn check_num_buckets(&self, m: u64) -> Result<(), Error> {
        self.indexing().check_num_buckets(m)
    }

    fn round_num_buckets(&self, m: u64) -> Result<u64, Error> {
        self.indexing().round_num_buckets(m)
    }

    fn entries_per_bucket(&self, fpp: f64) -> usize {
        self.indexing().entries_per_bucket(fpp)
    }

    fn bits_per_entry(&self, fpp: f64, entries_per_bucket: usize) -> Result<u32, Error> {
        self.indexing().bits_per_entry(fpp, entries_per_bucket)
    }

    fn buckets(&self, capacity: u64, entries_per_bucket: usize) -> Result<u64, Error> {
        self.indexing().buckets(capacity, entries_per_bucket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    /// Fails whenever someone reorders the strategies; only appending is allowed.
    #[test]
    fn test_ordinals_are_stable() {
        assert_eq!(CuckooStrategy::VALUES.len(), 2);
        assert_eq!(CuckooStrategy::VALUES[0], CuckooStrategy::ParityOffset);
        assert_eq!(CuckooStrategy::VALUES[1], CuckooStrategy::Xor);
        for (i, strategy) in CuckooStrategy::VALUES.into_iter().enumerate() {
            assert_eq!(strategy.ordinal(), i as i32);
            assert_eq!(CuckooStrategy::from_ordinal(i as i32).unwrap(), strategy);
        }
    }

    #[test]
    fn test_unknown_ordinal() {
        let err = CuckooStrategy::from_ordinal(2).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidData);
        assert!(CuckooStrategy::from_ordinal(-1).is_err());
    }

    #[test]
    fn test_dispatch_matches_variant() {
        let m = 1 << 16;
        assert_eq!(
            CuckooStrategy::Xor.alt_index(12, 99, m),
            XorIndexing.alt_index(12, 99, m)
        );
        assert_eq!(
            CuckooStrategy::ParityOffset.alt_index(12, 99, m),
            ParityOffsetIndexing.alt_index(12, 99, m)
        );
        assert!(CuckooStrategy::Xor.check_num_buckets(6).is_err());
        assert!(CuckooStrategy::ParityOffset.check_num_buckets(6).is_ok());
        assert_eq!(CuckooStrategy::Xor.buckets(100, 2).unwrap(), 64);
        assert_eq!(CuckooStrategy::ParityOffset.buckets(100, 2).unwrap(), 60);
    }
}
