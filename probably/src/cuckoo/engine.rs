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

//! Insertion, lookup and deletion of fingerprints over a [`CuckooTable`].

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use super::fingerprint::MAX_FINGERPRINT_BITS;
use super::fingerprint::fingerprint;
use super::index::IndexingStrategy;
use super::table::CuckooTable;
use super::table::EMPTY_ENTRY;
use crate::error::Error;

/// Number of evictions a single insertion may perform before it gives up.
pub const DEFAULT_MAX_RELOCATION_ATTEMPTS: usize = 500;

/// Seed of the victim picker when none is configured.
pub const DEFAULT_VICTIM_SEED: u64 = 1;

/// Chooses which slot of a full bucket gets evicted during relocation.
pub trait VictimPicker {
    /// Returns a slot in `0..slots_per_bucket`.
    fn pick_victim(&mut self, slots_per_bucket: usize) -> usize;
}

/// Uniform victim selection from a seeded ChaCha8 stream, so that runs are reproducible.
#[derive(Debug, Clone)]
pub struct SeededVictimPicker {
    rng: ChaCha8Rng,
}

impl SeededVictimPicker {
    /// Creates a picker whose choices are fully determined by `seed`.
    pub fn new(seed: u64) -> Self {
        SeededVictimPicker {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl Default for SeededVictimPicker {
    fn default() -> Self {
        Self::new(DEFAULT_VICTIM_SEED)
    }
}

impl VictimPicker for SeededVictimPicker {
    fn pick_victim(&mut self, slots_per_bucket: usize) -> usize {
        self.rng.random_range(0..slots_per_bucket)
    }
}

/// The cuckoo algorithm: owns a table and places fingerprints in it according to an
/// [`IndexingStrategy`].
///
/// The engine works on pre-hashed input. `index_hash` selects the primary bucket and
/// `fingerprint_hash` is reduced to a non-zero fingerprint of `min(bits_per_entry, 32)` bits.
///
/// Adding never leaves the table in a worse state: when every relocation attempt fails, the
/// evictions performed so far are undone and the table is exactly as it was before the call.
#[derive(Debug, Clone)]
pub struct CuckooEngine<S, P = SeededVictimPicker> {
    strategy: S,
    table: CuckooTable,
    picker: P,
    max_relocation_attempts: usize,
}

impl<S: IndexingStrategy, P: VictimPicker> CuckooEngine<S, P> {
    /// Wraps `table`, checking that its bucket count suits `strategy`.
    pub fn new(
        strategy: S,
        table: CuckooTable,
        picker: P,
        max_relocation_attempts: usize,
    ) -> Result<Self, Error> {
        strategy.check_num_buckets(table.num_buckets())?;
        Ok(CuckooEngine {
            strategy,
            table,
            picker,
            max_relocation_attempts,
        })
    }

    /// Returns the indexing strategy.
    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Returns the table.
    pub fn table(&self) -> &CuckooTable {
        &self.table
    }

    /// Returns the eviction budget of one insertion.
    pub fn max_relocation_attempts(&self) -> usize {
        self.max_relocation_attempts
    }

    /// Empties the table. The victim picker keeps its state.
    pub fn clear(&mut self) {
        self.table.clear();
    }

    /// Inserts a fingerprint, trying the primary bucket, then the alternate bucket, then a chain
    /// of evictions starting at the primary bucket.
    ///
    /// Returns `false` if no room could be found; the table is then unchanged.
    pub fn add(&mut self, index_hash: i32, fingerprint_hash: u32) -> bool {
        let (fp, index) = self.locate(index_hash, fingerprint_hash);
        if self.table.put_entry(fp, index) {
            return true;
        }
        let alt = self.alt_index(index, fp);
        if self.table.put_entry(fp, alt) {
            return true;
        }
        self.relocate(fp, index)
    }

    /// Returns whether the fingerprint is stored in either of its buckets.
    pub fn contains(&self, index_hash: i32, fingerprint_hash: u32) -> bool {
        let (fp, index) = self.locate(index_hash, fingerprint_hash);
        self.table.has_entry(fp, index) || self.table.has_entry(fp, self.alt_index(index, fp))
    }

    /// Deletes one copy of the fingerprint, primary bucket first.
    pub fn remove(&mut self, index_hash: i32, fingerprint_hash: u32) -> bool {
        let (fp, index) = self.locate(index_hash, fingerprint_hash);
        if self.table.swap_any_entry(EMPTY_ENTRY, fp, index) {
            return true;
        }
        let alt = self.alt_index(index, fp);
        self.table.swap_any_entry(EMPTY_ENTRY, fp, alt)
    }

    /// Copies every fingerprint of `other` into this table at the bucket it occupies there.
    ///
    /// Stops at the first fingerprint that cannot be placed and returns `false`; fingerprints
    /// merged before that point stay. `other` must be compatible with this table.
    pub fn merge(&mut self, other: &CuckooTable) -> bool {
        debug_assert!(self.table.is_compatible(other));
        let mut merged = 0u64;
        for (bucket, fp) in other.entries() {
            if !self.table.put_entry(fp, bucket) && !self.relocate(fp, bucket) {
                tracing::debug!(
                    merged,
                    remaining = other.len() - merged,
                    load = self.table.load(),
                    "merge stopped on a full table"
                );
                return false;
            }
            merged += 1;
        }
        true
    }

    fn fingerprint_width(&self) -> u32 {
        self.table.bits_per_entry().min(MAX_FINGERPRINT_BITS)
    }

    fn locate(&self, index_hash: i32, fingerprint_hash: u32) -> (u64, u64) {
        let fp = u64::from(fingerprint(fingerprint_hash, self.fingerprint_width()));
        let index = self.strategy.index(index_hash, self.table.num_buckets());
        (fp, index)
    }

    fn alt_index(&self, index: u64, fp: u64) -> u64 {
        self.strategy.alt_index(index, fp, self.table.num_buckets())
    }

    /// Places `fp` in `bucket` by evicting a victim and moving it to its alternate bucket,
    /// repeating until some victim finds a free slot.
    fn relocate(&mut self, fp: u64, bucket: u64) -> bool {
        let slots = self.table.slots_per_bucket();
        let mut trail = Vec::new();
        let mut fp = fp;
        let mut bucket = bucket;

        for attempt in 1..=self.max_relocation_attempts {
            let slot = self.picker.pick_victim(slots);
            let victim = self.table.swap_entry(fp, bucket, slot);
            trail.push((bucket, slot, victim));

            let alt = self.alt_index(bucket, victim);
            if self.table.put_entry(victim, alt) {
                tracing::trace!(attempt, "relocation succeeded");
                return true;
            }
            fp = victim;
            bucket = alt;
        }

        // each eviction swapped one slot; undoing them newest first restores the table
        for (bucket, slot, victim) in trail.into_iter().rev() {
            self.table.swap_entry(victim, bucket, slot);
        }
        tracing::debug!(
            attempts = self.max_relocation_attempts,
            load = self.table.load(),
            "relocation exhausted, evictions rolled back"
        );
        false
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::cuckoo::index::ParityOffsetIndexing;
    use crate::cuckoo::index::XorIndexing;

    /// XOR with the raw fingerprint; easy to follow by hand.
    struct PlainXor;

    impl IndexingStrategy for PlainXor {
        fn index(&self, hash: i32, m: u64) -> u64 {
            hash as u64 & (m - 1)
        }

        fn alt_index(&self, index: u64, fingerprint: u64, m: u64) -> u64 {
            (index ^ fingerprint) & (m - 1)
        }

        fn check_num_buckets(&self, m: u64) -> Result<(), Error> {
            XorIndexing.check_num_buckets(m)
        }

        fn round_num_buckets(&self, m: u64) -> Result<u64, Error> {
            XorIndexing.round_num_buckets(m)
        }
    }

    struct FirstSlot;

    impl VictimPicker for FirstSlot {
        fn pick_victim(&mut self, _: usize) -> usize {
            0
        }
    }

    fn engine<S: IndexingStrategy>(
        strategy: S,
        num_buckets: u64,
        slots: usize,
        bits: u32,
    ) -> CuckooEngine<S> {
        let table = CuckooTable::new(num_buckets, slots, bits).unwrap();
        CuckooEngine::new(
            strategy,
            table,
            SeededVictimPicker::default(),
            DEFAULT_MAX_RELOCATION_ATTEMPTS,
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_bucket_count() {
        let table = CuckooTable::new(6, 2, 8).unwrap();
        let picker = SeededVictimPicker::default();
        assert!(CuckooEngine::new(XorIndexing, table.clone(), picker.clone(), 10).is_err());
        assert!(CuckooEngine::new(ParityOffsetIndexing, table, picker, 10).is_ok());
    }

    #[test]
    fn test_add_contains_remove() {
        let mut engine = engine(XorIndexing, 64, 4, 12);
        assert!(!engine.contains(17, 0xdead_beef));
        assert!(engine.add(17, 0xdead_beef));
        assert!(engine.contains(17, 0xdead_beef));
        assert!(!engine.contains(18, 0xdead_beef));

        // a duplicate is a second copy
        assert!(engine.add(17, 0xdead_beef));
        assert_eq!(engine.table().len(), 2);
        assert!(engine.remove(17, 0xdead_beef));
        assert!(engine.contains(17, 0xdead_beef));
        assert!(engine.remove(17, 0xdead_beef));
        assert!(!engine.contains(17, 0xdead_beef));
        assert!(!engine.remove(17, 0xdead_beef));
        assert!(engine.table().is_empty());
    }

    #[test]
    fn test_wide_slots_hold_32_bit_fingerprints() {
        let mut engine = engine(ParityOffsetIndexing, 8, 2, 64);
        assert!(engine.add(3, u32::MAX));
        let (bucket, fp) = engine.table().entries().next().unwrap();
        assert_eq!(fp, u64::from(u32::MAX));
        assert_eq!(bucket, 3);
    }

    #[test]
    fn test_relocation_moves_victim() {
        let table = CuckooTable::new(4, 2, 32).unwrap();
        let mut engine = CuckooEngine::new(PlainXor, table, FirstSlot, 10).unwrap();
        assert!(engine.add(0, 2));
        assert!(engine.add(0, 2));
        assert!(engine.add(1, 1));
        assert!(engine.add(1, 1));

        // buckets 0 and 1 are full; one copy of 2 must move from bucket 0 to bucket 2
        assert!(engine.add(0, 1));
        let entries: Vec<_> = engine.table().entries().collect();
        assert_eq!(entries, vec![(0, 1), (0, 2), (1, 1), (1, 1), (2, 2)]);
        assert!(engine.contains(0, 1));
        assert!(engine.contains(0, 2));
    }

    #[test]
    fn test_failed_relocation_rolls_back() {
        let table = CuckooTable::new(4, 2, 32).unwrap();
        let mut engine = CuckooEngine::new(PlainXor, table, FirstSlot, 10).unwrap();
        assert!(engine.add(0, 2));
        assert!(engine.add(0, 3));
        assert!(engine.add(1, 1));
        assert!(engine.add(1, 1));
        assert!(engine.add(2, 2));
        assert!(engine.add(2, 2));
        assert!(engine.add(3, 3));
        assert!(engine.add(3, 3));
        assert_eq!(engine.table().load(), 1.0);

        let before = engine.table().clone();
        let words = before.words().to_vec();
        assert!(!engine.add(0, 1));
        assert_eq!(engine.table(), &before);
        assert_eq!(engine.table().words(), words.as_slice());
    }

    fn fill_until_failure<S: IndexingStrategy>(strategy: S, seed: u64) {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut engine = engine(strategy, 1024, 4, 16);
        let mut added = Vec::new();
        loop {
            let (index_hash, fingerprint_hash) = (rng.random::<i32>(), rng.random::<u32>());
            if !engine.add(index_hash, fingerprint_hash) {
                break;
            }
            added.push((index_hash, fingerprint_hash));
        }
        assert!(engine.table().load() > 0.9, "load {}", engine.table().load());
        assert_eq!(engine.table().len(), added.len() as u64);
        for (index_hash, fingerprint_hash) in added {
            assert!(engine.contains(index_hash, fingerprint_hash));
        }
    }

    #[test]
    fn test_no_false_negatives_up_to_failure() {
        for seed in [7, 8] {
            fill_until_failure(XorIndexing, seed);
            fill_until_failure(ParityOffsetIndexing, seed);
        }
    }

    #[test]
    fn test_merge() {
        let mut a = engine(XorIndexing, 16, 2, 8);
        let mut b = engine(XorIndexing, 16, 2, 8);
        for i in 0..8 {
            assert!(a.add(i, 0x100 + i as u32));
            assert!(b.add(i + 100, 0x200 + i as u32));
        }
        assert!(a.merge(b.table()));
        assert_eq!(a.table().len(), 16);
        for i in 0..8 {
            assert!(a.contains(i, 0x100 + i as u32));
            assert!(a.contains(i + 100, 0x200 + i as u32));
        }

        // merging into a full table stops early and keeps what fit
        let mut full = engine(ParityOffsetIndexing, 2, 2, 8);
        let mut source = engine(ParityOffsetIndexing, 2, 2, 8);
        for i in 0..4 {
            assert!(full.add(i, 1 + i as u32));
            assert!(source.add(i, 10 + i as u32));
        }
        assert!(!full.merge(source.table()));
        assert_eq!(full.table().len(), 4);
    }
}
