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

use std::hash::Hash;

use super::engine::CuckooEngine;
use super::engine::DEFAULT_MAX_RELOCATION_ATTEMPTS;
use super::engine::SeededVictimPicker;
use super::index::IndexingStrategy;
use super::strategy::CuckooStrategy;
use super::table::CuckooTable;
use crate::codec::FilterBytes;
use crate::codec::FilterSlice;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;
use crate::hash::hash_halves;

/// Bytes taken by the fixed fields in front of the table words.
const HEADER_BYTES: usize = 4 + 8 + 4 + 4 + 8 + 8;

/// A cuckoo filter for probabilistic set membership testing with deletion.
///
/// Every added object is reduced to a short fingerprint stored in one of two candidate buckets.
/// Lookups check both buckets, so:
/// - No false negatives (objects added and not removed always return `true`)
/// - Tunable false positive rate, set by the fingerprint width
/// - Objects can be removed again, unlike in a Bloom filter
///
/// The filter has a fixed size. Once no free slot can be found for a new fingerprint,
/// [`add()`](Self::add) returns `false` and the filter should be treated as full.
///
/// Use [`super::CuckooFilterBuilder`] to construct instances.
#[derive(Debug, Clone)]
pub struct CuckooFilter {
    /// Seed of the object hash
    seed: u64,
    engine: CuckooEngine<CuckooStrategy>,
}

impl CuckooFilter {
    pub(super) fn from_engine(seed: u64, engine: CuckooEngine<CuckooStrategy>) -> Self {
        CuckooFilter { seed, engine }
    }

    /// Adds an object to the filter.
    ///
    /// Returns `true` if its fingerprint was stored. Adding the same object twice stores two
    /// copies, so it must be removed twice.
    ///
    /// Returns `false` if the filter is too full to take the fingerprint. The filter is left
    /// exactly as it was before the call.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probably::cuckoo::CuckooFilterBuilder;
    /// let mut filter = CuckooFilterBuilder::with_accuracy(100, 0.01).build().unwrap();
    /// assert!(filter.add("apple"));
    /// assert!(filter.contains("apple"));
    /// ```
    pub fn add<T: Hash + ?Sized>(&mut self, item: &T) -> bool {
        let halves = hash_halves(item, self.seed);
        self.engine.add(halves.index_hash, halves.fingerprint_hash)
    }

    /// Tests whether an object is possibly in the filter.
    ///
    /// Returns:
    /// - `true`: Object was **possibly** added (or false positive)
    /// - `false`: Object is **definitely not** in the filter
    pub fn contains<T: Hash + ?Sized>(&self, item: &T) -> bool {
        let halves = hash_halves(item, self.seed);
        self.engine.contains(halves.index_hash, halves.fingerprint_hash)
    }

    /// Removes one copy of an object's fingerprint, returning whether one was found.
    ///
    /// Only remove objects that are known to have been added: any object sharing the same
    /// fingerprint and bucket is indistinguishable, and one of its copies would be removed
    /// instead.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probably::cuckoo::CuckooFilterBuilder;
    /// let mut filter = CuckooFilterBuilder::with_accuracy(100, 0.01).build().unwrap();
    /// filter.add("apple");
    /// assert!(filter.remove("apple"));
    /// assert!(!filter.contains("apple"));
    /// ```
    pub fn remove<T: Hash + ?Sized>(&mut self, item: &T) -> bool {
        let halves = hash_halves(item, self.seed);
        self.engine.remove(halves.index_hash, halves.fingerprint_hash)
    }

    /// Returns whether every object is possibly in the filter.
    pub fn contains_all<I>(&self, items: I) -> bool
    where
        I: IntoIterator,
        I::Item: Hash,
    {
        items.into_iter().all(|item| self.contains(&item))
    }

    /// Adds every object, stopping at the first one that does not fit.
    ///
    /// Returns whether all of them were added; objects added before the failure stay.
    pub fn add_all_items<I>(&mut self, items: I) -> bool
    where
        I: IntoIterator,
        I::Item: Hash,
    {
        items.into_iter().all(|item| self.add(&item))
    }

    /// Removes every object, returning whether each one was found.
    ///
    /// Unlike [`add_all_items`](Self::add_all_items), this keeps going after a miss.
    pub fn remove_all<I>(&mut self, items: I) -> bool
    where
        I: IntoIterator,
        I::Item: Hash,
    {
        items
            .into_iter()
            .fold(true, |all_found, item| self.remove(&item) && all_found)
    }

    /// Adds every fingerprint held by `other` to this filter.
    ///
    /// Afterwards this filter recognizes every object either filter did. Each fingerprint is
    /// placed in the bucket it occupies in `other`, relocating entries when that bucket is full.
    ///
    /// Returns `Ok(false)` if some fingerprint could not be placed; the union stops there and
    /// fingerprints merged so far stay.
    ///
    /// # Errors
    ///
    /// Returns an error if the filters are not [compatible](Self::is_compatible).
    ///
    /// # Examples
    ///
    /// ```
    /// # use probably::cuckoo::CuckooFilterBuilder;
    /// let mut a = CuckooFilterBuilder::with_accuracy(100, 0.01).build().unwrap();
    /// let mut b = CuckooFilterBuilder::with_accuracy(100, 0.01).build().unwrap();
    /// a.add("a");
    /// b.add("b");
    ///
    /// assert!(a.add_all(&b).unwrap());
    /// assert!(a.contains("a"));
    /// assert!(a.contains("b"));
    /// ```
    ///
    /// A filter cannot be merged into itself:
    ///
    /// ```compile_fail
    /// # use probably::cuckoo::CuckooFilterBuilder;
    /// let mut a = CuckooFilterBuilder::with_accuracy(100, 0.01).build().unwrap();
    /// a.add_all(&a);
    /// ```
    pub fn add_all(&mut self, other: &CuckooFilter) -> Result<bool, Error> {
        if !self.is_compatible(other) {
            return Err(Error::incompatible("cuckoo filters are not compatible")
                .with_context("self", self.describe())
                .with_context("other", other.describe()));
        }
        Ok(self.engine.merge(other.engine.table()))
    }

    /// Returns whether [`add_all`](Self::add_all) can combine the two filters: they must be
    /// distinct and share the strategy, hash seed and table dimensions. Filters with different
    /// hash seeds store unrelated fingerprints for the same object, so they never combine.
    pub fn is_compatible(&self, other: &CuckooFilter) -> bool {
        !std::ptr::eq(self, other)
            && self.seed == other.seed
            && self.strategy() == other.strategy()
            && self.table().is_compatible(other.table())
    }

    /// Returns the number of fingerprints stored.
    pub fn size(&self) -> u64 {
        self.table().len()
    }

    /// Returns whether no fingerprint is stored.
    pub fn is_empty(&self) -> bool {
        self.table().is_empty()
    }

    /// Returns the number of slots, the most fingerprints the filter could ever hold.
    pub fn capacity(&self) -> u64 {
        self.table().capacity()
    }

    /// Returns the fraction of slots in use.
    pub fn load(&self) -> f64 {
        self.table().load()
    }

    /// Estimates the current false positive probability from the load:
    /// `1 - ((2^f - 2) / (2^f - 1))^(2 · b · load)` for `f` bits per entry and `b` slots per
    /// bucket.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probably::cuckoo::CuckooFilterBuilder;
    /// let mut filter = CuckooFilterBuilder::with_accuracy(1000, 0.03).build().unwrap();
    /// assert_eq!(filter.current_fpp(), 0.0);
    /// for i in 0..1000 {
    ///     filter.add(&i);
    /// }
    /// assert!(filter.current_fpp() > 0.01 && filter.current_fpp() < 0.03);
    /// ```
    pub fn current_fpp(&self) -> f64 {
        self.table().current_fpp()
    }

    /// Returns the size of the table in bits.
    pub fn bit_size(&self) -> u64 {
        self.table().words().len() as u64 * u64::from(u64::BITS)
    }

    /// Removes every fingerprint.
    pub fn clear(&mut self) {
        self.engine.clear();
    }

    /// Returns the indexing strategy.
    pub fn strategy(&self) -> CuckooStrategy {
        *self.engine.strategy()
    }

    /// Returns the hash seed.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the number of buckets.
    pub fn num_buckets(&self) -> u64 {
        self.table().num_buckets()
    }

    /// Returns the number of slots in each bucket.
    pub fn slots_per_bucket(&self) -> usize {
        self.table().slots_per_bucket()
    }

    /// Returns the width of each slot in bits.
    pub fn bits_per_entry(&self) -> u32 {
        self.table().bits_per_entry()
    }

    /// Returns how many evictions one insertion may perform.
    pub fn max_relocation_attempts(&self) -> usize {
        self.engine.max_relocation_attempts()
    }

    fn table(&self) -> &CuckooTable {
        self.engine.table()
    }

    fn describe(&self) -> String {
        format!(
            "{:?} seed={} buckets={} slots={} bits={}",
            self.strategy(),
            self.seed,
            self.num_buckets(),
            self.slots_per_bucket(),
            self.bits_per_entry()
        )
    }

    /// Serializes the filter to bytes.
    ///
    /// # Format
    ///
    /// All fields are big-endian:
    ///
    /// ```text
    /// strategy ordinal   i32
    /// num_buckets        i64
    /// slots_per_bucket   i32
    /// bits_per_entry     i32
    /// count              i64
    /// word_count         i64
    /// words              u64 × word_count
    /// ```
    ///
    /// The hash seed is not written; filters with a custom seed must be read back with
    /// [`deserialize_with_seed`](Self::deserialize_with_seed).
    pub fn serialize(&self) -> Vec<u8> {
        let table = self.table();
        let words = table.words();
        let mut bytes = FilterBytes::with_capacity(HEADER_BYTES + words.len() * 8);

        // dimensions are bounded by CuckooTable::new, so these casts are lossless
        bytes.write_i32_be(self.strategy().ordinal());
        bytes.write_i64_be(table.num_buckets() as i64);
        bytes.write_i32_be(table.slots_per_bucket() as i32);
        bytes.write_i32_be(table.bits_per_entry() as i32);
        bytes.write_i64_be(table.len() as i64);
        bytes.write_i64_be(words.len() as i64);
        for &word in words {
            bytes.write_u64_be(word);
        }

        bytes.into_bytes()
    }

    /// Deserializes a filter written by [`serialize`](Self::serialize), hashing objects with the
    /// default seed (9001).
    ///
    /// The format carries neither the relocation budget nor the victim generator state. The
    /// restored filter allows [`DEFAULT_MAX_RELOCATION_ATTEMPTS`] evictions per insertion and
    /// picks victims from a generator seeded with
    /// [`DEFAULT_VICTIM_SEED`](super::DEFAULT_VICTIM_SEED), whatever the source filter was
    /// built with.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidData`](crate::error::ErrorKind::InvalidData) error if the bytes are
    /// truncated, name an unknown strategy, describe an invalid table, or carry a count that
    /// does not match the table contents.
    ///
    /// # Examples
    ///
    /// ```
    /// # use probably::cuckoo::CuckooFilter;
    /// # use probably::cuckoo::CuckooFilterBuilder;
    /// let mut filter = CuckooFilterBuilder::with_accuracy(100, 0.01).build().unwrap();
    /// filter.add("apple");
    ///
    /// let restored = CuckooFilter::deserialize(&filter.serialize()).unwrap();
    /// assert!(restored.contains("apple"));
    /// assert_eq!(restored, filter);
    /// ```
    pub fn deserialize(bytes: &[u8]) -> Result<Self, Error> {
        Self::deserialize_with_seed(bytes, DEFAULT_UPDATE_SEED)
    }

    /// Deserializes a filter written by [`serialize`](Self::serialize) from a filter that was
    /// built with a custom hash seed.
    ///
    /// The relocation budget and victim generator are reset as in
    /// [`deserialize`](Self::deserialize).
    pub fn deserialize_with_seed(bytes: &[u8], seed: u64) -> Result<Self, Error> {
        let mut cursor = FilterSlice::new(bytes);

        let ordinal = cursor
            .read_i32_be()
            .map_err(|_| Error::insufficient_data("strategy_ordinal"))?;
        let num_buckets = cursor
            .read_i64_be()
            .map_err(|_| Error::insufficient_data("num_buckets"))?;
        let slots_per_bucket = cursor
            .read_i32_be()
            .map_err(|_| Error::insufficient_data("slots_per_bucket"))?;
        let bits_per_entry = cursor
            .read_i32_be()
            .map_err(|_| Error::insufficient_data("bits_per_entry"))?;
        let count = cursor
            .read_i64_be()
            .map_err(|_| Error::insufficient_data("count"))?;
        let word_count = cursor
            .read_i64_be()
            .map_err(|_| Error::insufficient_data("word_count"))?;

        let strategy = CuckooStrategy::from_ordinal(ordinal)?;
        let num_buckets = non_negative("num_buckets", num_buckets)?;
        strategy
            .check_num_buckets(num_buckets)
            .map_err(|err| Error::deserial(err.message()))?;
        let slots_per_bucket = non_negative("slots_per_bucket", slots_per_bucket.into())?;
        let bits_per_entry = non_negative("bits_per_entry", bits_per_entry.into())?;
        let count = non_negative("count", count)?;
        let word_count = non_negative("word_count", word_count)?;

        if cursor.remaining() / 8 < word_count {
            return Err(Error::insufficient_data(format!(
                "words: expected {word_count}, only {} bytes left",
                cursor.remaining()
            )));
        }
        let mut words = Vec::with_capacity(word_count as usize);
        for _ in 0..word_count {
            let word = cursor
                .read_u64_be()
                .map_err(|_| Error::insufficient_data("words"))?;
            words.push(word);
        }

        let slots_per_bucket = usize::try_from(slots_per_bucket)
            .map_err(|_| Error::deserial("slots_per_bucket does not fit in usize"))?;
        let bits_per_entry = u32::try_from(bits_per_entry)
            .map_err(|_| Error::deserial("bits_per_entry does not fit in u32"))?;
        let table =
            CuckooTable::from_words(words, num_buckets, slots_per_bucket, bits_per_entry, count)?;
        let engine = CuckooEngine::new(
            strategy,
            table,
            SeededVictimPicker::default(),
            DEFAULT_MAX_RELOCATION_ATTEMPTS,
        )
        .map_err(|err| Error::deserial(err.message()))?;
        Ok(CuckooFilter::from_engine(seed, engine))
    }
}

fn non_negative(field: &'static str, value: i64) -> Result<u64, Error> {
    u64::try_from(value).map_err(|_| {
        Error::deserial(format!("{field} must not be negative, got {value}"))
            .with_context("field", field)
    })
}

/// Filters are equal when they hash objects the same way and their tables hold the same
/// fingerprints in each bucket, regardless of slot order.
impl PartialEq for CuckooFilter {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed
            && self.strategy() == other.strategy()
            && self.table() == other.table()
    }
}

impl Eq for CuckooFilter {}
