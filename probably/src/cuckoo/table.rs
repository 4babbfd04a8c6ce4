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

use super::sizing;
use super::sizing::MAX_BITS_PER_ENTRY;
use crate::error::Error;

/// Slot value reserved for "no fingerprint here".
pub const EMPTY_ENTRY: u64 = 0;

/// Smallest number of slots a bucket may have.
pub const MIN_SLOTS_PER_BUCKET: usize = 2;

/// A fixed-size table of `num_buckets × slots_per_bucket` fingerprints, each `bits_per_entry`
/// wide, densely packed into 64-bit words.
///
/// Slot `(bucket, slot)` occupies bits `[(bucket · slots_per_bucket + slot) · bits_per_entry, +bits_per_entry)`
/// of the bit string formed by the words in order, least significant bit first. Slots may
/// straddle two words.
///
/// Two tables are equal when they have the same dimensions and every bucket holds the same
/// multiset of fingerprints; the order of slots within a bucket is not significant.
#[derive(Debug, Clone)]
pub struct CuckooTable {
    data: Vec<u64>,
    num_buckets: u64,
    slots_per_bucket: usize,
    bits_per_entry: u32,
    count: u64,
}

impl CuckooTable {
    /// Allocates an empty table.
    ///
    /// # Errors
    ///
    /// Returns an error if `num_buckets` is 0, `slots_per_bucket` is below 2, `bits_per_entry`
    /// is not in `1..=64`, or the table is too large to address.
    pub fn new(num_buckets: u64, slots_per_bucket: usize, bits_per_entry: u32) -> Result<Self, Error> {
        let num_words = check_dimensions(num_buckets, slots_per_bucket, bits_per_entry)?;
        Ok(CuckooTable {
            data: vec![0; num_words],
            num_buckets,
            slots_per_bucket,
            bits_per_entry,
            count: 0,
        })
    }

    /// Rebuilds a table from its raw words, verifying the stored count against the contents.
    pub(crate) fn from_words(
        data: Vec<u64>,
        num_buckets: u64,
        slots_per_bucket: usize,
        bits_per_entry: u32,
        count: u64,
    ) -> Result<Self, Error> {
        let num_words = check_dimensions(num_buckets, slots_per_bucket, bits_per_entry)
            .map_err(|err| Error::deserial(err.message()))?;
        if data.len() != num_words {
            return Err(
                Error::deserial("word count does not match table dimensions")
                    .with_context("expected", num_words)
                    .with_context("actual", data.len()),
            );
        }

        let mut table = CuckooTable {
            data,
            num_buckets,
            slots_per_bucket,
            bits_per_entry,
            count: 0,
        };
        table.count = table.entries().count() as u64;
        if table.count != count {
            return Err(Error::deserial("entry count does not match table contents")
                .with_context("expected", table.count)
                .with_context("actual", count));
        }
        Ok(table)
    }

    /// Returns the number of buckets.
    pub fn num_buckets(&self) -> u64 {
        self.num_buckets
    }

    /// Returns the number of slots in each bucket.
    pub fn slots_per_bucket(&self) -> usize {
        self.slots_per_bucket
    }

    /// Returns the width of each slot in bits.
    pub fn bits_per_entry(&self) -> u32 {
        self.bits_per_entry
    }

    /// Returns the number of non-empty slots.
    pub fn len(&self) -> u64 {
        self.count
    }

    /// Returns whether every slot is empty.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns the total number of slots.
    pub fn capacity(&self) -> u64 {
        self.num_buckets * self.slots_per_bucket as u64
    }

    /// Returns the backing words.
    pub fn words(&self) -> &[u64] {
        &self.data
    }

    /// Returns the fraction of slots holding a fingerprint.
    pub fn load(&self) -> f64 {
        self.count as f64 / self.capacity() as f64
    }

    /// Estimates the probability that a lookup of an absent object matches some fingerprint at
    /// the current load.
    pub fn current_fpp(&self) -> f64 {
        let values = 2f64.powi(self.bits_per_entry as i32);
        let miss = (values - 2.0) / (values - 1.0);
        1.0 - miss.powf(2.0 * self.slots_per_bucket as f64 * self.load())
    }

    /// Returns whether `other` has the same dimensions.
    pub fn is_compatible(&self, other: &CuckooTable) -> bool {
        self.num_buckets == other.num_buckets
            && self.slots_per_bucket == other.slots_per_bucket
            && self.bits_per_entry == other.bits_per_entry
    }

    /// Empties every slot.
    pub fn clear(&mut self) {
        self.data.fill(0);
        self.count = 0;
    }

    /// Returns the value held by one slot.
    ///
    /// # Panics
    ///
    /// Panics if `bucket` or `slot` is out of range.
    pub fn read_entry(&self, bucket: u64, slot: usize) -> u64 {
        read_bits(&self.data, self.bit_offset(bucket, slot), self.bits_per_entry)
    }

    /// Returns whether any slot of `bucket` holds `fingerprint`. Never true for
    /// [`EMPTY_ENTRY`] or for a value wider than a slot.
    ///
    /// # Panics
    ///
    /// Panics if `bucket` is out of range.
    pub fn has_entry(&self, fingerprint: u64, bucket: u64) -> bool {
        self.check_bucket(bucket);
        self.fits(fingerprint)
            && fingerprint != EMPTY_ENTRY
            && self.find_slot(fingerprint, bucket).is_some()
    }

    /// Stores `fingerprint` in the first empty slot of `bucket`, if there is one.
    ///
    /// Returns `false`, leaving the table untouched, if the bucket is full or `fingerprint` is
    /// [`EMPTY_ENTRY`] or wider than a slot.
    ///
    /// # Panics
    ///
    /// Panics if `bucket` is out of range.
    pub fn put_entry(&mut self, fingerprint: u64, bucket: u64) -> bool {
        self.check_bucket(bucket);
        if fingerprint == EMPTY_ENTRY || !self.fits(fingerprint) {
            return false;
        }
        self.swap_any_entry(fingerprint, EMPTY_ENTRY, bucket)
    }

    /// Replaces the first slot of `bucket` holding `match_value` with `new_value`.
    ///
    /// Returns `false`, leaving the table untouched, if no slot matches. Matching on
    /// [`EMPTY_ENTRY`] inserts; replacing with [`EMPTY_ENTRY`] deletes. `new_value` is cut to
    /// the slot width as in [`swap_entry`](Self::swap_entry).
    ///
    /// # Panics
    ///
    /// Panics if `bucket` is out of range.
    pub fn swap_any_entry(&mut self, new_value: u64, match_value: u64, bucket: u64) -> bool {
        self.check_bucket(bucket);
        if !self.fits(match_value) {
            return false;
        }
        match self.find_slot(match_value, bucket) {
            Some(slot) => {
                self.swap_entry(new_value, bucket, slot);
                true
            }
            None => false,
        }
    }

    /// Writes the low `bits_per_entry` bits of `value` into one slot and returns what was
    /// there before. The count follows the value actually stored.
    ///
    /// # Panics
    ///
    /// Panics if `bucket` or `slot` is out of range.
    pub fn swap_entry(&mut self, value: u64, bucket: u64, slot: usize) -> u64 {
        let offset = self.bit_offset(bucket, slot);
        let value = value & low_mask(self.bits_per_entry);
        let old = write_bits(value, &mut self.data, offset, self.bits_per_entry);
        match (old == EMPTY_ENTRY, value == EMPTY_ENTRY) {
            (true, false) => self.count += 1,
            (false, true) => self.count -= 1,
            _ => {}
        }
        old
    }

    /// Iterates over `(bucket, fingerprint)` for every non-empty slot, in slot order.
    pub fn entries(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        (0..self.num_buckets).flat_map(move |bucket| {
            (0..self.slots_per_bucket).filter_map(move |slot| {
                let entry = self.read_entry(bucket, slot);
                (entry != EMPTY_ENTRY).then_some((bucket, entry))
            })
        })
    }

    fn find_slot(&self, value: u64, bucket: u64) -> Option<usize> {
        (0..self.slots_per_bucket).find(|&slot| self.read_entry(bucket, slot) == value)
    }

    fn fits(&self, value: u64) -> bool {
        value & !low_mask(self.bits_per_entry) == 0
    }

    fn check_bucket(&self, bucket: u64) {
        assert!(
            bucket < self.num_buckets,
            "bucket {bucket} out of range for {} buckets",
            self.num_buckets
        );
    }

    fn bit_offset(&self, bucket: u64, slot: usize) -> u64 {
        self.check_bucket(bucket);
        assert!(
            slot < self.slots_per_bucket,
            "slot {slot} out of range for {} slots per bucket",
            self.slots_per_bucket
        );
        (bucket * self.slots_per_bucket as u64 + slot as u64) * u64::from(self.bits_per_entry)
    }

    /// Collects the non-empty slots of `bucket` into `out`, sorted.
    fn sorted_bucket(&self, bucket: u64, out: &mut Vec<u64>) {
        out.clear();
        out.extend(
            (0..self.slots_per_bucket)
                .map(|slot| self.read_entry(bucket, slot))
                .filter(|&entry| entry != EMPTY_ENTRY),
        );
        out.sort_unstable();
    }
}

impl PartialEq for CuckooTable {
    fn eq(&self, other: &Self) -> bool {
        if !self.is_compatible(other) || self.count != other.count {
            return false;
        }
        let mut lhs = Vec::with_capacity(self.slots_per_bucket);
        let mut rhs = Vec::with_capacity(self.slots_per_bucket);
        (0..self.num_buckets).all(|bucket| {
            self.sorted_bucket(bucket, &mut lhs);
            other.sorted_bucket(bucket, &mut rhs);
            lhs == rhs
        })
    }
}

impl Eq for CuckooTable {}

fn check_dimensions(
    num_buckets: u64,
    slots_per_bucket: usize,
    bits_per_entry: u32,
) -> Result<usize, Error> {
    if num_buckets == 0 {
        return Err(Error::invalid_argument("num_buckets must be at least 1"));
    }
    if slots_per_bucket < MIN_SLOTS_PER_BUCKET {
        return Err(Error::invalid_argument(format!(
            "slots_per_bucket must be at least {MIN_SLOTS_PER_BUCKET}, got {slots_per_bucket}"
        )));
    }
    if !(1..=MAX_BITS_PER_ENTRY).contains(&bits_per_entry) {
        return Err(Error::invalid_argument(format!(
            "bits_per_entry must be in 1..={MAX_BITS_PER_ENTRY}, got {bits_per_entry}"
        )));
    }
    sizing::required_words(num_buckets, slots_per_bucket, bits_per_entry).ok_or_else(|| {
        Error::invalid_argument("table dimensions are too large to address")
            .with_context("num_buckets", num_buckets)
            .with_context("slots_per_bucket", slots_per_bucket)
            .with_context("bits_per_entry", bits_per_entry)
    })
}

fn low_mask(length: u32) -> u64 {
    u64::MAX >> (u64::BITS - length)
}

/// Reads the `length`-bit unsigned value stored at `bit_offset`, which may straddle two words.
///
/// # Panics
///
/// Panics if the span reaches past the end of `data`, or `length` is not in `1..=64`.
pub fn read_bits(data: &[u64], bit_offset: u64, length: u32) -> u64 {
    assert!((1..=u64::BITS).contains(&length), "length must be in 1..=64");
    let word = (bit_offset / 64) as usize;
    let shift = (bit_offset % 64) as u32;

    let mut value = data[word] >> shift;
    if shift + length > u64::BITS {
        value |= data[word + 1] << (u64::BITS - shift);
    }
    value & low_mask(length)
}

/// Overwrites the `length`-bit span at `bit_offset` with the low `length` bits of `value`,
/// leaving all other bits untouched, and returns the span's previous content.
///
/// # Panics
///
/// Panics if the span reaches past the end of `data`, or `length` is not in `1..=64`.
pub fn write_bits(value: u64, data: &mut [u64], bit_offset: u64, length: u32) -> u64 {
    let old = read_bits(data, bit_offset, length);
    let mask = low_mask(length);
    let value = value & mask;
    let word = (bit_offset / 64) as usize;
    let shift = (bit_offset % 64) as u32;

    data[word] = (data[word] & !(mask << shift)) | (value << shift);
    if shift + length > u64::BITS {
        let spill = u64::BITS - shift;
        data[word + 1] = (data[word + 1] & !(mask >> spill)) | (value >> spill);
    }
    old
}
