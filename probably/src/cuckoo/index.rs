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

//! Primary and alternate bucket computation.
//!
//! Every fingerprint lives in one of two buckets: its primary bucket, derived from the object's
//! hash, or the alternate bucket, derived from the primary index and the fingerprint alone.
//! Because the object is gone once its fingerprint is stored, relocating an entry relies on
//! `alt_index` being an involution: applied to either bucket it returns the other.

use super::sizing;
use crate::error::Error;
use crate::hash::hash_i32;

/// Largest bucket count any strategy accepts; bucket indexes must fit in an `i64`.
pub const MAX_NUM_BUCKETS: u64 = i64::MAX as u64;

/// Computes bucket indexes for fingerprints in a table of `m` buckets.
///
/// Implementations must guarantee, for every `m` accepted by
/// [`check_num_buckets`](Self::check_num_buckets), every `index < m` and every fingerprint `fp`:
///
/// ```text
/// alt_index(alt_index(index, fp, m), fp, m) == index
/// ```
///
/// The sizing pass-throughs default to the closed-form helpers in [`sizing`].
pub trait IndexingStrategy {
    /// Maps a 32-bit hash onto `[0, m)`.
    fn index(&self, hash: i32, m: u64) -> u64;

    /// Returns the other bucket `fingerprint` may occupy, given that it is in bucket `index`.
    ///
    /// Callers must have validated `m` with [`check_num_buckets`](Self::check_num_buckets) and
    /// must pass `index < m`; see [`checked_alt_index`](Self::checked_alt_index).
    fn alt_index(&self, index: u64, fingerprint: u64, m: u64) -> u64;

    /// Rejects bucket counts that break this strategy's involution guarantee.
    fn check_num_buckets(&self, m: u64) -> Result<(), Error>;

    /// Rounds a suggested bucket count up to one this strategy accepts.
    fn round_num_buckets(&self, m: u64) -> Result<u64, Error>;

    /// Validating form of [`alt_index`](Self::alt_index).
    fn checked_alt_index(&self, index: u64, fingerprint: u64, m: u64) -> Result<u64, Error> {
        self.check_num_buckets(m)?;
        if index >= m {
            return Err(Error::invalid_argument(format!(
                "index {index} is out of range for {m} buckets"
            )));
        }
        Ok(self.alt_index(index, fingerprint, m))
    }

    /// Suggests the number of slots per bucket for the target false positive probability.
    fn entries_per_bucket(&self, fpp: f64) -> usize {
        sizing::optimal_entries_per_bucket(fpp)
    }

    /// Suggests the fingerprint width for the target false positive probability.
    fn bits_per_entry(&self, fpp: f64, entries_per_bucket: usize) -> Result<u32, Error> {
        sizing::optimal_bits_per_entry(fpp, entries_per_bucket)
    }

    /// Suggests a bucket count for `capacity` insertions, in a form this strategy accepts.
    fn buckets(&self, capacity: u64, entries_per_bucket: usize) -> Result<u64, Error> {
        let suggested = sizing::optimal_number_of_buckets(capacity, entries_per_bucket);
        self.round_num_buckets(suggested)
    }
}

/// Alternate index by XOR with the hashed fingerprint; requires a power-of-two bucket count.
///
/// With `m` a power of two, `mod m` is a bit mask and commutes with XOR, so applying the same
/// XOR twice restores the starting index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct XorIndexing;

/// Largest power of two not above [`MAX_NUM_BUCKETS`].
const MAX_POWER_OF_TWO_BUCKETS: u64 = 1 << 62;

impl IndexingStrategy for XorIndexing {
    fn index(&self, hash: i32, m: u64) -> u64 {
        floor_mod(i64::from(hash), m)
    }

    fn alt_index(&self, index: u64, fingerprint: u64, m: u64) -> u64 {
        debug_assert!(m.is_power_of_two() && index < m);
        // sign-extend the mix so the high bits take part before masking
        let mix = i64::from(mix(fingerprint)) as u64;
        (index ^ mix) & (m - 1)
    }

    fn check_num_buckets(&self, m: u64) -> Result<(), Error> {
        if !m.is_power_of_two() || m > MAX_POWER_OF_TWO_BUCKETS {
            return Err(Error::invalid_argument(format!(
                "xor indexing needs a power-of-two bucket count, got {m}"
            )));
        }
        Ok(())
    }

    fn round_num_buckets(&self, m: u64) -> Result<u64, Error> {
        m.max(1)
            .checked_next_power_of_two()
            .filter(|&rounded| rounded <= MAX_POWER_OF_TWO_BUCKETS)
            .ok_or_else(|| {
                Error::invalid_argument(format!("{m} buckets cannot be rounded to a power of two"))
            })
    }
}

/// Alternate index by adding or subtracting an odd offset; requires an even bucket count.
///
/// The offset is the hashed fingerprint forced odd. Even indexes add it, odd indexes subtract
/// it. With `m` even the two candidates always have opposite parity, so the second application
/// takes the opposite sign and cancels the first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct ParityOffsetIndexing;

impl IndexingStrategy for ParityOffsetIndexing {
    fn index(&self, hash: i32, m: u64) -> u64 {
        floor_mod(i64::from(hash), m)
    }

    fn alt_index(&self, index: u64, fingerprint: u64, m: u64) -> u64 {
        debug_assert!(m % 2 == 0 && m <= MAX_NUM_BUCKETS && index < m);
        let offset = parity_sign(index) * (i64::from(mix(fingerprint)) | 1);
        let sum = protected_sum(index as i64, offset, m as i64);
        sum.rem_euclid(m as i64) as u64
    }

    fn check_num_buckets(&self, m: u64) -> Result<(), Error> {
        if m == 0 || m % 2 != 0 || m > MAX_NUM_BUCKETS {
            return Err(Error::invalid_argument(format!(
                "parity-offset indexing needs a positive even bucket count, got {m}"
            )));
        }
        Ok(())
    }

    fn round_num_buckets(&self, m: u64) -> Result<u64, Error> {
        let rounded = m.max(2).checked_next_multiple_of(2).ok_or_else(|| {
            Error::invalid_argument(format!("{m} buckets cannot be rounded to an even count"))
        })?;
        self.check_num_buckets(rounded)?;
        Ok(rounded)
    }
}

/// Hash applied to a fingerprint before it perturbs an index.
fn mix(fingerprint: u64) -> i32 {
    hash_i32(fingerprint as u32 as i32)
}

/// Non-negative remainder of `x` modulo `m`.
fn floor_mod(x: i64, m: u64) -> u64 {
    debug_assert!(m > 0);
    match i64::try_from(m) {
        Ok(m) => x.rem_euclid(m) as u64,
        // x + m is non-negative and below 2^64 when m exceeds i64::MAX
        Err(_) => (x as u64).wrapping_add(if x < 0 { m } else { 0 }),
    }
}

/// `+1` for even indexes, `-1` for odd ones.
fn parity_sign(index: u64) -> i64 {
    1 - 2 * (index & 1) as i64
}

/// Sum of `index` and `offset`, lowered by multiples of `m` until it no longer overflows.
///
/// The result is congruent to the true sum modulo `m`. With `0 <= index < m` one reduction is
/// always enough, because a negative and a positive addend never overflow.
fn protected_sum(mut index: i64, offset: i64, m: i64) -> i64 {
    loop {
        match index.checked_add(offset) {
            Some(sum) => return sum,
            None => index -= m,
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    /// Walks `[start, max]` in roughly `steps` strides, always visiting `max`.
    fn strided(start: i64, max: i64, steps: i64) -> impl Iterator<Item = i64> {
        let stride = (max / steps).max(1);
        let mut next = Some(start);
        std::iter::from_fn(move || {
            let current = next?;
            next = match current.checked_add(stride) {
                Some(n) if n < max => Some(n),
                _ if current < max => Some(max),
                _ => None,
            };
            Some(current)
        })
    }

    fn random_fingerprint(rng: &mut ChaCha8Rng) -> u64 {
        let fp: i32 = rng.random_range(1..127) * if rng.random() { 1 } else { -1 };
        fp as u32 as u64
    }

    #[test]
    fn test_index_is_modulo_m() {
        let m = 0x1DEA;
        for strategy in [&XorIndexing as &dyn IndexingStrategy, &ParityOffsetIndexing] {
            for hash in strided(i32::MIN as i64, i32::MAX as i64, 100_000) {
                let index = strategy.index(hash as i32, m);
                assert!(index < m, "hash {hash} gave {index}");
            }
            assert_eq!(strategy.index(-1, m), m - 1);
            assert_eq!(strategy.index(i32::MIN, 1), 0);
        }
    }

    #[test]
    fn test_xor_alt_index_is_reversible() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for _ in 0..5 {
            let m = 1u64 << rng.random_range(0..63u32);
            for index in strided(0, m as i64 - 1, 100_000) {
                let index = index as u64;
                let fp = random_fingerprint(&mut rng);
                let alt = XorIndexing.alt_index(index, fp, m);
                assert!(alt < m);
                assert_eq!(XorIndexing.alt_index(alt, fp, m), index, "fp {fp} m {m}");
            }
        }
    }

    #[test]
    fn test_parity_alt_index_is_reversible() {
        let m = i64::MAX as u64 - 1;
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        for index in strided(0, m as i64 - 1, 200_000) {
            let index = index as u64;
            let fp = random_fingerprint(&mut rng);
            let alt = ParityOffsetIndexing.alt_index(index, fp, m);
            assert!(alt < m);
            assert_ne!(alt % 2, index % 2);
            assert_eq!(ParityOffsetIndexing.alt_index(alt, fp, m), index, "fp {fp}");
        }
    }

    #[test]
    fn test_alt_index_vectors() {
        let m = 1 << 20;
        assert_eq!(XorIndexing.alt_index(0, 23, m), 547013);
        assert_eq!(XorIndexing.alt_index(5, 1, m), 576251);
        assert_eq!(XorIndexing.alt_index(1000, 110, m), 387438);

        let m = 595_240;
        assert_eq!(ParityOffsetIndexing.alt_index(0, 23, m), 293093);
        assert_eq!(ParityOffsetIndexing.alt_index(5, 1, m), 324374);
        assert_eq!(ParityOffsetIndexing.alt_index(1000, 110, m), 2735);
    }

    #[test]
    fn test_parity_sum_near_overflow() {
        let m = i64::MAX as u64 - 1;
        // odd index subtracts a negative offset, pushing the sum past i64::MAX
        assert_eq!(ParityOffsetIndexing.alt_index(m - 1, 23, m), 1325901626);
        assert_eq!(ParityOffsetIndexing.alt_index(1325901626, 23, m), m - 1);
    }

    #[test]
    fn test_protected_sum() {
        assert_eq!(protected_sum(5, 3, 10), 8);
        assert_eq!(protected_sum(i64::MAX - 1, 10, i64::MAX - 1), 10);
        assert_eq!(protected_sum(3, i64::MIN, 10), 3 + i64::MIN);
    }

    #[test]
    fn test_bucket_count_preconditions() {
        assert!(XorIndexing.check_num_buckets(1 << 10).is_ok());
        assert!(XorIndexing.check_num_buckets(1000).is_err());
        assert!(XorIndexing.check_num_buckets(0).is_err());
        assert!(XorIndexing.check_num_buckets(1 << 63).is_err());

        assert!(ParityOffsetIndexing.check_num_buckets(1000).is_ok());
        assert!(ParityOffsetIndexing.check_num_buckets(999).is_err());
        assert!(ParityOffsetIndexing.check_num_buckets(0).is_err());
        assert!(ParityOffsetIndexing.check_num_buckets(u64::MAX - 1).is_err());

        assert!(XorIndexing.checked_alt_index(3, 7, 1000).is_err());
        assert!(ParityOffsetIndexing.checked_alt_index(1000, 7, 1000).is_err());
        assert!(ParityOffsetIndexing.checked_alt_index(999, 7, 1000).is_ok());
    }

    #[test]
    fn test_bucket_suggestions_meet_preconditions() {
        assert_eq!(XorIndexing.buckets(1_000_000, 2).unwrap(), 1 << 20);
        assert_eq!(ParityOffsetIndexing.buckets(1_000_000, 2).unwrap(), 595_240);
        assert_eq!(XorIndexing.round_num_buckets(0).unwrap(), 1);
        assert_eq!(ParityOffsetIndexing.round_num_buckets(7).unwrap(), 8);
        assert!(XorIndexing.round_num_buckets((1 << 62) + 1).is_err());
        assert!(ParityOffsetIndexing.round_num_buckets(u64::MAX).is_err());
    }
}
