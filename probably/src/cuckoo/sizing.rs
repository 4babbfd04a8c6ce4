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

//! Closed-form sizing of a cuckoo table from a target false positive probability.
//!
//! The load factors and bucket sizes follow Fan et al., "Cuckoo Filter: Practically Better
//! Than Bloom" (2014): larger buckets reach higher occupancy before insertions start failing,
//! at the cost of a few extra fingerprint bits for the same false positive rate.

use crate::error::Error;

/// Smallest supported false positive probability, 2^-60.
pub const MIN_FPP: f64 = 8.673617379884035e-19;
/// Largest false positive probability the sizing helpers are tuned for.
pub const MAX_FPP: f64 = 0.99;
/// False positive probability used when none is given.
pub const DEFAULT_FPP: f64 = 0.03;
/// Widest slot a table can hold.
pub const MAX_BITS_PER_ENTRY: u32 = u64::BITS;

/// Suggests the number of slots per bucket for a target false positive probability.
///
/// # Examples
///
/// ```
/// # use probably::cuckoo::sizing;
/// assert_eq!(sizing::optimal_entries_per_bucket(0.03), 2);
/// assert_eq!(sizing::optimal_entries_per_bucket(0.001), 4);
/// assert_eq!(sizing::optimal_entries_per_bucket(1e-6), 8);
/// ```
pub fn optimal_entries_per_bucket(fpp: f64) -> usize {
    if fpp <= 0.00001 {
        8
    } else if fpp <= 0.002 {
        4
    } else {
        2
    }
}

/// Returns the occupancy a table with the given bucket size reliably reaches.
///
/// # Panics
///
/// Panics if `entries_per_bucket` is not 2, 4 or 8.
pub fn optimal_load_factor(entries_per_bucket: usize) -> f64 {
    match entries_per_bucket {
        2 => 0.84,
        4 => 0.955,
        8 => 0.98,
        b => panic!("entries_per_bucket must be 2, 4, or 8, got {b}"),
    }
}

/// Suggests the fingerprint width in bits: `log2(2b / fpp)`, rounded to the nearest integer
/// in log space with ties rounding down.
///
/// # Errors
///
/// Returns an error if `fpp` is not in `(0, 1)`, is below [`MIN_FPP`], or the width would
/// exceed 64 bits.
pub fn optimal_bits_per_entry(fpp: f64, entries_per_bucket: usize) -> Result<u32, Error> {
    if !(fpp > 0.0 && fpp < 1.0) {
        return Err(Error::invalid_argument(format!(
            "fpp must be between 0.0 and 1.0 (exclusive), got {fpp}"
        )));
    }
    if fpp < MIN_FPP {
        return Err(Error::invalid_argument(format!(
            "cannot create a cuckoo filter with fpp {fpp:e} < MIN_FPP {MIN_FPP:e}"
        )));
    }
    let bits = log2_half_down(2.0 * entries_per_bucket as f64 / fpp);
    if bits > MAX_BITS_PER_ENTRY {
        return Err(Error::invalid_argument(format!(
            "fingerprints would need {bits} bits, more than {MAX_BITS_PER_ENTRY}"
        ))
        .with_context("fpp", fpp)
        .with_context("entries_per_bucket", entries_per_bucket));
    }
    Ok(bits)
}

/// Suggests the number of buckets needed to hold `expected_insertions` fingerprints at the
/// bucket size's load factor. The result is even and at least 2.
///
/// # Examples
///
/// ```
/// # use probably::cuckoo::sizing;
/// assert_eq!(sizing::optimal_number_of_buckets(1, 2), 2);
/// assert_eq!(sizing::optimal_number_of_buckets(1_000_000, 2), 595_240);
/// ```
pub fn optimal_number_of_buckets(expected_insertions: u64, entries_per_bucket: usize) -> u64 {
    let slots = (expected_insertions as f64 / optimal_load_factor(entries_per_bucket)).ceil();
    let buckets = (slots as u64).div_ceil(entries_per_bucket as u64);
    even_ceil(buckets.max(1))
}

/// Total number of 64-bit words backing a table of the given dimensions, if it is addressable.
pub(crate) fn required_words(
    num_buckets: u64,
    slots_per_bucket: usize,
    bits_per_entry: u32,
) -> Option<usize> {
    let bits = num_buckets
        .checked_mul(slots_per_bucket as u64)?
        .checked_mul(u64::from(bits_per_entry))?;
    usize::try_from(bits.div_ceil(64)).ok()
}

fn even_ceil(n: u64) -> u64 {
    n + (n & 1)
}

/// `round(log2(x))` with ties towards the smaller exponent, computed exactly from the float
/// representation: round up iff the normalized mantissa exceeds sqrt(2).
fn log2_half_down(x: f64) -> u32 {
    debug_assert!(x.is_normal() && x >= 1.0);
    let bits = x.to_bits();
    let exponent = ((bits >> 52) & 0x7ff) as u32 - 1023;
    let mantissa = f64::from_bits((bits & 0x000f_ffff_ffff_ffff) | 0x3ff0_0000_0000_0000);
    if mantissa * mantissa > 2.0 {
        exponent + 1
    } else {
        exponent
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_extremes() {
        assert_eq!(MIN_FPP, 2f64.powi(-60));
        assert_eq!(optimal_entries_per_bucket(MIN_FPP), 8);
        assert_eq!(optimal_entries_per_bucket(MAX_FPP), 2);
        assert_eq!(
            optimal_number_of_buckets(i32::MAX as u64, optimal_entries_per_bucket(MIN_FPP)),
            273913732
        );
        assert_eq!(
            optimal_bits_per_entry(MIN_FPP, optimal_entries_per_bucket(MIN_FPP)).unwrap(),
            64
        );
    }

    #[test]
    fn test_common_accuracies() {
        assert_eq!(optimal_bits_per_entry(0.03, 2).unwrap(), 7);
        assert_eq!(optimal_bits_per_entry(0.01, 2).unwrap(), 9);
        assert_eq!(optimal_bits_per_entry(0.001, 4).unwrap(), 13);
    }

    #[test]
    fn test_log2_half_down() {
        assert_eq!(log2_half_down(4.0), 2);
        assert_eq!(log2_half_down(5.6), 2);
        assert_eq!(log2_half_down(5.7), 3);
        assert_eq!(log2_half_down(2f64.powi(64)), 64);
    }

    #[test]
    fn test_always_at_least_two() {
        for n in 1..1000 {
            let mut fpp = MIN_FPP;
            while fpp <= MAX_FPP {
                let b = optimal_entries_per_bucket(fpp);
                assert!(b >= 2);
                assert!(optimal_number_of_buckets(n, b) >= 2);
                assert!(optimal_bits_per_entry(fpp, b).unwrap() >= 2);
                fpp *= 3.0;
            }
        }

        let mut rng = ChaCha8Rng::seed_from_u64(0);
        for _ in 0..10_000 {
            let n = rng.random_range(1..1u64 << 16);
            let fpp = rng.random_range(MIN_FPP..MAX_FPP);
            let b = optimal_entries_per_bucket(fpp);
            assert!(optimal_number_of_buckets(n, b) >= 2);
            assert_eq!(optimal_number_of_buckets(n, b) % 2, 0);
            assert!(optimal_bits_per_entry(fpp, b).unwrap() >= 2);
        }
    }

    #[test]
    fn test_rejects_fpp_below_minimum() {
        let err = optimal_bits_per_entry(f64::MIN_POSITIVE, 8).unwrap_err();
        assert!(err.message().contains("MIN_FPP"));
        assert!(optimal_bits_per_entry(1e-80, 8).is_err());
    }

    #[test]
    fn test_rejects_fpp_outside_unit_interval() {
        for fpp in [8.0, 1.0, 0.0, -0.5, f64::NAN, f64::INFINITY] {
            let err = optimal_bits_per_entry(fpp, 2).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "fpp {fpp}");
            assert!(err.message().starts_with("fpp must be between"), "fpp {fpp}");
        }
        assert_eq!(optimal_bits_per_entry(MAX_FPP, 2).unwrap(), 2);
    }

    #[test]
    fn test_required_words() {
        assert_eq!(required_words(2, 2, 7), Some(1));
        assert_eq!(required_words(10, 4, 16), Some(10));
        assert_eq!(required_words(u64::MAX, 2, 8), None);
    }
}
