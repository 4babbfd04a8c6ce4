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

/// The widest fingerprint the codec derives; wider slots still hold 32-bit tags.
pub const MAX_FINGERPRINT_BITS: u32 = u32::BITS;

/// Returns the first non-zero `width`-bit window of `hash`, scanning from the least significant
/// end, or `1` if every complete window is zero.
///
/// The result is never `0`, which is reserved for empty slots. Trailing bits that do not form a
/// complete window are ignored.
///
/// # Panics
///
/// Panics if `width` is not in `1..=32`.
///
/// # Examples
///
/// ```
/// # use probably::cuckoo::fingerprint;
/// assert_eq!(fingerprint(0xE000_0000, 8), 0xE0);
/// assert_eq!(fingerprint(0, 8), 1);
/// ```
pub fn fingerprint(hash: u32, width: u32) -> u32 {
    assert!(
        (1..=MAX_FINGERPRINT_BITS).contains(&width),
        "fingerprint width must be in 1..={MAX_FINGERPRINT_BITS}, got {width}"
    );
    let mask = u32::MAX >> (MAX_FINGERPRINT_BITS - width);

    let mut bit = 0;
    while bit + width <= MAX_FINGERPRINT_BITS {
        let window = (hash >> bit) & mask;
        if window != 0 {
            return window;
        }
        bit += width;
    }
    1
}

#[cfg(test)]
mod tests {
    use rand::Rng;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::*;

    #[test]
    fn test_window_boundaries() {
        assert_eq!(fingerprint(0x8000_0000, 1), 0x01);
        assert_eq!(fingerprint(0xC000_0000, 2), 0x03);
        assert_eq!(fingerprint(0xE000_0000, 3), 0x04);
        assert_eq!(fingerprint(0xE000_0000, 8), 0xE0);
        assert_eq!(fingerprint(0xE000_0000, 16), 0xE000);
        assert_eq!(fingerprint(0x8000_0000, 32), 0x8000_0000);
    }

    #[test]
    fn test_lowest_window_wins() {
        assert_eq!(fingerprint(0x0000_ABCD, 8), 0xCD);
        assert_eq!(fingerprint(0x0000_AB00, 8), 0xAB);
        assert_eq!(fingerprint(0xFFFF_FFFF, 32), 0xFFFF_FFFF);
    }

    #[test]
    fn test_zero_hash_maps_to_one() {
        for width in 1..=32 {
            assert_eq!(fingerprint(0, width), 1, "width {width}");
        }
    }

    #[test]
    fn test_trailing_partial_window_is_ignored() {
        // with 3-bit windows only bits 0..30 are examined; bits 30 and 31 are trailing
        assert_eq!(fingerprint(0xC000_0000, 3), 1);
        assert_eq!(fingerprint(0x8000_0000, 31), 1);
    }

    #[test]
    fn test_never_zero_and_fits_width() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for _ in 0..10_000 {
            let hash: u32 = rng.random();
            let width = rng.random_range(1..=32);
            let fp = fingerprint(hash, width);
            assert_ne!(fp, 0);
            assert!(width == 32 || fp < (1 << width));
        }
    }

    #[test]
    #[should_panic(expected = "fingerprint width must be in 1..=32")]
    fn test_zero_width_panics() {
        fingerprint(1, 0);
    }
}
