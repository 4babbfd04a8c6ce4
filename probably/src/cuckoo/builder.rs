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

use super::CuckooFilter;
use super::engine::CuckooEngine;
use super::engine::DEFAULT_MAX_RELOCATION_ATTEMPTS;
use super::engine::DEFAULT_VICTIM_SEED;
use super::engine::SeededVictimPicker;
use super::index::IndexingStrategy;
use super::strategy::CuckooStrategy;
use super::table::CuckooTable;
use crate::error::Error;
use crate::hash::DEFAULT_UPDATE_SEED;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Dimensions {
    Accuracy {
        expected_insertions: u64,
        fpp: f64,
    },
    Manual {
        num_buckets: u64,
        slots_per_bucket: usize,
        bits_per_entry: u32,
    },
}

/// Builder for creating [`CuckooFilter`] instances.
///
/// Provides two construction modes:
/// - [`with_accuracy()`](Self::with_accuracy): Specify expected insertions and false positive
///   rate (recommended)
/// - [`with_dimensions()`](Self::with_dimensions): Specify the table shape directly (manual)
///
/// Nothing is validated until [`build()`](Self::build), so the strategy may be chosen after the
/// dimensions.
#[derive(Debug, Clone)]
pub struct CuckooFilterBuilder {
    dimensions: Dimensions,
    strategy: CuckooStrategy,
    seed: u64,
    victim_seed: u64,
    max_relocation_attempts: usize,
}

impl CuckooFilterBuilder {
    /// Creates a builder that sizes the table for a target accuracy.
    ///
    /// The bucket size, fingerprint width and bucket count are derived from the strategy's
    /// sizing helpers at build time.
    ///
    /// # Arguments
    ///
    /// - `expected_insertions`: Number of objects the filter should hold
    /// - `fpp`: Target false positive probability, in `(0.0, 1.0)`
    ///
    /// # Examples
    ///
    /// ```
    /// # use probably::cuckoo::CuckooFilterBuilder;
    /// let filter = CuckooFilterBuilder::with_accuracy(10_000, 0.01)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(filter.slots_per_bucket(), 2);
    /// assert_eq!(filter.bits_per_entry(), 9);
    /// ```
    pub fn with_accuracy(expected_insertions: u64, fpp: f64) -> Self {
        Self::new(Dimensions::Accuracy {
            expected_insertions,
            fpp,
        })
    }

    /// Creates a builder for a table of exactly the given shape.
    ///
    /// `num_buckets` must satisfy the strategy's precondition: even for
    /// [`CuckooStrategy::ParityOffset`], a power of two for [`CuckooStrategy::Xor`].
    ///
    /// # Examples
    ///
    /// ```
    /// # use probably::cuckoo::CuckooFilterBuilder;
    /// # use probably::cuckoo::CuckooStrategy;
    /// let filter = CuckooFilterBuilder::with_dimensions(1024, 4, 12)
    ///     .strategy(CuckooStrategy::Xor)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(filter.capacity(), 4096);
    ///
    /// let odd = CuckooFilterBuilder::with_dimensions(1023, 4, 12).build();
    /// assert!(odd.is_err());
    /// ```
    pub fn with_dimensions(num_buckets: u64, slots_per_bucket: usize, bits_per_entry: u32) -> Self {
        Self::new(Dimensions::Manual {
            num_buckets,
            slots_per_bucket,
            bits_per_entry,
        })
    }

    fn new(dimensions: Dimensions) -> Self {
        CuckooFilterBuilder {
            dimensions,
            strategy: CuckooStrategy::default(),
            seed: DEFAULT_UPDATE_SEED,
            victim_seed: DEFAULT_VICTIM_SEED,
            max_relocation_attempts: DEFAULT_MAX_RELOCATION_ATTEMPTS,
        }
    }

    /// Sets the indexing strategy (default: [`CuckooStrategy::ParityOffset`]).
    pub fn strategy(mut self, strategy: CuckooStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Sets a custom hash seed (default: 9001).
    ///
    /// **Important**: Filters with different seeds cannot be combined.
    pub fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Sets the seed of the generator that picks eviction victims (default: 1).
    ///
    /// Filters built with the same victim seed and fed the same operations end up with
    /// identical tables.
    pub fn victim_seed(mut self, victim_seed: u64) -> Self {
        self.victim_seed = victim_seed;
        self
    }

    /// Sets how many evictions one insertion may perform before reporting the filter full
    /// (default: 500).
    pub fn max_relocation_attempts(mut self, attempts: usize) -> Self {
        self.max_relocation_attempts = attempts;
        self
    }

    /// Builds the cuckoo filter.
    ///
    /// # Errors
    ///
    /// Returns an [`InvalidArgument`](crate::error::ErrorKind::InvalidArgument) error if:
    /// - `expected_insertions` is 0, or `fpp` is not in `(0.0, 1.0)` or below
    ///   [`MIN_FPP`](super::sizing::MIN_FPP)
    /// - the fingerprints would need more than 64 bits
    /// - the bucket count does not suit the strategy, or the table is too large
    pub fn build(self) -> Result<CuckooFilter, Error> {
        let (num_buckets, slots_per_bucket, bits_per_entry) = self.resolve_dimensions()?;
        self.strategy.check_num_buckets(num_buckets)?;
        let table = CuckooTable::new(num_buckets, slots_per_bucket, bits_per_entry)?;
        let engine = CuckooEngine::new(
            self.strategy,
            table,
            SeededVictimPicker::new(self.victim_seed),
            self.max_relocation_attempts,
        )?;
        Ok(CuckooFilter::from_engine(self.seed, engine))
    }

    fn resolve_dimensions(&self) -> Result<(u64, usize, u32), Error> {
        match self.dimensions {
            Dimensions::Manual {
                num_buckets,
                slots_per_bucket,
                bits_per_entry,
            } => Ok((num_buckets, slots_per_bucket, bits_per_entry)),
            Dimensions::Accuracy {
                expected_insertions,
                fpp,
            } => {
                if expected_insertions == 0 {
                    return Err(Error::invalid_argument(
                        "expected_insertions must be greater than 0",
                    ));
                }
                if !(fpp > 0.0 && fpp < 1.0) {
                    return Err(Error::invalid_argument(format!(
                        "fpp must be between 0.0 and 1.0 (exclusive), got {fpp}"
                    )));
                }
                let strategy = self.strategy;
                let slots_per_bucket = strategy.entries_per_bucket(fpp);
                let bits_per_entry = strategy.bits_per_entry(fpp, slots_per_bucket)?;
                let num_buckets = strategy.buckets(expected_insertions, slots_per_bucket)?;
                Ok((num_buckets, slots_per_bucket, bits_per_entry))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cuckoo::sizing::DEFAULT_FPP;
    use crate::error::ErrorKind;

    #[test]
    fn test_accuracy_dimensions() {
        let parity = CuckooFilterBuilder::with_accuracy(100, DEFAULT_FPP)
            .build()
            .unwrap();
        assert_eq!(parity.strategy(), CuckooStrategy::ParityOffset);
        assert_eq!(
            (parity.num_buckets(), parity.slots_per_bucket(), parity.bits_per_entry()),
            (60, 2, 7)
        );

        let xor = CuckooFilterBuilder::with_accuracy(100, DEFAULT_FPP)
            .strategy(CuckooStrategy::Xor)
            .build()
            .unwrap();
        assert_eq!(
            (xor.num_buckets(), xor.slots_per_bucket(), xor.bits_per_entry()),
            (64, 2, 7)
        );
    }

    #[test]
    fn test_rejects_bad_accuracy() {
        for (n, fpp) in [(0, 0.03), (1, 0.0), (1, 1.0), (1, -0.5), (1, f64::NAN)] {
            let err = CuckooFilterBuilder::with_accuracy(n, fpp).build().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{n} {fpp}");
        }
        let err = CuckooFilterBuilder::with_accuracy(1000, 1e-80)
            .build()
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_rejects_bad_dimensions() {
        let builds = [
            CuckooFilterBuilder::with_dimensions(0, 4, 8),
            CuckooFilterBuilder::with_dimensions(7, 4, 8),
            CuckooFilterBuilder::with_dimensions(8, 1, 8),
            CuckooFilterBuilder::with_dimensions(8, 4, 65),
            CuckooFilterBuilder::with_dimensions(12, 4, 8).strategy(CuckooStrategy::Xor),
        ];
        for builder in builds {
            let err = builder.clone().build().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument, "{builder:?}");
        }
    }

    #[test]
    fn test_settings_carry_over() {
        let filter = CuckooFilterBuilder::with_dimensions(16, 4, 16)
            .seed(7)
            .victim_seed(3)
            .max_relocation_attempts(20)
            .build()
            .unwrap();
        assert_eq!(filter.seed(), 7);
        assert_eq!(filter.max_relocation_attempts(), 20);
        assert!(filter.is_empty());
    }
}
