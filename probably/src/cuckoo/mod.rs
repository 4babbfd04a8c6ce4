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

//! Cuckoo filter implementation for probabilistic set membership testing with deletion.
//!
//! A cuckoo filter stores a short fingerprint of every object in one of two candidate buckets
//! of a fixed-size table. Like a Bloom filter it can answer "possibly in set" or "definitely
//! not in set", but it also supports removing objects, and at low false positive rates it uses
//! less space.
//!
//! # Properties
//!
//! - **No false negatives**: An added object is found until it is removed
//! - **Possible false positives**: Another object may share a fingerprint and bucket
//! - **Deletion**: Removing an object deletes one copy of its fingerprint
//! - **Fixed size**: When no slot can be freed for a new fingerprint, `add()` returns `false`
//!
//! # Usage
//!
//! ```rust
//! use probably::cuckoo::CuckooFilterBuilder;
//!
//! // Create a filter for 1000 objects with a 1% false positive rate
//! let mut filter = CuckooFilterBuilder::with_accuracy(1000, 0.01).build().unwrap();
//!
//! filter.add("apple");
//! filter.add("banana");
//! filter.add(&42_u64);
//!
//! assert!(filter.contains("apple"));
//! assert!(!filter.contains("grape")); // never added (probably)
//!
//! filter.remove("banana");
//! assert!(!filter.contains("banana"));
//!
//! println!("Load: {:.1}%", filter.load() * 100.0);
//! println!("Est. FPP: {:.4}%", filter.current_fpp() * 100.0);
//! ```
//!
//! # Strategies
//!
//! Relocating a fingerprint requires computing its other bucket from the bucket it is in and
//! the fingerprint alone. Two [`CuckooStrategy`] variants do this:
//!
//! - [`CuckooStrategy::ParityOffset`] (default): adds or subtracts an odd offset depending on
//!   the parity of the index. Works for any even number of buckets.
//! - [`CuckooStrategy::Xor`]: XORs the index with a hash of the fingerprint, as in the
//!   original cuckoo filter. Needs a power-of-two number of buckets, which can nearly double
//!   the table.
//!
//! Custom strategies implement [`IndexingStrategy`] and drive a [`CuckooEngine`] directly.
//!
//! # Implementation Details
//!
//! - Objects are hashed with MurmurHash3 x64 128-bit; one half of the digest picks the primary
//!   bucket and the other produces the fingerprint
//! - Fingerprints are packed into `u64` words with no padding between slots
//! - Insertions evict pseudo-randomly chosen victims from a seeded generator, so filters fed the
//!   same operations are identical; a failed insertion rolls its evictions back
//!
//! # References
//!
//! - Fan, Andersen, Kaminsky and Mitzenmacher (2014). "Cuckoo Filter: Practically Better Than
//!   Bloom"

mod builder;
mod engine;
mod fingerprint;
mod index;
pub mod sizing;
mod sketch;
mod strategy;
mod table;

pub use self::builder::CuckooFilterBuilder;
pub use self::engine::CuckooEngine;
pub use self::engine::DEFAULT_MAX_RELOCATION_ATTEMPTS;
pub use self::engine::DEFAULT_VICTIM_SEED;
pub use self::engine::SeededVictimPicker;
pub use self::engine::VictimPicker;
pub use self::fingerprint::MAX_FINGERPRINT_BITS;
pub use self::fingerprint::fingerprint;
pub use self::index::IndexingStrategy;
pub use self::index::MAX_NUM_BUCKETS;
pub use self::index::ParityOffsetIndexing;
pub use self::index::XorIndexing;
pub use self::sketch::CuckooFilter;
pub use self::strategy::CuckooStrategy;
pub use self::table::CuckooTable;
pub use self::table::EMPTY_ENTRY;
pub use self::table::MIN_SLOTS_PER_BUCKET;
pub use self::table::read_bits;
pub use self::table::write_bits;
