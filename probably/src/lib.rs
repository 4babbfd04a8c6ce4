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

//! # probably
//!
//! Probabilistic set membership filters that support deletion.
//!
//! The [`cuckoo`] module provides a cuckoo filter: a compact table of fingerprints that answers
//! "possibly in set" or "definitely not in set", lets objects be removed again, and can be
//! merged with compatible filters and serialized to a stable binary layout.

#![cfg_attr(docsrs, feature(doc_cfg))]
#![deny(missing_docs)]

pub mod cuckoo;
pub mod error;

mod codec;
mod hash;
