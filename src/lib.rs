// Copyright 2018 Andre-Philippe Paquet
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The `recsort` crate sorts streams of fixed-size binary records that don't fit in memory.
//!
//! Records are buffered until an estimated memory budget is reached, at which point they are sorted
//! and spilled to a temporary file. Once every record has been pushed, the spilled runs are merged
//! back with a k-way merge and handed out one at a time, in the order defined by a caller supplied
//! comparator.
//!
//! `recsort` doesn't interpret records: they are opaque byte slices of a fixed size, and encoding
//! and decoding them is left to the user.
//!
//! Temporary files are removed from the file system as soon as they are created (where the platform
//! allows it), so their storage is reclaimed when the sort is dropped or the process exits.
//!
//! # Examples
//! ```rust
//! extern crate recsort;
//!
//! use recsort::*;
//!
//! let mut sorter = ExternalSorter::new();
//! sorter.set_record_size(4);
//! sorter.set_comparator(|a, b| a.cmp(b));
//! let mut session = sorter.init().unwrap();
//!
//! for value in (0..1000u32).rev() {
//!     session.push(value.to_be_bytes().to_vec()).unwrap();
//! }
//!
//! let mut sorted = session.sort().unwrap();
//! let mut expected = 0u32;
//! while let Some(record) = sorted.shift().unwrap() {
//!     assert_eq!(record, &expected.to_be_bytes()[..]);
//!     expected += 1;
//! }
//! assert_eq!(expected, 1000);
//! ```

mod block;
mod heap;
mod tmpfile;

pub mod error;
pub mod mem;
pub mod record;
pub mod sorter;

pub use crate::error::{Error, Result};
pub use crate::mem::parse_mem_string;
pub use crate::record::{Record, RECORD_OVERHEAD};
pub use crate::sorter::{
    ExternalSorter, OwnedRecords, SortSession, SortedRecords, DEFAULT_MAX_MEMORY,
};
