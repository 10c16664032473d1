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

use std::cmp::Ordering;
use std::convert::TryFrom;
use std::path::PathBuf;

use log::{debug, trace};

use crate::block::Block;
use crate::error::{Error, Result};
use crate::heap::MergeHeap;
use crate::mem::parse_mem_string;
use crate::record::{Record, RecordSlot, RECORD_OVERHEAD};
use crate::tmpfile::TempPrefix;

/// Memory budget used when none is configured.
pub const DEFAULT_MAX_MEMORY: usize = 100_000_000;

type Comparator = Box<dyn Fn(&[u8], &[u8]) -> Ordering + Send>;

/// Configures an external sort of fixed-size records.
///
/// Record size and comparator are mandatory. The memory budget defaults to [`DEFAULT_MAX_MEMORY`]
/// bytes and temporary files go to the platform temp directory unless a prefix is given.
pub struct ExternalSorter {
    record_size: Option<usize>,
    max_memory: usize,
    tmp_prefix: Option<PathBuf>,
    cmp: Option<Comparator>,
}

impl ExternalSorter {
    pub fn new() -> ExternalSorter {
        ExternalSorter {
            record_size: None,
            max_memory: DEFAULT_MAX_MEMORY,
            tmp_prefix: None,
            cmp: None,
        }
    }

    /// Sets the size in bytes of every record pushed.
    pub fn set_record_size(&mut self, record_size: usize) {
        self.record_size = Some(record_size);
    }

    /// Sets the estimated memory, in bytes, buffered records may use before being spilled to disk.
    pub fn set_max_memory(&mut self, max_memory: usize) {
        self.max_memory = max_memory;
    }

    /// Sets the memory budget from a human readable size such as `"100M"`.
    pub fn set_max_memory_str(&mut self, max_memory: &str) -> Result<()> {
        self.max_memory = parse_mem_string(max_memory)?;
        Ok(())
    }

    /// Sets the path prefix of temporary files.
    ///
    /// A random suffix is appended to the prefix for each file. If the prefix is an existing
    /// directory, files are created inside of it.
    pub fn set_tmp_prefix<P: Into<PathBuf>>(&mut self, prefix: P) {
        self.tmp_prefix = Some(prefix.into());
    }

    /// Sets the total order records are sorted by.
    pub fn set_comparator<F>(&mut self, cmp: F)
    where
        F: Fn(&[u8], &[u8]) -> Ordering + Send + 'static,
    {
        self.cmp = Some(Box::new(cmp));
    }

    /// Validates the configuration and starts a sort session.
    pub fn init(self) -> Result<SortSession> {
        let cmp = self
            .cmp
            .ok_or_else(|| Error::Config("no comparator set".to_string()))?;
        let record_size = match self.record_size {
            Some(size) if size > 0 => size,
            _ => return Err(Error::Config("no record size set".to_string())),
        };

        let tmp_prefix = TempPrefix::new(self.tmp_prefix.as_deref());
        debug!(
            "sorting {} byte records with {} bytes of memory, spilling to {}",
            record_size,
            self.max_memory,
            tmp_prefix.template().display()
        );

        Ok(SortSession {
            record_size,
            max_memory: self.max_memory,
            tmp_prefix,
            cmp,
            buffer: Vec::new(),
            buffered_memory: 0,
            pushed: 0,
            blocks: Vec::new(),
            poisoned: false,
        })
    }
}

impl Default for ExternalSorter {
    fn default() -> ExternalSorter {
        ExternalSorter::new()
    }
}

/// Collects records, spilling sorted runs to temporary files whenever the memory budget is reached.
///
/// Dropping the session, or calling [`SortSession::destroy`], closes every temporary file.
pub struct SortSession {
    record_size: usize,
    max_memory: usize,
    tmp_prefix: TempPrefix,
    cmp: Comparator,
    buffer: Vec<Record>,
    buffered_memory: usize,
    pushed: u64,
    blocks: Vec<Block>,
    poisoned: bool,
}

impl SortSession {
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn max_memory(&self) -> usize {
        self.max_memory
    }

    /// Estimated bytes charged for each buffered record.
    pub fn record_footprint(&self) -> usize {
        RECORD_OVERHEAD + self.record_size
    }

    /// Number of records waiting in memory.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Estimated memory used by the records waiting in memory.
    pub fn buffered_memory(&self) -> usize {
        self.buffered_memory
    }

    /// Number of runs spilled to disk so far.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of records pushed so far.
    pub fn pushed(&self) -> u64 {
        self.pushed
    }

    /// Takes ownership of a record.
    ///
    /// If the records already buffered exceed the memory budget, they are first sorted and spilled
    /// to a new temporary file. Once a spill has failed, every later push fails with `Poisoned`.
    pub fn push<R: Into<Record>>(&mut self, record: R) -> Result<()> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }

        let record = record.into();
        if record.len() != self.record_size {
            return Err(Error::RecordSize {
                expected: self.record_size,
                actual: record.len(),
            });
        }

        let footprint = self.record_footprint();
        if !self.buffer.is_empty() && self.buffered_memory + footprint > self.max_memory {
            self.spill()?;
        }

        self.buffer.push(record);
        self.buffered_memory += footprint;
        self.pushed += 1;
        Ok(())
    }

    fn spill(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let cmp = &self.cmp;
        self.buffer.sort_unstable_by(|a, b| cmp(a.as_bytes(), b.as_bytes()));

        let count = self.buffer.len();
        let block = match Block::spill(
            self.blocks.len(),
            &self.tmp_prefix,
            self.record_size,
            self.buffer.iter(),
        ) {
            Ok(block) => block,
            Err(err) => {
                self.poisoned = true;
                return Err(err);
            }
        };
        debug!(
            "spilled {} records to block #{} ({})",
            count,
            block.id(),
            block.path().display()
        );

        self.blocks.push(block);
        self.buffer.clear();
        self.buffered_memory = 0;
        Ok(())
    }

    /// Spills what's left in memory and prepares the merge of all spilled runs.
    pub fn sort(mut self) -> Result<SortedRecords> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }
        self.spill()?;

        debug!(
            "merging {} pushed records from {} blocks",
            self.pushed,
            self.blocks.len()
        );
        SortedRecords::merge(self.cmp, self.blocks, self.record_size)
    }

    /// Drops buffered records and closes every temporary file.
    pub fn destroy(self) {
        debug!(
            "discarding sort with {} buffered records and {} blocks",
            self.buffer.len(),
            self.blocks.len()
        );
    }
}

/// Merges spilled runs, handing out records in sorted order one at a time.
pub struct SortedRecords {
    cmp: Comparator,
    blocks: Vec<Block>,
    heap: MergeHeap,
    output: RecordSlot,
    remaining: u64,
    poisoned: bool,
}

impl SortedRecords {
    /// Rewinds every block, reads its first record and builds the heap over the non-empty ones.
    fn merge(cmp: Comparator, mut blocks: Vec<Block>, record_size: usize) -> Result<SortedRecords> {
        let mut heap = MergeHeap::with_capacity(blocks.len());
        for index in 0..blocks.len() {
            blocks[index].rewind()?;
            if blocks[index].read_next()? {
                heap.push(index, |a, b| is_less(&cmp, &blocks, a, b));
            }
        }
        trace!("{} of {} blocks primed", heap.len(), blocks.len());

        let remaining: u64 = blocks.iter().map(Block::records).sum();
        Ok(SortedRecords {
            cmp,
            blocks,
            heap,
            output: RecordSlot::new(record_size),
            remaining,
            poisoned: false,
        })
    }

    /// Returns the next record in sorted order, or `None` once all records have been returned.
    ///
    /// The returned slice is only valid until the next call; copy it to keep it longer. After a
    /// failed read every call fails with `Poisoned`.
    pub fn shift(&mut self) -> Result<Option<&[u8]>> {
        if self.poisoned {
            return Err(Error::Poisoned);
        }

        let cmp = &self.cmp;
        let blocks = &self.blocks;
        let top = match self.heap.pop(|a, b| is_less(cmp, blocks, a, b)) {
            Some(top) => top,
            None => return Ok(None),
        };

        let block = &mut self.blocks[top];
        self.output.exchange(block.read_ahead_mut());
        let more = match block.read_next() {
            Ok(more) => more,
            Err(err) => {
                self.poisoned = true;
                return Err(err);
            }
        };
        if more {
            let cmp = &self.cmp;
            let blocks = &self.blocks;
            self.heap.push(top, |a, b| is_less(cmp, blocks, a, b));
        }

        self.remaining = self.remaining.saturating_sub(1);
        Ok(Some(self.output.bytes()))
    }

    /// Number of records not yet returned by `shift`.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    /// Number of runs being merged, including exhausted ones.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of runs that still have records to give.
    pub fn active_blocks(&self) -> usize {
        self.heap.len()
    }

    /// Converts into an iterator of owned records, copying each one out of the merge.
    pub fn into_owned(self) -> OwnedRecords {
        OwnedRecords {
            inner: self,
            failed: false,
        }
    }

    /// Consumes the remaining records and returns their count.
    pub fn sorted_count(mut self) -> Result<u64> {
        let mut count = 0;
        while self.shift()?.is_some() {
            count += 1;
        }
        Ok(count)
    }

    /// Stops the merge early and closes every temporary file still open.
    pub fn destroy(self) {
        let exhausted = self.blocks.iter().filter(|b| b.is_exhausted()).count();
        debug!(
            "discarding merge with {} records left ({} of {} blocks exhausted)",
            self.remaining,
            exhausted,
            self.blocks.len()
        );
    }
}

/// Iterator over sorted, owned records. Stops after the first error.
pub struct OwnedRecords {
    inner: SortedRecords,
    failed: bool,
}

impl Iterator for OwnedRecords {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Result<Record>> {
        if self.failed {
            return None;
        }

        match self.inner.shift() {
            Ok(Some(bytes)) => Some(Ok(Record::from(bytes))),
            Ok(None) => None,
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        if self.failed {
            return (0, Some(0));
        }
        match usize::try_from(self.inner.remaining()) {
            Ok(remaining) => (remaining, Some(remaining)),
            Err(_) => (usize::MAX, None),
        }
    }
}

fn is_less(cmp: &Comparator, blocks: &[Block], a: usize, b: usize) -> bool {
    cmp(blocks[a].peek(), blocks[b].peek()) == Ordering::Less
}
