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

use std::ops::Deref;

/// An owned, fixed-size record.
///
/// The sorter never looks inside a record: its layout and ordering are known only to the comparator.
/// Pushing a record moves it into the sorter, so a record is always owned by exactly one container.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Record(Box<[u8]>);

/// Bookkeeping bytes charged per buffered record on top of its payload.
pub const RECORD_OVERHEAD: usize = std::mem::size_of::<Record>();

impl Record {
    pub(crate) fn zeroed(size: usize) -> Record {
        Record(vec![0u8; size].into_boxed_slice())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_boxed_slice(self) -> Box<[u8]> {
        self.0
    }
}

impl Deref for Record {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl AsRef<[u8]> for Record {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Box<[u8]>> for Record {
    fn from(bytes: Box<[u8]>) -> Record {
        Record(bytes)
    }
}

impl From<Vec<u8>> for Record {
    fn from(bytes: Vec<u8>) -> Record {
        Record(bytes.into_boxed_slice())
    }
}

impl From<&[u8]> for Record {
    fn from(bytes: &[u8]) -> Record {
        Record(bytes.into())
    }
}

/// A record-sized scratch buffer that is filled in place and exchanged, never copied.
///
/// Each block owns one slot holding its next unread record and the merge owns one holding the record
/// last handed out. Exchanging the two moves the smallest record to the output side, so the block can
/// read its next record without overwriting the one the caller is looking at.
#[derive(Debug)]
pub(crate) struct RecordSlot {
    record: Record,
}

impl RecordSlot {
    pub(crate) fn new(size: usize) -> RecordSlot {
        RecordSlot {
            record: Record::zeroed(size),
        }
    }

    pub(crate) fn exchange(&mut self, other: &mut RecordSlot) {
        std::mem::swap(&mut self.record, &mut other.record);
    }

    pub(crate) fn bytes(&self) -> &[u8] {
        &self.record
    }

    pub(crate) fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.record.0
    }
}
