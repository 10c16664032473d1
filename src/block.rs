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

use std::io::{self, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use log::trace;

use crate::error::{Error, Result};
use crate::record::RecordSlot;
use crate::tmpfile::{TempHandle, TempPrefix};

/// One sorted run of records spilled to a temporary file.
///
/// The file holds `record_size`-byte records back to back, with no header. While merging, the block
/// keeps its next unread record in a read-ahead slot. Once the file is drained its handle is closed
/// and the block stays exhausted for good.
#[derive(Debug)]
pub(crate) struct Block {
    id: usize,
    path: PathBuf,
    records: u64,
    reader: Option<BufReader<TempHandle>>,
    read_ahead: RecordSlot,
}

impl Block {
    /// Writes already sorted records to a new temporary file and rewinds it.
    ///
    /// Each record is dropped as soon as it has been handed to the writer.
    pub(crate) fn spill<I>(
        id: usize,
        prefix: &TempPrefix,
        record_size: usize,
        records: I,
    ) -> Result<Block>
    where
        I: IntoIterator,
        I::Item: AsRef<[u8]>,
    {
        let (handle, path) = prefix.create()?;

        let mut writer = BufWriter::new(handle);
        let mut written = 0u64;
        for record in records {
            writer
                .write_all(record.as_ref())
                .map_err(|err| Error::io("write", &path, err))?;
            written += record.as_ref().len() as u64;
        }
        let mut handle = writer
            .into_inner()
            .map_err(|err| Error::io("write", &path, err.into_error()))?;
        handle
            .seek(SeekFrom::Start(0))
            .map_err(|err| Error::io("rewind", &path, err))?;

        Ok(Block {
            id,
            path,
            records: written / record_size as u64,
            reader: Some(BufReader::new(handle)),
            read_ahead: RecordSlot::new(record_size),
        })
    }

    pub(crate) fn id(&self) -> usize {
        self.id
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written to this block.
    pub(crate) fn records(&self) -> u64 {
        self.records
    }

    pub(crate) fn is_exhausted(&self) -> bool {
        self.reader.is_none()
    }

    /// Moves back to the first record. Exhausted blocks stay exhausted.
    pub(crate) fn rewind(&mut self) -> Result<()> {
        let path = &self.path;
        if let Some(reader) = self.reader.as_mut() {
            reader
                .seek(SeekFrom::Start(0))
                .map_err(|err| Error::io("rewind", path, err))?;
        }
        Ok(())
    }

    /// Reads the next record into the read-ahead slot.
    ///
    /// Returns `false` once the file is cleanly drained, at which point the handle is closed. A file
    /// ending in the middle of a record is a `CorruptedRun` error.
    pub(crate) fn read_next(&mut self) -> Result<bool> {
        let reader = match self.reader.as_mut() {
            Some(reader) => reader,
            None => return Ok(false),
        };

        let path = &self.path;
        let buf = self.read_ahead.bytes_mut();
        let read = read_full(reader, buf).map_err(|err| Error::io("read", path, err))?;

        if read == 0 {
            trace!("block #{} exhausted ({})", self.id, self.path.display());
            self.reader = None;
            return Ok(false);
        }

        if read < buf.len() {
            return Err(Error::CorruptedRun {
                path: path.to_path_buf(),
                read,
                expected: buf.len(),
            });
        }

        Ok(true)
    }

    /// The record last read by `read_next`.
    pub(crate) fn peek(&self) -> &[u8] {
        self.read_ahead.bytes()
    }

    pub(crate) fn read_ahead_mut(&mut self) -> &mut RecordSlot {
        &mut self.read_ahead
    }
}

/// Fills `buf` unless the reader runs dry first, returning how many bytes were read.
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(ref err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempdir::TempDir;

    fn prefix(tempdir: &TempDir) -> TempPrefix {
        TempPrefix::new(Some(&tempdir.path().join("block.")))
    }

    #[test]
    fn reads_back_records_in_written_order() {
        let tempdir = TempDir::new("recsort").unwrap();
        let records = vec![vec![1u8, 1], vec![2, 2], vec![3, 3]];
        let mut block = Block::spill(0, &prefix(&tempdir), 2, records).unwrap();
        assert_eq!(block.records(), 3);

        let mut seen = Vec::new();
        while block.read_next().unwrap() {
            seen.push(block.peek().to_vec());
        }
        assert_eq!(seen, vec![vec![1, 1], vec![2, 2], vec![3, 3]]);
        assert!(block.is_exhausted());

        // exhaustion is permanent
        assert!(!block.read_next().unwrap());
        block.rewind().unwrap();
        assert!(!block.read_next().unwrap());
    }

    #[test]
    fn rewind_restarts_from_first_record() {
        let tempdir = TempDir::new("recsort").unwrap();
        let mut block = Block::spill(3, &prefix(&tempdir), 1, vec![[7u8], [8u8]]).unwrap();
        assert_eq!(block.id(), 3);

        assert!(block.read_next().unwrap());
        assert_eq!(block.peek(), &[7]);
        block.rewind().unwrap();
        assert!(block.read_next().unwrap());
        assert_eq!(block.peek(), &[7]);
    }

    #[test]
    fn empty_block_is_exhausted_on_first_read() {
        let tempdir = TempDir::new("recsort").unwrap();
        let mut block = Block::spill(0, &prefix(&tempdir), 4, Vec::<Vec<u8>>::new()).unwrap();
        assert_eq!(block.records(), 0);
        assert!(!block.is_exhausted());
        assert!(!block.read_next().unwrap());
        assert!(block.is_exhausted());
    }

    #[test]
    fn partial_record_is_a_corrupted_run() {
        let tempdir = TempDir::new("recsort").unwrap();
        // one full 4-byte record followed by 2 stray bytes
        let raw = vec![vec![0u8, 1, 2, 3, 4, 5]];
        let mut block = Block::spill(0, &prefix(&tempdir), 4, raw).unwrap();

        assert!(block.read_next().unwrap());
        assert_eq!(block.peek(), &[0, 1, 2, 3]);
        match block.read_next() {
            Err(Error::CorruptedRun { path, read, expected }) => {
                assert_eq!(path, block.path());
                assert_eq!(read, 2);
                assert_eq!(expected, 4);
            }
            other => panic!("expected corrupted run, got {:?}", other),
        }
    }

    #[test]
    fn read_full_handles_short_reads() {
        struct Trickle(Vec<u8>);
        impl Read for Trickle {
            fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
                if self.0.is_empty() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0.remove(0);
                Ok(1)
            }
        }

        let mut reader = Trickle(vec![1, 2, 3, 4, 5]);
        let mut buf = [0u8; 4];
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 4);
        assert_eq!(buf, [1, 2, 3, 4]);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 1);
        assert_eq!(read_full(&mut reader, &mut buf).unwrap(), 0);
    }
}
