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

//! Private, self-reclaiming temporary files backing spilled blocks.
//!
//! On Unix the file is unlinked right after creation and lives only as long as its descriptor. On other
//! platforms the path is kept and deleted when the handle is dropped.

use std::ffi::{OsStr, OsString};
use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

const DEFAULT_STEM: &str = "recsort.";
const RANDOM_SUFFIX_LEN: usize = 6;

/// Where temporary files go: a directory and the file name stem a random suffix is appended to.
#[derive(Clone, Debug)]
pub(crate) struct TempPrefix {
    dir: PathBuf,
    stem: OsString,
}

impl TempPrefix {
    /// Splits `prefix` into a directory and a stem. A prefix naming an existing directory, or ending
    /// with a separator, gets the default stem inside that directory. No prefix at all means the
    /// platform temp directory.
    pub(crate) fn new(prefix: Option<&Path>) -> TempPrefix {
        let prefix = match prefix {
            Some(prefix) => prefix,
            None => return TempPrefix::in_dir(std::env::temp_dir()),
        };

        if prefix.is_dir() || ends_with_separator(prefix) {
            return TempPrefix::in_dir(prefix.to_path_buf());
        }

        match prefix.file_name() {
            Some(stem) => {
                let dir = match prefix.parent() {
                    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
                    _ => PathBuf::from("."),
                };
                TempPrefix {
                    dir,
                    stem: stem.to_os_string(),
                }
            }
            None => TempPrefix::in_dir(prefix.to_path_buf()),
        }
    }

    fn in_dir(dir: PathBuf) -> TempPrefix {
        TempPrefix {
            dir,
            stem: OsString::from(DEFAULT_STEM),
        }
    }

    #[cfg(test)]
    pub(crate) fn dir(&self) -> &Path {
        &self.dir
    }

    #[cfg(test)]
    pub(crate) fn stem(&self) -> &OsStr {
        &self.stem
    }

    /// The prefix with placeholders for the random suffix, for messages.
    pub(crate) fn template(&self) -> PathBuf {
        let mut name = self.stem.clone();
        name.push("X".repeat(RANDOM_SUFFIX_LEN));
        self.dir.join(name)
    }

    /// Creates a new temporary file readable and writable only by the owner.
    ///
    /// Returns the open handle along with the randomized path it was created under.
    pub(crate) fn create(&self) -> Result<(TempHandle, PathBuf)> {
        let named = tempfile::Builder::new()
            .prefix(&self.stem)
            .rand_bytes(RANDOM_SUFFIX_LEN)
            .tempfile_in(&self.dir)
            .map_err(|err| Error::io("create", self.template(), err))?;
        let (file, path) = named.into_parts();
        let kept = path.to_path_buf();

        restrict_to_owner(&file).map_err(|err| Error::io("set permissions of", &kept, err))?;
        let handle = TempHandle::reclaiming(file, path)
            .map_err(|err| Error::io("unlink", &kept, err))?;

        Ok((handle, kept))
    }
}

/// Open handle to a temporary file whose storage goes away with the handle.
#[derive(Debug)]
pub(crate) struct TempHandle {
    file: File,
    #[cfg(not(unix))]
    _path: tempfile::TempPath,
}

impl TempHandle {
    #[cfg(unix)]
    fn reclaiming(file: File, path: tempfile::TempPath) -> io::Result<TempHandle> {
        path.close()?;
        Ok(TempHandle { file })
    }

    #[cfg(not(unix))]
    fn reclaiming(file: File, path: tempfile::TempPath) -> io::Result<TempHandle> {
        Ok(TempHandle { file, _path: path })
    }
}

fn ends_with_separator(path: &Path) -> bool {
    path.to_string_lossy().ends_with(std::path::is_separator)
}

#[cfg(unix)]
fn restrict_to_owner(file: &File) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    file.set_permissions(std::fs::Permissions::from_mode(0o600))
}

#[cfg(not(unix))]
fn restrict_to_owner(_file: &File) -> io::Result<()> {
    Ok(())
}

impl Read for TempHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for TempHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for TempHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}
