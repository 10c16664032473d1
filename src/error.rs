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

use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while configuring a sort or moving records through temporary files.
///
/// None of them are retried. Once `push`, `sort` or `shift` returns an error the session should be
/// dropped, which closes every temporary file it still holds.
#[derive(Debug, Error)]
pub enum Error {
    /// Required configuration is missing or invalid.
    #[error("invalid sort configuration: {0}")]
    Config(String),

    /// A pushed record doesn't have the configured record size.
    #[error("expected a record of {expected} bytes, got {actual} bytes")]
    RecordSize { expected: usize, actual: usize },

    /// Creating, writing, reading or rewinding a temporary file failed.
    #[error("failed to {action} temporary file {}: {source}", path.display())]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A temporary file ended in the middle of a record.
    #[error(
        "temporary file {} is truncated or corrupted: read {read} of {expected} bytes",
        path.display()
    )]
    CorruptedRun {
        path: PathBuf,
        read: usize,
        expected: usize,
    },

    /// An earlier spill or read failed, so the records still held can't be trusted to be complete.
    #[error("sort is unusable after an earlier error")]
    Poisoned,
}

impl Error {
    pub(crate) fn io(action: &'static str, path: impl Into<PathBuf>, source: io::Error) -> Error {
        Error::Io {
            action,
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_error_names_action_and_path() {
        let err = Error::io(
            "write",
            "/tmp/recsort.abc123",
            io::Error::new(io::ErrorKind::Other, "disk full"),
        );
        assert_eq!(
            err.to_string(),
            "failed to write temporary file /tmp/recsort.abc123: disk full"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn corrupted_run_reports_short_read() {
        let err = Error::CorruptedRun {
            path: PathBuf::from("/tmp/recsort.xyz"),
            read: 3,
            expected: 8,
        };
        assert!(err.to_string().contains("read 3 of 8 bytes"));
    }
}
