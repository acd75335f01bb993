//
// Copyright 2017-2026 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Error types for data channel writes

use std::io;
use thiserror::Error;

/// Result of a data channel write: the number of input bytes delivered.
pub type WriteResult = Result<usize, WriteFailure>;

/// The sink rejected a write or flush.
///
/// The sink's own error is kept untouched. `accepted` counts the input bytes whose escaped
/// form reached the sink in full before the failure; nothing past that point was forwarded.
/// If the failure landed between the two halves of an IAC pair, that IAC is not counted and
/// the peer has seen a lone IAC; [`split_pair`](WriteFailure::split_pair) reports this and
/// the stream should not be resumed.
#[derive(Debug, Error)]
#[error("sink failed after {accepted} input bytes: {source}")]
pub struct WriteFailure {
    accepted: usize,
    split_pair: bool,
    #[source]
    source: io::Error,
}

impl WriteFailure {
    pub(crate) fn new(accepted: usize, source: io::Error) -> Self {
        Self {
            accepted,
            split_pair: false,
            source,
        }
    }

    /// Marks the failure as having left the first half of an IAC pair on the wire.
    pub(crate) fn with_split_pair(mut self, split_pair: bool) -> Self {
        self.split_pair = split_pair;
        self
    }

    /// Input bytes fully delivered before the failure
    pub fn accepted(&self) -> usize {
        self.accepted
    }

    /// Whether the sink took the first half of an IAC pair but not the second.
    ///
    /// The output is then misaligned with the input and cannot be resumed from
    /// [`accepted`](WriteFailure::accepted).
    pub fn split_pair(&self) -> bool {
        self.split_pair
    }

    /// Kind of the underlying sink error
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }

    /// Borrow the sink error
    pub fn error(&self) -> &io::Error {
        &self.source
    }

    /// Consume the failure and return the sink error as it was reported.
    pub fn into_error(self) -> io::Error {
        self.source
    }
}

impl From<WriteFailure> for io::Error {
    fn from(failure: WriteFailure) -> Self {
        failure.source
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_keeps_sink_error() {
        let failure = WriteFailure::new(3, io::Error::new(io::ErrorKind::BrokenPipe, "gone"));
        assert_eq!(failure.accepted(), 3);
        assert!(!failure.split_pair());
        assert_eq!(failure.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(failure.error().to_string(), "gone");

        let error: io::Error = failure.into();
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(error.to_string(), "gone");
    }

    #[test]
    fn test_failure_split_pair() {
        let failure = WriteFailure::new(2, io::Error::from(io::ErrorKind::BrokenPipe))
            .with_split_pair(true);
        assert!(failure.split_pair());
        assert_eq!(failure.accepted(), 2);
    }

    #[test]
    fn test_failure_display() {
        let failure = WriteFailure::new(0, io::Error::new(io::ErrorKind::WriteZero, "full"));
        assert_eq!(failure.to_string(), "sink failed after 0 input bytes: full");
    }
}
