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

//! Blocking IAC escaping writer

use crate::config::DataWriterConfig;
use crate::error::{WriteFailure, WriteResult};
use crate::escape::{delivered_input, ends_mid_pair, escape_bounded};
use bytes::BytesMut;
use std::io::{self, Write};
use tracing::{debug, trace};

/// Writes Telnet data channel payload to a sink, doubling every IAC byte.
///
/// Escaped output is staged in an internal buffer and handed to the sink in batches. Every
/// call to [`write_escaped`](EscapingWriter::write_escaped) empties that buffer before it
/// returns, whether it succeeds or fails, so nothing written through one call is held back
/// for the next. Whatever buffering the sink does on its own is left to the sink unless
/// [`DataWriterConfig::flush_sink`] is set.
///
/// Pass `&mut sink` to keep ownership of the sink with the caller; the writer never closes it.
///
/// # Thread Safety
///
/// A writer has exactly one producer at a time. Concurrent producers must be serialized by
/// the caller, and command channel writes to the same sink must be coordinated with it.
///
/// # Example
/// ```
/// use telnet_datawriter::EscapingWriter;
///
/// let mut sink: Vec<u8> = Vec::new();
/// let mut writer = EscapingWriter::new(&mut sink);
/// let accepted = writer.write_escaped(&[1, 255, 2]).unwrap();
/// assert_eq!(accepted, 3);
/// assert_eq!(sink, vec![1, 255, 255, 2]);
/// ```
#[derive(Debug)]
pub struct EscapingWriter<W: Write> {
    sink: W,
    buffer: BytesMut,
    config: DataWriterConfig,
}

impl<W: Write> EscapingWriter<W> {
    /// Creates a writer around `sink` with the default configuration.
    pub fn new(sink: W) -> Self {
        Self::with_config(sink, DataWriterConfig::default())
    }

    /// Creates a writer around `sink` with the given configuration.
    pub fn with_config(sink: W, config: DataWriterConfig) -> Self {
        Self {
            sink,
            buffer: BytesMut::with_capacity(config.effective_capacity()),
            config,
        }
    }

    /// Returns the writer configuration.
    pub fn config(&self) -> &DataWriterConfig {
        &self.config
    }

    /// Get a reference to the sink.
    pub fn get_ref(&self) -> &W {
        &self.sink
    }

    /// Get a mutable reference to the sink.
    ///
    /// Bytes written here bypass escaping. This is how command sequences are interleaved
    /// with data written through the escaping writer.
    pub fn get_mut(&mut self) -> &mut W {
        &mut self.sink
    }

    /// Consumes the writer and returns the sink.
    pub fn into_inner(self) -> W {
        self.sink
    }

    /// Escapes `data` and forwards it to the sink.
    ///
    /// Scans `data` once. Ordinary runs are forwarded verbatim and each IAC is forwarded as
    /// `IAC IAC`. On success the returned count is `data.len()`: input bytes, not output bytes.
    ///
    /// # Errors
    ///
    /// Fails with the sink's own error as soon as a sink write or flush fails. No further input
    /// is processed, [`WriteFailure::accepted`] counts the input bytes that reached the sink in
    /// full, and bytes already handed over are not taken back.
    pub fn write_escaped(&mut self, data: &[u8]) -> WriteResult {
        let capacity = self.config.effective_capacity();
        let flush_sink = self.config.flush_sink;
        let mut batch = Batch::new(&mut self.buffer, &mut self.sink);
        let outcome = batch.stage_all(data, capacity);
        batch.finish(outcome, flush_sink)
    }
}

impl<W: Write> Write for EscapingWriter<W> {
    /// Reports partial progress as `Ok`, as [`Write::write`] requires. The sink error is
    /// returned when no input byte got through, or when the sink was left holding half an
    /// IAC pair and resuming from the partial count would corrupt the stream.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.write_escaped(buf) {
            Ok(accepted) => Ok(accepted),
            Err(failure) if failure.accepted() > 0 && !failure.split_pair() => {
                Ok(failure.accepted())
            }
            // `write_all` retries `Interrupted`, which would resend half a pair.
            Err(failure)
                if failure.split_pair() && failure.kind() == io::ErrorKind::Interrupted =>
            {
                Err(io::Error::other(failure))
            }
            Err(failure) => Err(failure.into_error()),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        self.sink.flush()
    }
}

/// Staging scope for a single write.
///
/// Borrows the staging buffer and the sink for one call. Output leaves through
/// [`Batch::finish`]; whatever is still staged when the batch is dropped is discarded, so
/// no bytes carry over into the next call.
struct Batch<'a, W: Write> {
    buffer: &'a mut BytesMut,
    sink: &'a mut W,
    /// Input bytes delivered to the sink in full.
    accepted: usize,
    /// Input bytes represented by the staged output.
    staged: usize,
    /// The failed drain stopped between the two halves of an IAC pair.
    split_pair: bool,
}

impl<'a, W: Write> Batch<'a, W> {
    fn new(buffer: &'a mut BytesMut, sink: &'a mut W) -> Self {
        buffer.clear();
        Self {
            buffer,
            sink,
            accepted: 0,
            staged: 0,
            split_pair: false,
        }
    }

    fn stage_all(&mut self, mut data: &[u8], capacity: usize) -> io::Result<()> {
        while !data.is_empty() {
            let consumed = escape_bounded(data, self.buffer, capacity);
            self.staged += consumed;
            data = &data[consumed..];
            if !data.is_empty() {
                self.drain()?;
            }
        }
        Ok(())
    }

    /// Hands everything staged to the sink.
    ///
    /// Both halves of an IAC pair sit in the same batch, so once the first half is accepted
    /// the second is the very next byte offered.
    fn drain(&mut self) -> io::Result<()> {
        let mut written = 0;
        let result = loop {
            let pending = &self.buffer[written..];
            if pending.is_empty() {
                break Ok(());
            }
            match self.sink.write(pending) {
                Ok(0) => {
                    break Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "sink accepted no bytes",
                    ));
                }
                Ok(n) => written += n.min(pending.len()),
                Err(error) => break Err(error),
            }
        };
        match &result {
            Ok(()) => {
                trace!(bytes = written, input = self.staged, "drained staged output");
                self.accepted += self.staged;
            }
            Err(error) => {
                let delivered = delivered_input(&self.buffer[..written]);
                self.split_pair = ends_mid_pair(&self.buffer[..written]);
                debug!(
                    bytes = written,
                    input = delivered,
                    split_pair = self.split_pair,
                    error = %error,
                    "sink write failed"
                );
                self.accepted += delivered;
            }
        }
        self.staged = 0;
        self.buffer.clear();
        result
    }

    /// Drains what is left and, when configured, flushes the sink.
    ///
    /// The sink flush is attempted on the failure path as well; the first error wins.
    fn finish(mut self, outcome: io::Result<()>, flush_sink: bool) -> WriteResult {
        let outcome = outcome.and_then(|()| self.drain());
        let flushed = if flush_sink {
            self.sink.flush()
        } else {
            Ok(())
        };
        match outcome.and(flushed) {
            Ok(()) => Ok(self.accepted),
            Err(error) => {
                Err(WriteFailure::new(self.accepted, error).with_split_pair(self.split_pair))
            }
        }
    }
}

impl<W: Write> Drop for Batch<'_, W> {
    fn drop(&mut self) {
        self.buffer.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::IAC;
    use tracing_test::traced_test;

    /// Records every write, failing once `fail_after` bytes have been accepted.
    struct LimitedSink {
        written: Vec<u8>,
        writes: usize,
        fail_after: usize,
        flushes: usize,
    }

    impl LimitedSink {
        fn new(fail_after: usize) -> Self {
            Self {
                written: Vec::new(),
                writes: 0,
                fail_after,
                flushes: 0,
            }
        }
    }

    impl Write for LimitedSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.writes += 1;
            let room = self.fail_after - self.written.len();
            if room == 0 {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"));
            }
            let n = room.min(buf.len());
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            Ok(())
        }
    }

    #[test]
    fn test_writes_escaped_output() {
        let mut sink: Vec<u8> = Vec::new();
        let mut writer = EscapingWriter::new(&mut sink);
        assert_eq!(writer.write_escaped(&[IAC, b'a', IAC]).unwrap(), 3);
        assert_eq!(sink, vec![IAC, IAC, b'a', IAC, IAC]);
    }

    #[test]
    fn test_small_buffer_drains_in_batches() {
        let sink = LimitedSink::new(usize::MAX);
        let config = DataWriterConfig::new().with_buffer_capacity(2);
        let mut writer = EscapingWriter::with_config(sink, config);
        assert_eq!(writer.write_escaped(&[1, IAC, 2, 3]).unwrap(), 4);
        let sink = writer.into_inner();
        assert_eq!(sink.written, vec![1, IAC, IAC, 2, 3]);
        assert_eq!(sink.writes, 3);
    }

    #[test]
    fn test_buffer_is_empty_after_failure() {
        let mut writer = EscapingWriter::new(LimitedSink::new(2));
        let failure = writer.write_escaped(&[1, 2, 3, 4]).unwrap_err();
        assert_eq!(failure.accepted(), 2);
        assert!(writer.buffer.is_empty());

        writer.get_mut().fail_after = usize::MAX;
        assert_eq!(writer.write_escaped(&[5]).unwrap(), 1);
        assert_eq!(writer.get_ref().written, vec![1, 2, 5]);
    }

    #[test]
    fn test_half_pair_is_not_counted() {
        let mut writer = EscapingWriter::new(LimitedSink::new(3));
        let failure = writer.write_escaped(&[1, 2, IAC, 4]).unwrap_err();
        assert_eq!(failure.accepted(), 2);
        assert!(failure.split_pair());
        assert_eq!(failure.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(writer.get_ref().written, vec![1, 2, IAC]);
    }

    #[test]
    fn test_sink_flushed_only_when_configured() {
        let mut writer = EscapingWriter::new(LimitedSink::new(usize::MAX));
        writer.write_escaped(b"abc").unwrap();
        assert_eq!(writer.get_ref().flushes, 0);

        let config = DataWriterConfig::new().with_flush_sink(true);
        let mut writer = EscapingWriter::with_config(LimitedSink::new(usize::MAX), config);
        writer.write_escaped(b"abc").unwrap();
        assert_eq!(writer.get_ref().flushes, 1);
    }

    #[test]
    fn test_io_write_reports_partial_progress() {
        let mut writer = EscapingWriter::new(LimitedSink::new(2));
        assert_eq!(Write::write(&mut writer, &[1, 2, 3]).unwrap(), 2);
        let error = Write::write(&mut writer, &[3]).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_io_write_refuses_partial_count_after_split_pair() {
        let mut writer = EscapingWriter::new(LimitedSink::new(3));
        let error = Write::write(&mut writer, &[1, 2, IAC, 4]).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(writer.get_ref().written, vec![1, 2, IAC]);
    }

    #[test]
    fn test_sink_flushed_after_failure_when_configured() {
        let config = DataWriterConfig::new().with_flush_sink(true);
        let mut writer = EscapingWriter::with_config(LimitedSink::new(1), config);
        let failure = writer.write_escaped(&[1, 2]).unwrap_err();
        assert_eq!(failure.kind(), io::ErrorKind::BrokenPipe);
        assert_eq!(failure.accepted(), 1);
        assert_eq!(writer.get_ref().flushes, 1);
    }

    #[test]
    #[traced_test]
    fn test_drain_is_traced() {
        let mut sink: Vec<u8> = Vec::new();
        let mut writer = EscapingWriter::new(&mut sink);
        writer.write_escaped(&[IAC]).unwrap();
        assert!(logs_contain("drained staged output"));
    }

    #[test]
    #[traced_test]
    fn test_failure_is_traced() {
        let mut writer = EscapingWriter::new(LimitedSink::new(0));
        writer.write_escaped(b"x").unwrap_err();
        assert!(logs_contain("sink write failed"));
    }
}
