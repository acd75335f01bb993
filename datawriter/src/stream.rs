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

//! Asynchronous IAC escaping writer
//!
//! [`AsyncEscapingWriter`] is the Tokio counterpart of [`EscapingWriter`](crate::EscapingWriter).
//! Through the [`AsyncWrite`] trait it behaves like a buffered writer: written input is
//! acknowledged once its escaped form is staged, and `flush` pushes the stage out. Use
//! [`AsyncEscapingWriter::write_escaped`] when a write must not return before its output has
//! left the stage.

use crate::config::DataWriterConfig;
use crate::error::{WriteFailure, WriteResult};
use crate::escape::{delivered_input, ends_mid_pair, escape_bounded};
use bytes::BytesMut;
use pin_project_lite::pin_project;
use std::future::poll_fn;
use std::pin::Pin;
use std::task::{Context, Poll, ready};
use tokio::io::{self, AsyncWrite};
use tracing::{debug, trace};

pin_project! {
    /// Escapes IAC bytes on their way into an [`AsyncWrite`] sink.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use telnet_datawriter::AsyncEscapingWriter;
    /// use tokio::io::AsyncWriteExt;
    /// use tokio::net::TcpStream;
    ///
    /// # async fn example() -> std::io::Result<()> {
    /// let stream = TcpStream::connect("127.0.0.1:23").await?;
    /// let mut writer = AsyncEscapingWriter::new(stream);
    ///
    /// writer.write_all(b"payload with \xFF inside").await?;
    /// writer.flush().await?;
    /// # Ok(())
    /// # }
    /// ```
    #[derive(Debug)]
    pub struct AsyncEscapingWriter<S> {
        #[pin]
        inner: S,
        buffer: BytesMut,
        // Bytes at the front of `buffer` the sink has already taken.
        written: usize,
        config: DataWriterConfig,
    }
}

impl<S> AsyncEscapingWriter<S>
where
    S: AsyncWrite,
{
    /// Creates a writer around `inner` with the default configuration.
    pub fn new(inner: S) -> Self {
        Self::with_config(inner, DataWriterConfig::default())
    }

    /// Creates a writer around `inner` with the given configuration.
    pub fn with_config(inner: S, config: DataWriterConfig) -> Self {
        Self {
            inner,
            buffer: BytesMut::with_capacity(config.effective_capacity()),
            written: 0,
            config,
        }
    }

    /// Returns the writer configuration.
    pub fn config(&self) -> &DataWriterConfig {
        &self.config
    }

    /// Get a reference to the inner stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Get a mutable reference to the inner stream.
    ///
    /// Bytes written here bypass escaping and overtake anything still staged.
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.inner
    }

    /// Get a pinned mutable reference to the inner stream.
    pub fn get_pin_mut(self: Pin<&mut Self>) -> Pin<&mut S> {
        self.project().inner
    }

    /// Consumes the writer and returns the inner stream.
    ///
    /// Staged output that was never flushed is lost.
    pub fn into_inner(self) -> S {
        self.inner
    }

    /// Returns the number of escaped bytes staged but not yet taken by the sink.
    pub fn pending(&self) -> usize {
        self.buffer.len() - self.written
    }

    /// Escapes as much of `data` as fits into the stage.
    fn stage(self: Pin<&mut Self>, data: &[u8]) -> usize {
        let this = self.project();
        escape_bounded(data, this.buffer, this.config.effective_capacity())
    }

    /// Writes staged output to the inner stream until the stage is empty.
    fn poll_drain(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let mut this = self.project();
        while *this.written < this.buffer.len() {
            let pending = &this.buffer[*this.written..];
            match ready!(this.inner.as_mut().poll_write(cx, pending)) {
                Ok(0) => {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::WriteZero,
                        "sink accepted no bytes",
                    )));
                }
                Ok(n) => *this.written += n.min(pending.len()),
                Err(error) => return Poll::Ready(Err(error)),
            }
        }
        if !this.buffer.is_empty() {
            trace!(bytes = this.buffer.len(), "drained staged output");
        }
        this.buffer.clear();
        *this.written = 0;
        Poll::Ready(Ok(()))
    }

    /// Drops staged output and returns how many of its input bytes reached the sink in full,
    /// and whether the sink stopped between the halves of an IAC pair.
    fn discard(self: Pin<&mut Self>) -> (usize, bool) {
        let this = self.project();
        let sent = &this.buffer[..*this.written];
        let outcome = (delivered_input(sent), ends_mid_pair(sent));
        this.buffer.clear();
        *this.written = 0;
        outcome
    }
}

impl<S> AsyncEscapingWriter<S>
where
    S: AsyncWrite + Unpin,
{
    /// Escapes `data` and forwards it, returning once nothing of it is left staged.
    ///
    /// Output staged by earlier [`AsyncWrite`] calls is pushed out first.
    ///
    /// # Errors
    ///
    /// Fails with the sink's own error. [`WriteFailure::accepted`] counts the input bytes of
    /// this call that reached the sink in full; undelivered output of this call is dropped
    /// from the stage. If the earlier output cannot be pushed out, nothing of `data` is
    /// processed and the count is zero.
    pub async fn write_escaped(&mut self, data: &[u8]) -> WriteResult {
        let mut this = Pin::new(self);
        if let Err(error) = poll_fn(|cx| this.as_mut().poll_drain(cx)).await {
            return Err(WriteFailure::new(0, error));
        }

        let mut accepted = 0;
        let mut remaining = data;
        while !remaining.is_empty() {
            let staged = this.as_mut().stage(remaining);
            remaining = &remaining[staged..];
            if let Err(error) = poll_fn(|cx| this.as_mut().poll_drain(cx)).await {
                let (delivered, split_pair) = this.as_mut().discard();
                accepted += delivered;
                debug!(input = accepted, split_pair, error = %error, "sink write failed");
                return Err(WriteFailure::new(accepted, error).with_split_pair(split_pair));
            }
            accepted += staged;
        }

        if this.config.flush_sink {
            poll_fn(|cx| this.as_mut().get_pin_mut().poll_flush(cx))
                .await
                .map_err(|error| WriteFailure::new(accepted, error))?;
        }
        Ok(accepted)
    }
}

impl<S> AsyncWrite for AsyncEscapingWriter<S>
where
    S: AsyncWrite,
{
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<Result<usize, io::Error>> {
        if buf.is_empty() {
            return Poll::Ready(Ok(0));
        }
        let staged = self.as_mut().stage(buf);
        if staged > 0 {
            return Poll::Ready(Ok(staged));
        }
        ready!(self.as_mut().poll_drain(cx))?;
        Poll::Ready(Ok(self.stage(buf)))
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Result<(), io::Error>> {
        ready!(self.as_mut().poll_drain(cx))?;
        self.project().inner.poll_flush(cx)
    }

    fn poll_shutdown(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<(), io::Error>> {
        ready!(self.as_mut().poll_drain(cx))?;
        self.project().inner.poll_shutdown(cx)
    }
}
