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

//! Writer configuration
//!
//! # Example
//!
//! ```
//! use telnet_datawriter::DataWriterConfig;
//!
//! let config = DataWriterConfig::default()
//!     .with_buffer_capacity(1024)
//!     .with_flush_sink(true);
//! assert_eq!(config.buffer_capacity, 1024);
//! ```

/// Smallest staging buffer a writer will use. An escaped IAC pair must fit in one batch.
pub const MIN_BUFFER_CAPACITY: usize = 2;

/// Default staging buffer size
pub const DEFAULT_BUFFER_CAPACITY: usize = 4096;

/// Configuration shared by [`EscapingWriter`](crate::EscapingWriter) and
/// [`AsyncEscapingWriter`](crate::AsyncEscapingWriter).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataWriterConfig {
    /// Size of the staging buffer escaped output is batched in before it reaches the sink.
    ///
    /// Values below [`MIN_BUFFER_CAPACITY`] are raised to it.
    pub buffer_capacity: usize,

    /// Also flush the sink itself at the end of every successful write.
    ///
    /// When `false`, only the writer's own staging buffer is emptied per write and the sink's
    /// deeper buffering is left to the sink.
    pub flush_sink: bool,
}

impl Default for DataWriterConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            flush_sink: false,
        }
    }
}

impl DataWriterConfig {
    /// Create a configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the staging buffer capacity
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Enable or disable flushing the sink after every write
    pub fn with_flush_sink(mut self, enabled: bool) -> Self {
        self.flush_sink = enabled;
        self
    }

    /// Staging capacity actually used, after clamping.
    pub(crate) fn effective_capacity(&self) -> usize {
        self.buffer_capacity.max(MIN_BUFFER_CAPACITY)
    }
}
