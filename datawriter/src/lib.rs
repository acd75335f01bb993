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

//! # Telnet Data Channel Writer
//!
//! This crate escapes payload bytes for the data channel of a Telnet (or TELNETS)
//! connection. Byte `0xFF` (IAC, Interpret As Command) introduces every Telnet command, so
//! a literal `0xFF` in payload data has to be sent twice (`IAC IAC`) for the peer to tell
//! it apart from a command.
//!
//! ```text
//! [1, 55, 2, 155, 3, 255, 4, 40, 255, 30, 20]
//!   -> [1, 55, 2, 155, 3, 255, 255, 4, 40, 255, 255, 30, 20]
//! ```
//!
//! ## Core Components
//!
//! ### [`EscapingWriter`]
//!
//! Wraps any [`std::io::Write`] sink. Each call to
//! [`write_escaped`](EscapingWriter::write_escaped) forwards the escaped form of its input
//! and empties the writer's staging buffer before returning. Failures carry the sink's own
//! error together with the number of input bytes that got through.
//!
//! ### [`AsyncEscapingWriter`]
//!
//! The same transform over a Tokio [`AsyncWrite`](tokio::io::AsyncWrite) sink.
//!
//! ### [`DataEncoder`]
//!
//! A [`tokio_util::codec::Encoder`] for payload, for use with `FramedWrite`.
//!
//! ## Usage Example
//!
//! ```rust
//! use telnet_datawriter::EscapingWriter;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut sink: Vec<u8> = Vec::new();
//! let mut writer = EscapingWriter::new(&mut sink);
//!
//! writer.write_escaped(&[1, 55, 2, 155, 3, 255])?;
//! writer.write_escaped(&[4, 40, 255, 30, 20])?;
//!
//! assert_eq!(sink, vec![1, 55, 2, 155, 3, 255, 255, 4, 40, 255, 255, 30, 20]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! ## Scope
//!
//! Only data is handled here. Commands, option negotiation and subnegotiation are written
//! to the sink directly (see [`EscapingWriter::get_mut`]) by whatever speaks the command
//! channel, and must be coordinated with data writes by the caller.
//!
//! ## Thread Safety
//!
//! Writers are **not** meant to be shared between producers. Serialize access externally if
//! several tasks produce data for one connection.
//!
//! ## Related RFCs
//!
//! - RFC 854: Telnet Protocol Specification

#![warn(
    clippy::cargo,
    missing_docs,
    clippy::pedantic,
    future_incompatible,
    rust_2018_idioms
)]
#![allow(
    clippy::option_if_let_else,
    clippy::module_name_repetitions,
    clippy::missing_errors_doc
)]

mod config;
mod consts;
mod error;
mod escape;
mod stream;
mod writer;

pub use self::config::{DEFAULT_BUFFER_CAPACITY, DataWriterConfig, MIN_BUFFER_CAPACITY};
pub use self::consts::IAC;
pub use self::error::{WriteFailure, WriteResult};
pub use self::escape::{DataEncoder, delivered_input, escape, escape_into, escaped_len};
pub use self::stream::AsyncEscapingWriter;
pub use self::writer::EscapingWriter;
