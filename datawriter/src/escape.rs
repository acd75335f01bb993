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

//! IAC escaping primitives.
//!
//! These are the building blocks shared by [`EscapingWriter`](crate::EscapingWriter),
//! [`AsyncEscapingWriter`](crate::AsyncEscapingWriter) and [`DataEncoder`]. They hold no
//! state: whether a byte needs doubling depends on that byte alone.

use crate::consts::IAC;
use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::Encoder;

/// Returns the number of bytes `data` occupies once every IAC is doubled.
///
/// # Example
/// ```
/// use telnet_datawriter::escaped_len;
///
/// assert_eq!(escaped_len(&[1, 255, 2]), 4);
/// assert_eq!(escaped_len(&[]), 0);
/// ```
pub fn escaped_len(data: &[u8]) -> usize {
    data.len() + data.iter().filter(|&&byte| byte == IAC).count()
}

/// Appends the escaped form of `data` to `dst`.
///
/// Runs of ordinary bytes are copied with a single `put_slice`; each IAC becomes `IAC IAC`.
/// The scan is a single linear pass over `data`.
///
/// # Example
/// ```
/// use bytes::BytesMut;
/// use telnet_datawriter::escape_into;
///
/// let mut dst = BytesMut::new();
/// escape_into(&[1, 55, 2, 155, 3, 255, 4, 40, 255, 30, 20], &mut dst);
/// assert_eq!(&dst[..], &[1, 55, 2, 155, 3, 255, 255, 4, 40, 255, 255, 30, 20]);
/// ```
pub fn escape_into(data: &[u8], dst: &mut BytesMut) {
    dst.reserve(escaped_len(data));
    let mut run_start = 0;
    for (index, &byte) in data.iter().enumerate() {
        if byte == IAC {
            dst.put_slice(&data[run_start..index]);
            dst.put_u8(IAC);
            dst.put_u8(IAC);
            run_start = index + 1;
        }
    }
    dst.put_slice(&data[run_start..]);
}

/// Returns a freshly allocated buffer holding the escaped form of `data`.
pub fn escape(data: &[u8]) -> BytesMut {
    let mut dst = BytesMut::with_capacity(escaped_len(data));
    escape_into(data, &mut dst);
    dst
}

/// Escapes as much of `data` as fits in `dst` without growing it past `capacity` bytes.
///
/// An IAC pair is staged whole or not at all. Returns the number of input bytes consumed;
/// this is zero only when `dst` has fewer than two bytes of room and `data` starts with IAC,
/// or has no room at all.
pub(crate) fn escape_bounded(data: &[u8], dst: &mut BytesMut, capacity: usize) -> usize {
    let mut room = capacity.saturating_sub(dst.len());
    let mut run_start = 0;
    let mut consumed = 0;
    for &byte in data {
        let needed = if byte == IAC { 2 } else { 1 };
        if needed > room {
            break;
        }
        room -= needed;
        if byte == IAC {
            dst.put_slice(&data[run_start..consumed]);
            dst.put_slice(&[IAC, IAC]);
            run_start = consumed + 1;
        }
        consumed += 1;
    }
    dst.put_slice(&data[run_start..consumed]);
    consumed
}

/// Counts the input bytes fully represented by a prefix of escaped output.
///
/// `prefix` must begin on a pair boundary. An ordinary byte stands for one input byte and
/// an `IAC IAC` pair stands for one input byte; a trailing lone IAC is the first half of a
/// pair whose second half never arrived and counts for nothing.
///
/// # Example
/// ```
/// use telnet_datawriter::delivered_input;
///
/// assert_eq!(delivered_input(&[1, 2, 255, 255, 3]), 4);
/// assert_eq!(delivered_input(&[1, 2, 255]), 2);
/// ```
pub fn delivered_input(prefix: &[u8]) -> usize {
    walk_prefix(prefix).0
}

/// Returns `true` when `prefix` ends with the first half of an IAC pair.
///
/// `prefix` must begin on a pair boundary.
pub(crate) fn ends_mid_pair(prefix: &[u8]) -> bool {
    walk_prefix(prefix).1
}

/// Walks escaped output pair by pair, returning the input count it represents and whether
/// it stops on a lone IAC.
fn walk_prefix(prefix: &[u8]) -> (usize, bool) {
    let mut count = 0;
    let mut index = 0;
    while index < prefix.len() {
        if prefix[index] == IAC {
            if index + 1 == prefix.len() {
                return (count, true);
            }
            index += 2;
        } else {
            index += 1;
        }
        count += 1;
    }
    (count, false)
}

/// A [`tokio_util`] encoder for Telnet data channel payload.
///
/// Each item is appended to the frame buffer with IAC doubled. Pair it with
/// `FramedWrite` when the transport is driven through the codec machinery rather than
/// through [`AsyncEscapingWriter`](crate::AsyncEscapingWriter).
///
/// # Example
/// ```
/// use bytes::BytesMut;
/// use telnet_datawriter::DataEncoder;
/// use tokio_util::codec::Encoder;
///
/// let mut encoder = DataEncoder::new();
/// let mut dst = BytesMut::new();
/// encoder.encode(&b"a\xFFb"[..], &mut dst).unwrap();
/// assert_eq!(&dst[..], b"a\xFF\xFFb");
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DataEncoder;

impl DataEncoder {
    /// Creates a new `DataEncoder`.
    pub fn new() -> DataEncoder {
        DataEncoder
    }
}

impl Encoder<&[u8]> for DataEncoder {
    type Error = std::io::Error;

    fn encode(&mut self, item: &[u8], dst: &mut BytesMut) -> Result<(), Self::Error> {
        escape_into(item, dst);
        Ok(())
    }
}

impl Encoder<Bytes> for DataEncoder {
    type Error = std::io::Error;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        escape_into(&item, dst);
        Ok(())
    }
}

impl Encoder<u8> for DataEncoder {
    type Error = std::io::Error;

    fn encode(&mut self, item: u8, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(2);
        if item == IAC {
            dst.put_u8(IAC);
        }
        dst.put_u8(item);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_leaves_plain_data_alone() {
        let data = b"Raw Ascii Data\r\n";
        assert_eq!(&escape(data)[..], &data[..]);
        assert_eq!(escaped_len(data), data.len());
    }

    #[test]
    fn escape_doubles_every_iac() {
        assert_eq!(&escape(&[255])[..], &[255, 255]);
        assert_eq!(&escape(&[255, 255])[..], &[255, 255, 255, 255]);
        assert_eq!(&escape(&[0, 255, 0])[..], &[0, 255, 255, 0]);
    }

    #[test]
    fn escape_appends_to_existing_buffer() {
        let mut dst = BytesMut::from(&b"head"[..]);
        escape_into(&[255, b'x'], &mut dst);
        assert_eq!(&dst[..], b"head\xFF\xFFx");
    }

    #[test]
    fn escaping_twice_is_not_escaping_once() {
        let once = escape(&[7, 255, 8]);
        let twice = escape(&once);
        assert_eq!(&once[..], &[7, 255, 255, 8]);
        assert_eq!(&twice[..], &[7, 255, 255, 255, 255, 8]);
        assert_ne!(once, twice);
    }

    #[test]
    fn bounded_escape_stops_at_capacity() {
        let mut dst = BytesMut::new();
        assert_eq!(escape_bounded(&[1, 2, 3, 4], &mut dst, 3), 3);
        assert_eq!(&dst[..], &[1, 2, 3]);
    }

    #[test]
    fn bounded_escape_never_splits_a_pair() {
        let mut dst = BytesMut::new();
        assert_eq!(escape_bounded(&[1, 2, 255, 4], &mut dst, 3), 2);
        assert_eq!(&dst[..], &[1, 2]);

        let mut dst = BytesMut::from(&[9u8][..]);
        assert_eq!(escape_bounded(&[255], &mut dst, 2), 0);
        assert_eq!(&dst[..], &[9]);
    }

    #[test]
    fn bounded_escape_with_room_matches_escape() {
        let data = [1, 55, 2, 155, 3, 255, 4, 40, 255, 30, 20];
        let mut dst = BytesMut::new();
        assert_eq!(escape_bounded(&data, &mut dst, 64), data.len());
        assert_eq!(dst, escape(&data));
    }

    #[test]
    fn delivered_input_ignores_half_pairs() {
        assert_eq!(delivered_input(&[]), 0);
        assert_eq!(delivered_input(&[255]), 0);
        assert_eq!(delivered_input(&[255, 255]), 1);
        assert_eq!(delivered_input(&[255, 255, 255]), 1);
        assert_eq!(delivered_input(&[1, 255, 255, 2, 255, 255]), 4);
    }

    #[test]
    fn lone_trailing_iac_is_mid_pair() {
        assert!(ends_mid_pair(&[1, 2, 255]));
        assert!(ends_mid_pair(&[255, 255, 255]));
        assert!(!ends_mid_pair(&[]));
        assert!(!ends_mid_pair(&[1, 255, 255]));
        assert!(!ends_mid_pair(&[1, 2]));
    }

    #[test]
    fn delivered_input_of_full_output_is_input_len() {
        let data = [1, 55, 2, 155, 3, 255, 4, 40, 255, 30, 20];
        assert_eq!(delivered_input(&escape(&data)), data.len());
    }

    #[test]
    fn encoder_escapes_single_bytes() {
        let mut encoder = DataEncoder::new();
        let mut dst = BytesMut::new();
        encoder.encode(b'A', &mut dst).unwrap();
        encoder.encode(IAC, &mut dst).unwrap();
        assert_eq!(&dst[..], &[b'A', IAC, IAC]);
    }

    #[test]
    fn encoder_escapes_bytes_items() {
        let mut encoder = DataEncoder::new();
        let mut dst = BytesMut::new();
        encoder
            .encode(Bytes::from_static(&[255, 1, 255]), &mut dst)
            .unwrap();
        assert_eq!(&dst[..], &[255, 255, 1, 255, 255]);
    }
}
