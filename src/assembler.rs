// Copyright 2025 Dustin McAfee
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

//! Byte-stream assembler.
//!
//! The core never reads from a socket itself; a host hands it arbitrarily
//! chopped byte chunks via [`crate::client::Client::ingest`]. `Assembler`
//! buffers those chunks and lets the protocol state machine pull out
//! fixed-size or length-prefixed pieces without caring where a TCP segment
//! boundary happened to fall.

use bytes::{Buf, Bytes, BytesMut};

/// Accumulates inbound bytes and hands out complete pieces on demand.
#[derive(Debug, Default)]
pub struct Assembler {
    pending: BytesMut,
}

impl Assembler {
    /// Creates an empty assembler.
    #[must_use]
    pub fn new() -> Self {
        Self {
            pending: BytesMut::new(),
        }
    }

    /// Appends a freshly received chunk to the pending buffer.
    pub fn ingest(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
    }

    /// Number of bytes currently buffered and not yet consumed.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// `true` if no bytes are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Looks at the first byte without consuming it, if one is available.
    #[must_use]
    pub fn peek_u8(&self) -> Option<u8> {
        self.pending.first().copied()
    }

    /// Looks at the first `n` bytes without consuming them, if that many
    /// are available.
    #[must_use]
    pub fn peek(&self, n: usize) -> Option<&[u8]> {
        if self.pending.len() < n {
            None
        } else {
            Some(&self.pending[..n])
        }
    }

    /// Consumes and returns exactly `n` bytes if that many are buffered;
    /// otherwise leaves the buffer untouched and returns `None`. Callers
    /// must re-attempt once more bytes have been ingested.
    pub fn take(&mut self, n: usize) -> Option<Bytes> {
        if self.pending.len() < n {
            return None;
        }
        Some(self.pending.split_to(n).freeze())
    }

    /// Discards `n` bytes without returning them (used to skip padding).
    pub fn skip(&mut self, n: usize) -> bool {
        if self.pending.len() < n {
            return false;
        }
        self.pending.advance(n);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_returns_none_until_enough_bytes() {
        let mut a = Assembler::new();
        a.ingest(&[1, 2, 3]);
        assert!(a.take(5).is_none());
        assert_eq!(a.len(), 3);
        a.ingest(&[4, 5]);
        let got = a.take(5).unwrap();
        assert_eq!(&got[..], &[1, 2, 3, 4, 5]);
        assert!(a.is_empty());
    }

    #[test]
    fn split_across_many_tiny_chunks() {
        let mut a = Assembler::new();
        for b in [10u8, 20, 30, 40] {
            a.ingest(&[b]);
        }
        assert_eq!(a.take(4).unwrap()[..], [10, 20, 30, 40]);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut a = Assembler::new();
        a.ingest(&[7, 8, 9]);
        assert_eq!(a.peek_u8(), Some(7));
        assert_eq!(a.peek(2), Some(&[7u8, 8][..]));
        assert_eq!(a.len(), 3);
    }

    #[test]
    fn skip_discards_without_returning() {
        let mut a = Assembler::new();
        a.ingest(&[1, 2, 3, 4]);
        assert!(a.skip(2));
        assert_eq!(a.take(2).unwrap()[..], [3, 4]);
    }
}
