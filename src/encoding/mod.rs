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

//! VNC encoding implementations.
//!
//! Only Raw pixel encoding is implemented here; CopyRect is composed
//! directly by [`crate::scheduler`] rather than going through [`Encoding`].
//! Bit-packing for the remaining wire encodings (RRE, Hextile, Tight, the
//! Zlib family, ...) is out of scope for this crate: a client's advertised
//! encoding list is still parsed and tracked in full, but the scheduler only
//! ever emits Raw rectangles, regardless of what a client prefers.

use crate::protocol::ENCODING_RAW;
use bytes::BytesMut;

pub mod raw;

pub use raw::RawEncoding;

/// Trait defining the interface for VNC encoding implementations.
pub trait Encoding {
    /// Encodes raw pixel data into a VNC-compatible byte stream.
    ///
    /// # Arguments
    ///
    /// * `data` - Raw pixel data (RGBA format: 4 bytes per pixel)
    /// * `width` - Width of the framebuffer
    /// * `height` - Height of the framebuffer
    /// * `quality` - Quality level for lossy encodings (0-100)
    /// * `compression` - Compression level (0-9)
    ///
    /// # Returns
    ///
    /// Encoded data as `BytesMut`
    fn encode(
        &self,
        data: &[u8],
        width: u16,
        height: u16,
        quality: u8,
        compression: u8,
    ) -> BytesMut;
}

/// Creates an encoder instance for the specified encoding type. Only
/// [`ENCODING_RAW`] is backed by an actual encoder; every other wire
/// encoding number is accepted at the protocol layer but has no bit-packing
/// implementation here.
#[must_use]
pub fn get_encoder(encoding_type: i32) -> Option<Box<dyn Encoding>> {
    match encoding_type {
        ENCODING_RAW => Some(Box::new(RawEncoding)),
        _ => None,
    }
}
