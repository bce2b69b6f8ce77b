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

//! The server-side pixel buffer.
//!
//! `Framebuffer` owns the raw RGBA32 pixel storage for a [`crate::screen::Screen`].
//! The host writes pixels into it (directly, or by handing the library a
//! fresh buffer on resize) and the update scheduler reads rectangles back
//! out of it when composing an outgoing `FramebufferUpdate`. Access is
//! guarded by a plain `std::sync::RwLock` rather than `tokio::sync::RwLock`:
//! the core never awaits while holding it, since `Client::ingest` and the
//! scheduler run to completion synchronously instead of suspending
//! mid-update.

use crate::error::{Result, VncError};
use crate::region::Rect;
use std::sync::RwLock;

/// Bytes per pixel for the server's native RGBA32 storage format.
pub const BYTES_PER_PIXEL: usize = 4;

struct Inner {
    width: u16,
    height: u16,
    pixels: Vec<u8>,
}

impl Inner {
    fn stride(&self) -> usize {
        self.width as usize * BYTES_PER_PIXEL
    }
}

/// A resizable RGBA32 pixel buffer shared between the host and the core.
pub struct Framebuffer {
    inner: RwLock<Inner>,
}

impl Framebuffer {
    /// Creates a new framebuffer of the given dimensions, initialized to
    /// opaque black.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        let len = width as usize * height as usize * BYTES_PER_PIXEL;
        Self {
            inner: RwLock::new(Inner {
                width,
                height,
                pixels: vec![0u8; len],
            }),
        }
    }

    /// Current width in pixels.
    #[must_use]
    pub fn width(&self) -> u16 {
        self.inner.read().expect("framebuffer lock poisoned").width
    }

    /// Current height in pixels.
    #[must_use]
    pub fn height(&self) -> u16 {
        self.inner.read().expect("framebuffer lock poisoned").height
    }

    /// The full-screen rectangle at the buffer's current dimensions.
    #[must_use]
    pub fn bounds(&self) -> Rect {
        let inner = self.inner.read().expect("framebuffer lock poisoned");
        Rect::new(0, 0, inner.width, inner.height)
    }

    /// Copies out the RGBA32 pixels of `rect`, row by row.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::InvalidOperation`] if `rect` extends past the
    /// current framebuffer bounds.
    pub fn get_rect(&self, rect: Rect) -> Result<Vec<u8>> {
        let inner = self.inner.read().expect("framebuffer lock poisoned");
        let right = rect.x as u32 + rect.w as u32;
        let bottom = rect.y as u32 + rect.h as u32;
        if right > inner.width as u32 || bottom > inner.height as u32 {
            return Err(VncError::InvalidOperation(format!(
                "rect ({},{} {}x{}) exceeds framebuffer bounds {}x{}",
                rect.x, rect.y, rect.w, rect.h, inner.width, inner.height
            )));
        }
        let stride = inner.stride();
        let row_bytes = rect.w as usize * BYTES_PER_PIXEL;
        let mut out = Vec::with_capacity(rect.h as usize * row_bytes);
        for row in 0..rect.h as usize {
            let offset = (rect.y as usize + row) * stride + rect.x as usize * BYTES_PER_PIXEL;
            out.extend_from_slice(&inner.pixels[offset..offset + row_bytes]);
        }
        Ok(out)
    }

    /// Writes RGBA32 `data` (tightly packed rows) into `rect`.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::InvalidOperation`] if `rect` extends past the
    /// current framebuffer bounds or `data` is the wrong length.
    pub fn write_rect(&self, rect: Rect, data: &[u8]) -> Result<()> {
        let mut inner = self.inner.write().expect("framebuffer lock poisoned");
        let right = rect.x as u32 + rect.w as u32;
        let bottom = rect.y as u32 + rect.h as u32;
        if right > inner.width as u32 || bottom > inner.height as u32 {
            return Err(VncError::InvalidOperation(format!(
                "rect ({},{} {}x{}) exceeds framebuffer bounds {}x{}",
                rect.x, rect.y, rect.w, rect.h, inner.width, inner.height
            )));
        }
        let row_bytes = rect.w as usize * BYTES_PER_PIXEL;
        if data.len() != row_bytes * rect.h as usize {
            return Err(VncError::InvalidOperation(format!(
                "expected {} bytes of pixel data, got {}",
                row_bytes * rect.h as usize,
                data.len()
            )));
        }
        let stride = inner.stride();
        for row in 0..rect.h as usize {
            let offset = (rect.y as usize + row) * stride + rect.x as usize * BYTES_PER_PIXEL;
            inner.pixels[offset..offset + row_bytes]
                .copy_from_slice(&data[row * row_bytes..(row + 1) * row_bytes]);
        }
        Ok(())
    }

    /// Physically moves the pixels of `rect` by `(dx, dy)` within the
    /// buffer, used to realize a server-initiated `CopyRect` once the
    /// scheduler has decided to send one. The destination must also lie
    /// within bounds.
    ///
    /// # Errors
    ///
    /// Returns [`VncError::InvalidOperation`] if either the source or
    /// destination rectangle falls outside the framebuffer.
    pub fn copy_within(&self, rect: Rect, dx: i32, dy: i32) -> Result<()> {
        let dest = rect.offset(dx, dy);
        let data = self.get_rect(rect)?;
        self.write_rect(dest, &data)
    }

    /// Replaces the framebuffer with a new buffer of `(width, height)`,
    /// discarding prior pixel contents (used on a host-driven resize).
    pub fn resize(&self, width: u16, height: u16) {
        let mut inner = self.inner.write().expect("framebuffer lock poisoned");
        inner.width = width;
        inner.height = height;
        inner.pixels = vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL];
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_framebuffer_is_black() {
        let fb = Framebuffer::new(4, 4);
        let data = fb.get_rect(Rect::new(0, 0, 4, 4)).unwrap();
        assert!(data.iter().all(|&b| b == 0));
    }

    #[test]
    fn write_then_read_round_trips() {
        let fb = Framebuffer::new(4, 4);
        let px = vec![0xAB; 2 * 2 * BYTES_PER_PIXEL];
        fb.write_rect(Rect::new(1, 1, 2, 2), &px).unwrap();
        let read_back = fb.get_rect(Rect::new(1, 1, 2, 2)).unwrap();
        assert_eq!(read_back, px);
    }

    #[test]
    fn out_of_bounds_rect_errors() {
        let fb = Framebuffer::new(4, 4);
        assert!(fb.get_rect(Rect::new(0, 0, 5, 5)).is_err());
    }

    #[test]
    fn copy_within_moves_pixels() {
        let fb = Framebuffer::new(8, 8);
        let px = vec![0x11; 2 * 2 * BYTES_PER_PIXEL];
        fb.write_rect(Rect::new(0, 0, 2, 2), &px).unwrap();
        fb.copy_within(Rect::new(0, 0, 2, 2), 4, 4).unwrap();
        let moved = fb.get_rect(Rect::new(4, 4, 2, 2)).unwrap();
        assert_eq!(moved, px);
    }

    #[test]
    fn resize_clears_contents() {
        let fb = Framebuffer::new(4, 4);
        fb.write_rect(Rect::new(0, 0, 4, 4), &vec![0xFF; 4 * 4 * BYTES_PER_PIXEL])
            .unwrap();
        fb.resize(2, 2);
        assert_eq!(fb.width(), 2);
        assert_eq!(fb.height(), 2);
        assert!(fb.get_rect(Rect::new(0, 0, 2, 2)).unwrap().iter().all(|&b| b == 0));
    }
}
