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

//! The update scheduler: turns a client's pending dirty state into a single
//! `FramebufferUpdate` message.
//!
//! Composing an update is a synchronous, single-pass operation over
//! whatever the client's [`crate::client::ClientUpdateState`] currently
//! holds — no internal suspension, no background task. `Screen::update_clients`
//! calls [`compose_update`] once per client per tick.

use crate::client::Client;
use crate::encoding::get_encoder;
use crate::framebuffer::Framebuffer;
use crate::protocol::{
    PixelFormat, Rectangle, ENCODING_COPYRECT, ENCODING_CURSOR, ENCODING_EXT_DESKTOP_SIZE,
    ENCODING_LAST_RECT, ENCODING_NEW_FB_SIZE, ENCODING_RAW, SERVER_MSG_FRAMEBUFFER_UPDATE,
};
use crate::region::{Rect, Region};
use crate::translate;
use bytes::{BufMut, Bytes, BytesMut};
use log::error;

/// The server-side cursor shape and position, mirrored to clients that
/// enabled the Rich Cursor pseudo-encoding.
#[derive(Debug, Clone)]
pub struct CursorShape {
    /// Hotspot X, in cursor-local coordinates.
    pub hotspot_x: u16,
    /// Hotspot Y, in cursor-local coordinates.
    pub hotspot_y: u16,
    /// Cursor bitmap width.
    pub width: u16,
    /// Cursor bitmap height.
    pub height: u16,
    /// RGBA32 pixels of the cursor image, `width * height * 4` bytes.
    pub rgba: Vec<u8>,
    /// 1-bit-per-pixel bitmask, `ceil(width / 8) * height` bytes, MSB first.
    pub bitmask: Vec<u8>,
}

/// Inputs the scheduler needs beyond what's already stored on the client:
/// the framebuffer to read pixels from, and anything screen-wide that might
/// need to be announced this round.
pub struct ScheduleContext<'a> {
    /// The pixel storage to read rectangles from.
    pub framebuffer: &'a Framebuffer,
    /// Cursor shape to announce, if it changed since the last update sent to
    /// this client and the client supports the Rich Cursor pseudo-encoding.
    pub cursor: Option<&'a CursorShape>,
    /// `true` if the framebuffer size changed since this client's last
    /// update and it has not yet been told.
    pub pending_resize: bool,
}

/// Builds a single `FramebufferUpdate` message for `client`, draining its
/// pending modified/copy regions as needed, or returns `None` if there is
/// nothing to send (no pending changes, no pseudo-rect to announce, or the
/// client hasn't issued a `FramebufferUpdateRequest` yet).
///
/// On every path that actually emits a message, `client.update.copy` and
/// `client.update.requested` are both left empty: a request is consumed in
/// full the instant it is served, and a served copy never survives into the
/// next round.
pub fn compose_update(client: &mut Client, ctx: &ScheduleContext<'_>) -> Option<Bytes> {
    if client.update.requested.is_empty() {
        return None;
    }
    let requested_region = client.update.requested.clone();

    let mut pseudo_rects: Vec<(Rect, i32, Vec<u8>)> = Vec::new();
    if ctx.pending_resize && client.ext_desktop_size_enabled {
        let fb_rect = ctx.framebuffer.bounds();
        pseudo_rects.push((fb_rect, ENCODING_NEW_FB_SIZE, Vec::new()));
    }
    if let Some(cursor) = ctx.cursor {
        if client.cursor_encoding_enabled {
            let rect = Rect::new(cursor.hotspot_x, cursor.hotspot_y, cursor.width, cursor.height);
            let mut body = Vec::with_capacity(cursor.rgba.len() + cursor.bitmask.len());
            body.extend_from_slice(&cursor.rgba);
            body.extend_from_slice(&cursor.bitmask);
            pseudo_rects.push((rect, ENCODING_CURSOR, body));
        }
    }

    // A non-incremental request already folded its rectangle into `modified`
    // at request time (see `Client::step_normal`), so the only thing left to
    // decide here is which pending changes fall inside what was asked for.
    let effective_modified = client.update.modified.intersect(&requested_region);

    let copy_plan = client.update.copy.as_ref().and_then(|(region, dx, dy)| {
        let clipped = region.intersect(&requested_region);
        if clipped.is_empty() {
            None
        } else {
            Some((clipped, *dx, *dy))
        }
    });

    if effective_modified.is_empty() && copy_plan.is_none() && pseudo_rects.is_empty() {
        client.update.requested = Region::empty();
        return None;
    }

    let max_rects = client.update.max_rects_per_update;
    let mut wire_rects: Vec<Bytes> = Vec::new();
    let mut truncated = false;

    for (rect, encoding, body) in &pseudo_rects {
        wire_rects.push(encode_pseudo_rect(*rect, *encoding, body));
    }

    // STEP: CopyRect first (libvncserver sends copies before draws).
    if let Some((region, dx, dy)) = &copy_plan {
        for rect in region.iter_copyrect_order(*dx, *dy) {
            if wire_rects.len() >= max_rects {
                truncated = true;
                break;
            }
            let src = rect.offset(-*dx, -*dy);
            if let Err(e) = ctx.framebuffer.copy_within(src, *dx, *dy) {
                error!("copy_within failed: {e}");
                continue;
            }
            wire_rects.push(encode_copy_rect(rect, src));
        }
    }

    // STEP: draw (modified) rectangles, clipped to whatever the copy did not
    // already cover.
    let draw_region = if let Some((region, dx, dy)) = &copy_plan {
        effective_modified.subtract(&region.offset(*dx, *dy))
    } else {
        effective_modified.clone()
    };

    let mut sent_draw = Region::empty();
    if !truncated {
        for rect in draw_region.rects() {
            if wire_rects.len() >= max_rects {
                truncated = true;
                break;
            }
            match encode_draw_rect(client, ctx.framebuffer, *rect) {
                Ok(bytes) => {
                    wire_rects.push(bytes);
                    sent_draw.add_rect(*rect);
                }
                Err(e) => error!("failed to encode rect {rect:?}: {e}"),
            }
        }
    }

    // Remove exactly what was actually sent from the client's pending state.
    if let Some((region, dx, dy)) = copy_plan {
        if let Some((pending, pdx, pdy)) = &mut client.update.copy {
            if *pdx == dx && *pdy == dy {
                *pending = pending.subtract(&region);
                if pending.is_empty() {
                    client.update.copy = None;
                }
            }
        }
    }
    client.update.modified = client.update.modified.subtract(&sent_draw);
    client.update.requested = Region::empty();

    let rect_count = wire_rects.len();
    let mut out = BytesMut::new();
    out.put_u8(SERVER_MSG_FRAMEBUFFER_UPDATE);
    out.put_u8(0); // padding
    if truncated {
        out.put_u16(0xFFFF);
    } else {
        out.put_u16(rect_count as u16);
    }
    for rect in wire_rects {
        out.extend_from_slice(&rect);
    }
    if truncated {
        let last_rect = Rectangle {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            encoding: ENCODING_LAST_RECT,
        };
        let mut header = BytesMut::new();
        last_rect.write_header(&mut header);
        out.extend_from_slice(&header);
    }
    Some(out.freeze())
}

fn encode_pseudo_rect(rect: Rect, encoding: i32, body: &[u8]) -> Bytes {
    let header_rect = Rectangle {
        x: rect.x,
        y: rect.y,
        width: rect.w,
        height: rect.h,
        encoding,
    };
    let mut buf = BytesMut::with_capacity(12 + body.len());
    header_rect.write_header(&mut buf);
    buf.extend_from_slice(body);
    buf.freeze()
}

fn encode_copy_rect(dest: Rect, src: Rect) -> Bytes {
    let header_rect = Rectangle {
        x: dest.x,
        y: dest.y,
        width: dest.w,
        height: dest.h,
        encoding: ENCODING_COPYRECT,
    };
    let mut buf = BytesMut::with_capacity(16);
    header_rect.write_header(&mut buf);
    buf.put_u16(src.x);
    buf.put_u16(src.y);
    buf.freeze()
}

/// Encodes one rectangle as Raw. Bit-packing for any other wire encoding a
/// client may have advertised is out of scope: every rectangle this
/// scheduler emits (besides CopyRect) is Raw regardless of the client's
/// preference order.
fn encode_draw_rect(client: &Client, framebuffer: &Framebuffer, rect: Rect) -> crate::error::Result<Bytes> {
    let pixels = framebuffer.get_rect(rect)?;
    let translated = if client.update.pixel_format.is_compatible_with_rgba32() {
        pixels
    } else {
        translate::translate_pixels(&pixels, &PixelFormat::rgba32(), &client.update.pixel_format).to_vec()
    };

    let encoder = get_encoder(ENCODING_RAW).expect("raw encoder always available");
    let body = encoder.encode(&translated, rect.w, rect.h, 0, 0).to_vec();

    let header_rect = Rectangle {
        x: rect.x,
        y: rect.y,
        width: rect.w,
        height: rect.h,
        encoding: ENCODING_RAW,
    };
    let mut buf = BytesMut::with_capacity(12 + body.len());
    header_rect.write_header(&mut buf);
    buf.extend_from_slice(&body);
    Ok(buf.freeze())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::VncAuth;
    use crate::extension::ExtensionRegistry;
    use crate::protocol::ENCODING_RAW;

    fn ready_client(id: usize, w: u16, h: u16) -> Client {
        let ext: ExtensionRegistry = Vec::new();
        let (mut client, _) = Client::new(id, VncAuth::default(), "t".into(), w, h);
        client.ingest(crate::protocol::PROTOCOL_VERSION.as_bytes(), &ext).unwrap();
        client.ingest(&[crate::protocol::SECURITY_TYPE_NONE], &ext).unwrap();
        client.ingest(&[1], &ext).unwrap();
        client.finish_handshake();
        client.update.encodings = vec![ENCODING_RAW];
        client
    }

    #[test]
    fn no_request_means_no_update() {
        let fb = Framebuffer::new(16, 16);
        let mut client = ready_client(1, 16, 16);
        client.update.mark_modified(Rect::new(0, 0, 16, 16));
        let ctx = ScheduleContext {
            framebuffer: &fb,
            cursor: None,
            pending_resize: false,
        };
        assert!(compose_update(&mut client, &ctx).is_none());
    }

    #[test]
    fn modified_rect_is_sent_and_cleared() {
        let fb = Framebuffer::new(16, 16);
        let mut client = ready_client(2, 16, 16);
        client.update.requested = Region::new(Rect::new(0, 0, 16, 16));
        client.update.mark_modified(Rect::new(0, 0, 16, 16));
        let ctx = ScheduleContext {
            framebuffer: &fb,
            cursor: None,
            pending_resize: false,
        };
        let update = compose_update(&mut client, &ctx);
        assert!(update.is_some());
        assert!(client.update.modified.is_empty());
        assert!(client.update.requested.is_empty());
    }

    #[test]
    fn copy_rect_emitted_before_draw() {
        let fb = Framebuffer::new(32, 32);
        let mut client = ready_client(3, 32, 32);
        client.update.requested = Region::new(Rect::new(0, 0, 32, 32));
        client.update.schedule_copy(Rect::new(0, 0, 8, 8), 16, 0);
        let ctx = ScheduleContext {
            framebuffer: &fb,
            cursor: None,
            pending_resize: false,
        };
        let update = compose_update(&mut client, &ctx).unwrap();
        // Second byte pair of the message body is the rect count; at least one
        // rect must have been emitted for the scheduled copy.
        assert!(update.len() > 4);
        assert!(client.update.copy.is_none());
        assert!(client.update.requested.is_empty());
    }

    #[test]
    fn requested_and_copy_are_reset_after_emit() {
        let fb = Framebuffer::new(16, 16);
        let mut client = ready_client(4, 16, 16);
        client.update.requested = Region::new(Rect::new(0, 0, 16, 16));
        client.update.mark_modified(Rect::new(0, 0, 16, 16));
        let ctx = ScheduleContext {
            framebuffer: &fb,
            cursor: None,
            pending_resize: false,
        };
        compose_update(&mut client, &ctx);
        assert!(client.update.copy.is_none());
        assert!(client.update.requested.is_empty());
    }
}
