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

//! Per-client protocol state machine.
//!
//! A `Client` owns nothing but its own parsing state, region bookkeeping, and
//! per-client encoder state. It never touches a socket: `Screen` feeds it
//! bytes via [`Client::ingest`] and drains its [`OutboundMsg`] results,
//! which is what actually gets written to the peer. This keeps the state
//! machine trivially testable without a real connection.

use crate::assembler::Assembler;
use crate::auth::VncAuth;
use crate::error::{Result, VncError};
use crate::events::{
    ClipboardEvent, ExtDesktopScreen, FileTransferEvent, KeyEvent, PointerEvent,
    SetDesktopSizeEvent, SetScaleEvent, SetServerInputEvent, SetSwEvent, TextChatEvent, XvpEvent,
};
use crate::extension::ExtensionRegistry;
use crate::protocol::{
    PixelFormat, CLIENT_MSG_CLIENT_CUT_TEXT, CLIENT_MSG_FILE_TRANSFER,
    CLIENT_MSG_FRAMEBUFFER_UPDATE_REQUEST, CLIENT_MSG_KEY_EVENT,
    CLIENT_MSG_PALM_VNC_SET_SCALE_FACTOR, CLIENT_MSG_POINTER_EVENT, CLIENT_MSG_SET_DESKTOP_SIZE,
    CLIENT_MSG_SET_ENCODINGS, CLIENT_MSG_SET_PIXEL_FORMAT, CLIENT_MSG_SET_SCALE,
    CLIENT_MSG_SET_SERVER_INPUT, CLIENT_MSG_SET_SW, CLIENT_MSG_TEXT_CHAT, CLIENT_MSG_XVP,
    ENCODING_COMPRESS_LEVEL_0, ENCODING_COMPRESS_LEVEL_9, ENCODING_CONTINUOUS_UPDATES,
    ENCODING_CORRE, ENCODING_COPYRECT, ENCODING_CURSOR, ENCODING_CURSOR_WITH_ALPHA,
    ENCODING_DESKTOP_SIZE, ENCODING_EXT_DESKTOP_SIZE, ENCODING_FINE_QUALITY_LEVEL_0,
    ENCODING_FINE_QUALITY_LEVEL_100, ENCODING_H264, ENCODING_HEXTILE, ENCODING_LAST_RECT,
    ENCODING_NEW_FB_SIZE, ENCODING_POINTER_POS, ENCODING_QUALITY_LEVEL_0, ENCODING_QUALITY_LEVEL_9,
    ENCODING_RAW, ENCODING_RRE, ENCODING_SUBSAMP_GRAY, ENCODING_SUBSAMP_NONE, ENCODING_TIGHT,
    ENCODING_TIGHTPNG, ENCODING_TRLE, ENCODING_XVP, ENCODING_ZLIB, ENCODING_ZLIBHEX,
    ENCODING_ZRLE, ENCODING_ZYWRLE, PROTOCOL_VERSION, SECURITY_RESULT_FAILED, SECURITY_RESULT_OK,
    SECURITY_TYPE_NONE, SECURITY_TYPE_VNC_AUTH, ServerInit, TEXT_CHAT_CLOSE, TEXT_CHAT_FINISHED,
    TEXT_CHAT_OPEN,
};
use crate::region::{Rect, Region};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use log::{info, warn};
use std::time::Duration;

/// Maximum accepted `ClientCutText` payload, a guard against a malicious or
/// buggy peer exhausting memory with an oversized clipboard message.
pub const MAX_CUT_TEXT_LEN: u32 = 10 * 1024 * 1024;

/// Default deferral window before a batched update is sent.
pub const DEFAULT_DEFER_UPDATE: Duration = Duration::from_millis(5);

/// Default ceiling on rectangles in a single `FramebufferUpdate`.
pub const DEFAULT_MAX_RECTS_PER_UPDATE: usize = 50;

/// Discrete phases of the RFB handshake and steady-state operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Waiting for the client's 12-byte protocol version string.
    ProtocolVersion,
    /// Waiting for the client's chosen security type byte.
    SecurityType,
    /// Waiting for the client's 16-byte DES challenge response.
    Authentication,
    /// Waiting for the 1-byte `ClientInit` (shared-flag) message.
    Initialisation,
    /// The shared flag has just been read and the client is paused here
    /// until [`Client::finish_handshake`] is called. This is the host's (or
    /// an [`crate::extension::Extension`]'s) one chance to enforce the
    /// screen's sharing policy — refuse this client or disconnect prior
    /// ones — before `ServerInit` is sent and the client enters
    /// [`ClientState::Normal`].
    InitialisationShared,
    /// Handshake complete; processing ordinary client-to-server messages.
    Normal,
}

/// Something a [`Client`] needs the host to act on as a result of
/// `ingest`ing bytes: either raw wire bytes to send back to this same
/// client, or an input/lifecycle event to hand to the application.
#[derive(Debug)]
pub enum OutboundMsg {
    /// Bytes that must be written to this client's transport, in order.
    Send(Bytes),
    /// A pointer event parsed from the wire.
    Pointer(PointerEvent),
    /// A key event parsed from the wire.
    Key(KeyEvent),
    /// A clipboard update parsed from the wire.
    Clipboard(ClipboardEvent),
    /// The client finished the handshake and is now in normal operation.
    Ready,
    /// A requested scale-factor change (`SetScale`/`PalmVNCSetScaleFactor`).
    SetScale(SetScaleEvent),
    /// A `FileTransfer` message, framing only.
    FileTransfer(FileTransferEvent),
    /// A `TextChat` message.
    TextChat(TextChatEvent),
    /// An `xvp` power/session-control request.
    Xvp(XvpEvent),
    /// A `SetServerInput` request.
    SetServerInput(SetServerInputEvent),
    /// A `SetSW` request.
    SetSw(SetSwEvent),
    /// A `SetDesktopSize` request.
    SetDesktopSize(SetDesktopSizeEvent),
}

/// Per-client dirty-region and CopyRect bookkeeping.
///
/// Invariants maintained by [`ClientUpdateState::mark_modified`] and
/// [`ClientUpdateState::schedule_copy`]:
/// - I1: `modified ∩ copy.region == ∅` at all times.
/// - I2: at most one `(dx, dy)` offset is outstanding; a second offset
///   collapses the first copy into `modified` before starting a new one.
/// - I3: any newly modified pixels that the pending copy would still read
///   as its source invalidate the corresponding slice of the copy's
///   destination, which moves into `modified` instead.
#[derive(Debug)]
pub struct ClientUpdateState {
    /// Pixel format the client wants updates translated into.
    pub pixel_format: PixelFormat,
    /// Encodings advertised by the client, in its preference order.
    pub encodings: Vec<i32>,
    /// Union of rectangles known to have changed since they were last sent.
    pub modified: Region,
    /// Pending CopyRect destination region plus its single `(dx, dy)`
    /// offset; the source for any rectangle in this region is that
    /// rectangle offset by `(-dx, -dy)`.
    pub copy: Option<(Region, i32, i32)>,
    /// Union of every rectangle requested via `FramebufferUpdateRequest`
    /// since the last composed update; cleared once an update is emitted.
    pub requested: Region,
    /// `true` once the client has asked for `EnableContinuousUpdates`.
    pub continuous_updates: bool,
    /// Deferral window collapsing bursts of small changes into one update.
    pub defer_update_time: Duration,
    /// Ceiling on rectangles per `FramebufferUpdate` before falling back to
    /// a `LastRect`-terminated, unbounded-count response.
    pub max_rects_per_update: usize,
    /// JPEG/Tight quality level (0-100), derived from the client's
    /// advertised quality pseudo-encoding.
    pub jpeg_quality: u8,
    /// Compression level (0-9) for Zlib-family encodings.
    pub compression_level: u8,
}

impl ClientUpdateState {
    fn new() -> Self {
        Self {
            pixel_format: PixelFormat::rgba32(),
            encodings: Vec::new(),
            modified: Region::empty(),
            copy: None,
            requested: Region::empty(),
            continuous_updates: false,
            defer_update_time: DEFAULT_DEFER_UPDATE,
            max_rects_per_update: DEFAULT_MAX_RECTS_PER_UPDATE,
            jpeg_quality: 6,
            compression_level: 6,
        }
    }

    /// Records newly changed pixels, re-establishing I1/I3 against any
    /// outstanding copy.
    pub fn mark_modified(&mut self, rect: Rect) {
        if rect.is_empty() {
            return;
        }
        let incoming = Region::new(rect);
        let mut stale_dest = Region::empty();
        if let Some((copy_region, dx, dy)) = &mut self.copy {
            // Pixels about to change that sit at the copy's destination
            // must not be overwritten with stale copied content; the
            // modified send wins instead (I1).
            let overlap_dest = copy_region.intersect(&incoming);
            if !overlap_dest.is_empty() {
                *copy_region = copy_region.subtract(&overlap_dest);
            }
            // Pixels about to change that the copy would still read as its
            // source make the copy's destination stale once projected
            // forward by (dx, dy); move that destination into modified
            // instead of copying it (I3).
            let copy_source = copy_region.offset(-*dx, -*dy);
            let stale_source = copy_source.intersect(&incoming);
            if !stale_source.is_empty() {
                stale_dest = stale_source.offset(*dx, *dy);
                *copy_region = copy_region.subtract(&stale_dest);
            }
            if copy_region.is_empty() {
                self.copy = None;
            }
        }
        self.modified.union_with(&incoming);
        if !stale_dest.is_empty() {
            self.modified.union_with(&stale_dest);
        }
    }

    /// Schedules a server-initiated CopyRect of `rect` by `(dx, dy)`.
    pub fn schedule_copy(&mut self, rect: Rect, dx: i32, dy: i32) {
        if rect.is_empty() || (dx == 0 && dy == 0) {
            self.mark_modified(rect);
            return;
        }
        let mut region = Region::new(rect);
        // I1: never schedule a copy whose source is already known stale.
        region = region.subtract(&self.modified);
        if region.is_empty() {
            return;
        }
        match &mut self.copy {
            Some((existing, edx, edy)) if *edx == dx && *edy == dy => {
                existing.union_with(&region);
            }
            Some((existing, _, _)) => {
                // I2: only one (dx, dy) pair may be outstanding. Collapse the
                // previous copy into modified rather than track two offsets;
                // a deliberate inefficiency in the rare multi-directional-
                // scroll case.
                let flushed = existing.clone();
                self.modified.union_with(&flushed);
                self.copy = Some((region, dx, dy));
            }
            None => {
                self.copy = Some((region, dx, dy));
            }
        }
    }

    /// `true` if there is anything at all to send (modified pixels or a
    /// pending copy).
    #[must_use]
    pub fn has_pending_update(&self) -> bool {
        !self.modified.is_empty() || self.copy.is_some()
    }
}

/// The RFB protocol state machine and per-client bookkeeping for one
/// connection. Transport-agnostic: owns no socket, spawns no task.
pub struct Client {
    id: usize,
    state: ClientState,
    assembler: Assembler,
    auth: VncAuth,
    challenge: Option<[u8; crate::auth::CHALLENGE_LEN]>,
    desktop_name: String,
    server_format: PixelFormat,
    width: u16,
    height: u16,
    /// `true` once another non-shared client should be dropped on connect;
    /// set from the `ClientInit` shared flag, consulted by
    /// [`crate::screen::Screen`] via [`Client::wants_exclusive_access`]
    /// during [`ClientState::InitialisationShared`].
    shared: bool,
    pub(crate) update: ClientUpdateState,
    pub(crate) view_only: bool,
    pub(crate) cursor_encoding_enabled: bool,
    pub(crate) ext_desktop_size_enabled: bool,
}

impl Client {
    /// Creates a new client in the initial handshake state and returns the
    /// bytes the host must write first (the RFB protocol version string).
    #[must_use]
    pub fn new(
        id: usize,
        auth: VncAuth,
        desktop_name: String,
        width: u16,
        height: u16,
    ) -> (Self, Bytes) {
        let client = Self {
            id,
            state: ClientState::ProtocolVersion,
            assembler: Assembler::new(),
            auth,
            challenge: None,
            desktop_name,
            server_format: PixelFormat::rgba32(),
            width,
            height,
            shared: true,
            update: ClientUpdateState::new(),
            view_only: false,
            cursor_encoding_enabled: false,
            ext_desktop_size_enabled: false,
        };
        (client, Bytes::from_static(PROTOCOL_VERSION.as_bytes()))
    }

    /// Stable identifier assigned by the host at registration time.
    #[must_use]
    pub fn id(&self) -> usize {
        self.id
    }

    /// Current handshake/operation phase.
    #[must_use]
    pub fn state(&self) -> ClientState {
        self.state
    }

    /// `true` once the client has completed the handshake.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.state == ClientState::Normal
    }

    /// `true` if the just-read `ClientInit` requested exclusive access
    /// (shared flag == 0), meaningful only immediately after a transition
    /// into [`ClientState::InitialisationShared`].
    #[must_use]
    pub fn wants_exclusive_access(&self) -> bool {
        !self.shared
    }

    /// `true` if this client authenticated with a view-only credential and
    /// its input events should be accepted on the wire but discarded by the
    /// host rather than applied.
    #[must_use]
    pub fn is_view_only(&self) -> bool {
        self.view_only
    }

    /// Updates the dimensions this client clips `FramebufferUpdateRequest`
    /// rectangles to and would report in a future resize notification.
    pub fn resize(&mut self, width: u16, height: u16) {
        self.width = width;
        self.height = height;
    }

    /// Completes the handshake from [`ClientState::InitialisationShared`],
    /// producing `ServerInit` and entering [`ClientState::Normal`].
    ///
    /// Does nothing if called from any other state.
    pub fn finish_handshake(&mut self) -> Vec<OutboundMsg> {
        if self.state != ClientState::InitialisationShared {
            return Vec::new();
        }
        let server_init = ServerInit {
            framebuffer_width: self.width,
            framebuffer_height: self.height,
            pixel_format: self.server_format.clone(),
            name: self.desktop_name.clone(),
        };
        let mut buf = BytesMut::new();
        server_init.write_to(&mut buf);
        self.state = ClientState::Normal;
        vec![OutboundMsg::Send(buf.freeze()), OutboundMsg::Ready]
    }

    /// Feeds newly received bytes into the client's assembler and runs the
    /// state machine as far forward as the buffered data allows, returning
    /// everything the host must now do in order.
    ///
    /// Pauses at [`ClientState::InitialisationShared`] without producing
    /// `ServerInit`/`Ready` itself; the host must call
    /// [`Client::finish_handshake`] once it has applied the screen's
    /// sharing policy.
    ///
    /// # Errors
    ///
    /// Returns an error on a malformed message, an oversized cut-text
    /// payload, or a failed authentication; the host should close the
    /// connection in all of these cases.
    pub fn ingest(&mut self, chunk: &[u8], extensions: &ExtensionRegistry) -> Result<Vec<OutboundMsg>> {
        self.assembler.ingest(chunk);
        let mut out = Vec::new();
        loop {
            let progressed = self.step(&mut out, extensions)?;
            if !progressed {
                break;
            }
        }
        Ok(out)
    }

    /// Attempts one state transition. Returns `Ok(false)` when not enough
    /// bytes are buffered to make progress, so `ingest` knows to stop.
    fn step(&mut self, out: &mut Vec<OutboundMsg>, extensions: &ExtensionRegistry) -> Result<bool> {
        match self.state {
            ClientState::ProtocolVersion => {
                let Some(version) = self.assembler.take(12) else {
                    return Ok(false);
                };
                info!(
                    "client {}: protocol version {}",
                    self.id,
                    String::from_utf8_lossy(&version)
                );
                let mut reply = BytesMut::with_capacity(2);
                if self.auth.is_configured() {
                    reply.put_u8(1);
                    reply.put_u8(SECURITY_TYPE_VNC_AUTH);
                } else {
                    reply.put_u8(1);
                    reply.put_u8(SECURITY_TYPE_NONE);
                }
                out.push(OutboundMsg::Send(reply.freeze()));
                self.state = ClientState::SecurityType;
                Ok(true)
            }
            ClientState::SecurityType => {
                let Some(choice) = self.assembler.take(1) else {
                    return Ok(false);
                };
                match choice[0] {
                    SECURITY_TYPE_VNC_AUTH => {
                        let challenge = self.auth.generate_challenge();
                        self.challenge = Some(challenge);
                        out.push(OutboundMsg::Send(Bytes::copy_from_slice(&challenge)));
                        self.state = ClientState::Authentication;
                    }
                    SECURITY_TYPE_NONE => {
                        out.push(OutboundMsg::Send(security_result(SECURITY_RESULT_OK)));
                        self.state = ClientState::Initialisation;
                    }
                    other => {
                        return Err(VncError::Protocol(format!(
                            "unsupported security type {other}"
                        )));
                    }
                }
                Ok(true)
            }
            ClientState::Authentication => {
                let Some(response) = self.assembler.take(16) else {
                    return Ok(false);
                };
                let challenge = self
                    .challenge
                    .take()
                    .expect("Authentication state always has a pending challenge");
                match self.auth.verify_response(&response, &challenge) {
                    Some(outcome) => {
                        self.view_only = outcome.view_only;
                        out.push(OutboundMsg::Send(security_result(SECURITY_RESULT_OK)));
                        self.state = ClientState::Initialisation;
                        Ok(true)
                    }
                    None => {
                        out.push(OutboundMsg::Send(security_result(SECURITY_RESULT_FAILED)));
                        Err(VncError::AuthenticationFailed)
                    }
                }
            }
            ClientState::Initialisation => {
                let Some(shared) = self.assembler.take(1) else {
                    return Ok(false);
                };
                self.shared = shared[0] != 0;
                self.state = ClientState::InitialisationShared;
                Ok(true)
            }
            ClientState::InitialisationShared => {
                // The host must call `finish_handshake` once it has applied
                // the sharing policy; the core cannot safely proceed alone.
                Ok(false)
            }
            ClientState::Normal => self.step_normal(out, extensions),
        }
    }

    fn step_normal(&mut self, out: &mut Vec<OutboundMsg>, extensions: &ExtensionRegistry) -> Result<bool> {
        let Some(msg_type) = self.assembler.peek_u8() else {
            return Ok(false);
        };
        match msg_type {
            CLIENT_MSG_SET_PIXEL_FORMAT => {
                let Some(body) = self.assembler.take(20) else {
                    return Ok(false);
                };
                let mut rest = BytesMut::from(&body[4..]);
                self.update.pixel_format = PixelFormat::from_bytes(&mut rest)
                    .map_err(|e| VncError::Protocol(e.to_string()))?;
                if !self.update.pixel_format.is_valid() {
                    return Err(VncError::InvalidPixelFormat);
                }
                Ok(true)
            }
            CLIENT_MSG_SET_ENCODINGS => {
                let Some(header) = self.assembler.peek(4) else {
                    return Ok(false);
                };
                let count = u16::from_be_bytes([header[2], header[3]]) as usize;
                let total = 4 + count * 4;
                let Some(body) = self.assembler.take(total) else {
                    return Ok(false);
                };
                let mut buf = BytesMut::from(&body[4..]);
                let mut encodings = Vec::with_capacity(count);
                for _ in 0..count {
                    encodings.push(buf.get_i32());
                }
                self.apply_encodings(encodings, extensions);
                Ok(true)
            }
            CLIENT_MSG_FRAMEBUFFER_UPDATE_REQUEST => {
                let Some(body) = self.assembler.take(10) else {
                    return Ok(false);
                };
                let incremental = body[1] != 0;
                let x = u16::from_be_bytes([body[2], body[3]]);
                let y = u16::from_be_bytes([body[4], body[5]]);
                let w = u16::from_be_bytes([body[6], body[7]]);
                let h = u16::from_be_bytes([body[8], body[9]]);
                let screen_rect = Rect::new(0, 0, self.width, self.height);
                if let Some(rect) = Rect::new(x, y, w, h).intersect(&screen_rect) {
                    self.update.requested.union_with(&Region::new(rect));
                    if !incremental {
                        // Added to modified and subtracted from copy: a
                        // full request guarantees fresh pixels rather than
                        // a stale CopyRect for this area.
                        self.update.mark_modified(rect);
                    }
                }
                Ok(true)
            }
            CLIENT_MSG_KEY_EVENT => {
                let Some(body) = self.assembler.take(8) else {
                    return Ok(false);
                };
                let pressed = body[1] != 0;
                let key = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
                if !self.view_only {
                    out.push(OutboundMsg::Key(KeyEvent {
                        client_id: self.id,
                        key,
                        pressed,
                    }));
                }
                Ok(true)
            }
            CLIENT_MSG_POINTER_EVENT => {
                let Some(body) = self.assembler.take(6) else {
                    return Ok(false);
                };
                let button_mask = body[1];
                let x = u16::from_be_bytes([body[2], body[3]]);
                let y = u16::from_be_bytes([body[4], body[5]]);
                if !self.view_only {
                    out.push(OutboundMsg::Pointer(PointerEvent {
                        client_id: self.id,
                        x,
                        y,
                        button_mask,
                    }));
                }
                Ok(true)
            }
            CLIENT_MSG_CLIENT_CUT_TEXT => {
                let Some(header) = self.assembler.peek(8) else {
                    return Ok(false);
                };
                let len = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
                if len > MAX_CUT_TEXT_LEN {
                    return Err(VncError::ResourceLimit(format!(
                        "ClientCutText length {len} exceeds limit {MAX_CUT_TEXT_LEN}"
                    )));
                }
                let total = 8 + len as usize;
                let Some(body) = self.assembler.take(total) else {
                    return Ok(false);
                };
                let text = String::from_utf8_lossy(&body[8..]).into_owned();
                out.push(OutboundMsg::Clipboard(ClipboardEvent {
                    client_id: self.id,
                    text,
                }));
                Ok(true)
            }
            CLIENT_MSG_FILE_TRANSFER => {
                let Some(header) = self.assembler.peek(12) else {
                    return Ok(false);
                };
                let length = u32::from_be_bytes([header[8], header[9], header[10], header[11]]);
                let total = 12 + length as usize;
                let Some(body) = self.assembler.take(total) else {
                    return Ok(false);
                };
                out.push(OutboundMsg::FileTransfer(FileTransferEvent {
                    client_id: self.id,
                    content_type: body[1],
                    content_param: body[2],
                    size: u32::from_be_bytes([body[4], body[5], body[6], body[7]]),
                    data: body[12..].to_vec(),
                }));
                Ok(true)
            }
            CLIENT_MSG_SET_SCALE | CLIENT_MSG_PALM_VNC_SET_SCALE_FACTOR => {
                let Some(body) = self.assembler.take(4) else {
                    return Ok(false);
                };
                let scale = body[1];
                if scale == 0 {
                    return Err(VncError::Protocol(
                        "scale factor of zero is not accepted".to_string(),
                    ));
                }
                out.push(OutboundMsg::SetScale(SetScaleEvent {
                    client_id: self.id,
                    scale,
                }));
                Ok(true)
            }
            CLIENT_MSG_SET_SERVER_INPUT => {
                let Some(body) = self.assembler.take(4) else {
                    return Ok(false);
                };
                out.push(OutboundMsg::SetServerInput(SetServerInputEvent {
                    client_id: self.id,
                    status: body[1],
                }));
                Ok(true)
            }
            CLIENT_MSG_SET_SW => {
                let Some(body) = self.assembler.take(6) else {
                    return Ok(false);
                };
                out.push(OutboundMsg::SetSw(SetSwEvent {
                    client_id: self.id,
                    status: body[1],
                    x: u16::from_be_bytes([body[2], body[3]]),
                    y: u16::from_be_bytes([body[4], body[5]]),
                }));
                Ok(true)
            }
            CLIENT_MSG_TEXT_CHAT => {
                let Some(header) = self.assembler.peek(8) else {
                    return Ok(false);
                };
                let length = u32::from_be_bytes([header[4], header[5], header[6], header[7]]);
                let has_text = !matches!(length, TEXT_CHAT_OPEN | TEXT_CHAT_CLOSE | TEXT_CHAT_FINISHED);
                let total = 8 + if has_text { length as usize } else { 0 };
                let Some(body) = self.assembler.take(total) else {
                    return Ok(false);
                };
                let text = has_text.then(|| String::from_utf8_lossy(&body[8..]).into_owned());
                out.push(OutboundMsg::TextChat(TextChatEvent {
                    client_id: self.id,
                    text,
                }));
                Ok(true)
            }
            CLIENT_MSG_XVP => {
                let Some(body) = self.assembler.take(4) else {
                    return Ok(false);
                };
                out.push(OutboundMsg::Xvp(XvpEvent {
                    client_id: self.id,
                    version: body[2],
                    code: body[3],
                }));
                Ok(true)
            }
            CLIENT_MSG_SET_DESKTOP_SIZE => {
                let Some(header) = self.assembler.peek(8) else {
                    return Ok(false);
                };
                let width = u16::from_be_bytes([header[2], header[3]]);
                let height = u16::from_be_bytes([header[4], header[5]]);
                let num_screens = header[6] as usize;
                let total = 8 + num_screens * 16;
                let Some(body) = self.assembler.take(total) else {
                    return Ok(false);
                };
                let mut screens = Vec::with_capacity(num_screens);
                for i in 0..num_screens {
                    let s = &body[8 + i * 16..8 + (i + 1) * 16];
                    screens.push(ExtDesktopScreen {
                        id: u32::from_be_bytes([s[0], s[1], s[2], s[3]]),
                        x: u16::from_be_bytes([s[4], s[5]]),
                        y: u16::from_be_bytes([s[6], s[7]]),
                        width: u16::from_be_bytes([s[8], s[9]]),
                        height: u16::from_be_bytes([s[10], s[11]]),
                        flags: u32::from_be_bytes([s[12], s[13], s[14], s[15]]),
                    });
                }
                out.push(OutboundMsg::SetDesktopSize(SetDesktopSizeEvent {
                    client_id: self.id,
                    width,
                    height,
                    screens,
                }));
                Ok(true)
            }
            other => {
                let declared_len = extensions
                    .iter()
                    .find_map(|ext| ext.declared_message_length(other));
                let Some(total) = declared_len else {
                    warn!("client {}: unknown message type {}", self.id, other);
                    return Err(VncError::Protocol(format!("unknown message type {other}")));
                };
                let Some(body) = self.assembler.take(total) else {
                    return Ok(false);
                };
                let payload = Bytes::copy_from_slice(&body[1..]);
                for ext in extensions {
                    if ext.declared_message_length(other) == Some(total)
                        && ext.handle_message(self, other, &payload)?
                    {
                        return Ok(true);
                    }
                }
                warn!("client {}: unhandled message type {}", self.id, other);
                Err(VncError::Protocol(format!("unhandled message type {other}")))
            }
        }
    }

    fn apply_encodings(&mut self, encodings: Vec<i32>, extensions: &ExtensionRegistry) {
        self.cursor_encoding_enabled =
            encodings.contains(&ENCODING_CURSOR) || encodings.contains(&ENCODING_CURSOR_WITH_ALPHA);
        self.ext_desktop_size_enabled = encodings.contains(&ENCODING_EXT_DESKTOP_SIZE)
            || encodings.contains(&ENCODING_NEW_FB_SIZE);
        self.update.continuous_updates = encodings.contains(&ENCODING_CONTINUOUS_UPDATES);

        for &e in &encodings {
            if (ENCODING_QUALITY_LEVEL_0..=ENCODING_QUALITY_LEVEL_9).contains(&e) {
                self.update.jpeg_quality = (((e - ENCODING_QUALITY_LEVEL_0) as u32) * 100 / 9) as u8;
            }
            if (ENCODING_COMPRESS_LEVEL_0..=ENCODING_COMPRESS_LEVEL_9).contains(&e) {
                self.update.compression_level = (e - ENCODING_COMPRESS_LEVEL_0) as u8;
            }
            if !is_builtin_encoding(e) {
                // Unknown to the core: offered to every registered
                // extension that claims this pseudo-encoding number.
                for ext in extensions {
                    if ext.pseudo_encodings().contains(&e) {
                        ext.enable_pseudo_encoding(self, e);
                    }
                }
            }
        }
        self.update.encodings = encodings;
    }

    /// Writes clipboard text from the server to the client as a
    /// `ServerCutText` message.
    #[must_use]
    pub fn encode_server_cut_text(text: &str) -> Bytes {
        let mut buf = BytesMut::new();
        buf.put_u8(crate::protocol::SERVER_MSG_SERVER_CUT_TEXT);
        buf.put_bytes(0, 3);
        buf.put_u32(text.len() as u32);
        buf.put_slice(text.as_bytes());
        buf.freeze()
    }
}

/// `true` if `e` is a wire/pseudo-encoding number this crate's own dispatch
/// already accounts for (whether or not it actually implements bit-packing
/// for it), so it should never be offered to a registered [`crate::extension::Extension`].
fn is_builtin_encoding(e: i32) -> bool {
    const KNOWN: &[i32] = &[
        ENCODING_RAW,
        ENCODING_COPYRECT,
        ENCODING_RRE,
        ENCODING_CORRE,
        ENCODING_HEXTILE,
        ENCODING_ZLIB,
        ENCODING_TIGHT,
        ENCODING_TIGHTPNG,
        ENCODING_ZLIBHEX,
        ENCODING_TRLE,
        ENCODING_ZRLE,
        ENCODING_ZYWRLE,
        ENCODING_H264,
        ENCODING_CURSOR,
        ENCODING_DESKTOP_SIZE,
        ENCODING_CURSOR_WITH_ALPHA,
        ENCODING_POINTER_POS,
        ENCODING_LAST_RECT,
        ENCODING_NEW_FB_SIZE,
        ENCODING_EXT_DESKTOP_SIZE,
        ENCODING_XVP,
        ENCODING_CONTINUOUS_UPDATES,
        ENCODING_SUBSAMP_NONE,
        ENCODING_SUBSAMP_GRAY,
    ];
    KNOWN.contains(&e)
        || (ENCODING_QUALITY_LEVEL_0..=ENCODING_QUALITY_LEVEL_9).contains(&e)
        || (ENCODING_COMPRESS_LEVEL_0..=ENCODING_COMPRESS_LEVEL_9).contains(&e)
        || (ENCODING_FINE_QUALITY_LEVEL_100..=ENCODING_FINE_QUALITY_LEVEL_0).contains(&e)
}

fn security_result(result: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(4);
    buf.put_u32(result);
    buf.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SECURITY_TYPE_NONE;

    fn no_extensions() -> ExtensionRegistry {
        Vec::new()
    }

    fn handshake_to_normal(client: &mut Client) {
        let ext = no_extensions();
        client.ingest(PROTOCOL_VERSION.as_bytes(), &ext).unwrap();
        client.ingest(&[SECURITY_TYPE_NONE], &ext).unwrap();
        client.ingest(&[1], &ext).unwrap(); // shared = true
        assert_eq!(client.state(), ClientState::InitialisationShared);
        let msgs = client.finish_handshake();
        assert!(matches!(msgs.last(), Some(OutboundMsg::Ready)));
        assert!(client.is_ready());
    }

    #[test]
    fn handshake_with_no_auth_reaches_normal() {
        let (mut client, greeting) = Client::new(1, VncAuth::default(), "test".into(), 800, 600);
        assert_eq!(&greeting[..], PROTOCOL_VERSION.as_bytes());
        handshake_to_normal(&mut client);
    }

    #[test]
    fn unknown_security_type_errors() {
        let (mut client, _) = Client::new(1, VncAuth::default(), "test".into(), 800, 600);
        let ext = no_extensions();
        client.ingest(PROTOCOL_VERSION.as_bytes(), &ext).unwrap();
        assert!(client.ingest(&[99], &ext).is_err());
    }

    #[test]
    fn set_encodings_split_across_chunks_is_buffered() {
        let (mut client, _) = Client::new(2, VncAuth::default(), "test".into(), 800, 600);
        handshake_to_normal(&mut client);
        let ext = no_extensions();
        let mut msg = BytesMut::new();
        msg.put_u8(CLIENT_MSG_SET_ENCODINGS);
        msg.put_u8(0);
        msg.put_u16(2);
        msg.put_i32(crate::protocol::ENCODING_TIGHT);
        msg.put_i32(crate::protocol::ENCODING_RAW);
        let bytes = msg.freeze();
        // Feed byte by byte to exercise re-entrant assembly.
        for b in &bytes {
            client.ingest(&[*b], &ext).unwrap();
        }
        assert_eq!(
            client.update.encodings,
            vec![crate::protocol::ENCODING_TIGHT, crate::protocol::ENCODING_RAW]
        );
    }

    #[test]
    fn oversized_cut_text_is_rejected() {
        let (mut client, _) = Client::new(3, VncAuth::default(), "test".into(), 800, 600);
        handshake_to_normal(&mut client);
        let mut msg = BytesMut::new();
        msg.put_u8(CLIENT_MSG_CLIENT_CUT_TEXT);
        msg.put_bytes(0, 3);
        msg.put_u32(MAX_CUT_TEXT_LEN + 1);
        assert!(client.ingest(&msg, &no_extensions()).is_err());
    }

    #[test]
    fn pointer_event_is_emitted() {
        let (mut client, _) = Client::new(4, VncAuth::default(), "test".into(), 800, 600);
        handshake_to_normal(&mut client);
        let mut msg = BytesMut::new();
        msg.put_u8(CLIENT_MSG_POINTER_EVENT);
        msg.put_u8(1);
        msg.put_u16(10);
        msg.put_u16(20);
        let out = client.ingest(&msg, &no_extensions()).unwrap();
        assert!(matches!(out[0], OutboundMsg::Pointer(PointerEvent { x: 10, y: 20, button_mask: 1, .. })));
    }

    #[test]
    fn view_only_client_suppresses_input_events() {
        let (mut client, _) = Client::new(5, VncAuth::default(), "test".into(), 800, 600);
        handshake_to_normal(&mut client);
        client.view_only = true;
        let mut msg = BytesMut::new();
        msg.put_u8(CLIENT_MSG_KEY_EVENT);
        msg.put_u8(1);
        msg.put_u16(0);
        msg.put_u32(65);
        let out = client.ingest(&msg, &no_extensions()).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn unknown_message_type_closes_connection() {
        let (mut client, _) = Client::new(6, VncAuth::default(), "test".into(), 800, 600);
        handshake_to_normal(&mut client);
        assert!(client.ingest(&[222], &no_extensions()).is_err());
    }

    #[test]
    fn set_scale_zero_is_rejected() {
        let (mut client, _) = Client::new(7, VncAuth::default(), "test".into(), 800, 600);
        handshake_to_normal(&mut client);
        let mut msg = BytesMut::new();
        msg.put_u8(CLIENT_MSG_SET_SCALE);
        msg.put_u8(0);
        msg.put_u16(0);
        assert!(client.ingest(&msg, &no_extensions()).is_err());
    }

    #[test]
    fn set_scale_nonzero_is_forwarded() {
        let (mut client, _) = Client::new(8, VncAuth::default(), "test".into(), 800, 600);
        handshake_to_normal(&mut client);
        let mut msg = BytesMut::new();
        msg.put_u8(CLIENT_MSG_SET_SCALE);
        msg.put_u8(2);
        msg.put_u16(0);
        let out = client.ingest(&msg, &no_extensions()).unwrap();
        assert!(matches!(out[0], OutboundMsg::SetScale(SetScaleEvent { scale: 2, .. })));
    }

    #[test]
    fn framebuffer_update_request_clips_to_screen_bounds() {
        let (mut client, _) = Client::new(9, VncAuth::default(), "test".into(), 64, 64);
        handshake_to_normal(&mut client);
        let mut msg = BytesMut::new();
        msg.put_u8(CLIENT_MSG_FRAMEBUFFER_UPDATE_REQUEST);
        msg.put_u8(1); // incremental
        msg.put_u16(32);
        msg.put_u16(32);
        msg.put_u16(100); // extends past the 64x64 screen
        msg.put_u16(100);
        client.ingest(&msg, &no_extensions()).unwrap();
        let bbox = client.update.requested.bounding_box().unwrap();
        assert_eq!(bbox, Rect::new(32, 32, 32, 32));
    }

    #[test]
    fn framebuffer_update_request_enlarges_requested_region() {
        let (mut client, _) = Client::new(10, VncAuth::default(), "test".into(), 64, 64);
        handshake_to_normal(&mut client);
        let mut first = BytesMut::new();
        first.put_u8(CLIENT_MSG_FRAMEBUFFER_UPDATE_REQUEST);
        first.put_u8(1);
        first.put_u16(0);
        first.put_u16(0);
        first.put_u16(10);
        first.put_u16(10);
        client.ingest(&first, &no_extensions()).unwrap();
        let mut second = BytesMut::new();
        second.put_u8(CLIENT_MSG_FRAMEBUFFER_UPDATE_REQUEST);
        second.put_u8(1);
        second.put_u16(20);
        second.put_u16(20);
        second.put_u16(10);
        second.put_u16(10);
        client.ingest(&second, &no_extensions()).unwrap();
        let area: u32 = client
            .update
            .requested
            .rects()
            .iter()
            .map(|r| r.w as u32 * r.h as u32)
            .sum();
        assert_eq!(area, 200); // both 10x10 rects, not overwritten
    }

    #[test]
    fn non_incremental_request_marks_modified_and_clears_copy() {
        let (mut client, _) = Client::new(11, VncAuth::default(), "test".into(), 64, 64);
        handshake_to_normal(&mut client);
        // Destination (30,0,20,20), source (60,0,20,20) — a non-incremental
        // request covering the destination exactly must fold it into
        // `modified` and drop it from `copy`.
        client.update.schedule_copy(Rect::new(30, 0, 20, 20), -30, 0);
        let mut msg = BytesMut::new();
        msg.put_u8(CLIENT_MSG_FRAMEBUFFER_UPDATE_REQUEST);
        msg.put_u8(0); // non-incremental
        msg.put_u16(30);
        msg.put_u16(0);
        msg.put_u16(20);
        msg.put_u16(20);
        client.ingest(&msg, &no_extensions()).unwrap();
        assert!(client.update.modified.intersect_rect(&Rect::new(30, 0, 20, 20)).bounding_box().is_some());
        assert!(client.update.copy.is_none());
    }

    #[test]
    fn schedule_copy_with_new_offset_flushes_old_copy_to_modified() {
        let mut state = ClientUpdateState::new();
        state.schedule_copy(Rect::new(0, 0, 10, 10), 5, 0);
        assert!(state.copy.is_some());
        state.schedule_copy(Rect::new(20, 20, 10, 10), 0, 5);
        // New offset differs, so the first copy must have collapsed into modified.
        let (region, dx, dy) = state.copy.as_ref().unwrap();
        assert_eq!((*dx, *dy), (0, 5));
        assert_eq!(region.bounding_box(), Some(Rect::new(20, 20, 10, 10)));
        assert!(!state.modified.is_empty());
    }

    #[test]
    fn mark_modified_invalidates_stale_copy_destination() {
        // Copy destination is (50,0,20,20) offset by (30,0), so its source
        // reads from (20,0,20,20) — disjoint from the destination, so this
        // isolates the I3 case (source invalidation) from I1 (destination
        // invalidation).
        let mut state = ClientUpdateState::new();
        state.schedule_copy(Rect::new(50, 0, 20, 20), 30, 0);
        // A pixel change at (25,5,5,5) falls within the copy's source
        // region; projected forward by (30,0) its destination becomes
        // (55,5,5,5), which must move into `modified` and out of `copy`.
        state.mark_modified(Rect::new(25, 5, 5, 5));
        let stale_dest = Rect::new(55, 5, 5, 5);
        let (region, _, _) = state.copy.as_ref().unwrap();
        for r in region.rects() {
            assert!(r.intersect(&stale_dest).is_none());
        }
        assert_eq!(
            state.modified.intersect_rect(&stale_dest).bounding_box(),
            Some(stale_dest)
        );
        assert_eq!(
            state.modified.intersect_rect(&Rect::new(25, 5, 5, 5)).bounding_box(),
            Some(Rect::new(25, 5, 5, 5))
        );
    }
}
