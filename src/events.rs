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

//! Host-facing event types and callback signatures.
//!
//! The core does not own a socket or an event loop, so it cannot hand events
//! to the host through a channel it also drives. Instead [`Screen`](crate::screen::Screen)
//! holds a small set of synchronous callbacks, set once via
//! `Screen::set_*_callback`, and invokes them inline from its dispatch of
//! parsed input messages, one event per host-visible notification, with no
//! channel or task boundary of its own.

use std::net::SocketAddr;

/// A pointer (mouse) event received from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointerEvent {
    /// Client identifier.
    pub client_id: usize,
    /// X coordinate in framebuffer space.
    pub x: u16,
    /// Y coordinate in framebuffer space.
    pub y: u16,
    /// Bitmask of currently pressed buttons (bit 0 = left, bit 1 = middle, bit 2 = right, ...).
    pub button_mask: u8,
}

/// A keyboard event received from a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    /// Client identifier.
    pub client_id: usize,
    /// X11 keysym value.
    pub key: u32,
    /// `true` if the key was pressed, `false` if released.
    pub pressed: bool,
}

/// Clipboard text received from a client via `ClientCutText`.
#[derive(Debug, Clone)]
pub struct ClipboardEvent {
    /// Client identifier.
    pub client_id: usize,
    /// The clipboard text, already UTF-8 decoded (lossily, per RFB's Latin-1
    /// cut-text convention being treated as UTF-8 by this implementation).
    pub text: String,
}

/// Notification that a client finished the RFB handshake and entered normal
/// operation, or disconnected.
#[derive(Debug, Clone, Copy)]
pub enum LifecycleEvent {
    /// A client connected and completed initialization.
    Connected {
        /// Client identifier assigned by the host.
        client_id: usize,
    },
    /// A client's connection was closed, locally or by the peer.
    Disconnected {
        /// Client identifier that is now invalid.
        client_id: usize,
    },
}

/// Everything a host needs to know about a newly accepted connection when
/// registering it with [`crate::screen::Screen::new_client`].
#[derive(Debug, Clone, Copy)]
pub struct ClientOrigin {
    /// Address the connection came from, if the transport is network-based.
    pub peer_addr: Option<SocketAddr>,
}

/// A requested scale-factor change, from `SetScale` or
/// `PalmVNCSetScaleFactor` (identical wire layout). A `scale` of zero is
/// rejected by the core itself and never reaches this event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetScaleEvent {
    /// Client identifier.
    pub client_id: usize,
    /// Requested scale factor.
    pub scale: u8,
}

/// A `FileTransfer` message, forwarded as framing only: the core does not
/// interpret `content_type`/`content_param` or implement transfer
/// semantics, it only parses the header and hands the payload on.
#[derive(Debug, Clone)]
pub struct FileTransferEvent {
    /// Client identifier.
    pub client_id: usize,
    /// Sub-message type, interpretation owned by the host.
    pub content_type: u8,
    /// Sub-message parameter, interpretation owned by the host.
    pub content_param: u8,
    /// The `size` header field (meaning depends on `content_type`).
    pub size: u32,
    /// Trailing payload bytes.
    pub data: Vec<u8>,
}

/// A `TextChat` message. `text` is `None` for the open/close/finished
/// control codes, which carry no text payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChatEvent {
    /// Client identifier.
    pub client_id: usize,
    /// Chat text, or `None` for a control message.
    pub text: Option<String>,
}

/// An `xvp` power/session-control request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XvpEvent {
    /// Client identifier.
    pub client_id: usize,
    /// `xvp` protocol version the client is using.
    pub version: u8,
    /// Requested operation (`rfbXvp_Shutdown`/`rfbXvp_Reboot`/`rfbXvp_Reset`).
    pub code: u8,
}

/// A `SetServerInput` request toggling the server-side input devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetServerInputEvent {
    /// Client identifier.
    pub client_id: usize,
    /// Non-zero disables local input, zero re-enables it.
    pub status: u8,
}

/// A `SetSW` ("single window") request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetSwEvent {
    /// Client identifier.
    pub client_id: usize,
    /// Requested mode.
    pub status: u8,
    /// X coordinate of the window to single out.
    pub x: u16,
    /// Y coordinate of the window to single out.
    pub y: u16,
}

/// One display entry within a `SetDesktopSize` request's screen layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtDesktopScreen {
    /// Screen identifier, opaque to the core.
    pub id: u32,
    /// X offset within the requested desktop.
    pub x: u16,
    /// Y offset within the requested desktop.
    pub y: u16,
    /// Screen width.
    pub width: u16,
    /// Screen height.
    pub height: u16,
    /// Vendor-defined flags.
    pub flags: u32,
}

/// A client-requested resolution change, carrying the requested screen
/// layout verbatim; the host decides whether and how to honor it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDesktopSizeEvent {
    /// Client identifier.
    pub client_id: usize,
    /// Requested framebuffer width.
    pub width: u16,
    /// Requested framebuffer height.
    pub height: u16,
    /// Requested per-display layout.
    pub screens: Vec<ExtDesktopScreen>,
}

/// Callback invoked for every parsed pointer event.
pub type PointerCallback = Box<dyn FnMut(PointerEvent) + Send>;
/// Callback invoked for every parsed keyboard event.
pub type KeyboardCallback = Box<dyn FnMut(KeyEvent) + Send>;
/// Callback invoked for every parsed clipboard update from a client.
pub type ClipboardCallback = Box<dyn FnMut(ClipboardEvent) + Send>;
/// Callback invoked on client connect/disconnect.
pub type LifecycleCallback = Box<dyn FnMut(LifecycleEvent) + Send>;
/// Callback the core uses to hand the host bytes that must be written back
/// to a specific client's transport, in order.
pub type PushCallback = Box<dyn FnMut(usize, &[u8]) + Send>;
/// Callback invoked for a requested scale-factor change.
pub type SetScaleCallback = Box<dyn FnMut(SetScaleEvent) + Send>;
/// Callback invoked for a `FileTransfer` message.
pub type FileTransferCallback = Box<dyn FnMut(FileTransferEvent) + Send>;
/// Callback invoked for a `TextChat` message.
pub type TextChatCallback = Box<dyn FnMut(TextChatEvent) + Send>;
/// Callback invoked for an `xvp` request.
pub type XvpCallback = Box<dyn FnMut(XvpEvent) + Send>;
/// Callback invoked for a `SetServerInput` request.
pub type SetServerInputCallback = Box<dyn FnMut(SetServerInputEvent) + Send>;
/// Callback invoked for a `SetSW` request.
pub type SetSwCallback = Box<dyn FnMut(SetSwEvent) + Send>;
/// Callback invoked for a `SetDesktopSize` request.
pub type SetDesktopSizeCallback = Box<dyn FnMut(SetDesktopSizeEvent) + Send>;
