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

//! # rfb-core
//!
//! A transport-agnostic implementation of the RFB (VNC) server protocol
//! (RFC 6143). This crate is the protocol core only: byte-stream assembly,
//! the client state machine, dirty-region/CopyRect accounting, and the
//! update scheduler. It never opens a socket and never spawns a task — a
//! host owns the transport (TCP, a WebSocket bridge, a Unix socket, a test
//! harness) and drives the core by calling [`Screen::ingest`] with whatever
//! bytes arrived and [`Screen::update_clients`] on its own schedule.
//!
//! ## Features
//!
//! - **Raw and CopyRect encoding**: the scheduler composes CopyRect directly
//!   and falls back to Raw for everything else; a client's full advertised
//!   encoding list is parsed and tracked, but bit-packing for the remaining
//!   wire encodings is out of scope
//! - **All true-color pixel formats**: 8/16/24/32-bit depths, arbitrary
//!   shift/max triples
//! - **Region algebra** with the invariants needed to interleave
//!   server-initiated CopyRect with ordinary dirty-rectangle tracking
//!   without ever copying stale pixels
//! - **VNC Authentication** (DES challenge-response) with optional
//!   view-only passwords
//! - **Extension hook** for protocol additions (`xvp`, `ExtendedDesktopSize`,
//!   ...) that do not belong in the core dispatch table
//!
//! ## Quick Start
//!
//! ```no_run
//! use rfb_core::Screen;
//!
//! let mut screen = Screen::new(1920, 1080);
//! screen.set_push_callback(Box::new(|_client_id, _bytes| {
//!     // Write `_bytes` to `_client_id`'s transport here.
//! }));
//!
//! let (client_id, greeting) = screen.new_client();
//! // Write `greeting` to the new connection, then for every chunk read
//! // from it:
//! // screen.ingest(client_id, &chunk)?;
//! // screen.update_clients(); // once per host event-loop tick
//! # let _ = client_id;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │                  Host                    │
//! │                                           │
//! │  • owns the TCP/WebSocket/... listener    │
//! │  • owns the event loop                    │
//! │  • pushes bytes in via Screen::ingest      │
//! │  • receives bytes out via a push callback  │
//! └──────────────────┬──────────────────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │                 Screen                   │
//! │  • client registry                        │
//! │  • framebuffer                             │
//! │  • extension registry                      │
//! └──────────────────┬──────────────────────┘
//!        ┌───────────┼───────────┐
//!        ▼           ▼           ▼
//!   ┌────────┐ ┌────────┐ ┌────────┐
//!   │Client 1│ │Client 2│ │Client N│   state machine + dirty regions
//!   └────────┘ └────────┘ └────────┘
//!        │           │           │
//!        └───────────┴───────────┘
//!                    │
//!                    ▼
//! ┌─────────────────────────────────────────┐
//! │               Framebuffer                │
//! │  • RGBA32 pixel storage                  │
//! │  • read/write/copy-within rectangles     │
//! └─────────────────────────────────────────┘
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod events;
pub mod protocol;
pub mod region;
pub mod framebuffer;
pub mod extension;
pub mod scheduler;
pub mod screen;

// Internal modules
pub mod client;
mod assembler;
mod auth;
mod translate;
pub mod encoding;

// Re-exports
pub use error::{Result, VncError};
pub use events::{ClipboardEvent, KeyEvent, LifecycleEvent, PointerEvent};
pub use framebuffer::Framebuffer;
pub use protocol::PixelFormat;
pub use encoding::Encoding;
pub use region::{Rect, Region};
pub use screen::{Screen, ScreenBuilder, ScreenConfig};
pub use client::{Client, ClientState};
pub use extension::{Extension, ExtensionRegistry};

/// VNC protocol version.
pub const PROTOCOL_VERSION: &str = "RFB 003.008\n";

/// Default VNC port.
pub const DEFAULT_PORT: u16 = 5900;
