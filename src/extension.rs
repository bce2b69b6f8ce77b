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

//! Extension hook for protocol features outside the core RFB message set.
//!
//! `xvp`, `ExtendedDesktopSize`, and similar additions to the protocol are
//! optional from the core's point of view: a client may never request them,
//! and the core's message dispatch should not grow a hardcoded branch per
//! extension. [`Extension`] lets a host register additional pseudo-encodings
//! and handle the corresponding client messages without the core needing to
//! know what they mean.

use crate::client::Client;
use crate::error::Result;
use bytes::Bytes;

/// A protocol feature layered on top of the core RFB message set.
///
/// Implementations are registered with a [`crate::screen::Screen`] at
/// construction time via an [`ExtensionRegistry`]. The core calls into an
/// extension at well-defined points during the client lifecycle; an
/// extension that has nothing to do at a given point can simply accept the
/// default no-op implementation.
pub trait Extension: Send + Sync {
    /// Pseudo-encoding numbers this extension owns. When a client's
    /// `SetEncodings` list includes one of these, the core calls
    /// [`Extension::enable_pseudo_encoding`] and otherwise leaves the
    /// number out of its own built-in handling.
    fn pseudo_encodings(&self) -> &[i32] {
        &[]
    }

    /// Called once, right after a client is registered with the screen and
    /// before the handshake begins.
    fn on_new_client(&self, _client: &mut Client) {}

    /// Called after `ClientInit`/`ServerInit` has completed and the client
    /// has entered normal operation.
    fn on_init(&self, _client: &mut Client) {}

    /// Called when the client's `SetEncodings` message includes one of this
    /// extension's pseudo-encodings.
    fn enable_pseudo_encoding(&self, _client: &mut Client, _encoding: i32) {}

    /// Declares the total message length, in bytes including the 1-byte
    /// type, for a client-to-server message type this extension owns.
    ///
    /// The core buffers messages by length before parsing them, so a
    /// message type it doesn't recognize can only be handed to
    /// [`Extension::handle_message`] once something has said how many bytes
    /// to wait for. Returning `None` (the default) means this extension
    /// doesn't own `message_type`.
    fn declared_message_length(&self, _message_type: u8) -> Option<usize> {
        None
    }

    /// Called for every client-to-server message type the core's own
    /// dispatch does not recognize, once [`Extension::declared_message_length`]
    /// has let the core buffer the full message. `body` is everything after
    /// the 1-byte type. Returns `Ok(true)` if the extension consumed the
    /// message, `Ok(false)` if it should be treated as unknown and close the
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns an error if the extension fails to parse or act on the
    /// message body.
    fn handle_message(&self, _client: &mut Client, _message_type: u8, _body: &Bytes) -> Result<bool> {
        Ok(false)
    }

    /// Called when a client disconnects, for any extension-owned per-client
    /// teardown.
    fn on_close(&self, _client_id: usize) {}
}

/// An ordered collection of extensions consulted by a [`crate::screen::Screen`].
pub type ExtensionRegistry = Vec<std::sync::Arc<dyn Extension>>;
