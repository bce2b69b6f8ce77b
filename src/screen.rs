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

//! `Screen`: the host-facing registry tying clients, the framebuffer, and
//! extensions together.
//!
//! This is the library's one stateful entry point. A host creates a
//! `Screen`, registers callbacks for the bytes and events it cares about,
//! accepts connections itself, and for each one calls
//! [`Screen::new_client`]/[`Screen::ingest`]. `Screen` never touches a
//! socket; this is what makes the core usable from a raw TCP server, a
//! WebSocket bridge, or a test harness identically.

use crate::auth::VncAuth;
use crate::client::{Client, ClientState, OutboundMsg};
use crate::error::{Result, VncError};
use crate::events::{
    ClipboardCallback, FileTransferCallback, KeyboardCallback, LifecycleCallback, LifecycleEvent,
    PointerCallback, SetDesktopSizeCallback, SetScaleCallback, SetServerInputCallback,
    SetSwCallback, TextChatCallback, XvpCallback,
};
use crate::extension::ExtensionRegistry;
use crate::framebuffer::Framebuffer;
use crate::region::Rect;
use crate::scheduler::{compose_update, CursorShape, ScheduleContext};
use log::{info, warn};
use std::collections::HashMap;

/// Construction-time configuration for a [`Screen`].
#[derive(Debug, Clone)]
pub struct ScreenConfig {
    /// Initial framebuffer width.
    pub width: u16,
    /// Initial framebuffer height.
    pub height: u16,
    /// Name advertised to clients in `ServerInit`.
    pub desktop_name: String,
    /// Passwords to accept for VNC Authentication; empty means no
    /// authentication (`SecurityType::None`). First entry is full control,
    /// the rest are view-only.
    pub passwords: Vec<String>,
    /// If `true`, every client is treated as shared regardless of its
    /// `ClientInit` flag: the sharing policy never refuses or disconnects
    /// anyone.
    pub always_shared: bool,
    /// If `true`, a non-shared `ClientInit` is always refused rather than
    /// disconnecting prior clients.
    pub never_shared: bool,
    /// If `true`, a non-shared `ClientInit` is refused instead of
    /// disconnecting prior clients, without forcing `always_shared`
    /// semantics on otherwise-shared connections.
    pub dont_disconnect: bool,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            width: 1024,
            height: 768,
            desktop_name: "rfb-core".to_string(),
            passwords: Vec::new(),
            always_shared: false,
            never_shared: false,
            dont_disconnect: false,
        }
    }
}

/// Builder for [`Screen`], producing an immutable, fully-configured screen
/// in one step rather than constructing it and mutating settings afterward.
#[derive(Debug, Clone, Default)]
pub struct ScreenBuilder {
    config: ScreenConfig,
}

impl ScreenBuilder {
    /// Starts a builder with the given framebuffer dimensions.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            config: ScreenConfig {
                width,
                height,
                ..ScreenConfig::default()
            },
        }
    }

    /// Sets the desktop name advertised in `ServerInit`.
    #[must_use]
    pub fn desktop_name(mut self, name: impl Into<String>) -> Self {
        self.config.desktop_name = name.into();
        self
    }

    /// Configures VNC Authentication with a single full-control password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.config.passwords = vec![password.into()];
        self
    }

    /// Configures VNC Authentication with a full-control password plus one
    /// or more view-only passwords.
    #[must_use]
    pub fn passwords(mut self, passwords: Vec<String>) -> Self {
        self.config.passwords = passwords;
        self
    }

    /// Forces every client to be treated as shared, regardless of its
    /// `ClientInit` flag.
    #[must_use]
    pub fn always_shared(mut self, value: bool) -> Self {
        self.config.always_shared = value;
        self
    }

    /// Refuses a non-shared `ClientInit` outright rather than disconnecting
    /// prior clients.
    #[must_use]
    pub fn never_shared(mut self, value: bool) -> Self {
        self.config.never_shared = value;
        self
    }

    /// Refuses a non-shared `ClientInit` rather than disconnecting prior
    /// clients, without affecting otherwise-shared connections.
    #[must_use]
    pub fn dont_disconnect(mut self, value: bool) -> Self {
        self.config.dont_disconnect = value;
        self
    }

    /// Builds the `Screen`, optionally with extensions registered up front.
    #[must_use]
    pub fn build(self, extensions: ExtensionRegistry) -> Screen {
        Screen::from_config(self.config, extensions)
    }
}

/// The registry of clients, the shared framebuffer, and the callbacks a
/// host has wired up to receive input and output bytes.
pub struct Screen {
    framebuffer: Framebuffer,
    desktop_name: String,
    auth: VncAuth,
    clients: HashMap<usize, Client>,
    next_client_id: usize,
    extensions: ExtensionRegistry,
    cursor: Option<CursorShape>,
    cursor_dirty_for: std::collections::HashSet<usize>,
    pending_resize_for: std::collections::HashSet<usize>,
    always_shared: bool,
    never_shared: bool,
    dont_disconnect: bool,
    push_cb: Option<crate::events::PushCallback>,
    pointer_cb: Option<PointerCallback>,
    keyboard_cb: Option<KeyboardCallback>,
    clipboard_cb: Option<ClipboardCallback>,
    lifecycle_cb: Option<LifecycleCallback>,
    set_scale_cb: Option<SetScaleCallback>,
    file_transfer_cb: Option<FileTransferCallback>,
    text_chat_cb: Option<TextChatCallback>,
    xvp_cb: Option<XvpCallback>,
    set_server_input_cb: Option<SetServerInputCallback>,
    set_sw_cb: Option<SetSwCallback>,
    set_desktop_size_cb: Option<SetDesktopSizeCallback>,
}

impl Screen {
    /// Creates a screen with default configuration and no extensions.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        ScreenBuilder::new(width, height).build(Vec::new())
    }

    fn from_config(config: ScreenConfig, extensions: ExtensionRegistry) -> Self {
        Self {
            framebuffer: Framebuffer::new(config.width, config.height),
            desktop_name: config.desktop_name,
            auth: VncAuth::with_passwords(config.passwords),
            clients: HashMap::new(),
            next_client_id: 1,
            extensions,
            cursor: None,
            cursor_dirty_for: std::collections::HashSet::new(),
            pending_resize_for: std::collections::HashSet::new(),
            always_shared: config.always_shared,
            never_shared: config.never_shared,
            dont_disconnect: config.dont_disconnect,
            push_cb: None,
            pointer_cb: None,
            keyboard_cb: None,
            clipboard_cb: None,
            lifecycle_cb: None,
            set_scale_cb: None,
            file_transfer_cb: None,
            text_chat_cb: None,
            xvp_cb: None,
            set_server_input_cb: None,
            set_sw_cb: None,
            set_desktop_size_cb: None,
        }
    }

    /// Registers the callback used to deliver bytes that must be written to
    /// a specific client's transport.
    pub fn set_push_callback(&mut self, cb: crate::events::PushCallback) {
        self.push_cb = Some(cb);
    }

    /// Registers the callback invoked for every pointer event.
    pub fn set_pointer_callback(&mut self, cb: PointerCallback) {
        self.pointer_cb = Some(cb);
    }

    /// Registers the callback invoked for every keyboard event.
    pub fn set_keyboard_callback(&mut self, cb: KeyboardCallback) {
        self.keyboard_cb = Some(cb);
    }

    /// Registers the callback invoked for every clipboard update from a client.
    pub fn set_clipboard_callback(&mut self, cb: ClipboardCallback) {
        self.clipboard_cb = Some(cb);
    }

    /// Registers the callback invoked on client connect/disconnect.
    pub fn set_lifecycle_callback(&mut self, cb: LifecycleCallback) {
        self.lifecycle_cb = Some(cb);
    }

    /// Registers the callback invoked for a requested scale-factor change.
    pub fn set_scale_callback(&mut self, cb: SetScaleCallback) {
        self.set_scale_cb = Some(cb);
    }

    /// Registers the callback invoked for a `FileTransfer` message.
    pub fn set_file_transfer_callback(&mut self, cb: FileTransferCallback) {
        self.file_transfer_cb = Some(cb);
    }

    /// Registers the callback invoked for a `TextChat` message.
    pub fn set_text_chat_callback(&mut self, cb: TextChatCallback) {
        self.text_chat_cb = Some(cb);
    }

    /// Registers the callback invoked for an `xvp` request.
    pub fn set_xvp_callback(&mut self, cb: XvpCallback) {
        self.xvp_cb = Some(cb);
    }

    /// Registers the callback invoked for a `SetServerInput` request.
    pub fn set_server_input_callback(&mut self, cb: SetServerInputCallback) {
        self.set_server_input_cb = Some(cb);
    }

    /// Registers the callback invoked for a `SetSW` request.
    pub fn set_sw_callback(&mut self, cb: SetSwCallback) {
        self.set_sw_cb = Some(cb);
    }

    /// Registers the callback invoked for a `SetDesktopSize` request.
    pub fn set_desktop_size_callback(&mut self, cb: SetDesktopSizeCallback) {
        self.set_desktop_size_cb = Some(cb);
    }

    /// Read-only access to the framebuffer, e.g. for a host that wants to
    /// inspect current dimensions.
    #[must_use]
    pub fn framebuffer(&self) -> &Framebuffer {
        &self.framebuffer
    }

    /// Registers a newly accepted connection and returns its assigned
    /// client id plus the bytes the host must write first.
    pub fn new_client(&mut self) -> (usize, bytes::Bytes) {
        let id = self.next_client_id;
        self.next_client_id += 1;
        let (mut client, greeting) = Client::new(
            id,
            self.auth.clone(),
            self.desktop_name.clone(),
            self.framebuffer.width(),
            self.framebuffer.height(),
        );
        for ext in &self.extensions {
            ext.on_new_client(&mut client);
        }
        self.clients.insert(id, client);
        (id, greeting)
    }

    /// Feeds bytes received from `client_id`'s transport into its state
    /// machine, dispatching every resulting event via the registered
    /// callbacks and every outbound byte chunk via the push callback.
    ///
    /// # Errors
    ///
    /// Returns an error (and removes the client) if the bytes are malformed
    /// per the RFB protocol.
    pub fn ingest(&mut self, client_id: usize, chunk: &[u8]) -> Result<()> {
        let Some(client) = self.clients.get_mut(&client_id) else {
            return Err(VncError::InvalidOperation(format!(
                "unknown client id {client_id}"
            )));
        };
        let result = client.ingest(chunk, &self.extensions);
        match result {
            Ok(messages) => {
                self.dispatch(client_id, messages);
                let paused = self.clients.get(&client_id).map(Client::state)
                    == Some(ClientState::InitialisationShared);
                if paused {
                    self.enforce_sharing_policy(client_id);
                }
                Ok(())
            }
            Err(e) => {
                warn!("client {client_id}: {e}");
                self.client_gone(client_id);
                Err(e)
            }
        }
    }

    /// Applies the screen's sharing policy to a client that just finished
    /// `ClientInit` and is paused in [`ClientState::InitialisationShared`].
    ///
    /// If the client asked to share (or `always_shared` is set), it simply
    /// proceeds. Otherwise: if `never_shared` or `dont_disconnect` is set,
    /// the new client is refused and removed; otherwise every other
    /// currently connected client is disconnected to make room for it.
    fn enforce_sharing_policy(&mut self, client_id: usize) {
        let Some(client) = self.clients.get(&client_id) else {
            return;
        };
        if !client.wants_exclusive_access() || self.always_shared {
            self.complete_handshake(client_id);
            return;
        }
        if self.never_shared || self.dont_disconnect {
            info!("client {client_id}: refused, exclusive access unavailable");
            self.clients.remove(&client_id);
            return;
        }
        let others: Vec<usize> = self
            .clients
            .keys()
            .copied()
            .filter(|&id| id != client_id)
            .collect();
        for id in others {
            info!("client {id}: disconnected for exclusive client {client_id}");
            self.client_gone(id);
        }
        self.complete_handshake(client_id);
    }

    fn complete_handshake(&mut self, client_id: usize) {
        if let Some(client) = self.clients.get_mut(&client_id) {
            let messages = client.finish_handshake();
            self.dispatch(client_id, messages);
        }
    }

    fn dispatch(&mut self, client_id: usize, messages: Vec<OutboundMsg>) {
        for msg in messages {
            match msg {
                OutboundMsg::Send(bytes) => {
                    if let Some(cb) = &mut self.push_cb {
                        cb(client_id, &bytes);
                    }
                }
                OutboundMsg::Pointer(ev) => {
                    if let Some(cb) = &mut self.pointer_cb {
                        cb(ev);
                    }
                }
                OutboundMsg::Key(ev) => {
                    if let Some(cb) = &mut self.keyboard_cb {
                        cb(ev);
                    }
                }
                OutboundMsg::Clipboard(ev) => {
                    if let Some(cb) = &mut self.clipboard_cb {
                        cb(ev);
                    }
                }
                OutboundMsg::Ready => {
                    if let Some(client) = self.clients.get_mut(&client_id) {
                        for ext in &self.extensions {
                            ext.on_init(client);
                        }
                    }
                    if let Some(cb) = &mut self.lifecycle_cb {
                        cb(LifecycleEvent::Connected { client_id });
                    }
                    info!("client {client_id}: handshake complete");
                }
                OutboundMsg::SetScale(ev) => {
                    if let Some(cb) = &mut self.set_scale_cb {
                        cb(ev);
                    }
                }
                OutboundMsg::FileTransfer(ev) => {
                    if let Some(cb) = &mut self.file_transfer_cb {
                        cb(ev);
                    }
                }
                OutboundMsg::TextChat(ev) => {
                    if let Some(cb) = &mut self.text_chat_cb {
                        cb(ev);
                    }
                }
                OutboundMsg::Xvp(ev) => {
                    if let Some(cb) = &mut self.xvp_cb {
                        cb(ev);
                    }
                }
                OutboundMsg::SetServerInput(ev) => {
                    if let Some(cb) = &mut self.set_server_input_cb {
                        cb(ev);
                    }
                }
                OutboundMsg::SetSw(ev) => {
                    if let Some(cb) = &mut self.set_sw_cb {
                        cb(ev);
                    }
                }
                OutboundMsg::SetDesktopSize(ev) => {
                    if let Some(cb) = &mut self.set_desktop_size_cb {
                        cb(ev);
                    }
                }
            }
        }
    }

    /// Marks `rect` as changed on the shared framebuffer for every
    /// registered client. The host must have already written the new pixels
    /// into the framebuffer via [`Screen::framebuffer`] before calling this.
    pub fn mark_rect_modified(&mut self, rect: Rect) {
        for client in self.clients.values_mut() {
            client.update.mark_modified(rect);
        }
    }

    /// Schedules a server-initiated CopyRect of `rect` by `(dx, dy)` for
    /// every client, and performs the corresponding pixel move on the
    /// shared framebuffer once per call (not once per client).
    pub fn schedule_copy_rect(&mut self, rect: Rect, dx: i32, dy: i32) {
        for client in self.clients.values_mut() {
            client.update.schedule_copy(rect, dx, dy);
        }
    }

    /// Replaces the cursor shape and marks it dirty for every currently
    /// connected client.
    pub fn set_cursor_shape(&mut self, cursor: CursorShape) {
        self.cursor = Some(cursor);
        self.cursor_dirty_for = self.clients.keys().copied().collect();
    }

    /// Resizes the shared framebuffer and arranges for every client that
    /// supports `NewFBSize`/`ExtendedDesktopSize` to be notified on its next
    /// update.
    pub fn resize_framebuffer(&mut self, width: u16, height: u16) {
        self.framebuffer.resize(width, height);
        self.pending_resize_for = self.clients.keys().copied().collect();
        for client in self.clients.values_mut() {
            client.resize(width, height);
            let full = Rect::new(0, 0, width, height);
            client.update.mark_modified(full);
        }
    }

    /// Sends clipboard text from the server to every connected client.
    pub fn send_server_cut_text(&mut self, text: &str) {
        let bytes = Client::encode_server_cut_text(text);
        let ids: Vec<usize> = self.clients.keys().copied().collect();
        if let Some(cb) = &mut self.push_cb {
            for id in ids {
                cb(id, &bytes);
            }
        }
    }

    /// Removes a client, e.g. after its transport reports the connection
    /// closed. Idempotent.
    pub fn client_gone(&mut self, client_id: usize) {
        if self.clients.remove(&client_id).is_some() {
            self.cursor_dirty_for.remove(&client_id);
            self.pending_resize_for.remove(&client_id);
            for ext in &self.extensions {
                ext.on_close(client_id);
            }
            if let Some(cb) = &mut self.lifecycle_cb {
                cb(LifecycleEvent::Disconnected { client_id });
            }
        }
    }

    /// Registers an additional extension at runtime.
    pub fn register_extension(&mut self, extension: std::sync::Arc<dyn crate::extension::Extension>) {
        self.extensions.push(extension);
    }

    /// Composes and dispatches one `FramebufferUpdate` per client that has
    /// a pending change and an outstanding request. A host calls this once
    /// per tick of its own event loop; there is no internal timer, so the
    /// effective update cadence is however often the host calls it (bounded
    /// below by each client's `defer_update_time`, which a future extension
    /// point could use to skip a client early).
    pub fn update_clients(&mut self) {
        let ready_ids: Vec<usize> = self
            .clients
            .iter()
            .filter(|(_, c)| c.is_ready())
            .map(|(id, _)| *id)
            .collect();

        for id in ready_ids {
            let cursor_pending = self.cursor_dirty_for.contains(&id);
            let resize_pending = self.pending_resize_for.contains(&id);
            let update = {
                let Some(client) = self.clients.get_mut(&id) else {
                    continue;
                };
                let ctx = ScheduleContext {
                    framebuffer: &self.framebuffer,
                    cursor: if cursor_pending { self.cursor.as_ref() } else { None },
                    pending_resize: resize_pending,
                };
                compose_update(client, &ctx)
            };
            if let Some(bytes) = update {
                if cursor_pending {
                    self.cursor_dirty_for.remove(&id);
                }
                if resize_pending {
                    self.pending_resize_for.remove(&id);
                }
                if let Some(cb) = &mut self.push_cb {
                    cb(id, &bytes);
                }
            }
        }
    }

    /// Number of clients currently registered, ready or still mid-handshake.
    #[must_use]
    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    /// The handshake state of a given client, if it is still registered.
    #[must_use]
    pub fn client_state(&self, client_id: usize) -> Option<ClientState> {
        self.clients.get(&client_id).map(Client::state)
    }
}
