//! End-to-end scenarios driven purely through `Screen::ingest`/`update_clients`,
//! with no real socket: a push callback captures outbound bytes into a
//! per-client buffer that these tests parse back out by hand.

use bytes::{Buf, BytesMut};
use rfb_core::{Rect, Screen, ScreenBuilder};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

type Outbox = Rc<RefCell<HashMap<usize, Vec<u8>>>>;

fn new_screen(width: u16, height: u16) -> (Screen, Outbox) {
    let mut screen = Screen::new(width, height);
    let outbox: Outbox = Rc::new(RefCell::new(HashMap::new()));
    let cb_outbox = outbox.clone();
    screen.set_push_callback(Box::new(move |client_id, bytes| {
        cb_outbox
            .borrow_mut()
            .entry(client_id)
            .or_default()
            .extend_from_slice(bytes);
    }));
    (screen, outbox)
}

fn take_all(outbox: &Outbox, client_id: usize) -> Vec<u8> {
    outbox
        .borrow_mut()
        .get_mut(&client_id)
        .map(std::mem::take)
        .unwrap_or_default()
}

fn set_pixel_format_msg() -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&[0u8, 0, 0, 0]); // type + padding
    let pf = rfb_core::PixelFormat::rgba32();
    pf.write_to(&mut buf);
    buf.to_vec()
}

fn set_encodings_msg(encodings: &[i32]) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&[2u8, 0]);
    buf.extend_from_slice(&(encodings.len() as u16).to_be_bytes());
    for e in encodings {
        buf.extend_from_slice(&e.to_be_bytes());
    }
    buf.to_vec()
}

fn fb_update_request_msg(incremental: bool, rect: Rect) -> Vec<u8> {
    let mut buf = BytesMut::new();
    buf.extend_from_slice(&[3u8, u8::from(incremental)]);
    buf.extend_from_slice(&rect.x.to_be_bytes());
    buf.extend_from_slice(&rect.y.to_be_bytes());
    buf.extend_from_slice(&rect.w.to_be_bytes());
    buf.extend_from_slice(&rect.h.to_be_bytes());
    buf.to_vec()
}

/// Drives a client through the full handshake assuming no authentication,
/// returning its assigned id.
fn handshake(screen: &mut Screen, outbox: &Outbox) -> usize {
    let (id, greeting) = screen.new_client();
    assert_eq!(&greeting[..], rfb_core::PROTOCOL_VERSION.as_bytes());
    screen.ingest(id, rfb_core::PROTOCOL_VERSION.as_bytes()).unwrap();
    let security_types = take_all(outbox, id);
    assert_eq!(security_types, vec![1, 1]); // one type offered: None
    screen.ingest(id, &[1]).unwrap(); // choose SecurityType::None
    let _security_result = take_all(outbox, id);
    screen.ingest(id, &[1]).unwrap(); // ClientInit: shared = true
    let server_init = take_all(outbox, id);
    assert!(server_init.len() > 24); // width+height+pixelformat+namelen at minimum
    id
}

#[test]
fn handshake_then_raw_update_roundtrip() {
    let (mut screen, outbox) = new_screen(64, 64);
    let id = handshake(&mut screen, &outbox);

    screen.ingest(id, &set_encodings_msg(&[0])).unwrap(); // Raw only
    screen
        .ingest(id, &fb_update_request_msg(false, Rect::new(0, 0, 64, 64)))
        .unwrap();

    screen.mark_rect_modified(Rect::new(0, 0, 64, 64));
    screen.update_clients();

    let update = take_all(&outbox, id);
    assert!(!update.is_empty());
    let mut buf = BytesMut::from(&update[..]);
    assert_eq!(buf.get_u8(), 0); // FramebufferUpdate
    let _padding = buf.get_u8();
    let rect_count = buf.get_u16();
    assert_eq!(rect_count, 1);
}

#[test]
fn incremental_request_with_no_changes_sends_nothing() {
    let (mut screen, outbox) = new_screen(32, 32);
    let id = handshake(&mut screen, &outbox);
    screen.ingest(id, &set_encodings_msg(&[0])).unwrap();
    screen
        .ingest(id, &fb_update_request_msg(true, Rect::new(0, 0, 32, 32)))
        .unwrap();
    screen.update_clients();
    assert!(take_all(&outbox, id).is_empty());
}

#[test]
fn copy_rect_is_preferred_over_redraw() {
    let (mut screen, outbox) = new_screen(64, 64);
    let id = handshake(&mut screen, &outbox);
    screen.ingest(id, &set_encodings_msg(&[0])).unwrap();
    screen
        .ingest(id, &fb_update_request_msg(true, Rect::new(0, 0, 64, 64)))
        .unwrap();

    screen.schedule_copy_rect(Rect::new(0, 0, 16, 16), 32, 32);
    screen.update_clients();

    let update = take_all(&outbox, id);
    assert!(!update.is_empty());
    let mut buf = BytesMut::from(&update[..]);
    buf.advance(4); // type + padding + rect count
    // Rectangle header: x,y,w,h,encoding(i32)
    buf.advance(8);
    let encoding = buf.get_i32();
    assert_eq!(encoding, rfb_core::protocol::ENCODING_COPYRECT);
}

#[test]
fn modification_overlapping_copy_source_invalidates_copy() {
    let (mut screen, outbox) = new_screen(64, 64);
    let id = handshake(&mut screen, &outbox);
    screen.ingest(id, &set_encodings_msg(&[0])).unwrap();
    screen
        .ingest(id, &fb_update_request_msg(true, Rect::new(0, 0, 64, 64)))
        .unwrap();

    screen.schedule_copy_rect(Rect::new(0, 0, 16, 16), 32, 0);
    // Now the source pixels themselves change before the update is sent.
    screen.mark_rect_modified(Rect::new(4, 4, 4, 4));
    screen.update_clients();

    let update = take_all(&outbox, id);
    assert!(!update.is_empty());
    // The exact rectangle shape isn't asserted here; the invariant under
    // test is that composing the update didn't panic or desync state, and
    // the implementation cleared whatever it sent.
}

#[test]
fn set_pixel_format_is_applied_before_next_update() {
    let (mut screen, outbox) = new_screen(16, 16);
    let id = handshake(&mut screen, &outbox);
    screen.ingest(id, &set_pixel_format_msg()).unwrap();
    screen.ingest(id, &set_encodings_msg(&[0])).unwrap();
    screen
        .ingest(id, &fb_update_request_msg(false, Rect::new(0, 0, 16, 16)))
        .unwrap();
    screen.mark_rect_modified(Rect::new(0, 0, 16, 16));
    screen.update_clients();
    assert!(!take_all(&outbox, id).is_empty());
}

#[test]
fn client_disconnect_is_idempotent() {
    let (mut screen, outbox) = new_screen(16, 16);
    let id = handshake(&mut screen, &outbox);
    assert_eq!(screen.client_count(), 1);
    screen.client_gone(id);
    assert_eq!(screen.client_count(), 0);
    screen.client_gone(id); // no panic on double-remove
}

#[test]
fn malformed_security_choice_closes_client() {
    let (mut screen, outbox) = new_screen(16, 16);
    let (id, _) = screen.new_client();
    screen.ingest(id, rfb_core::PROTOCOL_VERSION.as_bytes()).unwrap();
    let _ = take_all(&outbox, id);
    assert!(screen.ingest(id, &[200]).is_err());
    assert_eq!(screen.client_count(), 0);
}

#[test]
fn multiple_clients_get_independent_updates() {
    let (mut screen, outbox) = new_screen(32, 32);
    let a = handshake(&mut screen, &outbox);
    let b = handshake(&mut screen, &outbox);
    screen.ingest(a, &set_encodings_msg(&[0])).unwrap();
    screen.ingest(b, &set_encodings_msg(&[0])).unwrap();
    screen
        .ingest(a, &fb_update_request_msg(true, Rect::new(0, 0, 32, 32)))
        .unwrap();
    // Client b never requests an update.
    screen.mark_rect_modified(Rect::new(0, 0, 32, 32));
    screen.update_clients();
    assert!(!take_all(&outbox, a).is_empty());
    assert!(take_all(&outbox, b).is_empty());
}

#[test]
fn builder_configures_password_and_desktop_name() {
    let screen: Screen = ScreenBuilder::new(8, 8)
        .desktop_name("test-desktop")
        .password("secret")
        .build(Vec::new());
    assert_eq!(screen.framebuffer().width(), 8);
}
