//! Simple VNC server example.
//!
//! Demonstrates the host side of the transport-agnostic split: this example
//! owns the `TcpListener` and the per-connection tasks, while `rfb_core::Screen`
//! only ever sees bytes handed to it through `ingest` and hands bytes back
//! through a push callback.
//!
//! Usage:
//!   cargo run --example simple_server
//!
//! Then connect with a VNC viewer to localhost:5900

use rfb_core::{Rect, ScreenBuilder};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::interval;

type Writers = Arc<Mutex<HashMap<usize, mpsc::UnboundedSender<Vec<u8>>>>>;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    println!("Starting VNC server on port 5900...");
    println!("Connect with: vncviewer localhost:5900");
    println!("Password: test123");

    let mut screen = ScreenBuilder::new(800, 600)
        .desktop_name("rfb-core simple example")
        .password("test123")
        .build(Vec::new());

    let writers: Writers = Arc::new(Mutex::new(HashMap::new()));
    let push_writers = writers.clone();
    screen.set_push_callback(Box::new(move |client_id, bytes| {
        if let Some(tx) = push_writers.lock().unwrap().get(&client_id) {
            let _ = tx.send(bytes.to_vec());
        }
    }));

    // Paint a static gradient test pattern into the framebuffer once.
    {
        let fb = screen.framebuffer();
        let mut pixels = vec![0u8; 800 * 600 * 4];
        for y in 0..600u32 {
            for x in 0..800u32 {
                let offset = ((y * 800 + x) * 4) as usize;
                pixels[offset] = (x * 255 / 800) as u8;
                pixels[offset + 1] = (y * 255 / 600) as u8;
                pixels[offset + 2] = 128;
                pixels[offset + 3] = 255;
            }
        }
        fb.write_rect(fb.bounds(), &pixels)?;
    }
    screen.mark_rect_modified(Rect::new(0, 0, 800, 600));

    let screen = Arc::new(Mutex::new(screen));

    // Drive the update scheduler on a fixed tick; the core never does this
    // on its own.
    {
        let screen = screen.clone();
        tokio::spawn(async move {
            let mut tick = interval(Duration::from_millis(16));
            loop {
                tick.tick().await;
                screen.lock().unwrap().update_clients();
            }
        });
    }

    let listener = TcpListener::bind(("0.0.0.0", 5900)).await?;
    println!("Server ready for connections");

    loop {
        let (mut stream, addr) = listener.accept().await?;
        stream.set_nodelay(true)?;
        println!("Client connected: {addr}");

        let screen = screen.clone();
        let writers = writers.clone();
        let (client_id, greeting) = screen.lock().unwrap().new_client();

        let (tx, mut rx) = mpsc::unbounded_channel::<Vec<u8>>();
        writers.lock().unwrap().insert(client_id, tx);
        stream.write_all(&greeting).await?;

        tokio::spawn(async move {
            let (mut read_half, mut write_half) = stream.into_split();
            let writer_task = tokio::spawn(async move {
                while let Some(chunk) = rx.recv().await {
                    if write_half.write_all(&chunk).await.is_err() {
                        break;
                    }
                }
            });

            let mut buf = [0u8; 4096];
            loop {
                match read_half.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if screen.lock().unwrap().ingest(client_id, &buf[..n]).is_err() {
                            break;
                        }
                    }
                }
            }
            screen.lock().unwrap().client_gone(client_id);
            writers.lock().unwrap().remove(&client_id);
            writer_task.abort();
            println!("Client {client_id} disconnected");
        });
    }
}
