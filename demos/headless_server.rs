//! Headless VNC server example with animated content.
//!
//! Demonstrates feeding a continuously updated framebuffer through
//! `rfb_core::Screen` without any actual screen capture, using the same
//! host-owns-the-socket pattern as `simple_server`.
//!
//! Usage:
//!   cargo run --example headless_server

use rfb_core::{Rect, Screen};
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::interval;

type Writers = Arc<Mutex<HashMap<usize, mpsc::UnboundedSender<Vec<u8>>>>>;

const WIDTH: u16 = 640;
const HEIGHT: u16 = 480;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    println!("Starting headless VNC server on port 5900...");
    println!("Connect with: vncviewer localhost:5900");

    let mut screen = Screen::new(WIDTH, HEIGHT);

    let writers: Writers = Arc::new(Mutex::new(HashMap::new()));
    let push_writers = writers.clone();
    screen.set_push_callback(Box::new(move |client_id, bytes| {
        if let Some(tx) = push_writers.lock().unwrap().get(&client_id) {
            let _ = tx.send(bytes.to_vec());
        }
    }));

    let screen = Arc::new(Mutex::new(screen));

    // Animation loop: generate a new frame, write it into the framebuffer,
    // mark it modified, and let the scheduler tick drain it out to clients.
    {
        let screen = screen.clone();
        tokio::spawn(async move {
            let mut frame = 0u32;
            let mut pixels = vec![0u8; WIDTH as usize * HEIGHT as usize * 4];
            let mut tick = interval(Duration::from_millis(33)); // ~30 FPS
            loop {
                tick.tick().await;
                for y in 0..HEIGHT as u32 {
                    for x in 0..WIDTH as u32 {
                        let offset = ((y * WIDTH as u32 + x) * 4) as usize;
                        pixels[offset] = ((x + frame) % 256) as u8;
                        pixels[offset + 1] = ((y + frame) % 256) as u8;
                        pixels[offset + 2] = ((frame / 2) % 256) as u8;
                        pixels[offset + 3] = 255;
                    }
                }
                {
                    let screen = screen.lock().unwrap();
                    let fb = screen.framebuffer();
                    let _ = fb.write_rect(fb.bounds(), &pixels);
                }
                screen
                    .lock()
                    .unwrap()
                    .mark_rect_modified(Rect::new(0, 0, WIDTH, HEIGHT));
                screen.lock().unwrap().update_clients();

                frame = frame.wrapping_add(1);
                if frame % 300 == 0 {
                    println!("Frame: {frame}");
                }
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
