//! SSE watch client
//!
//! Run with: cargo run --example watch_client [SERVER_ADDR]
//!
//! Connects to the relay_server demo, waits for the `connection_open`
//! handshake, subscribes to the `zen` topic over a second HTTP request and
//! prints every lesson. Kill the server and restart it to watch the client
//! reconnect on its own.

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use sse_rs::client::{ClientConfig, EventSource};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sse_rs=debug".parse()?),
        )
        .init();

    let addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());

    let config = ClientConfig::default().retry(Duration::from_secs(1));
    let mut source = EventSource::new(config);

    // Each (re)connection yields a fresh connection id; subscribe anew
    let (id_tx, mut id_rx) = tokio::sync::mpsc::unbounded_channel::<String>();
    source.add_event_listener("connection_open", move |event| {
        if let Ok(value) = event.json() {
            if let Some(id) = value["connectionId"].as_str() {
                let _ = id_tx.send(id.to_string());
            }
        }
    });

    source.add_event_listener("zen", |event| {
        println!("zen: {}", event.data);
    });

    {
        let addr = addr.clone();
        tokio::spawn(async move {
            while let Some(connection_id) = id_rx.recv().await {
                println!("connected as {}", connection_id);
                if let Err(e) = subscribe(&addr, &connection_id, &["zen"]).await {
                    eprintln!("subscribe failed: {}", e);
                }
            }
        });
    }

    source
        .run(move || {
            let addr = addr.clone();
            async move { open_stream(&addr).await }
        })
        .await;

    Ok(())
}

/// Open the event stream and skip past the HTTP response headers
async fn open_stream(addr: &str) -> std::io::Result<TcpStream> {
    let mut socket = TcpStream::connect(addr).await?;
    socket
        .write_all(
            b"GET /stream/connection HTTP/1.1\r\n\
              host: localhost\r\n\
              accept: text/event-stream\r\n\r\n",
        )
        .await?;

    // Consume the response head byte by byte so no SSE bytes are swallowed
    let mut tail = [0u8; 4];
    let mut byte = [0u8; 1];
    loop {
        let n = socket.read(&mut byte).await?;
        if n == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "stream closed during response headers",
            ));
        }
        tail.rotate_left(1);
        tail[3] = byte[0];
        if &tail == b"\r\n\r\n" {
            return Ok(socket);
        }
    }
}

async fn subscribe(addr: &str, connection_id: &str, topics: &[&str]) -> std::io::Result<()> {
    let body = serde_json::json!({"connectionId": connection_id, "topics": topics}).to_string();
    let request = format!(
        "POST /stream/subscribe HTTP/1.1\r\n\
         host: localhost\r\n\
         content-type: application/json; charset=utf-8\r\n\
         content-length: {}\r\n\r\n{}",
        body.len(),
        body
    );

    let mut socket = TcpStream::connect(addr).await?;
    socket.write_all(request.as_bytes()).await?;

    let mut response = [0u8; 512];
    let _ = socket.read(&mut response).await?;
    Ok(())
}
