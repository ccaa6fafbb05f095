//! Minimal SSE relay server
//!
//! Run with: cargo run --example relay_server [BIND_ADDR]
//!
//! Speaks just enough HTTP for three routes:
//!   GET  /stream/connection   open an event stream (text/event-stream)
//!   POST /stream/subscribe    {"connectionId": "...", "topics": ["zen"]}
//!   GET  /topics              list declared topics
//!
//! A producer task broadcasts one zen lesson every two seconds. New streams
//! are pre-registered to the `zen` topic and receive a `connection_open`
//! handshake event carrying their connection id.
//!
//! Try it:
//!   curl -N http://127.0.0.1:8080/stream/connection
//!   curl http://127.0.0.1:8080/topics

use std::sync::Arc;

use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

use sse_rs::registry::{ConnectionRegistry, TopicCatalog};
use sse_rs::server::StreamWriter;

const ZEN_LESSONS: [&str; 6] = [
    "Beautiful is better than ugly.",
    "Explicit is better than implicit.",
    "Simple is better than complex.",
    "Complex is better than complicated.",
    "Flat is better than nested.",
    "Sparse is better than dense.",
];

#[derive(Deserialize)]
struct SubscribeRequest {
    #[serde(rename = "connectionId")]
    connection_id: String,
    topics: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sse_rs=debug".parse()?),
        )
        .init();

    let bind_addr = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "127.0.0.1:8080".to_string());

    let registry = Arc::new(ConnectionRegistry::new());
    let catalog = Arc::new(TopicCatalog::new());
    catalog
        .declare(
            "zen",
            "One zen lesson every two seconds",
            serde_json::json!({"index": 0, "lesson": "Beautiful is better than ugly."}),
        )
        .await;

    // Producer
    {
        let registry = Arc::clone(&registry);
        tokio::spawn(async move {
            let mut index = 0usize;
            loop {
                tokio::time::sleep(std::time::Duration::from_secs(2)).await;
                let lesson = ZEN_LESSONS[index % ZEN_LESSONS.len()];
                let payload = serde_json::json!({"index": index, "lesson": lesson});
                if let Err(e) = registry.broadcast("zen", &payload).await {
                    tracing::error!(error = %e, "Broadcast failed");
                }
                index += 1;
            }
        });
    }

    let listener = TcpListener::bind(&bind_addr).await?;
    println!("SSE relay listening on http://{}", bind_addr);
    println!();
    println!("Open a stream:  curl -N http://{}/stream/connection", bind_addr);
    println!("List topics:    curl http://{}/topics", bind_addr);

    loop {
        let (socket, peer_addr) = listener.accept().await?;
        let registry = Arc::clone(&registry);
        let catalog = Arc::clone(&catalog);

        tokio::spawn(async move {
            if let Err(e) = handle_request(socket, registry, catalog).await {
                tracing::debug!(peer = %peer_addr, error = %e, "Request failed");
            }
        });
    }
}

async fn handle_request(
    socket: TcpStream,
    registry: Arc<ConnectionRegistry>,
    catalog: Arc<TopicCatalog>,
) -> std::io::Result<()> {
    let mut reader = BufReader::new(socket);

    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).await?;
        let line = line.trim();
        if line.is_empty() {
            break;
        }
        if let Some(value) = line.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = value.trim().parse().unwrap_or(0);
        }
    }

    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("");

    match (method, path) {
        ("GET", "/stream/connection") => {
            let connection = registry.create().await;
            registry.register(&connection, "zen").await;
            let _ = connection
                .emit(
                    "connection_open",
                    &serde_json::json!({"connectionId": connection.id().as_str()}),
                )
                .await;

            let mut socket = reader.into_inner();
            socket
                .write_all(
                    b"HTTP/1.1 200 OK\r\n\
                      content-type: text/event-stream\r\n\
                      cache-control: no-cache\r\n\
                      connection: keep-alive\r\n\r\n",
                )
                .await?;

            // Drains until the curl side hangs up; deregisters on exit
            let _ = StreamWriter::new(registry, connection, socket).run().await;
            Ok(())
        }
        ("POST", "/stream/subscribe") => {
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).await?;

            let response = match serde_json::from_slice::<SubscribeRequest>(&body) {
                Ok(request) => {
                    match registry.subscribe(&request.connection_id, &request.topics).await {
                        Ok(connection) => {
                            // Pre-cursor event per topic so the client knows
                            // the subscription took effect
                            for topic in &request.topics {
                                let _ = connection.emit(topic, &serde_json::Value::Null).await;
                            }
                            (200, "\"Done\"".to_string())
                        }
                        Err(e) => (404, serde_json::json!({"error": e.to_string()}).to_string()),
                    }
                }
                Err(e) => (400, serde_json::json!({"error": e.to_string()}).to_string()),
            };

            respond_json(reader.into_inner(), response.0, &response.1).await
        }
        ("GET", "/topics") => {
            let topics = catalog.list().await;
            let body = serde_json::to_string(&topics).unwrap_or_else(|_| "[]".to_string());
            respond_json(reader.into_inner(), 200, &body).await
        }
        _ => respond_json(reader.into_inner(), 404, "{\"error\": \"Not found\"}").await,
    }
}

async fn respond_json(mut socket: TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let reason = match status {
        200 => "OK",
        400 => "Bad Request",
        _ => "Not Found",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    socket.write_all(response.as_bytes()).await?;
    socket.shutdown().await
}
