use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

/// Binds the Prometheus text endpoint and serves it in the background
pub async fn start_metrics_server(port: u16) -> std::io::Result<SocketAddr> {
    let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    let addr = listener.local_addr()?;

    info!("Serving Prometheus metrics on http://{}/metrics", addr);

    tokio::spawn(async move {
        if let Err(e) = run_metrics_server(listener).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(addr)
}

async fn run_metrics_server(listener: TcpListener) -> std::io::Result<()> {
    loop {
        let (stream, peer) = listener.accept().await?;
        debug!("Metrics request from {}", peer);

        tokio::spawn(async move {
            if let Err(e) = respond(stream).await {
                error!("Failed to answer metrics request: {}", e);
            }
        });
    }
}

async fn respond(mut stream: TcpStream) -> std::io::Result<()> {
    let mut buffer = [0; 1024];
    let read = stream.read(&mut buffer).await?;

    // Only the request line matters
    let request = String::from_utf8_lossy(&buffer[..read]);
    let path = request.split_whitespace().nth(1).unwrap_or("/");

    let response = if path == "/metrics" || path == "/" {
        let mut body = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut body)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;

        let mut head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: text/plain; version=0.0.4\r\nContent-Length: {}\r\n\r\n",
            body.len()
        )
        .into_bytes();
        head.extend_from_slice(&body);
        head
    } else {
        b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n".to_vec()
    };

    stream.write_all(&response).await
}
