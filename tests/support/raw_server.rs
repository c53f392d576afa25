//! Hand-rolled HTTP servers for behaviour wiremock cannot express:
//! bodies that stall part-way and counting simultaneous connections.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

/// Counters shared with a running raw server.
#[derive(Debug, Default)]
pub struct ServerCounters {
    pub connections: AtomicUsize,
    pub current: AtomicUsize,
    pub max_concurrent: AtomicUsize,
}

impl ServerCounters {
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent.load(Ordering::SeqCst)
    }
}

/// A listening server and its base URL.
pub struct RawServer {
    pub base_url: String,
    pub counters: Arc<ServerCounters>,
}

async fn bind() -> Option<TcpListener> {
    TcpListener::bind("127.0.0.1:0").await.ok()
}

/// Reads until the end of the request headers.
async fn read_request_head(stream: &mut TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

/// Sends headers announcing `announced` bytes, writes `sent` of them, then stalls.
pub async fn start_stalling_server(announced: usize, sent: usize) -> Option<RawServer> {
    let listener = bind().await?;
    let base_url = format!("http://{}", listener.local_addr().ok()?);
    let counters = Arc::new(ServerCounters::default());
    let task_counters = Arc::clone(&counters);

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            task_counters.connections.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                read_request_head(&mut stream).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {announced}\r\n\r\n"
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(&vec![0xAB; sent]).await;
                let _ = stream.flush().await;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });

    Some(RawServer { base_url, counters })
}

/// Announces `announced` body bytes, sends `sent` of them, then closes the connection.
pub async fn start_truncating_server(announced: usize, sent: usize) -> Option<RawServer> {
    let listener = bind().await?;
    let base_url = format!("http://{}", listener.local_addr().ok()?);
    let counters = Arc::new(ServerCounters::default());
    let task_counters = Arc::clone(&counters);

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            task_counters.connections.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                read_request_head(&mut stream).await;
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {announced}\r\n\r\n"
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(&vec![0xCD; sent]).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    Some(RawServer { base_url, counters })
}

/// Answers every request with `body` after `delay`, tracking how many
/// requests are waiting on a response at once.
pub async fn start_counting_server(body: &'static [u8], delay: Duration) -> Option<RawServer> {
    let listener = bind().await?;
    let base_url = format!("http://{}", listener.local_addr().ok()?);
    let counters = Arc::new(ServerCounters::default());
    let task_counters = Arc::clone(&counters);

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let counters = Arc::clone(&task_counters);
            counters.connections.fetch_add(1, Ordering::SeqCst);
            tokio::spawn(async move {
                read_request_head(&mut stream).await;
                let now = counters.current.fetch_add(1, Ordering::SeqCst) + 1;
                counters.max_concurrent.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(delay).await;
                // Released before responding so the client cannot open its next
                // connection while this one still counts.
                counters.current.fetch_sub(1, Ordering::SeqCst);
                let head = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
                    body.len()
                );
                let _ = stream.write_all(head.as_bytes()).await;
                let _ = stream.write_all(body).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    Some(RawServer { base_url, counters })
}
