//! Raw HTTP/1.1 server for mid-body behaviour wiremock cannot express.
//!
//! Every response advertises the full `Content-Length`. A GET then either
//! pauses after `split_at` bytes until [`StallingServer::release`], or closes
//! the socket there for its first few requests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Notify;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy)]
enum Behavior {
    /// Pause at the split point until released.
    Stall,
    /// Hang up at the split point for the first `n` GETs, then serve in full.
    HangUp(usize),
}

struct Shared {
    body: Vec<u8>,
    split_at: usize,
    behavior: Behavior,
    release: Notify,
    gets: AtomicUsize,
}

pub struct StallingServer {
    addr: SocketAddr,
    shared: Arc<Shared>,
    handle: JoinHandle<()>,
}

impl StallingServer {
    /// GETs send `body[..stall_at]`, then wait for [`release`](Self::release).
    pub async fn start(body: Vec<u8>, stall_at: usize) -> std::io::Result<Self> {
        Self::spawn(body, stall_at, Behavior::Stall).await
    }

    /// The first `broken_gets` GETs close the connection after `cut_at`
    /// bytes; later GETs get the whole body.
    pub async fn hanging_up(
        body: Vec<u8>,
        cut_at: usize,
        broken_gets: usize,
    ) -> std::io::Result<Self> {
        Self::spawn(body, cut_at, Behavior::HangUp(broken_gets)).await
    }

    async fn spawn(body: Vec<u8>, split_at: usize, behavior: Behavior) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shared = Arc::new(Shared {
            split_at: split_at.min(body.len()),
            body,
            behavior,
            release: Notify::new(),
            gets: AtomicUsize::new(0),
        });

        let server_shared = Arc::clone(&shared);
        let handle = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let shared = Arc::clone(&server_shared);
                tokio::spawn(async move {
                    let _ = serve(stream, &shared).await;
                });
            }
        });

        Ok(Self {
            addr,
            shared,
            handle,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }

    /// Lets a stalled GET send the rest of its body.
    pub fn release(&self) {
        self.shared.release.notify_one();
    }

    /// GET requests received so far.
    pub fn get_count(&self) -> usize {
        self.shared.gets.load(Ordering::SeqCst)
    }
}

impl Drop for StallingServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn serve(mut stream: TcpStream, shared: &Shared) -> std::io::Result<()> {
    let mut request = Vec::new();
    let mut buf = [0u8; 1024];
    while !request.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Ok(());
        }
        request.extend_from_slice(&buf[..n]);
    }

    let head = format!(
        "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nContent-Type: application/octet-stream\r\nConnection: close\r\n\r\n",
        shared.body.len()
    );
    stream.write_all(head.as_bytes()).await?;

    if request.starts_with(b"HEAD ") {
        stream.flush().await?;
        return Ok(());
    }

    let nth = shared.gets.fetch_add(1, Ordering::SeqCst);
    let body = &shared.body;
    stream.write_all(&body[..shared.split_at]).await?;
    stream.flush().await?;

    match shared.behavior {
        Behavior::Stall => shared.release.notified().await,
        Behavior::HangUp(broken) if nth < broken => {
            stream.shutdown().await?;
            return Ok(());
        }
        Behavior::HangUp(_) => {}
    }

    stream.write_all(&body[shared.split_at..]).await?;
    stream.flush().await?;
    Ok(())
}
