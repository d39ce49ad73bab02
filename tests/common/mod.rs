//! Shared test fixtures: a minimal HTTP stub standing in for the hosted
//! backend, plus client construction helpers.
#![allow(dead_code)]
use std::net::SocketAddr;
use std::sync::Arc;

use reqwest::Url;
use supalink::client::SupabaseClient;
use supalink::storage::{LocalStorage, Platform, SessionOptions, SessionStorage};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Canned response chosen by the stub for one request.
pub type Responder = dyn Fn(&str, &str) -> (u16, String) + Send + Sync;

/// Serve canned HTTP responses on a local port. `respond` receives the
/// request method and target (path plus query) and returns status and body.
pub async fn spawn_stub(respond: Arc<Responder>) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let respond = Arc::clone(&respond);
            tokio::spawn(async move {
                let Some((method, target)) = read_request(&mut socket).await else {
                    return;
                };
                let (status, body) = respond(&method, &target);
                let reply = format!(
                    "HTTP/1.1 {status} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(reply.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });
    addr
}

/// Read one HTTP request (head plus content-length body) and return the
/// request line's method and target.
async fn read_request(socket: &mut tokio::net::TcpStream) -> Option<(String, String)> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = find_head_end(&buf) {
            break pos;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let content_length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);

    // Drain the body so the peer never sees a reset mid-write.
    let mut already = buf.len() - (head_end + 4);
    while already < content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        already += n;
    }

    let mut request_line = head.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    Some((method, target))
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// Client pointed at the stub, with browser-style storage and options.
pub fn client_for(addr: SocketAddr) -> SupabaseClient {
    client_with_storage(addr, Arc::new(LocalStorage::default()))
}

pub fn client_with_storage(addr: SocketAddr, storage: Arc<dyn SessionStorage>) -> SupabaseClient {
    let base_url = Url::parse(&format!("http://{addr}/")).unwrap();
    SupabaseClient::with_parts(
        base_url,
        "test-anon-key".into(),
        storage,
        SessionOptions::for_platform(&Platform::Web { has_window: true }),
    )
}
