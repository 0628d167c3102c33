//! One-shot HTTP server for exercising the remote code paths in tests.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

fn header_end(request: &[u8]) -> Option<usize> {
    request
        .windows(4)
        .position(|window| window == b"\r\n\r\n")
        .map(|index| index + 4)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Answers a single request with `status_line` and a chunked body made of
/// `chunks`. Returns the base URL and a handle yielding the raw request.
pub async fn serve_once(
    status_line: &'static str,
    chunks: Vec<&'static str>,
) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];

        loop {
            let read = socket.read(&mut buf).await.unwrap();
            if read == 0 {
                break;
            }
            request.extend_from_slice(&buf[..read]);
            if let Some(end) = header_end(&request) {
                let head = String::from_utf8_lossy(&request[..end]).to_string();
                if request.len() >= end + content_length(&head) {
                    break;
                }
            }
        }

        let head = format!(
            "HTTP/1.1 {status_line}\r\nContent-Type: text/plain\r\nTransfer-Encoding: chunked\r\nConnection: close\r\n\r\n"
        );
        let _ = socket.write_all(head.as_bytes()).await;
        for chunk in chunks {
            let frame = format!("{:x}\r\n{chunk}\r\n", chunk.len());
            let _ = socket.write_all(frame.as_bytes()).await;
            let _ = socket.flush().await;
        }
        let _ = socket.write_all(b"0\r\n\r\n").await;
        let _ = socket.flush().await;

        String::from_utf8_lossy(&request).to_string()
    });

    (format!("http://{addr}"), handle)
}

/// A base URL nothing is listening on.
pub async fn closed_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}
