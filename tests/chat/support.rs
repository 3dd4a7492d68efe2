use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;

use ai_hub_chat::services::llm_service::OllamaClient;

pub async fn bind() -> (TcpListener, String) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let endpoint = format!("http://{}/api/generate", listener.local_addr().unwrap());
    (listener, endpoint)
}

pub fn client(endpoint: &str, timeout: Duration) -> OllamaClient {
    OllamaClient::new(endpoint, timeout, Duration::ZERO).unwrap()
}

/// Reads one HTTP request (headers plus a Content-Length body).
pub async fn read_request(sock: &mut TcpStream) -> String {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = sock.read(&mut buf).await.unwrap();
        if n == 0 {
            break;
        }
        data.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&data).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|l| {
                    let lower = l.to_ascii_lowercase();
                    lower.strip_prefix("content-length:").map(|v| v.trim().parse::<usize>().unwrap())
                })
                .unwrap_or(0);
            if data.len() >= end + 4 + length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&data).to_string()
}

/// Accepts connections and never answers them.
pub async fn silent_server() -> String {
    let (listener, endpoint) = bind().await;
    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((sock, _)) = listener.accept().await {
            held.push(sock);
        }
    });
    endpoint
}

/// Answers one request with `status` and `body`, then closes.
pub async fn canned_server(status: &'static str, body: String) -> (String, oneshot::Receiver<String>) {
    let (listener, endpoint) = bind().await;
    let (req_tx, req_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        let request = read_request(&mut sock).await;
        let _ = req_tx.send(request);
        let head = format!(
            "HTTP/1.1 {}\r\ncontent-type: application/x-ndjson\r\nconnection: close\r\n\r\n",
            status
        );
        sock.write_all(head.as_bytes()).await.unwrap();
        sock.write_all(body.as_bytes()).await.unwrap();
        sock.shutdown().await.unwrap();
    });
    (endpoint, req_rx)
}

/// Sends `first` as a streamed chunk, then waits. Signals once the client
/// closes the connection.
pub async fn stalling_server(first: &'static str) -> (String, oneshot::Receiver<()>) {
    let (listener, endpoint) = bind().await;
    let (closed_tx, closed_rx) = oneshot::channel();
    tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.unwrap();
        read_request(&mut sock).await;
        let head = "HTTP/1.1 200 OK\r\ncontent-type: application/x-ndjson\r\ntransfer-encoding: chunked\r\n\r\n";
        sock.write_all(head.as_bytes()).await.unwrap();
        let chunk = format!("{:x}\r\n{}\r\n", first.len(), first);
        sock.write_all(chunk.as_bytes()).await.unwrap();
        sock.flush().await.unwrap();
        let mut buf = [0u8; 64];
        loop {
            match sock.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(_) => continue,
            }
        }
        let _ = closed_tx.send(());
    });
    (endpoint, closed_rx)
}
