//! OpenAI 兼容客户端对真实 HTTP 错误的处理：本地 TCP 服务返回固定状态码

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use emtsim::core::user_facing_message;
use emtsim::llm::{
    CompletionRequest, FailureCategory, LlmClient, LlmError, OpenAiClient, RetryConfig,
    RetryingLlmClient,
};

const RATE_LIMIT_BODY: &str = r#"{"error":{"message":"Rate limit reached for requests","type":"requests","param":null,"code":"rate_limit_exceeded"}}"#;

/// 读完一个请求（头 + Content-Length 指定的正文）
async fn read_request(stream: &mut TcpStream) -> std::io::Result<()> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = stream.read(&mut chunk).await?;
        if n == 0 {
            return Ok(());
        }
        buf.extend_from_slice(&chunk[..n]);
        let Some(head_end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buf[..head_end]).to_lowercase();
        let length = head
            .lines()
            .find_map(|l| l.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if buf.len() >= head_end + 4 + length {
            return Ok(());
        }
    }
}

/// 每个连接都回同一个状态与正文；返回 base_url 与请求计数
async fn serve_status(status: &'static str, body: &'static str) -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let hits = Arc::new(AtomicUsize::new(0));
    let counter = hits.clone();
    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            let counter = counter.clone();
            tokio::spawn(async move {
                if read_request(&mut stream).await.is_err() {
                    return;
                }
                counter.fetch_add(1, Ordering::SeqCst);
                let response = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });
    (format!("http://{addr}/v1"), hits)
}

#[tokio::test]
async fn test_rate_limit_is_attempted_once_without_retries() {
    let (base, hits) = serve_status("429 Too Many Requests", RATE_LIMIT_BODY).await;
    let client = RetryingLlmClient::new(
        Arc::new(OpenAiClient::new(Some(&base), "gpt-4o-mini", Some("sk-test"))),
        RetryConfig::none(),
    );

    let result = tokio::time::timeout(
        Duration::from_secs(4),
        client.complete(&CompletionRequest::prompt("check vitals")),
    )
    .await
    .expect("client kept retrying internally");

    let err = result.unwrap_err();
    assert_eq!(err.category(), FailureCategory::RateLimited);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_empty_bad_gateway_is_retried_as_connectivity() {
    let (base, hits) = serve_status("502 Bad Gateway", "").await;
    let client = RetryingLlmClient::new(
        Arc::new(OpenAiClient::new(Some(&base), "gpt-4o-mini", Some("sk-test"))),
        RetryConfig {
            max_retries: 1,
            initial_delay: Duration::from_millis(10),
            backoff_multiplier: 2,
        },
    );

    let err = tokio::time::timeout(
        Duration::from_secs(4),
        client.complete(&CompletionRequest::prompt("check vitals")),
    )
    .await
    .expect("client kept retrying internally")
    .unwrap_err();

    assert!(matches!(err, LlmError::Server(_)));
    assert_eq!(err.category(), FailureCategory::Connectivity);
    assert_eq!(hits.load(Ordering::SeqCst), 2);
    assert!(user_facing_message(&err).starts_with("Connection instability"));
}
