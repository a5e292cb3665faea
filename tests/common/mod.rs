//! Shared utilities for integration tests.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tonic::transport::Channel;

use ext_proc_aggregator::config::{FailurePolicy, ServiceConfig};
use ext_proc_aggregator::{GrpcServer, Shutdown};

pub const ALBUMS: &str = r#"[{"id":1,"userId":42,"title":"x"}]"#;
pub const POSTS: &str = r#"[{"id":9,"userId":42,"title":"y","body":"z"}]"#;

/// Start a programmable mock HTTP backend; `f` maps the request path to (status, body).
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, String)> + Send + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut buf = Vec::new();
                        let mut chunk = [0u8; 1024];
                        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut chunk).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => buf.extend_from_slice(&chunk[..n]),
                            }
                        }
                        let head = String::from_utf8_lossy(&buf);
                        let path = head
                            .lines()
                            .next()
                            .and_then(|line| line.split_whitespace().nth(1))
                            .unwrap_or("/")
                            .to_string();

                        let (status, body) = f(path).await;
                        let status_text = match status {
                            200 => "200 OK",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            503 => "503 Service Unavailable",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Backend serving the fixed albums/posts fixtures for any user.
pub async fn start_fixture_backend() -> SocketAddr {
    start_programmable_backend(|path| async move {
        if path.ends_with("/albums") {
            (200, ALBUMS.to_string())
        } else if path.ends_with("/posts") {
            (200, POSTS.to_string())
        } else {
            (404, "{}".to_string())
        }
    })
    .await
}

/// A running ext_proc server.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ext_proc_aggregator::grpc::ServerError>>,
}

impl TestServer {
    pub async fn channel(&self) -> Channel {
        Channel::from_shared(format!("http://{}", self.addr))
            .unwrap()
            .connect()
            .await
            .expect("server unreachable")
    }
}

/// Start the gRPC server against `backend_url`.
pub async fn start_server(backend_url: String, policy: FailurePolicy) -> TestServer {
    let mut config = ServiceConfig::default();
    config.backend.base_url = backend_url;
    config.backend.timeout_secs = 5;
    config.backend.use_env_proxy = false;
    config.aggregation.failure_policy = policy;
    config.shutdown.grace_period_secs = 1;

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let server = GrpcServer::from_config(config).unwrap();
    let server_shutdown = shutdown.subscribe();

    let handle = tokio::spawn(async move { server.run(listener, server_shutdown).await });

    TestServer {
        addr,
        shutdown,
        handle,
    }
}
