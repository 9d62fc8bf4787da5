use crate::config::influxdb::InfluxDbConfig;
use anyhow::Result;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::post;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// One request captured by [`FakeInfluxDb`].
#[derive(Debug, Clone)]
pub struct ReceivedWrite {
    pub query: HashMap<String, String>,
    pub authorization: Option<String>,
    pub content_type: Option<String>,
    pub body: String,
}

#[derive(Clone, Default)]
struct FakeState {
    status: Arc<Mutex<StatusCode>>,
    received: Arc<Mutex<Vec<ReceivedWrite>>>,
}

/// Minimal stand-in for the InfluxDB write endpoint, listening on an
/// ephemeral local port. Answers every write with the configured status.
pub struct FakeInfluxDb {
    address: SocketAddr,
    state: FakeState,
}

impl FakeInfluxDb {
    pub async fn start(status: StatusCode) -> Result<Self> {
        let state = FakeState::default();
        *state.status.lock().unwrap() = status;

        let app = Router::new()
            .route("/api/v2/write", post(fake_write))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let address = listener.local_addr()?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self { address, state })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    pub fn set_status(&self, status: StatusCode) {
        *self.state.status.lock().unwrap() = status;
    }

    pub fn received(&self) -> Vec<ReceivedWrite> {
        self.state.received.lock().unwrap().clone()
    }

    /// Client configuration pointing at this server.
    pub fn config(&self) -> InfluxDbConfig {
        test_influxdb_config(&format!("http://{}", self.address))
    }
}

pub fn test_influxdb_config(host: &str) -> InfluxDbConfig {
    InfluxDbConfig {
        host: host.to_string(),
        org: "peter".to_string(),
        bucket: "diyPresso".to_string(),
        token: "test-token".to_string(),
        precision: "ns".to_string(),
    }
}

/// Server answering every request with a 500 whose body stops short of
/// its announced length, so the client cannot read it.
pub async fn truncated_response_server() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let address = listener.local_addr()?;
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let _ = truncated_reply(socket).await;
            });
        }
    });
    Ok(address)
}

async fn truncated_reply(mut socket: TcpStream) -> std::io::Result<()> {
    // Consume the whole request first so closing does not reset the connection.
    let mut request = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let read = socket.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        request.extend_from_slice(&chunk[..read]);
        if let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
            let length = head
                .lines()
                .find_map(|line| line.strip_prefix("content-length:"))
                .and_then(|value| value.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if request.len() >= end + 4 + length {
                break;
            }
        }
    }

    socket
        .write_all(b"HTTP/1.1 500 Internal Server Error\r\ncontent-length: 64\r\n\r\npartial")
        .await?;
    socket.shutdown().await
}

async fn fake_write(
    State(state): State<FakeState>,
    Query(query): Query<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, String) {
    let header_value = |name: header::HeaderName| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    state.received.lock().unwrap().push(ReceivedWrite {
        query,
        authorization: header_value(header::AUTHORIZATION),
        content_type: header_value(header::CONTENT_TYPE),
        body,
    });

    let status = *state.status.lock().unwrap();
    if status == StatusCode::NO_CONTENT {
        (status, String::new())
    } else {
        (
            status,
            r#"{"code":"invalid","message":"batch rejected by fake server"}"#.to_string(),
        )
    }
}
