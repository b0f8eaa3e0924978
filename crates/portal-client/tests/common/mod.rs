//! Shared test fixtures: a loopback HTTP server with canned responses,
//! scripted station issuers, and test logging.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use portal_client::{ClientHints, IssueError, StationId, StationIssuer};

/// Route `tracing` output through the test harness. `RUST_LOG` picks levels.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

// ============================================================================
// Canned HTTP server
// ============================================================================

#[derive(Clone, Debug)]
pub struct CannedResponse {
    pub status: u16,
    pub body: String,
    pub delay: Duration,
}

impl CannedResponse {
    pub fn json(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: Duration::ZERO,
        }
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// A recorded request: the request line plus lowercased header pairs.
#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub line: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }
}

pub struct CannedServer {
    pub base: String,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl CannedServer {
    /// Serve `responses` in order; once exhausted, the last one repeats.
    pub async fn start(responses: Vec<CannedResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let queue = Arc::new(Mutex::new(VecDeque::from(responses)));

        let recorded = requests.clone();
        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                let response = {
                    let mut q = queue.lock();
                    if q.len() > 1 {
                        q.pop_front()
                    } else {
                        q.front().cloned()
                    }
                };
                let Some(response) = response else { break };
                let recorded = recorded.clone();
                tokio::spawn(async move {
                    handle(socket, response, recorded).await;
                });
            }
        });

        Self {
            base: format!("http://{addr}/api"),
            requests,
        }
    }

    pub fn hits(&self) -> usize {
        self.requests.lock().len()
    }

    pub fn request(&self, i: usize) -> RecordedRequest {
        self.requests.lock()[i].clone()
    }
}

async fn handle(
    mut socket: TcpStream,
    response: CannedResponse,
    recorded: Arc<Mutex<Vec<RecordedRequest>>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        let n = match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);
    while buf.len() < head_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => break,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let body = String::from_utf8_lossy(&buf[head_end..]).to_string();

    recorded.lock().push(RecordedRequest { line, headers, body });

    if !response.delay.is_zero() {
        tokio::time::sleep(response.delay).await;
    }

    let reply = format!(
        "HTTP/1.1 {} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        response.status,
        response.body.len(),
        response.body
    );
    let _ = socket.write_all(reply.as_bytes()).await;
    let _ = socket.shutdown().await;
}

// ============================================================================
// Scripted issuer
// ============================================================================

/// Issuer that replays a script of outcomes and counts calls.
pub struct ScriptedIssuer {
    pub calls: AtomicUsize,
    script: Mutex<VecDeque<Result<&'static str, &'static str>>>,
    delay: Duration,
}

impl ScriptedIssuer {
    pub fn new(script: Vec<Result<&'static str, &'static str>>) -> Arc<Self> {
        Self::with_delay(script, Duration::ZERO)
    }

    pub fn with_delay(
        script: Vec<Result<&'static str, &'static str>>,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            script: Mutex::new(script.into()),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StationIssuer for ScriptedIssuer {
    async fn issue(&self, _hints: &ClientHints) -> Result<StationId, IssueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self.script.lock().pop_front();
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match next {
            Some(Ok(raw)) => Ok(StationId::parse(raw)?),
            Some(Err(msg)) => Err(IssueError::Transport(msg.to_string())),
            None => Err(IssueError::Transport("script exhausted".to_string())),
        }
    }
}

/// Issuer whose attempt panics after `delay`.
pub struct PanickingIssuer {
    pub calls: AtomicUsize,
    delay: Duration,
}

impl PanickingIssuer {
    pub fn new(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StationIssuer for PanickingIssuer {
    async fn issue(&self, _hints: &ClientHints) -> Result<StationId, IssueError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        panic!("issuer backend blew up");
    }
}
