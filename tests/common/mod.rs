//! Shared fixtures for the integration tests.
//!
//! Provides a lookup-backed [`Config`], a scripted [`RecordSource`] that
//! records every endpoint it is asked for, a canned-response HTTP server,
//! and helpers for building raw records from `serde_json::json!` literals.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use orders_sheets_sync::{Config, RawRecord, RecordSource, Result, SyncError};
use serde_json::Value;

pub const ORDERS_URL: &str = "https://api.example.test/orders.json";
pub const INVENTORY_URL: &str = "https://api.example.test/inventory.json";
pub const SHEET: &str = "ops-dashboard";

/// Minimal valid environment: the three required keys plus zero retry delay.
pub fn base_env() -> HashMap<String, String> {
    HashMap::from([
        ("ORDERS_API_URL".to_string(), ORDERS_URL.to_string()),
        ("INVENTORY_API_URL".to_string(), INVENTORY_URL.to_string()),
        ("SHEET_NAME".to_string(), SHEET.to_string()),
        ("RETRY_DELAY".to_string(), "0".to_string()),
    ])
}

pub fn config_from(env: &HashMap<String, String>) -> Result<Config> {
    Config::from_lookup(|key| env.get(key).cloned())
}

pub fn test_config() -> Config {
    config_from(&base_env()).unwrap()
}

/// Turn a `json!` array of objects into raw records.
pub fn raw_records(value: Value) -> Vec<RawRecord> {
    value
        .as_array()
        .expect("fixture must be an array")
        .iter()
        .map(|v| v.as_object().expect("fixture items must be objects").clone())
        .collect()
}

/// A [`RecordSource`] with canned responses per endpoint.
#[derive(Default)]
pub struct FakeSource {
    responses: HashMap<String, std::result::Result<Vec<RawRecord>, String>>,
    pub calls: RefCell<Vec<String>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, endpoint: &str, body: Value) -> Self {
        self.responses
            .insert(endpoint.to_string(), Ok(raw_records(body)));
        self
    }

    pub fn fail(mut self, endpoint: &str, error: &str) -> Self {
        self.responses
            .insert(endpoint.to_string(), Err(error.to_string()));
        self
    }
}

impl RecordSource for FakeSource {
    fn fetch_records(&self, endpoint: &str) -> Result<Vec<RawRecord>> {
        self.calls.borrow_mut().push(endpoint.to_string());
        match self.responses.get(endpoint) {
            Some(Ok(records)) => Ok(records.clone()),
            Some(Err(e)) => Err(SyncError::Fetch {
                endpoint: endpoint.to_string(),
                attempts: 3,
                last_error: e.clone(),
            }),
            None => Err(SyncError::Fetch {
                endpoint: endpoint.to_string(),
                attempts: 1,
                last_error: "no canned response".to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// StubServer
// ---------------------------------------------------------------------------

/// HTTP server on a loopback port that answers every request with the same
/// status and body, counting the requests it serves.
pub struct StubServer {
    addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl StubServer {
    pub fn start(status: u16, body: &'static str) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind");
        let addr = listener.local_addr().expect("failed to get addr");
        let hits = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&hits);
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                counter.fetch_add(1, Ordering::SeqCst);
                respond(stream, status, body);
            }
        });

        Self { addr, hits }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

fn respond(mut stream: TcpStream, status: u16, body: &str) {
    read_request(&mut stream);

    let reason = match status {
        200 => "OK",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        reason,
        body.len(),
        body
    );
    let _ = stream.write_all(response.as_bytes());
    let _ = stream.flush();
}

/// Consume one request (head plus `Content-Length` body) from the stream.
fn read_request(stream: &mut TcpStream) {
    let mut request = Vec::new();
    let mut buf = [0u8; 4096];
    let head_end = loop {
        if let Some(pos) = request.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    };

    let head = String::from_utf8_lossy(&request[..head_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);
    while request.len() < head_end + content_length {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => return,
            Ok(n) => request.extend_from_slice(&buf[..n]),
        }
    }
}
