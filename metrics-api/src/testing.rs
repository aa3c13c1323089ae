//! Helpers for exercising the handlers against a local beacon node stub.

use std::future::Future;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use beacon_metrics::{BeaconConfig, HttpBeaconClients, MetricsRegistry, PollingConfig, SystemClock};

use crate::state::{AppState, SharedState};

pub const GENESIS_TIME: u64 = 1_000;
pub const SECONDS_PER_SLOT: u64 = 12;

/// Runs `fut` to completion on a fresh runtime.
///
/// Handler state holds blocking HTTP clients, so it must be built and
/// dropped outside of the runtime; only the handler future runs inside.
pub fn block_on<F: Future>(fut: F) -> F::Output {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .unwrap()
        .block_on(fut)
}

/// State with `n` clients, each registered against its own stub node.
pub fn state_with_clients(n: usize) -> SharedState {
    let config = BeaconConfig::default();
    let mut clients = HttpBeaconClients::new(SystemClock, PollingConfig::default());
    for _ in 0..n {
        clients.add(&stub_node(), &config).unwrap();
    }
    Arc::new(AppState {
        clients: Arc::new(clients),
        metrics: Arc::new(MetricsRegistry::new().unwrap()),
    })
}

/// Starts a node answering the spec and genesis endpoints; anything else
/// is a 404 error envelope.
fn stub_node() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        for stream in listener.incoming() {
            let Ok(stream) = stream else { break };
            answer(stream);
        }
    });
    format!("http://{addr}")
}

fn answer(mut stream: TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
    let request = String::from_utf8_lossy(&buf);
    let path = request.split_whitespace().nth(1).unwrap_or("");

    let (status, body) = match path {
        "/eth/v1/config/spec" => (
            "200 OK",
            format!(
                r#"{{"data":{{"SECONDS_PER_SLOT":"{SECONDS_PER_SLOT}","SLOTS_PER_EPOCH":"32"}}}}"#
            ),
        ),
        "/eth/v1/beacon/genesis" => (
            "200 OK",
            format!(r#"{{"data":{{"genesis_time":"{GENESIS_TIME}"}}}}"#),
        ),
        _ => (
            "404 Not Found",
            r#"{"code":404,"message":"not found"}"#.to_string(),
        ),
    };
    let resp = format!(
        "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(resp.as_bytes());
}
