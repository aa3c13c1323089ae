//! HTTP gateway to a beacon node.
//!
//! Uses the blocking `reqwest` client. Every request holds the gateway's
//! mutex for its whole round trip, so concurrent callers on the same
//! gateway are served one at a time in lock-acquisition order. Each request
//! carries its own timeout which ends with the request; nothing from one
//! call outlives it or affects the next.

use std::sync::Mutex;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::de::DeserializeOwned;

use super::{Gateway, decode_envelope};
use crate::error::BeaconError;

const JSON_UTF8: &str = "application/json; charset=utf-8";

/// Default per-request timeout.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP implementation of [`Gateway`].
///
/// This client is `Send + Sync` and can be shared across threads; higher
/// layers running on a Tokio runtime must call it from blocking tasks.
pub struct HttpGateway {
    base_url: String,
    client: Client,
    timeout: Duration,
    in_flight: Mutex<()>,
}

impl HttpGateway {
    /// Constructs a gateway pointing at `base_url`.
    ///
    /// `base_url` is used verbatim; trailing-slash normalisation is the
    /// registry's job.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, BeaconError> {
        let client = Client::builder()
            .build()
            .map_err(|e| BeaconError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into(),
            client,
            timeout,
            in_flight: Mutex::new(()),
        })
    }

    /// Per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Gateway for HttpGateway {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BeaconError> {
        // A poisoned lock only means another request panicked; the guarded
        // unit value carries no state worth discarding.
        let _guard = self
            .in_flight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let url = self.endpoint(path);
        tracing::debug!(%url, "beacon request");

        let resp = self
            .client
            .get(&url)
            .header(CONTENT_TYPE, JSON_UTF8)
            .header(ACCEPT, JSON_UTF8)
            .timeout(self.timeout)
            .send()?;

        let status = resp.status().as_u16();
        let body = resp.bytes()?;

        decode_envelope(status, &body)
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;

    use super::*;

    /// Serves `{"data": 1}` to every request after holding it for `hold`,
    /// tracking how many requests were being served at once.
    fn slow_node(hold: Duration) -> (String, Arc<AtomicUsize>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let active = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let peak_out = peak.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { break };
                let active = active.clone();
                let peak = peak.clone();
                thread::spawn(move || serve_slowly(stream, hold, &active, &peak));
            }
        });
        (format!("http://{addr}"), peak_out)
    }

    fn serve_slowly(mut stream: TcpStream, hold: Duration, active: &AtomicUsize, peak: &AtomicUsize) {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 1024];
        while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
            match stream.read(&mut chunk) {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&chunk[..n]),
            }
        }

        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        thread::sleep(hold);
        active.fetch_sub(1, Ordering::SeqCst);

        let body = r#"{"data":1}"#;
        let resp = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        let _ = stream.write_all(resp.as_bytes());
    }

    #[test]
    fn concurrent_callers_are_served_one_at_a_time() {
        let (base_url, peak) = slow_node(Duration::from_millis(200));
        let gw = Arc::new(HttpGateway::new(base_url, DEFAULT_REQUEST_TIMEOUT).unwrap());

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gw = gw.clone();
                thread::spawn(move || gw.get::<u64>("/eth/v1/beacon/genesis"))
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap().unwrap(), 1);
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn endpoint_appends_path_to_base() {
        let gw = HttpGateway::new("http://127.0.0.1:5052", DEFAULT_REQUEST_TIMEOUT).unwrap();
        assert_eq!(
            gw.endpoint("/eth/v1/beacon/genesis"),
            "http://127.0.0.1:5052/eth/v1/beacon/genesis"
        );
        assert_eq!(gw.base_url(), "http://127.0.0.1:5052");
        assert_eq!(gw.timeout(), DEFAULT_REQUEST_TIMEOUT);
    }

    #[test]
    fn unreachable_node_is_a_transport_error() {
        // Port 9 (discard) on localhost is not expected to run an HTTP server.
        let gw = HttpGateway::new("http://127.0.0.1:9", Duration::from_millis(500)).unwrap();
        let err = gw
            .get::<serde_json::Value>("/eth/v1/beacon/genesis")
            .unwrap_err();
        assert!(matches!(err, BeaconError::Transport(_)), "got {err:?}");
    }
}
