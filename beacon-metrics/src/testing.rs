//! In-memory gateway used by unit tests.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::BeaconError;
use crate::gateway::Gateway;

/// Gateway serving canned `data` payloads keyed by request path.
///
/// Paths without a canned payload fail like a 404 from a real node.
#[derive(Debug, Default)]
pub struct FakeGateway {
    base_url: String,
    routes: Mutex<HashMap<String, Result<Value, String>>>,
    hits: Mutex<HashMap<String, usize>>,
}

impl FakeGateway {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.to_string(),
            ..Self::default()
        }
    }

    /// Serves `data` for `path` from now on.
    pub fn serve(&self, path: impl Into<String>, data: Value) {
        self.routes.lock().unwrap().insert(path.into(), Ok(data));
    }

    /// Fails every request for `path` with a remote error.
    pub fn fail(&self, path: impl Into<String>, message: &str) {
        self.routes
            .lock()
            .unwrap()
            .insert(path.into(), Err(message.to_string()));
    }

    /// Number of requests issued for `path`.
    pub fn hits(&self, path: &str) -> usize {
        self.hits.lock().unwrap().get(path).copied().unwrap_or(0)
    }
}

impl Gateway for FakeGateway {
    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, BeaconError> {
        *self.hits.lock().unwrap().entry(path.to_string()).or_default() += 1;
        let route = self.routes.lock().unwrap().get(path).cloned();
        match route {
            Some(Ok(data)) => Ok(serde_json::from_value(data)?),
            Some(Err(message)) => Err(BeaconError::Remote(message)),
            None => Err(BeaconError::Remote(format!("{path} not found"))),
        }
    }
}
