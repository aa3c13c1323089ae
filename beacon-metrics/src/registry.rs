//! Collection of configured beacon clients.

use std::fmt;

use crate::client::BeaconClient;
use crate::clock::{Clock, SystemClock};
use crate::config::{BeaconConfig, PollingConfig};
use crate::error::BeaconError;
use crate::gateway::{Gateway, HttpGateway};

/// HTTP-backed registry used by the binaries.
pub type HttpBeaconClients = BeaconClients<HttpGateway, SystemClock>;

/// Clients registered from a list of base URLs.
///
/// Registration fetches the chain spec of the node; a client is only added
/// once that fetch succeeded.
pub struct BeaconClients<G = HttpGateway, C = SystemClock> {
    clients: Vec<BeaconClient<G, C>>,
    clock: C,
    polling: PollingConfig,
}

impl<G: Gateway, C: Clock + Clone> BeaconClients<G, C> {
    pub fn new(clock: C, polling: PollingConfig) -> Self {
        Self {
            clients: Vec::new(),
            clock,
            polling,
        }
    }

    /// Registers the node at `base_url`, building its gateway with `open`.
    ///
    /// Exactly one trailing slash is stripped from `base_url` before it is
    /// handed to `open`.
    pub fn add_with<F>(&mut self, base_url: &str, open: F) -> Result<&BeaconClient<G, C>, BeaconError>
    where
        F: FnOnce(String) -> Result<G, BeaconError>,
    {
        if base_url.is_empty() {
            return Err(BeaconError::Config("empty beacon base URL".to_string()));
        }
        let base_url = base_url.strip_suffix('/').unwrap_or(base_url);

        let gateway = open(base_url.to_string())?;
        let client = BeaconClient::connect(gateway, self.clock.clone(), self.polling)?;
        tracing::info!(base_url, "registered beacon client");

        self.clients.push(client);
        let index = self.clients.len() - 1;
        Ok(&self.clients[index])
    }

    pub fn get(&self, index: usize) -> Option<&BeaconClient<G, C>> {
        self.clients.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &BeaconClient<G, C>> {
        self.clients.iter()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Base URLs of all registered clients, in registration order.
    pub fn base_urls(&self) -> Vec<String> {
        self.clients.iter().map(|c| c.base_url().to_string()).collect()
    }
}

impl BeaconClients<HttpGateway, SystemClock> {
    /// Registers every node in `config` over HTTP.
    ///
    /// Fails on the first node whose registration fails.
    pub fn connect(config: &BeaconConfig, polling: PollingConfig) -> Result<Self, BeaconError> {
        let mut clients = Self::new(SystemClock, polling);
        for url in &config.base_urls {
            clients.add(url, config)?;
        }
        Ok(clients)
    }

    /// Registers a single node over HTTP.
    pub fn add(
        &mut self,
        base_url: &str,
        config: &BeaconConfig,
    ) -> Result<&BeaconClient<HttpGateway, SystemClock>, BeaconError> {
        let timeout = config.request_timeout;
        self.add_with(base_url, |url| HttpGateway::new(url, timeout))
    }
}

impl<G: Gateway, C: Clock + Clone> fmt::Display for BeaconClients<G, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.base_urls().join(","))
    }
}
