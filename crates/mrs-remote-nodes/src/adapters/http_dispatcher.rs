//! HTTP Request Dispatcher
//!
//! Implements `RequestDispatcher` against the node JSON API:
//! `GET <scheme>://<host>:<port><api_path>?requestType=<type>&...`, or a
//! form POST for mutating requests.

use async_trait::async_trait;
use reqwest::{Client, Proxy};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::Ipv6Addr;
use std::time::Duration;
use tracing::debug;

use crate::domain::{base_request_type, requires_post, ConfirmationError, RemoteNode};
use crate::ports::outbound::{RequestDispatcher, RequestParams, SendOptions};

/// Default API port of MRS nodes.
pub const DEFAULT_API_PORT: u16 = 7876;

/// HTTP transport configuration.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct HttpConfig {
    /// Path of the JSON API on every node.
    pub api_path: String,
    /// Port used for nodes that do not announce one.
    pub default_api_port: u16,
    /// Use https instead of http.
    pub use_https: bool,
    /// Proxy URL for requests that do not bypass it.
    pub proxy: Option<String>,
    /// Whole-request timeout.
    pub timeout_secs: u64,
    /// Connect timeout.
    pub connect_timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            api_path: "/mrs".to_string(),
            default_api_port: DEFAULT_API_PORT,
            use_https: false,
            proxy: None,
            timeout_secs: 30,
            connect_timeout_secs: 5,
        }
    }
}

impl HttpConfig {
    /// API endpoint of a node.
    ///
    /// # Errors
    /// - `InvalidAddress` if no host can be taken from the node's address
    pub fn endpoint(&self, node: &RemoteNode) -> Result<String, ConfirmationError> {
        let scheme = if self.use_https { "https" } else { "http" };
        let port = node.api_port.unwrap_or(self.default_api_port);
        let host = api_host(node.host())?;
        Ok(format!("{scheme}://{host}:{port}{}", self.api_path))
    }
}

/// URL host of a peer address. Announced addresses may carry the peer port,
/// which is dropped; IPv6 hosts are bracketed.
fn api_host(address: &str) -> Result<String, ConfirmationError> {
    let invalid = || ConfirmationError::InvalidAddress(address.to_string());
    let address = address.trim();

    if let Some(rest) = address.strip_prefix('[') {
        let (ip, _port) = rest.split_once(']').ok_or_else(invalid)?;
        let ip: Ipv6Addr = ip.parse().map_err(|_| invalid())?;
        return Ok(format!("[{ip}]"));
    }

    match address.matches(':').count() {
        0 | 1 => {
            let host = address.split(':').next().unwrap_or_default();
            if host.is_empty() {
                Err(invalid())
            } else {
                Ok(host.to_string())
            }
        }
        _ => {
            let ip: Ipv6Addr = address.parse().map_err(|_| invalid())?;
            Ok(format!("[{ip}]"))
        }
    }
}

/// Dispatcher sending requests to the primary node or to any validator.
pub struct HttpDispatcher {
    config: HttpConfig,
    primary: RemoteNode,
    /// Client without proxy.
    direct: Client,
    /// Client routed through the configured proxy, if any.
    proxied: Option<Client>,
}

impl HttpDispatcher {
    /// Create a dispatcher whose default target is `primary`.
    ///
    /// # Errors
    /// - `InvalidConfig` if the proxy URL or the TLS backend is unusable
    pub fn new(config: HttpConfig, primary: RemoteNode) -> Result<Self, ConfirmationError> {
        let direct = Self::client_builder(&config)
            .no_proxy()
            .build()
            .map_err(|e| ConfirmationError::InvalidConfig(e.to_string()))?;

        let proxied = match &config.proxy {
            Some(url) => {
                let proxy = Proxy::all(url)
                    .map_err(|e| ConfirmationError::InvalidConfig(format!("proxy {url}: {e}")))?;
                Some(
                    Self::client_builder(&config)
                        .proxy(proxy)
                        .build()
                        .map_err(|e| ConfirmationError::InvalidConfig(e.to_string()))?,
                )
            }
            None => None,
        };

        Ok(Self {
            config,
            primary,
            direct,
            proxied,
        })
    }

    fn client_builder(config: &HttpConfig) -> reqwest::ClientBuilder {
        Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
    }

    fn client(&self, no_proxy: bool) -> &Client {
        match (&self.proxied, no_proxy) {
            (Some(proxied), false) => proxied,
            _ => &self.direct,
        }
    }
}

fn map_transport_error(node: &RemoteNode, e: reqwest::Error) -> ConfirmationError {
    if e.is_timeout() {
        ConfirmationError::Timeout(format!("{node}: {e}"))
    } else {
        ConfirmationError::NetworkError(format!("{node}: {e}"))
    }
}

#[async_trait]
impl RequestDispatcher for HttpDispatcher {
    async fn send(
        &self,
        request_type: &str,
        params: &RequestParams,
        options: &SendOptions,
    ) -> Result<Value, ConfirmationError> {
        let node = options.remote_node.as_ref().unwrap_or(&self.primary);
        let url = self.config.endpoint(node)?;
        let client = self.client(options.no_proxy);

        // The `+suffix` only selects client-side handling.
        let mut fields: Vec<(&str, &str)> = vec![("requestType", base_request_type(request_type))];
        fields.extend(params.iter().map(|(k, v)| (k.as_str(), v.as_str())));

        debug!(node = %node, request_type, "Sending node API request");

        let request = if requires_post(request_type) {
            client.post(&url).form(&fields)
        } else {
            client.get(&url).query(&fields)
        };

        let response = request
            .send()
            .await
            .map_err(|e| map_transport_error(node, e))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConfirmationError::NetworkError(format!(
                "{node}: HTTP {status}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(node, e))?;
        Ok(serde_json::from_str(&body)?)
    }
}
