use std::fmt::Debug;
use std::fs;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Certificate, Identity};
use serde_json::Value;

use crate::common::{error_chain, GatewayError, GatewayResult};
use crate::config::BackendConfig;

/// Raw answer of the CA backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendResponse {
    pub status: u16,
    pub body: String,
}

impl BackendResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Returns the body of a 2xx response, any other status becomes a backend error.
    pub fn into_success_body(self) -> GatewayResult<String> {
        if self.is_success() {
            Ok(self.body)
        } else {
            Err(GatewayError::Backend {
                status: self.status,
                body: self.body,
            })
        }
    }
}

/// Access to the CA backend over an already established secure channel
///
/// Implementations must be usable from several tool calls at once. Connectivity
/// problems and timeouts are reported as `GatewayError::Transport`.
pub trait Fetcher: Debug + Send + Sync {
    fn get(&self, url: &str) -> GatewayResult<BackendResponse>;

    fn post(&self, url: &str, body: &Value) -> GatewayResult<BackendResponse>;
}

/// Mutual TLS fetcher built on a pooled blocking reqwest client.
#[derive(Debug)]
pub struct TlsFetcher {
    client: Client,
}

impl TlsFetcher {
    pub fn new(config: &BackendConfig) -> GatewayResult<Self> {
        let mut identity_pem = read_pem(&config.client_certificate, "client certificate")?;
        identity_pem.extend(read_pem(&config.client_key, "client key")?);
        let identity = Identity::from_pem(&identity_pem)
            .map_err(|e| GatewayError::Configuration(format!("invalid client identity: {}", error_chain(&e))))?;
        let trust_anchor = Certificate::from_pem(&read_pem(&config.trust_anchor, "trust anchor")?)
            .map_err(|e| GatewayError::Configuration(format!("invalid trust anchor: {}", error_chain(&e))))?;

        let client = Client::builder()
            .use_rustls_tls()
            .tls_built_in_root_certs(false)
            .add_root_certificate(trust_anchor)
            .identity(identity)
            .timeout(config.timeout_secs.map(Duration::from_secs))
            .build()
            .map_err(|e| GatewayError::Configuration(format!("cannot build TLS client: {}", error_chain(&e))))?;
        log::info!("Mutual TLS client ready for {}", config.url);
        Ok(Self { client })
    }

    fn send(&self, method: &str, url: &str, request: reqwest::blocking::RequestBuilder) -> GatewayResult<BackendResponse> {
        let response = request.send().map_err(|e| transport_error(method, url, e))?;
        let status = response.status().as_u16();
        let body = response.text().map_err(|e| transport_error(method, url, e))?;
        log::debug!("{} {} answered with status {}", method, url, status);
        Ok(BackendResponse::new(status, body))
    }
}

impl Fetcher for TlsFetcher {
    fn get(&self, url: &str) -> GatewayResult<BackendResponse> {
        self.send("GET", url, self.client.get(url).header(ACCEPT, "application/json, text/plain, */*"))
    }

    fn post(&self, url: &str, body: &Value) -> GatewayResult<BackendResponse> {
        let request = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .body(body.to_string());
        self.send("POST", url, request)
    }
}

fn read_pem(path: &str, what: &str) -> GatewayResult<Vec<u8>> {
    fs::read(path).map_err(|e| GatewayError::Configuration(format!("cannot read {} '{}': {}", what, path, e)))
}

// Embeds the request url as given, reqwest's own copy is stripped.
fn transport_error(method: &str, url: &str, error: reqwest::Error) -> GatewayError {
    let error = error.without_url();
    log::error!("{} {} failed: {:?}", method, url, error);
    GatewayError::Transport(format!("I/O error on {} request for \"{}\": {}", method, url, error_chain(&error)))
}
