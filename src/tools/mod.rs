//! # Tool Handlers
//!
//! One method of `CaGateway` per tool. Every handler follows the same pipeline:
//! validate the caller input, build the backend URL (and body), call the `Fetcher`,
//! interpret the answer and shape the typed result.
//!
//! Backend failures are handled per tool:
//!
//! | tool                               | on backend failure                 |
//! |------------------------------------|------------------------------------|
//! | `create_crl`                       | propagated                         |
//! | `get_available_cas`                | empty list + sanitized message     |
//! | `get_ca_certificate`               | sanitized message, no chain        |
//! | `get_certificate_profile`          | sanitized message as the result    |
//! | `get_certificates_about_to_expire` | propagated                         |
//! | `get_count_certificates`           | propagated                         |
//! | `get_latest_crl`                   | propagated                         |
//! | `enroll_certificate_with_csr`      | sanitized message + cause chain    |
//! | `revoke_certificate`               | fixed "could not be revoked" shape |
//!
//! Validation failures always abort the call before the backend is contacted.

pub mod ca;
pub mod certificate;
pub mod pki;

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::common::{GatewayError, GatewayResult};
use crate::config::{GatewayConfig, Limits};
use crate::fetcher::Fetcher;
use crate::sanitizer::sanitize;
use crate::validation::ValidatedInput;

/// Characters escaped when a caller value becomes one URL path segment.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'\\')
    .add(b'%')
    .add(b'[')
    .add(b']')
    .add(b'^')
    .add(b'|');

/// Validation and translation layer in front of the CA backend
#[derive(Debug, Clone)]
pub struct CaGateway {
    fetcher: Arc<dyn Fetcher>,
    base_url: String,
    limits: Limits,
}

impl CaGateway {
    pub fn new(fetcher: Arc<dyn Fetcher>, config: &GatewayConfig) -> Self {
        Self {
            fetcher,
            base_url: config.base_url(),
            limits: config.limits.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    fn url(&self, path_and_query: &str) -> String {
        let url = format!("{}{}", self.base_url, path_and_query);
        log::debug!("Requested URL: {}", url);
        url
    }

    /// Percent-encodes a validated value so it stays a single path segment
    ///
    /// `.` and `..` are rejected, URL parsers resolve them even when escaped.
    fn segment(&self, field: &str, value: &ValidatedInput) -> GatewayResult<String> {
        if matches!(value.as_str(), "." | "..") {
            return Err(GatewayError::invalid_params(
                format!("Invalid path segment ({}).", field),
                field,
                value.as_str(),
            ));
        }
        Ok(utf8_percent_encode(value.as_str(), PATH_SEGMENT).to_string())
    }

    fn sanitize(&self, text: &str) -> String {
        sanitize(text, &self.base_url)
    }

    fn get_text(&self, url: &str) -> GatewayResult<String> {
        self.fetcher.get(url)?.into_success_body()
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> GatewayResult<T> {
        let body = self.get_text(url)?;
        Ok(serde_json::from_str(&body)?)
    }

    fn post_json<T: DeserializeOwned>(&self, url: &str, body: &Value) -> GatewayResult<T> {
        let body = self.fetcher.post(url, body)?.into_success_body()?;
        Ok(serde_json::from_str(&body)?)
    }
}

/// Accepts strings, numbers or booleans where the backend is not consistent about
/// the JSON type of a textual field.
pub(crate) fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(other) => Some(other.to_string()),
    })
}
