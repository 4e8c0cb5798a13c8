//! # Gateway Configuration
//!
//! The configuration is read once at startup from a YAML document and stays read-only
//! for the lifetime of the process. It is made of three sections:
//! - `backend`: where the CA REST API lives and the mutual TLS material to reach it
//! - `limits`: the bounds and alphabets the field validators enforce
//! - `tools`: one flag per tool, only enabled tools are registered
//!
//! ```yaml
//! backend:
//!   url: https://ca.internal:8443/ejbca/ejbca-rest-api
//!   client_certificate: /etc/mcpki/client.pem
//!   client_key: /etc/mcpki/client.key
//!   trust_anchor: /etc/mcpki/management-ca.pem
//! limits:
//!   serial_number_hex_length: 40
//! tools:
//!   get_available_cas: true
//!   parse_certificate: true
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::common::{GatewayError, GatewayResult};
use crate::validation::LengthBounds;

/// Default alphabet for end entity and revocation passwords.
pub const DEFAULT_PASSWORD_ALPHABET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!#$%&()*+,-./:;<=>?@[]^_{|}~";
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    pub backend: BackendConfig,
    #[serde(default)]
    pub limits: Limits,
    #[serde(default)]
    pub tools: ToolToggles,
}

/// Location of the CA REST API and the material of the mutual TLS channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL every request path is appended to.
    pub url: String,
    /// PEM file with the client certificate.
    pub client_certificate: String,
    /// PEM file with the private key of the client certificate.
    pub client_key: String,
    /// PEM file with the certificate that anchors the backend's server certificate.
    pub trust_anchor: String,
    #[serde(default = "default_timeout")]
    pub timeout_secs: Option<u64>,
}

fn default_timeout() -> Option<u64> {
    Some(DEFAULT_TIMEOUT_SECS)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    pub dn: LengthBounds,
    pub name: LengthBounds,
    pub email: LengthBounds,
    pub pem: LengthBounds,
    pub password: LengthBounds,
    pub serial_number_hex_length: usize,
    pub password_allowed_characters: String,
    /// Ceiling applied to the page size of the expiring certificates listing.
    pub expire_max_items: u32,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            dn: LengthBounds::new(3, 256),
            name: LengthBounds::new(1, 64),
            email: LengthBounds::new(6, 254),
            pem: LengthBounds::new(64, 16384),
            password: LengthBounds::new(8, 64),
            serial_number_hex_length: 40,
            password_allowed_characters: DEFAULT_PASSWORD_ALPHABET.into(),
            expire_max_items: 100,
        }
    }
}

/// Per tool registration switches, all disabled unless configured.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolToggles {
    pub create_crl: bool,
    pub get_available_cas: bool,
    pub get_ca_certificate: bool,
    pub get_certificate_profile: bool,
    pub get_certificates_about_to_expire: bool,
    pub get_count_certificates: bool,
    pub get_latest_crl: bool,
    pub enroll_certificate_with_csr: bool,
    pub revoke_certificate: bool,
    pub parse_certificate: bool,
}

impl ToolToggles {
    pub fn all_enabled() -> Self {
        Self {
            create_crl: true,
            get_available_cas: true,
            get_ca_certificate: true,
            get_certificate_profile: true,
            get_certificates_about_to_expire: true,
            get_count_certificates: true,
            get_latest_crl: true,
            enroll_certificate_with_csr: true,
            revoke_certificate: true,
            parse_certificate: true,
        }
    }
}

impl GatewayConfig {
    /// Loads and validates the configuration stored at `path`.
    pub fn load(path: impl AsRef<Path>) -> GatewayResult<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|e| {
            GatewayError::Configuration(format!("cannot read '{}': {}", path.display(), e))
        })?;
        let config = Self::from_yaml(&contents)?;
        log::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn from_yaml(contents: &str) -> GatewayResult<Self> {
        let config: Self = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects configurations the gateway cannot safely run with.
    pub fn validate(&self) -> GatewayResult<()> {
        let url = self.backend.url.trim();
        if url.is_empty() {
            return Err(GatewayError::Configuration("backend.url is empty".into()));
        }
        let parsed = reqwest::Url::parse(url)
            .map_err(|e| GatewayError::Configuration(format!("backend.url is invalid: {}", e)))?;
        if !matches!(parsed.scheme(), "https" | "http") {
            return Err(GatewayError::Configuration(format!(
                "backend.url has unsupported scheme '{}'",
                parsed.scheme()
            )));
        }
        for (field, value) in [
            ("backend.client_certificate", &self.backend.client_certificate),
            ("backend.client_key", &self.backend.client_key),
            ("backend.trust_anchor", &self.backend.trust_anchor),
        ] {
            if value.trim().is_empty() {
                return Err(GatewayError::Configuration(format!("{} is empty", field)));
            }
        }
        for (field, bounds) in [
            ("limits.dn", self.limits.dn),
            ("limits.name", self.limits.name),
            ("limits.email", self.limits.email),
            ("limits.pem", self.limits.pem),
            ("limits.password", self.limits.password),
        ] {
            if bounds.min > bounds.max {
                return Err(GatewayError::Configuration(format!("{} has min above max: {}", field, bounds)));
            }
        }
        if self.limits.serial_number_hex_length == 0 {
            return Err(GatewayError::Configuration("limits.serial_number_hex_length must be positive".into()));
        }
        if self.limits.password_allowed_characters.is_empty() {
            return Err(GatewayError::Configuration("limits.password_allowed_characters is empty".into()));
        }
        if self.limits.expire_max_items == 0 {
            return Err(GatewayError::Configuration("limits.expire_max_items must be positive".into()));
        }
        Ok(())
    }

    /// Base URL without trailing slashes, as it appears in every request URL.
    pub fn base_url(&self) -> String {
        self.backend.url.trim().trim_end_matches('/').into()
    }
}
