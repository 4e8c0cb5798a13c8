use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{lenient_string, CaGateway};
use crate::common::{GatewayResult, NULL_CRL, PEM_RESPONSE_FORMAT};
use crate::pem::to_pem_crl;
use crate::validation::{assert_valid_dn, is_valid_pem};

/// Error reported when the certificate download answered with a JSON document.
pub const CA_CHAIN_NOT_FOUND: &str = "CA certificate chain was not found.";
pub const CA_CHAIN_NOT_FOUND_CODE: &str = "400";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CreateCrlResponse {
    pub issuer_dn: Option<String>,
    pub latest_crl_version: i64,
    pub all_success: bool,
    #[serde(deserialize_with = "lenient_string")]
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GetAvailableCasResponse {
    pub certificate_authorities: Vec<CaResponse>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CaResponse {
    pub id: i64,
    pub name: Option<String>,
    pub subject_dn: Option<String>,
    pub issuer_dn: Option<String>,
    pub expiration_date: Option<String>,
    pub external: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GetCaCertificateResponse {
    pub ca_chain: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GetLatestCrlResponse {
    pub crl: String,
    pub response_format: String,
}

impl GetLatestCrlResponse {
    /// Result used whenever no usable CRL could be obtained.
    pub fn none() -> Self {
        Self {
            crl: NULL_CRL.into(),
            response_format: PEM_RESPONSE_FORMAT.into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct LatestCrlPayload {
    crl: Option<String>,
}

impl CaGateway {
    /// Asks the backend to issue a new full CRL for the given CA.
    pub fn create_crl(&self, issuer_dn: &str) -> GatewayResult<CreateCrlResponse> {
        let issuer_dn = assert_valid_dn(issuer_dn, self.limits.dn)?;
        let url = self.url(&format!(
            "/v1/ca/{}/createcrl?deltacrl=false",
            self.segment("issuer_dn", &issuer_dn)?
        ));
        self.post_json(&url, &json!({}))
    }

    /// Lists the CAs known to the backend
    ///
    /// Backend failures never escape this call, they turn into an empty list with a
    /// sanitized explanation.
    pub fn get_available_cas(&self, external: bool) -> GetAvailableCasResponse {
        let url = self.url(&format!("/v1/ca?includeExternal={}", external));
        match self.get_json::<GetAvailableCasResponse>(&url) {
            Ok(payload) => {
                for ca in &payload.certificate_authorities {
                    log::debug!(
                        "CA: {}, expires at {}.",
                        ca.name.as_deref().unwrap_or_default(),
                        ca.expiration_date.as_deref().unwrap_or_default()
                    );
                }
                payload
            }
            Err(e) => GetAvailableCasResponse {
                certificate_authorities: Vec::new(),
                error_message: Some(self.sanitize(&e.to_string())),
            },
        }
    }

    /// Downloads the PEM chain of a CA
    ///
    /// The download endpoint answers with plain PEM text on success and with a JSON
    /// document on failure, so any body that parses as JSON is reported as "not found".
    pub fn get_ca_certificate(&self, subject_dn: &str) -> GatewayResult<GetCaCertificateResponse> {
        let subject_dn = assert_valid_dn(subject_dn, self.limits.dn)?;
        let url = self.url(&format!(
            "/v1/ca/{}/certificate/download",
            self.segment("subject_dn", &subject_dn)?
        ));
        let payload = match self.get_text(&url) {
            Ok(payload) => payload,
            Err(e) => {
                return Ok(GetCaCertificateResponse {
                    ca_chain: None,
                    error_code: None,
                    error_message: Some(self.sanitize(&e.to_string())),
                })
            }
        };
        log::debug!("Got CA certificate chain for {}: {}", subject_dn, payload);
        if let Ok(error) = serde_json::from_str::<serde_json::Value>(&payload) {
            log::warn!("Error: {}", error);
            return Ok(GetCaCertificateResponse {
                ca_chain: None,
                error_code: Some(CA_CHAIN_NOT_FOUND_CODE.into()),
                error_message: Some(CA_CHAIN_NOT_FOUND.into()),
            });
        }
        Ok(GetCaCertificateResponse {
            ca_chain: Some(payload),
            error_code: None,
            error_message: None,
        })
    }

    /// Fetches the latest full CRL of a CA as PEM, or the `"null"` sentinel.
    pub fn get_latest_crl(&self, issuer_dn: &str) -> GatewayResult<GetLatestCrlResponse> {
        let issuer_dn = assert_valid_dn(issuer_dn, self.limits.dn)?;
        let url = self.url(&format!(
            "/v1/ca/{}/getLatestCrl?deltaCrl=false&crlPartitionIndex=0",
            self.segment("issuer_dn", &issuer_dn)?
        ));
        let payload: LatestCrlPayload = self.get_json(&url)?;
        let Some(crl) = payload.crl.filter(|crl| !crl.eq_ignore_ascii_case(NULL_CRL)) else {
            return Ok(GetLatestCrlResponse::none());
        };
        let pem = to_pem_crl(&crl);
        if !is_valid_pem(&pem, self.limits.pem) {
            log::warn!("Latest CRL of {} is not valid PEM.", issuer_dn);
            return Ok(GetLatestCrlResponse::none());
        }
        Ok(GetLatestCrlResponse {
            crl: pem,
            response_format: PEM_RESPONSE_FORMAT.into(),
        })
    }
}
