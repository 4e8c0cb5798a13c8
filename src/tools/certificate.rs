use serde::{Deserialize, Serialize};
use serde_json::json;

use super::{lenient_string, CaGateway};
use crate::common::{GatewayResult, PEM_RESPONSE_FORMAT};
use crate::pem::to_pem_certificate;
use crate::validation::{
    assert_valid_dn, assert_valid_email, assert_valid_name, assert_valid_password, assert_valid_pem,
    assert_valid_revocation_reason, assert_valid_serial_number_hex, is_valid_pem,
};

pub const INVALID_CERTIFICATE_PEM: &str = "Certificate is invalid PEM format.";
/// Single answer for every failed revocation.
pub const REVOCATION_FAILED: &str = "Certificate could not be revoked. Either the certificate does not exist, \
the password is tampered or the revocation reason is invalid.";

/// Arguments of `enroll_certificate_with_csr`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentRequest {
    pub csr: String,
    pub certificate_profile_name: String,
    pub end_entity_profile_name: String,
    pub name_of_ca: String,
    pub username: String,
    pub password: String,
    pub email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnrollCertificateWithCsrResponse {
    pub certificate: Option<String>,
    pub serial_number: Option<String>,
    pub format: Option<String>,
    pub error_message: Option<String>,
}

impl EnrollCertificateWithCsrResponse {
    fn failure(message: String) -> Self {
        Self {
            error_message: Some(message),
            ..Self::default()
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct EnrollmentPayload {
    certificate: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    serial_number: Option<String>,
    error_message: Option<String>,
}

/// Arguments of `revoke_certificate`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRequest {
    pub issuer_dn: String,
    pub serial_number: String,
    pub password: String,
    pub revocation_reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RevokeCertificateResponse {
    pub revoked: bool,
    pub issuer_dn: Option<String>,
    pub serial_number: Option<String>,
    pub revocation_date: Option<String>,
    pub revocation_reason: Option<String>,
    pub message: Option<String>,
}

impl CaGateway {
    /// Returns the backend's JSON description of a certificate profile
    ///
    /// On backend failure the sanitized error text takes the place of the profile.
    pub fn get_certificate_profile(&self, name: &str) -> GatewayResult<String> {
        let name = assert_valid_name("certificateProfileName", name, self.limits.name)?;
        let url = self.url(&format!(
            "/v2/certificate/profile/{}",
            self.segment("certificateProfileName", &name)?
        ));
        Ok(self
            .get_text(&url)
            .unwrap_or_else(|e| self.sanitize(&e.to_string())))
    }

    /// Lists certificates expiring within `days`, verbatim as the backend renders them.
    ///
    /// Out of range paging values are clamped instead of rejected.
    pub fn get_certificates_about_to_expire(&self, days: i64, offset: i64, max: i64) -> GatewayResult<String> {
        let days = days.max(0);
        let offset = offset.max(0);
        let max = max.min(i64::from(self.limits.expire_max_items));
        let url = self.url(&format!(
            "/v1/certificate/expire?days={}&offset={}&maxNumberOfResults={}",
            days, offset, max
        ));
        self.get_text(&url)
    }

    pub fn get_count_certificates(&self, active: bool) -> GatewayResult<String> {
        let url = self.url(&format!("/v2/certificate/count?isActive={}", active));
        self.get_text(&url)
    }

    /// Enrolls a certificate for a PKCS#10 request
    ///
    /// The issued certificate is converted to PEM and checked again before it is
    /// returned. Backend failures become an unsuccessful result carrying the sanitized
    /// error chain.
    pub fn enroll_certificate_with_csr(
        &self,
        request: &EnrollmentRequest,
    ) -> GatewayResult<EnrollCertificateWithCsrResponse> {
        let limits = &self.limits;
        let password = assert_valid_password(
            &request.password,
            limits.password,
            &limits.password_allowed_characters,
        )?;
        let certificate_profile_name = assert_valid_name(
            "certificateProfileName",
            &request.certificate_profile_name,
            limits.name,
        )?;
        let end_entity_profile_name =
            assert_valid_name("endEntityProfileName", &request.end_entity_profile_name, limits.name)?;
        let username = assert_valid_name("username", &request.username, limits.name)?;
        let email = assert_valid_email(&request.email, limits.email)?;
        let csr = assert_valid_pem("csr", &request.csr, limits.pem)?;

        let url = self.url("/v1/certificate/pkcs10enroll");
        log::debug!("CSR: {}", csr);
        let body = json!({
            "certificate_request": csr.as_str(),
            "certificate_profile_name": certificate_profile_name.as_str(),
            "end_entity_profile_name": end_entity_profile_name.as_str(),
            "certificate_authority_name": request.name_of_ca,
            "username": username.as_str(),
            "password": password.as_str(),
            "include_chain": "false",
            "email": email.as_str(),
            "reponse_format": PEM_RESPONSE_FORMAT,
        });

        let payload: EnrollmentPayload = match self.post_json(&url, &body) {
            Ok(payload) => payload,
            Err(e) => return Ok(EnrollCertificateWithCsrResponse::failure(self.sanitize(&e.to_string()))),
        };
        let pem = to_pem_certificate(payload.certificate.as_deref().unwrap_or_default());
        log::debug!("Generated certificate: \n{}", pem);
        if !is_valid_pem(&pem, limits.pem) {
            return Ok(EnrollCertificateWithCsrResponse::failure(INVALID_CERTIFICATE_PEM.into()));
        }
        Ok(EnrollCertificateWithCsrResponse {
            certificate: Some(pem),
            serial_number: payload.serial_number,
            format: Some(PEM_RESPONSE_FORMAT.into()),
            error_message: payload.error_message,
        })
    }

    /// Revokes a certificate identified by issuer and serial number
    ///
    /// Any failure past validation yields the same `REVOCATION_FAILED` result with the
    /// inputs echoed back.
    pub fn revoke_certificate(&self, request: &RevocationRequest) -> GatewayResult<RevokeCertificateResponse> {
        let limits = &self.limits;
        let serial_number = assert_valid_serial_number_hex(&request.serial_number, limits.serial_number_hex_length)?;
        let issuer_dn = assert_valid_dn(&request.issuer_dn, limits.dn)?;
        let password = assert_valid_password(
            &request.password,
            limits.password,
            &limits.password_allowed_characters,
        )?;
        let reason = assert_valid_revocation_reason(&request.revocation_reason)?;

        let url = self.url(&format!(
            "/v1/certificate/{}/{}/revoke?reason={}",
            self.segment("issuer_dn", &issuer_dn)?,
            serial_number,
            reason
        ));
        let body = json!({ "password": password.as_str() });
        self.post_json(&url, &body).or_else(|e| {
            log::debug!(
                "Could not revoke certificate with SN {} issued by {} with revocation reason {}: {}",
                serial_number,
                issuer_dn,
                reason,
                self.sanitize(&e.to_string())
            );
            Ok(RevokeCertificateResponse {
                revoked: false,
                issuer_dn: Some(issuer_dn.into_inner()),
                serial_number: Some(serial_number.into_inner()),
                revocation_date: None,
                revocation_reason: Some(reason.into_inner()),
                message: Some(REVOCATION_FAILED.into()),
            })
        })
    }
}
