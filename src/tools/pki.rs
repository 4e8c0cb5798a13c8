use super::CaGateway;
use crate::certificate::parse_pem_certificate;
use crate::common::GatewayResult;
use crate::validation::assert_valid_pem;

impl CaGateway {
    /// Renders a PEM certificate as text. Works offline, the backend is not involved.
    pub fn parse_certificate(&self, certificate: &str) -> GatewayResult<String> {
        let certificate = assert_valid_pem("certificate", certificate, self.limits.pem)?;
        log::debug!("Parse PEM certificate: {}", certificate);
        parse_pem_certificate(certificate.as_str())
    }
}
