use std::fmt;

use chrono::{DateTime, Utc};
use x509_certificate::{rfc5280, X509Certificate};

use crate::common::{GatewayError, GatewayResult};
use crate::pem::normalize_escaped_newlines;

const TIMESTAMP_FORMAT: &str = "%a %b %e %H:%M:%S UTC %Y";

/// Human readable view of a single X.509 certificate
#[derive(Debug, Clone, PartialEq)]
pub struct CertificateSummary {
    pub subject: String,
    pub issuer: String,
    pub serial_number: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub public_key_algorithm: String,
    pub signature_algorithm: String,
    pub extensions: Vec<ExtensionSummary>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtensionSummary {
    pub oid: String,
    pub name: Option<&'static str>,
    pub critical: bool,
}

impl CertificateSummary {
    /// Parses the first certificate of a PEM text.
    ///
    /// Literal `\n` escapes are accepted the same way the PEM validator accepts them.
    pub fn from_pem(pem: &str) -> GatewayResult<Self> {
        let normalized = normalize_escaped_newlines(pem);
        let certificate = X509Certificate::from_pem(normalized.trim().as_bytes())
            .map_err(|e| parse_error(pem, e.to_string()))?;
        Self::try_from(&certificate).map_err(|reason| parse_error(pem, reason))
    }
}

fn parse_error(pem: &str, reason: String) -> GatewayError {
    GatewayError::Parse {
        field: "certificate".into(),
        value: pem.into(),
        reason,
    }
}

impl<'a> TryFrom<&'a X509Certificate> for CertificateSummary {
    type Error = String;

    fn try_from(certificate: &'a X509Certificate) -> Result<Self, Self::Error> {
        let subject = certificate
            .subject_name()
            .user_friendly_str()
            .map_err(|e| e.to_string())?;
        let issuer = certificate
            .issuer_name()
            .user_friendly_str()
            .map_err(|e| e.to_string())?;
        let raw: &rfc5280::Certificate = certificate.as_ref();
        let extensions = raw
            .tbs_certificate
            .extensions
            .as_ref()
            .map(|extensions| {
                extensions
                    .iter()
                    .map(|extension| {
                        let oid = extension.id.to_string();
                        ExtensionSummary {
                            name: extension_name(&oid),
                            critical: extension.critical.unwrap_or(false),
                            oid,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self {
            subject,
            issuer,
            serial_number: hex::encode_upper(certificate.serial_number_asn1().as_slice()),
            not_before: certificate.validity_not_before(),
            not_after: certificate.validity_not_after(),
            public_key_algorithm: certificate
                .key_algorithm()
                .map(|algorithm| format!("{:?}", algorithm))
                .unwrap_or_else(|| "unknown".into()),
            signature_algorithm: certificate
                .signature_algorithm()
                .map(|algorithm| format!("{:?}", algorithm))
                .unwrap_or_else(|| "unknown".into()),
            extensions,
        })
    }
}

impl fmt::Display for CertificateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Subject: {}", self.subject)?;
        writeln!(f, "Issuer: {}", self.issuer)?;
        writeln!(f, "Serial number: {}", self.serial_number)?;
        writeln!(f, "Validity")?;
        writeln!(f, "  Not before: {}", self.not_before.format(TIMESTAMP_FORMAT))?;
        writeln!(f, "  Not after: {}", self.not_after.format(TIMESTAMP_FORMAT))?;
        writeln!(f, "Public key algorithm: {}", self.public_key_algorithm)?;
        writeln!(f, "Signature algorithm: {}", self.signature_algorithm)?;
        write!(f, "Extensions:")?;
        if self.extensions.is_empty() {
            write!(f, " none")?;
        }
        for extension in &self.extensions {
            write!(f, "\n  {}", extension.name.unwrap_or("unknown"))?;
            write!(f, " ({})", extension.oid)?;
            if extension.critical {
                write!(f, " critical")?;
            }
        }
        Ok(())
    }
}

fn extension_name(oid: &str) -> Option<&'static str> {
    let name = match oid {
        "2.5.29.14" => "SubjectKeyIdentifier",
        "2.5.29.15" => "KeyUsage",
        "2.5.29.17" => "SubjectAlternativeName",
        "2.5.29.18" => "IssuerAlternativeName",
        "2.5.29.19" => "BasicConstraints",
        "2.5.29.31" => "CRLDistributionPoints",
        "2.5.29.32" => "CertificatePolicies",
        "2.5.29.35" => "AuthorityKeyIdentifier",
        "2.5.29.37" => "ExtendedKeyUsage",
        "1.3.6.1.5.5.7.1.1" => "AuthorityInfoAccess",
        _ => return None,
    };
    Some(name)
}

/// Parses a PEM certificate into the textual summary returned by `parse_certificate`.
pub fn parse_pem_certificate(pem: &str) -> GatewayResult<String> {
    let summary = CertificateSummary::from_pem(pem)?;
    log::debug!("Parsed certificate of {}", summary.subject);
    Ok(summary.to_string())
}
