//! # PEM Encoding
//!
//! The CA backend answers with bare base64 payloads (DER encoded certificates and CRLs).
//! This module turns them into the boundary delimited PEM representation handed out to
//! callers.
//!
//! ## Encoding convention
//!
//! - The start boundary is followed by a newline
//! - The payload is split into lines of `PEM_LINE_WIDTH` characters, each newline terminated
//! - The end boundary closes the text without a trailing newline

use std::fmt;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::common::{GatewayError, GatewayResult, PEM_LINE_WIDTH};

/// Standard alphabet engine that does not insist on trailing padding.
pub const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Kind of object enclosed between the PEM boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PemKind {
    Certificate,
    X509Crl,
    CertificateRequest,
}

impl PemKind {
    pub fn label(&self) -> &'static str {
        match self {
            PemKind::Certificate => "CERTIFICATE",
            PemKind::X509Crl => "X509 CRL",
            PemKind::CertificateRequest => "CERTIFICATE REQUEST",
        }
    }

    pub fn boundary_start(&self) -> String {
        format!("-----BEGIN {}-----\n", self.label())
    }

    pub fn boundary_end(&self) -> String {
        format!("-----END {}-----", self.label())
    }
}

/// A PEM entity whose body is already wrapped at `PEM_LINE_WIDTH` columns.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PemObject {
    pub kind: PemKind,
    pub body: String,
}

impl PemObject {
    pub fn from_base64(kind: PemKind, base64_content: &str) -> Self {
        Self {
            kind,
            body: wrap(base64_content),
        }
    }

    /// Serializes the object following the encoding convention of this module.
    pub fn encode(&self) -> String {
        let mut pem = self.kind.boundary_start();
        pem.push_str(&self.body);
        pem.push_str(&self.kind.boundary_end());
        pem
    }

    /// Decodes the wrapped body back into the DER bytes.
    pub fn decode_payload(&self) -> GatewayResult<Vec<u8>> {
        let compact: String = self.body.split_whitespace().collect();
        LENIENT_BASE64
            .decode(compact)
            .map_err(|e| GatewayError::Payload(e.to_string()))
    }
}

impl fmt::Display for PemObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

/// Splits a base64 payload into newline terminated lines of `PEM_LINE_WIDTH` characters
///
/// The final line keeps whatever is left of the payload. An empty payload produces an
/// empty string.
pub fn wrap(base64_content: &str) -> String {
    let mut wrapped = String::with_capacity(base64_content.len() + base64_content.len() / PEM_LINE_WIDTH + 1);
    let mut line_length = 0;
    for c in base64_content.chars() {
        wrapped.push(c);
        line_length += 1;
        if line_length == PEM_LINE_WIDTH {
            wrapped.push('\n');
            line_length = 0;
        }
    }
    if line_length > 0 {
        wrapped.push('\n');
    }
    wrapped
}

pub fn to_pem_certificate(base64_content: &str) -> String {
    PemObject::from_base64(PemKind::Certificate, base64_content).encode()
}

pub fn to_pem_crl(base64_content: &str) -> String {
    PemObject::from_base64(PemKind::X509Crl, base64_content).encode()
}

/// Replaces literal `\n` escape sequences (as sent by JSON-minded clients) with newlines.
pub fn normalize_escaped_newlines(pem: &str) -> String {
    pem.replace("\\n", "\n")
}
