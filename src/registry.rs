//! # Tool Registry
//!
//! Publishes the gateway operations under their stable tool names. Registration is
//! decided once, from the `tools` section of the configuration: a disabled tool is
//! never registered, so it is neither listed nor callable.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::common::GatewayResult;
use crate::config::ToolToggles;
use crate::tool_error::ToolError;
use crate::tools::certificate::{EnrollmentRequest, RevocationRequest};
use crate::tools::CaGateway;

/// The tools the gateway knows about.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ToolKind {
    CreateCrl,
    GetAvailableCas,
    GetCaCertificate,
    GetCertificateProfile,
    GetCertificatesAboutToExpire,
    GetCountCertificates,
    GetLatestCrl,
    EnrollCertificateWithCsr,
    RevokeCertificate,
    ParseCertificate,
}

impl ToolKind {
    pub const ALL: [ToolKind; 10] = [
        ToolKind::CreateCrl,
        ToolKind::GetAvailableCas,
        ToolKind::GetCaCertificate,
        ToolKind::GetCertificateProfile,
        ToolKind::GetCertificatesAboutToExpire,
        ToolKind::GetCountCertificates,
        ToolKind::GetLatestCrl,
        ToolKind::EnrollCertificateWithCsr,
        ToolKind::RevokeCertificate,
        ToolKind::ParseCertificate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ToolKind::CreateCrl => "create_crl",
            ToolKind::GetAvailableCas => "get_available_cas",
            ToolKind::GetCaCertificate => "get_ca_certificate",
            ToolKind::GetCertificateProfile => "get_certificate_profile",
            ToolKind::GetCertificatesAboutToExpire => "get_certificates_about_to_expire",
            ToolKind::GetCountCertificates => "get_count_certificates",
            ToolKind::GetLatestCrl => "get_latest_crl",
            ToolKind::EnrollCertificateWithCsr => "enroll_certificate_with_csr",
            ToolKind::RevokeCertificate => "revoke_certificate",
            ToolKind::ParseCertificate => "parse_certificate",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        ToolKind::ALL.into_iter().find(|tool| tool.name() == name)
    }

    pub fn description(&self) -> &'static str {
        match self {
            ToolKind::CreateCrl => "Create CRL.",
            ToolKind::GetAvailableCas => "Get the list of available CAs.",
            ToolKind::GetCaCertificate => "Get CA certificate.",
            ToolKind::GetCertificateProfile => "Get certificate profile.",
            ToolKind::GetCertificatesAboutToExpire => "Get certificates about to expire.",
            ToolKind::GetCountCertificates => "Counts the certificates.",
            ToolKind::GetLatestCrl => "Get latest CRL.",
            ToolKind::EnrollCertificateWithCsr => "Enrolls a certificate given a CSR.",
            ToolKind::RevokeCertificate => "Revokes a certificate.",
            ToolKind::ParseCertificate => "Parses a certificate.",
        }
    }

    fn parameters(&self) -> &'static [(&'static str, &'static str, &'static str)] {
        match self {
            ToolKind::CreateCrl | ToolKind::GetLatestCrl => {
                &[("issuer_dn", "string", "The subject DN of the issuing CA.")]
            }
            ToolKind::GetAvailableCas => &[("external", "boolean", "True if external CAs are returned also.")],
            ToolKind::GetCaCertificate => &[("subject_dn", "string", "The subject DN of the CA certificate.")],
            ToolKind::GetCertificateProfile => &[("name", "string", "The name of the certificate profile.")],
            ToolKind::GetCertificatesAboutToExpire => &[
                ("days", "integer", "Number of days until expiration."),
                ("offset", "integer", "List offset (often 0)."),
                ("max", "integer", "Maximum number of items returned."),
            ],
            ToolKind::GetCountCertificates => &[("active", "boolean", "True for active certificates only.")],
            ToolKind::EnrollCertificateWithCsr => &[
                ("csr", "string", "Certificate Signing Request (CSR)."),
                ("certificate_profile_name", "string", "Name of the certificate profile."),
                ("end_entity_profile_name", "string", "Name of the end entity profile."),
                ("name_of_ca", "string", "Name of the issuing CA."),
                ("username", "string", "Name of the end entity."),
                ("password", "string", "Password of the end entity."),
                ("email", "string", "Email of the end entity."),
            ],
            ToolKind::RevokeCertificate => &[
                ("issuer_dn", "string", "The issuer of the certificate."),
                ("serial_number", "string", "The certificate serial number in hex format."),
                ("password", "string", "The certificate password."),
                ("revocation_reason", "string", "The revocation reason."),
            ],
            ToolKind::ParseCertificate => &[("certificate", "string", "The PEM formatted X.509 certificate.")],
        }
    }

    /// JSON schema of the tool arguments, every parameter is required.
    pub fn input_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for (name, kind, description) in self.parameters() {
            properties.insert((*name).into(), json!({ "type": kind, "description": description }));
            required.push(Value::from(*name));
        }
        json!({ "type": "object", "properties": properties, "required": required })
    }

    pub fn is_enabled(&self, toggles: &ToolToggles) -> bool {
        match self {
            ToolKind::CreateCrl => toggles.create_crl,
            ToolKind::GetAvailableCas => toggles.get_available_cas,
            ToolKind::GetCaCertificate => toggles.get_ca_certificate,
            ToolKind::GetCertificateProfile => toggles.get_certificate_profile,
            ToolKind::GetCertificatesAboutToExpire => toggles.get_certificates_about_to_expire,
            ToolKind::GetCountCertificates => toggles.get_count_certificates,
            ToolKind::GetLatestCrl => toggles.get_latest_crl,
            ToolKind::EnrollCertificateWithCsr => toggles.enroll_certificate_with_csr,
            ToolKind::RevokeCertificate => toggles.revoke_certificate,
            ToolKind::ParseCertificate => toggles.parse_certificate,
        }
    }
}

/// What `tools/list` reports for a registered tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

#[derive(Deserialize)]
struct IssuerDnArgs {
    issuer_dn: String,
}

#[derive(Deserialize)]
struct SubjectDnArgs {
    subject_dn: String,
}

#[derive(Deserialize)]
struct ExternalArgs {
    external: bool,
}

#[derive(Deserialize)]
struct NameArgs {
    name: String,
}

#[derive(Deserialize)]
struct ExpireArgs {
    days: i64,
    offset: i64,
    max: i64,
}

#[derive(Deserialize)]
struct ActiveArgs {
    active: bool,
}

#[derive(Deserialize)]
struct CertificateArgs {
    certificate: String,
}

#[derive(Debug)]
pub struct ToolRegistry {
    gateway: CaGateway,
    tools: Vec<ToolKind>,
}

impl ToolRegistry {
    pub fn new(gateway: CaGateway, toggles: &ToolToggles) -> Self {
        let tools: Vec<ToolKind> = ToolKind::ALL
            .into_iter()
            .filter(|tool| tool.is_enabled(toggles))
            .collect();
        for tool in &tools {
            log::info!("Loading tool {}.", tool.name());
        }
        if tools.is_empty() {
            log::warn!("No tool is enabled, the server will not offer any operation.");
        }
        Self { gateway, tools }
    }

    pub fn gateway(&self) -> &CaGateway {
        &self.gateway
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(ToolKind::name).collect()
    }

    pub fn is_registered(&self, name: &str) -> bool {
        self.lookup(name).is_some()
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools
            .iter()
            .map(|tool| ToolDescriptor {
                name: tool.name().into(),
                description: tool.description().into(),
                input_schema: tool.input_schema(),
            })
            .collect()
    }

    fn lookup(&self, name: &str) -> Option<ToolKind> {
        self.tools.iter().copied().find(|tool| tool.name() == name)
    }

    /// Runs a registered tool and renders its result as text
    ///
    /// Structured results are serialized as JSON, tools that relay backend text
    /// return it unchanged.
    pub fn call(&self, name: &str, arguments: &Value) -> Result<String, ToolError> {
        let tool = self.lookup(name).ok_or_else(|| ToolError::method_not_found(name))?;
        log::info!("Calling tool {}", name);
        self.dispatch(tool, arguments)
            .and_then(|result| result.map_err(|e| ToolError::from_gateway_error(e, self.gateway.base_url())))
            .inspect_err(|e| log::warn!("Tool {} failed: {}", name, e.message))
    }

    fn dispatch(&self, tool: ToolKind, arguments: &Value) -> Result<GatewayResult<String>, ToolError> {
        let gateway = &self.gateway;
        let result = match tool {
            ToolKind::CreateCrl => {
                let args: IssuerDnArgs = parse_arguments(tool, arguments)?;
                gateway.create_crl(&args.issuer_dn).and_then(to_json)
            }
            ToolKind::GetAvailableCas => {
                let args: ExternalArgs = parse_arguments(tool, arguments)?;
                to_json(gateway.get_available_cas(args.external))
            }
            ToolKind::GetCaCertificate => {
                let args: SubjectDnArgs = parse_arguments(tool, arguments)?;
                gateway.get_ca_certificate(&args.subject_dn).and_then(to_json)
            }
            ToolKind::GetCertificateProfile => {
                let args: NameArgs = parse_arguments(tool, arguments)?;
                gateway.get_certificate_profile(&args.name)
            }
            ToolKind::GetCertificatesAboutToExpire => {
                let args: ExpireArgs = parse_arguments(tool, arguments)?;
                gateway.get_certificates_about_to_expire(args.days, args.offset, args.max)
            }
            ToolKind::GetCountCertificates => {
                let args: ActiveArgs = parse_arguments(tool, arguments)?;
                gateway.get_count_certificates(args.active)
            }
            ToolKind::GetLatestCrl => {
                let args: IssuerDnArgs = parse_arguments(tool, arguments)?;
                gateway.get_latest_crl(&args.issuer_dn).and_then(to_json)
            }
            ToolKind::EnrollCertificateWithCsr => {
                let request: EnrollmentRequest = parse_arguments(tool, arguments)?;
                gateway.enroll_certificate_with_csr(&request).and_then(to_json)
            }
            ToolKind::RevokeCertificate => {
                let request: RevocationRequest = parse_arguments(tool, arguments)?;
                gateway.revoke_certificate(&request).and_then(to_json)
            }
            ToolKind::ParseCertificate => {
                let args: CertificateArgs = parse_arguments(tool, arguments)?;
                gateway.parse_certificate(&args.certificate)
            }
        };
        Ok(result)
    }
}

/// Deserializes tool arguments, absent arguments count as an empty object.
fn parse_arguments<T: DeserializeOwned>(tool: ToolKind, arguments: &Value) -> Result<T, ToolError> {
    let arguments = match arguments {
        Value::Null => Value::Object(Map::new()),
        other => other.clone(),
    };
    serde_json::from_value(arguments.clone()).map_err(|e| {
        ToolError::invalid_params(
            format!("Invalid arguments ({}): {}.", tool.name(), e),
            "arguments",
            &arguments.to_string(),
        )
    })
}

fn to_json<T: Serialize>(result: T) -> GatewayResult<String> {
    Ok(serde_json::to_string(&result)?)
}
