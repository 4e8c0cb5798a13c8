#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use serde_json::Value;

use mcpki::common::{GatewayError, GatewayResult};
use mcpki::config::{BackendConfig, GatewayConfig, Limits, ToolToggles};
use mcpki::fetcher::{BackendResponse, Fetcher};
use mcpki::registry::ToolRegistry;
use mcpki::tools::CaGateway;
use mcpki::validation::LengthBounds;

pub const BASE_URL: &str = "https://ca.internal:8443/ejbca/ejbca-rest-api";
pub const PASSWORD_ALPHABET: &str = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

pub const RSA_CERTIFICATE_BASE64: &str = "MIICjzCCAXegAwIBAgIUavq5hQjs2KUowhszOkZqX4dW23YwDQYJKoZIhvcNAQELBQAwLzEZMBcGA1UEAwwQbWNwa2ktcnNhLXN1Yi1jYTESMBAGA1UECgwJbWNwa2kub3JnMB4XDTI1MDczMTE3MTExNFoXDTI1MDgzMDE3MTExM1owJTEPMA0GA1UEAwwGQW5kcmVzMRIwEAYDVQQKDAltY3BraS5vcmcwXDANBgkqhkiG9w0BAQEFAANLADBIAkEAxjOFSN/k36qg18YyKew/N4Ceo9F4ily8N9npijGSqF7YwPDww7NeMBhheT+nvkwN3qLJ68CpipqHDEZxUN9iVQIDAQABo3UwczAMBgNVHRMBAf8EAjAAMB8GA1UdIwQYMBaAFBT6STI4sI4N+oq5KDucX+PfVisTMBMGA1UdJQQMMAoGCCsGAQUFBwMBMB0GA1UdDgQWBBSJY52M1GQS3R5JNqtGhwuw9eFW1jAOBgNVHQ8BAf8EBAMCBeAwDQYJKoZIhvcNAQELBQADggEBACsE8PnQqZrv90TZhDFzkJ2LFFsu2yaV5g8/xix+iVf9bokEMtzhp5rIiRQqhM+Sj6v1IY4JoKPJt3qQ0e3q9T3q3soUYtObe2Gd+l9WcQDKhqVTNHAQ7JybUeNZXFjaLpcaTT3lXtDOqupxPwGMjUR4+66jjr6WCdPe7KZ/kfUWWz7OKC5sMya4CvCZunwkYF70KbkJKKs2Vozwo9di22YG279u8clCIns/O1BprIPNUx/pqO6bUQcNBkOyi3U/uPW7KAUj98q3siC90gCMDhgVkwveyo/DZYdjvvVJei4UbbN0/+JWrObPO0XNYLfFnhY1AB/Wc7Febm78+zNRznk=";

pub const RSA_CERTIFICATE_PEM: &str = concat!(
    "-----BEGIN CERTIFICATE-----\n",
    "MIICjzCCAXegAwIBAgIUavq5hQjs2KUowhszOkZqX4dW23YwDQYJKoZIhvcNAQEL\n",
    "BQAwLzEZMBcGA1UEAwwQbWNwa2ktcnNhLXN1Yi1jYTESMBAGA1UECgwJbWNwa2ku\n",
    "b3JnMB4XDTI1MDczMTE3MTExNFoXDTI1MDgzMDE3MTExM1owJTEPMA0GA1UEAwwG\n",
    "QW5kcmVzMRIwEAYDVQQKDAltY3BraS5vcmcwXDANBgkqhkiG9w0BAQEFAANLADBI\n",
    "AkEAxjOFSN/k36qg18YyKew/N4Ceo9F4ily8N9npijGSqF7YwPDww7NeMBhheT+n\n",
    "vkwN3qLJ68CpipqHDEZxUN9iVQIDAQABo3UwczAMBgNVHRMBAf8EAjAAMB8GA1Ud\n",
    "IwQYMBaAFBT6STI4sI4N+oq5KDucX+PfVisTMBMGA1UdJQQMMAoGCCsGAQUFBwMB\n",
    "MB0GA1UdDgQWBBSJY52M1GQS3R5JNqtGhwuw9eFW1jAOBgNVHQ8BAf8EBAMCBeAw\n",
    "DQYJKoZIhvcNAQELBQADggEBACsE8PnQqZrv90TZhDFzkJ2LFFsu2yaV5g8/xix+\n",
    "iVf9bokEMtzhp5rIiRQqhM+Sj6v1IY4JoKPJt3qQ0e3q9T3q3soUYtObe2Gd+l9W\n",
    "cQDKhqVTNHAQ7JybUeNZXFjaLpcaTT3lXtDOqupxPwGMjUR4+66jjr6WCdPe7KZ/\n",
    "kfUWWz7OKC5sMya4CvCZunwkYF70KbkJKKs2Vozwo9di22YG279u8clCIns/O1Bp\n",
    "rIPNUx/pqO6bUQcNBkOyi3U/uPW7KAUj98q3siC90gCMDhgVkwveyo/DZYdjvvVJ\n",
    "ei4UbbN0/+JWrObPO0XNYLfFnhY1AB/Wc7Febm78+zNRznk=\n",
    "-----END CERTIFICATE-----"
);

pub const CRL_BASE64: &str = "MIIBKDCBkgIBATANBgkqhkiG9w0BAQsFADAvMRkwFwYDVQQDDBBtY3BraS1yc2Etc3ViLWNhMRIwEAYDVQQKDAltY3BraS5vcmcXDTI1MDgwMTEzMTk1NVoXDTI2MDEyODEzMTk1NFqgLzAtMB8GA1UdIwQYMBaAFPpaPtXjG5JH7LXC8tkv/OD5ZmZaMAoGA1UdFAQDAgEaMA0GCSqGSIb3DQEBCwUAA4GBAKN5sjOPaMSqLU51GHhRtS7/nnKPZQg85gpnNmNtpL1Azh3qp8aqG1tt99AXepaB9NQ8zakOLJLxdxkM3nvRWHyPQscyK1Ze5H3dFxZuw/HHDEp30cvAmsgqkbUOP8QorCerOh+GNMt193OizY3zo5NtBu1849L28ZbB+m6jxe0C";

pub const CRL_PEM: &str = concat!(
    "-----BEGIN X509 CRL-----\n",
    "MIIBKDCBkgIBATANBgkqhkiG9w0BAQsFADAvMRkwFwYDVQQDDBBtY3BraS1yc2Et\n",
    "c3ViLWNhMRIwEAYDVQQKDAltY3BraS5vcmcXDTI1MDgwMTEzMTk1NVoXDTI2MDEy\n",
    "ODEzMTk1NFqgLzAtMB8GA1UdIwQYMBaAFPpaPtXjG5JH7LXC8tkv/OD5ZmZaMAoG\n",
    "A1UdFAQDAgEaMA0GCSqGSIb3DQEBCwUAA4GBAKN5sjOPaMSqLU51GHhRtS7/nnKP\n",
    "ZQg85gpnNmNtpL1Azh3qp8aqG1tt99AXepaB9NQ8zakOLJLxdxkM3nvRWHyPQscy\n",
    "K1Ze5H3dFxZuw/HHDEp30cvAmsgqkbUOP8QorCerOh+GNMt193OizY3zo5NtBu18\n",
    "49L28ZbB+m6jxe0C\n",
    "-----END X509 CRL-----"
);

/// CSR as JSON-minded clients send it, with literal `\n` escapes.
pub const CSR_ESCAPED: &str = concat!(
    "-----BEGIN CERTIFICATE REQUEST-----\\n",
    "MIICsTCCAZkCAQAwQjEVMBMGA1UEAwwMZXhhbXBsZTEub3JnMQswCQYDVQQGEwJE\\n",
    "RTEMMAoGA1UECwwDREVWMQ4wDAYDVQQKDAVFSkJDQTCCASIwDQYJKoZIhvcNAQEB\\n",
    "BQADggEPADCCAQoCggEBAJXV2s5xgjM1VkVycoZi+oUhqzj8fmfDu9JUy8rFr9Ra\\n",
    "Uv9D2G9Ehp+pvxaAbt0444Zutv2h8kwpMp4jsDx2Wtf06rq6/7UpYY9YXGRyv0Lh\\n",
    "Ek0xQDogeXIhAKBK4xbVVciBs6YGLQGt/qK7UyWimoA1mDNbk3MTIb0yL2QsVdWo\\n",
    "d/aR2+X6AATNVNxJxnDksZYxXGZupt+I+HHHspLKDOuZpuegbPXm45E7tJ9EfRNF\\n",
    "Grg8b33oDCPXvK4zXj/EbSmP7entuMINnnTQpUxSa/BuQNs2bVqgZ4v980N/dm5K\\n",
    "0hO2DChTCX1qMgsmsHaeR/OVPrTLX4PkCsO0tnE4E8UCAwEAAaAqMCgGCSqGSIb3\\n",
    "DQEJDjEbMBkwFwYDVR0RBBAwDoIMZXhhbXBsZTEub3JnMA0GCSqGSIb3DQEBCwUA\\n",
    "A4IBAQBV+uhyY/oSKJl15I28Jp0B6i9D9dYyyqZkh+E1/RpA1ifA8WLGLKLgo9W8\\n",
    "De2wbqGC6Xq5kxCPIACXRsRJCev3fZZ2pU3ClTPY6V2MFdLJXxCTI2VJ2WKFquzF\\n",
    "kRASdHHpQ48gw0k+pwCdhb39hNFzPZ+asgiCwVBkUTORTNaPnrRRuA2AckcD3hUY\\n",
    "BV+EMt/P6kyfYbubVdFAL2lRFcRKzJP0tviXlJ+152GQR/CUisPpCOPcbG/H+O4m\\n",
    "nIqSYo4TwacKe7uA/jSQS7eIpQGRRzxK33TFf127wMRK9jxZqd24FVB3L9Gb8gUw\\n",
    "h+Xx/L8OWH359WcavlCCKl9t92pW\\n",
    "-----END CERTIFICATE REQUEST-----"
);

/// P-256 sub CA certificate, also with literal `\n` escapes.
pub const P256_SUB_CA_ESCAPED: &str = concat!(
    "-----BEGIN CERTIFICATE-----\\n",
    "MIIBzzCCAXSgAwIBAgIUNC7R0e0m9L5ogZPueUcGQc6vAF4wCgYIKoZIzj0EAwIw\\n",
    "NTEfMB0GA1UEAwwWbWNwa2ktcHJpbWUyNTYtcm9vdC1jYTESMBAGA1UECgwJbWNw\\n",
    "a2kub3JnMB4XDTI1MDcwMTEzMDgyMFoXDTI4MDYzMDEzMDgxOVowNDEeMBwGA1UE\\n",
    "AwwVbWNwa2ktcHJpbWUyNTYtc3ViLWNhMRIwEAYDVQQKDAltY3BraS5vcmcwWTAT\\n",
    "BgcqhkjOPQIBBggqhkjOPQMBBwNCAAQ9PSThca5PcTcsZslBevskfn6MBHLw0yF/\\n",
    "BwiUAkysli4laqZ3wnaol78HmhuWhRKbL1i7qbrbZjD7mwgItGp8o2MwYTAPBgNV\\n",
    "HRMBAf8EBTADAQH/MB8GA1UdIwQYMBaAFOEDtZ9/F/r8r42puuYPn4+X3UMnMB0G\\n",
    "A1UdDgQWBBTPbVAbHKRTYVEnzQ4zVIhqxKB+AzAOBgNVHQ8BAf8EBAMCAYYwCgYI\\n",
    "KoZIzj0EAwIDSQAwRgIhAMFSa6+tTbnvKCieTQAPUDEIrMLY4wAgOGkMrABHLNh7\\n",
    "AiEAsINW1bqy30SCfQNvO/RYJ/DB+5zIhEJO6cFVTCkDGDU=\\n",
    "-----END CERTIFICATE-----"
);

/// Structurally valid PEM whose payload is not DER.
pub const GARBAGE_CERTIFICATE_PEM: &str = concat!(
    "-----BEGIN CERTIFICATE-----\n",
    "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA\n",
    "AAAAAAAAAAAAAAAA\n",
    "-----END CERTIFICATE-----"
);

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub url: String,
    pub body: Option<Value>,
}

/// Fetcher answering every request with the same scripted reply and recording the calls.
#[derive(Debug)]
pub struct MockFetcher {
    reply: GatewayResult<BackendResponse>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockFetcher {
    pub fn replying(status: u16, body: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Ok(BackendResponse::new(status, body)),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn ok(body: &str) -> Arc<Self> {
        Self::replying(200, body)
    }

    /// Simulates an unreachable backend, the message mentions the backend URL.
    pub fn unreachable() -> Arc<Self> {
        Arc::new(Self {
            reply: Err(GatewayError::Transport(format!(
                "I/O error on request for \"{}/v1/ca\": error sending request --- Connection refused (os error 111)",
                BASE_URL
            ))),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().expect("Mock lock poisoned").clone()
    }

    fn record(&self, method: &'static str, url: &str, body: Option<&Value>) -> GatewayResult<BackendResponse> {
        self.calls.lock().expect("Mock lock poisoned").push(RecordedCall {
            method,
            url: url.into(),
            body: body.cloned(),
        });
        self.reply.clone()
    }
}

impl Fetcher for MockFetcher {
    fn get(&self, url: &str) -> GatewayResult<BackendResponse> {
        self.record("GET", url, None)
    }

    fn post(&self, url: &str, body: &Value) -> GatewayResult<BackendResponse> {
        self.record("POST", url, Some(body))
    }
}

pub fn test_config() -> GatewayConfig {
    GatewayConfig {
        backend: BackendConfig {
            url: format!("{}/", BASE_URL),
            client_certificate: "/etc/mcpki/client.pem".into(),
            client_key: "/etc/mcpki/client.key".into(),
            trust_anchor: "/etc/mcpki/ca.pem".into(),
            timeout_secs: Some(5),
        },
        limits: Limits {
            password: LengthBounds::new(2, 32),
            serial_number_hex_length: 10,
            password_allowed_characters: PASSWORD_ALPHABET.into(),
            ..Limits::default()
        },
        tools: ToolToggles::all_enabled(),
    }
}

pub fn gateway(fetcher: &Arc<MockFetcher>) -> CaGateway {
    CaGateway::new(fetcher.clone(), &test_config())
}

pub fn registry(fetcher: &Arc<MockFetcher>, toggles: &ToolToggles) -> ToolRegistry {
    ToolRegistry::new(gateway(fetcher), toggles)
}
