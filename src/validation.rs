//! # Field Validation
//!
//! Every value a caller hands to a tool passes through one of the validators below
//! before it is placed into a backend URL or request body. Each input class comes as
//! a pair:
//! - `is_valid_*` - a pure predicate
//! - `assert_valid_*` - the predicate wrapped into a `ValidatedInput`, or an
//!   `InvalidParams` error naming the field and echoing the rejected value
//!
//! Lengths are measured in characters, not bytes.

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use base64::Engine;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::common::{GatewayError, GatewayResult};
use crate::pem::{normalize_escaped_newlines, LENIENT_BASE64};

/// Characters that may never appear in a distinguished name.
pub const DN_FORBIDDEN_CHARACTERS: [char; 18] = [
    '~', '?', '`', '!', '|', '%', '$', ';', '^', '&', '{', '}', '\0', '\r', '\t', '\n', '\\', '"',
];

/// Attribute keywords accepted as RDN types, compared case-insensitively.
const DN_ATTRIBUTE_TYPES: [&str; 36] = [
    "c", "o", "t", "ou", "cn", "l", "st", "serialnumber", "street", "e", "emailaddress", "dc",
    "uid", "surname", "givenname", "initials", "generation", "unstructuredaddress",
    "unstructuredname", "uniqueidentifier", "dn", "pseudonym", "postaladdress", "nameofbirth",
    "countryofcitizenship", "countryofresidence", "gender", "placeofbirth", "dateofbirth",
    "postalcode", "businesscategory", "telephonenumber", "name", "organizationidentifier",
    "title", "description",
];

const SHORT_NAME_RULE: &str = "^[A-Za-z0-9_\\-@.]+$";
const EMAIL_RULE: &str = "^[A-Za-z0-9_-]+(\\.[A-Za-z0-9_-]+)*@[A-Za-z0-9][A-Za-z0-9-]*(\\.[A-Za-z0-9][A-Za-z0-9-]*)*\\.[A-Za-z]{2,}$";
const PEM_RULE: &str = "(?s)^-----BEGIN ([A-Z0-9 ]+)-----\\s+([A-Za-z0-9+/=\\s]+?)\\s+-----END ([A-Z0-9 ]+)-----\\s*$";
const SERIAL_NUMBER_RULE: &str = "^[0-9a-fA-F]+$";
const DN_RULE: &str = "X.500 name without ~?`!|%$;^&{}\\\" or control characters";
const MAX_EMAIL_LOCAL_PART: usize = 64;

static SHORT_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(SHORT_NAME_RULE).expect("Short name pattern should compile"));
static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_RULE).expect("Email pattern should compile"));
static PEM_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(PEM_RULE).expect("PEM pattern should compile"));

/// Inclusive length bounds, in characters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthBounds {
    pub min: usize,
    pub max: usize,
}

impl LengthBounds {
    pub const fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub const fn exact(length: usize) -> Self {
        Self {
            min: length,
            max: length,
        }
    }

    pub fn contains(&self, value: &str) -> bool {
        let length = value.chars().count();
        length >= self.min && length <= self.max
    }
}

impl fmt::Display for LengthBounds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InputClass {
    DistinguishedName,
    ShortName,
    EmailAddress,
    Password,
    SerialNumberHex,
    RevocationReason,
    PemBlob,
}

/// A caller value that passed its validator.
///
/// Instances are only handed out by the `assert_valid_*` functions of this module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedInput {
    class: InputClass,
    value: String,
    bounds: Option<LengthBounds>,
    rule: String,
}

impl ValidatedInput {
    fn new(class: InputClass, value: &str, bounds: Option<LengthBounds>, rule: impl Into<String>) -> Self {
        Self {
            class,
            value: value.into(),
            bounds,
            rule: rule.into(),
        }
    }

    pub fn class(&self) -> InputClass {
        self.class
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn bounds(&self) -> Option<LengthBounds> {
        self.bounds
    }

    /// The character-set rule the value was checked against.
    pub fn rule(&self) -> &str {
        &self.rule
    }

    pub fn into_inner(self) -> String {
        self.value
    }
}

impl AsRef<str> for ValidatedInput {
    fn as_ref(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for ValidatedInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Revocation reasons understood by the CA backend
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum RevocationReason {
    NotRevoked,
    Unspecified,
    KeyCompromise,
    CaCompromise,
    AffiliationChanged,
    Superseded,
    CessationOfOperation,
    CertificateHold,
    RemoveFromCrl,
    PrivilegesWithdrawn,
    AaCompromise,
}

impl RevocationReason {
    pub const ALL: [RevocationReason; 11] = [
        RevocationReason::NotRevoked,
        RevocationReason::Unspecified,
        RevocationReason::KeyCompromise,
        RevocationReason::CaCompromise,
        RevocationReason::AffiliationChanged,
        RevocationReason::Superseded,
        RevocationReason::CessationOfOperation,
        RevocationReason::CertificateHold,
        RevocationReason::RemoveFromCrl,
        RevocationReason::PrivilegesWithdrawn,
        RevocationReason::AaCompromise,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RevocationReason::NotRevoked => "NOT_REVOKED",
            RevocationReason::Unspecified => "UNSPECIFIED",
            RevocationReason::KeyCompromise => "KEY_COMPROMISE",
            RevocationReason::CaCompromise => "CA_COMPROMISE",
            RevocationReason::AffiliationChanged => "AFFILIATION_CHANGED",
            RevocationReason::Superseded => "SUPERSEDED",
            RevocationReason::CessationOfOperation => "CESSATION_OF_OPERATION",
            RevocationReason::CertificateHold => "CERTIFICATE_HOLD",
            RevocationReason::RemoveFromCrl => "REMOVE_FROM_CRL",
            RevocationReason::PrivilegesWithdrawn => "PRIVILEGES_WITHDRAWN",
            RevocationReason::AaCompromise => "AA_COMPROMISE",
        }
    }
}

impl FromStr for RevocationReason {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RevocationReason::ALL
            .into_iter()
            .find(|reason| reason.as_str() == s)
            .ok_or_else(|| GatewayError::invalid_params("Invalid revocation reason.", "revocation_reason", s))
    }
}

impl fmt::Display for RevocationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks a distinguished name
///
/// The name must respect the length bounds, avoid every character of
/// `DN_FORBIDDEN_CHARACTERS` and be a sequence of comma separated RDNs whose
/// attribute types are known keywords or dotted OIDs.
pub fn is_valid_dn(dn: &str, bounds: LengthBounds) -> bool {
    if dn.is_empty() {
        log::warn!("DN is empty.");
        return false;
    }
    if !bounds.contains(dn) {
        log::warn!("DN length out of range: {}.", dn.chars().count());
        return false;
    }
    if dn.chars().any(|c| DN_FORBIDDEN_CHARACTERS.contains(&c)) {
        return false;
    }
    match parse_x500_name(dn) {
        Ok(()) => true,
        Err(reason) => {
            log::warn!("Invalid DN: {}.", reason);
            false
        }
    }
}

fn parse_x500_name(dn: &str) -> Result<(), String> {
    for rdn in dn.split(',') {
        for attribute in rdn.split('+') {
            let (attribute_type, value) = attribute
                .split_once('=')
                .ok_or_else(|| format!("badly formatted directory string '{}'", attribute.trim()))?;
            let attribute_type = attribute_type.trim();
            if !is_known_attribute_type(attribute_type) {
                return Err(format!("unknown object id - {} - passed to distinguished name", attribute_type));
            }
            if value.trim().is_empty() {
                return Err(format!("empty value for attribute {}", attribute_type));
            }
        }
    }
    Ok(())
}

fn is_known_attribute_type(attribute_type: &str) -> bool {
    let lowered = attribute_type.to_ascii_lowercase();
    let lowered = lowered.strip_prefix("oid.").unwrap_or(&lowered);
    if DN_ATTRIBUTE_TYPES.contains(&lowered) {
        return true;
    }
    let mut arcs = lowered.split('.');
    let first = arcs.next().unwrap_or_default();
    let rest: Vec<&str> = arcs.collect();
    !rest.is_empty()
        && std::iter::once(first)
            .chain(rest)
            .all(|arc| !arc.is_empty() && arc.chars().all(|c| c.is_ascii_digit()))
}

pub fn assert_valid_dn(dn: &str, bounds: LengthBounds) -> GatewayResult<ValidatedInput> {
    if !is_valid_dn(dn, bounds) {
        log::debug!("Invalid DN: {}.", dn);
        return Err(GatewayError::invalid_params("Invalid DN.", "dn", dn));
    }
    Ok(ValidatedInput::new(InputClass::DistinguishedName, dn, Some(bounds), DN_RULE))
}

/// Checks an identifier such as a username, profile name or CA name.
pub fn is_valid_name(name: &str, bounds: LengthBounds) -> bool {
    SHORT_NAME_PATTERN.is_match(name) && bounds.contains(name)
}

pub fn assert_valid_name(field: &str, name: &str, bounds: LengthBounds) -> GatewayResult<ValidatedInput> {
    if !is_valid_name(name, bounds) {
        log::debug!("Invalid name for field '{}': '{}'.", field, name);
        return Err(GatewayError::invalid_params(format!("Invalid name ({}).", field), field, name));
    }
    Ok(ValidatedInput::new(InputClass::ShortName, name, Some(bounds), SHORT_NAME_RULE))
}

pub fn is_valid_email(email: &str, bounds: LengthBounds) -> bool {
    let local_part_fits = email
        .split_once('@')
        .map(|(local, _)| !local.is_empty() && local.chars().count() <= MAX_EMAIL_LOCAL_PART)
        .unwrap_or(false);
    local_part_fits && EMAIL_PATTERN.is_match(email) && bounds.contains(email)
}

pub fn assert_valid_email(email: &str, bounds: LengthBounds) -> GatewayResult<ValidatedInput> {
    if !is_valid_email(email, bounds) {
        log::debug!("Invalid e-mail: {}.", email);
        return Err(GatewayError::invalid_params("Invalid e-mail.", "email", email));
    }
    Ok(ValidatedInput::new(InputClass::EmailAddress, email, Some(bounds), EMAIL_RULE))
}

/// Checks a password against its length bounds and the configured alphabet
///
/// Membership is tested character by character, the alphabet is not interpreted as a
/// pattern.
pub fn is_valid_password(password: &str, bounds: LengthBounds, allowed_characters: &str) -> bool {
    if !bounds.contains(password) {
        log::warn!("Password length out of range: {}.", password.chars().count());
        return false;
    }
    if !password.chars().all(|c| allowed_characters.contains(c)) {
        log::warn!("Password uses characters outside of the allowed alphabet.");
        return false;
    }
    true
}

pub fn assert_valid_password(
    password: &str,
    bounds: LengthBounds,
    allowed_characters: &str,
) -> GatewayResult<ValidatedInput> {
    if !is_valid_password(password, bounds, allowed_characters) {
        return Err(GatewayError::invalid_params("Invalid password.", "password", password));
    }
    Ok(ValidatedInput::new(
        InputClass::Password,
        password,
        Some(bounds),
        format!("characters of '{}'", allowed_characters),
    ))
}

/// Checks a fixed width hexadecimal serial number (no `0x` prefix).
pub fn is_valid_serial_number_hex(hex: &str, length: usize) -> bool {
    hex.len() == length && !hex.is_empty() && hex.chars().all(|c| c.is_ascii_hexdigit())
}

pub fn assert_valid_serial_number_hex(hex: &str, length: usize) -> GatewayResult<ValidatedInput> {
    if !is_valid_serial_number_hex(hex, length) {
        log::debug!("Invalid serial number hex: {}.", hex);
        return Err(GatewayError::invalid_params("Invalid serial number.", "serial_number", hex));
    }
    Ok(ValidatedInput::new(
        InputClass::SerialNumberHex,
        hex,
        Some(LengthBounds::exact(length)),
        SERIAL_NUMBER_RULE,
    ))
}

pub fn is_valid_revocation_reason(reason: &str) -> bool {
    reason.parse::<RevocationReason>().is_ok()
}

pub fn assert_valid_revocation_reason(reason: &str) -> GatewayResult<ValidatedInput> {
    let parsed: RevocationReason = reason.parse().inspect_err(|_| {
        log::debug!("Invalid revocation reason: {}.", reason);
    })?;
    Ok(ValidatedInput::new(
        InputClass::RevocationReason,
        parsed.as_str(),
        None,
        "one of the enumerated revocation reasons",
    ))
}

pub fn is_valid_pem(pem: &str, bounds: LengthBounds) -> bool {
    bounds.contains(pem) && is_valid_pem_format(pem)
}

/// Checks the PEM grammar of a text
///
/// Literal `\n` sequences are turned into newlines first. Both boundaries have to
/// carry the same label and the enclosed payload has to decode as base64.
pub fn is_valid_pem_format(pem: &str) -> bool {
    let normalized = normalize_escaped_newlines(pem);
    let Some(captures) = PEM_PATTERN.captures(normalized.trim()) else {
        return false;
    };
    if captures[1] != captures[3] {
        return false;
    }
    let payload: String = captures[2].split_whitespace().collect();
    LENIENT_BASE64.decode(payload).is_ok()
}

pub fn assert_valid_pem(field: &str, pem: &str, bounds: LengthBounds) -> GatewayResult<ValidatedInput> {
    if !is_valid_pem(pem, bounds) {
        log::debug!("Invalid PEM format ({}): {}.", field, pem);
        return Err(GatewayError::invalid_params(
            format!("Invalid PEM format ({}).", field),
            field,
            pem,
        ));
    }
    Ok(ValidatedInput::new(InputClass::PemBlob, pem, Some(bounds), PEM_RULE))
}
