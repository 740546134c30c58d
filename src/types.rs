use crate::fingerprint::hex_colon;
use chrono::{DateTime, Utc};
use num_bigint::BigUint;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::net::IpAddr;

/// DER blobs exactly as one handshake delivered them, in server-send order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawChain {
    certificates: Vec<Vec<u8>>,
}

impl RawChain {
    pub fn new(certificates: Vec<Vec<u8>>) -> Self {
        Self { certificates }
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn get(&self, position: usize) -> Option<&[u8]> {
        self.certificates.get(position).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = &[u8]> {
        self.certificates.iter().map(Vec::as_slice)
    }

    pub fn into_inner(self) -> Vec<Vec<u8>> {
        self.certificates
    }
}

impl From<Vec<Vec<u8>>> for RawChain {
    fn from(certificates: Vec<Vec<u8>>) -> Self {
        Self::new(certificates)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum DigestAlgorithm {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

impl DigestAlgorithm {
    pub fn name(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "SHA-1",
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
        }
    }
}

impl std::str::FromStr for DigestAlgorithm {
    type Err = crate::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "").as_str() {
            "sha1" => Ok(DigestAlgorithm::Sha1),
            "sha256" => Ok(DigestAlgorithm::Sha256),
            "sha384" => Ok(DigestAlgorithm::Sha384),
            "sha512" => Ok(DigestAlgorithm::Sha512),
            _ => Err(crate::Error::InvalidInput(format!(
                "Unsupported digest algorithm: {}",
                s
            ))),
        }
    }
}

/// Distinguished name as ordered `(attribute, value)` pairs.
///
/// Order is kept for display. Equality ignores order and compares the
/// pairs as sets, which is what issuer/subject linkage needs.
#[derive(Debug, Clone, Default)]
pub struct DistinguishedName {
    pub components: Vec<(String, String)>,
}

impl DistinguishedName {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_component(mut self, attr: impl Into<String>, value: impl Into<String>) -> Self {
        self.components.push((attr.into(), value.into()));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// First value of the given short attribute name (`CN`, `O`, ...).
    pub fn get(&self, attr: &str) -> Option<&str> {
        self.components
            .iter()
            .find(|(k, _)| k == attr)
            .map(|(_, v)| v.as_str())
    }

    pub fn common_name(&self) -> Option<&str> {
        self.get("CN")
    }

    /// One-line form: `CN=example.com, O=Example, C=US`.
    ///
    /// Components are joined with `", "` in certificate order. Commas,
    /// equals signs and backslashes inside values are backslash-escaped.
    pub fn to_oneline(&self) -> String {
        self.components
            .iter()
            .map(|(k, v)| format!("{}={}", k, escape_dn_value(v)))
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn as_set(&self) -> BTreeSet<(&str, &str)> {
        self.components
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect()
    }
}

fn escape_dn_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if matches!(ch, '\\' | ',' | '=') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

impl PartialEq for DistinguishedName {
    fn eq(&self, other: &Self) -> bool {
        self.as_set() == other.as_set()
    }
}

impl Eq for DistinguishedName {}

impl fmt::Display for DistinguishedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_oneline())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKeyInfo {
    /// `RSA`, `EC`, `Ed25519`, ... or the dotted OID when unknown.
    pub algorithm: String,
    pub oid: String,
    pub key_size: Option<u32>,
    pub curve: Option<String>,
    pub exponent: Option<u64>,
    pub modulus: Option<Vec<u8>>,
    /// Contents of the subjectPublicKey BIT STRING.
    pub key_bytes: Vec<u8>,
}

impl PublicKeyInfo {
    /// Size/curve descriptor such as `RSA 2048 bits` or `EC P-256`.
    pub fn descriptor(&self) -> String {
        match (&self.curve, self.key_size) {
            (Some(curve), _) => format!("{} {}", self.algorithm, curve),
            (None, Some(bits)) => format!("{} {} bits", self.algorithm, bits),
            (None, None) => self.algorithm.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SanEntry {
    Dns(String),
    Email(String),
    Ip(IpAddr),
    Uri(String),
    DirName(DistinguishedName),
    RegisteredId(String),
    Other(String),
}

impl fmt::Display for SanEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SanEntry::Dns(name) => write!(f, "DNS: {}", name),
            SanEntry::Email(email) => write!(f, "Email: {}", email),
            SanEntry::Ip(ip) => write!(f, "IP Address: {}", ip),
            SanEntry::Uri(uri) => write!(f, "URI: {}", uri),
            SanEntry::DirName(dn) => write!(f, "DirName: {}", dn),
            SanEntry::RegisteredId(oid) => write!(f, "Registered ID: {}", oid),
            SanEntry::Other(other) => write!(f, "Other: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyUsage {
    DigitalSignature,
    NonRepudiation,
    KeyEncipherment,
    DataEncipherment,
    KeyAgreement,
    KeyCertSign,
    CrlSign,
    EncipherOnly,
    DecipherOnly,
}

impl KeyUsage {
    pub fn name(&self) -> &'static str {
        match self {
            KeyUsage::DigitalSignature => "Digital Signature",
            KeyUsage::NonRepudiation => "Non Repudiation",
            KeyUsage::KeyEncipherment => "Key Encipherment",
            KeyUsage::DataEncipherment => "Data Encipherment",
            KeyUsage::KeyAgreement => "Key Agreement",
            KeyUsage::KeyCertSign => "Certificate Sign",
            KeyUsage::CrlSign => "CRL Sign",
            KeyUsage::EncipherOnly => "Encipher Only",
            KeyUsage::DecipherOnly => "Decipher Only",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BasicConstraints {
    pub is_ca: bool,
    pub max_path_len: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthorityKeyId {
    pub key_id: Option<Vec<u8>>,
    pub issuer: Vec<SanEntry>,
    pub serial: Option<Vec<u8>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessDescription {
    /// `OCSP`, `CA Issuers` or the dotted OID.
    pub method: String,
    pub location: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtensionValue {
    SubjectAltName(Vec<SanEntry>),
    IssuerAltName(Vec<SanEntry>),
    KeyUsage(BTreeSet<KeyUsage>),
    ExtendedKeyUsage(Vec<String>),
    BasicConstraints(BasicConstraints),
    SubjectKeyId(Vec<u8>),
    AuthorityKeyId(AuthorityKeyId),
    AuthorityInfoAccess(Vec<AccessDescription>),
    CrlDistributionPoints(Vec<String>),
    CertificatePolicies(Vec<String>),
    PolicyMappings(Vec<(String, String)>),
    PolicyConstraints {
        require_explicit_policy: Option<u32>,
        inhibit_policy_mapping: Option<u32>,
    },
    NameConstraints {
        permitted: Vec<SanEntry>,
        excluded: Vec<SanEntry>,
    },
    InhibitAnyPolicy(u32),
    SignedCertificateTimestamps(usize),
    NetscapeComment(String),
    /// Unrecognized or undecodable non-critical extension, kept verbatim.
    Opaque(Vec<u8>),
}

impl ExtensionValue {
    /// Display lines for the value, one fact per line.
    pub fn describe(&self) -> Vec<String> {
        match self {
            ExtensionValue::SubjectAltName(names) | ExtensionValue::IssuerAltName(names) => {
                names.iter().map(ToString::to_string).collect()
            }
            ExtensionValue::KeyUsage(bits) => bits.iter().map(|b| b.name().to_string()).collect(),
            ExtensionValue::ExtendedKeyUsage(usages) => usages.clone(),
            ExtensionValue::BasicConstraints(bc) => {
                let path_len = match bc.max_path_len {
                    Some(n) => n.to_string(),
                    None => "unlimited".to_string(),
                };
                vec![
                    format!("Certificate Authority: {}", yes_no(bc.is_ca)),
                    format!("Max Path Length: {}", path_len),
                ]
            }
            ExtensionValue::SubjectKeyId(id) => vec![hex_colon(id)],
            ExtensionValue::AuthorityKeyId(aki) => {
                let mut lines = Vec::new();
                if let Some(id) = &aki.key_id {
                    lines.push(format!("Key ID: {}", hex_colon(id)));
                }
                for name in &aki.issuer {
                    lines.push(format!("Issuer: {}", name));
                }
                if let Some(serial) = &aki.serial {
                    lines.push(format!("Serial: {}", hex_colon(serial)));
                }
                lines
            }
            ExtensionValue::AuthorityInfoAccess(entries) => entries
                .iter()
                .map(|e| format!("{}: {}", e.method, e.location))
                .collect(),
            ExtensionValue::CrlDistributionPoints(uris) => uris.clone(),
            ExtensionValue::CertificatePolicies(policies) => policies.clone(),
            ExtensionValue::PolicyMappings(mappings) => mappings
                .iter()
                .map(|(issuer, subject)| format!("{} -> {}", issuer, subject))
                .collect(),
            ExtensionValue::PolicyConstraints {
                require_explicit_policy,
                inhibit_policy_mapping,
            } => {
                let mut lines = Vec::new();
                if let Some(n) = require_explicit_policy {
                    lines.push(format!("Require Explicit Policy: {}", n));
                }
                if let Some(n) = inhibit_policy_mapping {
                    lines.push(format!("Inhibit Policy Mapping: {}", n));
                }
                lines
            }
            ExtensionValue::NameConstraints {
                permitted,
                excluded,
            } => permitted
                .iter()
                .map(|n| format!("Permitted: {}", n))
                .chain(excluded.iter().map(|n| format!("Excluded: {}", n)))
                .collect(),
            ExtensionValue::InhibitAnyPolicy(skip) => vec![format!("Skip Certs: {}", skip)],
            ExtensionValue::SignedCertificateTimestamps(count) => {
                vec![format!("Timestamps: {}", count)]
            }
            ExtensionValue::NetscapeComment(comment) => vec![comment.clone()],
            ExtensionValue::Opaque(bytes) => vec![hex_colon(bytes)],
        }
    }
}

pub(crate) fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Yes"
    } else {
        "No"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Extension {
    pub oid: String,
    pub name: String,
    pub critical: bool,
    pub value: ExtensionValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityStatus {
    NotYetValid,
    Valid,
    Expired,
}

impl ValidityStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ValidityStatus::NotYetValid => "Not yet valid",
            ValidityStatus::Valid => "Valid",
            ValidityStatus::Expired => "Expired",
        }
    }
}

/// One decoded certificate.
///
/// Built only by [`crate::decode::decode`]; the raw DER and the fingerprints
/// derived from it are read-only so they cannot drift apart.
#[derive(Debug, Clone)]
pub struct CertificateRecord {
    pub version: u32,
    pub serial_number: BigUint,
    pub subject: DistinguishedName,
    pub issuer: DistinguishedName,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub public_key: PublicKeyInfo,
    pub signature_algorithm: String,
    pub signature_algorithm_oid: String,
    pub signature: Vec<u8>,
    pub extensions: Vec<Extension>,
    pub(crate) fingerprints: BTreeMap<DigestAlgorithm, String>,
    pub(crate) self_signed: bool,
    pub(crate) raw_der: Vec<u8>,
}

impl CertificateRecord {
    pub fn raw_der(&self) -> &[u8] {
        &self.raw_der
    }

    pub fn fingerprints(&self) -> &BTreeMap<DigestAlgorithm, String> {
        &self.fingerprints
    }

    pub fn fingerprint(&self, algorithm: DigestAlgorithm) -> Option<&str> {
        self.fingerprints.get(&algorithm).map(String::as_str)
    }

    /// Serial number as colon-separated uppercase hex.
    pub fn serial_hex(&self) -> String {
        hex_colon(&self.serial_number.to_bytes_be())
    }

    pub fn extension(&self, oid: &str) -> Option<&Extension> {
        self.extensions.iter().find(|ext| ext.oid == oid)
    }

    pub fn subject_alt_names(&self) -> &[SanEntry] {
        self.extensions
            .iter()
            .find_map(|ext| match &ext.value {
                ExtensionValue::SubjectAltName(names) => Some(names.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    pub fn key_usage(&self) -> Option<&BTreeSet<KeyUsage>> {
        self.extensions.iter().find_map(|ext| match &ext.value {
            ExtensionValue::KeyUsage(bits) => Some(bits),
            _ => None,
        })
    }

    pub fn basic_constraints(&self) -> Option<BasicConstraints> {
        self.extensions.iter().find_map(|ext| match &ext.value {
            ExtensionValue::BasicConstraints(bc) => Some(*bc),
            _ => None,
        })
    }

    pub fn is_ca(&self) -> bool {
        self.basic_constraints().map(|bc| bc.is_ca).unwrap_or(false)
    }

    pub fn subject_key_id(&self) -> Option<&[u8]> {
        self.extensions.iter().find_map(|ext| match &ext.value {
            ExtensionValue::SubjectKeyId(id) => Some(id.as_slice()),
            _ => None,
        })
    }

    pub fn authority_key_id(&self) -> Option<&[u8]> {
        self.extensions.iter().find_map(|ext| match &ext.value {
            ExtensionValue::AuthorityKeyId(aki) => aki.key_id.as_deref(),
            _ => None,
        })
    }

    /// Subject and issuer names are equal.
    pub fn is_self_issued(&self) -> bool {
        self.subject == self.issuer
    }

    /// Self-issued and the signature verifies against the certificate's own key.
    pub fn is_self_signed(&self) -> bool {
        self.self_signed
    }

    pub fn validity_status(&self, at: DateTime<Utc>) -> ValidityStatus {
        if at < self.not_before {
            ValidityStatus::NotYetValid
        } else if at > self.not_after {
            ValidityStatus::Expired
        } else {
            ValidityStatus::Valid
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dn_equality_ignores_order() {
        let a = DistinguishedName::new()
            .with_component("CN", "Example Root")
            .with_component("O", "Example")
            .with_component("C", "US");
        let b = DistinguishedName::new()
            .with_component("C", "US")
            .with_component("CN", "Example Root")
            .with_component("O", "Example");
        let c = DistinguishedName::new().with_component("CN", "Example Root");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_oneline(), "CN=Example Root, O=Example, C=US");
        assert_eq!(b.to_oneline(), "C=US, CN=Example Root, O=Example");
    }

    #[test]
    fn test_dn_escaping() {
        let dn = DistinguishedName::new().with_component("O", "Acme, Inc.");
        assert_eq!(dn.to_oneline(), "O=Acme\\, Inc.");
        assert_eq!(dn.get("O"), Some("Acme, Inc."));
        assert_eq!(dn.common_name(), None);
    }

    #[test]
    fn test_digest_algorithm_parsing() {
        assert!(matches!(
            "sha-256".parse::<DigestAlgorithm>(),
            Ok(DigestAlgorithm::Sha256)
        ));
        assert!(matches!(
            "SHA1".parse::<DigestAlgorithm>(),
            Ok(DigestAlgorithm::Sha1)
        ));
        assert!("md5".parse::<DigestAlgorithm>().is_err());
    }

    #[test]
    fn test_basic_constraints_description() {
        let value = ExtensionValue::BasicConstraints(BasicConstraints {
            is_ca: true,
            max_path_len: Some(0),
        });
        assert_eq!(
            value.describe(),
            vec!["Certificate Authority: Yes", "Max Path Length: 0"]
        );
    }

    #[test]
    fn test_public_key_descriptor() {
        let rsa = PublicKeyInfo {
            algorithm: "RSA".into(),
            oid: crate::oid::RSA_ENCRYPTION.into(),
            key_size: Some(2048),
            curve: None,
            exponent: Some(65537),
            modulus: None,
            key_bytes: Vec::new(),
        };
        assert_eq!(rsa.descriptor(), "RSA 2048 bits");

        let ec = PublicKeyInfo {
            algorithm: "EC".into(),
            oid: crate::oid::EC_PUBLIC_KEY.into(),
            key_size: Some(256),
            curve: Some("P-256".into()),
            exponent: None,
            modulus: None,
            key_bytes: Vec::new(),
        };
        assert_eq!(ec.descriptor(), "EC P-256");
    }
}
