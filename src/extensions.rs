//! Extension registry: maps an extension OID to the function that decodes it.
//!
//! Extensions without a registered decoder, or whose registered decoder
//! rejects them, are kept as [`ExtensionValue::Opaque`] when non-critical.
//! A critical extension that cannot be decoded fails the whole certificate.

use crate::error::{Error, Result};
use crate::fingerprint::hex_colon;
use crate::oid;
use crate::types::{
    AccessDescription, AuthorityKeyId, BasicConstraints, Extension, ExtensionValue, KeyUsage,
    SanEntry,
};
use log::debug;
use std::collections::{BTreeSet, HashMap};
use std::net::IpAddr;
use std::sync::OnceLock;
use x509_parser::extensions::DistributionPointName;
use x509_parser::prelude::*;

/// Returns `None` when the extension does not have the expected structure.
pub type ExtensionDecoder = fn(&X509Extension<'_>) -> Option<ExtensionValue>;

#[derive(Clone)]
pub struct ExtensionRegistry {
    decoders: HashMap<String, ExtensionDecoder>,
}

impl ExtensionRegistry {
    pub fn empty() -> Self {
        Self {
            decoders: HashMap::new(),
        }
    }

    /// Shared registry with every built-in decoder.
    pub fn standard() -> &'static ExtensionRegistry {
        static STANDARD: OnceLock<ExtensionRegistry> = OnceLock::new();
        STANDARD.get_or_init(ExtensionRegistry::default)
    }

    /// Register a decoder, returning the one it replaces.
    pub fn register(
        &mut self,
        oid: impl Into<String>,
        decoder: ExtensionDecoder,
    ) -> Option<ExtensionDecoder> {
        self.decoders.insert(oid.into(), decoder)
    }

    pub fn with(mut self, oid: impl Into<String>, decoder: ExtensionDecoder) -> Self {
        self.register(oid, decoder);
        self
    }

    pub fn contains(&self, oid: &str) -> bool {
        self.decoders.contains_key(oid)
    }

    pub fn len(&self) -> usize {
        self.decoders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.decoders.is_empty()
    }

    pub(crate) fn decode_extension(&self, ext: &X509Extension<'_>) -> Result<Extension> {
        let oid = ext.oid.to_id_string();
        let name = oid::extension_name(&oid);

        let decoded = match self.decoders.get(&oid) {
            Some(decoder) => decoder(ext).ok_or_else(|| failure_reason(ext)),
            None => Err("not recognized".to_string()),
        };

        let value = match decoded {
            Ok(value) => value,
            Err(reason) if ext.critical => {
                return Err(Error::malformed(format!(
                    "critical extension {} ({}) {}",
                    name, oid, reason
                )));
            }
            Err(reason) => {
                debug!("Keeping extension {} as opaque bytes: {}", oid, reason);
                ExtensionValue::Opaque(ext.value.to_vec())
            }
        };

        Ok(Extension {
            oid,
            name,
            critical: ext.critical,
            value,
        })
    }
}

impl Default for ExtensionRegistry {
    fn default() -> Self {
        Self::empty()
            .with(oid::EXT_SUBJECT_ALT_NAME, decode_subject_alt_name)
            .with(oid::EXT_ISSUER_ALT_NAME, decode_issuer_alt_name)
            .with(oid::EXT_KEY_USAGE, decode_key_usage)
            .with(oid::EXT_EXTENDED_KEY_USAGE, decode_extended_key_usage)
            .with(oid::EXT_BASIC_CONSTRAINTS, decode_basic_constraints)
            .with(oid::EXT_SUBJECT_KEY_ID, decode_subject_key_id)
            .with(oid::EXT_AUTHORITY_KEY_ID, decode_authority_key_id)
            .with(oid::EXT_AUTHORITY_INFO_ACCESS, decode_authority_info_access)
            .with(oid::EXT_CRL_DISTRIBUTION_POINTS, decode_crl_distribution_points)
            .with(oid::EXT_CERTIFICATE_POLICIES, decode_certificate_policies)
            .with(oid::EXT_POLICY_MAPPINGS, decode_policy_mappings)
            .with(oid::EXT_POLICY_CONSTRAINTS, decode_policy_constraints)
            .with(oid::EXT_NAME_CONSTRAINTS, decode_name_constraints)
            .with(oid::EXT_INHIBIT_ANY_POLICY, decode_inhibit_any_policy)
            .with(oid::EXT_SCT_LIST, decode_sct_list)
            .with(oid::EXT_NETSCAPE_COMMENT, decode_netscape_comment)
    }
}

impl std::fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut oids: Vec<&String> = self.decoders.keys().collect();
        oids.sort();
        f.debug_struct("ExtensionRegistry")
            .field("oids", &oids)
            .finish()
    }
}

fn failure_reason(ext: &X509Extension<'_>) -> String {
    match ext.parsed_extension() {
        ParsedExtension::ParseError { error } => format!("is malformed: {:?}", error),
        _ => "has an unexpected structure".to_string(),
    }
}

fn decode_subject_alt_name(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    match ext.parsed_extension() {
        ParsedExtension::SubjectAlternativeName(san) => Some(ExtensionValue::SubjectAltName(
            san.general_names.iter().map(san_entry).collect(),
        )),
        _ => None,
    }
}

fn decode_issuer_alt_name(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    match ext.parsed_extension() {
        ParsedExtension::IssuerAlternativeName(ian) => Some(ExtensionValue::IssuerAltName(
            ian.general_names.iter().map(san_entry).collect(),
        )),
        _ => None,
    }
}

fn decode_key_usage(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    let ku = match ext.parsed_extension() {
        ParsedExtension::KeyUsage(ku) => ku,
        _ => return None,
    };
    let flags = [
        (ku.digital_signature(), KeyUsage::DigitalSignature),
        (ku.non_repudiation(), KeyUsage::NonRepudiation),
        (ku.key_encipherment(), KeyUsage::KeyEncipherment),
        (ku.data_encipherment(), KeyUsage::DataEncipherment),
        (ku.key_agreement(), KeyUsage::KeyAgreement),
        (ku.key_cert_sign(), KeyUsage::KeyCertSign),
        (ku.crl_sign(), KeyUsage::CrlSign),
        (ku.encipher_only(), KeyUsage::EncipherOnly),
        (ku.decipher_only(), KeyUsage::DecipherOnly),
    ];
    let bits: BTreeSet<KeyUsage> = flags
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, bit)| *bit)
        .collect();
    Some(ExtensionValue::KeyUsage(bits))
}

fn decode_extended_key_usage(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    let eku = match ext.parsed_extension() {
        ParsedExtension::ExtendedKeyUsage(eku) => eku,
        _ => return None,
    };
    let known = [
        (eku.any, "Any Extended Key Usage"),
        (eku.server_auth, "TLS Web Server Authentication"),
        (eku.client_auth, "TLS Web Client Authentication"),
        (eku.code_signing, "Code Signing"),
        (eku.email_protection, "E-mail Protection"),
        (eku.time_stamping, "Time Stamping"),
        (eku.ocsp_signing, "OCSP Signing"),
    ];
    let mut usages: Vec<String> = known
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, name)| name.to_string())
        .collect();
    usages.extend(
        eku.other
            .iter()
            .map(|usage| oid::extended_key_usage_name(&usage.to_id_string())),
    );
    Some(ExtensionValue::ExtendedKeyUsage(usages))
}

fn decode_basic_constraints(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    match ext.parsed_extension() {
        ParsedExtension::BasicConstraints(bc) => {
            Some(ExtensionValue::BasicConstraints(BasicConstraints {
                is_ca: bc.ca,
                max_path_len: bc.path_len_constraint,
            }))
        }
        _ => None,
    }
}

fn decode_subject_key_id(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    match ext.parsed_extension() {
        ParsedExtension::SubjectKeyIdentifier(ski) => {
            Some(ExtensionValue::SubjectKeyId(ski.0.to_vec()))
        }
        _ => None,
    }
}

fn decode_authority_key_id(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    let aki = match ext.parsed_extension() {
        ParsedExtension::AuthorityKeyIdentifier(aki) => aki,
        _ => return None,
    };
    Some(ExtensionValue::AuthorityKeyId(AuthorityKeyId {
        key_id: aki.key_identifier.as_ref().map(|ki| ki.0.to_vec()),
        issuer: aki
            .authority_cert_issuer
            .as_ref()
            .map(|names| names.iter().map(san_entry).collect())
            .unwrap_or_default(),
        serial: aki.authority_cert_serial.map(|s| s.to_vec()),
    }))
}

fn decode_authority_info_access(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    let aia = match ext.parsed_extension() {
        ParsedExtension::AuthorityInfoAccess(aia) => aia,
        _ => return None,
    };
    let entries = aia
        .accessdescs
        .iter()
        .map(|desc| {
            let method = match desc.access_method.to_id_string().as_str() {
                oid::ACCESS_OCSP => "OCSP".to_string(),
                oid::ACCESS_CA_ISSUERS => "CA Issuers".to_string(),
                other => other.to_string(),
            };
            AccessDescription {
                method,
                location: general_name_text(&desc.access_location),
            }
        })
        .collect();
    Some(ExtensionValue::AuthorityInfoAccess(entries))
}

fn decode_crl_distribution_points(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    let cdp = match ext.parsed_extension() {
        ParsedExtension::CRLDistributionPoints(cdp) => cdp,
        _ => return None,
    };
    let mut locations = Vec::new();
    for point in &cdp.points {
        if let Some(DistributionPointName::FullName(names)) = &point.distribution_point {
            locations.extend(names.iter().map(general_name_text));
        }
    }
    Some(ExtensionValue::CrlDistributionPoints(locations))
}

fn decode_certificate_policies(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    match ext.parsed_extension() {
        ParsedExtension::CertificatePolicies(policies) => {
            Some(ExtensionValue::CertificatePolicies(
                policies
                    .iter()
                    .map(|p| p.policy_id.to_id_string())
                    .collect(),
            ))
        }
        _ => None,
    }
}

fn decode_policy_mappings(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    match ext.parsed_extension() {
        ParsedExtension::PolicyMappings(pm) => Some(ExtensionValue::PolicyMappings(
            pm.mappings
                .iter()
                .map(|m| {
                    (
                        m.issuer_domain_policy.to_id_string(),
                        m.subject_domain_policy.to_id_string(),
                    )
                })
                .collect(),
        )),
        _ => None,
    }
}

fn decode_policy_constraints(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    match ext.parsed_extension() {
        ParsedExtension::PolicyConstraints(pc) => Some(ExtensionValue::PolicyConstraints {
            require_explicit_policy: pc.require_explicit_policy,
            inhibit_policy_mapping: pc.inhibit_policy_mapping,
        }),
        _ => None,
    }
}

fn decode_name_constraints(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    let nc = match ext.parsed_extension() {
        ParsedExtension::NameConstraints(nc) => nc,
        _ => return None,
    };
    Some(ExtensionValue::NameConstraints {
        permitted: subtree_names(&nc.permitted_subtrees),
        excluded: subtree_names(&nc.excluded_subtrees),
    })
}

fn subtree_names(trees: &Option<Vec<GeneralSubtree<'_>>>) -> Vec<SanEntry> {
    trees
        .as_ref()
        .map(|list| list.iter().map(|t| san_entry(&t.base)).collect())
        .unwrap_or_default()
}

fn decode_inhibit_any_policy(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    match ext.parsed_extension() {
        ParsedExtension::InhibitAnyPolicy(iap) => {
            Some(ExtensionValue::InhibitAnyPolicy(iap.skip_certs))
        }
        _ => None,
    }
}

fn decode_sct_list(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    match ext.parsed_extension() {
        ParsedExtension::SCT(timestamps) => {
            Some(ExtensionValue::SignedCertificateTimestamps(timestamps.len()))
        }
        _ => None,
    }
}

fn decode_netscape_comment(ext: &X509Extension<'_>) -> Option<ExtensionValue> {
    match ext.parsed_extension() {
        ParsedExtension::NsCertComment(comment) => {
            Some(ExtensionValue::NetscapeComment(comment.to_string()))
        }
        _ => None,
    }
}

pub(crate) fn san_entry(name: &GeneralName<'_>) -> SanEntry {
    match name {
        GeneralName::DNSName(dns) => SanEntry::Dns(dns.to_string()),
        GeneralName::RFC822Name(email) => SanEntry::Email(email.to_string()),
        GeneralName::URI(uri) => SanEntry::Uri(uri.to_string()),
        GeneralName::IPAddress(bytes) => match ip_from_bytes(bytes) {
            Some(ip) => SanEntry::Ip(ip),
            None => SanEntry::Other(hex_colon(bytes)),
        },
        GeneralName::DirectoryName(dn) => SanEntry::DirName(crate::decode::build_dn(dn)),
        GeneralName::RegisteredID(oid) => SanEntry::RegisteredId(oid.to_id_string()),
        other => SanEntry::Other(format!("{:?}", other)),
    }
}

fn general_name_text(name: &GeneralName<'_>) -> String {
    match san_entry(name) {
        SanEntry::Dns(v) | SanEntry::Email(v) | SanEntry::Uri(v) | SanEntry::Other(v) => v,
        SanEntry::RegisteredId(v) => v,
        SanEntry::Ip(ip) => ip.to_string(),
        SanEntry::DirName(dn) => dn.to_oneline(),
    }
}

fn ip_from_bytes(bytes: &[u8]) -> Option<IpAddr> {
    if let Ok(octets) = <[u8; 4]>::try_from(bytes) {
        Some(IpAddr::from(octets))
    } else if let Ok(octets) = <[u8; 16]>::try_from(bytes) {
        Some(IpAddr::from(octets))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_registry_covers_core_extensions() {
        let registry = ExtensionRegistry::standard();
        for oid in [
            oid::EXT_SUBJECT_ALT_NAME,
            oid::EXT_KEY_USAGE,
            oid::EXT_EXTENDED_KEY_USAGE,
            oid::EXT_BASIC_CONSTRAINTS,
            oid::EXT_SUBJECT_KEY_ID,
            oid::EXT_AUTHORITY_KEY_ID,
        ] {
            assert!(registry.contains(oid), "missing decoder for {}", oid);
        }
        assert!(!registry.contains("1.3.6.1.4.1.55555.1"));
    }

    #[test]
    fn test_register_replaces_decoder() {
        fn always_comment(_: &X509Extension<'_>) -> Option<ExtensionValue> {
            Some(ExtensionValue::NetscapeComment("custom".into()))
        }

        let mut registry = ExtensionRegistry::empty();
        assert!(registry.is_empty());
        assert!(registry.register("1.2.3.4", always_comment).is_none());
        assert!(registry.register("1.2.3.4", always_comment).is_some());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_ip_from_bytes() {
        assert_eq!(
            ip_from_bytes(&[127, 0, 0, 1]),
            Some("127.0.0.1".parse().unwrap())
        );
        assert!(ip_from_bytes(&[0u8; 16]).is_some());
        assert_eq!(ip_from_bytes(&[10, 0, 0, 0, 255, 0, 0, 0]), None);
    }
}
