//! Certificate detail view as a labelled text tree, plus chain overviews.
//!
//! Output depends only on the record, never on the clock or locale, so the
//! same certificate always renders to the same text.

use crate::chain::Chain;
use crate::error::Result;
use crate::fingerprint::hex_colon;
use crate::oid;
use crate::types::{CertificateRecord, DigestAlgorithm, DistinguishedName};
use chrono::{DateTime, Utc};
use std::fmt;

/// Format used for every timestamp in rendered output.
pub const DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

const HEX_BYTES_PER_LINE: usize = 16;

/// One line of the tree: a label, an optional value and nested children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub label: String,
    pub value: Option<String>,
    pub children: Vec<Node>,
}

impl Node {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: None,
            children: Vec::new(),
        }
    }

    pub fn field(label: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            value: Some(value.into()),
            children: Vec::new(),
        }
    }

    pub fn with_child(mut self, child: Node) -> Self {
        self.children.push(child);
        self
    }

    pub fn push(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Direct child with the given label.
    pub fn child(&self, label: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.label == label)
    }

    fn write_indented(&self, f: &mut fmt::Formatter<'_>, depth: usize) -> fmt::Result {
        let indent = "  ".repeat(depth);
        match &self.value {
            Some(value) => writeln!(f, "{}{}: {}", indent, self.label, value)?,
            None => writeln!(f, "{}{}", indent, self.label)?,
        }
        for child in &self.children {
            child.write_indented(f, depth + 1)?;
        }
        Ok(())
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_indented(f, 0)
    }
}

pub fn format_date(time: &DateTime<Utc>) -> String {
    time.format(DATE_FORMAT).to_string()
}

/// Detail tree: general, validity, subject, issuer, public key,
/// fingerprints, extensions.
pub fn render(record: &CertificateRecord) -> Node {
    let title = record
        .subject
        .common_name()
        .map(str::to_string)
        .unwrap_or_else(|| record.subject.to_oneline());

    Node::field("Certificate", title)
        .with_child(general_section(record))
        .with_child(
            Node::new("Validity")
                .with_child(Node::field("Not Before", format_date(&record.not_before)))
                .with_child(Node::field("Not After", format_date(&record.not_after))),
        )
        .with_child(name_section("Subject", &record.subject))
        .with_child(name_section("Issuer", &record.issuer))
        .with_child(public_key_section(record))
        .with_child(fingerprint_section(record))
        .with_child(extension_section(record))
}

fn general_section(record: &CertificateRecord) -> Node {
    let mut node = Node::new("General")
        .with_child(Node::field("Version", record.version.to_string()))
        .with_child(Node::field("Serial Number", record.serial_hex()))
        .with_child(Node::field(
            "Signature Algorithm",
            format!(
                "{} ({})",
                record.signature_algorithm, record.signature_algorithm_oid
            ),
        ));
    node.push(hex_block("Signature Value", &record.signature));
    node
}

fn name_section(title: &str, name: &DistinguishedName) -> Node {
    let mut node = Node::new(title);
    if name.is_empty() {
        node.push(Node::new("(empty)"));
        return node;
    }
    for (attr, value) in &name.components {
        node.push(Node::field(oid::attribute_long_name(attr), value.clone()));
    }
    node
}

fn public_key_section(record: &CertificateRecord) -> Node {
    let key = &record.public_key;
    let mut node = Node::new("Public Key")
        .with_child(Node::field("Algorithm", format!("{} ({})", key.algorithm, key.oid)));
    if let Some(bits) = key.key_size {
        node.push(Node::field("Key Size", format!("{} bits", bits)));
    }
    if let Some(curve) = &key.curve {
        node.push(Node::field("Curve", curve.clone()));
    }
    if let Some(exponent) = key.exponent {
        node.push(Node::field("Exponent", exponent.to_string()));
    }
    match &key.modulus {
        Some(modulus) => node.push(hex_block("Modulus", modulus)),
        None => node.push(hex_block("Public Value", &key.key_bytes)),
    }
    node
}

fn fingerprint_section(record: &CertificateRecord) -> Node {
    let mut node = Node::new("Fingerprints");
    for (algorithm, digest) in record.fingerprints() {
        node.push(Node::field(algorithm.name(), digest.clone()));
    }
    node
}

fn extension_section(record: &CertificateRecord) -> Node {
    let mut node = Node::new("Extensions");
    if record.extensions.is_empty() {
        node.push(Node::new("(none)"));
        return node;
    }
    for ext in &record.extensions {
        let label = if ext.critical {
            format!("{} [critical]", ext.name)
        } else {
            ext.name.clone()
        };
        let mut child = Node::new(label);
        let lines = ext.value.describe();
        if lines.is_empty() {
            child.push(Node::new("(empty)"));
        }
        for line in lines {
            child.push(Node::new(line));
        }
        node.push(child);
    }
    node
}

fn hex_block(label: &str, bytes: &[u8]) -> Node {
    let mut node = Node::new(label);
    if bytes.is_empty() {
        node.push(Node::new("(empty)"));
    }
    for chunk in bytes.chunks(HEX_BYTES_PER_LINE) {
        node.push(Node::new(hex_colon(chunk)));
    }
    node
}

/// Role of the certificate at `index` within the chain.
pub fn role(chain: &Chain, index: usize) -> &'static str {
    let last = chain.len().saturating_sub(1);
    match index {
        0 if chain.len() == 1 && chain.is_complete() => "Self-signed",
        0 => "Leaf",
        i if i == last && chain.is_complete() => "Root",
        _ => "Intermediate",
    }
}

/// Chain overview: one entry per certificate, completeness and warnings.
pub fn render_chain(chain: &Chain) -> Node {
    let status = if chain.is_complete() {
        "complete"
    } else {
        "incomplete"
    };
    let mut root = Node::field(
        "Certificate Chain",
        format!("{} certificates, {}", chain.len(), status),
    );

    for (index, cert) in chain.iter().enumerate() {
        let mut entry = Node::field(
            format!("[{}] {}", index, role(chain, index)),
            cert.subject.to_oneline(),
        )
        .with_child(Node::field("Issuer", cert.issuer.to_oneline()))
        .with_child(Node::field(
            "Validity",
            format!(
                "{} to {}",
                format_date(&cert.not_before),
                format_date(&cert.not_after)
            ),
        ));
        if let Some(sha256) = cert.fingerprint(DigestAlgorithm::Sha256) {
            entry.push(Node::field("SHA-256", sha256));
        }
        if index + 1 == chain.len() && !chain.is_complete() {
            entry.push(Node::new("(issuer not presented)"));
        }
        root.push(entry);
    }

    if !chain.warnings().is_empty() {
        let mut warnings = Node::new("Warnings");
        for warning in chain.warnings() {
            warnings.push(Node::new(warning.to_string()));
        }
        root.push(warnings);
    }
    root
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Pretty,
    #[cfg(feature = "json")]
    Json,
}

/// Full chain display: overview followed by every certificate's detail tree.
pub fn display_chain(chain: &Chain, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Pretty => Ok(display_pretty(chain)),
        #[cfg(feature = "json")]
        OutputFormat::Json => display_json(chain),
    }
}

fn display_pretty(chain: &Chain) -> String {
    let mut output = render_chain(chain).to_string();
    for cert in chain.iter() {
        output.push('\n');
        output.push_str(&render(cert).to_string());
    }
    output
}

#[cfg(feature = "json")]
fn display_json(chain: &Chain) -> Result<String> {
    use serde::Serialize;
    use std::collections::BTreeMap;

    #[derive(Serialize)]
    struct JsonExtension {
        oid: String,
        name: String,
        critical: bool,
        values: Vec<String>,
    }

    #[derive(Serialize)]
    struct JsonPublicKey {
        algorithm: String,
        oid: String,
        key_size: Option<u32>,
        curve: Option<String>,
    }

    #[derive(Serialize)]
    struct JsonCertificate {
        position: usize,
        role: String,
        version: u32,
        serial_number: String,
        subject: String,
        issuer: String,
        not_before: String,
        not_after: String,
        signature_algorithm: String,
        public_key: JsonPublicKey,
        subject_alt_names: Vec<String>,
        is_ca: bool,
        self_signed: bool,
        fingerprints: BTreeMap<String, String>,
        extensions: Vec<JsonExtension>,
    }

    #[derive(Serialize)]
    struct JsonChain {
        complete: bool,
        total_certificates: usize,
        warnings: Vec<String>,
        certificates: Vec<JsonCertificate>,
    }

    let certificates = chain
        .iter()
        .zip(chain.positions())
        .enumerate()
        .map(|(index, (cert, position))| JsonCertificate {
            position: *position,
            role: role(chain, index).to_string(),
            version: cert.version,
            serial_number: cert.serial_hex(),
            subject: cert.subject.to_oneline(),
            issuer: cert.issuer.to_oneline(),
            not_before: cert.not_before.to_rfc3339(),
            not_after: cert.not_after.to_rfc3339(),
            signature_algorithm: cert.signature_algorithm.clone(),
            public_key: JsonPublicKey {
                algorithm: cert.public_key.algorithm.clone(),
                oid: cert.public_key.oid.clone(),
                key_size: cert.public_key.key_size,
                curve: cert.public_key.curve.clone(),
            },
            subject_alt_names: cert
                .subject_alt_names()
                .iter()
                .map(ToString::to_string)
                .collect(),
            is_ca: cert.is_ca(),
            self_signed: cert.is_self_signed(),
            fingerprints: cert
                .fingerprints()
                .iter()
                .map(|(alg, digest)| (alg.name().to_string(), digest.clone()))
                .collect(),
            extensions: cert
                .extensions
                .iter()
                .map(|ext| JsonExtension {
                    oid: ext.oid.clone(),
                    name: ext.name.clone(),
                    critical: ext.critical,
                    values: ext.value.describe(),
                })
                .collect(),
        })
        .collect();

    let json_chain = JsonChain {
        complete: chain.is_complete(),
        total_certificates: chain.len(),
        warnings: chain.warnings().iter().map(ToString::to_string).collect(),
        certificates,
    };

    Ok(serde_json::to_string_pretty(&json_chain)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::assemble;
    use crate::decode::decode;
    use crate::test_support;
    use crate::types::{ExtensionValue, RawChain, SanEntry};

    fn section_lines(text: &str, section: &str) -> Vec<String> {
        let header = format!("  {}", section);
        let mut lines = Vec::new();
        let mut inside = false;
        for line in text.lines() {
            if line.starts_with("  ") && !line.starts_with("   ") {
                inside = line == header;
                continue;
            }
            if inside {
                lines.push(line.to_string());
            }
        }
        lines
    }

    #[test]
    fn test_section_order() {
        let (leaf, _, _) = test_support::three_level_chain();
        let tree = render(&decode(&leaf).unwrap());
        let labels: Vec<&str> = tree.children.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(
            labels,
            [
                "General",
                "Validity",
                "Subject",
                "Issuer",
                "Public Key",
                "Fingerprints",
                "Extensions"
            ]
        );
        assert_eq!(tree.value.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let (leaf, _, _) = test_support::three_level_chain();
        let a = render(&decode(&leaf).unwrap()).to_string();
        let b = render(&decode(&leaf).unwrap()).to_string();
        assert_eq!(a, b);
        assert!(a.contains("    Common Name: example.com\n"));
        assert!(a.contains("    DNS: www.example.com\n"));
    }

    #[test]
    fn test_san_change_only_touches_extensions() {
        let (leaf, _, _) = test_support::three_level_chain();
        let original = decode(&leaf).unwrap();
        let mut changed = original.clone();
        for ext in &mut changed.extensions {
            if let ExtensionValue::SubjectAltName(names) = &mut ext.value {
                names.push(SanEntry::Dns("api.example.com".into()));
            }
        }

        let before = render(&original).to_string();
        let after = render(&changed).to_string();
        assert_ne!(before, after);
        for section in [
            "General",
            "Validity",
            "Subject",
            "Issuer",
            "Public Key",
            "Fingerprints",
        ] {
            assert_eq!(
                section_lines(&before, section),
                section_lines(&after, section),
                "section {} changed",
                section
            );
        }
        assert!(section_lines(&after, "Extensions")
            .contains(&"      DNS: api.example.com".to_string()));
    }

    #[test]
    fn test_empty_extensions_and_names() {
        let (leaf, _, _) = test_support::three_level_chain();
        let mut record = decode(&leaf).unwrap();
        record.extensions.clear();
        record.issuer = DistinguishedName::new();

        let tree = render(&record);
        let extensions = tree.child("Extensions").unwrap();
        assert_eq!(extensions.children, vec![Node::new("(none)")]);
        let issuer = tree.child("Issuer").unwrap();
        assert_eq!(issuer.children, vec![Node::new("(empty)")]);
    }

    #[test]
    fn test_fixed_date_format() {
        let date = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(format_date(&date), "1970-01-01 00:00:00 UTC");
    }

    #[test]
    fn test_node_display_indents_two_spaces() {
        let tree = Node::new("Root").with_child(
            Node::field("Child", "value").with_child(Node::new("grandchild")),
        );
        assert_eq!(tree.to_string(), "Root\n  Child: value\n    grandchild\n");
    }

    #[test]
    fn test_chain_roles() {
        let (leaf, inter, root) = test_support::three_level_chain();
        let chain = assemble(&RawChain::new(vec![leaf, inter, root])).unwrap();

        assert_eq!(role(&chain, 0), "Leaf");
        assert_eq!(role(&chain, 1), "Intermediate");
        assert_eq!(role(&chain, 2), "Root");

        let text = render_chain(&chain).to_string();
        assert!(text.starts_with("Certificate Chain: 3 certificates, complete\n"));
        assert!(!text.contains("Warnings"));
    }

    #[test]
    fn test_incomplete_chain_overview() {
        let (leaf, _, _) = test_support::three_level_chain();
        let chain = assemble(&RawChain::new(vec![leaf])).unwrap();
        let text = render_chain(&chain).to_string();
        assert!(text.contains("incomplete"));
        assert!(text.contains("(issuer not presented)"));
        assert!(text.contains("Warnings"));
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_json_output() {
        let (leaf, inter, root) = test_support::three_level_chain();
        let chain = assemble(&RawChain::new(vec![root, leaf, inter])).unwrap();
        let json = display_chain(&chain, OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["complete"], true);
        assert_eq!(value["total_certificates"], 3);
        assert_eq!(value["certificates"][0]["role"], "Leaf");
        assert_eq!(value["certificates"][0]["position"], 1);
        assert_eq!(
            value["certificates"][0]["subject_alt_names"][0],
            "DNS: example.com"
        );
    }
}
