//! DER certificate decoding into [`CertificateRecord`].

use crate::error::{Error, Result};
use crate::extensions::ExtensionRegistry;
use crate::fingerprint::fingerprint_map;
use crate::oid;
use crate::types::{CertificateRecord, DistinguishedName, PublicKeyInfo};
use chrono::{DateTime, Utc};
use log::trace;
use num_bigint::BigUint;
use x509_parser::prelude::*;
use x509_parser::public_key::PublicKey;

/// Decode one DER certificate with the standard extension registry.
pub fn decode(der: &[u8]) -> Result<CertificateRecord> {
    decode_with(der, ExtensionRegistry::standard())
}

/// Decode one DER certificate, dispatching extensions through `registry`.
///
/// The input must hold exactly one certificate: trailing bytes, a version
/// above v3 or a validity window that ends before it starts are rejected.
pub fn decode_with(der: &[u8], registry: &ExtensionRegistry) -> Result<CertificateRecord> {
    if der.is_empty() {
        return Err(Error::malformed("empty input"));
    }

    let (remaining, x509) = X509Certificate::from_der(der)?;
    if !remaining.is_empty() {
        return Err(Error::malformed(format!(
            "{} trailing bytes after certificate",
            remaining.len()
        )));
    }

    let tbs = &x509.tbs_certificate;
    if tbs.version.0 > 2 {
        return Err(Error::malformed(format!(
            "unsupported X.509 version {}",
            tbs.version.0 + 1
        )));
    }

    let not_before = to_datetime(&tbs.validity.not_before)?;
    let not_after = to_datetime(&tbs.validity.not_after)?;
    if not_before > not_after {
        return Err(Error::malformed(format!(
            "notBefore {} is after notAfter {}",
            not_before, not_after
        )));
    }

    let extensions = tbs
        .extensions()
        .iter()
        .map(|ext| registry.decode_extension(ext))
        .collect::<Result<Vec<_>>>()?;

    let subject = build_dn(&tbs.subject);
    let issuer = build_dn(&tbs.issuer);
    let self_signed = subject == issuer && x509.verify_signature(None).is_ok();

    let signature_algorithm_oid = x509.signature_algorithm.algorithm.to_id_string();
    trace!(
        "Decoded certificate {} ({} extensions)",
        subject,
        extensions.len()
    );

    Ok(CertificateRecord {
        version: tbs.version.0 + 1,
        serial_number: BigUint::from_bytes_be(tbs.raw_serial()),
        subject,
        issuer,
        not_before,
        not_after,
        public_key: build_public_key(&tbs.subject_pki),
        signature_algorithm: oid::signature_algorithm_name(&signature_algorithm_oid),
        signature_algorithm_oid,
        signature: x509.signature_value.data.to_vec(),
        extensions,
        fingerprints: fingerprint_map(der),
        self_signed,
        raw_der: der.to_vec(),
    })
}

pub(crate) fn build_dn(name: &X509Name<'_>) -> DistinguishedName {
    let mut components = Vec::new();
    for rdn in name.iter() {
        for attr in rdn.iter() {
            let key = oid::attribute_short_name(&attr.attr_type().to_id_string());
            let value = match attr.as_str() {
                Ok(text) => text.to_string(),
                // Non-string attribute types are shown as hex.
                Err(_) => format!("#{}", hex::encode(attr.attr_value().as_bytes())),
            };
            components.push((key, value));
        }
    }
    DistinguishedName { components }
}

fn to_datetime(time: &ASN1Time) -> Result<DateTime<Utc>> {
    let ts = time.timestamp();
    DateTime::from_timestamp(ts, 0)
        .ok_or_else(|| Error::malformed(format!("timestamp {} out of range", ts)))
}

fn build_public_key(spki: &SubjectPublicKeyInfo<'_>) -> PublicKeyInfo {
    let oid_str = spki.algorithm.algorithm.to_id_string();
    let key_bytes = spki.subject_public_key.data.to_vec();

    let mut info = PublicKeyInfo {
        algorithm: oid_str.clone(),
        oid: oid_str.clone(),
        key_size: None,
        curve: None,
        exponent: None,
        modulus: None,
        key_bytes,
    };

    match oid_str.as_str() {
        oid::RSA_ENCRYPTION => {
            info.algorithm = "RSA".into();
            if let Ok(PublicKey::RSA(rsa)) = spki.parsed() {
                let modulus = strip_leading_zeros(rsa.modulus);
                info.key_size = Some(modulus.len() as u32 * 8);
                info.exponent = exponent_u64(rsa.exponent);
                info.modulus = Some(modulus.to_vec());
            }
        }
        oid::EC_PUBLIC_KEY => {
            info.algorithm = "EC".into();
            let curve = spki
                .algorithm
                .parameters
                .as_ref()
                .and_then(|params| params.as_oid().ok())
                .map(|curve| oid::curve_name(&curve.to_id_string()));
            info.key_size = match curve.as_deref() {
                Some("P-256") => Some(256),
                Some("P-384") => Some(384),
                Some("P-521") => Some(521),
                _ => None,
            };
            info.curve = curve;
        }
        oid::DSA => {
            info.algorithm = "DSA".into();
        }
        oid::ED25519 => {
            info.algorithm = "Ed25519".into();
            info.key_size = Some(256);
        }
        oid::ED448 => {
            info.algorithm = "Ed448".into();
            info.key_size = Some(448);
        }
        _ => {}
    }

    info
}

fn strip_leading_zeros(bytes: &[u8]) -> &[u8] {
    match bytes.iter().position(|&b| b != 0) {
        Some(pos) => &bytes[pos..],
        None => bytes,
    }
}

fn exponent_u64(bytes: &[u8]) -> Option<u64> {
    let significant = strip_leading_zeros(bytes);
    if significant.len() > 8 {
        return None;
    }
    Some(
        significant
            .iter()
            .fold(0u64, |acc, b| (acc << 8) | u64::from(*b)),
    )
}
