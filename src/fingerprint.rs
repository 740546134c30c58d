//! Certificate fingerprints over the raw DER bytes.

use crate::types::DigestAlgorithm;
use sha2::Digest;
use std::collections::BTreeMap;

/// Digests recorded on every decoded certificate.
pub const RECORDED_DIGESTS: [DigestAlgorithm; 2] = [DigestAlgorithm::Sha1, DigestAlgorithm::Sha256];

/// Compute the fingerprint of DER bytes as colon-separated uppercase hex.
pub fn compute_fingerprint(der: &[u8], algorithm: DigestAlgorithm) -> String {
    let digest: Vec<u8> = match algorithm {
        DigestAlgorithm::Sha1 => sha1::Sha1::digest(der).to_vec(),
        DigestAlgorithm::Sha256 => sha2::Sha256::digest(der).to_vec(),
        DigestAlgorithm::Sha384 => sha2::Sha384::digest(der).to_vec(),
        DigestAlgorithm::Sha512 => sha2::Sha512::digest(der).to_vec(),
    };
    hex_colon(&digest)
}

pub(crate) fn fingerprint_map(der: &[u8]) -> BTreeMap<DigestAlgorithm, String> {
    RECORDED_DIGESTS
        .iter()
        .map(|alg| (*alg, compute_fingerprint(der, *alg)))
        .collect()
}

/// `AB:CD:EF` formatting shared by fingerprints, serials and key identifiers.
pub(crate) fn hex_colon(bytes: &[u8]) -> String {
    let encoded = hex::encode_upper(bytes);
    encoded
        .as_bytes()
        .chunks(2)
        .filter_map(|pair| std::str::from_utf8(pair).ok())
        .collect::<Vec<_>>()
        .join(":")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_sha256() {
        // SHA-256 of the empty string
        let fp = compute_fingerprint(b"", DigestAlgorithm::Sha256);
        assert!(fp.starts_with("E3:B0:C4:42:98:FC:1C:14"));
        assert_eq!(fp.len(), 32 * 3 - 1);
    }

    #[test]
    fn test_digest_lengths() {
        let der = [0x30u8, 0x03, 0x02, 0x01, 0x01];
        assert_eq!(compute_fingerprint(&der, DigestAlgorithm::Sha1).len(), 20 * 3 - 1);
        assert_eq!(compute_fingerprint(&der, DigestAlgorithm::Sha384).len(), 48 * 3 - 1);
        assert_eq!(compute_fingerprint(&der, DigestAlgorithm::Sha512).len(), 64 * 3 - 1);
    }

    #[test]
    fn test_hex_colon() {
        assert_eq!(hex_colon(&[0x00, 0x93, 0xce]), "00:93:CE");
        assert_eq!(hex_colon(&[]), "");
    }

    #[test]
    fn test_fingerprint_map_contains_recorded_digests() {
        let map = fingerprint_map(b"abc");
        assert_eq!(map.len(), 2);
        assert_eq!(
            map[&DigestAlgorithm::Sha1],
            "A9:99:3E:36:47:06:81:6A:BA:3E:25:71:78:50:C2:6C:9C:D0:D8:9D"
        );
    }
}
