//! Object identifiers the decoder and renderer know by name.

// Distinguished name attributes (X.520 / PKCS#9)
pub const COMMON_NAME: &str = "2.5.4.3";
pub const SURNAME: &str = "2.5.4.4";
pub const SERIAL_NUMBER: &str = "2.5.4.5";
pub const COUNTRY: &str = "2.5.4.6";
pub const LOCALITY: &str = "2.5.4.7";
pub const STATE_OR_PROVINCE: &str = "2.5.4.8";
pub const STREET_ADDRESS: &str = "2.5.4.9";
pub const ORGANIZATION: &str = "2.5.4.10";
pub const ORGANIZATIONAL_UNIT: &str = "2.5.4.11";
pub const TITLE: &str = "2.5.4.12";
pub const POSTAL_CODE: &str = "2.5.4.17";
pub const GIVEN_NAME: &str = "2.5.4.42";
pub const EMAIL_ADDRESS: &str = "1.2.840.113549.1.9.1";
pub const DOMAIN_COMPONENT: &str = "0.9.2342.19200300.100.1.25";
pub const BUSINESS_CATEGORY: &str = "2.5.4.15";
pub const JURISDICTION_COUNTRY: &str = "1.3.6.1.4.1.311.60.2.1.3";

// Signature algorithms
pub const SHA1_WITH_RSA: &str = "1.2.840.113549.1.1.5";
pub const SHA256_WITH_RSA: &str = "1.2.840.113549.1.1.11";
pub const SHA384_WITH_RSA: &str = "1.2.840.113549.1.1.12";
pub const SHA512_WITH_RSA: &str = "1.2.840.113549.1.1.13";
pub const RSASSA_PSS: &str = "1.2.840.113549.1.1.10";
pub const ECDSA_WITH_SHA256: &str = "1.2.840.10045.4.3.2";
pub const ECDSA_WITH_SHA384: &str = "1.2.840.10045.4.3.3";
pub const ECDSA_WITH_SHA512: &str = "1.2.840.10045.4.3.4";
pub const ED25519: &str = "1.3.101.112";
pub const ED448: &str = "1.3.101.113";

// Public key types
pub const RSA_ENCRYPTION: &str = "1.2.840.113549.1.1.1";
pub const EC_PUBLIC_KEY: &str = "1.2.840.10045.2.1";
pub const DSA: &str = "1.2.840.10040.4.1";

// Named curves
pub const CURVE_P256: &str = "1.2.840.10045.3.1.7";
pub const CURVE_P384: &str = "1.3.132.0.34";
pub const CURVE_P521: &str = "1.3.132.0.35";

// X.509v3 extensions
pub const EXT_SUBJECT_KEY_ID: &str = "2.5.29.14";
pub const EXT_KEY_USAGE: &str = "2.5.29.15";
pub const EXT_SUBJECT_ALT_NAME: &str = "2.5.29.17";
pub const EXT_ISSUER_ALT_NAME: &str = "2.5.29.18";
pub const EXT_BASIC_CONSTRAINTS: &str = "2.5.29.19";
pub const EXT_NAME_CONSTRAINTS: &str = "2.5.29.30";
pub const EXT_CRL_DISTRIBUTION_POINTS: &str = "2.5.29.31";
pub const EXT_CERTIFICATE_POLICIES: &str = "2.5.29.32";
pub const EXT_POLICY_MAPPINGS: &str = "2.5.29.33";
pub const EXT_AUTHORITY_KEY_ID: &str = "2.5.29.35";
pub const EXT_POLICY_CONSTRAINTS: &str = "2.5.29.36";
pub const EXT_EXTENDED_KEY_USAGE: &str = "2.5.29.37";
pub const EXT_INHIBIT_ANY_POLICY: &str = "2.5.29.54";
pub const EXT_AUTHORITY_INFO_ACCESS: &str = "1.3.6.1.5.5.7.1.1";
pub const EXT_SCT_LIST: &str = "1.3.6.1.4.1.11129.2.4.2";
pub const EXT_NETSCAPE_COMMENT: &str = "2.16.840.1.113730.1.13";

pub const ACCESS_OCSP: &str = "1.3.6.1.5.5.7.48.1";
pub const ACCESS_CA_ISSUERS: &str = "1.3.6.1.5.5.7.48.2";

// Extended key usages outside the set x509-parser flags itself
pub const EKU_IPSEC_END_SYSTEM: &str = "1.3.6.1.5.5.7.3.5";
pub const EKU_IPSEC_TUNNEL: &str = "1.3.6.1.5.5.7.3.6";
pub const EKU_IPSEC_USER: &str = "1.3.6.1.5.5.7.3.7";
pub const EKU_MS_SERVER_GATED_CRYPTO: &str = "1.3.6.1.4.1.311.10.3.3";
pub const EKU_NS_SERVER_GATED_CRYPTO: &str = "2.16.840.1.113730.4.1";

/// Short attribute name used in one-line distinguished names (`CN`, `O`, ...).
/// Unknown attributes keep their dotted OID.
pub fn attribute_short_name(oid: &str) -> String {
    match oid {
        COMMON_NAME => "CN",
        SURNAME => "SN",
        SERIAL_NUMBER => "serialNumber",
        COUNTRY => "C",
        LOCALITY => "L",
        STATE_OR_PROVINCE => "ST",
        STREET_ADDRESS => "street",
        ORGANIZATION => "O",
        ORGANIZATIONAL_UNIT => "OU",
        TITLE => "title",
        POSTAL_CODE => "postalCode",
        GIVEN_NAME => "GN",
        EMAIL_ADDRESS => "emailAddress",
        DOMAIN_COMPONENT => "DC",
        BUSINESS_CATEGORY => "businessCategory",
        JURISDICTION_COUNTRY => "jurisdictionC",
        other => other,
    }
    .to_string()
}

/// Label used by the detail view for a short attribute name.
pub fn attribute_long_name(short: &str) -> &str {
    match short {
        "CN" => "Common Name",
        "SN" => "Surname",
        "serialNumber" => "Serial Number",
        "C" => "Country",
        "L" => "Locality",
        "ST" => "State/Province",
        "street" => "Street Address",
        "O" => "Organization",
        "OU" => "Organizational Unit",
        "title" => "Title",
        "postalCode" => "Postal Code",
        "GN" => "Given Name",
        "emailAddress" => "Email Address",
        "DC" => "Domain Component",
        "businessCategory" => "Business Category",
        "jurisdictionC" => "Jurisdiction Country",
        other => other,
    }
}

pub fn signature_algorithm_name(oid: &str) -> String {
    match oid {
        SHA1_WITH_RSA => "sha1WithRSAEncryption",
        SHA256_WITH_RSA => "sha256WithRSAEncryption",
        SHA384_WITH_RSA => "sha384WithRSAEncryption",
        SHA512_WITH_RSA => "sha512WithRSAEncryption",
        RSASSA_PSS => "rsassaPss",
        ECDSA_WITH_SHA256 => "ecdsa-with-SHA256",
        ECDSA_WITH_SHA384 => "ecdsa-with-SHA384",
        ECDSA_WITH_SHA512 => "ecdsa-with-SHA512",
        ED25519 => "Ed25519",
        ED448 => "Ed448",
        other => other,
    }
    .to_string()
}

pub fn extension_name(oid: &str) -> String {
    match oid {
        EXT_SUBJECT_KEY_ID => "Subject Key Identifier",
        EXT_KEY_USAGE => "Key Usage",
        EXT_SUBJECT_ALT_NAME => "Subject Alternative Name",
        EXT_ISSUER_ALT_NAME => "Issuer Alternative Name",
        EXT_BASIC_CONSTRAINTS => "Basic Constraints",
        EXT_NAME_CONSTRAINTS => "Name Constraints",
        EXT_CRL_DISTRIBUTION_POINTS => "CRL Distribution Points",
        EXT_CERTIFICATE_POLICIES => "Certificate Policies",
        EXT_POLICY_MAPPINGS => "Policy Mappings",
        EXT_AUTHORITY_KEY_ID => "Authority Key Identifier",
        EXT_POLICY_CONSTRAINTS => "Policy Constraints",
        EXT_EXTENDED_KEY_USAGE => "Extended Key Usage",
        EXT_INHIBIT_ANY_POLICY => "Inhibit Any-Policy",
        EXT_AUTHORITY_INFO_ACCESS => "Authority Information Access",
        EXT_SCT_LIST => "Signed Certificate Timestamps",
        EXT_NETSCAPE_COMMENT => "Netscape Comment",
        other => other,
    }
    .to_string()
}

pub fn extended_key_usage_name(oid: &str) -> String {
    match oid {
        EKU_IPSEC_END_SYSTEM => "IPSec End System",
        EKU_IPSEC_TUNNEL => "IPSec Tunnel",
        EKU_IPSEC_USER => "IPSec User",
        EKU_MS_SERVER_GATED_CRYPTO => "Microsoft Server Gated Crypto",
        EKU_NS_SERVER_GATED_CRYPTO => "Netscape Server Gated Crypto",
        other => other,
    }
    .to_string()
}

pub fn curve_name(oid: &str) -> String {
    match oid {
        CURVE_P256 => "P-256",
        CURVE_P384 => "P-384",
        CURVE_P521 => "P-521",
        other => other,
    }
    .to_string()
}
