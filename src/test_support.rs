//! Certificate fixtures generated with rcgen for unit tests.

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, CustomExtension, DnType,
    DistinguishedName, IsCa, KeyPair, KeyUsagePurpose, SerialNumber,
};

pub struct Issued {
    pub cert: Certificate,
    pub key: KeyPair,
}

impl Issued {
    pub fn der(&self) -> Vec<u8> {
        self.cert.der().to_vec()
    }
}

fn dn(common_name: &str) -> DistinguishedName {
    let mut dn = DistinguishedName::new();
    dn.push(DnType::CommonName, common_name);
    dn.push(DnType::OrganizationName, "Certview Test");
    dn
}

fn ca_params(common_name: &str) -> CertificateParams {
    let mut params = CertificateParams::new(Vec::<String>::new()).unwrap();
    params.distinguished_name = dn(common_name);
    params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyCertSign,
        KeyUsagePurpose::CrlSign,
    ];
    params
}

pub fn root(common_name: &str) -> Issued {
    let key = KeyPair::generate().unwrap();
    let cert = ca_params(common_name).self_signed(&key).unwrap();
    Issued { cert, key }
}

pub fn intermediate(common_name: &str, parent: &Issued) -> Issued {
    let key = KeyPair::generate().unwrap();
    let cert = ca_params(common_name)
        .signed_by(&key, &parent.cert, &parent.key)
        .unwrap();
    Issued { cert, key }
}

pub fn leaf_params(common_name: &str, sans: &[&str]) -> CertificateParams {
    let names: Vec<String> = sans.iter().map(|s| s.to_string()).collect();
    let mut params = CertificateParams::new(names).unwrap();
    params.distinguished_name = dn(common_name);
    params.key_usages = vec![
        KeyUsagePurpose::DigitalSignature,
        KeyUsagePurpose::KeyEncipherment,
    ];
    params
}

pub fn leaf(common_name: &str, sans: &[&str], parent: &Issued) -> Issued {
    issue(leaf_params(common_name, sans), parent)
}

pub fn issue(params: CertificateParams, parent: &Issued) -> Issued {
    let key = KeyPair::generate().unwrap();
    let cert = params.signed_by(&key, &parent.cert, &parent.key).unwrap();
    Issued { cert, key }
}

pub fn self_signed(params: CertificateParams) -> Issued {
    let key = KeyPair::generate().unwrap();
    let cert = params.self_signed(&key).unwrap();
    Issued { cert, key }
}

/// DER for leaf, intermediate and root, in that order.
pub fn three_level_chain() -> (Vec<u8>, Vec<u8>, Vec<u8>) {
    let root = root("Certview Test Root");
    let inter = intermediate("Certview Test Intermediate", &root);
    let leaf = leaf("example.com", &["example.com", "www.example.com"], &inter);
    (leaf.der(), inter.der(), root.der())
}

pub fn with_custom_extension(oid: &[u64], content: Vec<u8>, critical: bool) -> Vec<u8> {
    let mut params = leaf_params("custom.example.com", &["custom.example.com"]);
    let mut ext = CustomExtension::from_oid_content(oid, content);
    ext.set_criticality(critical);
    params.custom_extensions.push(ext);
    self_signed(params).der()
}

pub fn with_serial(serial: &[u8]) -> Vec<u8> {
    let mut params = leaf_params("serial.example.com", &["serial.example.com"]);
    params.serial_number = Some(SerialNumber::from_slice(serial));
    self_signed(params).der()
}
