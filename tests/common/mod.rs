//! Fixtures shared by the integration tests: an rcgen hierarchy and a
//! local rustls server that presents it.

#![allow(dead_code)]

use rcgen::{
    BasicConstraints, Certificate, CertificateParams, DnType, IsCa, KeyPair, KeyUsagePurpose,
};
use rustls::pki_types::{CertificateDer, PrivateKeyDer, PrivatePkcs8KeyDer};
use rustls::{ServerConfig, ServerConnection};
use std::io::{Read, Write};
use std::net::{SocketAddr, TcpListener};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

pub struct Hierarchy {
    pub leaf: Vec<u8>,
    pub intermediate: Vec<u8>,
    pub root: Vec<u8>,
    pub leaf_key: KeyPair,
}

fn params(common_name: &str, sans: Vec<String>, ca: bool) -> CertificateParams {
    let mut params = CertificateParams::new(sans).unwrap();
    params.distinguished_name.push(DnType::CommonName, common_name);
    params
        .distinguished_name
        .push(DnType::OrganizationName, "Certview Integration");
    if ca {
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        params.key_usages = vec![KeyUsagePurpose::KeyCertSign, KeyUsagePurpose::CrlSign];
    }
    params
}

pub fn hierarchy() -> Hierarchy {
    let root_key = KeyPair::generate().unwrap();
    let root: Certificate = params("Integration Root", vec![], true)
        .self_signed(&root_key)
        .unwrap();

    let inter_key = KeyPair::generate().unwrap();
    let inter = params("Integration Intermediate", vec![], true)
        .signed_by(&inter_key, &root, &root_key)
        .unwrap();

    let leaf_key = KeyPair::generate().unwrap();
    let leaf = params("localhost", vec!["localhost".to_string()], false)
        .signed_by(&leaf_key, &inter, &inter_key)
        .unwrap();

    Hierarchy {
        leaf: leaf.der().to_vec(),
        intermediate: inter.der().to_vec(),
        root: root.der().to_vec(),
        leaf_key,
    }
}

/// Serve one TLS handshake presenting `chain` (leaf first) on a loopback port.
pub fn tls_server(chain: Vec<Vec<u8>>, key: &KeyPair) -> SocketAddr {
    let certs: Vec<CertificateDer<'static>> = chain.into_iter().map(CertificateDer::from).collect();
    let key = PrivateKeyDer::Pkcs8(PrivatePkcs8KeyDer::from(key.serialize_der()));
    let config = ServerConfig::builder_with_provider(Arc::new(
        rustls::crypto::ring::default_provider(),
    ))
    .with_safe_default_protocol_versions()
    .unwrap()
    .with_no_client_auth()
    .with_single_cert(certs, key)
    .unwrap();
    let config = Arc::new(config);

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((mut sock, _)) = listener.accept() {
            let mut conn = ServerConnection::new(config).unwrap();
            while conn.is_handshaking() {
                match conn.complete_io(&mut sock) {
                    Ok((0, 0)) | Err(_) => return,
                    Ok(_) => {}
                }
            }
            // Drain until the client sends close_notify or hangs up.
            let _ = conn.complete_io(&mut sock);
        }
    });
    addr
}

/// Answer the first client with plaintext instead of a TLS record.
pub fn plaintext_server() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((mut sock, _)) = listener.accept() {
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf);
            let _ = sock.write_all(b"HTTP/1.1 400 Bad Request\r\nContent-Length: 0\r\n\r\n");
        }
    });
    addr
}

/// Accept one client and hold the connection open without sending anything.
pub fn silent_server(hold: Duration) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        if let Ok((sock, _)) = listener.accept() {
            thread::sleep(hold);
            drop(sock);
        }
    });
    addr
}

/// A loopback port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}
