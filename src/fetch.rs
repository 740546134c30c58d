//! Handshake capture: connect, complete a TLS handshake without validating
//! the peer, and keep the certificate list exactly as the server sent it.

use crate::error::{Error, Result};
use crate::types::RawChain;
use log::{debug, info, warn};
use rustls::client::danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier};
use rustls::pki_types::{CertificateDer, ServerName, UnixTime};
use rustls::{ClientConfig, ClientConnection, DigitallySignedStruct, SignatureScheme};
use std::fmt;
use std::io::{self, ErrorKind};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 443;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Host and port to capture from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub host: String,
    pub port: u16,
}

impl Target {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Parse `host`, `host:port`, `scheme://host[:port][/path]`, `[v6]:port`
    /// or a bare IPv6 literal. `default_port` applies when none is given.
    pub fn parse(input: &str, default_port: u16) -> Result<Self> {
        let mut rest = input.trim();
        if let Some(idx) = rest.find("://") {
            rest = &rest[idx + 3..];
        }
        if let Some(idx) = rest.find(|c: char| matches!(c, '/' | '?' | '#')) {
            rest = &rest[..idx];
        }
        if let Some(idx) = rest.rfind('@') {
            rest = &rest[idx + 1..];
        }

        let (host, port) = if let Some(bracketed) = rest.strip_prefix('[') {
            let close = bracketed
                .find(']')
                .ok_or_else(|| invalid_target(input, "unterminated IPv6 literal"))?;
            let host = &bracketed[..close];
            let port = match &bracketed[close + 1..] {
                "" => None,
                tail => Some(tail.strip_prefix(':').ok_or_else(|| {
                    invalid_target(input, "unexpected text after IPv6 literal")
                })?),
            };
            (host, port)
        } else if rest.matches(':').count() > 1 {
            (rest, None)
        } else {
            match rest.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (rest, None),
            }
        };

        if host.is_empty() {
            return Err(invalid_target(input, "missing host"));
        }
        let port = match port {
            Some(text) => match text.parse::<u16>() {
                Ok(0) | Err(_) => return Err(invalid_target(input, "invalid port")),
                Ok(port) => port,
            },
            None => default_port,
        };

        Ok(Self::new(host, port))
    }
}

fn invalid_target(input: &str, reason: &str) -> Error {
    Error::InvalidInput(format!("Invalid target '{}': {}", input, reason))
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.host.contains(':') {
            write!(f, "[{}]:{}", self.host, self.port)
        } else {
            write!(f, "{}:{}", self.host, self.port)
        }
    }
}

#[derive(Debug, Clone)]
pub struct CaptureOptions {
    pub timeout: Duration,
    /// SNI name to send instead of the target host.
    pub server_name: Option<String>,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            server_name: None,
        }
    }
}

impl CaptureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_server_name(mut self, name: impl Into<String>) -> Self {
        self.server_name = Some(name.into());
        self
    }

    fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidInput(
                "Timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Accepts any certificate and records what the server presented.
#[derive(Debug)]
struct CaptureVerifier {
    certs: Arc<Mutex<Vec<Vec<u8>>>>,
    schemes: Vec<SignatureScheme>,
}

impl ServerCertVerifier for CaptureVerifier {
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        _server_name: &ServerName<'_>,
        _ocsp_response: &[u8],
        _now: UnixTime,
    ) -> std::result::Result<ServerCertVerified, rustls::Error> {
        let mut certs = self.certs.lock().unwrap_or_else(PoisonError::into_inner);
        certs.clear();
        certs.push(end_entity.to_vec());
        for cert in intermediates {
            certs.push(cert.to_vec());
        }
        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn verify_tls13_signature(
        &self,
        _message: &[u8],
        _cert: &CertificateDer<'_>,
        _dss: &DigitallySignedStruct,
    ) -> std::result::Result<HandshakeSignatureValid, rustls::Error> {
        Ok(HandshakeSignatureValid::assertion())
    }

    fn supported_verify_schemes(&self) -> Vec<SignatureScheme> {
        self.schemes.clone()
    }
}

/// Capture the chain from `host:port` with the given timeout.
pub fn capture(host: &str, port: u16, timeout: Duration) -> Result<RawChain> {
    capture_with(
        &Target::new(host, port),
        &CaptureOptions::new().with_timeout(timeout),
    )
}

/// Capture the chain presented by `target`.
///
/// Certificate validation is disabled. The connection is closed right after
/// the handshake and no application data is sent.
pub fn capture_with(target: &Target, options: &CaptureOptions) -> Result<RawChain> {
    options.validate()?;
    let name = options.server_name.as_deref().unwrap_or(&target.host);
    let server_name = ServerName::try_from(name.to_string())
        .map_err(|e| Error::InvalidInput(format!("Invalid server name '{}': {}", name, e)))?;

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let certs = Arc::new(Mutex::new(Vec::new()));
    let verifier = Arc::new(CaptureVerifier {
        certs: certs.clone(),
        schemes: provider
            .signature_verification_algorithms
            .supported_schemes(),
    });

    let config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .map_err(|e| handshake_error(target, e))?
        .dangerous()
        .with_custom_certificate_verifier(verifier)
        .with_no_client_auth();

    let mut conn = ClientConnection::new(Arc::new(config), server_name)
        .map_err(|e| handshake_error(target, e))?;

    let mut sock = connect(target, options.timeout)?;

    debug!("Starting TLS handshake with {}", target);
    let mut failure = None;
    while conn.is_handshaking() {
        match conn.complete_io(&mut sock) {
            Ok((0, 0)) => {
                failure = Some(io::Error::new(
                    ErrorKind::UnexpectedEof,
                    "connection closed during handshake",
                ));
                break;
            }
            Ok(_) => {}
            Err(e) => {
                failure = Some(e);
                break;
            }
        }
    }

    let captured = certs.lock().unwrap_or_else(PoisonError::into_inner).clone();

    match failure {
        Some(e) if captured.is_empty() => return Err(map_handshake_io(target, e)),
        Some(e) => warn!(
            "Handshake with {} failed after the chain was captured: {}",
            target, e
        ),
        None if captured.is_empty() => {
            return Err(Error::Handshake {
                target: target.to_string(),
                reason: "server presented no certificates".to_string(),
            })
        }
        None => {
            conn.send_close_notify();
            if let Err(e) = conn.write_tls(&mut sock) {
                debug!("Failed to send close_notify to {}: {}", target, e);
            }
        }
    }

    info!("Captured {} certificates from {}", captured.len(), target);
    Ok(RawChain::new(captured))
}

fn connect(target: &Target, timeout: Duration) -> Result<TcpStream> {
    let connection_error = |reason: String| Error::Connection {
        target: target.to_string(),
        reason,
    };

    let addrs: Vec<SocketAddr> = (target.host.as_str(), target.port)
        .to_socket_addrs()
        .map_err(|e| connection_error(format!("Failed to resolve host: {}", e)))?
        .collect();

    let mut last_error = None;
    for addr in &addrs {
        debug!("Connecting to {} ({})", target, addr);
        match TcpStream::connect_timeout(addr, timeout) {
            Ok(sock) => {
                sock.set_read_timeout(Some(timeout))
                    .and_then(|_| sock.set_write_timeout(Some(timeout)))
                    .map_err(|e| connection_error(e.to_string()))?;
                return Ok(sock);
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(connection_error(match last_error {
        Some(e) => format!("Failed to connect: {}", e),
        None => "Host resolved to no addresses".to_string(),
    }))
}

fn map_handshake_io(target: &Target, e: io::Error) -> Error {
    match e.kind() {
        ErrorKind::TimedOut | ErrorKind::WouldBlock => Error::Connection {
            target: target.to_string(),
            reason: format!("Timed out during handshake: {}", e),
        },
        _ => handshake_error(target, e),
    }
}

fn handshake_error(target: &Target, reason: impl fmt::Display) -> Error {
    Error::Handshake {
        target: target.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_host() {
        let target = Target::parse("example.com", DEFAULT_PORT).unwrap();
        assert_eq!(target, Target::new("example.com", 443));
        assert_eq!(target.to_string(), "example.com:443");
    }

    #[test]
    fn test_parse_host_and_port() {
        assert_eq!(
            Target::parse("example.com:8443", DEFAULT_PORT).unwrap(),
            Target::new("example.com", 8443)
        );
    }

    #[test]
    fn test_parse_url() {
        assert_eq!(
            Target::parse("https://user@example.com:9443/path?q=1", DEFAULT_PORT).unwrap(),
            Target::new("example.com", 9443)
        );
        assert_eq!(
            Target::parse("https://example.com/", DEFAULT_PORT).unwrap(),
            Target::new("example.com", 443)
        );
    }

    #[test]
    fn test_parse_ipv6() {
        let bracketed = Target::parse("[::1]:8443", DEFAULT_PORT).unwrap();
        assert_eq!(bracketed, Target::new("::1", 8443));
        assert_eq!(bracketed.to_string(), "[::1]:8443");

        assert_eq!(
            Target::parse("fe80::1", 636).unwrap(),
            Target::new("fe80::1", 636)
        );
        assert_eq!(
            Target::parse("[2001:db8::1]", DEFAULT_PORT).unwrap(),
            Target::new("2001:db8::1", 443)
        );
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for input in ["", "https://", "example.com:0", "example.com:http", "[::1"] {
            assert!(
                matches!(Target::parse(input, DEFAULT_PORT), Err(Error::InvalidInput(_))),
                "accepted {:?}",
                input
            );
        }
    }

    #[test]
    fn test_zero_timeout_is_rejected() {
        let options = CaptureOptions::new().with_timeout(Duration::ZERO);
        let err = capture_with(&Target::new("127.0.0.1", 1), &options).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_capture_options_builder() {
        let options = CaptureOptions::new()
            .with_timeout(Duration::from_secs(3))
            .with_server_name("sni.example.com");
        assert_eq!(options.timeout, Duration::from_secs(3));
        assert_eq!(options.server_name.as_deref(), Some("sni.example.com"));
        assert_eq!(CaptureOptions::default().timeout, DEFAULT_TIMEOUT);
    }
}
