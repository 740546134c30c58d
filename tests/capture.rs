mod common;

use certview::{
    assemble, capture, capture_with, read_bundle, review, CaptureOptions, Decision, Error,
    Review, Target, WriteOptions,
};
use std::time::{Duration, Instant};

const TIMEOUT: Duration = Duration::from_secs(5);

#[test]
fn test_capture_preserves_server_order() {
    let h = common::hierarchy();
    let presented = vec![h.leaf.clone(), h.root.clone(), h.intermediate.clone()];
    let addr = common::tls_server(presented.clone(), &h.leaf_key);

    let raw = capture("127.0.0.1", addr.port(), TIMEOUT).unwrap();
    assert_eq!(raw.into_inner(), presented);
}

#[test]
fn test_captured_chain_assembles_leaf_to_root() {
    let h = common::hierarchy();
    let addr = common::tls_server(
        vec![h.leaf.clone(), h.root.clone(), h.intermediate.clone()],
        &h.leaf_key,
    );

    let raw = capture("127.0.0.1", addr.port(), TIMEOUT).unwrap();
    let chain = assemble(&raw).unwrap();

    assert!(chain.is_complete());
    assert_eq!(chain.positions(), &[0, 2, 1]);
    assert_eq!(chain.leaf().unwrap().raw_der(), h.leaf.as_slice());
    assert_eq!(chain.root().unwrap().raw_der(), h.root.as_slice());
}

#[test]
fn test_sni_override_is_accepted() {
    let h = common::hierarchy();
    let addr = common::tls_server(vec![h.leaf.clone(), h.intermediate.clone()], &h.leaf_key);

    let options = CaptureOptions::new()
        .with_timeout(TIMEOUT)
        .with_server_name("localhost");
    let raw = capture_with(&Target::new("127.0.0.1", addr.port()), &options).unwrap();

    let chain = assemble(&raw).unwrap();
    assert_eq!(chain.len(), 2);
    assert!(!chain.is_complete());
}

#[test]
fn test_plaintext_server_is_a_handshake_error() {
    let addr = common::plaintext_server();
    let err = capture("127.0.0.1", addr.port(), TIMEOUT).unwrap_err();
    assert!(matches!(err, Error::Handshake { .. }), "got {:?}", err);
}

#[test]
fn test_refused_connection_is_a_connection_error() {
    let port = common::closed_port();
    let err = capture("127.0.0.1", port, TIMEOUT).unwrap_err();
    assert!(matches!(err, Error::Connection { .. }), "got {:?}", err);
    assert!(err.is_retryable());
}

#[test]
fn test_silent_server_times_out_as_connection_error() {
    let addr = common::silent_server(Duration::from_secs(5));
    let started = Instant::now();

    let err = capture("127.0.0.1", addr.port(), Duration::from_millis(300)).unwrap_err();
    assert!(matches!(err, Error::Connection { .. }), "got {:?}", err);
    assert!(err.is_retryable());
    assert!(started.elapsed() < Duration::from_secs(4));
}

#[test]
fn test_unresolvable_host_is_a_connection_error() {
    let err = capture("nonexistent.invalid", 443, TIMEOUT).unwrap_err();
    assert!(matches!(err, Error::Connection { .. }), "got {:?}", err);
    assert!(err.to_string().contains("nonexistent.invalid:443"));
}

#[test]
fn test_review_accept_and_reload() {
    let h = common::hierarchy();
    let addr = common::tls_server(
        vec![h.leaf.clone(), h.intermediate.clone(), h.root.clone()],
        &h.leaf_key,
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("trust").join("bundle.pem");

    let target = Target::new("127.0.0.1", addr.port());
    let review = review(&target, &CaptureOptions::new().with_timeout(TIMEOUT)).unwrap();
    assert!(review.rendered.contains("Certificate Chain: 3 certificates, complete"));

    let decision = review
        .decide(&mut |_: &Review| true, &path, &WriteOptions::new())
        .unwrap();
    assert_eq!(decision, Decision::Accepted(path.clone()));

    let reloaded = read_bundle(&path).unwrap();
    assert_eq!(reloaded.to_raw(), review.chain.to_raw());
    assert!(reloaded.is_complete());
}
