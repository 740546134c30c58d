//! Certview - capture, inspect and trust the certificate chain of a TLS server
//!
//! This library provides the pieces needed to look at what a server actually
//! presents during a TLS handshake, including:
//!
//! - Capturing the raw certificate chain without judging its validity
//! - Decoding X.509 certificates into plain records with fingerprints
//! - Assembling an unordered server chain into leaf-to-root order
//! - Rendering certificates and chains as indented text or JSON
//! - Writing and reading PEM trust bundles behind an explicit decision
//!
//! # Examples
//!
//! ## Fetching a Remote Certificate Chain
//!
//! ```no_run
//! use certview::{capture, assemble, display_chain, OutputFormat, DEFAULT_TIMEOUT};
//!
//! let raw = capture("example.com", 443, DEFAULT_TIMEOUT).unwrap();
//! let chain = assemble(&raw).unwrap();
//! println!("{}", display_chain(&chain, OutputFormat::Pretty).unwrap());
//! ```
//!
//! ## Trusting a Chain After Review
//!
//! ```no_run
//! use certview::{review, CaptureOptions, Decision, Review, Target, WriteOptions};
//!
//! let target = Target::parse("https://example.com/", 443).unwrap();
//! let review = review(&target, &CaptureOptions::new()).unwrap();
//! println!("{}", review.rendered);
//!
//! let decision = review
//!     .decide(&mut |r: &Review| r.chain.is_complete(), "trust.pem", &WriteOptions::new())
//!     .unwrap();
//! if let Decision::Accepted(path) = decision {
//!     println!("written to {}", path.display());
//! }
//! ```
//!
//! ## Inspecting an Existing Bundle
//!
//! ```no_run
//! use certview::{read_bundle, render};
//!
//! let chain = read_bundle("trust.pem").unwrap();
//! for cert in chain.iter() {
//!     println!("{}", render(cert));
//! }
//! ```

pub mod bundle;
pub mod chain;
pub mod decode;
pub mod error;
pub mod extensions;
pub mod fetch;
pub mod fingerprint;
pub mod oid;
pub mod render;
pub mod review;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;

#[cfg(test)]
mod test_support;

pub use error::{Error, Result};

pub use bundle::{der_to_pem, find_pem_certificates, pem_to_der, read_bundle, write_bundle, WriteOptions};
pub use chain::{assemble, assemble_records, Chain, ChainWarning};
pub use decode::{decode, decode_with};
pub use extensions::ExtensionRegistry;
pub use fetch::{capture, capture_with, CaptureOptions, Target, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use fingerprint::compute_fingerprint;
pub use render::{display_chain, render, render_chain, Node, OutputFormat};
pub use review::{review, review_raw, Decision, Prompt, Review};
pub use types::{
    AccessDescription, AuthorityKeyId, BasicConstraints, CertificateRecord, DigestAlgorithm,
    DistinguishedName, Extension, ExtensionValue, KeyUsage, PublicKeyInfo, RawChain, SanEntry,
    ValidityStatus,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_and_render_leaf() {
        let (leaf, _, _) = test_support::three_level_chain();
        let record = decode(&leaf).unwrap();

        let text = render(&record).to_string();
        assert!(text.starts_with("Certificate: example.com"));
        assert!(text.contains("www.example.com"));
    }

    #[test]
    fn test_pipeline_from_unordered_capture() {
        let (leaf, inter, root) = test_support::three_level_chain();
        let review = review_raw("test", &RawChain::new(vec![root, leaf.clone(), inter])).unwrap();

        assert!(review.chain.is_complete());
        assert_eq!(review.chain.leaf().map(|c| c.raw_der()), Some(leaf.as_slice()));
        assert!(review.chain.warnings().is_empty());
    }

    #[test]
    fn test_pem_round_trip_preserves_der() {
        let (_, _, root) = test_support::three_level_chain();
        assert_eq!(pem_to_der(&der_to_pem(&root)).unwrap(), root);
    }
}
