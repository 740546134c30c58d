use std::io;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection error ({target}): {reason}")]
    Connection { target: String, reason: String },

    #[error("TLS handshake error ({target}): {reason}")]
    Handshake { target: String, reason: String },

    #[error("Malformed certificate{}: {reason}", position_suffix(.position))]
    MalformedCertificate {
        position: Option<usize>,
        reason: String,
    },

    #[error("Certificate chain contains a cycle at position {position}")]
    CyclicChain { position: usize },

    #[error("Certificate chain is empty")]
    EmptyChain,

    #[error("Malformed trust bundle {}: {reason}", .path.display())]
    MalformedBundle { path: PathBuf, reason: String },

    #[error("IO error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Trust bundle already exists: {} (overwrite not requested)", .path.display())]
    BundleExists { path: PathBuf },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

fn position_suffix(position: &Option<usize>) -> String {
    match position {
        Some(pos) => format!(" at position {}", pos),
        None => String::new(),
    }
}

impl Error {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedCertificate {
            position: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    /// Attach the position of the offending blob to a decode failure.
    pub(crate) fn at_position(self, pos: usize) -> Self {
        match self {
            Error::MalformedCertificate { reason, .. } => Error::MalformedCertificate {
                position: Some(pos),
                reason,
            },
            other => other,
        }
    }

    /// Transient failures the caller may reasonably retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Connection { .. })
    }
}

impl From<x509_parser::nom::Err<x509_parser::error::X509Error>> for Error {
    fn from(err: x509_parser::nom::Err<x509_parser::error::X509Error>) -> Self {
        Error::malformed(err.to_string())
    }
}

#[cfg(feature = "json")]
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
