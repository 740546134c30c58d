//! Trust bundle persistence: PEM blocks, leaf first, written atomically.

use crate::chain::Chain;
use crate::decode::decode;
use crate::error::{Error, Result};
use log::{debug, info};
use pem::{EncodeConfig, LineEnding, Pem};
use std::fs;
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

const PEM_LABEL: &str = "CERTIFICATE";
const BEGIN_MARKER: &str = "-----BEGIN ";
const PEM_LINE_WIDTH: usize = 64;

#[cfg(unix)]
const FILE_MODE_PROTECTED: u32 = 0o600;
#[cfg(unix)]
const FILE_MODE_SHARED: u32 = 0o644;
#[cfg(unix)]
const DIR_MODE_PROTECTED: u32 = 0o700;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    /// Replace an existing bundle at the destination.
    pub overwrite: bool,
    /// Owner-only permissions for the bundle and any directory created for it.
    pub protect: bool,
    /// Create missing parent directories.
    pub create_parents: bool,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            protect: true,
            create_parents: true,
        }
    }
}

impl WriteOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_protect(mut self, protect: bool) -> Self {
        self.protect = protect;
        self
    }

    pub fn with_create_parents(mut self, create_parents: bool) -> Self {
        self.create_parents = create_parents;
        self
    }
}

/// Armor one DER certificate as a PEM block, `\n` line endings.
pub fn der_to_pem(der: &[u8]) -> String {
    pem::encode_config(&Pem::new(PEM_LABEL, der.to_vec()), encode_config())
}

/// DER of the single CERTIFICATE block in `text`.
pub fn pem_to_der(text: &str) -> Result<Vec<u8>> {
    let blocks = pem::parse_many(text)
        .map_err(|e| Error::InvalidInput(format!("Invalid PEM certificate: {}", e)))?;
    match blocks.as_slice() {
        [block] => certificate_der(block)
            .map_err(|reason| Error::InvalidInput(format!("Invalid PEM certificate: {}", reason))),
        [] => Err(Error::InvalidInput("No PEM block found".to_string())),
        _ => Err(Error::InvalidInput(format!(
            "Expected one PEM block, found {}",
            blocks.len()
        ))),
    }
}

/// Every well-formed CERTIFICATE block in arbitrary text, in order.
///
/// Other labels, unterminated blocks and undecodable base64 are skipped.
pub fn find_pem_certificates(text: &str) -> Vec<Vec<u8>> {
    // Parse from each BEGIN line on its own so one bad block does not hide
    // the ones after it.
    text.match_indices(BEGIN_MARKER)
        .filter_map(|(start, _)| pem::parse(&text[start..]).ok())
        .filter_map(|block| certificate_der(&block).ok())
        .collect()
}

fn encode_config() -> EncodeConfig {
    EncodeConfig::new()
        .set_line_ending(LineEnding::LF)
        .set_line_wrap(PEM_LINE_WIDTH)
}

fn certificate_der(block: &Pem) -> std::result::Result<Vec<u8>, String> {
    if block.tag() != PEM_LABEL {
        return Err(format!("unexpected label '{}'", block.tag()));
    }
    Ok(block.contents().to_vec())
}

/// Write `chain` to `path` as PEM, leaf first, from each record's raw DER.
///
/// The bundle is written to a temporary file beside `path` and renamed into
/// place, so readers see either the old file or the complete new one.
pub fn write_bundle(
    chain: &Chain,
    path: impl AsRef<Path>,
    options: &WriteOptions,
) -> Result<PathBuf> {
    let path = path.as_ref();
    if chain.is_empty() {
        return Err(Error::EmptyChain);
    }
    if !options.overwrite && path.exists() {
        return Err(Error::BundleExists {
            path: path.to_path_buf(),
        });
    }

    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    };
    ensure_parent(&parent, options)?;

    let contents: String = chain.iter().map(|cert| der_to_pem(cert.raw_der())).collect();

    let mut tmp = NamedTempFile::new_in(&parent).map_err(|e| Error::io(&parent, e))?;
    tmp.write_all(contents.as_bytes())
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::io(tmp.path(), e))?;
    set_file_mode(tmp.path(), options.protect)?;

    let persisted = if options.overwrite {
        tmp.persist(path)
    } else {
        tmp.persist_noclobber(path)
    };
    persisted.map_err(|e| match e.error.kind() {
        ErrorKind::AlreadyExists => Error::BundleExists {
            path: path.to_path_buf(),
        },
        _ => Error::io(path, e.error),
    })?;

    info!(
        "Wrote trust bundle with {} certificates to {}",
        chain.len(),
        path.display()
    );
    Ok(path.to_path_buf())
}

/// Read a bundle back. Block order is taken as chain order; linkage is not
/// re-checked.
///
/// Text around blocks is ignored, but every BEGIN line must open a complete
/// CERTIFICATE block.
pub fn read_bundle(path: impl AsRef<Path>) -> Result<Chain> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|e| match e.kind() {
        ErrorKind::InvalidData => malformed_bundle(path, "not UTF-8 text".to_string()),
        _ => Error::io(path, e),
    })?;

    let blocks = pem::parse_many(&text).map_err(|e| malformed_bundle(path, e.to_string()))?;
    if blocks.is_empty() {
        return Err(malformed_bundle(path, "no certificate blocks found".to_string()));
    }
    let opened = text.matches(BEGIN_MARKER).count();
    if opened != blocks.len() {
        return Err(malformed_bundle(
            path,
            format!("{} BEGIN lines but {} complete blocks", opened, blocks.len()),
        ));
    }

    let mut records = Vec::with_capacity(blocks.len());
    for (index, block) in blocks.iter().enumerate() {
        let der = certificate_der(block)
            .map_err(|reason| malformed_bundle(path, format!("block {}: {}", index, reason)))?;
        let record =
            decode(&der).map_err(|e| malformed_bundle(path, format!("block {}: {}", index, e)))?;
        records.push(record);
    }

    debug!("Read {} certificates from {}", records.len(), path.display());
    Ok(Chain::new(records))
}

fn malformed_bundle(path: &Path, reason: String) -> Error {
    Error::MalformedBundle {
        path: path.to_path_buf(),
        reason,
    }
}

fn ensure_parent(dir: &Path, options: &WriteOptions) -> Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    if !options.create_parents {
        return Err(Error::io(
            dir,
            io::Error::new(ErrorKind::NotFound, "parent directory does not exist"),
        ));
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    set_dir_mode(&mut builder, options.protect);
    builder.create(dir).map_err(|e| Error::io(dir, e))
}

#[cfg(unix)]
fn set_dir_mode(builder: &mut fs::DirBuilder, protect: bool) {
    use std::os::unix::fs::DirBuilderExt;

    if protect {
        builder.mode(DIR_MODE_PROTECTED);
    }
}

#[cfg(not(unix))]
fn set_dir_mode(_builder: &mut fs::DirBuilder, _protect: bool) {}

#[cfg(unix)]
fn set_file_mode(path: &Path, protect: bool) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = if protect {
        FILE_MODE_PROTECTED
    } else {
        FILE_MODE_SHARED
    };
    fs::set_permissions(path, fs::Permissions::from_mode(mode)).map_err(|e| Error::io(path, e))
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path, _protect: bool) -> Result<()> {
    Ok(())
}
