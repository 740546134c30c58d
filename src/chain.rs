//! Chain assembly: order captured certificates leaf-to-root.
//!
//! Assembly works on indices into the decoded set. It picks the leaf, then
//! follows issuer links until it reaches a self-signed certificate or runs
//! out of candidates. Nothing here touches the network, so a chain the
//! server sent incomplete stays incomplete.

use crate::decode::decode;
use crate::error::{Error, Result};
use crate::types::{CertificateRecord, RawChain};
use log::{debug, warn};
use std::fmt;

/// Non-fatal findings from assembly. Positions refer to the input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainWarning {
    /// More than one certificate qualified as the leaf.
    AmbiguousLeaf {
        chosen: usize,
        candidates: Vec<usize>,
    },
    /// No certificate in the set issued the certificate at `position`.
    Incomplete {
        position: usize,
        missing_issuer: String,
    },
    /// Certificate left over after assembly.
    Orphaned { position: usize, subject: String },
    /// Byte-identical copy of an earlier certificate.
    Duplicate { position: usize, duplicate_of: usize },
    /// Subject equals issuer but the signature does not verify with its own key.
    UnverifiedSelfIssued { position: usize, subject: String },
}

impl fmt::Display for ChainWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainWarning::AmbiguousLeaf { chosen, candidates } => {
                let list = candidates
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(", ");
                write!(
                    f,
                    "ambiguous leaf: positions {} qualify, using position {}",
                    list, chosen
                )
            }
            ChainWarning::Incomplete {
                position,
                missing_issuer,
            } => write!(
                f,
                "chain incomplete after position {}: issuer {} was not presented",
                position, missing_issuer
            ),
            ChainWarning::Orphaned { position, subject } => {
                write!(
                    f,
                    "certificate at position {} ({}) is not part of the chain",
                    position, subject
                )
            }
            ChainWarning::Duplicate {
                position,
                duplicate_of,
            } => write!(
                f,
                "certificate at position {} duplicates position {}",
                position, duplicate_of
            ),
            ChainWarning::UnverifiedSelfIssued { position, subject } => write!(
                f,
                "self-issued certificate at position {} ({}) does not verify against its own key",
                position, subject
            ),
        }
    }
}

/// Decoded certificates in leaf-to-root order.
#[derive(Debug, Clone)]
pub struct Chain {
    certificates: Vec<CertificateRecord>,
    positions: Vec<usize>,
    is_complete: bool,
    warnings: Vec<ChainWarning>,
}

impl Chain {
    /// Wrap records that are already in leaf-to-root order.
    ///
    /// Complete when the last record is self-signed. No linkage is checked.
    pub fn new(certificates: Vec<CertificateRecord>) -> Self {
        let is_complete = certificates
            .last()
            .map(CertificateRecord::is_self_signed)
            .unwrap_or(false);
        let positions = (0..certificates.len()).collect();
        Self {
            certificates,
            positions,
            is_complete,
            warnings: Vec::new(),
        }
    }

    pub fn certificates(&self) -> &[CertificateRecord] {
        &self.certificates
    }

    pub fn iter(&self) -> impl Iterator<Item = &CertificateRecord> {
        self.certificates.iter()
    }

    pub fn len(&self) -> usize {
        self.certificates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty()
    }

    pub fn leaf(&self) -> Option<&CertificateRecord> {
        self.certificates.first()
    }

    /// The self-signed anchor, only when the chain is complete.
    pub fn root(&self) -> Option<&CertificateRecord> {
        if self.is_complete {
            self.certificates.last()
        } else {
            None
        }
    }

    /// Input position of each chain element.
    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn is_complete(&self) -> bool {
        self.is_complete
    }

    pub fn warnings(&self) -> &[ChainWarning] {
        &self.warnings
    }

    /// Raw DER of each element, leaf first.
    pub fn to_raw(&self) -> RawChain {
        RawChain::new(
            self.certificates
                .iter()
                .map(|cert| cert.raw_der().to_vec())
                .collect(),
        )
    }

    pub fn into_certificates(self) -> Vec<CertificateRecord> {
        self.certificates
    }
}

/// Decode every blob and assemble them into a chain.
pub fn assemble(raw: &RawChain) -> Result<Chain> {
    let records = raw
        .iter()
        .enumerate()
        .map(|(pos, der)| decode(der).map_err(|e| e.at_position(pos)))
        .collect::<Result<Vec<_>>>()?;
    assemble_records(records)
}

/// Assemble already-decoded certificates. Input order is the server order.
pub fn assemble_records(records: Vec<CertificateRecord>) -> Result<Chain> {
    if records.is_empty() {
        return Err(Error::EmptyChain);
    }

    let mut warnings = Vec::new();
    let unique = deduplicate(&records, &mut warnings);
    let leaf = pick_leaf(&records, &unique, &mut warnings)?;

    let mut order = vec![leaf];
    let mut is_complete = false;

    loop {
        let tail = order[order.len() - 1];
        let tail_cert = &records[tail];

        if tail_cert.is_self_signed() {
            is_complete = true;
            break;
        }
        if tail_cert.is_self_issued() {
            warnings.push(ChainWarning::UnverifiedSelfIssued {
                position: tail,
                subject: tail_cert.subject.to_oneline(),
            });
            break;
        }

        let unplaced = unique.iter().copied().filter(|idx| !order.contains(idx));
        match best_issuer(tail_cert, &records, unplaced) {
            Some(parent) => {
                debug!("Position {} issued by position {}", tail, parent);
                order.push(parent);
            }
            None => {
                if let Some(seen) = best_issuer(tail_cert, &records, order.iter().copied()) {
                    return Err(Error::CyclicChain { position: seen });
                }
                warnings.push(ChainWarning::Incomplete {
                    position: tail,
                    missing_issuer: tail_cert.issuer.to_oneline(),
                });
                break;
            }
        }
    }

    for &idx in unique.iter().filter(|idx| !order.contains(idx)) {
        warnings.push(ChainWarning::Orphaned {
            position: idx,
            subject: records[idx].subject.to_oneline(),
        });
    }

    for warning in &warnings {
        warn!("{}", warning);
    }

    // Move the records out in chain order.
    let mut slots: Vec<Option<CertificateRecord>> = records.into_iter().map(Some).collect();
    let certificates = order
        .iter()
        .filter_map(|&idx| slots[idx].take())
        .collect();

    Ok(Chain {
        certificates,
        positions: order,
        is_complete,
        warnings,
    })
}

fn deduplicate(records: &[CertificateRecord], warnings: &mut Vec<ChainWarning>) -> Vec<usize> {
    let mut unique: Vec<usize> = Vec::with_capacity(records.len());
    for (idx, record) in records.iter().enumerate() {
        match unique
            .iter()
            .find(|&&kept| records[kept].raw_der() == record.raw_der())
        {
            Some(&first) => warnings.push(ChainWarning::Duplicate {
                position: idx,
                duplicate_of: first,
            }),
            None => unique.push(idx),
        }
    }
    unique
}

/// The leaf is a certificate whose subject issued none of the others.
///
/// Self-issued certificates only count when nothing else qualifies, so a
/// stray root next to a leaf with a missing intermediate is not picked.
fn pick_leaf(
    records: &[CertificateRecord],
    unique: &[usize],
    warnings: &mut Vec<ChainWarning>,
) -> Result<usize> {
    let mut candidates: Vec<usize> = unique
        .iter()
        .copied()
        .filter(|&idx| {
            !unique
                .iter()
                .any(|&other| other != idx && records[other].issuer == records[idx].subject)
        })
        .collect();
    if candidates.iter().any(|&idx| !records[idx].is_self_issued()) {
        candidates.retain(|&idx| !records[idx].is_self_issued());
    }

    match candidates.as_slice() {
        // Every certificate issued another one.
        [] => Err(Error::CyclicChain {
            position: unique[0],
        }),
        [only] => Ok(*only),
        [first, ..] => {
            warnings.push(ChainWarning::AmbiguousLeaf {
                chosen: *first,
                candidates: candidates.clone(),
            });
            Ok(*first)
        }
    }
}

/// Rank of `candidate` as issuer of `child`: 0 for a key-id match, 1 for a
/// DN-only match, `None` when it cannot be the issuer.
fn issuer_rank(child: &CertificateRecord, candidate: &CertificateRecord) -> Option<u8> {
    if child.issuer != candidate.subject {
        return None;
    }
    match (child.authority_key_id(), candidate.subject_key_id()) {
        (Some(aki), Some(ski)) if aki == ski => Some(0),
        (Some(_), Some(_)) => None,
        _ => Some(1),
    }
}

fn best_issuer(
    child: &CertificateRecord,
    records: &[CertificateRecord],
    candidates: impl Iterator<Item = usize>,
) -> Option<usize> {
    candidates
        .filter_map(|idx| issuer_rank(child, &records[idx]).map(|rank| (rank, idx)))
        .min()
        .map(|(_, idx)| idx)
}
