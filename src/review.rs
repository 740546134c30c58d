//! The capture → assemble → render pipeline and the operator decision that
//! gates writing a trust bundle.

use crate::bundle::{write_bundle, WriteOptions};
use crate::chain::{assemble, Chain};
use crate::error::Result;
use crate::fetch::{capture_with, CaptureOptions, Target};
use crate::render::{display_chain, OutputFormat};
use crate::types::RawChain;
use log::info;
use std::path::{Path, PathBuf};

/// An assembled chain and its rendered text, waiting for a decision.
#[derive(Debug, Clone)]
pub struct Review {
    /// Where the chain came from: `host:port` or a file path.
    pub target: String,
    pub chain: Chain,
    pub rendered: String,
}

/// Operator decision on a [`Review`]. Blocking is up to the implementation.
pub trait Prompt {
    fn confirm(&mut self, review: &Review) -> bool;
}

impl<F> Prompt for F
where
    F: FnMut(&Review) -> bool,
{
    fn confirm(&mut self, review: &Review) -> bool {
        self(review)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Accepted(PathBuf),
    Rejected,
}

impl Review {
    /// Ask `prompt` and write the bundle to `path` only if it accepts.
    pub fn decide(
        &self,
        prompt: &mut impl Prompt,
        path: impl AsRef<Path>,
        options: &WriteOptions,
    ) -> Result<Decision> {
        if !prompt.confirm(self) {
            info!("Chain from {} rejected, nothing written", self.target);
            return Ok(Decision::Rejected);
        }
        let written = write_bundle(&self.chain, path, options)?;
        Ok(Decision::Accepted(written))
    }
}

/// Capture from `target` and prepare the result for review.
pub fn review(target: &Target, options: &CaptureOptions) -> Result<Review> {
    let raw = capture_with(target, options)?;
    review_raw(target.to_string(), &raw)
}

/// Assemble and render a chain obtained elsewhere.
pub fn review_raw(target: impl Into<String>, raw: &RawChain) -> Result<Review> {
    let chain = assemble(raw)?;
    let rendered = display_chain(&chain, OutputFormat::Pretty)?;
    Ok(Review {
        target: target.into(),
        chain,
        rendered,
    })
}
