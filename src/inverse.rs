//! Inverse delta transform: rebuilds absolute BED coordinates from the
//! per-chromosome textual stream produced by [`crate::delta::DeltaEncoder`].
//!
//! Older archive revisions grew three near-duplicate inverse-transform
//! code paths for header handling; here that collapses into one
//! transformer parameterized by [`HeaderPolicy`].

use crate::error::Result;
use std::io::Write;

/// How the inverse transformer treats embedded non-coordinate lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderPolicy {
    /// Emit header/comment lines verbatim.
    Emit,
    /// Silently consume and discard header/comment lines.
    Drop,
    /// Assume the stream contains no header/comment lines at all.
    AssumeAbsent,
}

/// Per-chromosome inverse transformer. A fresh instance is created at each
/// chromosome boundary, so `last_position` is naturally absolute for the
/// first record of every chromosome (see DESIGN.md).
#[derive(Debug)]
pub struct InverseTransformer {
    chromosome: String,
    last_position: i64,
    lc_diff: i64,
    policy: HeaderPolicy,
}

impl InverseTransformer {
    pub fn new(chromosome: impl Into<String>, policy: HeaderPolicy) -> Self {
        Self {
            chromosome: chromosome.into(),
            last_position: 0,
            lc_diff: 0,
            policy,
        }
    }

    /// Process one line of the decompressed per-chromosome stream
    /// (without its trailing newline), writing reconstructed BED text to
    /// `out` when the line represents a record.
    pub fn process_line<W: Write>(&mut self, line: &str, out: &mut W) -> Result<()> {
        if let Some(rest) = line.strip_prefix('p') {
            if let Ok(length) = rest.parse::<i64>() {
                self.lc_diff = length;
                return Ok(());
            }
        }

        if is_header_line(line) {
            match self.policy {
                HeaderPolicy::Emit => {
                    writeln!(out, "{line}")?;
                }
                HeaderPolicy::Drop | HeaderPolicy::AssumeAbsent => {}
            }
            return Ok(());
        }

        let mut parts = line.splitn(2, '\t');
        let v: i64 = parts.next().unwrap_or("").parse().unwrap_or(0);
        let remainder = parts.next();

        let start = if self.last_position == 0 {
            v
        } else {
            self.last_position + v
        };
        let stop = start + self.lc_diff;

        write!(out, "{}\t{}\t{}", self.chromosome, start, stop)?;
        if let Some(rest) = remainder {
            write!(out, "\t{rest}")?;
        }
        writeln!(out)?;

        self.last_position = stop;
        Ok(())
    }
}

fn is_header_line(line: &str) -> bool {
    line.starts_with('#')
        || line.starts_with('@')
        || line.starts_with("track ")
        || line.starts_with("browser ")
}
