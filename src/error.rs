//! Error kinds shared by every stage of the archive pipeline.

use std::io;
use thiserror::Error;

/// All fatal conditions the archive core can raise.
///
/// Every variant other than [`ArchiveError::NotFound`] terminates the
/// active operation; there are no retries and no partial-output cleanup
/// here; that is the caller's job.
#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("line {line}: {message}")]
    InputMalformed { line: usize, message: String },

    #[error("line {line}: {message}")]
    InputCorrupt { line: usize, message: String },

    #[error("codec error: {0}")]
    Codec(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("metadata parse error: {0}")]
    MetadataParse(#[from] serde_json::Error),

    #[error("metadata signature mismatch")]
    Signature,

    #[error("chromosome '{0}' not found in archive")]
    NotFound(String),

    #[error("out of memory: {0}")]
    OutOfMemory(String),
}

pub type Result<T> = std::result::Result<T, ArchiveError>;

impl ArchiveError {
    /// A stable numeric exit code for the CLI driver. `NotFound` gets its
    /// own code so a query-style caller can distinguish "archive is bad"
    /// from "chromosome isn't in this archive".
    pub fn exit_code(&self) -> i32 {
        match self {
            ArchiveError::NotFound(_) => 2,
            _ => 1,
        }
    }
}
