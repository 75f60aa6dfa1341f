// Clippy allows for the whole crate
#![allow(clippy::too_many_arguments)]
#![allow(clippy::type_complexity)]

//! bedstarch: a compressed archive format for sorted genomic interval
//! (BED) streams.
//!
//! An archive is built chromosome by chromosome from a sorted BED stream:
//! each chromosome's coordinates are delta/run-length transformed by
//! [`delta`], block-compressed by [`codec`], and recorded in a JSON
//! metadata trailer ([`metadata`]) signed by a fixed-size footer
//! ([`footer`]). [`archive::writer::ArchiveWriter`] drives that whole
//! pipeline; [`archive::reader::ArchiveReader`] reverses it, seeking
//! straight to a chromosome's compressed span and running it back through
//! [`inverse`].
//!
//! # Example
//!
//! ```rust
//! use bedstarch::archive::writer::ArchiveWriter;
//! use bedstarch::archive::reader::ArchiveReader;
//! use bedstarch::config::ArchiveOptions;
//! use bedstarch::inverse::HeaderPolicy;
//! use std::io::Cursor;
//!
//! let mut writer = ArchiveWriter::new(Vec::new(), ArchiveOptions::default());
//! writer.write_line("chr1\t100\t200").unwrap();
//! writer.write_line("chr1\t300\t400").unwrap();
//! let (bytes, _metadata) = writer.finish().unwrap();
//!
//! let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
//! let mut out = Vec::new();
//! reader.extract_chromosome("chr1", &mut out, HeaderPolicy::AssumeAbsent).unwrap();
//! assert_eq!(String::from_utf8(out).unwrap(), "chr1\t100\t200\nchr1\t300\t400\n");
//! ```

pub mod archive;
pub mod codec;
pub mod config;
pub mod delta;
pub mod error;
pub mod footer;
pub mod inverse;
pub mod metadata;
pub mod tokenizer;

pub use archive::{ArchiveReader, ArchiveWriter};
pub use error::{ArchiveError, Result};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenience re-exports for the most common entry points.
pub mod prelude {
    pub use crate::archive::{ArchiveReader, ArchiveWriter};
    pub use crate::config::{ArchiveOptions, ArchiveVersion, CompressionType};
    pub use crate::error::{ArchiveError, Result};
    pub use crate::metadata::Metadata;
}
