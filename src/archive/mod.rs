//! Archive envelope orchestration: [`writer::ArchiveWriter`] produces an
//! archive from a stream of BED lines; [`reader::ArchiveReader`] locates,
//! decompresses, and inverse-transforms a chromosome (or the whole
//! archive) back into BED text.

pub mod reader;
pub mod writer;

pub use reader::ArchiveReader;
pub use writer::ArchiveWriter;
