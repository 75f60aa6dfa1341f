//! Crate-wide size limits and per-write options.
//!
//! Everything here is per-write data rather than a global mutable switch
//! (there is no atomic flag the tokenizer reads); constants and an options
//! struct are threaded explicitly into the writer instead.

/// Maximum chromosome name length on a coordinate line.
pub const CHR_MAX: usize = 128;

/// Maximum chromosome-field length on a header/comment line.
pub const HEADER_CHR_MAX: usize = 1024;

/// Maximum length of the "id" sub-field (first column of `remainder`).
pub const ID_MAX: usize = 255;

/// Maximum length of the full remainder (columns 4+, joined by tabs).
pub const REST_MAX: usize = 16384;

/// Maximum number of decimal digits accepted for a start/stop field.
pub const MAX_DEC_INTEGERS: usize = 19;

/// Maximum numeric value accepted for a start/stop field (2^63 - 2).
pub const MAX_COORD_VALUE: i64 = i64::MAX - 1;

/// Default size, in bytes, at which the writer flushes its per-chromosome
/// intermediate buffer into the block compressor.
pub const BUFFER_MAX: usize = 65_536;

/// Fixed size of the legacy (revision 1) metadata buffer.
pub const STARCH_LEGACY_METADATA_SIZE: usize = 4096;

/// Archive format revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveVersion {
    /// Legacy: no magic prefix, no footer, fixed-length metadata buffer.
    V1,
    /// Current: magic prefix, streamed metadata JSON, signed footer.
    V2,
}

/// Compression codec used for the per-chromosome streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionType {
    Bzip2,
    Gzip,
}

impl CompressionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionType::Bzip2 => "bzip2",
            CompressionType::Gzip => "gzip",
        }
    }
}

/// Per-write configuration for an [`crate::archive::writer::ArchiveWriter`].
#[derive(Debug, Clone)]
pub struct ArchiveOptions {
    pub version: ArchiveVersion,
    pub compression: CompressionType,
    /// Whether per-chromosome streams may carry embedded header lines.
    pub header_flag: bool,
    pub note: Option<String>,
    /// User-supplied tag used to derive each chromosome's filename stub.
    pub tag: Option<String>,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            version: ArchiveVersion::V2,
            compression: CompressionType::Bzip2,
            header_flag: false,
            note: None,
            tag: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compression_type_as_str() {
        assert_eq!(CompressionType::Bzip2.as_str(), "bzip2");
        assert_eq!(CompressionType::Gzip.as_str(), "gzip");
    }

    #[test]
    fn default_options_are_v2_bzip2() {
        let opts = ArchiveOptions::default();
        assert_eq!(opts.version, ArchiveVersion::V2);
        assert_eq!(opts.compression, CompressionType::Bzip2);
        assert!(!opts.header_flag);
    }
}
