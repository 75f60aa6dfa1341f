//! Per-chromosome bookkeeping and the archive's JSON metadata trailer.
//!
//! One [`ChromosomeRecord`] exists per chromosome ever observed in the
//! input; [`Metadata`] is the ordered list of them plus archive-wide
//! fields. JSON (de)serialization follows the archive's metadata schema
//! exactly, including decimal-string sizes (to preserve values beyond
//! `2^53`, where a JSON number would lose precision in less careful
//! consumers).

use crate::config::CompressionType;
use crate::error::{ArchiveError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One chromosome's bookkeeping, persisted in the archive's metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromosomeRecord {
    pub name: String,
    pub compressed_filename_stub: String,
    pub compressed_size_bytes: u64,
    pub line_count: u64,
    pub non_unique_bases: u64,
    pub unique_bases: u64,
    pub uncompressed_size_bytes: u64,
}

impl ChromosomeRecord {
    fn placeholder(name: impl Into<String>, filename_stub: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            compressed_filename_stub: filename_stub.into(),
            compressed_size_bytes: 0,
            line_count: 0,
            non_unique_bases: 0,
            unique_bases: 0,
            uncompressed_size_bytes: 0,
        }
    }
}

/// Derives the stable filename stub for a chromosome's compressed stream
/// from its name and an optional user-supplied tag, e.g. `("chr1", Some("sample"))
/// -> "sample.chr1"`.
pub fn filename_stub(chromosome: &str, tag: Option<&str>) -> String {
    match tag {
        Some(tag) if !tag.is_empty() => format!("{tag}.{chromosome}"),
        _ => chromosome.to_string(),
    }
}

/// The archive-wide metadata object: an ordered, append-only sequence of
/// chromosome records plus archive-level fields.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub version: (u32, u32, u32),
    pub compression: CompressionType,
    pub note: Option<String>,
    pub creation_timestamp: String,
    pub header_flag: bool,
    /// Populated only after a successful revision-2 signature check, or
    /// computed by the writer just before it is embedded in the footer.
    pub metadata_signature: Option<String>,
    records: Vec<ChromosomeRecord>,
}

impl Metadata {
    pub fn new(
        version: (u32, u32, u32),
        compression: CompressionType,
        header_flag: bool,
        note: Option<String>,
        creation_timestamp: impl Into<String>,
    ) -> Self {
        Self {
            version,
            compression,
            note,
            creation_timestamp: creation_timestamp.into(),
            header_flag,
            metadata_signature: None,
            records: Vec::new(),
        }
    }

    pub fn records(&self) -> &[ChromosomeRecord] {
        &self.records
    }

    pub fn contains(&self, chromosome: &str) -> bool {
        self.records.iter().any(|r| r.name == chromosome)
    }

    pub fn get(&self, chromosome: &str) -> Option<&ChromosomeRecord> {
        self.records.iter().find(|r| r.name == chromosome)
    }

    /// Create the placeholder entry for a newly observed chromosome.
    /// Fails with `InputCorrupt` ("possible interleaving issue") if the
    /// chromosome already exists.
    pub fn append(&mut self, chromosome: &str, filename_stub: &str) -> Result<()> {
        if self.contains(chromosome) {
            tracing::error!(
                chromosome,
                "duplicate chromosome in input (possible interleaving issue)"
            );
            return Err(ArchiveError::InputCorrupt {
                line: 0,
                message: format!(
                    "chromosome '{chromosome}' appears more than once (possible interleaving issue)"
                ),
            });
        }
        self.records
            .push(ChromosomeRecord::placeholder(chromosome, filename_stub));
        Ok(())
    }

    /// Record the final counters for an already-appended chromosome.
    pub fn update(
        &mut self,
        chromosome: &str,
        compressed_size_bytes: u64,
        line_count: u64,
        non_unique_bases: u64,
        unique_bases: u64,
    ) -> Result<()> {
        let record = self
            .records
            .iter_mut()
            .find(|r| r.name == chromosome)
            .ok_or_else(|| ArchiveError::NotFound(chromosome.to_string()))?;
        record.compressed_size_bytes = compressed_size_bytes;
        record.line_count = line_count;
        record.non_unique_bases = non_unique_bases;
        record.unique_bases = unique_bases;
        Ok(())
    }

    /// Sum of every chromosome's compressed size, i.e. the number of
    /// compressed-stream bytes following the 4-byte magic.
    pub fn total_compressed_bytes(&self) -> u64 {
        self.records.iter().map(|r| r.compressed_size_bytes).sum()
    }

    pub fn serialize_json(&self) -> Result<Vec<u8>> {
        let doc: MetadataDocument = self.into();
        serde_json::to_vec(&doc).map_err(ArchiveError::MetadataParse)
    }

    pub fn parse_json(bytes: &[u8]) -> Result<Metadata> {
        let doc: MetadataDocument = serde_json::from_slice(bytes)?;
        Ok(doc.into())
    }
}

/// A JSON-safe wrapper that serializes a `u64` as a decimal string so that
/// values beyond `2^53` survive a round trip through consumers with
/// IEEE-754-double JSON number handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DecimalU64(u64);

impl Serialize for DecimalU64 {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_string())
    }
}

impl<'de> Deserialize<'de> for DecimalU64 {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct Visitor;
        impl serde::de::Visitor<'_> for Visitor {
            type Value = DecimalU64;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "a decimal string or integer")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> std::result::Result<DecimalU64, E> {
                v.parse::<u64>().map(DecimalU64).map_err(E::custom)
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> std::result::Result<DecimalU64, E> {
                Ok(DecimalU64(v))
            }
        }
        deserializer.deserialize_any(Visitor)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VersionTriple {
    major: u32,
    minor: u32,
    revision: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ArchiveHeader {
    version: VersionTriple,
    #[serde(rename = "compressionFormat")]
    compression_format: String,
    #[serde(rename = "creationTimestamp")]
    creation_timestamp: String,
    #[serde(rename = "headerBedType")]
    header_bed_type: bool,
    note: String,
    #[serde(rename = "type")]
    type_: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StreamEntry {
    chromosome: String,
    filename: String,
    size: DecimalU64,
    #[serde(rename = "uncompressedLineCount")]
    uncompressed_line_count: DecimalU64,
    #[serde(rename = "nonUniqueBaseCount")]
    non_unique_base_count: DecimalU64,
    #[serde(rename = "uniqueBaseCount")]
    unique_base_count: DecimalU64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct MetadataDocument {
    archive: ArchiveHeader,
    streams: Vec<StreamEntry>,
}

impl From<&Metadata> for MetadataDocument {
    fn from(m: &Metadata) -> Self {
        MetadataDocument {
            archive: ArchiveHeader {
                version: VersionTriple {
                    major: m.version.0,
                    minor: m.version.1,
                    revision: m.version.2,
                },
                compression_format: m.compression.as_str().to_string(),
                creation_timestamp: m.creation_timestamp.clone(),
                header_bed_type: m.header_flag,
                note: m.note.clone().unwrap_or_default(),
                type_: "starch".to_string(),
            },
            streams: m
                .records
                .iter()
                .map(|r| StreamEntry {
                    chromosome: r.name.clone(),
                    filename: r.compressed_filename_stub.clone(),
                    size: DecimalU64(r.compressed_size_bytes),
                    uncompressed_line_count: DecimalU64(r.line_count),
                    non_unique_base_count: DecimalU64(r.non_unique_bases),
                    unique_base_count: DecimalU64(r.unique_bases),
                })
                .collect(),
        }
    }
}

impl From<MetadataDocument> for Metadata {
    fn from(doc: MetadataDocument) -> Self {
        let compression = match doc.archive.compression_format.as_str() {
            "gzip" => CompressionType::Gzip,
            _ => CompressionType::Bzip2,
        };
        let note = if doc.archive.note.is_empty() {
            None
        } else {
            Some(doc.archive.note)
        };
        let records = doc
            .streams
            .into_iter()
            .map(|s| ChromosomeRecord {
                name: s.chromosome,
                compressed_filename_stub: s.filename,
                compressed_size_bytes: s.size.0,
                line_count: s.uncompressed_line_count.0,
                non_unique_bases: s.non_unique_base_count.0,
                unique_bases: s.unique_base_count.0,
                uncompressed_size_bytes: 0,
            })
            .collect();
        Metadata {
            version: (
                doc.archive.version.major,
                doc.archive.version.minor,
                doc.archive.version.revision,
            ),
            compression,
            note,
            creation_timestamp: doc.archive.creation_timestamp,
            header_flag: doc.archive.header_bed_type,
            metadata_signature: None,
            records,
        }
    }
}
