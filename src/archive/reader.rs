//! Archive reader: locates a chromosome's compressed stream, decompresses
//! it, and runs the decompressed text back through the inverse transform.

use crate::config::{ArchiveVersion, CompressionType, STARCH_LEGACY_METADATA_SIZE};
use crate::error::{ArchiveError, Result};
use crate::footer::{self, Footer};
use crate::inverse::{HeaderPolicy, InverseTransformer};
use crate::metadata::{ChromosomeRecord, Metadata};
use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use std::io::{BufRead, BufReader, Read, Seek, SeekFrom, Write};

/// One chromosome's decompressed byte range within the archive.
struct Span {
    offset: u64,
    len: u64,
}

/// Opens an archive and serves per-chromosome extraction.
pub struct ArchiveReader<R: Read + Seek> {
    reader: R,
    metadata: Metadata,
    version: ArchiveVersion,
    region_start: u64,
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Detect the archive revision, read and verify its metadata, and
    /// return a reader ready to serve [`Self::extract_chromosome`] calls.
    pub fn open(mut reader: R) -> Result<Self> {
        let total_len = reader.seek(SeekFrom::End(0))?;

        reader.seek(SeekFrom::Start(0))?;
        let mut magic_buf = [0u8; 4];
        let read_magic = read_up_to(&mut reader, &mut magic_buf)?;

        if read_magic == 4 && magic_buf == footer::MAGIC {
            let footer_len = footer::FOOTER_LEN as u64;
            if total_len < 4 + footer_len {
                return Err(ArchiveError::Codec(
                    "archive is too short to hold a revision-2 footer".to_string(),
                ));
            }
            reader.seek(SeekFrom::End(-(footer_len as i64)))?;
            let mut footer_buf = [0u8; footer::FOOTER_LEN];
            reader.read_exact(&mut footer_buf)?;
            let footer = Footer::decode(&footer_buf)?;

            if footer.offset < 4 || footer.offset > total_len - footer_len {
                return Err(ArchiveError::Codec(format!(
                    "footer offset {} is out of range for a {total_len}-byte archive",
                    footer.offset
                )));
            }
            let metadata_len = total_len - footer_len - footer.offset;
            reader.seek(SeekFrom::Start(footer.offset))?;
            let mut metadata_bytes = vec![0u8; metadata_len as usize];
            reader.read_exact(&mut metadata_bytes)?;

            let digest = footer::sha1_base64(&metadata_bytes);
            if digest.trim_end() != footer.digest_b64.trim_end() {
                tracing::error!("metadata signature mismatch on archive open");
                return Err(ArchiveError::Signature);
            }

            let metadata = Metadata::parse_json(&metadata_bytes)?;
            Ok(Self {
                reader,
                metadata,
                version: ArchiveVersion::V2,
                region_start: 4,
            })
        } else {
            if total_len < STARCH_LEGACY_METADATA_SIZE as u64 {
                return Err(ArchiveError::Codec(
                    "archive is too short to hold a revision-1 metadata buffer".to_string(),
                ));
            }
            reader.seek(SeekFrom::Start(0))?;
            let mut metadata_bytes = vec![0u8; STARCH_LEGACY_METADATA_SIZE];
            reader.read_exact(&mut metadata_bytes)?;
            let metadata = Metadata::parse_json(&metadata_bytes)?;
            Ok(Self {
                reader,
                metadata,
                version: ArchiveVersion::V1,
                region_start: STARCH_LEGACY_METADATA_SIZE as u64,
            })
        }
    }

    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    pub fn version(&self) -> ArchiveVersion {
        self.version
    }

    pub fn chromosomes(&self) -> impl Iterator<Item = &str> {
        self.metadata
            .records()
            .iter()
            .filter(|r| !is_null_placeholder(r))
            .map(|r| r.name.as_str())
    }

    fn span_for(&self, chromosome: &str) -> Result<Span> {
        let mut offset = self.region_start;
        for record in self.metadata.records() {
            if record.name == chromosome {
                return Ok(Span {
                    offset,
                    len: record.compressed_size_bytes,
                });
            }
            offset += record.compressed_size_bytes;
        }
        Err(ArchiveError::NotFound(chromosome.to_string()))
    }

    /// Decompress and inverse-transform one chromosome's stream, writing
    /// reconstructed BED text to `out`. `header_policy` selects how embedded
    /// non-coordinate lines are handled: emitted, dropped, or assumed absent
    /// (caller's responsibility to pick a policy consistent with how the
    /// archive was written; see [`HeaderPolicy`]).
    pub fn extract_chromosome<W: Write>(
        &mut self,
        chromosome: &str,
        out: &mut W,
        header_policy: HeaderPolicy,
    ) -> Result<()> {
        let record = self
            .metadata
            .get(chromosome)
            .ok_or_else(|| ArchiveError::NotFound(chromosome.to_string()))?;
        if is_null_placeholder(record) {
            return Err(ArchiveError::NotFound(chromosome.to_string()));
        }
        let span = self.span_for(chromosome)?;
        self.decode_span(&span, chromosome, out, header_policy)
    }

    /// Decompress and inverse-transform every chromosome, in archive order.
    pub fn extract_all<W: Write>(&mut self, out: &mut W, header_policy: HeaderPolicy) -> Result<()> {
        let names: Vec<String> = self.chromosomes().map(str::to_string).collect();
        for name in names {
            let span = self.span_for(&name)?;
            self.decode_span(&span, &name, out, header_policy)?;
        }
        Ok(())
    }

    /// The header policy this archive's own `header_flag` suggests: `Emit`
    /// when the archive may carry embedded header lines, `AssumeAbsent`
    /// otherwise. A convenience default; callers may pass any
    /// [`HeaderPolicy`] to [`Self::extract_chromosome`]/[`Self::extract_all`].
    pub fn default_header_policy(&self) -> HeaderPolicy {
        if self.metadata.header_flag {
            HeaderPolicy::Emit
        } else {
            HeaderPolicy::AssumeAbsent
        }
    }

    fn decode_span<W: Write>(
        &mut self,
        span: &Span,
        chromosome: &str,
        out: &mut W,
        header_policy: HeaderPolicy,
    ) -> Result<()> {
        self.reader.seek(SeekFrom::Start(span.offset))?;
        let compressed = (&mut self.reader).take(span.len);

        let mut transformer = InverseTransformer::new(chromosome, header_policy);

        match self.metadata.compression {
            CompressionType::Gzip => {
                let decoder = GzDecoder::new(compressed);
                decode_lines(decoder, &mut transformer, out)
            }
            CompressionType::Bzip2 => {
                let decoder = BzDecoder::new(compressed);
                decode_lines(decoder, &mut transformer, out)
            }
        }
    }
}

fn decode_lines<D: Read, W: Write>(
    decoder: D,
    transformer: &mut InverseTransformer,
    out: &mut W,
) -> Result<()> {
    let mut reader = BufReader::new(decoder);
    let mut line = String::new();
    loop {
        line.clear();
        let n = reader
            .read_line(&mut line)
            .map_err(|e| ArchiveError::Codec(e.to_string()))?;
        if n == 0 {
            break;
        }
        let trimmed = line.strip_suffix('\n').unwrap_or(&line);
        transformer.process_line(trimmed, out)?;
    }
    Ok(())
}

fn is_null_placeholder(record: &ChromosomeRecord) -> bool {
    record.name == "null" && record.compressed_size_bytes == 0
}

fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut total = 0;
    while total < buf.len() {
        let n = reader.read(&mut buf[total..])?;
        if n == 0 {
            break;
        }
        total += n;
    }
    Ok(total)
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::writer::ArchiveWriter;
    use crate::config::ArchiveOptions;
    use std::io::Cursor;

    fn archive_bytes(version: ArchiveVersion, lines: &[&str]) -> Vec<u8> {
        let options = ArchiveOptions {
            version,
            compression: CompressionType::Gzip,
            header_flag: false,
            note: None,
            tag: None,
        };
        let mut writer = ArchiveWriter::new(Vec::new(), options);
        for line in lines {
            writer.write_line(line).unwrap();
        }
        let (bytes, _metadata) = writer.finish().unwrap();
        bytes
    }

    #[test]
    fn open_lists_chromosomes_in_order() {
        let bytes = archive_bytes(ArchiveVersion::V2, &["chr1\t0\t10", "chr2\t5\t15"]);
        let reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.chromosomes().collect::<Vec<_>>(), vec!["chr1", "chr2"]);
    }

    #[test]
    fn extract_chromosome_reconstructs_coordinates() {
        let bytes = archive_bytes(ArchiveVersion::V2, &["chr1\t0\t10", "chr1\t20\t30"]);
        let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        let mut out = Vec::new();
        reader
            .extract_chromosome("chr1", &mut out, HeaderPolicy::AssumeAbsent)
            .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "chr1\t0\t10\nchr1\t20\t30\n"
        );
    }

    #[test]
    fn extract_all_covers_every_chromosome_in_order() {
        let bytes = archive_bytes(ArchiveVersion::V2, &["chr1\t0\t10", "chr2\t5\t15"]);
        let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        let mut out = Vec::new();
        reader.extract_all(&mut out, HeaderPolicy::AssumeAbsent).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "chr1\t0\t10\nchr2\t5\t15\n"
        );
    }

    #[test]
    fn missing_chromosome_is_not_found() {
        let bytes = archive_bytes(ArchiveVersion::V2, &["chr1\t0\t10"]);
        let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        let mut out = Vec::new();
        let err = reader
            .extract_chromosome("chrX", &mut out, HeaderPolicy::AssumeAbsent)
            .unwrap_err();
        assert!(matches!(err, ArchiveError::NotFound(_)));
    }

    #[test]
    fn drop_policy_discards_embedded_headers_on_extract() {
        let options = ArchiveOptions {
            version: ArchiveVersion::V2,
            compression: CompressionType::Gzip,
            header_flag: true,
            note: None,
            tag: None,
        };
        let mut writer = ArchiveWriter::new(Vec::new(), options);
        for line in ["track name=\"x\"", "chr1\t0\t10"] {
            writer.write_line(line).unwrap();
        }
        let (bytes, _metadata) = writer.finish().unwrap();

        let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        let mut out = Vec::new();
        reader
            .extract_chromosome("chr1", &mut out, HeaderPolicy::Drop)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "chr1\t0\t10\n");
    }

    #[test]
    fn tampered_metadata_fails_signature_check() {
        let mut bytes = archive_bytes(ArchiveVersion::V2, &["chr1\t0\t10"]);
        let flip_at = bytes.len() - footer::FOOTER_LEN - 5;
        bytes[flip_at] ^= 0xFF;
        let err = ArchiveReader::open(Cursor::new(bytes)).unwrap_err();
        assert!(matches!(err, ArchiveError::Signature));
    }

    #[test]
    fn legacy_v1_archive_has_no_magic_and_round_trips() {
        let bytes = archive_bytes(ArchiveVersion::V1, &["chr1\t0\t10"]);
        assert_ne!(&bytes[0..4], &footer::MAGIC);
        let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        let mut out = Vec::new();
        reader
            .extract_chromosome("chr1", &mut out, HeaderPolicy::AssumeAbsent)
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "chr1\t0\t10\n");
    }

    #[test]
    fn empty_input_round_trips_to_nothing() {
        let bytes = archive_bytes(ArchiveVersion::V2, &[]);
        let mut reader = ArchiveReader::open(Cursor::new(bytes)).unwrap();
        assert_eq!(reader.chromosomes().count(), 0);
        let mut out = Vec::new();
        reader.extract_all(&mut out, HeaderPolicy::AssumeAbsent).unwrap();
        assert!(out.is_empty());
    }
}
