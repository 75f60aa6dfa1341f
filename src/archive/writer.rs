//! Archive writer: drives the per-input-line state machine that turns a
//! sorted BED stream into a finished archive.
//!
//! Compressed per-chromosome streams are accumulated into an in-memory
//! buffer (itself produced by the same [`BlockCompressor`] `open`/`write`/
//! `close`/`reset` cycle) so that the final envelope (magic, compressed
//! region, metadata JSON, footer) can be assembled and written to the
//! caller's sink in one pass, once the total compressed size needed for
//! the footer's offset field is known. See DESIGN.md for the reasoning
//! behind buffering in memory rather than streaming straight to the sink.

use crate::codec::BlockCompressor;
use crate::config::{ArchiveOptions, ArchiveVersion, STARCH_LEGACY_METADATA_SIZE};
use crate::delta::DeltaEncoder;
use crate::error::{ArchiveError, Result};
use crate::footer::{self, Footer};
use crate::metadata::{filename_stub, Metadata};
use crate::tokenizer;
use std::io::{BufRead, Write};

const LEGACY_FILLER: u8 = b' ';

/// Drives the delta transform, block compressor, and metadata recorder
/// across an entire sorted BED stream and assembles the resulting
/// archive.
pub struct ArchiveWriter<W: Write> {
    sink: W,
    options: ArchiveOptions,
    compressor: BlockCompressor<Vec<u8>>,
    metadata: Metadata,
    delta: DeltaEncoder,
    current_chrom: Option<String>,
    transformed_buffer: Vec<u8>,
    intermediate: Vec<u8>,
    prelude_header: Vec<String>,
    line_no: usize,
    any_coordinate_seen: bool,
    chrom_buf: Vec<u8>,
    rest_buf: Vec<u8>,
}

impl<W: Write> ArchiveWriter<W> {
    pub fn new(sink: W, options: ArchiveOptions) -> Self {
        let version_triple = match options.version {
            ArchiveVersion::V1 => (1, 5, 0),
            ArchiveVersion::V2 => (2, 2, 0),
        };
        let metadata = Metadata::new(
            version_triple,
            options.compression,
            options.header_flag,
            options.note.clone(),
            chrono::Utc::now().to_rfc3339(),
        );
        Self {
            sink,
            compressor: BlockCompressor::new(options.compression, Vec::new()),
            metadata,
            delta: DeltaEncoder::new(),
            current_chrom: None,
            transformed_buffer: Vec::new(),
            intermediate: Vec::new(),
            prelude_header: Vec::new(),
            line_no: 0,
            any_coordinate_seen: false,
            chrom_buf: Vec::new(),
            rest_buf: Vec::new(),
            options,
        }
    }

    /// Feed every line of a buffered reader through [`Self::write_line`].
    pub fn write_from_reader<R: BufRead>(&mut self, reader: R) -> Result<()> {
        for line in reader.lines() {
            let line = line?;
            self.write_line(&line)?;
        }
        Ok(())
    }

    /// Feed a single input line (without its trailing newline).
    ///
    /// Tokenizes into the writer's own reusable `chrom_buf`/`rest_buf`
    /// rather than allocating a fresh `String` per line. The chromosome
    /// name is only copied into an owned `String` at an actual
    /// chromosome-boundary transition, which is rare relative to line
    /// count; the remainder is passed straight through as a borrowed
    /// `&str` to the delta encoder.
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.line_no += 1;
        let line_no = self.line_no;
        let tokenized =
            tokenizer::tokenize_into(line.as_bytes(), line_no, &mut self.chrom_buf, &mut self.rest_buf)?;

        if !tokenized.kind.is_coordinate() {
            if self.options.header_flag {
                let text = std::str::from_utf8(tokenized.chromosome)
                    .map_err(|_| ArchiveError::InputMalformed {
                        line: line_no,
                        message: "header line is not valid UTF-8".to_string(),
                    })?
                    .to_string();
                match &self.current_chrom {
                    Some(_) => self.delta.push_header_line(&text),
                    None => self.prelude_header.push(text),
                }
            }
            return Ok(());
        }

        let start = tokenized.start;
        let stop = tokenized.stop;
        let chrom_changed = match &self.current_chrom {
            None => true,
            Some(c) => c.as_bytes() != tokenized.chromosome,
        };

        if chrom_changed {
            let chrom_owned = std::str::from_utf8(tokenized.chromosome)
                .map_err(|_| ArchiveError::InputMalformed {
                    line: line_no,
                    message: "chromosome is not valid UTF-8".to_string(),
                })?
                .to_string();

            if self.current_chrom.is_some() {
                Self::close_chromosome(
                    &mut self.current_chrom,
                    &mut self.transformed_buffer,
                    &mut self.compressor,
                    &mut self.metadata,
                    &self.delta,
                )?;
            }
            Self::open_chromosome(
                &chrom_owned,
                self.options.tag.as_deref(),
                line_no,
                &mut self.metadata,
                &mut self.compressor,
                &mut self.delta,
                &mut self.prelude_header,
            )?;
            self.current_chrom = Some(chrom_owned);
        }
        self.any_coordinate_seen = true;

        let remainder = std::str::from_utf8(tokenized.remainder).map_err(|_| {
            ArchiveError::InputMalformed {
                line: line_no,
                message: "remainder is not valid UTF-8".to_string(),
            }
        })?;

        self.intermediate.clear();
        self.delta
            .encode_line(start, stop, remainder, line_no, &mut self.intermediate)?;

        if self.transformed_buffer.len() + self.intermediate.len() >= crate::config::BUFFER_MAX {
            self.compressor.write(&self.transformed_buffer)?;
            self.transformed_buffer.clear();
        }
        self.transformed_buffer.extend_from_slice(&self.intermediate);

        Ok(())
    }

    fn open_chromosome(
        chrom: &str,
        tag: Option<&str>,
        line_no: usize,
        metadata: &mut Metadata,
        compressor: &mut BlockCompressor<Vec<u8>>,
        delta: &mut DeltaEncoder,
        prelude_header: &mut Vec<String>,
    ) -> Result<()> {
        if metadata.contains(chrom) {
            tracing::error!(chrom, line = line_no, "duplicate chromosome in input");
            return Err(ArchiveError::InputCorrupt {
                line: line_no,
                message: format!(
                    "chromosome '{chrom}' appears more than once (possible interleaving issue)"
                ),
            });
        }
        let stub = filename_stub(chrom, tag);
        metadata.append(chrom, &stub)?;
        compressor.open()?;
        *delta = DeltaEncoder::new();
        for pending in prelude_header.drain(..) {
            delta.push_header_line(&pending);
        }
        tracing::debug!(chrom, "opened chromosome stream");
        Ok(())
    }

    fn close_chromosome(
        current_chrom: &mut Option<String>,
        transformed_buffer: &mut Vec<u8>,
        compressor: &mut BlockCompressor<Vec<u8>>,
        metadata: &mut Metadata,
        delta: &DeltaEncoder,
    ) -> Result<()> {
        let chrom = current_chrom
            .take()
            .expect("close_chromosome called without an open chromosome");
        if !transformed_buffer.is_empty() {
            compressor.write(transformed_buffer)?;
            transformed_buffer.clear();
        }
        let bytes_written = compressor.close()?;
        metadata.update(
            &chrom,
            bytes_written,
            delta.line_count,
            delta.non_unique_bases,
            delta.unique_bases,
        )?;
        tracing::debug!(chrom, bytes_written, "closed chromosome stream");
        Ok(())
    }

    /// Flush the final chromosome (if any), assemble the envelope, and
    /// write it to the sink. Returns the sink and the finished [`Metadata`].
    pub fn finish(mut self) -> Result<(W, Metadata)> {
        if self.current_chrom.is_some() {
            Self::close_chromosome(
                &mut self.current_chrom,
                &mut self.transformed_buffer,
                &mut self.compressor,
                &mut self.metadata,
                &self.delta,
            )?;
        }
        if !self.any_coordinate_seen {
            self.metadata.append("null", "null")?;
            self.metadata.update("null", 0, 0, 0, 0)?;
        }

        let metadata_json = self.metadata.serialize_json()?;
        let compressed_region = self.compressor.into_sink()?;

        match self.options.version {
            ArchiveVersion::V2 => {
                self.sink.write_all(&footer::MAGIC)?;
                self.sink.write_all(&compressed_region)?;
                self.sink.write_all(&metadata_json)?;
                let digest = footer::sha1_base64(&metadata_json);
                let offset = 4 + compressed_region.len() as u64;
                let footer = Footer::new(offset, digest);
                self.sink.write_all(&footer.encode())?;
            }
            ArchiveVersion::V1 => {
                if metadata_json.len() > STARCH_LEGACY_METADATA_SIZE {
                    return Err(ArchiveError::Codec(format!(
                        "legacy metadata ({} bytes) exceeds fixed buffer size ({})",
                        metadata_json.len(),
                        STARCH_LEGACY_METADATA_SIZE
                    )));
                }
                let mut buf = vec![LEGACY_FILLER; STARCH_LEGACY_METADATA_SIZE];
                buf[..metadata_json.len()].copy_from_slice(&metadata_json);
                self.sink.write_all(&buf)?;
                self.sink.write_all(&compressed_region)?;
            }
        }
        self.sink.flush()?;
        Ok((self.sink, self.metadata))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CompressionType;

    fn opts(version: ArchiveVersion) -> ArchiveOptions {
        ArchiveOptions {
            version,
            compression: CompressionType::Gzip,
            header_flag: false,
            note: None,
            tag: None,
        }
    }

    #[test]
    fn writes_magic_and_footer_for_v2() {
        let mut writer = ArchiveWriter::new(Vec::new(), opts(ArchiveVersion::V2));
        writer.write_line("chr1\t100\t200").unwrap();
        writer.write_line("chr1\t300\t400").unwrap();
        writer.write_line("chr2\t50\t60").unwrap();
        let (bytes, metadata) = writer.finish().unwrap();

        assert_eq!(&bytes[0..4], &footer::MAGIC);
        assert_eq!(metadata.records().len(), 2);
        assert_eq!(metadata.records()[0].name, "chr1");
        assert_eq!(metadata.records()[0].line_count, 2);
        assert_eq!(metadata.records()[1].name, "chr2");
    }

    #[test]
    fn footer_offset_matches_sum_of_compressed_sizes() {
        let mut writer = ArchiveWriter::new(Vec::new(), opts(ArchiveVersion::V2));
        writer.write_line("chr1\t100\t200").unwrap();
        writer.write_line("chr2\t50\t60").unwrap();
        let (bytes, metadata) = writer.finish().unwrap();

        let footer_buf: [u8; 128] = bytes[bytes.len() - 128..].try_into().unwrap();
        let footer = Footer::decode(&footer_buf).unwrap();
        let expected_offset = 4 + metadata.total_compressed_bytes();
        assert_eq!(footer.offset, expected_offset);
    }

    #[test]
    fn duplicate_chromosome_is_rejected() {
        let mut writer = ArchiveWriter::new(Vec::new(), opts(ArchiveVersion::V2));
        writer.write_line("chr1\t100\t200").unwrap();
        writer.write_line("chr2\t50\t60").unwrap();
        let err = writer.write_line("chr1\t500\t600").unwrap_err();
        assert!(matches!(err, ArchiveError::InputCorrupt { .. }));
    }

    #[test]
    fn corrupt_coordinate_reports_line_number() {
        let mut writer = ArchiveWriter::new(Vec::new(), opts(ArchiveVersion::V2));
        writer.write_line("chr1\t100\t200").unwrap();
        let err = writer.write_line("chr1\t500\t100").unwrap_err();
        match err {
            ArchiveError::InputCorrupt { line, .. } => assert_eq!(line, 2),
            other => panic!("expected InputCorrupt, got {other:?}"),
        }
    }

    #[test]
    fn empty_input_produces_null_placeholder() {
        let writer = ArchiveWriter::new(Vec::new(), opts(ArchiveVersion::V2));
        let (_, metadata) = writer.finish().unwrap();
        assert_eq!(metadata.records().len(), 1);
        assert_eq!(metadata.records()[0].name, "null");
        assert_eq!(metadata.records()[0].compressed_size_bytes, 0);
    }

    #[test]
    fn header_lines_are_carried_when_header_flag_set() {
        let mut options = opts(ArchiveVersion::V2);
        options.header_flag = true;
        let mut writer = ArchiveWriter::new(Vec::new(), options);
        writer.write_line("track name=\"x\"").unwrap();
        writer.write_line("chr1\t0\t10").unwrap();
        let (_, metadata) = writer.finish().unwrap();
        assert!(metadata.header_flag);
    }

    #[test]
    fn v1_writer_has_no_magic_prefix() {
        let mut writer = ArchiveWriter::new(Vec::new(), opts(ArchiveVersion::V1));
        writer.write_line("chr1\t0\t10").unwrap();
        let (bytes, _) = writer.finish().unwrap();
        assert_ne!(&bytes[0..4], &footer::MAGIC);
    }

    #[test]
    fn repeated_lines_reuse_the_tokenizer_scratch_buffers() {
        let mut writer = ArchiveWriter::new(Vec::new(), opts(ArchiveVersion::V2));
        for i in 0..50 {
            writer
                .write_line(&format!("chr1\t{}\t{}\tname{i}\t0\t+", i * 10, i * 10 + 5))
                .unwrap();
        }
        for i in 0..50 {
            writer
                .write_line(&format!("chr2\t{}\t{}\tname{i}\t0\t-", i * 10, i * 10 + 5))
                .unwrap();
        }
        let (_, metadata) = writer.finish().unwrap();
        assert_eq!(metadata.records().len(), 2);
        assert_eq!(metadata.records()[0].line_count, 50);
        assert_eq!(metadata.records()[1].line_count, 50);
    }
}
