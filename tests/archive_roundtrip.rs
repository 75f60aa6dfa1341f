//! End-to-end coverage of the archive pipeline against real files on disk,
//! exercising the same seek/read paths a CLI invocation would use.

use bedstarch::archive::{ArchiveReader, ArchiveWriter};
use bedstarch::config::{ArchiveOptions, ArchiveVersion, CompressionType};
use bedstarch::error::ArchiveError;
use bedstarch::inverse::HeaderPolicy;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};

fn write_archive(path: &std::path::Path, options: ArchiveOptions, lines: &[&str]) {
    let file = File::create(path).unwrap();
    let mut writer = ArchiveWriter::new(BufWriter::new(file), options);
    for line in lines {
        writer.write_line(line).unwrap();
    }
    let (mut sink, _metadata) = writer.finish().unwrap();
    sink.flush().unwrap();
}

#[test]
fn full_round_trip_through_a_real_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.starch");

    write_archive(
        &path,
        ArchiveOptions::default(),
        &["chr1\t100\t200", "chr1\t300\t400", "chr2\t50\t60"],
    );

    let file = File::open(&path).unwrap();
    let mut reader = ArchiveReader::open(file).unwrap();
    let mut out = Vec::new();
    reader.extract_all(&mut out, HeaderPolicy::AssumeAbsent).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "chr1\t100\t200\nchr1\t300\t400\nchr2\t50\t60\n"
    );
}

#[test]
fn footer_offset_equals_magic_plus_compressed_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.starch");
    write_archive(
        &path,
        ArchiveOptions::default(),
        &["chr1\t0\t10", "chr2\t0\t20", "chr3\t0\t30"],
    );

    let bytes = std::fs::read(&path).unwrap();
    let footer_buf: [u8; 128] = bytes[bytes.len() - 128..].try_into().unwrap();
    let footer = bedstarch::footer::Footer::decode(&footer_buf).unwrap();

    let file = File::open(&path).unwrap();
    let reader = ArchiveReader::open(file).unwrap();
    let total_compressed: u64 = reader.metadata().total_compressed_bytes();
    assert_eq!(footer.offset, 4 + total_compressed);
}

#[test]
fn unique_and_non_unique_base_counts_reflect_overlap() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overlap.starch");
    write_archive(&path, ArchiveOptions::default(), &["chr1\t0\t10", "chr1\t5\t15"]);

    let file = File::open(&path).unwrap();
    let reader = ArchiveReader::open(file).unwrap();
    let record = reader.metadata().get("chr1").unwrap();
    assert_eq!(record.non_unique_bases, 20);
    assert_eq!(record.unique_bases, 15);
    assert_eq!(record.line_count, 2);
}

#[test]
fn duplicate_chromosome_across_a_gap_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bad.starch");
    let file = File::create(&path).unwrap();
    let mut writer = ArchiveWriter::new(BufWriter::new(file), ArchiveOptions::default());
    writer.write_line("chr1\t0\t10").unwrap();
    writer.write_line("chr2\t0\t10").unwrap();
    let err = writer.write_line("chr1\t20\t30").unwrap_err();
    assert!(matches!(err, ArchiveError::InputCorrupt { .. }));
}

#[test]
fn tampering_with_the_metadata_region_fails_the_signature_check() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tampered.starch");
    write_archive(&path, ArchiveOptions::default(), &["chr1\t0\t10"]);

    let mut bytes = std::fs::read(&path).unwrap();
    let flip_at = bytes.len() - 128 - 10;
    bytes[flip_at] ^= 0xFF;
    std::fs::write(&path, &bytes).unwrap();

    let file = File::open(&path).unwrap();
    let err = ArchiveReader::open(file).unwrap_err();
    assert!(matches!(err, ArchiveError::Signature));
}

#[test]
fn querying_an_absent_chromosome_reports_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sample.starch");
    write_archive(&path, ArchiveOptions::default(), &["chr1\t0\t10"]);

    let file = File::open(&path).unwrap();
    let mut reader = ArchiveReader::open(file).unwrap();
    let mut out = Vec::new();
    let err = reader
        .extract_chromosome("chrZ", &mut out, HeaderPolicy::AssumeAbsent)
        .unwrap_err();
    assert!(matches!(err, ArchiveError::NotFound(_)));
}

#[test]
fn header_lines_survive_a_round_trip_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("headered.starch");
    let options = ArchiveOptions {
        version: ArchiveVersion::V2,
        compression: CompressionType::Gzip,
        header_flag: true,
        note: None,
        tag: None,
    };
    write_archive(
        &path,
        options,
        &["track name=\"demo\"", "chr1\t0\t10", "chr1\t20\t30"],
    );

    let file = File::open(&path).unwrap();
    let mut reader = ArchiveReader::open(file).unwrap();
    let mut out = Vec::new();
    reader
        .extract_chromosome("chr1", &mut out, HeaderPolicy::Emit)
        .unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "track name=\"demo\"\nchr1\t0\t10\nchr1\t20\t30\n"
    );
}

#[test]
fn legacy_revision_1_archives_round_trip_without_a_footer() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("legacy.starch");
    let options = ArchiveOptions {
        version: ArchiveVersion::V1,
        compression: CompressionType::Bzip2,
        header_flag: false,
        note: None,
        tag: None,
    };
    write_archive(&path, options, &["chr1\t0\t10", "chr2\t0\t20"]);

    let bytes = std::fs::read(&path).unwrap();
    assert_ne!(&bytes[0..4], &bedstarch::footer::MAGIC);

    let file = File::open(&path).unwrap();
    let mut reader = ArchiveReader::open(file).unwrap();
    let mut out = Vec::new();
    reader.extract_all(&mut out, HeaderPolicy::AssumeAbsent).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "chr1\t0\t10\nchr2\t0\t20\n"
    );
}

#[test]
fn reading_from_a_buffered_file_reader_input_still_compresses() {
    let dir = tempfile::tempdir().unwrap();
    let input_path = dir.path().join("input.bed");
    std::fs::write(&input_path, "chr1\t0\t10\nchr1\t20\t30\nchr2\t0\t5\n").unwrap();
    let archive_path = dir.path().join("from_file.starch");

    let input = BufReader::new(File::open(&input_path).unwrap());
    let output = File::create(&archive_path).unwrap();
    let mut writer = ArchiveWriter::new(BufWriter::new(output), ArchiveOptions::default());
    writer.write_from_reader(input).unwrap();
    let (mut sink, metadata) = writer.finish().unwrap();
    sink.flush().unwrap();
    assert_eq!(metadata.records().len(), 2);

    let file = File::open(&archive_path).unwrap();
    let mut reader = ArchiveReader::open(file).unwrap();
    let mut out = Vec::new();
    reader.extract_all(&mut out, HeaderPolicy::AssumeAbsent).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "chr1\t0\t10\nchr1\t20\t30\nchr2\t0\t5\n"
    );
}
