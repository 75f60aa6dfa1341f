// Clippy allows
#![allow(clippy::too_many_arguments)]

//! bedstarch: compress and extract sorted BED streams as archives.
//!
//! Usage: bedstarch <COMMAND> [OPTIONS]

use clap::{Parser, Subcommand};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::process;

use bedstarch::archive::{ArchiveReader, ArchiveWriter};
use bedstarch::config::{ArchiveOptions, ArchiveVersion, CompressionType};
use bedstarch::inverse::HeaderPolicy;

#[derive(Parser)]
#[command(name = "bedstarch")]
#[command(author = "Manish Kumar Bobbili")]
#[command(version)]
#[command(about = "Compress and extract sorted genomic interval (BED) archives", long_about = None)]
struct Cli {
    /// Verbosity of structured logging (also controlled by RUST_LOG)
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compress a sorted BED stream into an archive
    Compress {
        /// Input BED file (use - or omit for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output archive path (use - or omit for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Compression codec for the per-chromosome streams
        #[arg(long, value_enum, default_value = "bzip2")]
        compression: CompressionArg,

        /// Write a legacy (revision 1) archive instead of revision 2
        #[arg(long)]
        legacy: bool,

        /// Preserve header/track/comment lines inside each chromosome's stream
        #[arg(long)]
        header: bool,

        /// Free-text note stored in the archive metadata
        #[arg(long)]
        note: Option<String>,

        /// Tag prepended to each chromosome's filename stub
        #[arg(long)]
        tag: Option<String>,
    },

    /// Extract one chromosome, or the whole archive, back to BED text
    Extract {
        /// Input archive path (use - or omit for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Output BED path (use - or omit for stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Extract only this chromosome
        #[arg(short, long)]
        chromosome: Option<String>,

        /// How to handle embedded header/comment lines: emit them, drop
        /// them, or assume the stream has none. Defaults to the archive's
        /// own `headerBedType` flag.
        #[arg(long, value_enum)]
        headers: Option<HeaderArg>,
    },

    /// List the chromosomes stored in an archive, with their record counts
    List {
        /// Input archive path (use - or omit for stdin)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum CompressionArg {
    Bzip2,
    Gzip,
}

impl From<CompressionArg> for CompressionType {
    fn from(value: CompressionArg) -> Self {
        match value {
            CompressionArg::Bzip2 => CompressionType::Bzip2,
            CompressionArg::Gzip => CompressionType::Gzip,
        }
    }
}

/// CLI-facing mirror of [`bedstarch::inverse::HeaderPolicy`], selecting how
/// `extract` handles embedded non-coordinate lines.
#[derive(Clone, Copy, clap::ValueEnum)]
enum HeaderArg {
    /// Emit header/comment lines verbatim.
    Emit,
    /// Silently consume and discard header/comment lines.
    Drop,
    /// Assume the stream contains no header/comment lines at all.
    AssumeAbsent,
}

impl From<HeaderArg> for HeaderPolicy {
    fn from(value: HeaderArg) -> Self {
        match value {
            HeaderArg::Emit => HeaderPolicy::Emit,
            HeaderArg::Drop => HeaderPolicy::Drop,
            HeaderArg::AssumeAbsent => HeaderPolicy::AssumeAbsent,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(cli.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let result = match cli.command {
        Commands::Compress {
            input,
            output,
            compression,
            legacy,
            header,
            note,
            tag,
        } => run_compress(input, output, compression, legacy, header, note, tag),
        Commands::Extract {
            input,
            output,
            chromosome,
            headers,
        } => run_extract(input, output, chromosome, headers),
        Commands::List { input } => run_list(input),
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(e.exit_code());
    }
}

fn open_input(path: Option<PathBuf>) -> io::Result<Box<dyn io::Read>> {
    match path {
        Some(p) if p != PathBuf::from("-") => Ok(Box::new(File::open(p)?)),
        _ => Ok(Box::new(io::stdin())),
    }
}

fn open_output(path: Option<PathBuf>) -> io::Result<Box<dyn Write>> {
    match path {
        Some(p) if p != PathBuf::from("-") => Ok(Box::new(File::create(p)?)),
        _ => Ok(Box::new(io::stdout())),
    }
}

fn run_compress(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    compression: CompressionArg,
    legacy: bool,
    header: bool,
    note: Option<String>,
    tag: Option<String>,
) -> bedstarch::Result<()> {
    let reader = BufReader::new(open_input(input)?);
    let sink = BufWriter::new(open_output(output)?);

    let options = ArchiveOptions {
        version: if legacy {
            ArchiveVersion::V1
        } else {
            ArchiveVersion::V2
        },
        compression: compression.into(),
        header_flag: header,
        note,
        tag,
    };

    let mut writer = ArchiveWriter::new(sink, options);
    writer.write_from_reader(reader)?;
    let (mut sink, metadata) = writer.finish()?;
    sink.flush()?;

    tracing::info!(
        chromosomes = metadata.records().len(),
        compressed_bytes = metadata.total_compressed_bytes(),
        "archive written"
    );
    Ok(())
}

fn run_extract(
    input: Option<PathBuf>,
    output: Option<PathBuf>,
    chromosome: Option<String>,
    headers: Option<HeaderArg>,
) -> bedstarch::Result<()> {
    let reader = SeekableInput::open(input)?;
    let mut archive = ArchiveReader::open(reader)?;
    let mut sink = BufWriter::new(open_output(output)?);
    let policy = headers
        .map(HeaderPolicy::from)
        .unwrap_or_else(|| archive.default_header_policy());

    match chromosome {
        Some(name) => archive.extract_chromosome(&name, &mut sink, policy)?,
        None => archive.extract_all(&mut sink, policy)?,
    }
    sink.flush()?;
    Ok(())
}

fn run_list(input: Option<PathBuf>) -> bedstarch::Result<()> {
    let reader = SeekableInput::open(input)?;
    let archive = ArchiveReader::open(reader)?;
    for record in archive.metadata().records() {
        println!(
            "{}\t{}\t{}",
            record.name, record.line_count, record.compressed_size_bytes
        );
    }
    Ok(())
}

/// `ArchiveReader` needs `Read + Seek`; stdin doesn't implement `Seek`, so
/// a non-file input is buffered into memory first.
enum SeekableInput {
    File(File),
    Buffered(io::Cursor<Vec<u8>>),
}

impl SeekableInput {
    fn open(path: Option<PathBuf>) -> io::Result<Self> {
        match path {
            Some(p) if p != PathBuf::from("-") => Ok(SeekableInput::File(File::open(p)?)),
            _ => {
                let mut buf = Vec::new();
                io::stdin().lock().read_to_end(&mut buf)?;
                Ok(SeekableInput::Buffered(io::Cursor::new(buf)))
            }
        }
    }
}

impl io::Read for SeekableInput {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SeekableInput::File(f) => f.read(buf),
            SeekableInput::Buffered(c) => c.read(buf),
        }
    }
}

impl io::Seek for SeekableInput {
    fn seek(&mut self, pos: io::SeekFrom) -> io::Result<u64> {
        match self {
            SeekableInput::File(f) => f.seek(pos),
            SeekableInput::Buffered(c) => c.seek(pos),
        }
    }
}
