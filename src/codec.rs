//! Block compressor: a tagged variant over bzip2/gzip with `open` / `write`
//! / `close` / `reset` semantics, dispatching to a concrete per-arm
//! implementation the way a codec-wrapping enum over gzip/bzip2 does.
//!
//! Compression level is fixed at each library's best-compression setting.
//! Chunking writes to `BUFFER_MAX` is the caller's (Archive Writer's) job,
//! not this module's.

use crate::config::CompressionType;
use crate::error::{ArchiveError, Result};
use bzip2::write::BzEncoder;
use bzip2::Compression as BzCompression;
use flate2::write::GzEncoder;
use flate2::Compression as GzCompression;
use std::io::Write;

/// Wraps a sink `W` and counts bytes written through it. Used to recover
/// `compressed_size_bytes` without the codec crates exposing that count
/// directly.
struct CountingWriter<W: Write> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        Self { inner, count: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

enum State<W: Write> {
    Closed(W),
    Bzip2(BzEncoder<CountingWriter<W>>),
    Gzip(GzEncoder<CountingWriter<W>>),
    /// Transient placeholder used only while moving `state` out and back in.
    Poisoned,
}

/// A block compressor bound to one underlying sink for its whole lifetime,
/// re-opened fresh at every chromosome boundary.
pub struct BlockCompressor<W: Write> {
    kind: CompressionType,
    state: State<W>,
}

impl<W: Write> BlockCompressor<W> {
    /// Create a compressor over `sink`, not yet open.
    pub fn new(kind: CompressionType, sink: W) -> Self {
        Self {
            kind,
            state: State::Closed(sink),
        }
    }

    /// Open a fresh compressed stream on the bound sink.
    pub fn open(&mut self) -> Result<()> {
        let sink = match std::mem::replace(&mut self.state, State::Poisoned) {
            State::Closed(sink) => sink,
            _ => return Err(ArchiveError::Codec("compressor already open".to_string())),
        };
        let counting = CountingWriter::new(sink);
        self.state = match self.kind {
            CompressionType::Bzip2 => {
                State::Bzip2(BzEncoder::new(counting, BzCompression::best()))
            }
            CompressionType::Gzip => State::Gzip(GzEncoder::new(counting, GzCompression::best())),
        };
        Ok(())
    }

    /// Write a chunk of transformed bytes into the open stream.
    pub fn write(&mut self, bytes: &[u8]) -> Result<()> {
        match &mut self.state {
            State::Bzip2(enc) => enc
                .write_all(bytes)
                .map_err(|e| ArchiveError::Codec(e.to_string())),
            State::Gzip(enc) => enc
                .write_all(bytes)
                .map_err(|e| ArchiveError::Codec(e.to_string())),
            State::Closed(_) => Err(ArchiveError::Codec("compressor not open".to_string())),
            State::Poisoned => unreachable!("compressor left in poisoned state"),
        }
    }

    /// Finalize the open stream, returning the number of compressed bytes
    /// written since the matching `open`. The compressor returns to the
    /// `Closed` state on the same sink, ready for another `open`.
    pub fn close(&mut self) -> Result<u64> {
        let state = std::mem::replace(&mut self.state, State::Poisoned);
        let (sink, count) = match state {
            State::Bzip2(enc) => {
                let counting = enc.finish().map_err(|e| ArchiveError::Codec(e.to_string()))?;
                (counting.inner, counting.count)
            }
            State::Gzip(enc) => {
                let counting = enc.finish().map_err(|e| ArchiveError::Codec(e.to_string()))?;
                (counting.inner, counting.count)
            }
            State::Closed(sink) => {
                self.state = State::Closed(sink);
                return Err(ArchiveError::Codec("compressor not open".to_string()));
            }
            State::Poisoned => unreachable!("compressor left in poisoned state"),
        };
        self.state = State::Closed(sink);
        Ok(count)
    }

    /// Close then reopen a fresh stream on the same sink.
    pub fn reset(&mut self) -> Result<u64> {
        let count = self.close()?;
        self.open()?;
        Ok(count)
    }

    /// Consume the compressor, returning the bound sink. Errors if a
    /// stream is still open.
    pub fn into_sink(self) -> Result<W> {
        match self.state {
            State::Closed(sink) => Ok(sink),
            _ => Err(ArchiveError::Codec(
                "cannot reclaim sink while stream is open".to_string(),
            )),
        }
    }
}
