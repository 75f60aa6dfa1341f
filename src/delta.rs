//! Forward delta transform: per-chromosome run-length-marked text stream.
//!
//! One [`DeltaEncoder`] is created per open chromosome and fed coordinate
//! lines in input order. It owns the two running state variables the
//! transform needs (`last_stop`, `last_interval_length`) plus the running
//! base-count accumulators the Archive Writer needs for the chromosome's
//! metadata record.

use crate::error::{ArchiveError, Result};

/// Per-chromosome forward delta encoder.
#[derive(Debug)]
pub struct DeltaEncoder {
    last_stop: i64,
    last_interval_length: i64,
    previous_stop: i64,
    pending_header: Vec<u8>,
    itoa_buf: itoa::Buffer,
    pub line_count: u64,
    pub non_unique_bases: u64,
    pub unique_bases: u64,
}

impl Default for DeltaEncoder {
    fn default() -> Self {
        Self {
            last_stop: 0,
            last_interval_length: 0,
            previous_stop: 0,
            pending_header: Vec::new(),
            itoa_buf: itoa::Buffer::new(),
            line_count: 0,
            non_unique_bases: 0,
            unique_bases: 0,
        }
    }
}

impl DeltaEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a non-coordinate (header/comment) line for this chromosome.
    /// It is flushed verbatim, newline-terminated, immediately before the
    /// next coordinate line is encoded.
    pub fn push_header_line(&mut self, text: &str) {
        self.pending_header.extend_from_slice(text.as_bytes());
        self.pending_header.push(b'\n');
    }

    /// Encode one coordinate line into `out`, appending bytes only (no
    /// truncation of prior content).
    pub fn encode_line(
        &mut self,
        start: i64,
        stop: i64,
        remainder: &str,
        line_no: usize,
        out: &mut Vec<u8>,
    ) -> Result<()> {
        if stop <= start {
            return Err(ArchiveError::InputCorrupt {
                line: line_no,
                message: format!("stop ({stop}) <= start ({start})"),
            });
        }
        if start < 0 {
            return Err(ArchiveError::InputCorrupt {
                line: line_no,
                message: format!("negative start ({start})"),
            });
        }

        if !self.pending_header.is_empty() {
            out.extend_from_slice(&self.pending_header);
            self.pending_header.clear();
        }

        let length = stop - start;
        if length != self.last_interval_length {
            out.push(b'p');
            out.extend_from_slice(self.itoa_buf.format(length).as_bytes());
            out.push(b'\n');
            self.last_interval_length = length;
        }

        let delta = if self.last_stop == 0 { start } else { start - self.last_stop };
        out.extend_from_slice(self.itoa_buf.format(delta).as_bytes());
        if !remainder.is_empty() {
            out.push(b'\t');
            out.extend_from_slice(remainder.as_bytes());
        }
        out.push(b'\n');

        self.non_unique_bases += length as u64;
        if self.previous_stop <= start {
            self.unique_bases += length as u64;
        } else if self.previous_stop < stop {
            self.unique_bases += (stop - self.previous_stop) as u64;
        }
        self.previous_stop = self.previous_stop.max(stop);
        self.last_stop = stop;
        self.line_count += 1;

        Ok(())
    }
}
