//! Splits BED text lines into `(chromosome, start, stop, remainder, kind)`.
//!
//! Two entry points exist: [`tokenize_line`] is the convenience,
//! owned-`String` form used by tests and by callers that already hold a
//! `String`. [`tokenize_into`] is the buffer-reusing, zero-allocation
//! variant: the caller owns two growable `Vec<u8>` buffers (chromosome,
//! remainder) that are cleared and refilled per line instead of
//! reallocated.

use crate::config::{CHR_MAX, HEADER_CHR_MAX, ID_MAX, MAX_COORD_VALUE, MAX_DEC_INTEGERS, REST_MAX};
use crate::error::{ArchiveError, Result};

/// The kind of a BED line, determined entirely by its leading bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Coordinates,
    HeaderTrack,
    HeaderBrowser,
    HeaderSAM,
    HeaderVCF,
    GenericComment,
}

impl LineKind {
    /// Classify a line by its chromosome-field prefix.
    #[inline]
    pub fn classify(bytes: &[u8]) -> LineKind {
        if bytes.starts_with(b"track ") || bytes == b"track" {
            LineKind::HeaderTrack
        } else if bytes.starts_with(b"browser ") || bytes == b"browser" {
            LineKind::HeaderBrowser
        } else if bytes.starts_with(b"##") {
            LineKind::HeaderVCF
        } else if bytes.starts_with(b"@") {
            LineKind::HeaderSAM
        } else if bytes.starts_with(b"#") {
            LineKind::GenericComment
        } else {
            LineKind::Coordinates
        }
    }

    #[inline]
    pub fn is_coordinate(&self) -> bool {
        matches!(self, LineKind::Coordinates)
    }
}

/// An owned, ephemeral BED line as produced by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BedLine {
    pub chromosome: String,
    pub start: i64,
    pub stop: i64,
    pub remainder: String,
    pub kind: LineKind,
}

/// Borrowed view into a line, produced by [`tokenize_into`] without any
/// per-line heap allocation.
#[derive(Debug)]
pub struct TokenizedLine<'a> {
    pub kind: LineKind,
    pub chromosome: &'a [u8],
    pub start: i64,
    pub stop: i64,
    pub remainder: &'a [u8],
}

/// Tokenize a single line (without its trailing newline) into a [`BedLine`].
pub fn tokenize_line(line: &str, line_no: usize) -> Result<BedLine> {
    let bytes = line.as_bytes();
    let kind = LineKind::classify(bytes);

    if !kind.is_coordinate() {
        if bytes.len() > HEADER_CHR_MAX {
            return Err(ArchiveError::InputMalformed {
                line: line_no,
                message: format!(
                    "header/comment line length {} exceeds {}",
                    bytes.len(),
                    HEADER_CHR_MAX
                ),
            });
        }
        return Ok(BedLine {
            chromosome: line.to_string(),
            start: 0,
            stop: 0,
            remainder: String::new(),
            kind,
        });
    }

    let mut fields = line.split('\t');
    let chrom = fields.next().filter(|s| !s.is_empty()).ok_or_else(|| {
        ArchiveError::InputMalformed {
            line: line_no,
            message: "missing chromosome field".to_string(),
        }
    })?;
    if chrom.len() > CHR_MAX {
        return Err(ArchiveError::InputMalformed {
            line: line_no,
            message: format!("chromosome '{chrom}' exceeds {CHR_MAX} characters"),
        });
    }

    let start_field = fields.next();
    let stop_field = fields.next();
    if start_field.is_none() && stop_field.is_none() {
        return Err(ArchiveError::InputMalformed {
            line: line_no,
            message: "missing start and stop coordinates".to_string(),
        });
    }
    let start = parse_coord(start_field.unwrap_or(""), "start", line_no)?;
    let stop = parse_coord(stop_field.unwrap_or(""), "stop", line_no)?;

    let rest_fields: Vec<&str> = fields.collect();
    let remainder = rest_fields.join("\t");
    validate_remainder(&remainder, line_no)?;

    Ok(BedLine {
        chromosome: chrom.to_string(),
        start,
        stop,
        remainder,
        kind,
    })
}

/// Tokenize a single line into borrowed buffers, avoiding per-line
/// allocation. `chrom_buf` and `rest_buf` are cleared and refilled; their
/// capacity is retained across calls, doubling only when a line overflows
/// current capacity (handled automatically by `Vec::extend_from_slice`).
pub fn tokenize_into<'a>(
    line: &[u8],
    line_no: usize,
    chrom_buf: &'a mut Vec<u8>,
    rest_buf: &'a mut Vec<u8>,
) -> Result<TokenizedLine<'a>> {
    chrom_buf.clear();
    rest_buf.clear();

    let kind = LineKind::classify(line);

    if !kind.is_coordinate() {
        if line.len() > HEADER_CHR_MAX {
            return Err(ArchiveError::InputMalformed {
                line: line_no,
                message: format!(
                    "header/comment line length {} exceeds {}",
                    line.len(),
                    HEADER_CHR_MAX
                ),
            });
        }
        chrom_buf.extend_from_slice(line);
        return Ok(TokenizedLine {
            kind,
            chromosome: chrom_buf.as_slice(),
            start: 0,
            stop: 0,
            remainder: &[],
        });
    }

    let tab1 = memchr::memchr(b'\t', line).ok_or_else(|| ArchiveError::InputMalformed {
        line: line_no,
        message: "missing start and stop coordinates".to_string(),
    })?;
    let chrom = &line[..tab1];
    if chrom.is_empty() {
        return Err(ArchiveError::InputMalformed {
            line: line_no,
            message: "missing chromosome field".to_string(),
        });
    }
    if chrom.len() > CHR_MAX {
        return Err(ArchiveError::InputMalformed {
            line: line_no,
            message: format!("chromosome exceeds {CHR_MAX} characters"),
        });
    }

    let rest1 = &line[tab1 + 1..];
    let tab2 = memchr::memchr(b'\t', rest1).ok_or_else(|| ArchiveError::InputMalformed {
        line: line_no,
        message: "missing stop coordinate".to_string(),
    })?;
    let start_bytes = &rest1[..tab2];
    let rest2 = &rest1[tab2 + 1..];
    let tab3 = memchr::memchr(b'\t', rest2);
    let (stop_bytes, rest_bytes) = match tab3 {
        Some(idx) => (&rest2[..idx], &rest2[idx + 1..]),
        None => (rest2, &rest2[rest2.len()..]),
    };

    let start = parse_coord_bytes(start_bytes, "start", line_no)?;
    let stop = parse_coord_bytes(stop_bytes, "stop", line_no)?;

    rest_buf.extend_from_slice(rest_bytes);
    validate_remainder_bytes(rest_buf, line_no)?;

    chrom_buf.extend_from_slice(chrom);

    Ok(TokenizedLine {
        kind,
        chromosome: chrom_buf.as_slice(),
        start,
        stop,
        remainder: rest_buf.as_slice(),
    })
}

fn parse_coord(field: &str, name: &str, line_no: usize) -> Result<i64> {
    parse_coord_bytes(field.as_bytes(), name, line_no)
}

fn parse_coord_bytes(field: &[u8], name: &str, line_no: usize) -> Result<i64> {
    if field.is_empty() {
        return Err(ArchiveError::InputMalformed {
            line: line_no,
            message: format!("missing {name} coordinate"),
        });
    }
    if field.len() > MAX_DEC_INTEGERS {
        return Err(ArchiveError::InputMalformed {
            line: line_no,
            message: format!(
                "{name} field has {} digits, exceeds {MAX_DEC_INTEGERS}",
                field.len()
            ),
        });
    }
    let s = std::str::from_utf8(field).map_err(|_| ArchiveError::InputMalformed {
        line: line_no,
        message: format!("{name} field is not valid UTF-8"),
    })?;
    let value: i64 = s.parse().map_err(|_| ArchiveError::InputMalformed {
        line: line_no,
        message: format!("invalid {name} value '{s}'"),
    })?;
    if value < 0 || value > MAX_COORD_VALUE {
        return Err(ArchiveError::InputMalformed {
            line: line_no,
            message: format!("{name} value {value} out of range"),
        });
    }
    Ok(value)
}

fn validate_remainder(remainder: &str, line_no: usize) -> Result<()> {
    validate_remainder_bytes(remainder.as_bytes(), line_no)
}

fn validate_remainder_bytes(remainder: &[u8], line_no: usize) -> Result<()> {
    if remainder.len() > REST_MAX {
        return Err(ArchiveError::InputMalformed {
            line: line_no,
            message: format!("remainder length {} exceeds {REST_MAX}", remainder.len()),
        });
    }
    let id_len = memchr::memchr(b'\t', remainder).unwrap_or(remainder.len());
    if id_len > ID_MAX {
        return Err(ArchiveError::InputMalformed {
            line: line_no,
            message: format!("id field length {id_len} exceeds {ID_MAX}"),
        });
    }
    Ok(())
}
