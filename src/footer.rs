//! Revision-2 archive envelope: magic prefix and 128-byte signed footer.

use crate::error::{ArchiveError, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use sha1::{Digest, Sha1};

/// 4-byte magic prefix identifying a revision-2 archive.
pub const MAGIC: [u8; 4] = [0xCA, 0x5C, 0xAD, 0xE5];

/// Fixed size of the revision-2 footer trailer.
pub const FOOTER_LEN: usize = 128;
const OFFSET_LEN: usize = 20;
const DIGEST_LEN: usize = 28;
const FILLER_BYTE: u8 = b' ';

/// SHA-1 digest of a byte slice, returned as its standard Base64 (with
/// padding) encoding, the form embedded in the footer.
pub fn sha1_base64(bytes: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(bytes);
    BASE64.encode(hasher.finalize())
}

/// The 128-byte trailer written after the metadata JSON in a revision-2
/// archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Footer {
    /// Byte offset (from byte 0, i.e. including the 4-byte magic) at
    /// which the metadata JSON begins.
    pub offset: u64,
    /// Base64 encoding (with trailing `=`) of `SHA1(metadata_json_bytes)`.
    pub digest_b64: String,
}

impl Footer {
    pub fn new(offset: u64, digest_b64: impl Into<String>) -> Self {
        Self {
            offset,
            digest_b64: digest_b64.into(),
        }
    }

    pub fn encode(&self) -> [u8; FOOTER_LEN] {
        let mut buf = [FILLER_BYTE; FOOTER_LEN];
        let offset_str = format!("{:0>width$}", self.offset, width = OFFSET_LEN);
        buf[0..OFFSET_LEN].copy_from_slice(offset_str.as_bytes());

        let mut digest_bytes = [FILLER_BYTE; DIGEST_LEN];
        let digest_slice = self.digest_b64.as_bytes();
        let copy_len = digest_slice.len().min(DIGEST_LEN);
        digest_bytes[..copy_len].copy_from_slice(&digest_slice[..copy_len]);
        buf[OFFSET_LEN..OFFSET_LEN + DIGEST_LEN].copy_from_slice(&digest_bytes);

        buf[FOOTER_LEN - 2] = b'\n';
        buf[FOOTER_LEN - 1] = b'\0';
        buf
    }

    pub fn decode(buf: &[u8; FOOTER_LEN]) -> Result<Footer> {
        let offset_str = std::str::from_utf8(&buf[0..OFFSET_LEN]).map_err(|_| {
            ArchiveError::Codec("footer offset is not valid UTF-8".to_string())
        })?;
        let offset: u64 = offset_str
            .trim_start_matches('0')
            .parse()
            .or_else(|_| {
                if offset_str.chars().all(|c| c == '0') {
                    Ok(0)
                } else {
                    Err(())
                }
            })
            .map_err(|_| ArchiveError::Codec(format!("malformed footer offset '{offset_str}'")))?;

        let digest_b64 = std::str::from_utf8(&buf[OFFSET_LEN..OFFSET_LEN + DIGEST_LEN])
            .map_err(|_| ArchiveError::Codec("footer digest is not valid UTF-8".to_string()))?
            .to_string();

        if buf[FOOTER_LEN - 2] != b'\n' || buf[FOOTER_LEN - 1] != b'\0' {
            return Err(ArchiveError::Codec(
                "footer is missing its terminator bytes".to_string(),
            ));
        }

        Ok(Footer { offset, digest_b64 })
    }
}
