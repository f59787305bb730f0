//! Opaque continuation tokens.
//!
//! A token records where a progressive read stopped, so a later session over
//! the same document can resume at the next chunk. Encoding: JSON, zlib
//! compressed when that is smaller (marked by a prefix), base64url.

use crate::config::ReaderConfig;
use crate::document::SourceDocument;
use crate::error::{ReaderError, Result};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::io::{Read, Write};
use std::path::Path;

pub const TOKEN_VERSION: u32 = 1;

const MAX_TOKEN_BASE64_CHARS: usize = 8_192;
const MAX_TOKEN_JSON_BYTES: usize = 4_096;

const COMPRESSED_PREFIX_ZLIB_V1: &[u8] = b"PRZ1";

/// Saved read position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationToken {
    pub v: u32,
    /// Document name (usually its path) when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// First line of the next chunk (1-indexed)
    pub next_line: usize,
    /// Sequence index of the next chunk
    pub sequence: usize,
    /// Hex SHA-256 of the document content
    pub content_sha256: String,
    pub config_fingerprint: u64,
}

impl ContinuationToken {
    pub fn new(
        document: &SourceDocument,
        config: &ReaderConfig,
        next_line: usize,
        sequence: usize,
    ) -> Self {
        Self {
            v: TOKEN_VERSION,
            source: document.name().map(str::to_string),
            next_line,
            sequence,
            content_sha256: document.content_hash().to_string(),
            config_fingerprint: config.fingerprint(),
        }
    }

    /// Encode into an opaque URL-safe string
    pub fn encode(&self) -> Result<String> {
        let bytes = serde_json::to_vec(self).map_err(|e| ReaderError::invalid_token(e.to_string()))?;
        if bytes.len() > MAX_TOKEN_JSON_BYTES {
            return Err(ReaderError::invalid_token(format!(
                "payload too large ({} bytes)",
                bytes.len()
            )));
        }

        let compressed = compress_zlib(&bytes).unwrap_or_default();
        let payload = if !compressed.is_empty()
            && COMPRESSED_PREFIX_ZLIB_V1.len().saturating_add(compressed.len()) < bytes.len()
        {
            let mut out = Vec::with_capacity(COMPRESSED_PREFIX_ZLIB_V1.len() + compressed.len());
            out.extend_from_slice(COMPRESSED_PREFIX_ZLIB_V1);
            out.extend_from_slice(&compressed);
            out
        } else {
            bytes
        };

        Ok(URL_SAFE_NO_PAD.encode(payload))
    }

    /// Decode a token produced by [`ContinuationToken::encode`]
    pub fn decode(token: &str) -> Result<Self> {
        let token = token.trim();
        if token.is_empty() {
            return Err(ReaderError::invalid_token("token must not be empty"));
        }
        if token.len() > MAX_TOKEN_BASE64_CHARS {
            return Err(ReaderError::invalid_token("token too long"));
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(token.as_bytes())
            .map_err(|e| ReaderError::invalid_token(format!("not base64url: {e}")))?;
        if bytes.len() > MAX_TOKEN_JSON_BYTES {
            return Err(ReaderError::invalid_token(format!(
                "payload too large ({} bytes)",
                bytes.len()
            )));
        }

        let decoded = if bytes.starts_with(COMPRESSED_PREFIX_ZLIB_V1) {
            decompress_zlib_with_limit(
                &bytes[COMPRESSED_PREFIX_ZLIB_V1.len()..],
                MAX_TOKEN_JSON_BYTES,
            )?
        } else {
            bytes
        };

        let token: Self = serde_json::from_slice(&decoded)
            .map_err(|e| ReaderError::invalid_token(format!("malformed payload: {e}")))?;
        if token.v != TOKEN_VERSION {
            return Err(ReaderError::invalid_token(format!(
                "unsupported token version {}",
                token.v
            )));
        }
        Ok(token)
    }

    /// Check that the token belongs to `document` read under `config`
    pub fn validate(&self, document: &SourceDocument, config: &ReaderConfig) -> Result<()> {
        if self.content_sha256 != document.content_hash() {
            return Err(ReaderError::StaleToken);
        }
        if self.config_fingerprint != config.fingerprint() {
            return Err(ReaderError::invalid_token(
                "token was issued under a different chunking configuration",
            ));
        }
        if self.next_line == 0 || self.next_line > document.total_lines() + 1 {
            return Err(ReaderError::invalid_token(format!(
                "line {} is outside the document",
                self.next_line
            )));
        }
        Ok(())
    }

    /// Write the encoded token to `path` (temp file + rename)
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, self.encode()?)?;
        std::fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Read a token written by [`ContinuationToken::save_to`]
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => ReaderError::NotFound(path.to_path_buf()),
            _ => ReaderError::Io(e),
        })?;
        Self::decode(&text)
    }
}

fn compress_zlib(bytes: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(bytes)?;
    encoder.finish()
}

fn decompress_zlib_with_limit(bytes: &[u8], max_len: usize) -> Result<Vec<u8>> {
    let decoder = ZlibDecoder::new(bytes);
    let mut out = Vec::new();
    decoder
        .take(max_len.saturating_add(1) as u64)
        .read_to_end(&mut out)
        .map_err(|e| ReaderError::invalid_token(format!("corrupt compressed payload: {e}")))?;
    if out.len() > max_len {
        return Err(ReaderError::invalid_token(format!(
            "payload too large ({} bytes)",
            out.len()
        )));
    }
    Ok(out)
}
