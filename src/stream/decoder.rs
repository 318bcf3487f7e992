use thiserror::Error;

use crate::models::StreamEvent;

/// Upper bound on a single buffered line before it is dropped.
pub const MAX_LINE_BYTES: usize = 8 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("stream line is not valid UTF-8: {source}")] Utf8 {
        line: String,
        #[source]
        source: std::str::Utf8Error,
    },

    #[error("malformed stream line {line:?}: {source}")] Json {
        line: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("stream line exceeded {limit} bytes and was dropped")] Oversized {
        limit: usize,
    },
}

/// Splits a chunked NDJSON body into events.
///
/// Bytes are accumulated in a carry-over buffer, so neither a JSON line nor a
/// multi-byte character has to arrive within a single chunk. Only complete
/// lines are decoded; the unterminated tail waits for the next `push` or for
/// `finish`.
#[derive(Debug)]
pub struct LineDecoder {
    carry: Vec<u8>,
    // Prefix of `carry` already known to hold no '\n'.
    scanned: usize,
    max_line_bytes: usize,
    // Set after an oversized line was dropped; the rest of it is skipped up to the next '\n'.
    discarding: bool,
}

impl Default for LineDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl LineDecoder {
    pub fn new() -> Self {
        Self::with_max_line_bytes(MAX_LINE_BYTES)
    }

    pub fn with_max_line_bytes(max_line_bytes: usize) -> Self {
        Self {
            carry: Vec::new(),
            scanned: 0,
            max_line_bytes: max_line_bytes.max(1),
            discarding: false,
        }
    }

    /// Bytes held back waiting for a line terminator.
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    pub fn push(&mut self, chunk: &[u8]) -> Vec<Result<StreamEvent, DecodeError>> {
        self.carry.extend_from_slice(chunk);

        let mut decoded = Vec::new();
        let mut start = 0;
        let mut from = self.scanned;
        while let Some(offset) = self.carry[from..].iter().position(|&b| b == b'\n') {
            let end = from + offset;
            if self.discarding {
                self.discarding = false;
            } else if end - start > self.max_line_bytes {
                decoded.push(Err(DecodeError::Oversized { limit: self.max_line_bytes }));
            } else if let Some(result) = decode_line(&self.carry[start..end]) {
                decoded.push(result);
            }
            start = end + 1;
            from = start;
        }
        self.carry.drain(..start);
        self.scanned = self.carry.len();

        if self.carry.len() > self.max_line_bytes {
            self.carry.clear();
            self.scanned = 0;
            if !self.discarding {
                self.discarding = true;
                decoded.push(Err(DecodeError::Oversized { limit: self.max_line_bytes }));
            }
        }

        decoded
    }

    /// Flushes the tail at end of stream. A final line without `\n` still decodes.
    pub fn finish(&mut self) -> Option<Result<StreamEvent, DecodeError>> {
        let tail = std::mem::take(&mut self.carry);
        self.scanned = 0;
        if std::mem::take(&mut self.discarding) {
            return None;
        }
        decode_line(&tail)
    }
}

fn decode_line(raw: &[u8]) -> Option<Result<StreamEvent, DecodeError>> {
    let text = match std::str::from_utf8(raw) {
        Ok(text) => text,
        Err(source) => {
            return Some(
                Err(DecodeError::Utf8 {
                    line: String::from_utf8_lossy(raw).into_owned(),
                    source,
                })
            );
        }
    };

    let line = text.trim();
    if line.is_empty() {
        return None;
    }

    Some(
        serde_json::from_str::<StreamEvent>(line).map_err(|source| DecodeError::Json {
            line: line.to_string(),
            source,
        })
    )
}
