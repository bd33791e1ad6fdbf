//! Response unit framing
//!
//! A device answers either with a single bare line or with a block of lines
//! wrapped in marker lines:
//! ```text
//! BEGIN
//! DST 1 ADDR:239.192.0.1 NAME:"Out 1"
//! DST 2 ADDR:239.192.0.2 NAME:"Out 2"
//! END
//! VER LWRP:1.0 DEVN:Node
//! ```
//! TCP delivers these bytes in arbitrary pieces. [`BlockFramer`] keeps the
//! incomplete trailing line and any open block between deliveries and only
//! emits a unit once it is complete.

use bytes::{Buf, BytesMut};
use tracing::{debug, warn};

use crate::{BLOCK_BEGIN, BLOCK_END, DEFAULT_MAX_PENDING};

/// One logical response: the lines of a block, or a single bare line
pub type ResponseUnit = Vec<String>;

#[derive(Debug, Default)]
enum Block {
    #[default]
    Closed,
    Open { lines: ResponseUnit, bytes: usize },
    /// Over the limit; lines are dropped until the next `END`
    Discarding,
}

/// Incremental byte stream to response unit framer
#[derive(Debug)]
pub struct BlockFramer {
    /// Bytes of a line whose terminator has not arrived yet
    partial: BytesMut,
    /// Rest of an oversized line is dropped up to its terminator
    skip_line: bool,
    block: Block,
    /// Cap on buffered bytes, for the partial line and the open block each
    max_pending: usize,
}

impl Default for BlockFramer {
    fn default() -> Self {
        Self::with_limit(DEFAULT_MAX_PENDING)
    }
}

impl BlockFramer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_pending: usize) -> Self {
        Self {
            partial: BytesMut::new(),
            skip_line: false,
            block: Block::Closed,
            max_pending,
        }
    }

    /// Feed received bytes, returning every unit completed by them
    pub fn push(&mut self, data: &[u8]) -> Vec<ResponseUnit> {
        let mut units = Vec::new();
        self.partial.extend_from_slice(data);

        while let Some(pos) = self.partial.iter().position(|b| *b == b'\n') {
            let line = self.partial.split_to(pos);
            self.partial.advance(1);

            if std::mem::take(&mut self.skip_line) {
                continue;
            }

            let line = line.strip_suffix(b"\r").unwrap_or(&line[..]);
            if line.is_empty() {
                continue;
            }

            let line = decode_latin1(line);
            debug!("Received line: {}", line);
            if let Some(unit) = self.accept(line) {
                units.push(unit);
            }
        }

        if self.partial.len() > self.max_pending {
            warn!(
                "Dropping unterminated line of {} bytes (limit {})",
                self.partial.len(),
                self.max_pending
            );
            self.partial.clear();
            self.skip_line = true;
        }

        units
    }

    /// Number of complete lines waiting for a closing `END`, marker included
    pub fn pending_lines(&self) -> usize {
        match &self.block {
            Block::Open { lines, .. } => lines.len() + 1,
            _ => 0,
        }
    }

    /// Whether an unterminated line is buffered
    pub fn has_partial_line(&self) -> bool {
        !self.partial.is_empty()
    }

    /// Drop everything buffered
    pub fn reset(&mut self) {
        self.partial.clear();
        self.skip_line = false;
        self.block = Block::Closed;
    }

    /// Place one complete line, returning the unit it finishes
    fn accept(&mut self, line: String) -> Option<ResponseUnit> {
        if line == BLOCK_BEGIN {
            if matches!(self.block, Block::Closed) {
                self.block = Block::Open {
                    lines: Vec::new(),
                    bytes: 0,
                };
            }
            return None;
        }

        if line == BLOCK_END {
            return match std::mem::take(&mut self.block) {
                Block::Open { lines, .. } if !lines.is_empty() => Some(lines),
                Block::Open { .. } => {
                    debug!("Empty block");
                    None
                }
                Block::Discarding => None,
                Block::Closed => {
                    debug!("END without BEGIN");
                    None
                }
            };
        }

        match &mut self.block {
            Block::Closed => Some(vec![line]),
            Block::Discarding => None,
            Block::Open { lines, bytes } => {
                *bytes += line.len();
                if *bytes > self.max_pending {
                    warn!(
                        "Dropping response block of {} lines (limit {} bytes)",
                        lines.len() + 1,
                        self.max_pending
                    );
                    self.block = Block::Discarding;
                } else {
                    lines.push(line);
                }
                None
            }
        }
    }
}

/// Latin-1: every byte is the code point of the same value
pub fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}
