//! Offline replay of captured terminal transcripts through the parser.

use crate::process::Utf8Stream;
use crate::{OutputParser, Result};
use draftdeck_types::ParsedEvent;
use std::path::Path;
use tracing::debug;

/// Parse a transcript fed in chunks of `chunk_size` bytes (0 means one chunk).
pub fn replay(text: &str, chunk_size: usize) -> Vec<ParsedEvent> {
    replay_bytes(text.as_bytes(), chunk_size)
}

/// Like [`replay`], for raw captured bytes. Chunks may split characters.
pub fn replay_bytes(bytes: &[u8], chunk_size: usize) -> Vec<ParsedEvent> {
    let mut parser = OutputParser::new();
    let mut decoder = Utf8Stream::new();

    if chunk_size == 0 {
        return parser.feed(&decoder.decode(bytes));
    }

    let mut events = Vec::new();
    for chunk in bytes.chunks(chunk_size) {
        events.extend(parser.feed(&decoder.decode(chunk)));
    }
    events
}

/// Replay a transcript file.
pub fn replay_file(path: &Path, chunk_size: usize) -> Result<Vec<ParsedEvent>> {
    let bytes = std::fs::read(path)?;
    debug!(
        target: "draftdeck::parser",
        "Replaying {} bytes from {:?} in chunks of {}",
        bytes.len(),
        path,
        chunk_size
    );
    Ok(replay_bytes(&bytes, chunk_size))
}
