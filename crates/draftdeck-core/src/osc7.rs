//! Out-of-band working directory tracking (OSC 7).
//!
//! Shells report their working directory with
//! `ESC ] 7 ; file://<host><path>` terminated by BEL or `ESC \`. The sequence
//! is scanned on the raw stream, before line reassembly and stripping, since
//! it is rarely newline-bounded and stripping would discard it.

use once_cell::sync::Lazy;
use percent_encoding::percent_decode_str;
use regex::Regex;
use tracing::{debug, trace};

/// Introducer for the sequences this tracker cares about.
const OSC7_PREFIX: &str = "\x1b]7;";

/// Largest unterminated tail carried into the next scan.
const MAX_PENDING_BYTES: usize = 4 * 1024;

/// `ESC ] 7 ; file://host/path (BEL | ESC \)`. Group 1 is the path.
static OSC7_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\]7;file://[^/\x07\x1b]*(/[^\x07\x1b]*)(?:\x07|\x1b\\)")
        .expect("Invalid OSC 7 regex")
});

/// Scans raw output for OSC 7 directory notifications.
#[derive(Debug, Default, Clone)]
pub struct CwdTracker {
    /// Unterminated sequence held over from the previous chunk.
    pending: String,
}

impl CwdTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Scan a raw chunk, returning every decoded directory in order of appearance.
    pub fn scan(&mut self, chunk: &str) -> Vec<String> {
        if chunk.is_empty() {
            return Vec::new();
        }

        let mut text = std::mem::take(&mut self.pending);
        text.push_str(chunk);

        let mut dirs = Vec::new();
        let mut consumed = 0;
        for caps in OSC7_RE.captures_iter(&text) {
            let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            consumed = whole.end();
            match decode_uri_component(path.as_str()) {
                Some(dir) => {
                    trace!(target: "draftdeck::osc7", "Directory notification: {}", dir);
                    dirs.push(dir);
                }
                None => {
                    debug!(target: "draftdeck::osc7", "Discarding malformed OSC 7 path: {:?}", path.as_str());
                }
            }
        }

        self.pending = unterminated_tail(&text[consumed..]).to_string();
        dirs
    }

    /// Drop any carried-over partial sequence.
    pub fn reset(&mut self) {
        self.pending.clear();
    }

    #[cfg(test)]
    fn pending(&self) -> &str {
        &self.pending
    }
}

/// Find a trailing OSC 7 sequence that may complete in the next chunk.
fn unterminated_tail(rest: &str) -> &str {
    if let Some(start) = rest.rfind(OSC7_PREFIX) {
        let tail = &rest[start..];
        let body = &tail[OSC7_PREFIX.len()..];
        let terminated = body.contains('\x07') || body.contains("\x1b\\");
        // A lone trailing ESC may be the first half of ST.
        if !terminated && !body.trim_end_matches('\x1b').contains('\x1b') {
            if tail.len() <= MAX_PENDING_BYTES {
                return tail;
            }
            debug!(target: "draftdeck::osc7", "Dropping oversized unterminated OSC 7 ({} bytes)", tail.len());
            return "";
        }
    }

    // The chunk may end partway through the introducer itself.
    (1..OSC7_PREFIX.len())
        .rev()
        .map(|n| &OSC7_PREFIX[..n])
        .find(|prefix| rest.ends_with(prefix))
        .map(|prefix| &rest[rest.len() - prefix.len()..])
        .unwrap_or("")
}

/// Strict URI component decoding.
///
/// Returns `None` when a `%` is not followed by two hex digits or when the
/// decoded bytes are not valid UTF-8.
pub fn decode_uri_component(input: &str) -> Option<String> {
    let bytes = input.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let valid = bytes
                .get(i + 1..i + 3)
                .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
            if !valid {
                return None;
            }
            i += 3;
        } else {
            i += 1;
        }
    }

    percent_decode_str(input)
        .decode_utf8()
        .ok()
        .map(|decoded| decoded.into_owned())
}
