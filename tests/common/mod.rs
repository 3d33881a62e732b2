//! Common test utilities for transcript fixtures.

use std::path::PathBuf;

/// Path of a captured transcript under `tests/fixtures/transcripts`.
pub fn transcript_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("tests")
        .join("fixtures")
        .join("transcripts")
        .join(format!("{}.txt", name))
}

/// Load a captured transcript as raw bytes.
pub fn load_transcript(name: &str) -> Vec<u8> {
    let path = transcript_path(name);
    std::fs::read(&path)
        .unwrap_or_else(|e| panic!("Failed to read fixture {}: {}", path.display(), e))
}

/// Canonical, order-independent form of an event list.
pub fn sorted_json<T: serde::Serialize>(events: &[T]) -> Vec<String> {
    let mut out: Vec<String> = events
        .iter()
        .map(|e| serde_json::to_string(e).expect("event serializes"))
        .collect();
    out.sort();
    out
}
