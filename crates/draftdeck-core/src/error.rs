//! Error types for Draftdeck.

use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum DraftdeckError {
    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Session limit exceeded: max {0} concurrent sessions")]
    SessionLimitExceeded(usize),

    #[error("Working directory does not exist: {0}")]
    InvalidWorkingDirectory(PathBuf),

    #[error("Process spawn failed: {0}")]
    ProcessSpawnFailed(String),

    #[error("PTY error: {0}")]
    PtyError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
