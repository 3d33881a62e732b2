//! Terminal output parsing and PTY session hosting for Draftdeck.

mod ansi;
mod emitter;
mod error;
mod osc7;
mod parser;
mod process;
mod recognizers;
mod session;
mod transcript;

pub use ansi::strip_ansi_codes;
pub use emitter::{EventEmitter, Listener, Subscription};
pub use error::DraftdeckError;
pub use osc7::{decode_uri_component, CwdTracker};
pub use parser::OutputParser;
pub use process::{ProcessEvent, ProcessManager, SpawnOptions, Utf8Stream};
pub use recognizers::{
    component_name, recognize_component, recognize_cwd_change, recognize_file_change,
    recognize_line, recognize_session_id, recognize_token_cost, NamedRecognizer, Recognizer,
    RECOGNIZERS,
};
pub use session::{CreateSessionOptions, SessionManager, SessionManagerConfig};
pub use transcript::{replay, replay_bytes, replay_file};

/// Result type for Draftdeck operations.
pub type Result<T> = std::result::Result<T, DraftdeckError>;
