//! Structured events derived from agent terminal output.

use serde::{Deserialize, Serialize};

/// An event recognized in the output of an agent CLI session.
///
/// Serialized as `{"type": "<tag>", "data": {...}}` so UI bridges can forward
/// it verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "kebab-case")]
pub enum ParsedEvent {
    /// The agent wrote or edited a file.
    FileChanged { path: String },
    /// The agent announced its session identifier.
    #[serde(rename_all = "camelCase")]
    SessionId { session_id: String },
    /// Token and/or cost telemetry. At least one field is always present.
    TokenCost {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        tokens: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        cost: Option<f64>,
    },
    /// A UI component source file was mentioned.
    ComponentFound {
        path: String,
        /// PascalCase display name derived from the file name.
        name: String,
    },
    /// The working directory changed (OSC 7, worktree banner, or bare path line).
    CwdChanged { dir: String },
}

/// Tag-only view of a [`ParsedEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    FileChanged,
    SessionId,
    TokenCost,
    ComponentFound,
    CwdChanged,
}

impl EventKind {
    /// Wire tag for this kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::FileChanged => "file-changed",
            EventKind::SessionId => "session-id",
            EventKind::TokenCost => "token-cost",
            EventKind::ComponentFound => "component-found",
            EventKind::CwdChanged => "cwd-changed",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ParsedEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ParsedEvent::FileChanged { .. } => EventKind::FileChanged,
            ParsedEvent::SessionId { .. } => EventKind::SessionId,
            ParsedEvent::TokenCost { .. } => EventKind::TokenCost,
            ParsedEvent::ComponentFound { .. } => EventKind::ComponentFound,
            ParsedEvent::CwdChanged { .. } => EventKind::CwdChanged,
        }
    }

    pub fn file_changed(path: impl Into<String>) -> Self {
        ParsedEvent::FileChanged { path: path.into() }
    }

    pub fn session_id(session_id: impl Into<String>) -> Self {
        ParsedEvent::SessionId {
            session_id: session_id.into(),
        }
    }

    pub fn cwd_changed(dir: impl Into<String>) -> Self {
        ParsedEvent::CwdChanged { dir: dir.into() }
    }
}
