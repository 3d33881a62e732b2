//! Terminal session records and the event fold that keeps them current.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

use crate::ParsedEvent;

/// Session status in the lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// PTY is being opened and the command spawned.
    Starting,
    /// Command is running and output is being parsed.
    Active,
    /// Command exited (or was terminated).
    Exited,
    /// Session encountered an error.
    Error,
}

impl SessionStatus {
    pub fn is_live(&self) -> bool {
        matches!(self, SessionStatus::Starting | SessionStatus::Active)
    }
}

/// A UI component source file seen in terminal output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentRef {
    pub path: String,
    pub name: String,
}

/// A terminal session hosting an agent CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TerminalSession {
    /// Our internal session ID.
    pub id: Uuid,
    /// Program spawned inside the PTY.
    pub command: PathBuf,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Last known working directory.
    pub cwd: PathBuf,
    /// Current status.
    pub status: SessionStatus,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// Last time output produced an event.
    pub last_activity_at: DateTime<Utc>,
    /// Session identifier the agent printed, if any.
    pub agent_session_id: Option<String>,
    /// Last reported token count.
    pub tokens: Option<u64>,
    /// Last reported cost in USD.
    pub cost: Option<f64>,
    /// Files the agent touched, in first-seen order.
    #[serde(default)]
    pub changed_files: Vec<String>,
    /// Components mentioned, in first-seen order.
    #[serde(default)]
    pub components: Vec<ComponentRef>,
    /// Exit code once the command has exited.
    pub exit_code: Option<i32>,
}

impl TerminalSession {
    pub fn new(id: Uuid, command: PathBuf, args: Vec<String>, cwd: PathBuf) -> Self {
        let now = Utc::now();
        Self {
            id,
            command,
            args,
            cwd,
            status: SessionStatus::Starting,
            created_at: now,
            last_activity_at: now,
            agent_session_id: None,
            tokens: None,
            cost: None,
            changed_files: Vec::new(),
            components: Vec::new(),
            exit_code: None,
        }
    }

    /// Fold a parsed event into this record.
    pub fn apply_event(&mut self, event: &ParsedEvent) {
        match event {
            ParsedEvent::FileChanged { path } => {
                if !self.changed_files.iter().any(|p| p == path) {
                    self.changed_files.push(path.clone());
                }
            }
            ParsedEvent::SessionId { session_id } => {
                self.agent_session_id = Some(session_id.clone());
            }
            ParsedEvent::TokenCost { tokens, cost } => {
                if tokens.is_some() {
                    self.tokens = *tokens;
                }
                if cost.is_some() {
                    self.cost = *cost;
                }
            }
            ParsedEvent::ComponentFound { path, name } => {
                if !self.components.iter().any(|c| &c.path == path) {
                    self.components.push(ComponentRef {
                        path: path.clone(),
                        name: name.clone(),
                    });
                }
            }
            ParsedEvent::CwdChanged { dir } => {
                self.cwd = PathBuf::from(dir);
            }
        }
        self.last_activity_at = Utc::now();
    }

    /// Mark the session as exited.
    pub fn mark_exited(&mut self, exit_code: Option<i32>) {
        self.status = SessionStatus::Exited;
        self.exit_code = exit_code;
        self.last_activity_at = Utc::now();
    }
}

/// Summary view of a session for listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub command: PathBuf,
    pub cwd: PathBuf,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

impl From<&TerminalSession> for SessionSummary {
    fn from(s: &TerminalSession) -> Self {
        Self {
            id: s.id,
            command: s.command.clone(),
            cwd: s.cwd.clone(),
            status: s.status,
            created_at: s.created_at,
            cost: s.cost,
        }
    }
}
