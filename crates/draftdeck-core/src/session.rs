//! Session manager orchestrating PTY processes and live session records.

use crate::{
    DraftdeckError, EventEmitter, ProcessEvent, ProcessManager, Result, SpawnOptions, Subscription,
};
use dashmap::DashMap;
use draftdeck_types::{ParsedEvent, SessionStatus, SessionSummary, TerminalSession};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Configuration for the session manager.
#[derive(Debug, Clone)]
pub struct SessionManagerConfig {
    /// Program spawned when a request names none.
    pub shell: PathBuf,
    pub default_args: Vec<String>,
    pub default_cwd: PathBuf,
    pub max_concurrent_sessions: usize,
    pub rows: u16,
    pub cols: u16,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            shell: std::env::var_os("SHELL")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/bin/sh")),
            default_args: Vec::new(),
            default_cwd: dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")),
            max_concurrent_sessions: 8,
            rows: 24,
            cols: 80,
        }
    }
}

/// Options for creating a new session. Unset fields fall back to the config.
#[derive(Debug, Clone, Default)]
pub struct CreateSessionOptions {
    pub command: Option<PathBuf>,
    pub args: Option<Vec<String>>,
    pub cwd: Option<PathBuf>,
    pub rows: Option<u16>,
    pub cols: Option<u16>,
}

/// Manages terminal sessions.
pub struct SessionManager {
    config: SessionManagerConfig,
    process_manager: Arc<ProcessManager>,
    event_tx: broadcast::Sender<ProcessEvent>,
    sessions: Arc<DashMap<Uuid, TerminalSession>>,
    /// Serializes the limit check with the insert that claims the slot.
    reserve_lock: Mutex<()>,
}

impl SessionManager {
    pub fn new(config: SessionManagerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(256);
        Self {
            config,
            process_manager: Arc::new(ProcessManager::new()),
            event_tx,
            sessions: Arc::new(DashMap::new()),
            reserve_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &SessionManagerConfig {
        &self.config
    }

    /// Subscribe to process events for all sessions.
    pub fn subscribe(&self) -> broadcast::Receiver<ProcessEvent> {
        self.event_tx.subscribe()
    }

    /// Register a parsed-event listener on one session's parser.
    pub async fn subscribe_events<F>(&self, session_id: Uuid, callback: F) -> Result<Subscription>
    where
        F: Fn(&ParsedEvent) + Send + Sync + 'static,
    {
        self.process_manager
            .subscribe(session_id, callback)
            .await
            .ok_or(DraftdeckError::SessionNotFound(session_id))
    }

    /// Number of sessions still starting or running.
    pub fn active_count(&self) -> usize {
        self.sessions
            .iter()
            .filter(|entry| entry.status.is_live())
            .count()
    }

    /// Insert a live record if the session limit allows it.
    fn reserve(&self, session: TerminalSession) -> Result<()> {
        let _guard = self
            .reserve_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if self.active_count() >= self.config.max_concurrent_sessions {
            return Err(DraftdeckError::SessionLimitExceeded(
                self.config.max_concurrent_sessions,
            ));
        }
        self.sessions.insert(session.id, session);
        Ok(())
    }

    /// Create a session and spawn its command in a PTY.
    pub async fn create_session(&self, opts: CreateSessionOptions) -> Result<TerminalSession> {
        let cwd = opts.cwd.unwrap_or_else(|| self.config.default_cwd.clone());
        if !cwd.is_dir() {
            warn!(target: "draftdeck::session", "Rejecting session in missing directory {:?}", cwd);
            return Err(DraftdeckError::InvalidWorkingDirectory(cwd));
        }

        let command = opts.command.unwrap_or_else(|| self.config.shell.clone());
        let args = opts
            .args
            .unwrap_or_else(|| self.config.default_args.clone());
        let session_id = Uuid::new_v4();

        self.reserve(TerminalSession::new(
            session_id,
            command.clone(),
            args.clone(),
            cwd.clone(),
        ))?;

        // Fold events into the record before anything is broadcast.
        let emitter = EventEmitter::new();
        let sessions = self.sessions.clone();
        emitter.subscribe(move |event| {
            if let Some(mut session) = sessions.get_mut(&session_id) {
                session.apply_event(event);
            }
        });

        let sessions = self.sessions.clone();
        let on_exit = move |exit_code: Option<i32>| {
            if let Some(mut session) = sessions.get_mut(&session_id) {
                if session.status.is_live() {
                    session.mark_exited(exit_code);
                }
            }
            info!(target: "draftdeck::session", "Session {} exited with {:?}", session_id, exit_code);
        };

        let spawn = self
            .process_manager
            .spawn(
                SpawnOptions {
                    session_id,
                    command,
                    args,
                    cwd,
                    env: Vec::new(),
                    rows: opts.rows.unwrap_or(self.config.rows),
                    cols: opts.cols.unwrap_or(self.config.cols),
                },
                emitter,
                self.event_tx.clone(),
                on_exit,
            )
            .await;

        if let Err(e) = spawn {
            error!(target: "draftdeck::session", "Failed to start session {}: {}", session_id, e);
            if let Some(mut session) = self.sessions.get_mut(&session_id) {
                session.status = SessionStatus::Error;
            }
            return Err(e);
        }

        let mut session = self
            .sessions
            .get_mut(&session_id)
            .ok_or(DraftdeckError::SessionNotFound(session_id))?;
        // The command may already have exited on the reader thread.
        if session.status == SessionStatus::Starting {
            session.status = SessionStatus::Active;
        }
        info!(target: "draftdeck::session", "Session {} started", session_id);
        Ok(session.clone())
    }

    /// List sessions, newest first.
    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let mut summaries: Vec<SessionSummary> = self
            .sessions
            .iter()
            .map(|entry| SessionSummary::from(entry.value()))
            .collect();
        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        summaries
    }

    pub fn get_session(&self, session_id: Uuid) -> Option<TerminalSession> {
        self.sessions.get(&session_id).map(|entry| entry.clone())
    }

    /// Send a line of input to a session.
    pub async fn send_input(&self, session_id: Uuid, input: &str) -> Result<()> {
        self.ensure_exists(session_id)?;
        debug!(target: "draftdeck::session", "Sending input to session {}", session_id);
        self.process_manager.send_input(session_id, input).await
    }

    /// Send raw terminal bytes to a session.
    pub async fn send_terminal_input(&self, session_id: Uuid, data: &[u8]) -> Result<()> {
        self.ensure_exists(session_id)?;
        self.process_manager.send_raw(session_id, data).await
    }

    pub async fn resize(&self, session_id: Uuid, rows: u16, cols: u16) -> Result<()> {
        self.ensure_exists(session_id)?;
        self.process_manager.resize(session_id, rows, cols).await
    }

    /// Terminate a session's process. The record stays listed as exited.
    pub async fn terminate_session(&self, session_id: Uuid) -> Result<()> {
        self.ensure_exists(session_id)?;
        self.process_manager.terminate(session_id).await?;

        if let Some(mut session) = self.sessions.get_mut(&session_id) {
            if session.status.is_live() {
                session.mark_exited(None);
            }
        }
        info!(target: "draftdeck::session", "Session {} terminated", session_id);
        Ok(())
    }

    fn ensure_exists(&self, session_id: Uuid) -> Result<()> {
        if self.sessions.contains_key(&session_id) {
            Ok(())
        } else {
            Err(DraftdeckError::SessionNotFound(session_id))
        }
    }
}
