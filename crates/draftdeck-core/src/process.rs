//! PTY process hosting. Each session's reader thread owns its own parser.

use crate::{DraftdeckError, EventEmitter, OutputParser, Result, Subscription};
use draftdeck_types::ParsedEvent;
use portable_pty::{native_pty_system, Child as PtyChild, CommandBuilder, PtySize};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, error, info, trace, warn};
use uuid::Uuid;

/// Events emitted by managed processes.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    /// Event recognized in the session's output.
    Parsed { session_id: Uuid, event: ParsedEvent },
    /// Raw terminal output.
    TerminalOutput { session_id: Uuid, data: Vec<u8> },
    /// Process has exited.
    Exited { session_id: Uuid, exit_code: Option<i32> },
    /// Error occurred.
    Error { session_id: Uuid, message: String },
}

impl ProcessEvent {
    pub fn session_id(&self) -> Uuid {
        match self {
            ProcessEvent::Parsed { session_id, .. }
            | ProcessEvent::TerminalOutput { session_id, .. }
            | ProcessEvent::Exited { session_id, .. }
            | ProcessEvent::Error { session_id, .. } => *session_id,
        }
    }
}

/// Options for spawning a command in a PTY.
#[derive(Debug, Clone)]
pub struct SpawnOptions {
    pub session_id: Uuid,
    pub command: PathBuf,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
    pub rows: u16,
    pub cols: u16,
}

/// Decodes arbitrary byte reads into text without splitting characters.
///
/// An incomplete UTF-8 sequence at the end of a read is held until the next
/// one; invalid bytes become U+FFFD.
#[derive(Debug, Default)]
pub struct Utf8Stream {
    pending: Vec<u8>,
}

impl Utf8Stream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decode(&mut self, bytes: &[u8]) -> String {
        self.pending.extend_from_slice(bytes);
        let mut out = String::with_capacity(self.pending.len());
        let mut start = 0;

        while start < self.pending.len() {
            match std::str::from_utf8(&self.pending[start..]) {
                Ok(valid) => {
                    out.push_str(valid);
                    start = self.pending.len();
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    out.push_str(&String::from_utf8_lossy(&self.pending[start..valid_end]));
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        None => {
                            // Truncated sequence; wait for the rest.
                            start = valid_end;
                            break;
                        }
                    }
                }
            }
        }

        self.pending.drain(..start);
        out
    }
}

/// Manages PTY-hosted processes.
#[derive(Default)]
pub struct ProcessManager {
    processes: Arc<RwLock<HashMap<Uuid, ManagedProcess>>>,
}

struct ManagedProcess {
    handle: std::thread::JoinHandle<()>,
    writer: Arc<Mutex<Box<dyn Write + Send>>>,
    master: Arc<Mutex<Box<dyn portable_pty::MasterPty + Send>>>,
    /// Signal to stop the reader thread
    shutdown: Arc<AtomicBool>,
    child: Arc<Mutex<Box<dyn PtyChild + Send + Sync>>>,
    /// Listener set of the parser owned by the reader thread
    emitter: EventEmitter,
}

impl ProcessManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a command in a new PTY and start parsing its output.
    ///
    /// Parsed events go to `emitter`'s listeners first, then to `event_tx`.
    /// `on_exit` runs on the reader thread once output ends.
    pub async fn spawn<F>(
        &self,
        opts: SpawnOptions,
        emitter: EventEmitter,
        event_tx: broadcast::Sender<ProcessEvent>,
        on_exit: F,
    ) -> Result<()>
    where
        F: FnOnce(Option<i32>) + Send + 'static,
    {
        info!(
            target: "draftdeck::process",
            "Spawning {:?} in {:?} for session {}",
            opts.command, opts.cwd, opts.session_id
        );

        let pair = native_pty_system()
            .openpty(PtySize {
                rows: opts.rows,
                cols: opts.cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| DraftdeckError::PtyError(e.to_string()))?;

        let mut cmd = CommandBuilder::new(&opts.command);
        cmd.args(&opts.args);
        for (key, value) in &opts.env {
            cmd.env(key, value);
        }
        cmd.env("DRAFTDECK_SESSION_ID", opts.session_id.to_string());
        cmd.cwd(&opts.cwd);

        let child = pair.slave.spawn_command(cmd).map_err(|e| {
            error!(target: "draftdeck::process", "Failed to spawn {:?}: {}", opts.command, e);
            DraftdeckError::ProcessSpawnFailed(e.to_string())
        })?;
        let child: Arc<Mutex<Box<dyn PtyChild + Send + Sync>>> = Arc::new(Mutex::new(child));

        let mut reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| DraftdeckError::PtyError(e.to_string()))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| DraftdeckError::PtyError(e.to_string()))?;
        let writer = Arc::new(Mutex::new(writer));

        let session_id = opts.session_id;
        let forward_tx = event_tx.clone();
        emitter.subscribe(move |event| {
            let _ = forward_tx.send(ProcessEvent::Parsed {
                session_id,
                event: event.clone(),
            });
        });

        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_for_thread = shutdown.clone();
        let child_for_thread = child.clone();
        let mut parser = OutputParser::with_emitter(emitter.clone());
        let tx = event_tx;

        // Reader thread (PTY reading is blocking)
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 4096];
            let mut decoder = Utf8Stream::new();
            let mut total_bytes = 0usize;
            debug!(target: "draftdeck::process", "PTY reader thread started for session {}", session_id);

            loop {
                if shutdown_for_thread.load(Ordering::SeqCst) {
                    debug!(target: "draftdeck::process", "PTY reader thread received shutdown signal for session {}", session_id);
                    break;
                }

                match reader.read(&mut buf) {
                    Ok(0) => {
                        debug!(target: "draftdeck::process", "PTY reader got EOF for session {}", session_id);
                        break;
                    }
                    Ok(n) => {
                        total_bytes += n;
                        trace!(target: "draftdeck::process", "PTY output ({} bytes, total {})", n, total_bytes);

                        let _ = tx.send(ProcessEvent::TerminalOutput {
                            session_id,
                            data: buf[..n].to_vec(),
                        });

                        let text = decoder.decode(&buf[..n]);
                        parser.feed(&text);
                    }
                    Err(e) => {
                        if !shutdown_for_thread.load(Ordering::SeqCst) {
                            error!(target: "draftdeck::process", "PTY read error for session {}: {}", session_id, e);
                            let _ = tx.send(ProcessEvent::Error {
                                session_id,
                                message: e.to_string(),
                            });
                        }
                        break;
                    }
                }
            }

            // Only report a code the child already has; terminate() reaps otherwise.
            let exit_code = child_for_thread
                .lock()
                .ok()
                .and_then(|mut c| c.try_wait().ok().flatten())
                .map(|status| status.exit_code() as i32);

            on_exit(exit_code);
            let _ = tx.send(ProcessEvent::Exited { session_id, exit_code });
            debug!(target: "draftdeck::process", "PTY reader thread exiting for session {}", session_id);
        });

        self.processes.write().await.insert(
            session_id,
            ManagedProcess {
                handle,
                writer,
                master: Arc::new(Mutex::new(pair.master)),
                shutdown,
                child,
                emitter,
            },
        );

        info!(target: "draftdeck::process", "Terminal process spawned for session {}", session_id);
        Ok(())
    }

    /// Register an extra listener on a session's parser.
    pub async fn subscribe<F>(&self, session_id: Uuid, callback: F) -> Option<Subscription>
    where
        F: Fn(&ParsedEvent) + Send + Sync + 'static,
    {
        let processes = self.processes.read().await;
        processes
            .get(&session_id)
            .map(|process| process.emitter.subscribe(callback))
    }

    /// Send a line of input followed by Enter.
    pub async fn send_input(&self, session_id: Uuid, input: &str) -> Result<()> {
        let writer = self.writer(session_id).await?;

        write_all(&writer, input.trim().as_bytes())?;
        // The TUI needs Enter as a separate input event.
        tokio::time::sleep(Duration::from_millis(100)).await;
        write_all(&writer, b"\r")
    }

    /// Send raw bytes to the PTY.
    pub async fn send_raw(&self, session_id: Uuid, data: &[u8]) -> Result<()> {
        let writer = self.writer(session_id).await?;
        write_all(&writer, data)
    }

    /// Resize a PTY terminal.
    pub async fn resize(&self, session_id: Uuid, rows: u16, cols: u16) -> Result<()> {
        debug!(target: "draftdeck::process", "Resizing PTY for session {} to {}x{}", session_id, cols, rows);
        let processes = self.processes.read().await;
        let process = processes
            .get(&session_id)
            .ok_or(DraftdeckError::SessionNotFound(session_id))?;
        let master = process
            .master
            .lock()
            .map_err(|_| DraftdeckError::PtyError("PTY master lock poisoned".to_string()))?;
        master
            .resize(PtySize {
                rows,
                cols,
                pixel_width: 0,
                pixel_height: 0,
            })
            .map_err(|e| DraftdeckError::PtyError(e.to_string()))
    }

    /// Terminate a process: Ctrl-C, grace period, close PTY, join reader, kill group.
    pub async fn terminate(&self, session_id: Uuid) -> Result<()> {
        let Some(process) = self.processes.write().await.remove(&session_id) else {
            return Ok(());
        };
        let ManagedProcess {
            handle,
            writer,
            master,
            shutdown,
            child,
            emitter,
        } = process;

        info!(target: "draftdeck::process", "Terminating session {}", session_id);

        let pid = child.lock().ok().and_then(|c| c.process_id());

        if let Ok(mut w) = writer.lock() {
            let _ = w.write_all(b"\x03");
            let _ = w.flush();
        }

        let graceful_timeout = Duration::from_secs(2);
        let start = std::time::Instant::now();
        let mut exited_gracefully = false;
        while start.elapsed() < graceful_timeout {
            if handle.is_finished() {
                exited_gracefully = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }

        shutdown.store(true, Ordering::SeqCst);

        // Closing the master unblocks the reader thread.
        drop(writer);
        drop(master);

        match tokio::task::spawn_blocking(move || handle.join()).await {
            Ok(Ok(())) => {
                debug!(target: "draftdeck::process", "Reader thread joined for session {}", session_id);
            }
            Ok(Err(e)) => {
                warn!(target: "draftdeck::process", "Reader thread panicked for session {}: {:?}", session_id, e);
            }
            Err(e) => {
                warn!(target: "draftdeck::process", "Failed to join reader thread for session {}: {:?}", session_id, e);
            }
        }

        #[cfg(unix)]
        if !exited_gracefully {
            if let Some(pid) = pid {
                info!(target: "draftdeck::process", "Sending SIGKILL to process group {} for session {}", pid, session_id);
                unsafe {
                    // Negative PID kills the entire process group
                    libc::kill(-(pid as i32), libc::SIGKILL);
                }
            }
        }

        // Closing the PTY ends the console session elsewhere.
        #[cfg(not(unix))]
        let _ = (pid, exited_gracefully);

        if let Ok(mut c) = child.lock() {
            let _ = c.try_wait();
        }

        emitter.clear();
        info!(target: "draftdeck::process", "Session {} terminated", session_id);
        Ok(())
    }

    /// Check if a session has a running process.
    pub async fn is_active(&self, session_id: Uuid) -> bool {
        self.processes.read().await.contains_key(&session_id)
    }

    async fn writer(&self, session_id: Uuid) -> Result<Arc<Mutex<Box<dyn Write + Send>>>> {
        self.processes
            .read()
            .await
            .get(&session_id)
            .map(|process| process.writer.clone())
            .ok_or(DraftdeckError::SessionNotFound(session_id))
    }
}

fn write_all(writer: &Mutex<Box<dyn Write + Send>>, data: &[u8]) -> Result<()> {
    let mut writer = writer
        .lock()
        .map_err(|_| DraftdeckError::PtyError("PTY writer lock poisoned".to_string()))?;
    writer.write_all(data)?;
    writer.flush()?;
    Ok(())
}
