//! WebSocket message protocol between UI bridges and the server.

use serde::{Deserialize, Serialize};

use crate::{ParsedEvent, TerminalSession};

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsClientMessage {
    /// Send a line of text followed by Enter.
    Input { content: String },
    /// Send raw terminal input.
    TerminalInput { data: Vec<u8> },
    /// Resize the PTY.
    Resize { rows: u16, cols: u16 },
    /// Ping for keepalive.
    Ping { timestamp: u64 },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WsServerMessage {
    /// Snapshot of the session on connect.
    SessionInit { session: TerminalSession },
    /// A parsed event, forwarded verbatim.
    Parsed { event: ParsedEvent },
    /// Raw terminal output.
    TerminalOutput { data: Vec<u8> },
    /// The command exited.
    Exited { exit_code: Option<i32> },
    /// Error message.
    Error { code: String, message: String },
    /// Pong response.
    Pong { timestamp: u64 },
}
