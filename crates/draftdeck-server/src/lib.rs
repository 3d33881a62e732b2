//! Draftdeck server library - HTTP/WebSocket bridge for terminal sessions.
//!
//! Routes, WebSocket handling and application state live here, separate from
//! main.rs, so integration tests can drive the router directly.

pub mod config;
pub mod logging;
pub mod routes;
pub mod state;
pub mod websocket;
