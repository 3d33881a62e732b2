//! Shared types for the Draftdeck terminal parsing layer.

mod event;
mod session;
mod ws;

pub use event::*;
pub use session::*;
pub use ws::*;
