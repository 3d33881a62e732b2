//! Shared application state.

use crate::config::Config;
use draftdeck_core::SessionManager;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub session_manager: Arc<SessionManager>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let session_manager = Arc::new(SessionManager::new(config.session_manager_config()));
        Self {
            session_manager,
            config,
        }
    }
}
