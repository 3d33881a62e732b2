//! Server configuration.

use anyhow::Result;
use draftdeck_core::SessionManagerConfig;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Program spawned when a create request names none.
    #[serde(default = "default_shell")]
    pub shell: PathBuf,
    #[serde(default)]
    pub default_args: Vec<String>,
    #[serde(default = "default_cwd")]
    pub default_cwd: PathBuf,
    #[serde(default = "default_max_sessions")]
    pub max_concurrent_sessions: usize,
    #[serde(default = "default_pty_rows")]
    pub pty_rows: u16,
    #[serde(default = "default_pty_cols")]
    pub pty_cols: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8787
}

fn default_shell() -> PathBuf {
    std::env::var_os("SHELL")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("/bin/sh"))
}

fn default_cwd() -> PathBuf {
    dirs::home_dir().unwrap_or_else(|| PathBuf::from("."))
}

fn default_max_sessions() -> usize {
    8
}

fn default_pty_rows() -> u16 {
    24
}

fn default_pty_cols() -> u16 {
    80
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shell: default_shell(),
            default_args: Vec::new(),
            default_cwd: default_cwd(),
            max_concurrent_sessions: default_max_sessions(),
            pty_rows: default_pty_rows(),
            pty_cols: default_pty_cols(),
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from default location (config/default.toml) or fall back to defaults.
    pub fn load() -> Result<Self> {
        let config_path = PathBuf::from("config/default.toml");
        if config_path.exists() {
            return Self::load_from(&config_path);
        }

        Ok(Config::default())
    }

    pub fn session_manager_config(&self) -> SessionManagerConfig {
        SessionManagerConfig {
            shell: self.shell.clone(),
            default_args: self.default_args.clone(),
            default_cwd: self.default_cwd.clone(),
            max_concurrent_sessions: self.max_concurrent_sessions,
            rows: self.pty_rows,
            cols: self.pty_cols,
        }
    }
}
