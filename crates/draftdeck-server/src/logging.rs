//! Logging configuration and initialization.
//!
//! Presets pick per-target levels for the `draftdeck::*` targets, `--log`
//! flags override individual targets, and `RUST_LOG` replaces both when set.

use std::collections::BTreeMap;
use tracing::Level;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Log output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!("Invalid log format: '{}'. Use 'text' or 'json'.", s)),
        }
    }
}

/// Logging preset levels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogPreset {
    /// Lifecycle events only; parser internals stay quiet.
    #[default]
    Production,
    /// Adds per-session parse activity.
    Verbose,
    /// Debug everywhere except keepalive pings.
    Debug,
    /// Every matched line and raw read.
    Trace,
    /// Warnings and errors only.
    Quiet,
}

impl LogPreset {
    fn directives(&self) -> &'static [&'static str] {
        match self {
            LogPreset::Production => &[
                "draftdeck::startup=info",
                "draftdeck::api=info",
                "draftdeck::ws=info",
                "draftdeck::ws::ping=off",
                "draftdeck::session=info",
                "draftdeck::process=info",
                "draftdeck::parser=warn",
                "draftdeck::osc7=warn",
                "tower_http=warn",
            ],
            LogPreset::Verbose => &[
                "draftdeck=info",
                "draftdeck::parser=info",
                "draftdeck::ws::ping=off",
                "tower_http=info",
            ],
            LogPreset::Debug => &[
                "draftdeck=debug",
                "draftdeck::ws::ping=off",
                "tower_http=debug",
            ],
            LogPreset::Trace => &["draftdeck=trace", "tower_http=trace"],
            LogPreset::Quiet => &["draftdeck=warn", "tower_http=error"],
        }
    }
}

/// Logging configuration built from CLI arguments.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    pub preset: LogPreset,
    /// Per-target level overrides, keyed by full target name.
    pub overrides: BTreeMap<String, Level>,
    pub format: LogFormat,
}

impl LogConfig {
    /// Create a new LogConfig from CLI arguments. The quietest flag wins.
    pub fn from_cli(
        verbose: bool,
        debug: bool,
        trace: bool,
        quiet: bool,
        log_overrides: Vec<String>,
        format: LogFormat,
    ) -> Self {
        let preset = if quiet {
            LogPreset::Quiet
        } else if trace {
            LogPreset::Trace
        } else if debug {
            LogPreset::Debug
        } else if verbose {
            LogPreset::Verbose
        } else {
            LogPreset::Production
        };

        let overrides = log_overrides
            .iter()
            .flat_map(|arg| arg.split(','))
            .filter_map(parse_override)
            .collect();

        Self {
            preset,
            overrides,
            format,
        }
    }

    /// Filter directives for the preset plus overrides, in application order.
    pub fn directives(&self) -> Vec<String> {
        self.preset
            .directives()
            .iter()
            .map(|d| d.to_string())
            .chain(
                self.overrides
                    .iter()
                    .map(|(target, level)| format!("{}={}", target, level_to_str(*level))),
            )
            .collect()
    }

    /// Build an EnvFilter, preferring `RUST_LOG` when it is set.
    pub fn build_filter(&self) -> EnvFilter {
        if let Ok(env_filter) = EnvFilter::try_from_default_env() {
            return env_filter;
        }

        EnvFilter::try_new(self.directives().join(",")).unwrap_or_else(|_| EnvFilter::new("info"))
    }
}

/// `parser=debug` -> (`draftdeck::parser`, DEBUG). Unknown levels are skipped.
fn parse_override(part: &str) -> Option<(String, Level)> {
    let (target, level) = part.split_once('=')?;
    let target = target.trim();
    let level = parse_level(level.trim())?;

    let full_target = if target.starts_with("draftdeck") || target == "tower_http" {
        target.to_string()
    } else {
        format!("draftdeck::{}", target)
    };
    Some((full_target, level))
}

fn parse_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" | "warning" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

fn level_to_str(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Initialize the tracing subscriber with the given configuration.
pub fn init(config: &LogConfig) {
    let filter = config.build_filter();

    match config.format {
        LogFormat::Text => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .with_target(true)
                        .with_thread_ids(false)
                        .with_file(false)
                        .with_line_number(false),
                )
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    fmt::layer()
                        .json()
                        .with_target(true)
                        .with_span_events(FmtSpan::CLOSE),
                )
                .init();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("text".parse::<LogFormat>().unwrap(), LogFormat::Text);
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("yaml".parse::<LogFormat>().is_err());
    }

    #[test]
    fn test_preset_priority() {
        let preset = |v, d, t, q| LogConfig::from_cli(v, d, t, q, vec![], LogFormat::Text).preset;

        assert_eq!(preset(true, true, true, true), LogPreset::Quiet);
        assert_eq!(preset(true, true, true, false), LogPreset::Trace);
        assert_eq!(preset(true, true, false, false), LogPreset::Debug);
        assert_eq!(preset(true, false, false, false), LogPreset::Verbose);
        assert_eq!(preset(false, false, false, false), LogPreset::Production);
    }

    #[test]
    fn test_overrides_are_prefixed() {
        let config = LogConfig::from_cli(
            false,
            false,
            false,
            false,
            vec!["osc7=debug".into(), "ws::ping=trace,session=info".into(), "parser=loud".into()],
            LogFormat::Text,
        );

        assert_eq!(config.overrides.get("draftdeck::osc7"), Some(&Level::DEBUG));
        assert_eq!(config.overrides.get("draftdeck::ws::ping"), Some(&Level::TRACE));
        assert_eq!(config.overrides.get("draftdeck::session"), Some(&Level::INFO));
        assert!(!config.overrides.contains_key("draftdeck::parser"));
    }

    #[test]
    fn test_full_targets_pass_through() {
        let config = LogConfig::from_cli(
            false,
            false,
            false,
            false,
            vec!["draftdeck::process=debug".into(), "tower_http=trace".into()],
            LogFormat::Text,
        );

        assert_eq!(config.overrides.get("draftdeck::process"), Some(&Level::DEBUG));
        assert_eq!(config.overrides.get("tower_http"), Some(&Level::TRACE));
    }

    #[test]
    fn test_overrides_follow_preset_directives() {
        let config = LogConfig::from_cli(
            false,
            false,
            false,
            true,
            vec!["parser=trace".into()],
            LogFormat::Text,
        );
        let directives = config.directives();

        assert_eq!(directives.first().map(String::as_str), Some("draftdeck=warn"));
        assert_eq!(directives.last().map(String::as_str), Some("draftdeck::parser=trace"));
    }
}
