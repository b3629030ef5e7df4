//! Resolution of final settings from arguments, environment and config file
//!
//! Precedence: command line > environment > config file > built-in default.
//! Environment variables are already folded into the parsed arguments by
//! clap, so only the config-file layer is merged here.

use super::args::{GlobalArgs, QueueArgs};
use super::config::FileConfig;
use crate::core::logging::level_for_verbosity;
use crate::queue::{DeliveryMode, SessionConfig, DEFAULT_AMQP_URI, DEFAULT_IDLE_TIMEOUT};
use std::path::PathBuf;
use std::time::Duration;

/// Logger configuration after merging all sources
#[derive(Debug, Clone, PartialEq)]
pub struct LogSettings {
    pub level: String,
    pub format: String,
    pub file: Option<PathBuf>,
    pub color: bool,
}

impl LogSettings {
    /// `stderr_is_terminal` decides color when neither flags nor config do
    pub fn resolve(global: &GlobalArgs, file: &FileConfig, stderr_is_terminal: bool) -> Self {
        let base_level = global
            .log_level
            .clone()
            .or_else(|| file.log_level.clone())
            .unwrap_or_else(|| "warn".to_string());
        let level = level_for_verbosity(&base_level, global.verbosity()).to_string();

        let format = global
            .log_format
            .clone()
            .or_else(|| file.log_format.clone())
            .unwrap_or_else(|| "text".to_string());

        let file_path = match &global.log_file {
            Some(path) if is_disabled_log_file(path) => None,
            Some(path) => Some(path.clone()),
            None if file.log_file_disabled => None,
            None => file.log_file.clone(),
        };

        let color = if global.color {
            true
        } else if global.no_color {
            false
        } else {
            file.color.unwrap_or(stderr_is_terminal)
        };

        Self {
            level,
            format,
            file: file_path,
            color,
        }
    }
}

fn is_disabled_log_file(path: &std::path::Path) -> bool {
    let raw = path.to_string_lossy();
    raw.eq_ignore_ascii_case("none") || raw == "-"
}

/// Build the session configuration for `queue`
pub fn resolve_session(queue: &str, args: &QueueArgs, file: &FileConfig) -> SessionConfig {
    let flag = |cli: bool, config: Option<bool>| cli || config.unwrap_or(false);

    SessionConfig {
        amqp_uri: args
            .amqpuri
            .clone()
            .or_else(|| file.amqpuri.clone())
            .unwrap_or_else(|| DEFAULT_AMQP_URI.to_string()),
        queue: queue.to_string(),
        exchange: args
            .exchange
            .clone()
            .or_else(|| file.exchange.clone())
            .unwrap_or_default(),
        create_queue: !flag(args.no_create_queue, file.no_create_queue),
        auto_ack: flag(args.autoack, file.autoack),
        non_blocking: flag(args.non_blocking, file.non_blocking),
        idle_timeout: args
            .timeout
            .or(file.timeout)
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_IDLE_TIMEOUT),
        delivery_mode: DeliveryMode::from_transient_flag(flag(args.transient, file.transient)),
    }
}
