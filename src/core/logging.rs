//! Logging setup on top of flexi_logger
//!
//! All log output goes to stderr (or a log file) so that stdout stays a
//! clean line stream for message bodies.
//!
//! Three layouts are available:
//!
//! ```text
//! text  2026-03-01 12:00:00.000 INF Connected to AMQP broker (queue 'jobs')
//! ext   2026-03-01 12:00:00.000 INF Connected to AMQP broker (queue 'jobs') (queue/amqp.rs:58)
//! json  {"timestamp":"2026-03-01T12:00:00.000Z","level":"INF","message":"...","target":"queue/amqp.rs:58"}
//! ```

use flexi_logger::{DeferredNow, FileSpec, Logger, LoggerHandle};
use std::io::Write;
use std::str::FromStr;
use std::sync::{Mutex, OnceLock};

// Dropping the handle would stop file logging
static LOGGER_HANDLE: OnceLock<Mutex<LoggerHandle>> = OnceLock::new();

const LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// Layout of each log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Ext,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "ext" => Ok(LogFormat::Ext),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

pub fn init_logging(
    log_level: Option<&str>,
    log_format: Option<&str>,
    log_file: Option<&str>,
    color_enabled: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let level = log_level.unwrap_or("warn");
    let format = log_format.map(LogFormat::from_str).transpose()?;

    let mut logger = Logger::try_with_str(logger_spec(level))?;
    logger = match (format.unwrap_or(LogFormat::Text), color_enabled) {
        (LogFormat::Json, _) => logger.format(json_format),
        (LogFormat::Ext, true) => logger.format(ext_color_format),
        (LogFormat::Ext, false) => logger.format(ext_format),
        (LogFormat::Text, true) => logger.format(text_color_format),
        (LogFormat::Text, false) => logger.format(text_format),
    };

    if let Some(file_path) = log_file {
        logger = logger.log_to_file(FileSpec::try_from(std::path::Path::new(file_path))?);
    }

    let handle = logger.start()?;
    let _ = LOGGER_HANDLE.set(Mutex::new(handle));
    Ok(())
}

// The AMQP client logs every frame at debug level; keep it at info unless
// tracing was asked for.
fn logger_spec(level: &str) -> String {
    match level {
        "debug" => "debug, lapin=info".to_string(),
        other => other.to_string(),
    }
}

/// Shift a base level by `-v`/`-q` counts, clamped to the known levels
pub fn level_for_verbosity(base: &str, verbosity: i8) -> &'static str {
    let base_idx = LEVELS
        .iter()
        .position(|l| l.eq_ignore_ascii_case(base))
        .unwrap_or(2) as i16;
    let idx = (base_idx + verbosity as i16).clamp(0, LEVELS.len() as i16 - 1);
    LEVELS[idx as usize]
}

fn level_tag(level: log::Level) -> &'static str {
    match level {
        log::Level::Error => "ERR",
        log::Level::Warn => "WRN",
        log::Level::Info => "INF",
        log::Level::Debug => "DBG",
        log::Level::Trace => "TRC",
    }
}

fn colored_level_tag(level: log::Level) -> colored::ColoredString {
    use colored::Colorize;

    let tag = level_tag(level);
    match level {
        log::Level::Error => tag.red().bold(),
        log::Level::Warn => tag.yellow(),
        log::Level::Info => tag.green(),
        log::Level::Debug => tag.blue(),
        log::Level::Trace => tag.magenta(),
    }
}

fn write_line(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &log::Record,
    with_location: bool,
    color: bool,
) -> std::io::Result<()> {
    use colored::Colorize;

    let timestamp = now.format("%Y-%m-%d %H:%M:%S%.3f").to_string();
    if color {
        write!(
            w,
            "{} {} {}",
            timestamp.dimmed(),
            colored_level_tag(record.level()),
            record.args()
        )?;
    } else {
        write!(w, "{} {} {}", timestamp, level_tag(record.level()), record.args())?;
    }

    if with_location {
        let location = source_location(record.target(), record.line());
        if color {
            write!(w, " ({})", location.dimmed())?;
        } else {
            write!(w, " ({})", location)?;
        }
    }
    Ok(())
}

fn text_format(w: &mut dyn Write, now: &mut DeferredNow, record: &log::Record) -> std::io::Result<()> {
    write_line(w, now, record, false, false)
}

fn text_color_format(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> std::io::Result<()> {
    write_line(w, now, record, false, true)
}

fn ext_format(w: &mut dyn Write, now: &mut DeferredNow, record: &log::Record) -> std::io::Result<()> {
    write_line(w, now, record, true, false)
}

fn ext_color_format(
    w: &mut dyn Write,
    now: &mut DeferredNow,
    record: &log::Record,
) -> std::io::Result<()> {
    write_line(w, now, record, true, true)
}

fn json_format(w: &mut dyn Write, now: &mut DeferredNow, record: &log::Record) -> std::io::Result<()> {
    let entry = serde_json::json!({
        "timestamp": now.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        "level": level_tag(record.level()),
        "message": record.args().to_string(),
        "target": source_location(record.target(), record.line()),
    });

    match serde_json::to_string(&entry) {
        Ok(line) => w.write_all(line.as_bytes()),
        Err(_) => w.write_all(b"{\"error\":\"unserializable log record\"}"),
    }
}

// pipecat::queue::consumer -> queue/consumer.rs, other crates keep their path
fn source_location(target: &str, line: Option<u32>) -> String {
    let path = match target.strip_prefix("pipecat::") {
        Some(module) => format!("{}.rs", module.replace("::", "/")),
        None => target.replace("::", "/"),
    };
    match line {
        Some(line) => format!("{}:{}", path, line),
        None => path,
    }
}
