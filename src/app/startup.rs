use super::cli::args::{Args, Command};
use super::cli::config::FileConfig;
use super::cli::settings::{resolve_session, LogSettings};
use super::session::{self, Mode};
use crate::core::error_handling::log_error_with_context;
use crate::core::logging::init_logging;
use crate::queue::QueueError;
use clap::Parser;
use std::io::IsTerminal;
use std::time::Duration;

pub const MISSING_QUEUE_MESSAGE: &str = "Please provide name of the queue";

/// Parse arguments, set up logging, run the selected session and exit
pub fn startup() {
    let args = Args::parse();

    let file_config = match FileConfig::load(args.global.config_file.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let log_settings =
        LogSettings::resolve(&args.global, &file_config, std::io::stderr().is_terminal());
    colored::control::set_override(log_settings.color);
    let log_file = log_settings.file.as_ref().map(|p| p.to_string_lossy().to_string());
    if let Err(e) = init_logging(
        Some(&log_settings.level),
        Some(&log_settings.format),
        log_file.as_deref(),
        log_settings.color,
    ) {
        eprintln!("Error: failed to initialise logging: {}", e);
        std::process::exit(1);
    }

    log::debug!(
        "pipecat {} starting ({})",
        crate::core::version::version(),
        args.command.name()
    );
    if let Some(source) = &file_config.source {
        log::debug!("Loaded configuration from {}", source.display());
    }
    for key in &file_config.unknown_keys {
        log::warn!("Ignoring unknown configuration key '{}'", key);
    }

    let mode = match &args.command {
        Command::Publish(_) => Mode::Publish,
        Command::Consume(_) => Mode::Consume,
    };
    let queue_args = args.command.queue_args();
    let Some(queue) = queue_args.queue_name() else {
        println!("{}", MISSING_QUEUE_MESSAGE);
        std::process::exit(1);
    };
    let config = resolve_session(queue, queue_args, &file_config);
    log::debug!(
        "Queue '{}', exchange '{}', create: {}, auto-ack: {}, non-blocking: {}, timeout: {:?}, {:?}",
        config.queue,
        config.exchange,
        config.create_queue,
        config.auto_ack,
        config.non_blocking,
        config.idle_timeout,
        config.delivery_mode
    );

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            let error = QueueError::Internal {
                message: e.to_string(),
            };
            log_error_with_context(&error, "Starting async runtime");
            std::process::exit(1);
        }
    };

    let code = runtime.block_on(session::run(mode, config));

    // stdin is read on a blocking thread that cannot be cancelled; do not wait for it
    runtime.shutdown_timeout(Duration::from_millis(100));
    std::process::exit(code);
}
