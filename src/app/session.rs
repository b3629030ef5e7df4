//! One publish or consume session from connect to exit status
//!
//! The broker connection is released on every path out of a session,
//! including failures after the connection was established.

use crate::core::error_handling::log_error_with_context;
use crate::core::shutdown::ShutdownCoordinator;
use crate::queue::{
    run_publisher, AmqpGateway, ConsumeSummary, Consumer, QueueGateway, QueueResult,
    SessionConfig,
};
use tokio::io::{AsyncBufRead, AsyncWrite, BufReader, BufWriter};
use tokio::sync::broadcast;

/// Which pipe a session runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Publish,
    Consume,
}

impl Mode {
    fn context(self) -> &'static str {
        match self {
            Mode::Publish => "Publish session",
            Mode::Consume => "Consume session",
        }
    }
}

/// How a session that did not fail came to an end
#[derive(Debug)]
pub enum SessionOutcome {
    /// Input closed after this many messages were published
    Published(u64),
    Consumed(ConsumeSummary),
}

/// Connect to the broker, run the session on stdin/stdout, return the exit status
pub async fn run(mode: Mode, config: SessionConfig) -> i32 {
    let gateway =
        match AmqpGateway::prepare(&config.amqp_uri, &config.queue, config.create_queue).await {
            Ok(gateway) => gateway,
            Err(e) => {
                log_error_with_context(&e, mode.context());
                return 1;
            }
        };

    // The receiver exists before any handler can fire, so no signal is missed
    let (coordinator, shutdown_rx) = ShutdownCoordinator::new();
    if mode == Mode::Consume {
        coordinator.install_signal_handlers();
    }

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = BufWriter::new(tokio::io::stdout());

    exit_status(
        mode,
        execute(&gateway, mode, &config, stdin, &mut stdout, shutdown_rx).await,
    )
}

/// Run a session against an already prepared gateway, then close it
pub async fn execute<G, R, W>(
    gateway: &G,
    mode: Mode,
    config: &SessionConfig,
    input: R,
    output: &mut W,
    shutdown_rx: broadcast::Receiver<()>,
) -> QueueResult<SessionOutcome>
where
    G: QueueGateway + ?Sized,
    R: AsyncBufRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    let result = match mode {
        Mode::Publish => run_publisher(gateway, config, input, output)
            .await
            .map(SessionOutcome::Published),
        Mode::Consume => Consumer::new(gateway, config)
            .run(input, output, shutdown_rx)
            .await
            .map(|summary| {
                log::debug!(
                    "Consume session ended: {:?}, {} delivered, {} abandoned",
                    summary.reason,
                    summary.delivered,
                    summary.abandoned.len()
                );
                SessionOutcome::Consumed(summary)
            }),
    };

    gateway.close().await;
    result
}

/// Map a session result to the process exit status, logging failures
pub fn exit_status<T>(mode: Mode, result: QueueResult<T>) -> i32 {
    match result {
        Ok(_) => 0,
        Err(e) => {
            log_error_with_context(&e, mode.context());
            1
        }
    }
}
