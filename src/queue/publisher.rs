//! Publish pipe: stdin lines in, messages out, echo on stdout
//!
//! Every line that reaches stdout has been accepted by the broker channel,
//! so the output of `publish` is a running confirmation of what was sent.

use crate::core::lines::{write_line, LineReader};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::traits::QueueGateway;
use crate::queue::types::SessionConfig;
use tokio::io::{AsyncBufRead, AsyncWrite};

/// Publish every line of `input` to the session's queue
///
/// Returns the number of lines published once `input` reaches end of
/// stream. The first publish, read or write failure ends the run.
pub async fn run_publisher<G, R, W>(
    gateway: &G,
    config: &SessionConfig,
    input: R,
    output: &mut W,
) -> QueueResult<u64>
where
    G: QueueGateway + ?Sized,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut reader = LineReader::new(input);
    let mut published = 0u64;

    log::debug!(
        "Publishing to exchange '{}' with routing key '{}' ({:?})",
        config.exchange,
        config.queue,
        config.delivery_mode
    );

    while let Some(line) = reader
        .next_line()
        .await
        .map_err(|source| QueueError::Input { source })?
    {
        gateway
            .publish(&config.exchange, &config.queue, &line, config.delivery_mode)
            .await?;
        write_line(output, &line)
            .await
            .map_err(|source| QueueError::Output { source })?;
        published += 1;
        log::trace!("Published message #{} ({} bytes)", published, line.len());
    }

    log::info!("Input closed after {} published messages", published);
    Ok(published)
}
