//! Consume pipe: deliveries out on stdout, acknowledgment lines in on stdin
//!
//! Two tasks share the session. The consume loop writes every delivery body
//! as a line and, unless the broker auto-acknowledges, records the delivery
//! in the [`PendingLedger`]. The acknowledgment listener reads lines from its
//! own input and acknowledges the oldest pending delivery with an equal body.
//!
//! # Shutdown
//!
//! ```text
//! Running ──idle timeout (non-blocking) / shutdown signal──▶ Draining ──▶ Stopped
//! ```
//!
//! Each wait races the next delivery against a fresh idle timer. In blocking
//! mode the timer only wakes the loop; in non-blocking mode it stops the
//! session. Draining abandons whatever is still pending.

use crate::core::lines::{write_line, LineReader};
use crate::queue::error::{QueueError, QueueResult};
use crate::queue::ledger::PendingLedger;
use crate::queue::message::Delivery;
use crate::queue::traits::QueueGateway;
use crate::queue::types::SessionConfig;
use futures::StreamExt;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncWrite};
use tokio::sync::{broadcast, mpsc};

/// Consume loop state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    Running,
    Draining,
    Stopped,
}

impl ConsumerState {
    fn advance(self) -> Self {
        match self {
            ConsumerState::Running => ConsumerState::Draining,
            ConsumerState::Draining | ConsumerState::Stopped => ConsumerState::Stopped,
        }
    }
}

/// Why a consume session left the `Running` state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    IdleTimeout,
    ShutdownSignal,
}

/// Final accounting of a consume session that stopped cleanly
#[derive(Debug)]
pub struct ConsumeSummary {
    pub reason: StopReason,
    pub state: ConsumerState,
    pub delivered: u64,
    /// Deliveries still pending at shutdown, oldest first
    pub abandoned: Vec<Delivery>,
}

/// Result of handling one acknowledgment line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckOutcome {
    Acknowledged { delivery_tag: u64 },
    Unmatched,
}

/// Matches acknowledgment lines against the ledger
pub struct AckListener {
    ledger: Arc<PendingLedger>,
}

impl AckListener {
    pub fn new(ledger: Arc<PendingLedger>) -> Self {
        Self { ledger }
    }

    /// Acknowledge the oldest pending delivery whose body equals `line`
    ///
    /// A line with no match is dropped without error: it may belong to a
    /// delivery that was already acknowledged.
    pub async fn handle_line(&self, line: &[u8]) -> QueueResult<AckOutcome> {
        let Some(delivery) = self.ledger.take_match(line)? else {
            log::debug!(
                "No pending delivery matches acknowledgment '{}'",
                String::from_utf8_lossy(line)
            );
            return Ok(AckOutcome::Unmatched);
        };

        delivery.ack().await?;
        log::trace!("Acknowledged delivery {}", delivery.delivery_tag);
        Ok(AckOutcome::Acknowledged {
            delivery_tag: delivery.delivery_tag,
        })
    }

    /// Handle lines until `input` ends; returns how many were acknowledged
    pub async fn run<R>(self, input: R) -> QueueResult<u64>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut reader = LineReader::new(input);
        let mut acknowledged = 0u64;

        while let Some(line) = reader
            .next_line()
            .await
            .map_err(|source| QueueError::Input { source })?
        {
            if let AckOutcome::Acknowledged { .. } = self.handle_line(&line).await? {
                acknowledged += 1;
            }
        }

        log::debug!(
            "Acknowledgment input closed after {} acknowledgments",
            acknowledged
        );
        Ok(acknowledged)
    }
}

/// Runs one consume session against a prepared gateway
pub struct Consumer<'a, G: QueueGateway + ?Sized> {
    gateway: &'a G,
    config: &'a SessionConfig,
    ledger: Arc<PendingLedger>,
}

impl<'a, G: QueueGateway + ?Sized> Consumer<'a, G> {
    pub fn new(gateway: &'a G, config: &'a SessionConfig) -> Self {
        Self::with_ledger(gateway, config, Arc::new(PendingLedger::new()))
    }

    pub fn with_ledger(
        gateway: &'a G,
        config: &'a SessionConfig,
        ledger: Arc<PendingLedger>,
    ) -> Self {
        Self {
            gateway,
            config,
            ledger,
        }
    }

    /// Consume until the idle timeout (non-blocking mode) or a shutdown signal
    ///
    /// `ack_input` is only read in manual-ack mode. Broker, stream and
    /// listener failures end the session with an error.
    pub async fn run<R, W>(
        &self,
        ack_input: R,
        output: &mut W,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> QueueResult<ConsumeSummary>
    where
        R: AsyncBufRead + Unpin + Send + 'static,
        W: AsyncWrite + Unpin,
    {
        let mut deliveries = self
            .gateway
            .consume(&self.config.queue, self.config.auto_ack)
            .await?;

        let (fault_tx, mut fault_rx) = mpsc::channel::<QueueError>(1);
        let listener = if self.config.auto_ack {
            None
        } else {
            let listener = AckListener::new(self.ledger.clone());
            Some(tokio::spawn(async move {
                if let Err(e) = listener.run(ack_input).await {
                    let _ = fault_tx.send(e).await;
                }
            }))
        };
        let _listener_guard = AbortOnDrop(listener);

        let mut state = ConsumerState::Running;
        let mut delivered = 0u64;
        let idle_timeout = self.config.idle_timeout;

        log::info!(
            "Consuming from '{}' (auto-ack: {}, non-blocking: {}, timeout: {:?})",
            self.config.queue,
            self.config.auto_ack,
            self.config.non_blocking,
            idle_timeout
        );

        let reason = loop {
            tokio::select! {
                biased;
                Ok(()) = shutdown_rx.recv() => break StopReason::ShutdownSignal,
                Some(fault) = fault_rx.recv() => return Err(fault),
                next = deliveries.next() => match next {
                    Some(Ok(delivery)) => {
                        self.handle_delivery(delivery, output).await?;
                        delivered += 1;
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        return Err(QueueError::Consume {
                            message: "delivery stream closed by broker".to_string(),
                        })
                    }
                },
                _ = tokio::time::sleep(idle_timeout) => {
                    if self.config.non_blocking {
                        break StopReason::IdleTimeout;
                    }
                    log::trace!("No delivery within {:?}; still waiting", idle_timeout);
                }
            }
        };

        state = state.advance();
        log::debug!("Consumer {:?} ({:?})", state, reason);
        let abandoned = self.ledger.abandon_all()?;
        if !abandoned.is_empty() {
            log::info!(
                "Abandoning {} unacknowledged deliveries; the broker will requeue them",
                abandoned.len()
            );
        }
        state = state.advance();
        log::info!("Consumer stopped after {} deliveries", delivered);

        Ok(ConsumeSummary {
            reason,
            state,
            delivered,
            abandoned,
        })
    }

    async fn handle_delivery<W>(&self, delivery: Delivery, output: &mut W) -> QueueResult<()>
    where
        W: AsyncWrite + Unpin,
    {
        let body = if self.config.auto_ack {
            delivery.body
        } else {
            let body = delivery.body.clone();
            self.ledger.insert(delivery)?;
            body
        };
        write_line(output, &body)
            .await
            .map_err(|source| QueueError::Output { source })
    }
}

struct AbortOnDrop(Option<tokio::task::JoinHandle<()>>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if let Some(handle) = self.0.take() {
            handle.abort();
        }
    }
}
