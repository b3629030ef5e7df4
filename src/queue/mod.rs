//! Line-oriented bridge between unix pipes and an AMQP queue
//!
//! # Overview
//!
//! - **Publish**: every stdin line becomes one message on the queue and is
//!   echoed to stdout once the channel accepted it.
//! - **Consume**: every delivery body is written to stdout as a line. In
//!   manual-ack mode the delivery stays pending until a line with the same
//!   body arrives on the acknowledgment input.
//!
//! # Architecture
//!
//! ```text
//!   stdin ──▶ run_publisher ──publish──▶ ┌──────────────┐
//!                                        │ QueueGateway │◀── AmqpGateway (lapin)
//!   stdout ◀── Consumer loop ◀─consume── └──────┬───────┘
//!                 │ insert                      │ ack
//!                 ▼                             │
//!          ┌───────────────┐  take_match  ┌─────┴───────┐
//!          │ PendingLedger │◀─────────────│ AckListener │◀── stdin
//!          └───────────────┘              └─────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use pipecat::queue::{AmqpGateway, Consumer, QueueGateway, SessionConfig};
//! use pipecat::core::shutdown::ShutdownCoordinator;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = SessionConfig::new("jobs");
//! config.non_blocking = true;
//!
//! let gateway = AmqpGateway::prepare(&config.amqp_uri, &config.queue, true).await?;
//! let (_coordinator, shutdown_rx) = ShutdownCoordinator::new();
//! let mut stdout = tokio::io::stdout();
//! let stdin = tokio::io::BufReader::new(tokio::io::stdin());
//!
//! let summary = Consumer::new(&gateway, &config)
//!     .run(stdin, &mut stdout, shutdown_rx)
//!     .await?;
//! println!("abandoned {}", summary.abandoned.len());
//! gateway.close().await;
//! # Ok(())
//! # }
//! ```

mod amqp;
mod consumer;
mod error;
mod ledger;
mod message;
mod publisher;
mod traits;
mod types;

#[cfg(test)]
pub(crate) mod memory;

pub use amqp::AmqpGateway;
pub use consumer::{AckListener, AckOutcome, ConsumeSummary, Consumer, ConsumerState, StopReason};
pub use error::{QueueError, QueueResult};
pub use ledger::{BodyIndex, DeliveryIndex, LinearIndex, PendingLedger};
pub use message::{Delivery, DeliveryMode};
pub use publisher::run_publisher;
pub use traits::{Acknowledge, DeliveryStream, QueueGateway};
pub use types::{SessionConfig, DEFAULT_AMQP_URI, DEFAULT_IDLE_TIMEOUT};

#[cfg(test)]
mod tests;
