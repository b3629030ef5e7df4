//! Message types flowing between the broker and the pipes
//!
//! A [`Delivery`] is owned by exactly one place at a time: the delivery
//! stream, then the consume loop, then (in manual-ack mode) the pending
//! ledger until it is acknowledged or abandoned.

use crate::queue::error::QueueResult;
use crate::queue::traits::Acknowledge;
use std::fmt;
use std::sync::Arc;

/// Persistence requested for published messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryMode {
    /// Broker keeps the message in memory only
    Transient,
    /// Broker persists the message across restarts
    Persistent,
}

impl DeliveryMode {
    pub fn from_transient_flag(transient: bool) -> Self {
        if transient {
            DeliveryMode::Transient
        } else {
            DeliveryMode::Persistent
        }
    }

    /// AMQP `delivery-mode` property value
    pub fn as_amqp(self) -> u8 {
        match self {
            DeliveryMode::Transient => 1,
            DeliveryMode::Persistent => 2,
        }
    }
}

/// One message handed to us by the broker
pub struct Delivery {
    pub body: Vec<u8>,
    pub delivery_tag: u64,
    acker: Arc<dyn Acknowledge>,
}

impl Delivery {
    pub fn new(body: Vec<u8>, delivery_tag: u64, acker: Arc<dyn Acknowledge>) -> Self {
        Self {
            body,
            delivery_tag,
            acker,
        }
    }

    /// Single (non-multiple) acknowledgment of this delivery
    pub async fn ack(&self) -> QueueResult<()> {
        self.acker.ack(self.delivery_tag).await
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("delivery_tag", &self.delivery_tag)
            .field("body", &String::from_utf8_lossy(&self.body))
            .finish()
    }
}
