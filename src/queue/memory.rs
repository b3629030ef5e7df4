//! In-process broker used by the test suites
//!
//! Behaves like a single queue on a real broker: published messages are
//! recorded, deliveries are pushed by the test, acknowledgments are recorded
//! by delivery tag.

use crate::queue::error::{QueueError, QueueResult};
use crate::queue::message::{Delivery, DeliveryMode};
use crate::queue::traits::{Acknowledge, DeliveryStream, QueueGateway};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq)]
pub struct PublishedMessage {
    pub exchange: String,
    pub routing_key: String,
    pub body: Vec<u8>,
    pub mode: DeliveryMode,
}

type DeliverySender = mpsc::UnboundedSender<QueueResult<Delivery>>;
type DeliveryReceiver = mpsc::UnboundedReceiver<QueueResult<Delivery>>;

pub struct MemoryBroker {
    published: Mutex<Vec<PublishedMessage>>,
    acked: Arc<Mutex<Vec<u64>>>,
    next_tag: AtomicU64,
    sender: Mutex<Option<DeliverySender>>,
    receiver: Mutex<Option<DeliveryReceiver>>,
    auto_ack: Mutex<Option<bool>>,
    fail_publish_after: Option<usize>,
    fail_ack: Arc<AtomicBool>,
    closed: AtomicBool,
}

impl MemoryBroker {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            published: Mutex::new(Vec::new()),
            acked: Arc::new(Mutex::new(Vec::new())),
            next_tag: AtomicU64::new(1),
            sender: Mutex::new(Some(tx)),
            receiver: Mutex::new(Some(rx)),
            auto_ack: Mutex::new(None),
            fail_publish_after: None,
            fail_ack: Arc::new(AtomicBool::new(false)),
            closed: AtomicBool::new(false),
        }
    }

    /// Broker whose channel breaks after `count` successful publishes
    pub fn failing_after(count: usize) -> Self {
        Self {
            fail_publish_after: Some(count),
            ..Self::new()
        }
    }

    /// Push a delivery to the registered consumer, returning its tag
    pub fn deliver(&self, body: &[u8]) -> u64 {
        let tag = self.next_tag.fetch_add(1, Ordering::SeqCst);
        let acker = Arc::new(MemoryAcker {
            acked: self.acked.clone(),
            fail: self.fail_ack.clone(),
        });
        if let Some(tx) = self.sender.lock().unwrap().as_ref() {
            let _ = tx.send(Ok(Delivery::new(body.to_vec(), tag, acker)));
        }
        tag
    }

    /// Push a broken-channel error into the delivery stream
    pub fn deliver_error(&self, message: &str) {
        if let Some(tx) = self.sender.lock().unwrap().as_ref() {
            let _ = tx.send(Err(QueueError::Consume {
                message: message.to_string(),
            }));
        }
    }

    /// End the delivery stream, as a closed channel would
    pub fn disconnect(&self) {
        self.sender.lock().unwrap().take();
    }

    pub fn fail_acks(&self) {
        self.fail_ack.store(true, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<PublishedMessage> {
        self.published.lock().unwrap().clone()
    }

    pub fn acked(&self) -> Vec<u64> {
        self.acked.lock().unwrap().clone()
    }

    pub fn registered_auto_ack(&self) -> Option<bool> {
        *self.auto_ack.lock().unwrap()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QueueGateway for MemoryBroker {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
        mode: DeliveryMode,
    ) -> QueueResult<()> {
        let mut published = self.published.lock().unwrap();
        if let Some(limit) = self.fail_publish_after {
            if published.len() >= limit {
                return Err(QueueError::Publish {
                    message: "channel closed".to_string(),
                });
            }
        }
        published.push(PublishedMessage {
            exchange: exchange.to_string(),
            routing_key: routing_key.to_string(),
            body: body.to_vec(),
            mode,
        });
        Ok(())
    }

    async fn consume(&self, queue: &str, auto_ack: bool) -> QueueResult<DeliveryStream> {
        let receiver = self.receiver.lock().unwrap().take().ok_or_else(|| {
            QueueError::ConsumeRegistration {
                queue: queue.to_string(),
                message: "consumer already registered".to_string(),
            }
        })?;
        *self.auto_ack.lock().unwrap() = Some(auto_ack);

        let stream = futures::stream::unfold(receiver, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(stream.boxed())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

struct MemoryAcker {
    acked: Arc<Mutex<Vec<u64>>>,
    fail: Arc<AtomicBool>,
}

#[async_trait]
impl Acknowledge for MemoryAcker {
    async fn ack(&self, delivery_tag: u64) -> QueueResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(QueueError::Acknowledge {
                delivery_tag,
                message: "channel closed".to_string(),
            });
        }
        self.acked.lock().unwrap().push(delivery_tag);
        Ok(())
    }
}
