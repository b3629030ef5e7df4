//! Seams between the pipe logic and the broker client

use crate::queue::error::QueueResult;
use crate::queue::message::{Delivery, DeliveryMode};
use async_trait::async_trait;
use futures::stream::BoxStream;

/// Lazy, unbounded sequence of deliveries from one consumer registration
///
/// It cannot be restarted: once the channel closes the stream ends.
pub type DeliveryStream = BoxStream<'static, QueueResult<Delivery>>;

/// Connection + channel to a broker, already prepared for one queue
#[async_trait]
pub trait QueueGateway: Send + Sync {
    /// Publish `body` to `exchange` with `routing_key`
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
        mode: DeliveryMode,
    ) -> QueueResult<()>;

    /// Register a consumer on `queue`
    ///
    /// With `auto_ack` the broker treats every delivery as acknowledged as
    /// soon as it is sent.
    async fn consume(&self, queue: &str, auto_ack: bool) -> QueueResult<DeliveryStream>;

    /// Release the channel and connection; errors are logged, not returned
    async fn close(&self);
}

/// Broker-side handle able to acknowledge one delivery
#[async_trait]
pub trait Acknowledge: Send + Sync {
    async fn ack(&self, delivery_tag: u64) -> QueueResult<()>;
}
