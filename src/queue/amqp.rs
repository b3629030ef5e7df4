//! AMQP 0-9-1 gateway backed by lapin

use crate::queue::error::{QueueError, QueueResult};
use crate::queue::message::{Delivery, DeliveryMode};
use crate::queue::traits::{Acknowledge, DeliveryStream, QueueGateway};
use async_trait::async_trait;
use futures::StreamExt;
use lapin::acker::Acker;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use std::sync::Arc;

const REPLY_SUCCESS: u16 = 200;

/// Connection and channel to a broker
pub struct AmqpGateway {
    connection: Connection,
    channel: Channel,
}

impl AmqpGateway {
    /// Connect, open a channel and optionally declare `queue` as durable
    ///
    /// Whatever was opened before a failing step is closed again before the
    /// error is returned.
    pub async fn prepare(uri: &str, queue: &str, create_queue: bool) -> QueueResult<Self> {
        log::debug!("Connecting to AMQP broker");
        let connection = Connection::connect(uri, ConnectionProperties::default())
            .await
            .map_err(|e| QueueError::Connection {
                message: e.to_string(),
            })?;

        let channel = match connection.create_channel().await {
            Ok(channel) => channel,
            Err(e) => {
                let _ = connection.close(REPLY_SUCCESS, "channel failed").await;
                return Err(QueueError::Channel {
                    message: e.to_string(),
                });
            }
        };

        let gateway = Self {
            connection,
            channel,
        };

        if create_queue {
            if let Err(e) = gateway.declare_queue(queue).await {
                gateway.close().await;
                return Err(e);
            }
        }

        log::info!("Connected to AMQP broker (queue '{}')", queue);
        Ok(gateway)
    }

    async fn declare_queue(&self, queue: &str) -> QueueResult<()> {
        let options = QueueDeclareOptions {
            durable: true,
            ..QueueDeclareOptions::default()
        };
        self.channel
            .queue_declare(queue, options, FieldTable::default())
            .await
            .map_err(|e| QueueError::Declaration {
                queue: queue.to_string(),
                message: e.to_string(),
            })?;
        log::debug!("Declared durable queue '{}'", queue);
        Ok(())
    }
}

#[async_trait]
impl QueueGateway for AmqpGateway {
    async fn publish(
        &self,
        exchange: &str,
        routing_key: &str,
        body: &[u8],
        mode: DeliveryMode,
    ) -> QueueResult<()> {
        let properties = BasicProperties::default()
            .with_content_type("text/plain".into())
            .with_delivery_mode(mode.as_amqp());

        let confirm = self
            .channel
            .basic_publish(
                exchange,
                routing_key,
                BasicPublishOptions::default(),
                body,
                properties,
            )
            .await
            .map_err(|e| QueueError::Publish {
                message: e.to_string(),
            })?;
        confirm.await.map_err(|e| QueueError::Publish {
            message: e.to_string(),
        })?;
        Ok(())
    }

    async fn consume(&self, queue: &str, auto_ack: bool) -> QueueResult<DeliveryStream> {
        let options = BasicConsumeOptions {
            no_ack: auto_ack,
            ..BasicConsumeOptions::default()
        };
        let consumer_tag = format!("pipecat-{}", std::process::id());
        let consumer = self
            .channel
            .basic_consume(queue, &consumer_tag, options, FieldTable::default())
            .await
            .map_err(|e| QueueError::ConsumeRegistration {
                queue: queue.to_string(),
                message: e.to_string(),
            })?;
        log::debug!(
            "Registered consumer '{}' on '{}' (auto-ack: {})",
            consumer_tag,
            queue,
            auto_ack
        );

        let stream = consumer.map(|item| match item {
            Ok(delivery) => Ok(Delivery::new(
                delivery.data,
                delivery.delivery_tag,
                Arc::new(AmqpAcker(delivery.acker)),
            )),
            Err(e) => Err(QueueError::Consume {
                message: e.to_string(),
            }),
        });
        Ok(stream.boxed())
    }

    async fn close(&self) {
        if let Err(e) = self.channel.close(REPLY_SUCCESS, "Bye").await {
            log::debug!("Closing channel: {}", e);
        }
        if let Err(e) = self.connection.close(REPLY_SUCCESS, "Bye").await {
            log::debug!("Closing connection: {}", e);
        }
    }
}

struct AmqpAcker(Acker);

#[async_trait]
impl Acknowledge for AmqpAcker {
    async fn ack(&self, delivery_tag: u64) -> QueueResult<()> {
        self.0
            .ack(BasicAckOptions { multiple: false })
            .await
            .map_err(|e| QueueError::Acknowledge {
                delivery_tag,
                message: e.to_string(),
            })
    }
}
