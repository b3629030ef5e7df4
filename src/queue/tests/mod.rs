//! Test modules for the pipe bridge
//!
//! Tests are organized by functional area; all of them run against the
//! in-process broker.


use crate::queue::error::QueueResult;
use crate::queue::message::Delivery;
use crate::queue::traits::Acknowledge;
use crate::queue::types::SessionConfig;
use async_trait::async_trait;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::io::{AsyncRead, ReadBuf};

/// Acker that records the tags it acknowledged
#[derive(Default)]
pub(super) struct RecordingAcker {
    pub acked: Mutex<Vec<u64>>,
}

#[async_trait]
impl Acknowledge for RecordingAcker {
    async fn ack(&self, delivery_tag: u64) -> QueueResult<()> {
        self.acked.lock().unwrap().push(delivery_tag);
        Ok(())
    }
}

pub(super) fn delivery(acker: &Arc<RecordingAcker>, body: &str, tag: u64) -> Delivery {
    Delivery::new(body.as_bytes().to_vec(), tag, acker.clone())
}

pub(super) fn session(non_blocking: bool, auto_ack: bool, idle_timeout: Duration) -> SessionConfig {
    let mut config = SessionConfig::new("test-queue");
    config.non_blocking = non_blocking;
    config.auto_ack = auto_ack;
    config.idle_timeout = idle_timeout;
    config
}

pub(super) fn bodies(list: &[&str]) -> Vec<Vec<u8>> {
    list.iter().map(|b| b.as_bytes().to_vec()).collect()
}

/// Reader whose every read fails, standing in for a broken stdin
pub(super) struct FailingReader;

impl AsyncRead for FailingReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        Poll::Ready(Err(std::io::Error::new(
            std::io::ErrorKind::BrokenPipe,
            "stdin gone",
        )))
    }
}
