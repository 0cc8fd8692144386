//! Client-facing sinks for relayed SSE lines.

use async_trait::async_trait;
use bytes::Bytes;
use relay_core::{RelayError, RelayResult};
use tokio::sync::mpsc;

/// Receives SSE lines bound for the client.
///
/// Implementations add their own event framing; callers pass bare lines
/// without terminators. A send error is fatal to the relay: it means the
/// client can no longer be written to.
#[async_trait]
pub trait EventSink: Send {
    /// Forward one SSE line to the client.
    async fn send_line(&mut self, line: &str) -> RelayResult<()>;
}

/// Sink writing framed events into a bounded channel.
///
/// The receiving half is drained by the HTTP response body. The bounded
/// send is the relay's backpressure point: when the client reads slowly the
/// channel fills and the upstream read suspends until capacity frees up.
#[derive(Debug)]
pub struct ChannelSink {
    tx: mpsc::Sender<Bytes>,
}

impl ChannelSink {
    /// Default capacity for relayed streams.
    pub const DEFAULT_CAPACITY: usize = 16;

    /// Wrap an existing sender.
    #[must_use]
    pub fn new(tx: mpsc::Sender<Bytes>) -> Self {
        Self { tx }
    }

    /// Create a sink plus the receiver the response body drains.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<Bytes>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx), rx)
    }
}

#[async_trait]
impl EventSink for ChannelSink {
    async fn send_line(&mut self, line: &str) -> RelayResult<()> {
        let mut framed = String::with_capacity(line.len() + 2);
        framed.push_str(line);
        framed.push_str("\n\n");
        self.tx
            .send(Bytes::from(framed))
            .await
            .map_err(|_| RelayError::CopyBody("client disconnected".to_string()))
    }
}

/// Sink collecting every line in memory, unframed.
///
/// Used by tests and by callers that need the relayed lines after the fact.
#[derive(Debug, Default)]
pub struct CollectSink {
    lines: Vec<String>,
}

impl CollectSink {
    /// Create an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Lines received so far, in order.
    #[must_use]
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Consume the sink, returning its lines.
    #[must_use]
    pub fn into_lines(self) -> Vec<String> {
        self.lines
    }
}

#[async_trait]
impl EventSink for CollectSink {
    async fn send_line(&mut self, line: &str) -> RelayResult<()> {
        self.lines.push(line.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_sink_frames_events() {
        let (mut sink, mut rx) = ChannelSink::bounded(4);
        sink.send_line("data: x").await.unwrap();
        let framed = rx.recv().await.unwrap();
        assert_eq!(&framed[..], b"data: x\n\n");
    }

    #[tokio::test]
    async fn test_channel_sink_errors_after_receiver_drop() {
        let (mut sink, rx) = ChannelSink::bounded(4);
        drop(rx);
        let err = sink.send_line("data: x").await.unwrap_err();
        assert_eq!(err.code(), "copy_response_body_failed");
    }

    #[tokio::test]
    async fn test_collect_sink_keeps_order() {
        let mut sink = CollectSink::new();
        sink.send_line("a").await.unwrap();
        sink.send_line("b").await.unwrap();
        assert_eq!(sink.lines(), ["a", "b"]);
    }
}
