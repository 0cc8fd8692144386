//! Streaming SSE relay.
//!
//! Scans an upstream byte stream into SSE lines, forwards them to the client
//! through an [`EventSink`], and accumulates the response text and usage the
//! billing pipeline needs. The loop has two fatal failure classes, upstream
//! read errors and client write errors; everything else (undecodable chunks,
//! masking failures) degrades to forwarding the original line.

use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use relay_core::{ChatChunk, CompletionChunk, RedirectionContext, RelayError, RelayMode, Usage};
use tracing::debug;

use crate::mask;
use crate::sink::EventSink;
use crate::sse::{self, LineBuffer, SseLine};

/// How the relay handled one SSE line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineDisposition {
    /// Decoded (and possibly masked) payload sent to the client.
    Forwarded,
    /// Framing noise or suppressed keep-alive frame; nothing sent.
    Dropped,
    /// Undecodable payload forwarded verbatim.
    PassedThroughRaw,
}

/// Everything a finished stream relay reports to its caller.
///
/// Accumulation is reported even when the relay ends in error, so billing
/// can account for partially delivered streams.
#[derive(Debug, Default)]
pub struct StreamOutcome {
    /// Fatal error, if the relay ended abnormally.
    pub error: Option<RelayError>,
    /// Concatenated delta text of every decoded chunk, in arrival order.
    pub text: String,
    /// Usage from the last usage-bearing chunk, if any arrived.
    pub usage: Option<Usage>,
    /// Lines sent to the client after a successful decode.
    pub forwarded: u64,
    /// Lines suppressed (noise and keep-alive frames).
    pub dropped: u64,
    /// Lines forwarded verbatim after a failed decode.
    pub passed_through_raw: u64,
}

impl StreamOutcome {
    /// True when the relay ran to completion without a fatal error.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    fn record(&mut self, disposition: LineDisposition) {
        match disposition {
            LineDisposition::Forwarded => self.forwarded += 1,
            LineDisposition::Dropped => self.dropped += 1,
            LineDisposition::PassedThroughRaw => self.passed_through_raw += 1,
        }
    }
}

/// Streaming relay for one request.
#[derive(Debug)]
pub struct StreamRelay {
    mode: RelayMode,
    redirection: RedirectionContext,
}

impl StreamRelay {
    /// Create a relay for the given mode and redirection record.
    #[must_use]
    pub fn new(mode: RelayMode, redirection: RedirectionContext) -> Self {
        Self { mode, redirection }
    }

    /// Drive `upstream` to completion, forwarding into `sink`.
    ///
    /// Guarantees the client observes exactly one terminal sentinel unless
    /// the client itself became unwritable: an upstream sentinel is forwarded
    /// verbatim and remembered, and a synthetic one is emitted when the
    /// stream ends without it, including after an upstream read error.
    pub async fn run<S, E>(&self, upstream: S, sink: &mut dyn EventSink) -> StreamOutcome
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: std::fmt::Display,
    {
        let mut upstream = std::pin::pin!(upstream);
        let mut lines = LineBuffer::new();
        let mut outcome = StreamOutcome::default();
        let mut done_rendered = false;

        'read: while let Some(chunk) = upstream.next().await {
            let bytes = match chunk {
                Ok(bytes) => bytes,
                Err(e) => {
                    outcome.error = Some(RelayError::StreamRead(e.to_string()));
                    break 'read;
                }
            };
            lines.push(&bytes);
            while let Some(line) = lines.next_line() {
                match self
                    .relay_line(&line, &mut outcome, &mut done_rendered, sink)
                    .await
                {
                    Ok(disposition) => outcome.record(disposition),
                    Err(e) => {
                        outcome.error = Some(e);
                        break 'read;
                    }
                }
            }
        }

        // A final line without a terminator still counts.
        if !client_unwritable(&outcome) {
            if let Some(line) = lines.take_residue() {
                match self
                    .relay_line(&line, &mut outcome, &mut done_rendered, sink)
                    .await
                {
                    Ok(disposition) => outcome.record(disposition),
                    Err(e) => outcome.error = Some(e),
                }
            }
        }

        // The stream must close well-formed even after an upstream failure.
        if !done_rendered && !client_unwritable(&outcome) {
            if let Err(e) = sink.send_line(&sse::done_line()).await {
                outcome.error.get_or_insert(e);
            }
        }

        outcome
    }

    /// Relay one scanned line. Errors are client-write failures only.
    async fn relay_line(
        &self,
        line: &str,
        outcome: &mut StreamOutcome,
        done_rendered: &mut bool,
        sink: &mut dyn EventSink,
    ) -> Result<LineDisposition, RelayError> {
        match sse::classify(line) {
            SseLine::Noise => Ok(LineDisposition::Dropped),
            SseLine::Done => {
                sink.send_line(line).await?;
                *done_rendered = true;
                Ok(LineDisposition::Forwarded)
            }
            SseLine::Data(payload) => match self.mode {
                RelayMode::Chat => self.relay_chat_line(line, payload, outcome, sink).await,
                RelayMode::Completion => {
                    self.relay_completion_line(line, payload, outcome, sink).await
                }
            },
        }
    }

    async fn relay_chat_line(
        &self,
        line: &str,
        payload: &str,
        outcome: &mut StreamOutcome,
        sink: &mut dyn EventSink,
    ) -> Result<LineDisposition, RelayError> {
        let mut chunk: ChatChunk = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                debug!(error = %e, payload = %payload, "Undecodable stream chunk, forwarding verbatim");
                sink.send_line(line).await?;
                return Ok(LineDisposition::PassedThroughRaw);
            }
        };

        if chunk.is_keep_alive() {
            return Ok(LineDisposition::Dropped);
        }

        if self.redirection.was_redirected {
            match mask::mask_chunk(&mut chunk, &self.redirection) {
                Some(encoded) => {
                    sink.send_line(&format!("{}{encoded}", sse::DATA_PREFIX))
                        .await?;
                }
                None => sink.send_line(line).await?,
            }
        } else {
            sink.send_line(line).await?;
        }

        for choice in &chunk.choices {
            if let Some(content) = &choice.delta.content {
                outcome.text.push_str(content);
            }
        }
        if let Some(usage) = chunk.usage {
            outcome.usage = Some(usage);
        }
        Ok(LineDisposition::Forwarded)
    }

    /// Completion mode forwards raw lines; decoding is for accounting only.
    async fn relay_completion_line(
        &self,
        line: &str,
        payload: &str,
        outcome: &mut StreamOutcome,
        sink: &mut dyn EventSink,
    ) -> Result<LineDisposition, RelayError> {
        sink.send_line(line).await?;
        match serde_json::from_str::<CompletionChunk>(payload) {
            Ok(chunk) => {
                for choice in &chunk.choices {
                    outcome.text.push_str(&choice.text);
                }
                Ok(LineDisposition::Forwarded)
            }
            Err(e) => {
                debug!(error = %e, "Undecodable completion chunk, accumulation skipped");
                Ok(LineDisposition::PassedThroughRaw)
            }
        }
    }
}

fn client_unwritable(outcome: &StreamOutcome) -> bool {
    matches!(outcome.error, Some(RelayError::CopyBody(_)))
}
