//! Push transport for the notification stream.
//!
//! The server keeps `GET /api/notifications?userId=<id>` open and writes one
//! Server-Sent Events frame per notification. [`HttpEventTransport`] turns
//! the response body into a stream of frame bodies; [`SseDecoder`] does the
//! framing and copes with frames split across network chunks.

use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use futures::{stream, Stream, StreamExt};
use tracing::{info, trace};

use crate::error::TransportError;

/// Frame bodies as they arrive. The stream ending means the server closed it.
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<String, TransportError>> + Send>>;

#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Open the push channel. Resolves once the server has accepted it.
    async fn open(&self, url: &str) -> Result<FrameStream, TransportError>;
}

// ============================================================================
// SSE framing
// ============================================================================

/// Incremental Server-Sent Events decoder.
///
/// Only `data:` lines carry the payload; multiple `data:` lines in one frame
/// are joined with `\n`. `event:`, `id:`, `retry:` and comment lines are
/// skipped.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning every frame it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut line: Vec<u8> = self.buffer.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            if let Some(frame) = self.accept_line(&String::from_utf8_lossy(&line)) {
                frames.push(frame);
            }
        }
        frames
    }

    fn accept_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            if self.data.is_empty() {
                return None;
            }
            return Some(std::mem::take(&mut self.data).join("\n"));
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" | "id" | "retry" => {}
            other => trace!("ignoring unknown SSE field: {}", other),
        }
        None
    }
}

// ============================================================================
// HTTP transport
// ============================================================================

pub struct HttpEventTransport {
    client: reqwest::Client,
}

impl fmt::Debug for HttpEventTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpEventTransport").finish()
    }
}

impl HttpEventTransport {
    pub fn new() -> Result<Self, TransportError> {
        // No overall request timeout: the stream is meant to stay open.
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .pool_max_idle_per_host(1)
            .build()
            .map_err(|e| TransportError::connection(format!("failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventTransport for HttpEventTransport {
    async fn open(&self, url: &str) -> Result<FrameStream, TransportError> {
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .header(reqwest::header::CACHE_CONTROL, "no-cache")
            .send()
            .await
            .map_err(|e| TransportError::connection(format!("failed to open stream: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::Http {
                status: status.as_u16(),
                message: body,
            });
        }

        info!("notification stream open at {}", url);

        let frames = response
            .bytes_stream()
            .scan(SseDecoder::new(), |decoder, chunk| {
                let items: Vec<Result<String, TransportError>> = match chunk {
                    Ok(bytes) => decoder.push(&bytes).into_iter().map(Ok).collect(),
                    Err(e) => vec![Err(TransportError::Stream(e.to_string()))],
                };
                futures::future::ready(Some(stream::iter(items)))
            })
            .flatten();

        Ok(Box::pin(frames))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_single_frame() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"data: {\"type\":\"taskCreated\"}\n\n");
        assert_eq!(frames, vec!["{\"type\":\"taskCreated\"}".to_string()]);
    }

    #[test]
    fn frames_split_across_chunks_are_reassembled() {
        let mut decoder = SseDecoder::new();
        assert!(decoder.push(b"data: {\"type\":").is_empty());
        assert!(decoder.push(b"\"leaveApproved\"}\r\n").is_empty());
        let frames = decoder.push(b"\r\ndata: {\"type\":\"x\"}\n\n");
        assert_eq!(
            frames,
            vec![
                "{\"type\":\"leaveApproved\"}".to_string(),
                "{\"type\":\"x\"}".to_string()
            ]
        );
    }

    #[test]
    fn multi_line_data_is_joined() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b"event: message\nid: 7\ndata: line 1\ndata: line 2\n\n");
        assert_eq!(frames, vec!["line 1\nline 2".to_string()]);
    }

    #[test]
    fn comments_and_empty_frames_are_skipped() {
        let mut decoder = SseDecoder::new();
        let frames = decoder.push(b": keep-alive\n\nretry: 3000\n\n");
        assert!(frames.is_empty());
    }

    #[test]
    fn multibyte_characters_split_between_chunks_survive() {
        let mut decoder = SseDecoder::new();
        let text = "data: {\"note\":\"réunion\"}\n\n".as_bytes();
        let split = text.iter().position(|b| *b == 0xC3).unwrap() + 1;
        assert!(decoder.push(&text[..split]).is_empty());
        let frames = decoder.push(&text[split..]);
        assert_eq!(frames, vec!["{\"note\":\"réunion\"}".to_string()]);
    }
}
