use crate::core::AzureError;
use async_stream::stream;
use futures::{Stream, StreamExt};
use log::{debug, warn};
use reqwest::Response;
use serde::de::DeserializeOwned;
use std::fmt::Display;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

const FIELD_MARKER: &str = "data:";
const EVENT_DELIMITERS: [&str; 2] = ["\n\n", "\r\n\r\n"];
const DONE_SENTINEL: &str = "[DONE]";

/// Lazy, ordered sequence of decoded events from one response body.
pub type EventStream<T> = Pin<Box<dyn Stream<Item = Result<T, AzureError>> + Send>>;

/// A complete frame extracted from the buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// The trimmed data payload of one event
    Data(String),
    /// The `[DONE]` sentinel
    Done,
}

/// Accumulates body fragments until whole frames can be extracted.
///
/// Owned by exactly one stream. Incomplete UTF-8 sequences at the end of a
/// fragment are held back until the next fragment completes them.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    text: String,
    pending: Vec<u8>,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            text: String::with_capacity(1024),
            pending: Vec::new(),
        }
    }

    /// Appends one transport fragment.
    pub fn push(&mut self, chunk: &[u8]) {
        self.pending.extend_from_slice(chunk);
        let mut rest = std::mem::take(&mut self.pending);
        let mut start = 0;

        loop {
            match std::str::from_utf8(&rest[start..]) {
                Ok(valid) => {
                    self.text.push_str(valid);
                    break;
                }
                Err(e) => {
                    let valid_end = start + e.valid_up_to();
                    self.text
                        .push_str(&String::from_utf8_lossy(&rest[start..valid_end]));
                    match e.error_len() {
                        Some(len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            start = valid_end + len;
                        }
                        None => {
                            // Truncated sequence; wait for the next fragment
                            rest.drain(..valid_end);
                            self.pending = rest;
                            break;
                        }
                    }
                }
            }
        }
    }

    /// Extracts the next complete frame, skipping empty payloads.
    ///
    /// Every terminated block is removed from the buffer, including blocks
    /// without a `data:` line such as comments and keep-alives. Returns
    /// `None` until a terminator arrives.
    pub fn next_frame(&mut self) -> Option<Frame> {
        loop {
            let (end, delimiter_len) = self.find_terminator()?;

            let payload = data_payload(&self.text[..end]);
            self.text.drain(..end + delimiter_len);

            let payload = payload.trim();
            if payload == DONE_SENTINEL {
                return Some(Frame::Done);
            }
            if payload.is_empty() {
                continue;
            }
            return Some(Frame::Data(payload.to_string()));
        }
    }

    fn find_terminator(&self) -> Option<(usize, usize)> {
        EVENT_DELIMITERS
            .iter()
            .filter_map(|delimiter| {
                self.text
                    .find(delimiter)
                    .map(|pos| (pos, delimiter.len()))
            })
            .min_by_key(|(pos, _)| *pos)
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.pending.is_empty()
    }
}

/// Joins the values of every `data:` line in a frame block.
fn data_payload(block: &str) -> String {
    let mut data = String::with_capacity(block.len());
    for line in block.lines() {
        if let Some(value) = line.strip_prefix(FIELD_MARKER) {
            if !data.is_empty() {
                data.push('\n');
            }
            data.push_str(value.strip_prefix(' ').unwrap_or(value));
        }
    }
    data
}

/// Decodes a stream of body fragments into typed events.
///
/// Malformed frames are logged and skipped. The stream ends at the `[DONE]`
/// sentinel, at transport EOF, on the first transport error (yielded as
/// `StreamingError`), or when `cancel` fires. Dropping the returned stream
/// drops the transport body as well.
pub fn decode_events<T, S, B, E>(body: S, cancel: CancellationToken) -> EventStream<T>
where
    T: DeserializeOwned + Send + 'static,
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    Box::pin(stream! {
        let mut body = Box::pin(body);
        let mut buffer = FrameBuffer::new();

        'read: loop {
            let chunk = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!("event stream cancelled by consumer");
                    break 'read;
                }
                chunk = body.next() => chunk,
            };

            let chunk = match chunk {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    yield Err(AzureError::StreamingError(e.to_string()));
                    break 'read;
                }
                None => break 'read,
            };

            buffer.push(chunk.as_ref());
            while let Some(frame) = buffer.next_frame() {
                if cancel.is_cancelled() {
                    debug!("event stream cancelled by consumer");
                    break 'read;
                }
                match frame {
                    Frame::Done => break 'read,
                    Frame::Data(payload) => match serde_json::from_str::<T>(&payload) {
                        Ok(event) => yield Ok(event),
                        Err(e) => warn!("skipping malformed event frame: {e}"),
                    },
                }
            }
        }

        if !buffer.is_empty() {
            debug!("discarding incomplete trailing frame");
        }
    })
}

/// Extension trait for converting a Response into a stream of typed events.
pub trait EventSourceExt {
    /// Converts the response body into a stream of decoded events.
    fn events<T>(self, cancel: CancellationToken) -> EventStream<T>
    where
        T: DeserializeOwned + Send + 'static;
}

impl EventSourceExt for Response {
    fn events<T>(self, cancel: CancellationToken) -> EventStream<T>
    where
        T: DeserializeOwned + Send + 'static,
    {
        decode_events(self.bytes_stream(), cancel)
    }
}
