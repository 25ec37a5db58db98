//! Response reader.
//!
//! [`ResponseBuffer`] accumulates inbound chunks and yields one
//! [`RawResponse`] once its header line and (for data-bearing statuses) the
//! full payload have arrived. It is a two state machine:
//! - `WaitingForHeaders`: no CRLF seen yet
//! - `WaitingForPayload`: header line consumed, need `data_length` more bytes
//!
//! [`read_response`] drives a buffer from the connection's event stream and
//! enforces the payload read timeout.
//!
//! # Example
//!
//! ```
//! use beanstalk_client::protocol::{ResponseBuffer, ResponseStatus};
//!
//! let mut buffer = ResponseBuffer::new();
//! assert!(buffer.push(b"RESERVED 7 5\r\nhel").unwrap().is_none());
//! assert!(buffer.is_awaiting_payload());
//!
//! let response = buffer.push(b"lo\r\n").unwrap().unwrap();
//! assert_eq!(response.status, ResponseStatus::Reserved);
//! assert_eq!(response.headers, vec!["7".to_string()]);
//! assert_eq!(&response.data.unwrap()[..], b"hello\r\n");
//! ```

use std::mem;
use std::time::Duration;

use bytes::{Buf, Bytes, BytesMut};
use tokio::time::Instant;

use super::headers::{parse_response_headers, ResponseHeaders};
use super::status::ResponseStatus;
use crate::error::{ClientError, Error, ResponseError, Result};
use crate::transport::{Connection, ConnectionEvent};

/// A complete response as read from the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// Status token.
    pub status: ResponseStatus,
    /// Positional header tokens.
    pub headers: Vec<String>,
    /// Payload bytes including the trailing CRLF, for data-bearing statuses.
    pub data: Option<Bytes>,
}

#[derive(Debug)]
enum State {
    WaitingForHeaders,
    WaitingForPayload { headers: ResponseHeaders },
}

/// Incremental assembler for a single response.
#[derive(Debug)]
pub struct ResponseBuffer {
    buffer: BytesMut,
    state: State,
}

impl ResponseBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4 * 1024),
            state: State::WaitingForHeaders,
        }
    }

    /// Append a chunk and try to complete the response.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(response))` once the response is complete
    /// - `Ok(None)` if more bytes are needed
    ///
    /// # Errors
    ///
    /// Returns error if the header line is malformed.
    pub fn push(&mut self, chunk: &[u8]) -> std::result::Result<Option<RawResponse>, ResponseError> {
        self.buffer.extend_from_slice(chunk);
        self.try_complete()
    }

    fn try_complete(&mut self) -> std::result::Result<Option<RawResponse>, ResponseError> {
        match &mut self.state {
            State::WaitingForHeaders => {
                let Some(headers) = parse_response_headers(&self.buffer)? else {
                    return Ok(None);
                };
                self.buffer.advance(headers.headers_line_len);

                if !headers.has_payload {
                    return Ok(Some(RawResponse {
                        status: headers.status,
                        headers: headers.headers,
                        data: None,
                    }));
                }

                self.state = State::WaitingForPayload { headers };
                self.try_complete()
            }

            State::WaitingForPayload { headers } => {
                if self.buffer.len() < headers.data_length {
                    return Ok(None);
                }

                let data = self.buffer.split_to(headers.data_length).freeze();
                let response = RawResponse {
                    status: headers.status,
                    headers: mem::take(&mut headers.headers),
                    data: Some(data),
                };
                self.state = State::WaitingForHeaders;

                Ok(Some(response))
            }
        }
    }

    /// Whether the header line is parsed and payload bytes are still missing.
    pub fn is_awaiting_payload(&self) -> bool {
        matches!(self.state, State::WaitingForPayload { .. })
    }

    /// Number of buffered bytes not yet consumed.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether no unconsumed bytes are buffered.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

impl Default for ResponseBuffer {
    fn default() -> Self {
        Self::new()
    }
}

/// Read exactly one response from `conn`.
///
/// Waits for the header line without a deadline (a plain `reserve` blocks
/// server-side for as long as it likes). Once the header line of a
/// data-bearing status is in, the rest of the payload must arrive within
/// `timeout`.
///
/// # Errors
///
/// - [`ClientError::ResponseRead`] if the payload does not complete in time
/// - [`ClientError::ConnectionClosed`] if the remote side closes first
/// - [`Error::Io`] on a transport error
/// - [`Error::Response`] on a malformed header line
pub async fn read_response(conn: &Connection, timeout: Duration) -> Result<RawResponse> {
    let mut events = conn.events().await;
    let mut buffer = ResponseBuffer::new();
    let mut deadline: Option<Instant> = None;

    loop {
        let event = match deadline {
            None => events.next().await,
            Some(deadline) => match tokio::time::timeout_at(deadline, events.next()).await {
                Ok(event) => event,
                Err(_) => {
                    tracing::warn!(
                        "Response payload incomplete after {:?}, {} bytes buffered",
                        timeout,
                        buffer.len()
                    );
                    return Err(ClientError::ResponseRead { timeout }.into());
                }
            },
        };

        match event {
            Some(ConnectionEvent::Data(chunk)) => {
                if let Some(response) = buffer.push(&chunk)? {
                    if !buffer.is_empty() {
                        tracing::warn!("Discarding {} bytes past the response", buffer.len());
                    }
                    return Ok(response);
                }
                if deadline.is_none() && buffer.is_awaiting_payload() {
                    deadline = Some(Instant::now() + timeout);
                }
            }
            Some(ConnectionEvent::Open(_)) => {}
            Some(ConnectionEvent::Error(e)) => return Err(Error::Io(e)),
            Some(ConnectionEvent::Close) | None => {
                return Err(ClientError::ConnectionClosed.into());
            }
        }
    }
}
