//! Error types for beanstalk-client.
//!
//! Every failure surfaces as [`Error`], which wraps one closed set of codes
//! per failure kind. Use [`Error::code`] for a stable string classification.

use std::time::Duration;

use thiserror::Error;

use crate::protocol::{Command, ResponseStatus};

/// Main error type for all client operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid connection state transition.
    #[error(transparent)]
    Connection(#[from] ConnectionError),

    /// Client-side failure (payload, read timeout, disconnect).
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Command construction or response status failure.
    #[error(transparent)]
    Command(#[from] CommandError),

    /// Malformed response framing.
    #[error(transparent)]
    Response(#[from] ResponseError),

    /// Job payload encode/decode failure.
    #[error(transparent)]
    Serializer(#[from] SerializerError),

    /// Meaningful server outcome reported as an error.
    #[error(transparent)]
    Server(#[from] ServerError),

    /// Argument rejected before any I/O.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// I/O error on the transport.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Connection(e) => e.code(),
            Error::Client(e) => e.code(),
            Error::Command(e) => e.code(),
            Error::Response(e) => e.code(),
            Error::Serializer(e) => e.code(),
            Error::Server(e) => e.code(),
            Error::Validation(_) => "ErrValidation",
            Error::Io(_) => "ErrIo",
        }
    }

    /// Whether the connection should be considered unusable after this error.
    ///
    /// A timed out or malformed response leaves unread bytes on the wire, so the
    /// caller is expected to disconnect and reconnect.
    pub fn is_connection_compromised(&self) -> bool {
        matches!(
            self,
            Error::Io(_)
                | Error::Response(_)
                | Error::Client(ClientError::ResponseRead { .. })
                | Error::Client(ClientError::ConnectionClosed)
        )
    }
}

/// Connection state machine violations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionError {
    /// Connection is opening or closing.
    #[error("connection is already changing its state")]
    ChangingState,

    /// `open` called on an open connection.
    #[error("connection is already opened")]
    AlreadyOpened,

    /// `close` called on a closed connection.
    #[error("connection is already closed")]
    AlreadyClosed,

    /// Write attempted while not open.
    #[error("connection is not opened")]
    NotOpened,
}

impl ConnectionError {
    /// Stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            ConnectionError::ChangingState => "ErrChangingState",
            ConnectionError::AlreadyOpened => "ErrAlreadyOpened",
            ConnectionError::AlreadyClosed => "ErrAlreadyClosed",
            ConnectionError::NotOpened => "ErrNotOpened",
        }
    }
}

/// Client-level failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ClientError {
    /// Serialized payload exceeds the configured maximum.
    #[error("payload is too big, maximum size is {max} bytes, got {size}")]
    PayloadTooBig {
        /// Actual payload size in bytes.
        size: usize,
        /// Configured maximum in bytes.
        max: usize,
    },

    /// Response payload did not arrive in time.
    #[error("failed to read response data after {} ms", timeout.as_millis())]
    ResponseRead {
        /// Configured read timeout.
        timeout: Duration,
    },

    /// Command dispatched or disconnect requested on a non-open connection.
    #[error("connection is not opened")]
    ConnectionNotOpened,

    /// Connect requested on a non-closed connection.
    #[error("connection is not closed")]
    ConnectionNotClosed,

    /// Queued command cancelled by a forced disconnect.
    #[error("client is disconnecting")]
    Disconnecting,

    /// Remote side closed the connection mid-response.
    #[error("connection closed by remote")]
    ConnectionClosed,
}

impl ClientError {
    /// Stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            ClientError::PayloadTooBig { .. } => "ErrPayloadTooBig",
            ClientError::ResponseRead { .. } => "ErrResponseRead",
            ClientError::ConnectionNotOpened => "ErrConnectionNotOpened",
            ClientError::ConnectionNotClosed => "ErrConnectionNotClosed",
            ClientError::Disconnecting => "ErrDisconnecting",
            ClientError::ConnectionClosed => "ErrConnectionClosed",
        }
    }
}

/// Command construction and response status failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Verb is not part of the protocol.
    #[error("unknown beanstalk command '{0}'")]
    UnknownCommand(String),

    /// Status token is not part of the protocol.
    #[error("unknown beanstalk response status '{0}'")]
    UnknownResponseStatus(String),

    /// Server answered with one of the generic error statuses.
    #[error("server responded with error status {0}")]
    ErrorResponseStatus(ResponseStatus),

    /// Server answered with a status the command does not expect.
    #[error("unexpected response status {status} for command '{command}'")]
    UnexpectedResponseStatus {
        /// Command that was dispatched.
        command: Command,
        /// Status received.
        status: ResponseStatus,
    },
}

impl CommandError {
    /// Stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            CommandError::UnknownCommand(_) => "ErrCommandUnknown",
            CommandError::UnknownResponseStatus(_) => "ErrResponseStatusUnknown",
            CommandError::ErrorResponseStatus(_) => "ErrErrorResponseStatus",
            CommandError::UnexpectedResponseStatus { .. } => "ErrUnexpectedResponseStatus",
        }
    }
}

/// Malformed response framing.
#[derive(Debug, Error)]
pub enum ResponseError {
    /// Data length header token is not a decimal number.
    #[error("invalid response body length '{0}'")]
    InvalidBodyLength(String),

    /// Status token is not part of the protocol.
    #[error("unknown response status '{0}'")]
    UnknownStatus(String),

    /// Header line is not valid ASCII text.
    #[error("response header line is not valid text")]
    InvalidHeader,

    /// Structured (YAML) body could not be decoded.
    #[error("invalid structured response body: {0}")]
    Structured(#[from] serde_yaml::Error),

    /// Response carried no body where one was required.
    #[error("response body is missing")]
    MissingBody,
}

impl ResponseError {
    /// Stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            ResponseError::InvalidBodyLength(_) => "ErrInvalidBodyLength",
            ResponseError::UnknownStatus(_) => "ErrUnknownStatus",
            ResponseError::InvalidHeader => "ErrInvalidHeader",
            ResponseError::Structured(_) => "ErrStructuredBody",
            ResponseError::MissingBody => "ErrMissingBody",
        }
    }
}

/// Job payload encode/decode failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SerializerError {
    /// Encoding a value failed.
    #[error("failed to serialize payload: {0}")]
    Serialize(String),

    /// Decoding bytes failed.
    #[error("failed to deserialize payload: {0}")]
    Deserialize(String),
}

impl SerializerError {
    /// Stable error code string.
    pub fn code(&self) -> &'static str {
        match self {
            SerializerError::Serialize(_) => "ErrSerializeError",
            SerializerError::Deserialize(_) => "ErrDeserializeError",
        }
    }
}

/// Server outcomes that are surfaced as typed errors.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ServerError {
    /// Job body is larger than the server's `max-job-size`.
    #[error("job payload exceeds the server's max-job-size")]
    JobTooBig,

    /// Job body was not followed by CRLF.
    #[error("missing trailing CRLF after job body")]
    ExpectedCrlf,

    /// Server is in drain mode and refuses new jobs.
    #[error("server is draining and no longer accepts new jobs")]
    Draining,

    /// A job reserved by this client is about to reach its TTR.
    #[error("a reserved job will reach its deadline soon, release it first")]
    DeadlineSoon,
}

impl ServerError {
    /// Stable error code string (the protocol status name).
    pub fn code(&self) -> &'static str {
        self.status().as_str()
    }

    /// Response status this error stands for.
    pub fn status(&self) -> ResponseStatus {
        match self {
            ServerError::JobTooBig => ResponseStatus::JobTooBig,
            ServerError::ExpectedCrlf => ResponseStatus::ExpectedCrlf,
            ServerError::Draining => ResponseStatus::Draining,
            ServerError::DeadlineSoon => ResponseStatus::DeadlineSoon,
        }
    }
}

/// Argument validation failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Tube name is empty, too long, or uses a forbidden character.
    #[error("invalid tube name '{0}': expected 1-200 chars of [A-Za-z0-9-+/;.$_()]")]
    TubeName(String),

    /// Job ids start at 1.
    #[error("invalid job id {0}: job id should be >= 1")]
    JobId(u64),
}

/// Result type alias using Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_are_stable() {
        assert_eq!(Error::from(ConnectionError::NotOpened).code(), "ErrNotOpened");
        assert_eq!(Error::from(ClientError::Disconnecting).code(), "ErrDisconnecting");
        assert_eq!(
            Error::from(CommandError::ErrorResponseStatus(ResponseStatus::BadFormat)).code(),
            "ErrErrorResponseStatus"
        );
        assert_eq!(Error::from(ServerError::Draining).code(), "DRAINING");
    }

    #[test]
    fn test_read_timeout_is_connection_compromising() {
        let err = Error::from(ClientError::ResponseRead {
            timeout: Duration::from_millis(10),
        });
        assert!(err.is_connection_compromised());
        assert!(err.to_string().contains("10 ms"));

        let err = Error::from(ServerError::DeadlineSoon);
        assert!(!err.is_connection_compromised());
    }
}
