//! Response status vocabulary and line framing constants.
//!
//! Every response line starts with one of these status tokens:
//! ```text
//! <STATUS> <header1> <header2> ... [<payload-byte-length>]\r\n[<payload-bytes>\r\n]
//! ```
//!
//! Only `OK`, `RESERVED` and `FOUND` carry a payload.

use std::fmt;
use std::str::FromStr;

use crate::error::CommandError;

/// Line terminator used by requests and responses.
pub const CRLF: &[u8] = b"\r\n";

/// Length of [`CRLF`].
pub const CRLF_LEN: usize = 2;

/// Status token of a server response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResponseStatus {
    BadFormat,
    Buried,
    DeadlineSoon,
    Deleted,
    Draining,
    ExpectedCrlf,
    Found,
    Inserted,
    InternalError,
    JobTooBig,
    Kicked,
    NotFound,
    NotIgnored,
    Ok,
    OutOfMemory,
    Paused,
    Released,
    Reserved,
    TimedOut,
    Touched,
    UnknownCommand,
    Using,
    Watching,
}

impl ResponseStatus {
    /// All statuses in wire order.
    pub const ALL: [ResponseStatus; 23] = [
        ResponseStatus::BadFormat,
        ResponseStatus::Buried,
        ResponseStatus::DeadlineSoon,
        ResponseStatus::Deleted,
        ResponseStatus::Draining,
        ResponseStatus::ExpectedCrlf,
        ResponseStatus::Found,
        ResponseStatus::Inserted,
        ResponseStatus::InternalError,
        ResponseStatus::JobTooBig,
        ResponseStatus::Kicked,
        ResponseStatus::NotFound,
        ResponseStatus::NotIgnored,
        ResponseStatus::Ok,
        ResponseStatus::OutOfMemory,
        ResponseStatus::Paused,
        ResponseStatus::Released,
        ResponseStatus::Reserved,
        ResponseStatus::TimedOut,
        ResponseStatus::Touched,
        ResponseStatus::UnknownCommand,
        ResponseStatus::Using,
        ResponseStatus::Watching,
    ];

    /// Wire token for this status.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ResponseStatus::BadFormat => "BAD_FORMAT",
            ResponseStatus::Buried => "BURIED",
            ResponseStatus::DeadlineSoon => "DEADLINE_SOON",
            ResponseStatus::Deleted => "DELETED",
            ResponseStatus::Draining => "DRAINING",
            ResponseStatus::ExpectedCrlf => "EXPECTED_CRLF",
            ResponseStatus::Found => "FOUND",
            ResponseStatus::Inserted => "INSERTED",
            ResponseStatus::InternalError => "INTERNAL_ERROR",
            ResponseStatus::JobTooBig => "JOB_TOO_BIG",
            ResponseStatus::Kicked => "KICKED",
            ResponseStatus::NotFound => "NOT_FOUND",
            ResponseStatus::NotIgnored => "NOT_IGNORED",
            ResponseStatus::Ok => "OK",
            ResponseStatus::OutOfMemory => "OUT_OF_MEMORY",
            ResponseStatus::Paused => "PAUSED",
            ResponseStatus::Released => "RELEASED",
            ResponseStatus::Reserved => "RESERVED",
            ResponseStatus::TimedOut => "TIMED_OUT",
            ResponseStatus::Touched => "TOUCHED",
            ResponseStatus::UnknownCommand => "UNKNOWN_COMMAND",
            ResponseStatus::Using => "USING",
            ResponseStatus::Watching => "WATCHING",
        }
    }

    /// Whether a length-prefixed payload follows the header line.
    #[inline]
    pub fn has_payload(&self) -> bool {
        matches!(
            self,
            ResponseStatus::Ok | ResponseStatus::Reserved | ResponseStatus::Found
        )
    }

    /// Whether this is one of the generic server error statuses.
    #[inline]
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            ResponseStatus::OutOfMemory
                | ResponseStatus::InternalError
                | ResponseStatus::BadFormat
                | ResponseStatus::Draining
                | ResponseStatus::UnknownCommand
        )
    }
}

impl fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseStatus {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResponseStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CommandError::UnknownResponseStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip_for_every_status() {
        for status in ResponseStatus::ALL {
            assert_eq!(status.as_str().parse::<ResponseStatus>().unwrap(), status);
        }
    }

    #[test]
    fn test_unknown_token() {
        let err = "WHATEVER".parse::<ResponseStatus>().unwrap_err();
        assert_eq!(err, CommandError::UnknownResponseStatus("WHATEVER".into()));
        // tokens are case sensitive
        assert!("ok".parse::<ResponseStatus>().is_err());
    }

    #[test]
    fn test_data_bearing_statuses() {
        let data: Vec<_> = ResponseStatus::ALL
            .into_iter()
            .filter(ResponseStatus::has_payload)
            .collect();
        assert_eq!(
            data,
            vec![ResponseStatus::Found, ResponseStatus::Ok, ResponseStatus::Reserved]
        );
    }

    #[test]
    fn test_error_statuses() {
        let errors = ResponseStatus::ALL
            .into_iter()
            .filter(ResponseStatus::is_error)
            .count();
        assert_eq!(errors, 5);
        assert!(ResponseStatus::Draining.is_error());
        assert!(!ResponseStatus::NotFound.is_error());
    }
}
