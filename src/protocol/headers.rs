//! Response header line parsing.
//!
//! [`parse_response_headers`] is a pure function over an accumulated buffer:
//! it never consumes bytes and can be called again on the same (growing)
//! buffer until the first CRLF shows up.
//!
//! # Example
//!
//! ```
//! use beanstalk_client::protocol::{parse_response_headers, ResponseStatus};
//!
//! // Not enough bytes yet
//! assert!(parse_response_headers(b"RESERVED 1 5").unwrap().is_none());
//!
//! let headers = parse_response_headers(b"RESERVED 1 5\r\nhel").unwrap().unwrap();
//! assert_eq!(headers.status, ResponseStatus::Reserved);
//! assert_eq!(headers.headers, vec!["1".to_string()]);
//! assert_eq!(headers.data_length, 7); // 5 payload bytes + CRLF
//! assert_eq!(headers.headers_line_len, 14);
//! ```

use super::status::{ResponseStatus, CRLF, CRLF_LEN};
use crate::error::ResponseError;

/// Parsed response header line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeaders {
    /// Status token.
    pub status: ResponseStatus,
    /// Positional header tokens (payload length removed).
    pub headers: Vec<String>,
    /// Whether a payload follows the header line.
    pub has_payload: bool,
    /// Expected payload length including its trailing CRLF, 0 without payload.
    pub data_length: usize,
    /// Bytes to slice off the front of the buffer to drop the header line.
    pub headers_line_len: usize,
}

/// Find the first CRLF in `buf`.
#[inline]
pub(crate) fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF_LEN).position(|w| w == CRLF)
}

/// Parse the header line at the start of `buf`.
///
/// # Returns
///
/// - `Ok(Some(headers))` once a full header line is present
/// - `Ok(None)` if no CRLF has arrived yet
///
/// # Errors
///
/// Returns error if the status token is unknown or the payload length token
/// of a data-bearing status is not a decimal number.
pub fn parse_response_headers(buf: &[u8]) -> Result<Option<ResponseHeaders>, ResponseError> {
    let Some(line_end) = find_crlf(buf) else {
        return Ok(None);
    };

    let line = std::str::from_utf8(&buf[..line_end]).map_err(|_| ResponseError::InvalidHeader)?;
    let mut tokens = line.split(' ');

    let status_token = tokens.next().unwrap_or_default();
    let status = status_token
        .parse::<ResponseStatus>()
        .map_err(|_| ResponseError::UnknownStatus(status_token.to_string()))?;

    let mut headers: Vec<String> = tokens.map(str::to_string).collect();
    let has_payload = status.has_payload();

    let data_length = if has_payload {
        let raw = headers.pop().unwrap_or_default();
        raw.parse::<usize>()
            .ok()
            .and_then(|length| length.checked_add(CRLF_LEN))
            .ok_or_else(|| ResponseError::InvalidBodyLength(raw.clone()))?
    } else {
        0
    };

    Ok(Some(ResponseHeaders {
        status,
        headers,
        has_payload,
        data_length,
        headers_line_len: line_end + CRLF_LEN,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_crlf_yet() {
        assert_eq!(parse_response_headers(b"").unwrap(), None);
        assert_eq!(parse_response_headers(b"WATCHING 1").unwrap(), None);
        assert_eq!(parse_response_headers(b"WATCHING 1\r").unwrap(), None);
    }

    #[test]
    fn test_repeated_calls_without_crlf_are_idempotent() {
        let buf = b"OK 26".to_vec();
        for _ in 0..3 {
            assert_eq!(parse_response_headers(&buf).unwrap(), None);
        }
        assert_eq!(buf, b"OK 26");
    }

    #[test]
    fn test_status_only() {
        let headers = parse_response_headers(b"BURIED\r\n").unwrap().unwrap();
        assert_eq!(headers.status, ResponseStatus::Buried);
        assert!(headers.headers.is_empty());
        assert!(!headers.has_payload);
        assert_eq!(headers.data_length, 0);
        assert_eq!(headers.headers_line_len, 8);
    }

    #[test]
    fn test_status_with_headers() {
        let headers = parse_response_headers(b"INSERTED 42\r\n").unwrap().unwrap();
        assert_eq!(headers.status, ResponseStatus::Inserted);
        assert_eq!(headers.headers, vec!["42"]);
        assert_eq!(headers.data_length, 0);
    }

    #[test]
    fn test_data_bearing_status() {
        let headers = parse_response_headers(b"OK 26\r\n").unwrap().unwrap();
        assert_eq!(headers.status, ResponseStatus::Ok);
        assert!(headers.headers.is_empty());
        assert!(headers.has_payload);
        assert_eq!(headers.data_length, 28);
        assert_eq!(headers.headers_line_len, 7);
    }

    #[test]
    fn test_zero_length_payload_counts_terminator() {
        let headers = parse_response_headers(b"FOUND 7 0\r\n\r\n").unwrap().unwrap();
        assert_eq!(headers.headers, vec!["7"]);
        assert!(headers.has_payload);
        assert_eq!(headers.data_length, CRLF_LEN);
    }

    #[test]
    fn test_only_first_line_is_parsed() {
        let headers = parse_response_headers(b"RESERVED 3 4\r\nab\r\n\r\n")
            .unwrap()
            .unwrap();
        assert_eq!(headers.headers, vec!["3"]);
        assert_eq!(headers.data_length, 6);
        assert_eq!(headers.headers_line_len, 14);
    }

    #[test]
    fn test_malformed_body_length() {
        let err = parse_response_headers(b"RESERVED 3 four\r\n").unwrap_err();
        assert!(matches!(err, ResponseError::InvalidBodyLength(ref s) if s == "four"));

        let err = parse_response_headers(b"OK\r\n").unwrap_err();
        assert!(matches!(err, ResponseError::InvalidBodyLength(ref s) if s.is_empty()));
    }

    #[test]
    fn test_body_length_overflow_is_rejected() {
        let max = usize::MAX.to_string();
        let line = format!("OK {max}\r\n");
        let err = parse_response_headers(line.as_bytes()).unwrap_err();
        assert!(matches!(err, ResponseError::InvalidBodyLength(ref s) if *s == max));

        let err = parse_response_headers(b"OK 99999999999999999999999\r\n").unwrap_err();
        assert!(matches!(err, ResponseError::InvalidBodyLength(_)));
    }

    #[test]
    fn test_unknown_status() {
        let err = parse_response_headers(b"NOPE 1\r\n").unwrap_err();
        assert!(matches!(err, ResponseError::UnknownStatus(ref s) if s == "NOPE"));
    }

    #[test]
    fn test_fragmented_input_matches_whole_input() {
        let full = b"RESERVED 12 5\r\nhello\r\n";
        let expected = parse_response_headers(full).unwrap().unwrap();

        let mut acc = Vec::new();
        let mut parsed = None;
        for byte in full.iter() {
            acc.push(*byte);
            if parsed.is_none() {
                parsed = parse_response_headers(&acc).unwrap();
            }
        }

        assert_eq!(parsed.unwrap(), expected);
    }
}
