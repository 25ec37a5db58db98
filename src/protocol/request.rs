//! Request encoding.
//!
//! Requests mirror the response framing:
//! ```text
//! <verb> <arg1> ... <argN>\r\n
//! <verb> <arg1> ... <argN> <payload-byte-length>\r\n<payload-bytes>\r\n
//! ```
//!
//! # Example
//!
//! ```
//! use beanstalk_client::protocol::{build_command, Command};
//!
//! let buf = build_command(Command::Bury, &["123", "5"], None);
//! assert_eq!(&buf[..], b"bury 123 5\r\n");
//!
//! let buf = build_command(Command::Put, &["0", "0", "60"], Some(b"hi".as_slice()));
//! assert_eq!(&buf[..], b"put 0 0 60 2\r\nhi\r\n");
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use super::command::Command;
use super::status::{CRLF, CRLF_LEN};

/// Encode a command line, optionally followed by a payload.
pub fn build_command<A: AsRef<str>>(command: Command, args: &[A], payload: Option<&[u8]>) -> Bytes {
    let verb = command.as_str();
    let args_len: usize = args.iter().map(|a| a.as_ref().len() + 1).sum();
    let payload_len = payload.map_or(0, |p| p.len() + 24 + CRLF_LEN);

    let mut buf = BytesMut::with_capacity(verb.len() + args_len + CRLF_LEN + payload_len);
    buf.put_slice(verb.as_bytes());

    for arg in args {
        buf.put_u8(b' ');
        buf.put_slice(arg.as_ref().as_bytes());
    }

    match payload {
        Some(payload) => {
            buf.put_u8(b' ');
            buf.put_slice(payload.len().to_string().as_bytes());
            buf.put_slice(CRLF);
            buf.put_slice(payload);
            buf.put_slice(CRLF);
        }
        None => buf.put_slice(CRLF),
    }

    buf.freeze()
}
