//! Protocol module - text framing, command table and response reading.
//!
//! - Request encoding ([`build_command`])
//! - Response header parsing ([`parse_response_headers`])
//! - Incremental response assembly with a payload timeout ([`read_response`])
//! - Per-verb response contracts ([`CommandDescriptor`])

mod command;
mod headers;
mod reader;
mod request;
mod status;

pub use command::{BodyKind, Command, CommandDescriptor, CommandResponse, ResponseBody};
pub use headers::{parse_response_headers, ResponseHeaders};
pub use reader::{read_response, RawResponse, ResponseBuffer};
pub use request::build_command;
pub use status::{ResponseStatus, CRLF, CRLF_LEN};
