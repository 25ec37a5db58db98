//! Command table.
//!
//! Each protocol verb has one static [`CommandDescriptor`] listing the
//! response statuses that are valid outcomes for it and how its response
//! body is decoded. The table is a `static` array built at compile time, so
//! lookups never race and never allocate.
//!
//! # Example
//!
//! ```
//! use beanstalk_client::protocol::{BodyKind, Command, ResponseStatus};
//!
//! let descriptor = Command::Peek.descriptor();
//! assert!(descriptor.expects(ResponseStatus::Found));
//! assert!(descriptor.expects(ResponseStatus::NotFound));
//! assert_eq!(descriptor.body, BodyKind::Payload);
//! ```

use std::fmt;
use std::str::FromStr;

use bytes::Bytes;

use super::reader::RawResponse;
use super::status::{ResponseStatus, CRLF_LEN};
use super::status::ResponseStatus as S;
use crate::codec::Serializer;
use crate::error::{CommandError, ResponseError, Result};

/// Protocol verb.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Put,
    Use,
    Reserve,
    ReserveWithTimeout,
    ReserveJob,
    Delete,
    Release,
    Bury,
    Touch,
    Watch,
    Ignore,
    Peek,
    PeekReady,
    PeekDelayed,
    PeekBuried,
    Kick,
    KickJob,
    Stats,
    StatsJob,
    StatsTube,
    ListTubes,
    ListTubeUsed,
    ListTubesWatched,
    PauseTube,
}

impl Command {
    /// All verbs, in table order.
    pub const ALL: [Command; 24] = [
        Command::Put,
        Command::Use,
        Command::Reserve,
        Command::ReserveWithTimeout,
        Command::ReserveJob,
        Command::Delete,
        Command::Release,
        Command::Bury,
        Command::Touch,
        Command::Watch,
        Command::Ignore,
        Command::Peek,
        Command::PeekReady,
        Command::PeekDelayed,
        Command::PeekBuried,
        Command::Kick,
        Command::KickJob,
        Command::Stats,
        Command::StatsJob,
        Command::StatsTube,
        Command::ListTubes,
        Command::ListTubeUsed,
        Command::ListTubesWatched,
        Command::PauseTube,
    ];

    /// Wire verb.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Command::Put => "put",
            Command::Use => "use",
            Command::Reserve => "reserve",
            Command::ReserveWithTimeout => "reserve-with-timeout",
            Command::ReserveJob => "reserve-job",
            Command::Delete => "delete",
            Command::Release => "release",
            Command::Bury => "bury",
            Command::Touch => "touch",
            Command::Watch => "watch",
            Command::Ignore => "ignore",
            Command::Peek => "peek",
            Command::PeekReady => "peek-ready",
            Command::PeekDelayed => "peek-delayed",
            Command::PeekBuried => "peek-buried",
            Command::Kick => "kick",
            Command::KickJob => "kick-job",
            Command::Stats => "stats",
            Command::StatsJob => "stats-job",
            Command::StatsTube => "stats-tube",
            Command::ListTubes => "list-tubes",
            Command::ListTubeUsed => "list-tube-used",
            Command::ListTubesWatched => "list-tubes-watched",
            Command::PauseTube => "pause-tube",
        }
    }

    /// Static descriptor for this verb.
    #[inline]
    pub fn descriptor(self) -> &'static CommandDescriptor {
        &DESCRIPTORS[self as usize]
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Command {
    type Err = CommandError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Command::ALL
            .iter()
            .copied()
            .find(|command| command.as_str() == s)
            .ok_or_else(|| CommandError::UnknownCommand(s.to_string()))
    }
}

/// How a response body is handed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// The verb never receives a body.
    None,
    /// Job payload, decoded by the configured [`Serializer`].
    Payload,
    /// YAML document (stats, tube lists), decoded regardless of serializer.
    Structured,
}

/// Per-verb response contract.
#[derive(Debug)]
pub struct CommandDescriptor {
    /// Verb this descriptor belongs to.
    pub command: Command,
    /// Statuses that are valid outcomes.
    pub expected: &'static [ResponseStatus],
    /// Body decoding.
    pub body: BodyKind,
}

const fn descriptor(
    command: Command,
    expected: &'static [ResponseStatus],
    body: BodyKind,
) -> CommandDescriptor {
    CommandDescriptor {
        command,
        expected,
        body,
    }
}

const RESERVE_STATUSES: &[ResponseStatus] = &[S::TimedOut, S::DeadlineSoon, S::Reserved];
const PEEK_STATUSES: &[ResponseStatus] = &[S::Found, S::NotFound];

/// Indexed by `Command as usize`; order must match [`Command::ALL`].
static DESCRIPTORS: [CommandDescriptor; 24] = [
    descriptor(
        Command::Put,
        &[S::Inserted, S::Buried, S::ExpectedCrlf, S::JobTooBig, S::Draining],
        BodyKind::None,
    ),
    descriptor(Command::Use, &[S::Using], BodyKind::None),
    descriptor(Command::Reserve, RESERVE_STATUSES, BodyKind::Payload),
    descriptor(Command::ReserveWithTimeout, RESERVE_STATUSES, BodyKind::Payload),
    descriptor(Command::ReserveJob, &[S::NotFound, S::Reserved], BodyKind::Payload),
    descriptor(Command::Delete, &[S::NotFound, S::Deleted], BodyKind::None),
    descriptor(
        Command::Release,
        &[S::Released, S::Buried, S::NotFound],
        BodyKind::None,
    ),
    descriptor(Command::Bury, &[S::Buried, S::NotFound], BodyKind::None),
    descriptor(Command::Touch, &[S::Touched, S::NotFound], BodyKind::None),
    descriptor(Command::Watch, &[S::Watching], BodyKind::None),
    descriptor(Command::Ignore, &[S::Watching, S::NotIgnored], BodyKind::None),
    descriptor(Command::Peek, PEEK_STATUSES, BodyKind::Payload),
    descriptor(Command::PeekReady, PEEK_STATUSES, BodyKind::Payload),
    descriptor(Command::PeekDelayed, PEEK_STATUSES, BodyKind::Payload),
    descriptor(Command::PeekBuried, PEEK_STATUSES, BodyKind::Payload),
    descriptor(Command::Kick, &[S::Kicked], BodyKind::None),
    descriptor(Command::KickJob, &[S::Kicked, S::NotFound], BodyKind::None),
    descriptor(Command::Stats, &[S::Ok], BodyKind::Structured),
    descriptor(Command::StatsJob, &[S::Ok, S::NotFound], BodyKind::Structured),
    descriptor(Command::StatsTube, &[S::Ok, S::NotFound], BodyKind::Structured),
    descriptor(Command::ListTubes, &[S::Ok], BodyKind::Structured),
    descriptor(Command::ListTubeUsed, &[S::Using], BodyKind::None),
    descriptor(Command::ListTubesWatched, &[S::Ok], BodyKind::Structured),
    descriptor(Command::PauseTube, &[S::Paused, S::NotFound], BodyKind::None),
];

/// Decoded response body.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody<V> {
    /// No body on the wire.
    Empty,
    /// Payload bytes, no serializer applied.
    Raw(Bytes),
    /// Payload decoded by the serializer.
    Value(V),
    /// Structured YAML document.
    Structured(serde_yaml::Value),
}

/// Response after status validation and body decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandResponse<V> {
    /// Status token.
    pub status: ResponseStatus,
    /// Positional header tokens.
    pub headers: Vec<String>,
    /// Decoded body.
    pub body: ResponseBody<V>,
}

impl<V> CommandResponse<V> {
    /// Header token at `index`.
    pub fn header(&self, index: usize) -> std::result::Result<&str, ResponseError> {
        self.headers
            .get(index)
            .map(String::as_str)
            .ok_or(ResponseError::InvalidHeader)
    }

    /// Header token at `index` parsed as an unsigned integer (ids, counts).
    pub fn header_u64(&self, index: usize) -> std::result::Result<u64, ResponseError> {
        self.header(index)?
            .parse()
            .map_err(|_| ResponseError::InvalidHeader)
    }
}

impl CommandDescriptor {
    /// Whether `status` is a valid outcome for this verb.
    #[inline]
    pub fn expects(&self, status: ResponseStatus) -> bool {
        self.expected.contains(&status)
    }

    /// Validate the response status and decode the body.
    ///
    /// A generic server error status fails with
    /// [`CommandError::ErrorResponseStatus`] unless this verb lists it as
    /// expected (e.g. `put` expects `DRAINING`). Any other status outside the
    /// expected set fails with [`CommandError::UnexpectedResponseStatus`].
    ///
    /// Payload bodies lose their trailing CRLF and go through `serializer`
    /// when one is given; structured bodies are always parsed as YAML.
    pub fn handle_response<S: Serializer>(
        &self,
        response: RawResponse,
        serializer: Option<&S>,
    ) -> Result<CommandResponse<S::Value>> {
        let RawResponse {
            status,
            headers,
            data,
        } = response;

        if !self.expects(status) {
            if status.is_error() {
                return Err(CommandError::ErrorResponseStatus(status).into());
            }
            return Err(CommandError::UnexpectedResponseStatus {
                command: self.command,
                status,
            }
            .into());
        }

        let body = match data {
            None => ResponseBody::Empty,
            Some(mut data) => {
                data.truncate(data.len().saturating_sub(CRLF_LEN));
                match (self.body, serializer) {
                    (BodyKind::Structured, _) => {
                        ResponseBody::Structured(serde_yaml::from_slice(&data).map_err(ResponseError::from)?)
                    }
                    (BodyKind::Payload, Some(serializer)) => {
                        ResponseBody::Value(serializer.deserialize(&data)?)
                    }
                    _ => ResponseBody::Raw(data),
                }
            }
        };

        Ok(CommandResponse {
            status,
            headers,
            body,
        })
    }
}
