//! Transport module - TCP connection to the job server.
//!
//! The [`Connection`] owns the socket, tracks an explicit open/close state
//! machine and forwards raw inbound bytes as [`ConnectionEvent`]s. Framing
//! happens one layer up in [`crate::protocol::read_response`].

mod connection;

pub use connection::{Connection, ConnectionEvent, ConnectionState, EventStream};
