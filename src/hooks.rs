//! Lifecycle hooks.
//!
//! Optional callbacks fired by the connection (connect, error, close) and by
//! the client (command sent, response received). Hooks run inline on the
//! task that observed the event, so keep them short.
//!
//! # Example
//!
//! ```
//! use beanstalk_client::Hooks;
//!
//! let hooks = Hooks::new()
//!     .on_connect(|addr| println!("connected to {addr}"))
//!     .on_command_sent(|bytes| println!("> {}", String::from_utf8_lossy(bytes)));
//! ```

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::protocol::RawResponse;

type ConnectHook = Arc<dyn Fn(SocketAddr) + Send + Sync>;
type ErrorHook = Arc<dyn Fn(&io::Error) + Send + Sync>;
type CloseHook = Arc<dyn Fn() + Send + Sync>;
type CommandSentHook = Arc<dyn Fn(&[u8]) + Send + Sync>;
type ResponseHook = Arc<dyn Fn(&RawResponse) + Send + Sync>;

/// Set of optional lifecycle callbacks. Cheap to clone.
#[derive(Clone, Default)]
pub struct Hooks {
    on_connect: Option<ConnectHook>,
    on_error: Option<ErrorHook>,
    on_close: Option<CloseHook>,
    on_command_sent: Option<CommandSentHook>,
    on_response_received: Option<ResponseHook>,
}

impl Hooks {
    /// Create an empty hook set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Called with the peer address once the socket is connected.
    pub fn on_connect(mut self, f: impl Fn(SocketAddr) + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Called on transport errors after the connection is open.
    pub fn on_error(mut self, f: impl Fn(&io::Error) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    /// Called when the connection closes, locally or remotely.
    pub fn on_close(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(f));
        self
    }

    /// Called with the encoded request bytes after they are written.
    pub fn on_command_sent(mut self, f: impl Fn(&[u8]) + Send + Sync + 'static) -> Self {
        self.on_command_sent = Some(Arc::new(f));
        self
    }

    /// Called with each assembled response before it is decoded.
    pub fn on_response_received(mut self, f: impl Fn(&RawResponse) + Send + Sync + 'static) -> Self {
        self.on_response_received = Some(Arc::new(f));
        self
    }

    pub(crate) fn connected(&self, addr: SocketAddr) {
        if let Some(f) = &self.on_connect {
            f(addr);
        }
    }

    pub(crate) fn errored(&self, err: &io::Error) {
        if let Some(f) = &self.on_error {
            f(err);
        }
    }

    pub(crate) fn closed(&self) {
        if let Some(f) = &self.on_close {
            f();
        }
    }

    pub(crate) fn command_sent(&self, bytes: &[u8]) {
        if let Some(f) = &self.on_command_sent {
            f(bytes);
        }
    }

    pub(crate) fn response_received(&self, response: &RawResponse) {
        if let Some(f) = &self.on_response_received {
            f(response);
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_command_sent", &self.on_command_sent.is_some())
            .field("on_response_received", &self.on_response_received.is_some())
            .finish()
    }
}
