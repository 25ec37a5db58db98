//! TCP connection with an explicit state machine.
//!
//! ```text
//! Closed --open()--> Opening --connected--> Open --close()--> Closing --> Closed
//!                       |                    |
//!                       +--connect error-----+--remote EOF--> Closed
//! ```
//!
//! A background reader task forwards every chunk read from the socket,
//! unframed, through an unbounded channel. Consumers take the
//! [`EventStream`] for the duration of one exchange.
//!
//! # Example
//!
//! ```ignore
//! use beanstalk_client::transport::Connection;
//! use beanstalk_client::Hooks;
//!
//! let conn = Connection::new(Hooks::default());
//! conn.open(11300, "127.0.0.1").await?;
//! conn.write(bytes::Bytes::from_static(b"stats\r\n")).await?;
//! let mut events = conn.events().await;
//! let first = events.next().await;
//! ```

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::{ConnectionError, Result};
use crate::hooks::Hooks;

/// Read buffer size for the socket reader task.
const READ_BUFFER_SIZE: usize = 64 * 1024;

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Closed,
    Opening,
    Open,
    Closing,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Closed => "closed",
            ConnectionState::Opening => "opening",
            ConnectionState::Open => "open",
            ConnectionState::Closing => "closing",
        })
    }
}

/// Event observed on the socket.
#[derive(Debug)]
pub enum ConnectionEvent {
    /// Socket connected to the given peer.
    Open(SocketAddr),
    /// Raw inbound bytes.
    Data(Bytes),
    /// Transport error after the connection was open.
    Error(io::Error),
    /// Remote side closed the connection.
    Close,
}

type EventReceiver = mpsc::UnboundedReceiver<ConnectionEvent>;
type WriterSlot = Arc<tokio::sync::Mutex<Option<OwnedWriteHalf>>>;

/// Exclusive handle on the connection's inbound events.
pub struct EventStream<'a> {
    guard: tokio::sync::MutexGuard<'a, Option<EventReceiver>>,
}

impl EventStream<'_> {
    /// Next event, or `None` once the connection is gone and drained.
    ///
    /// Cancel safe.
    pub async fn next(&mut self) -> Option<ConnectionEvent> {
        match self.guard.as_mut() {
            Some(rx) => rx.recv().await,
            None => None,
        }
    }
}

/// TCP connection to a job server.
pub struct Connection {
    state: Arc<Mutex<ConnectionState>>,
    writer: WriterSlot,
    events: tokio::sync::Mutex<Option<EventReceiver>>,
    reader_task: Mutex<Option<JoinHandle<()>>>,
    hooks: Hooks,
}

fn lock(state: &Mutex<ConnectionState>) -> MutexGuard<'_, ConnectionState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_teardown_noise(err: &io::Error) -> bool {
    matches!(
        err.kind(),
        io::ErrorKind::ConnectionReset | io::ErrorKind::BrokenPipe
    )
}

impl Connection {
    /// Create a closed connection.
    pub fn new(hooks: Hooks) -> Self {
        Self {
            state: Arc::new(Mutex::new(ConnectionState::Closed)),
            writer: Arc::new(tokio::sync::Mutex::new(None)),
            events: tokio::sync::Mutex::new(None),
            reader_task: Mutex::new(None),
            hooks,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        *lock(&self.state)
    }

    fn set_state(&self, state: ConnectionState) {
        *lock(&self.state) = state;
    }

    /// Connect to `host:port`.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::ChangingState`] while opening or closing
    /// - [`ConnectionError::AlreadyOpened`] if already open
    /// - [`crate::Error::Io`] if the connect fails; the state returns to closed
    pub async fn open(&self, port: u16, host: &str) -> Result<()> {
        {
            let mut state = lock(&self.state);
            match *state {
                ConnectionState::Opening | ConnectionState::Closing => {
                    return Err(ConnectionError::ChangingState.into());
                }
                ConnectionState::Open => return Err(ConnectionError::AlreadyOpened.into()),
                ConnectionState::Closed => *state = ConnectionState::Opening,
            }
        }

        let (stream, addr) = match connect(host, port).await {
            Ok(connected) => connected,
            Err(e) => {
                tracing::debug!("Failed to connect to {}:{}: {}", host, port, e);
                self.set_state(ConnectionState::Closed);
                return Err(e.into());
            }
        };

        let (read_half, write_half) = stream.into_split();
        let (tx, rx) = mpsc::unbounded_channel();
        let _ = tx.send(ConnectionEvent::Open(addr));

        *self.events.lock().await = Some(rx);
        *self.writer.lock().await = Some(write_half);
        self.set_state(ConnectionState::Open);

        let handle = tokio::spawn(read_loop(
            read_half,
            tx,
            self.state.clone(),
            self.writer.clone(),
            self.hooks.clone(),
        ));
        if let Some(stale) = self
            .reader_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(handle)
        {
            stale.abort();
        }

        tracing::info!("Connected to {}", addr);
        self.hooks.connected(addr);
        Ok(())
    }

    /// Shut the connection down.
    ///
    /// Flushes and half-closes the write side, then tears the socket down.
    /// Reset and broken pipe errors during teardown are ignored.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::ChangingState`] while opening or closing
    /// - [`ConnectionError::AlreadyClosed`] if already closed
    pub async fn close(&self) -> Result<()> {
        {
            let mut state = lock(&self.state);
            match *state {
                ConnectionState::Opening | ConnectionState::Closing => {
                    return Err(ConnectionError::ChangingState.into());
                }
                ConnectionState::Closed => return Err(ConnectionError::AlreadyClosed.into()),
                ConnectionState::Open => *state = ConnectionState::Closing,
            }
        }

        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                if is_teardown_noise(&e) {
                    tracing::trace!("Ignoring error during shutdown: {}", e);
                } else {
                    tracing::debug!("Shutdown error: {}", e);
                }
            }
        }

        let reader_task = self
            .reader_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = reader_task {
            handle.abort();
        }

        self.set_state(ConnectionState::Closed);
        tracing::info!("Connection closed");
        self.hooks.closed();
        Ok(())
    }

    /// Write `bytes` and flush. Echoes the input on success.
    ///
    /// # Errors
    ///
    /// - [`ConnectionError::NotOpened`] unless the state is exactly open
    /// - [`crate::Error::Io`] on a write failure
    pub async fn write(&self, bytes: Bytes) -> Result<Bytes> {
        if self.state() != ConnectionState::Open {
            return Err(ConnectionError::NotOpened.into());
        }

        let mut guard = self.writer.lock().await;
        let writer = guard.as_mut().ok_or(ConnectionError::NotOpened)?;
        writer.write_all(&bytes).await?;
        writer.flush().await?;

        Ok(bytes)
    }

    /// Take the inbound event stream. Waits while another exchange holds it.
    pub async fn events(&self) -> EventStream<'_> {
        EventStream {
            guard: self.events.lock().await,
        }
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(handle) = self
            .reader_task
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            handle.abort();
        }
    }
}

async fn connect(host: &str, port: u16) -> io::Result<(TcpStream, SocketAddr)> {
    let stream = TcpStream::connect((host, port)).await?;
    stream.set_nodelay(true)?;
    let addr = stream.peer_addr()?;
    Ok((stream, addr))
}

/// Move an open connection to closed after the remote side went away,
/// dropping the write half with it.
///
/// Returns `false` if the connection was not open (a local close is in
/// progress or already done).
async fn mark_remote_closed(state: &Mutex<ConnectionState>, writer: &WriterSlot) -> bool {
    let mut writer = writer.lock().await;
    let mut state = lock(state);
    if *state != ConnectionState::Open {
        return false;
    }
    *state = ConnectionState::Closed;
    writer.take();
    true
}

async fn read_loop(
    mut reader: OwnedReadHalf,
    events: mpsc::UnboundedSender<ConnectionEvent>,
    state: Arc<Mutex<ConnectionState>>,
    writer: WriterSlot,
    hooks: Hooks,
) {
    let mut buf = vec![0u8; READ_BUFFER_SIZE];

    loop {
        match reader.read(&mut buf).await {
            Ok(0) => {
                if mark_remote_closed(&state, &writer).await {
                    tracing::info!("Connection closed by remote");
                    hooks.closed();
                    let _ = events.send(ConnectionEvent::Close);
                }
                break;
            }
            Ok(n) => {
                tracing::trace!("Read {} bytes", n);
                if events
                    .send(ConnectionEvent::Data(Bytes::copy_from_slice(&buf[..n])))
                    .is_err()
                {
                    break;
                }
            }
            Err(e) => {
                let closing = *lock(&state) != ConnectionState::Open;
                if closing && is_teardown_noise(&e) {
                    tracing::trace!("Ignoring error during teardown: {}", e);
                    break;
                }

                tracing::error!("Read loop error: {}", e);
                hooks.errored(&e);
                let _ = events.send(ConnectionEvent::Error(e));

                if mark_remote_closed(&state, &writer).await {
                    hooks.closed();
                    let _ = events.send(ConnectionEvent::Close);
                }
                break;
            }
        }
    }
}
