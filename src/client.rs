//! Client facade and builder.
//!
//! The [`Client`] exposes one async method per protocol verb. Every call:
//! 1. Validates its arguments (and serializes the payload for `put`)
//! 2. Takes a ticket in the [`DispatchQueue`] and waits for its turn
//! 3. Writes the encoded request to the [`Connection`]
//! 4. Reads exactly one response
//! 5. Releases its ticket and decodes the response for its verb
//!
//! The write, the read and the ticket release run on a spawned task.
//! Dropping the caller's future after the request went out leaves that task
//! to read and discard the response, so later commands never see it.
//!
//! A `Client` is `Send + Sync`; share it behind an `Arc` and call it from
//! as many tasks as needed. Exchanges still happen one at a time, in call
//! order.
//!
//! # Example
//!
//! ```no_run
//! use beanstalk_client::{Client, PutOptions};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), beanstalk_client::Error> {
//!     let client = Client::builder().host("127.0.0.1").port(11300).build();
//!     client.connect().await?;
//!
//!     client.use_tube("emails").await?;
//!     let put = client.put(&json!({ "to": "a@b.c" }), PutOptions::new().ttr(60)).await?;
//!     println!("queued job {} as {}", put.id, put.state);
//!
//!     client.watch("emails").await?;
//!     if let Some(job) = client.reserve_with_timeout(5).await? {
//!         println!("working on {}: {}", job.id, job.payload);
//!         client.delete(job.id).await?;
//!     }
//!
//!     client.disconnect(false).await
//! }
//! ```

use std::io;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use serde::de::DeserializeOwned;

use crate::codec::{JsonSerializer, Serializer};
use crate::config::ClientConfig;
use crate::error::{ClientError, CommandError, Error, ResponseError, Result, ServerError};
use crate::hooks::Hooks;
use crate::job::{Job, JobState, PutOutcome};
use crate::protocol::{
    build_command, read_response, Command, CommandResponse, ResponseBody, ResponseStatus,
};
use crate::queue::DispatchQueue;
use crate::stats::{JobStats, ServerStats, TubeStats};
use crate::transport::{Connection, ConnectionState};
use crate::validate::{validate_job_id, validate_tube_name};

/// Per-job overrides for `put`. Unset fields use the client defaults.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PutOptions {
    /// Priority, lower is more urgent.
    pub priority: Option<u32>,
    /// Seconds before the job becomes ready.
    pub delay: Option<u32>,
    /// Seconds a worker may hold the job.
    pub ttr: Option<u32>,
}

impl PutOptions {
    /// All defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the priority.
    pub fn priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    /// Set the delay in seconds.
    pub fn delay(mut self, delay: u32) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Set the time-to-run in seconds.
    pub fn ttr(mut self, ttr: u32) -> Self {
        self.ttr = Some(ttr);
        self
    }
}

/// Builder for a [`Client`].
pub struct ClientBuilder<S = JsonSerializer> {
    config: ClientConfig,
    serializer: S,
    hooks: Hooks,
}

impl ClientBuilder<JsonSerializer> {
    /// Create a builder with default config and the JSON serializer.
    pub fn new() -> Self {
        Self {
            config: ClientConfig::default(),
            serializer: JsonSerializer::new(),
            hooks: Hooks::default(),
        }
    }
}

impl Default for ClientBuilder<JsonSerializer> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Serializer> ClientBuilder<S> {
    /// Replace the whole config.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Server host.
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    /// Server port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Priority used by `put` and `release` when none is given.
    pub fn default_priority(mut self, priority: u32) -> Self {
        self.config.default_priority = priority;
        self
    }

    /// Delay used by `put` and `release` when none is given.
    pub fn default_delay(mut self, delay: u32) -> Self {
        self.config.default_delay = delay;
        self
    }

    /// TTR used by `put` when none is given.
    pub fn default_ttr(mut self, ttr: u32) -> Self {
        self.config.default_ttr = ttr;
        self
    }

    /// Largest serialized payload `put` will send.
    ///
    /// Default: 65536
    pub fn max_payload_size(mut self, size: usize) -> Self {
        self.config.max_payload_size = size;
        self
    }

    /// How long a response payload may take to arrive after its header line.
    ///
    /// Default: 1s
    pub fn data_read_timeout(mut self, timeout: Duration) -> Self {
        self.config.data_read_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Lifecycle hooks.
    pub fn hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Swap the payload serializer.
    pub fn serializer<T: Serializer>(self, serializer: T) -> ClientBuilder<T> {
        ClientBuilder {
            config: self.config,
            serializer,
            hooks: self.hooks,
        }
    }

    /// Build a disconnected client.
    pub fn build(self) -> Client<S> {
        Client {
            conn: Arc::new(Connection::new(self.hooks.clone())),
            queue: DispatchQueue::new(),
            config: self.config,
            serializer: self.serializer,
            hooks: self.hooks,
        }
    }
}

/// Async job queue client over a single connection.
pub struct Client<S: Serializer = JsonSerializer> {
    config: ClientConfig,
    serializer: S,
    conn: Arc<Connection>,
    queue: DispatchQueue,
    hooks: Hooks,
}

impl Client<JsonSerializer> {
    /// Create a JSON client from `config`.
    pub fn new(config: ClientConfig) -> Self {
        ClientBuilder::new().config(config).build()
    }

    /// Start building a client.
    pub fn builder() -> ClientBuilder<JsonSerializer> {
        ClientBuilder::new()
    }
}

fn unexpected<T>(command: Command, status: ResponseStatus) -> Result<T> {
    Err(CommandError::UnexpectedResponseStatus { command, status }.into())
}

fn into_job<V>(response: CommandResponse<V>) -> Result<Job<V>> {
    let id = response.header_u64(0)?;
    match response.body {
        ResponseBody::Value(payload) => Ok(Job { id, payload }),
        _ => Err(ResponseError::MissingBody.into()),
    }
}

fn into_structured<V, T: DeserializeOwned>(response: CommandResponse<V>) -> Result<T> {
    match response.body {
        ResponseBody::Structured(value) => {
            Ok(serde_yaml::from_value(value).map_err(ResponseError::from)?)
        }
        _ => Err(ResponseError::MissingBody.into()),
    }
}

/// Map the shared outcomes of the reserve and peek families.
fn job_or_none<V>(command: Command, response: CommandResponse<V>) -> Result<Option<Job<V>>> {
    match response.status {
        ResponseStatus::Reserved | ResponseStatus::Found => into_job(response).map(Some),
        ResponseStatus::TimedOut | ResponseStatus::NotFound => Ok(None),
        ResponseStatus::DeadlineSoon => Err(ServerError::DeadlineSoon.into()),
        status => unexpected(command, status),
    }
}

fn ready_or_delayed(delay: u32) -> JobState {
    if delay > 0 {
        JobState::Delayed
    } else {
        JobState::Ready
    }
}

impl<S: Serializer> Client<S> {
    /// Active config.
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Whether the connection is open.
    pub fn is_connected(&self) -> bool {
        self.conn.state() == ConnectionState::Open
    }

    /// Number of commands queued, including the one in flight.
    pub fn queue_size(&self) -> usize {
        self.queue.len()
    }

    /// Whether a command is queued or in flight.
    pub fn is_working(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Open the connection to the configured server.
    ///
    /// # Errors
    ///
    /// - [`ClientError::ConnectionNotClosed`] unless the connection is closed
    /// - [`crate::Error::Io`] if the connect fails
    pub async fn connect(&self) -> Result<()> {
        let state = self.conn.state();
        if state != ConnectionState::Closed {
            tracing::debug!("Refusing to connect, connection is {}", state);
            return Err(ClientError::ConnectionNotClosed.into());
        }

        let mut ticket = self.queue.enqueue();
        ticket.wait().await?;

        self.conn.open(self.config.port, &self.config.host).await
    }

    /// Close the connection once queued commands are done.
    ///
    /// With `force`, every command still waiting for its turn fails with
    /// [`ClientError::Disconnecting`]; only the one in flight completes.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::ConnectionNotOpened`] unless the connection is open.
    pub async fn disconnect(&self, force: bool) -> Result<()> {
        let state = self.conn.state();
        if state != ConnectionState::Open {
            tracing::debug!("Refusing to disconnect, connection is {}", state);
            return Err(ClientError::ConnectionNotOpened.into());
        }

        if force {
            self.queue.reject_pending();
        }

        let mut ticket = self.queue.enqueue();
        ticket.wait().await?;

        self.conn.close().await
    }

    fn encode_payload(&self, payload: &S::Value) -> Result<Bytes> {
        let bytes = self.serializer.serialize(payload)?;
        let max = self.config.max_payload_size;
        if bytes.len() > max {
            return Err(ClientError::PayloadTooBig {
                size: bytes.len(),
                max,
            }
            .into());
        }
        Ok(bytes)
    }

    async fn dispatch(
        &self,
        command: Command,
        args: &[String],
        payload: Option<Bytes>,
    ) -> Result<CommandResponse<S::Value>> {
        let mut ticket = self.queue.enqueue();
        ticket.wait().await?;

        if self.conn.state() != ConnectionState::Open {
            return Err(ClientError::ConnectionNotOpened.into());
        }

        let request = build_command(command, args, payload.as_deref());
        let conn = self.conn.clone();
        let hooks = self.hooks.clone();
        let timeout = self.config.data_read_timeout();

        // The exchange owns the ticket: the queue only advances once the
        // response is consumed, even if the caller stops waiting.
        let exchange = tokio::spawn(async move {
            tracing::debug!("Sending {} ({} bytes)", command, request.len());
            let sent = conn.write(request).await?;
            hooks.command_sent(&sent);

            let response = read_response(&conn, timeout).await?;
            tracing::debug!("Received {} for {}", response.status, command);
            hooks.response_received(&response);

            drop(ticket);
            Ok::<_, Error>(response)
        });

        let response = match exchange.await {
            Ok(response) => response?,
            Err(e) => return Err(io::Error::other(e).into()),
        };

        command
            .descriptor()
            .handle_response(response, Some(&self.serializer))
    }

    /// Switch the tube subsequent `put`s go to. Returns the tube name.
    pub async fn use_tube(&self, tube: &str) -> Result<String> {
        validate_tube_name(tube)?;
        let response = self.dispatch(Command::Use, &[tube.to_string()], None).await?;
        Ok(response.header(0)?.to_string())
    }

    /// Insert a job into the used tube.
    ///
    /// # Errors
    ///
    /// - [`ClientError::PayloadTooBig`] before any I/O if the serialized
    ///   payload exceeds `max_payload_size`
    /// - [`ServerError::JobTooBig`], [`ServerError::ExpectedCrlf`] or
    ///   [`ServerError::Draining`] when the server refuses the job
    pub async fn put(&self, payload: &S::Value, options: PutOptions) -> Result<PutOutcome> {
        let priority = options.priority.unwrap_or(self.config.default_priority);
        let delay = options.delay.unwrap_or(self.config.default_delay);
        let ttr = options.ttr.unwrap_or(self.config.default_ttr);
        let body = self.encode_payload(payload)?;

        let args = [priority.to_string(), delay.to_string(), ttr.to_string()];
        let response = self.dispatch(Command::Put, &args, Some(body)).await?;

        match response.status {
            ResponseStatus::Inserted => Ok(PutOutcome {
                id: response.header_u64(0)?,
                state: ready_or_delayed(delay),
            }),
            ResponseStatus::Buried => Ok(PutOutcome {
                id: response.header_u64(0)?,
                state: JobState::Buried,
            }),
            ResponseStatus::JobTooBig => Err(ServerError::JobTooBig.into()),
            ResponseStatus::ExpectedCrlf => Err(ServerError::ExpectedCrlf.into()),
            ResponseStatus::Draining => Err(ServerError::Draining.into()),
            status => unexpected(Command::Put, status),
        }
    }

    /// Reserve a job from the watched tubes, waiting as long as it takes.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::DeadlineSoon`] if a job already reserved by this
    /// client is about to time out.
    pub async fn reserve(&self) -> Result<Option<Job<S::Value>>> {
        let response = self.dispatch(Command::Reserve, &[], None).await?;
        job_or_none(Command::Reserve, response)
    }

    /// Reserve a job, giving up after `timeout` seconds. `None` on timeout.
    pub async fn reserve_with_timeout(&self, timeout: u32) -> Result<Option<Job<S::Value>>> {
        let response = self
            .dispatch(Command::ReserveWithTimeout, &[timeout.to_string()], None)
            .await?;
        job_or_none(Command::ReserveWithTimeout, response)
    }

    /// Reserve a specific job. `None` if it does not exist.
    pub async fn reserve_job(&self, id: u64) -> Result<Option<Job<S::Value>>> {
        validate_job_id(id)?;
        let response = self
            .dispatch(Command::ReserveJob, &[id.to_string()], None)
            .await?;
        job_or_none(Command::ReserveJob, response)
    }

    /// Delete a job. `false` if it was not found.
    pub async fn delete(&self, id: u64) -> Result<bool> {
        validate_job_id(id)?;
        let response = self.dispatch(Command::Delete, &[id.to_string()], None).await?;
        Ok(response.status == ResponseStatus::Deleted)
    }

    /// Put a reserved job back into the ready (or delayed) queue.
    ///
    /// Returns the job's new state, `Buried` if the server could not grow its
    /// priority queue, or `None` if the job is not reserved by this client.
    pub async fn release(
        &self,
        id: u64,
        priority: Option<u32>,
        delay: Option<u32>,
    ) -> Result<Option<JobState>> {
        validate_job_id(id)?;
        let priority = priority.unwrap_or(self.config.default_priority);
        let delay = delay.unwrap_or(self.config.default_delay);

        let args = [id.to_string(), priority.to_string(), delay.to_string()];
        let response = self.dispatch(Command::Release, &args, None).await?;

        match response.status {
            ResponseStatus::Released => Ok(Some(ready_or_delayed(delay))),
            ResponseStatus::Buried => Ok(Some(JobState::Buried)),
            ResponseStatus::NotFound => Ok(None),
            status => unexpected(Command::Release, status),
        }
    }

    /// Bury a reserved job. `false` if it is not reserved by this client.
    pub async fn bury(&self, id: u64, priority: Option<u32>) -> Result<bool> {
        validate_job_id(id)?;
        let priority = priority.unwrap_or(self.config.default_priority);

        let args = [id.to_string(), priority.to_string()];
        let response = self.dispatch(Command::Bury, &args, None).await?;
        Ok(response.status == ResponseStatus::Buried)
    }

    /// Ask for more time on a reserved job. `false` if it is not reserved by
    /// this client.
    pub async fn touch(&self, id: u64) -> Result<bool> {
        validate_job_id(id)?;
        let response = self.dispatch(Command::Touch, &[id.to_string()], None).await?;
        Ok(response.status == ResponseStatus::Touched)
    }

    /// Add a tube to the watch list. Returns the number of watched tubes.
    pub async fn watch(&self, tube: &str) -> Result<u64> {
        validate_tube_name(tube)?;
        let response = self.dispatch(Command::Watch, &[tube.to_string()], None).await?;
        Ok(response.header_u64(0)?)
    }

    /// Remove a tube from the watch list. `false` if it is the last one.
    pub async fn ignore(&self, tube: &str) -> Result<bool> {
        validate_tube_name(tube)?;
        let response = self.dispatch(Command::Ignore, &[tube.to_string()], None).await?;
        Ok(response.status == ResponseStatus::Watching)
    }

    /// Inspect a job by id.
    pub async fn peek(&self, id: u64) -> Result<Option<Job<S::Value>>> {
        validate_job_id(id)?;
        let response = self.dispatch(Command::Peek, &[id.to_string()], None).await?;
        job_or_none(Command::Peek, response)
    }

    /// Inspect the next ready job in the used tube.
    pub async fn peek_ready(&self) -> Result<Option<Job<S::Value>>> {
        let response = self.dispatch(Command::PeekReady, &[], None).await?;
        job_or_none(Command::PeekReady, response)
    }

    /// Inspect the delayed job with the shortest delay left in the used tube.
    pub async fn peek_delayed(&self) -> Result<Option<Job<S::Value>>> {
        let response = self.dispatch(Command::PeekDelayed, &[], None).await?;
        job_or_none(Command::PeekDelayed, response)
    }

    /// Inspect the next buried job in the used tube.
    pub async fn peek_buried(&self) -> Result<Option<Job<S::Value>>> {
        let response = self.dispatch(Command::PeekBuried, &[], None).await?;
        job_or_none(Command::PeekBuried, response)
    }

    /// Move up to `bound` buried (or, if none, delayed) jobs in the used tube
    /// to ready. Returns the number kicked.
    pub async fn kick(&self, bound: u32) -> Result<u64> {
        let response = self.dispatch(Command::Kick, &[bound.to_string()], None).await?;
        Ok(response.header_u64(0)?)
    }

    /// Kick a single buried or delayed job. `false` if it cannot be kicked.
    pub async fn kick_job(&self, id: u64) -> Result<bool> {
        validate_job_id(id)?;
        let response = self.dispatch(Command::KickJob, &[id.to_string()], None).await?;
        Ok(response.status == ResponseStatus::Kicked)
    }

    /// Server-wide statistics.
    pub async fn stats(&self) -> Result<ServerStats> {
        let response = self.dispatch(Command::Stats, &[], None).await?;
        into_structured(response)
    }

    /// Statistics for one job. `None` if it does not exist.
    pub async fn stats_job(&self, id: u64) -> Result<Option<JobStats>> {
        validate_job_id(id)?;
        let response = self.dispatch(Command::StatsJob, &[id.to_string()], None).await?;
        match response.status {
            ResponseStatus::NotFound => Ok(None),
            _ => into_structured(response).map(Some),
        }
    }

    /// Statistics for one tube. `None` if it does not exist.
    pub async fn stats_tube(&self, tube: &str) -> Result<Option<TubeStats>> {
        validate_tube_name(tube)?;
        let response = self
            .dispatch(Command::StatsTube, &[tube.to_string()], None)
            .await?;
        match response.status {
            ResponseStatus::NotFound => Ok(None),
            _ => into_structured(response).map(Some),
        }
    }

    /// Names of all existing tubes.
    pub async fn list_tubes(&self) -> Result<Vec<String>> {
        let response = self.dispatch(Command::ListTubes, &[], None).await?;
        into_structured(response)
    }

    /// Name of the tube currently used.
    pub async fn list_tube_used(&self) -> Result<String> {
        let response = self.dispatch(Command::ListTubeUsed, &[], None).await?;
        Ok(response.header(0)?.to_string())
    }

    /// Names of the tubes currently watched.
    pub async fn list_tubes_watched(&self) -> Result<Vec<String>> {
        let response = self.dispatch(Command::ListTubesWatched, &[], None).await?;
        into_structured(response)
    }

    /// Stop handing out jobs from `tube` for `delay` seconds. `false` if the
    /// tube does not exist.
    pub async fn pause_tube(&self, tube: &str, delay: u32) -> Result<bool> {
        validate_tube_name(tube)?;
        let args = [tube.to_string(), delay.to_string()];
        let response = self.dispatch(Command::PauseTube, &args, None).await?;
        Ok(response.status == ResponseStatus::Paused)
    }
}

impl<S: Serializer> std::fmt::Debug for Client<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("state", &self.conn.state())
            .field("queue_size", &self.queue.len())
            .finish_non_exhaustive()
    }
}
