//! # beanstalk-client
//!
//! Async client for the beanstalkd work queue protocol.
//!
//! ## Architecture
//!
//! - **Transport**: one TCP [`transport::Connection`] with an explicit
//!   open/close state machine, forwarding raw bytes as events
//! - **Protocol**: text request encoding, incremental response framing with a
//!   payload read timeout, and a static per-verb [`protocol::Command`] table
//! - **Dispatch**: a FIFO [`queue::DispatchQueue`] that keeps exactly one
//!   exchange in flight while any number of tasks submit commands
//! - **Codec**: pluggable job payload [`codec::Serializer`]s (JSON by default)
//!
//! ## Example
//!
//! ```no_run
//! use beanstalk_client::{Client, PutOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), beanstalk_client::Error> {
//!     let client = Client::builder().build();
//!     client.connect().await?;
//!
//!     let put = client.put(&serde_json::json!({ "n": 1 }), PutOptions::new()).await?;
//!     let job = client.reserve().await?;
//!     assert_eq!(job.map(|j| j.id), Some(put.id));
//!
//!     client.disconnect(false).await
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod hooks;
pub mod job;
pub mod protocol;
pub mod queue;
pub mod stats;
pub mod transport;
pub mod validate;

mod client;

pub use client::{Client, ClientBuilder, PutOptions};
pub use config::ClientConfig;
pub use error::{Error, Result};
pub use hooks::Hooks;
pub use job::{Job, JobState, PutOutcome};
