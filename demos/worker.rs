//! Minimal worker: puts a job into a tube, then reserves and deletes jobs
//! until the tube is empty.
//!
//! ```text
//! RUST_LOG=beanstalk_client=debug cargo run --example worker -- '{"port": 11300}'
//! ```
//!
//! The optional argument is a JSON [`ClientConfig`]; missing fields use
//! their defaults.

use std::io;

use beanstalk_client::{Client, ClientConfig, Hooks, PutOptions};
use serde_json::json;
use tracing_subscriber::EnvFilter;

const TUBE: &str = "demo";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(json) => ClientConfig::from_json_str(&json)?,
        None => ClientConfig::default(),
    };

    let hooks = Hooks::new()
        .on_connect(|addr| tracing::info!("connected to {}", addr))
        .on_close(|| tracing::info!("connection closed"));
    let client = Client::builder().config(config).hooks(hooks).build();
    client.connect().await?;

    client.use_tube(TUBE).await?;
    client.watch(TUBE).await?;
    client.ignore("default").await?;

    let put = client
        .put(&json!({ "task": "resize", "width": 640 }), PutOptions::new().ttr(60))
        .await?;
    tracing::info!("put job {} ({})", put.id, put.state);

    while let Some(job) = client.reserve_with_timeout(1).await? {
        tracing::info!("reserved job {}: {}", job.id, job.payload);
        if client.delete(job.id).await? {
            tracing::info!("deleted job {}", job.id);
        }
    }

    if let Some(stats) = client.stats_tube(TUBE).await? {
        tracing::info!("{} ready jobs left in '{}'", stats.current_jobs_ready, stats.name);
    }

    client.disconnect(false).await?;
    Ok(())
}
