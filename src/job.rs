//! Job-level result types.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Server-side job state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Ready,
    Delayed,
    Reserved,
    Buried,
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            JobState::Ready => "ready",
            JobState::Delayed => "delayed",
            JobState::Reserved => "reserved",
            JobState::Buried => "buried",
        })
    }
}

/// Job returned by `reserve` and the `peek` family.
#[derive(Debug, Clone, PartialEq)]
pub struct Job<V> {
    /// Server-assigned id.
    pub id: u64,
    /// Decoded body.
    pub payload: V,
}

/// Outcome of `put`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PutOutcome {
    /// Id of the new job.
    pub id: u64,
    /// `Buried` if the server ran out of memory growing its priority queue,
    /// otherwise `Delayed` or `Ready` depending on the requested delay.
    pub state: JobState,
}
