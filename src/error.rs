//! Core error taxonomy.
//!
//! Mirrors the six error kinds in the design (Transport, Protocol, Domain,
//! I/O, Capability, Coordination). Every fallible operation inside the
//! simulation core returns `Result<T, SimError>`; `anyhow::Error` is used
//! only at the process boundary (CLI parsing, startup).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Broker attach/consume/publish failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Malformed command envelope or missing required field.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// Unknown world/ship/port, wrong mode, invalid parameter.
    #[error("domain error: {0}")]
    Domain(String),

    /// Trajectory/summary file write failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A required capability (network, resistance strategy) is missing.
    #[error("capability error: {0}")]
    Capability(String),

    /// Worker thread or shared-state inconsistency.
    #[error("coordination error: {0}")]
    Coordination(String),
}

impl From<serde_json::Error> for SimError {
    fn from(err: serde_json::Error) -> Self {
        SimError::Protocol(err.to_string())
    }
}

pub type SimResult<T> = Result<T, SimError>;
