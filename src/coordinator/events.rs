//! Outbound events the coordinator emits. These are the internal mirror
//! of the wire events; [`crate::broker`] is the place that knows how to
//! serialize them to JSON.
//!
//! Every variant that can result from a cross-world command carries a
//! `Vec` of per-world results rather than a single value. That one shape
//! covers both aggregation disciplines: an Immediate-mode flush carries
//! exactly one element, a Barrier-mode flush carries every requested
//! world's result together.

use crate::model::ShipsResults;

#[derive(Debug, Clone)]
pub enum CoordinatorEvent {
    ConnectionStatus {
        connected: bool,
    },
    NetworkLoaded {
        world: String,
    },
    Created {
        world: String,
    },
    ShipsAdded {
        world: String,
        ship_ids: Vec<String>,
    },
    Paused {
        worlds: Vec<String>,
    },
    Resumed {
        worlds: Vec<String>,
    },
    Terminated {
        worlds: Vec<String>,
    },
    Restarted {
        worlds: Vec<String>,
    },
    /// `(world, clock, progress_percent)` triples, emitted once `run_for`
    /// reaches its reporting time on every requested world.
    Advanced {
        worlds: Vec<(String, f64, u8)>,
    },
    /// Streamed during a `run_for` call; always single-world, filtered to
    /// multiples of 5 before it reaches this channel.
    ProgressUpdated {
        world: String,
        percent: u8,
    },
    AllReachedDestination {
        world: String,
    },
    ResultsAvailable {
        worlds: Vec<(String, ShipsResults)>,
    },
    PortsAvailable {
        worlds: Vec<(String, Vec<String>)>,
    },
    CurrentResults {
        worlds: Vec<(String, Vec<(String, String)>)>,
    },
    CurrentState {
        world: String,
        clock: f64,
        progress_percent: u8,
        ship_ids: Vec<String>,
    },
    ShipState {
        world: String,
        ship_id: String,
        position: (f64, f64),
        speed: f64,
        reached_destination: bool,
    },
    ServerReset,
    Error {
        message: String,
    },
}

pub type CoordinatorEventSender = crossbeam_channel::Sender<CoordinatorEvent>;
pub type CoordinatorEventReceiver = crossbeam_channel::Receiver<CoordinatorEvent>;

/// Create a bounded coordinator→broker event channel. One receiver is
/// handed to the broker at startup and drained on its publishing thread.
pub fn event_channel() -> (CoordinatorEventSender, CoordinatorEventReceiver) {
    crossbeam_channel::bounded(256)
}
