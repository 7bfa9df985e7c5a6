//! Typed simulator→coordinator signal channel.
//!
//! The source's Qt signals/slots become plain channel sends: every
//! simulator-level event the coordinator cares about is a variant of
//! [`SimSignal`], posted on a `crossbeam_channel::Sender` owned by the
//! World and drained by the coordinator on the main thread (spec.md §9
//! DESIGN NOTES, "Signals/slots across threads").

use crate::model::{GeoPoint, ShipsResults};

#[derive(Debug, Clone)]
pub enum SimSignal {
    Initialized,
    Restarted,
    Paused,
    Resumed,
    Terminated,
    /// Emitted once per simulated tick with the new clock value.
    Advanced { clock: f64 },
    /// Emitted only when the whole-percent progress value changes
    /// (spec.md §8 monotonic progress law).
    ProgressUpdated { percent: u8 },
    /// Emitted on natural `run_for` exit when `duration` was finite.
    ReachedReportingTime { clock: f64, percent: u8 },
    AllReachedDestination,
    ShipAdded { ids: Vec<String> },
    /// Per-ship `(id, position)` snapshot, emitted at the configured plot
    /// frequency (spec.md §4.C step 3).
    PlotUpdate(Vec<(String, GeoPoint)>),
    /// Terminal: the run finished and results were packaged.
    Finished(Box<ShipsResults>),
    Error(String),
}

pub type SimSignalSender = crossbeam_channel::Sender<SimSignal>;
pub type SimSignalReceiver = crossbeam_channel::Receiver<SimSignal>;

/// Create a bounded signal channel. A small bound is enough: the
/// coordinator drains signals promptly and a World never emits faster
/// than one signal per tick.
pub fn signal_channel() -> (SimSignalSender, SimSignalReceiver) {
    crossbeam_channel::bounded(256)
}
