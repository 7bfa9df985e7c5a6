//! The World Registry (spec.md §4.D).
//!
//! A `World` bundles a network, a simulator, a ship index, a dedicated
//! worker thread, and a busy flag behind cheaply-`Clone`-able handles, the
//! same "shared pointer bundle" shape the teacher's `context::KnowledgeBase`
//! uses for its backend handles (`context/mod.rs`). The registry itself is
//! a single reader-writer lock over the map; every value read out of it is
//! a clone of the bundle, never a borrow, so the lock's critical section
//! never calls into simulator code (spec.md §4.D invariant).

mod network_handle;
mod worker;

pub use network_handle::NetworkHandle;
pub use worker::Worker;

use crate::error::{SimError, SimResult};
use crate::model::{Network, ShipHandle};
use crate::simulator::{SimSignalReceiver, Simulator, SimulatorControl};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

/// Aggregation discipline a World was created with (spec.md §4.E), captured
/// once at `create_environment` and consulted by the coordinator whenever
/// it fans a command out across worlds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationMode {
    /// Emit one aggregated event after every requested world reports.
    Barrier,
    /// Emit one event per world, as soon as that world reports.
    Immediate,
}

/// One named simulation context. Cheap to `Clone`: every field is a
/// reference-counted handle, so cloning a `World` never deep-copies the
/// network, the ship index, or the simulator — it just hands out another
/// reference to the same worker-owned state (spec.md §4.D).
#[derive(Clone)]
pub struct World {
    pub name: String,
    pub network: NetworkHandle,
    pub simulator: Arc<Mutex<Option<Simulator>>>,
    pub signal_rx: Arc<Mutex<Option<SimSignalReceiver>>>,
    pub ship_index: Arc<Mutex<HashMap<String, ShipHandle>>>,
    pub worker: Arc<Worker>,
    pub is_busy: Arc<AtomicBool>,
    pub mode: Arc<Mutex<AggregationMode>>,
    /// Shared pause/resume/terminate control, independent of the
    /// `simulator` mutex so a `terminate` issued while `run_for` is mid-loop
    /// on the worker never has to wait behind it (spec.md §4.C `Restart`,
    /// and `control.rs`'s own rationale for keeping this off the worker
    /// queue entirely).
    pub control: Arc<Mutex<Option<Arc<SimulatorControl>>>>,
    /// Set at `create_environment`; lets the coordinator pick between
    /// `run_for` and `study_ships_resistance` without locking the
    /// simulator mutex just to ask.
    pub resistance_only: Arc<AtomicBool>,
}

impl std::fmt::Debug for World {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("World")
            .field("name", &self.name)
            .field("is_busy", &self.is_busy.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

impl World {
    pub fn new(name: impl Into<String>, network: Box<dyn Network>) -> Self {
        let name = name.into();
        Self {
            worker: Arc::new(Worker::spawn(&name)),
            name,
            network: NetworkHandle::new(network),
            simulator: Arc::new(Mutex::new(None)),
            signal_rx: Arc::new(Mutex::new(None)),
            ship_index: Arc::new(Mutex::new(HashMap::new())),
            is_busy: Arc::new(AtomicBool::new(false)),
            mode: Arc::new(Mutex::new(AggregationMode::Barrier)),
            control: Arc::new(Mutex::new(None)),
            resistance_only: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_busy(&self, busy: bool) {
        self.is_busy.store(busy, Ordering::SeqCst);
    }

    pub fn is_busy(&self) -> bool {
        self.is_busy.load(Ordering::SeqCst)
    }

    pub fn mode(&self) -> AggregationMode {
        *self.mode.lock().expect("world mode mutex poisoned")
    }

    pub fn set_mode(&self, mode: AggregationMode) {
        *self.mode.lock().expect("world mode mutex poisoned") = mode;
    }

    /// Take the simulator's signal receiver, leaving `None` behind. Called
    /// exactly once by the coordinator's signal pump when a world is
    /// created, so only one consumer ever drains a given world's signals.
    pub fn take_signal_rx(&self) -> Option<SimSignalReceiver> {
        self.signal_rx
            .lock()
            .expect("world signal_rx mutex poisoned")
            .take()
    }
}

/// Thread-safe `name -> World` map. A single reader-writer lock guards the
/// map itself; values are copied out on every read (spec.md §4.D).
#[derive(Default)]
pub struct WorldRegistry {
    worlds: RwLock<HashMap<String, World>>,
}

impl WorldRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_or_update(&self, world: World) {
        self.worlds
            .write()
            .expect("world registry poisoned")
            .insert(world.name.clone(), world);
    }

    pub fn remove(&self, name: &str) -> Option<World> {
        self.worlds.write().expect("world registry poisoned").remove(name)
    }

    pub fn get(&self, name: &str) -> Option<World> {
        self.worlds.read().expect("world registry poisoned").get(name).cloned()
    }

    pub fn require(&self, name: &str) -> SimResult<World> {
        self.get(name)
            .ok_or_else(|| SimError::Domain(format!("unknown world: {name}")))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.worlds.read().expect("world registry poisoned").contains_key(name)
    }

    pub fn list_names(&self) -> Vec<String> {
        self.worlds
            .read()
            .expect("world registry poisoned")
            .keys()
            .cloned()
            .collect()
    }

    pub fn list_worlds(&self) -> Vec<World> {
        self.worlds
            .read()
            .expect("world registry poisoned")
            .values()
            .cloned()
            .collect()
    }

    pub fn set_busy(&self, name: &str, busy: bool) {
        if let Some(world) = self.get(name) {
            world.set_busy(busy);
        }
    }

    pub fn is_busy(&self, name: &str) -> bool {
        self.get(name).map(|w| w.is_busy()).unwrap_or(false)
    }

    pub fn get_ship_by_id(&self, name: &str, id: &str) -> Option<ShipHandle> {
        let world = self.get(name)?;
        world
            .ship_index
            .lock()
            .expect("ship index mutex poisoned")
            .get(id)
            .cloned()
    }

    pub fn list_ships(&self, name: &str) -> Vec<ShipHandle> {
        match self.get(name) {
            Some(world) => world
                .ship_index
                .lock()
                .expect("ship index mutex poisoned")
                .values()
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    /// Clear every world. Used by `restServer` (spec.md §4.H `restServer`).
    pub fn clear(&self) {
        self.worlds.write().expect("world registry poisoned").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::StaticNetwork;

    #[test]
    fn add_get_remove_round_trip() {
        let registry = WorldRegistry::new();
        assert!(!registry.contains("A"));
        registry.add_or_update(World::new("A", Box::new(StaticNetwork::new())));
        assert!(registry.contains("A"));
        assert_eq!(registry.list_names(), vec!["A".to_string()]);
        let removed = registry.remove("A");
        assert!(removed.is_some());
        assert!(!registry.contains("A"));
    }

    #[test]
    fn get_returns_an_independent_handle_clone() {
        let registry = WorldRegistry::new();
        registry.add_or_update(World::new("A", Box::new(StaticNetwork::new())));
        let handle = registry.get("A").unwrap();
        handle.set_busy(true);
        // Same underlying Arc<AtomicBool>, so mutation through one handle
        // is visible through a freshly fetched one too.
        assert!(registry.is_busy("A"));
    }

    #[test]
    fn require_reports_unknown_world_as_domain_error() {
        let registry = WorldRegistry::new();
        let err = registry.require("ghost").unwrap_err();
        assert!(matches!(err, SimError::Domain(_)));
    }

    #[test]
    fn ship_index_add_and_lookup() {
        use crate::model::{GeoPoint, PathLine, StaticShip};
        use std::sync::Mutex as StdMutex;

        let registry = WorldRegistry::new();
        let world = World::new("A", Box::new(StaticNetwork::new()));
        registry.add_or_update(world.clone());

        let a = GeoPoint::new(0.0, 0.0).unwrap();
        let b = GeoPoint::new(0.0, 1.0).unwrap();
        let ship = Arc::new(StdMutex::new(StaticShip::new(
            "s1",
            0.0,
            10.0,
            100.0,
            1000.0,
            vec![a, b],
            vec![PathLine { start: a, end: b }],
        ))) as ShipHandle;
        world
            .ship_index
            .lock()
            .unwrap()
            .insert("s1".to_string(), ship);

        assert!(registry.get_ship_by_id("A", "s1").is_some());
        assert_eq!(registry.list_ships("A").len(), 1);
        assert!(registry.get_ship_by_id("A", "nope").is_none());
    }
}
